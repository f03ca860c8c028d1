use crate::db::models::Question;
use crate::services::admin_notify::spawn_notify;
use crate::services::ai_grading::{EvaluationRequest, GradingFailure};

use super::{settle_marks, AnswerGrader, GradingContext, Verdict};

/// Outcome of the deterministic fallback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct KeywordOverlap {
    pub(crate) matched: usize,
    pub(crate) total: usize,
    pub(crate) marks: f64,
}

/// Share of reference words found in the lower-cased student answer,
/// scaled to `max_marks`.
pub(crate) fn keyword_overlap_marks(reference: &str, answer: &str, max_marks: f64) -> KeywordOverlap {
    let answer = answer.to_lowercase();
    let words: Vec<String> = reference
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|word| !word.is_empty())
        .collect();

    let total = words.len();
    if total == 0 {
        return KeywordOverlap { matched: 0, total: 0, marks: 0.0 };
    }

    let matched = words.iter().filter(|word| answer.contains(word.as_str())).count();
    let raw = matched as f64 / total as f64 * max_marks;
    KeywordOverlap { matched, total, marks: settle_marks(raw, max_marks) }
}

pub(super) async fn grade(
    grader: &AnswerGrader,
    question: &Question,
    reference: &str,
    answer: &str,
    context: GradingContext<'_>,
) -> Verdict {
    if answer.trim().is_empty() {
        return Verdict::incorrect();
    }

    let request = EvaluationRequest {
        question_prompt: question.prompt.clone(),
        reference_solution: reference.to_string(),
        student_answer: answer.to_string(),
        max_marks: question.marks,
    };

    match grader.evaluator.evaluate(&request).await {
        Ok(ai) => {
            let marks = settle_marks(ai.marks_obtained, question.marks);
            Verdict { is_correct: Some(marks >= 1.0), marks_obtained: marks, feedback: ai.feedback }
        }
        Err(failure) => fallback(grader, question, reference, answer, context, &failure),
    }
}

fn fallback(
    grader: &AnswerGrader,
    question: &Question,
    reference: &str,
    answer: &str,
    context: GradingContext<'_>,
    failure: &GradingFailure,
) -> Verdict {
    let overlap = keyword_overlap_marks(reference, answer, question.marks);

    tracing::warn!(
        attempt_id = %context.attempt_id,
        question_id = %context.question_id,
        reason = failure.reason(),
        error = %failure,
        matched = overlap.matched,
        total = overlap.total,
        marks = overlap.marks,
        "AI grading unavailable; scored open-text answer by keyword overlap"
    );
    metrics::counter!("open_text_fallback_total", "reason" => failure.reason()).increment(1);

    spawn_notify(
        grader.notifier.clone(),
        format!(
            "Open-text grading fell back to keyword overlap (attempt {}, question {}): {}",
            context.attempt_id, context.question_id, failure
        ),
        grader.notify_timeout,
    );

    Verdict {
        is_correct: Some(overlap.marks >= 1.0),
        marks_obtained: overlap.marks,
        feedback: Some(format!(
            "Scored automatically: {} of {} reference terms found.",
            overlap.matched, overlap.total
        )),
    }
}
