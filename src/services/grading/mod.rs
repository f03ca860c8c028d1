mod blank_fill;
mod choice;
mod open_text;

use std::sync::Arc;
use std::time::Duration;

use crate::db::models::Question;
use crate::db::types::QuestionKind;
use crate::services::admin_notify::AdminNotifier;
use crate::services::ai_grading::AnswerEvaluator;

/// What the student sent for one question.
#[derive(Debug, Clone, Default)]
pub(crate) struct Submission {
    pub(crate) selected_option: Option<i32>,
    pub(crate) answer_text: Option<String>,
}

/// Result of grading one answer. `is_correct = None` defers to manual
/// review and always carries zero marks.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Verdict {
    pub(crate) is_correct: Option<bool>,
    pub(crate) marks_obtained: f64,
    pub(crate) feedback: Option<String>,
}

impl Verdict {
    fn correct(marks: f64) -> Self {
        Self { is_correct: Some(true), marks_obtained: marks, feedback: None }
    }

    fn incorrect() -> Self {
        Self { is_correct: Some(false), marks_obtained: 0.0, feedback: None }
    }

    fn pending_review() -> Self {
        Self { is_correct: None, marks_obtained: 0.0, feedback: None }
    }
}

/// Grading rule selected from a question's kind and answer key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum GradingPolicy<'a> {
    MultipleChoice { correct_option: Option<i32> },
    BlankFillKeyed { blanks: &'a [Vec<String>], case_sensitive: bool },
    BlankFillFree,
    OpenText { reference: &'a str },
}

impl<'a> GradingPolicy<'a> {
    pub(crate) fn for_question(question: &'a Question) -> Self {
        match question.kind {
            QuestionKind::MultipleChoice => {
                Self::MultipleChoice { correct_option: question.correct_option }
            }
            QuestionKind::BlankFill => match question.blank_answers.as_ref() {
                Some(blanks) if !blanks.0.is_empty() => Self::BlankFillKeyed {
                    blanks: blanks.0.as_slice(),
                    case_sensitive: question.case_sensitive,
                },
                _ => Self::BlankFillFree,
            },
            QuestionKind::OpenText => {
                Self::OpenText { reference: question.solution_text.as_deref().unwrap_or_default() }
            }
        }
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::MultipleChoice { .. } => "multiple_choice",
            Self::BlankFillKeyed { .. } => "blank_fill_keyed",
            Self::BlankFillFree => "blank_fill_free",
            Self::OpenText { .. } => "open_text",
        }
    }
}

/// Clamps to `[0, max]` and rounds to a whole mark.
pub(crate) fn settle_marks(raw: f64, max_marks: f64) -> f64 {
    let max_marks = if max_marks.is_finite() { max_marks.max(0.0) } else { 0.0 };
    if !raw.is_finite() {
        return 0.0;
    }
    raw.clamp(0.0, max_marks).round().min(max_marks)
}

/// Identifiers carried into logs and admin notices.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GradingContext<'a> {
    pub(crate) attempt_id: &'a str,
    pub(crate) question_id: &'a str,
}

#[derive(Clone)]
pub(crate) struct AnswerGrader {
    evaluator: Arc<dyn AnswerEvaluator>,
    notifier: Arc<dyn AdminNotifier>,
    notify_timeout: Duration,
}

impl AnswerGrader {
    pub(crate) fn new(
        evaluator: Arc<dyn AnswerEvaluator>,
        notifier: Arc<dyn AdminNotifier>,
        notify_timeout: Duration,
    ) -> Self {
        Self { evaluator, notifier, notify_timeout }
    }

    /// Never fails: the open-text policy degrades to keyword overlap.
    pub(crate) async fn grade(
        &self,
        question: &Question,
        submission: &Submission,
        context: GradingContext<'_>,
    ) -> Verdict {
        let policy = GradingPolicy::for_question(question);
        let verdict = match policy {
            GradingPolicy::MultipleChoice { correct_option } => {
                choice::grade(correct_option, submission.selected_option, question.marks)
            }
            GradingPolicy::BlankFillKeyed { blanks, case_sensitive } => blank_fill::grade_keyed(
                blanks,
                case_sensitive,
                submission.answer_text.as_deref(),
                question.marks,
            ),
            GradingPolicy::BlankFillFree => Verdict::pending_review(),
            GradingPolicy::OpenText { reference } => {
                open_text::grade(
                    self,
                    question,
                    reference,
                    submission.answer_text.as_deref().unwrap_or_default(),
                    context,
                )
                .await
            }
        };

        metrics::counter!("answers_graded_total", "policy" => policy.label()).increment(1);
        verdict
    }
}
