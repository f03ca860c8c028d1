use time::PrimitiveDateTime;

use crate::core::time::whole_seconds_between;
use crate::db::models::Answer;
use crate::db::types::AttemptStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FinalizeMode {
    ManualSubmit,
    AutoSubmit,
}

impl FinalizeMode {
    pub(crate) fn terminal_status(self) -> AttemptStatus {
        match self {
            Self::ManualSubmit => AttemptStatus::Submitted,
            Self::AutoSubmit => AttemptStatus::AutoSubmitted,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::ManualSubmit => "manual",
            Self::AutoSubmit => "auto",
        }
    }
}

/// Final figures for one attempt, derived only from its graded answers.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScoreOutcome {
    pub(crate) total_score: f64,
    pub(crate) percentage: f64,
    pub(crate) time_spent_seconds: i64,
    pub(crate) answered: usize,
    pub(crate) correct: usize,
    pub(crate) incorrect: usize,
    pub(crate) pending_review: usize,
    pub(crate) unanswered: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PaperAggregate {
    pub(crate) total_attempts: i32,
    pub(crate) average_score: f64,
}

pub(crate) fn compute_outcome(
    answers: &[Answer],
    total_marks: f64,
    question_count: usize,
    started_at: PrimitiveDateTime,
    now: PrimitiveDateTime,
) -> ScoreOutcome {
    let mut total_score = 0.0;
    let mut answered = 0;
    let mut correct = 0;
    let mut incorrect = 0;
    let mut pending_review = 0;

    for answer in answers.iter().filter(|answer| answer.is_answered()) {
        answered += 1;
        total_score += answer.marks_obtained;
        match answer.is_correct {
            Some(true) => correct += 1,
            Some(false) => incorrect += 1,
            None => pending_review += 1,
        }
    }

    ScoreOutcome {
        total_score,
        percentage: percentage(total_score, total_marks),
        time_spent_seconds: whole_seconds_between(started_at, now),
        answered,
        correct,
        incorrect,
        pending_review,
        unanswered: question_count.saturating_sub(answered),
    }
}

pub(crate) fn percentage(total_score: f64, total_marks: f64) -> f64 {
    if total_marks <= 0.0 {
        return 0.0;
    }
    total_score / total_marks * 100.0
}

/// Count and mean over every terminal attempt score of a paper.
pub(crate) fn paper_aggregate(scores: &[f64]) -> PaperAggregate {
    if scores.is_empty() {
        return PaperAggregate { total_attempts: 0, average_score: 0.0 };
    }
    let sum: f64 = scores.iter().sum();
    PaperAggregate {
        total_attempts: scores.len() as i32,
        average_score: sum / scores.len() as f64,
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::test_support::answer_fixture;

    #[test]
    fn untouched_rows_do_not_count_as_answered() {
        let mut flagged = answer_fixture("a1", "q1");
        flagged.marked_too_hard = true;
        let mut right = answer_fixture("a1", "q2");
        right.selected_option = Some(1);
        right.is_correct = Some(true);
        right.marks_obtained = 2.0;
        let mut blank_text = answer_fixture("a1", "q3");
        blank_text.answer_text = Some("   ".to_string());
        blank_text.marks_obtained = 5.0;

        let outcome = compute_outcome(
            &[flagged, right, blank_text],
            4.0,
            4,
            datetime!(2026-01-01 10:00:00),
            datetime!(2026-01-01 10:12:30.700),
        );

        assert_eq!(outcome.total_score, 2.0);
        assert_eq!(outcome.percentage, 50.0);
        assert_eq!(outcome.time_spent_seconds, 750);
        assert_eq!(outcome.answered, 1);
        assert_eq!(outcome.unanswered, 3);
    }

    #[test]
    fn counts_each_verdict_bucket() {
        let mut wrong = answer_fixture("a1", "q1");
        wrong.selected_option = Some(0);
        wrong.is_correct = Some(false);
        let mut pending = answer_fixture("a1", "q2");
        pending.answer_text = Some("photosynthesis".to_string());
        pending.is_correct = None;

        let outcome = compute_outcome(
            &[wrong, pending],
            0.0,
            2,
            datetime!(2026-01-01 10:00:00),
            datetime!(2026-01-01 10:00:00),
        );

        assert_eq!(outcome.incorrect, 1);
        assert_eq!(outcome.pending_review, 1);
        assert_eq!(outcome.correct, 0);
        assert_eq!(outcome.percentage, 0.0);
    }

    #[test]
    fn aggregate_is_exact_mean() {
        let aggregate = paper_aggregate(&[3.0, 4.0, 8.0]);
        assert_eq!(aggregate.total_attempts, 3);
        assert_eq!(aggregate.average_score, 5.0);
        assert_eq!(paper_aggregate(&[]).average_score, 0.0);
    }
}
