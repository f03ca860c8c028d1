use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{
    AttemptStatus, DifficultyLevel, GradingMode, PaperStatus, QuestionKind, UserRole,
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) full_name: String,
    pub(crate) role: UserRole,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
}

/// Exam definition. Only the scoring transaction writes `total_attempts`
/// and `average_score`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Paper {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) status: PaperStatus,
    pub(crate) grading_mode: GradingMode,
    pub(crate) duration_minutes: Option<i32>,
    pub(crate) price: Option<f64>,
    pub(crate) total_attempts: i32,
    pub(crate) average_score: f64,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

impl Paper {
    pub(crate) fn is_paid(&self) -> bool {
        self.price.is_some_and(|price| price > 0.0)
    }

    /// Timer duration in minutes when the paper is time-bound.
    pub(crate) fn time_limit_minutes(&self) -> Option<i64> {
        match self.grading_mode {
            GradingMode::TimeBound => {
                self.duration_minutes.filter(|minutes| *minutes > 0).map(i64::from)
            }
            GradingMode::NoLimit => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) paper_id: String,
    pub(crate) order_index: i32,
    pub(crate) kind: QuestionKind,
    pub(crate) prompt: String,
    pub(crate) options: Json<Vec<String>>,
    pub(crate) marks: f64,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) correct_option: Option<i32>,
    pub(crate) blank_answers: Option<Json<Vec<Vec<String>>>>,
    pub(crate) case_sensitive: bool,
    pub(crate) solution_text: Option<String>,
    pub(crate) solution_image: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Attempt {
    pub(crate) id: String,
    pub(crate) paper_id: String,
    pub(crate) student_id: String,
    pub(crate) status: AttemptStatus,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
    pub(crate) total_score: f64,
    pub(crate) total_marks: f64,
    pub(crate) percentage: f64,
    pub(crate) time_spent_seconds: i64,
    pub(crate) attempt_number: i32,
    pub(crate) no_time_limit: bool,
    pub(crate) show_answer_after_wrong: bool,
    pub(crate) enable_solution_view: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// One row per touched (attempt, question). `is_correct = None` means the
/// answer waits for manual review.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Answer {
    pub(crate) id: String,
    pub(crate) attempt_id: String,
    pub(crate) question_id: String,
    pub(crate) selected_option: Option<i32>,
    pub(crate) answer_text: Option<String>,
    pub(crate) is_correct: Option<bool>,
    pub(crate) marks_obtained: f64,
    pub(crate) feedback: Option<String>,
    pub(crate) marked_for_review: bool,
    pub(crate) marked_too_hard: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

impl Answer {
    /// A row counts as answered once it carries a selection or non-blank text.
    pub(crate) fn is_answered(&self) -> bool {
        self.selected_option.is_some()
            || self.answer_text.as_deref().is_some_and(|text| !text.trim().is_empty())
    }
}
