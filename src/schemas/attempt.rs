use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Answer, Attempt, Paper, Question};
use crate::db::types::{AttemptStatus, DifficultyLevel, GradingMode, QuestionKind};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct StartAttemptRequest {
    #[serde(default, alias = "noTimeLimit")]
    pub(crate) no_time_limit: bool,
    #[serde(default, alias = "showAnswerAfterWrong")]
    pub(crate) show_answer_after_wrong: bool,
    #[serde(default, alias = "enableSolutionView")]
    pub(crate) enable_solution_view: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SaveAnswerRequest {
    #[serde(default, alias = "selectedOption")]
    #[validate(range(min = 0, message = "selected_option must be non-negative"))]
    pub(crate) selected_option: Option<i32>,
    #[serde(default, alias = "answerText")]
    #[validate(length(max = 20000, message = "answer_text is too long"))]
    pub(crate) answer_text: Option<String>,
}

/// Kept loose so a non-boolean flag can be rejected as a bad request.
#[derive(Debug, Deserialize)]
pub(crate) struct TooHardRequest {
    #[serde(default, alias = "isTooHard")]
    pub(crate) is_too_hard: serde_json::Value,
}

impl TooHardRequest {
    pub(crate) fn flag(&self) -> Option<bool> {
        self.is_too_hard.as_bool()
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AttemptResponse {
    pub(crate) id: String,
    pub(crate) paper_id: String,
    pub(crate) student_id: String,
    pub(crate) status: AttemptStatus,
    pub(crate) started_at: String,
    pub(crate) submitted_at: Option<String>,
    pub(crate) total_score: f64,
    pub(crate) total_marks: f64,
    pub(crate) percentage: f64,
    pub(crate) time_spent_seconds: i64,
    pub(crate) attempt_number: i32,
    pub(crate) no_time_limit: bool,
    pub(crate) show_answer_after_wrong: bool,
    pub(crate) enable_solution_view: bool,
}

impl From<&Attempt> for AttemptResponse {
    fn from(attempt: &Attempt) -> Self {
        Self {
            id: attempt.id.clone(),
            paper_id: attempt.paper_id.clone(),
            student_id: attempt.student_id.clone(),
            status: attempt.status,
            started_at: format_primitive(attempt.started_at),
            submitted_at: attempt.submitted_at.map(format_primitive),
            total_score: attempt.total_score,
            total_marks: attempt.total_marks,
            percentage: attempt.percentage,
            time_spent_seconds: attempt.time_spent_seconds,
            attempt_number: attempt.attempt_number,
            no_time_limit: attempt.no_time_limit,
            show_answer_after_wrong: attempt.show_answer_after_wrong,
            enable_solution_view: attempt.enable_solution_view,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StartAttemptResponse {
    pub(crate) attempt: AttemptResponse,
    pub(crate) resumed: bool,
    pub(crate) time_remaining_seconds: Option<i64>,
}

/// A question as shown during the exam: no answer key, no solution.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct QuestionView {
    pub(crate) id: String,
    pub(crate) order_index: i32,
    pub(crate) kind: QuestionKind,
    pub(crate) prompt: String,
    pub(crate) options: Vec<String>,
    pub(crate) marks: f64,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) blank_count: Option<usize>,
}

impl From<&Question> for QuestionView {
    fn from(question: &Question) -> Self {
        let blank_count = match question.kind {
            QuestionKind::BlankFill => Some(
                question
                    .blank_answers
                    .as_ref()
                    .map(|blanks| blanks.0.len())
                    .filter(|count| *count > 0)
                    .unwrap_or_else(|| question.prompt.matches("___").count().max(1)),
            ),
            _ => None,
        };

        Self {
            id: question.id.clone(),
            order_index: question.order_index,
            kind: question.kind,
            prompt: question.prompt.clone(),
            options: question.options.0.clone(),
            marks: question.marks,
            difficulty: question.difficulty,
            blank_count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AnswerResponse {
    pub(crate) question_id: String,
    pub(crate) selected_option: Option<i32>,
    pub(crate) answer_text: Option<String>,
    pub(crate) is_correct: Option<bool>,
    pub(crate) marks_obtained: f64,
    pub(crate) feedback: Option<String>,
    pub(crate) marked_for_review: bool,
    pub(crate) marked_too_hard: bool,
    pub(crate) updated_at: String,
}

impl From<&Answer> for AnswerResponse {
    fn from(answer: &Answer) -> Self {
        Self {
            question_id: answer.question_id.clone(),
            selected_option: answer.selected_option,
            answer_text: answer.answer_text.clone(),
            is_correct: answer.is_correct,
            marks_obtained: answer.marks_obtained,
            feedback: answer.feedback.clone(),
            marked_for_review: answer.marked_for_review,
            marked_too_hard: answer.marked_too_hard,
            updated_at: format_primitive(answer.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionPayload {
    /// 1-based.
    pub(crate) position: usize,
    pub(crate) total: usize,
    pub(crate) question: QuestionView,
    pub(crate) answer: Option<AnswerResponse>,
}

/// Answer key fields, exposed after a wrong answer or in results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct AnswerKey {
    pub(crate) correct_option: Option<i32>,
    pub(crate) accepted_blanks: Option<Vec<Vec<String>>>,
}

impl AnswerKey {
    pub(crate) fn for_question(question: &Question) -> Option<Self> {
        match question.kind {
            QuestionKind::MultipleChoice => question
                .correct_option
                .map(|option| Self { correct_option: Some(option), accepted_blanks: None }),
            QuestionKind::BlankFill => question
                .blank_answers
                .as_ref()
                .filter(|blanks| !blanks.0.is_empty())
                .map(|blanks| Self { correct_option: None, accepted_blanks: Some(blanks.0.clone()) }),
            QuestionKind::OpenText => None,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SaveAnswerResponse {
    pub(crate) answer: AnswerResponse,
    pub(crate) revealed_key: Option<AnswerKey>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitResponse {
    pub(crate) attempt: AttemptResponse,
    pub(crate) total_questions: usize,
    pub(crate) answered: usize,
    pub(crate) correct: usize,
    pub(crate) incorrect: usize,
    pub(crate) unanswered: usize,
    pub(crate) pending_review: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct PaperSummary {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) grading_mode: GradingMode,
    pub(crate) duration_minutes: Option<i32>,
}

impl From<&Paper> for PaperSummary {
    fn from(paper: &Paper) -> Self {
        Self {
            id: paper.id.clone(),
            title: paper.title.clone(),
            grading_mode: paper.grading_mode,
            duration_minutes: paper.duration_minutes,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamDataResponse {
    pub(crate) attempt: AttemptResponse,
    pub(crate) paper: PaperSummary,
    pub(crate) total_questions: usize,
    pub(crate) answered: usize,
    pub(crate) marked_for_review: usize,
    pub(crate) answers: Vec<AnswerResponse>,
    pub(crate) time_remaining_seconds: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ResultTag {
    Correct,
    Incorrect,
    PendingReview,
    Unanswered,
}

#[derive(Debug, Serialize)]
pub(crate) struct ResultItem {
    pub(crate) position: usize,
    pub(crate) question: QuestionView,
    pub(crate) status: ResultTag,
    pub(crate) answer: Option<AnswerResponse>,
    pub(crate) answer_key: Option<AnswerKey>,
    pub(crate) solution_text: Option<String>,
    pub(crate) solution_image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub(crate) struct BucketStats {
    pub(crate) total: usize,
    pub(crate) correct: usize,
    pub(crate) incorrect: usize,
    pub(crate) pending_review: usize,
    pub(crate) unanswered: usize,
    pub(crate) marks_obtained: f64,
    pub(crate) max_marks: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct DifficultyStats {
    pub(crate) difficulty: DifficultyLevel,
    #[serde(flatten)]
    pub(crate) stats: BucketStats,
}

#[derive(Debug, Serialize)]
pub(crate) struct ResultResponse {
    pub(crate) attempt: AttemptResponse,
    pub(crate) paper: PaperSummary,
    pub(crate) summary: BucketStats,
    pub(crate) by_difficulty: Vec<DifficultyStats>,
    pub(crate) questions: Vec<ResultItem>,
}
