use uuid::Uuid;

use crate::db::models::Answer;

const COLUMNS: &str = "\
    id, attempt_id, question_id, selected_option, answer_text, is_correct, \
    marks_obtained, feedback, marked_for_review, marked_too_hard, created_at, updated_at";

pub(crate) struct UpsertGradedAnswer<'a> {
    pub(crate) attempt_id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) selected_option: Option<i32>,
    pub(crate) answer_text: Option<&'a str>,
    pub(crate) is_correct: Option<bool>,
    pub(crate) marks_obtained: f64,
    pub(crate) feedback: Option<&'a str>,
    pub(crate) now: time::PrimitiveDateTime,
}

/// Rows in creation order; the last one drives navigation.
pub(crate) async fn list_by_attempt(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<Vec<Answer>, sqlx::Error> {
    sqlx::query_as::<_, Answer>(&format!(
        "SELECT {COLUMNS} FROM answers WHERE attempt_id = $1 ORDER BY created_at, id"
    ))
    .bind(attempt_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn upsert_graded(
    executor: impl sqlx::PgExecutor<'_>,
    params: UpsertGradedAnswer<'_>,
) -> Result<Answer, sqlx::Error> {
    sqlx::query_as::<_, Answer>(&format!(
        "INSERT INTO answers (
            id, attempt_id, question_id, selected_option, answer_text, is_correct,
            marks_obtained, feedback, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$9)
        ON CONFLICT (attempt_id, question_id) DO UPDATE
        SET selected_option = EXCLUDED.selected_option,
            answer_text = EXCLUDED.answer_text,
            is_correct = EXCLUDED.is_correct,
            marks_obtained = EXCLUDED.marks_obtained,
            feedback = EXCLUDED.feedback,
            updated_at = EXCLUDED.updated_at
        RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4().to_string())
    .bind(params.attempt_id)
    .bind(params.question_id)
    .bind(params.selected_option)
    .bind(params.answer_text)
    .bind(params.is_correct)
    .bind(params.marks_obtained)
    .bind(params.feedback)
    .bind(params.now)
    .fetch_one(executor)
    .await
}

pub(crate) async fn toggle_review(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
    question_id: &str,
    now: time::PrimitiveDateTime,
) -> Result<Option<Answer>, sqlx::Error> {
    sqlx::query_as::<_, Answer>(&format!(
        "UPDATE answers
         SET marked_for_review = NOT marked_for_review, updated_at = $3
         WHERE attempt_id = $1 AND question_id = $2
         RETURNING {COLUMNS}"
    ))
    .bind(attempt_id)
    .bind(question_id)
    .bind(now)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn set_too_hard(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
    question_id: &str,
    flag: bool,
    now: time::PrimitiveDateTime,
) -> Result<Answer, sqlx::Error> {
    sqlx::query_as::<_, Answer>(&format!(
        "INSERT INTO answers (
            id, attempt_id, question_id, marked_too_hard, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$5)
        ON CONFLICT (attempt_id, question_id) DO UPDATE
        SET marked_too_hard = EXCLUDED.marked_too_hard,
            updated_at = EXCLUDED.updated_at
        RETURNING {COLUMNS}"
    ))
    .bind(Uuid::new_v4().to_string())
    .bind(attempt_id)
    .bind(question_id)
    .bind(flag)
    .bind(now)
    .fetch_one(executor)
    .await
}
