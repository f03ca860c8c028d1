use crate::db::models::Attempt;
use crate::db::types::{AttemptStatus, GradingMode};
use crate::services::scoring::ScoreOutcome;

pub(crate) const COLUMNS: &str = "\
    id, paper_id, student_id, status, started_at, submitted_at, total_score, \
    total_marks, percentage, time_spent_seconds, attempt_number, no_time_limit, \
    show_answer_after_wrong, enable_solution_view, created_at, updated_at";

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub(crate) struct OverdueAttempt {
    pub(crate) attempt_id: String,
    pub(crate) student_id: String,
}

pub(crate) struct CreateAttempt<'a> {
    pub(crate) id: &'a str,
    pub(crate) paper_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) started_at: time::PrimitiveDateTime,
    pub(crate) total_marks: f64,
    pub(crate) attempt_number: i32,
    pub(crate) no_time_limit: bool,
    pub(crate) show_answer_after_wrong: bool,
    pub(crate) enable_solution_view: bool,
}

/// Transaction-scoped lock on one (paper, student) pair.
pub(crate) async fn acquire_start_lock(
    executor: impl sqlx::PgExecutor<'_>,
    paper_id: &str,
    student_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(format!("attempt_start:{paper_id}:{student_id}"))
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!("SELECT {COLUMNS} FROM attempts WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn lock_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {COLUMNS} FROM attempts WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_ongoing(
    executor: impl sqlx::PgExecutor<'_>,
    paper_id: &str,
    student_id: &str,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {COLUMNS} FROM attempts \
         WHERE paper_id = $1 AND student_id = $2 AND status = $3"
    ))
    .bind(paper_id)
    .bind(student_id)
    .bind(AttemptStatus::Ongoing)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn count_by_paper_and_student(
    executor: impl sqlx::PgExecutor<'_>,
    paper_id: &str,
    student_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM attempts WHERE paper_id = $1 AND student_id = $2")
        .bind(paper_id)
        .bind(student_id)
        .fetch_one(executor)
        .await
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    attempt: CreateAttempt<'_>,
) -> Result<Attempt, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "INSERT INTO attempts (
            id, paper_id, student_id, status, started_at, total_marks, attempt_number,
            no_time_limit, show_answer_after_wrong, enable_solution_view, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$5,$5)
        RETURNING {COLUMNS}"
    ))
    .bind(attempt.id)
    .bind(attempt.paper_id)
    .bind(attempt.student_id)
    .bind(AttemptStatus::Ongoing)
    .bind(attempt.started_at)
    .bind(attempt.total_marks)
    .bind(attempt.attempt_number)
    .bind(attempt.no_time_limit)
    .bind(attempt.show_answer_after_wrong)
    .bind(attempt.enable_solution_view)
    .fetch_one(executor)
    .await
}

pub(crate) async fn finalize(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    status: AttemptStatus,
    outcome: &ScoreOutcome,
    submitted_at: time::PrimitiveDateTime,
) -> Result<Attempt, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "UPDATE attempts
         SET status = $2, submitted_at = $3, total_score = $4, percentage = $5,
             time_spent_seconds = $6, updated_at = $3
         WHERE id = $1
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(status)
    .bind(submitted_at)
    .bind(outcome.total_score)
    .bind(outcome.percentage)
    .bind(outcome.time_spent_seconds)
    .fetch_one(executor)
    .await
}

pub(crate) async fn terminal_scores(
    executor: impl sqlx::PgExecutor<'_>,
    paper_id: &str,
) -> Result<Vec<f64>, sqlx::Error> {
    sqlx::query_scalar("SELECT total_score FROM attempts WHERE paper_id = $1 AND status <> $2")
        .bind(paper_id)
        .bind(AttemptStatus::Ongoing)
        .fetch_all(executor)
        .await
}

/// Ongoing time-bound attempts whose deadline passed at or before `cutoff`,
/// oldest first.
pub(crate) async fn list_overdue(
    executor: impl sqlx::PgExecutor<'_>,
    cutoff: time::PrimitiveDateTime,
    limit: i64,
) -> Result<Vec<OverdueAttempt>, sqlx::Error> {
    sqlx::query_as::<_, OverdueAttempt>(
        "SELECT a.id AS attempt_id, a.student_id
         FROM attempts a
         JOIN papers p ON p.id = a.paper_id
         WHERE a.status = $1
           AND NOT a.no_time_limit
           AND p.grading_mode = $2
           AND p.duration_minutes > 0
           AND a.started_at + make_interval(mins => p.duration_minutes) <= $3
         ORDER BY a.started_at
         LIMIT $4",
    )
    .bind(AttemptStatus::Ongoing)
    .bind(GradingMode::TimeBound)
    .bind(cutoff)
    .bind(limit)
    .fetch_all(executor)
    .await
}
