use crate::db::types::AttemptStatus;

/// Competition rank (1, 2, 2, 4) of a student by mean percentage over
/// terminal attempts; `None` when the student has none.
pub(crate) async fn student_rank(
    executor: impl sqlx::PgExecutor<'_>,
    student_id: &str,
) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar(
        "WITH means AS (
            SELECT student_id, AVG(percentage) AS mean_percentage
            FROM attempts
            WHERE status <> $2
            GROUP BY student_id
         ),
         ranked AS (
            SELECT student_id, RANK() OVER (ORDER BY mean_percentage DESC) AS position
            FROM means
         )
         SELECT position FROM ranked WHERE student_id = $1",
    )
    .bind(student_id)
    .bind(AttemptStatus::Ongoing)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn count_ranked_students(
    executor: impl sqlx::PgExecutor<'_>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(DISTINCT student_id) FROM attempts WHERE status <> $1")
        .bind(AttemptStatus::Ongoing)
        .fetch_one(executor)
        .await
}
