use crate::db::models::Paper;
use crate::services::scoring::PaperAggregate;

const COLUMNS: &str = "\
    id, title, status, grading_mode, duration_minutes, price, \
    total_attempts, average_score, created_at, updated_at";

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Paper>, sqlx::Error> {
    sqlx::query_as::<_, Paper>(&format!("SELECT {COLUMNS} FROM papers WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Serialises aggregate updates for one paper until the surrounding
/// transaction ends.
pub(crate) async fn lock_for_update(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT id FROM papers WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(())
}

pub(crate) async fn update_statistics(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    aggregate: PaperAggregate,
    updated_at: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE papers
         SET total_attempts = $2, average_score = $3, updated_at = $4
         WHERE id = $1",
    )
    .bind(id)
    .bind(aggregate.total_attempts)
    .bind(aggregate.average_score)
    .bind(updated_at)
    .execute(executor)
    .await?;
    Ok(())
}
