pub(crate) async fn exists(
    executor: impl sqlx::PgExecutor<'_>,
    paper_id: &str,
    student_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM purchases WHERE paper_id = $1 AND student_id = $2)",
    )
    .bind(paper_id)
    .bind(student_id)
    .fetch_one(executor)
    .await
}
