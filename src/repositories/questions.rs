use crate::db::models::Question;

const COLUMNS: &str = "\
    id, paper_id, order_index, kind, prompt, options, marks, difficulty, \
    correct_option, blank_answers, case_sensitive, solution_text, solution_image, created_at";

pub(crate) async fn list_by_paper(
    executor: impl sqlx::PgExecutor<'_>,
    paper_id: &str,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions WHERE paper_id = $1 ORDER BY order_index, id"
    ))
    .bind(paper_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn find_in_paper(
    executor: impl sqlx::PgExecutor<'_>,
    paper_id: &str,
    question_id: &str,
) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions WHERE paper_id = $1 AND id = $2"
    ))
    .bind(paper_id)
    .bind(question_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn count_by_paper(
    executor: impl sqlx::PgExecutor<'_>,
    paper_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE paper_id = $1")
        .bind(paper_id)
        .fetch_one(executor)
        .await
}
