mod handlers;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/papers/:paper_id/attempts", post(handlers::start_attempt))
        .route("/attempts/:attempt_id", get(handlers::exam_data))
        .route("/attempts/:attempt_id/questions/:index", get(handlers::get_question))
        .route("/attempts/:attempt_id/next", get(handlers::next_question))
        .route("/attempts/:attempt_id/previous", get(handlers::previous_question))
        .route("/attempts/:attempt_id/answers/:question_id", put(handlers::save_answer))
        .route("/attempts/:attempt_id/answers/:question_id/review", post(handlers::mark_for_review))
        .route("/attempts/:attempt_id/answers/:question_id/too-hard", post(handlers::mark_too_hard))
        .route("/attempts/:attempt_id/submit", post(handlers::submit_attempt))
        .route("/attempts/:attempt_id/result", get(handlers::attempt_result))
        .route("/students/me/standing", get(handlers::my_standing))
}

#[cfg(test)]
mod tests;
