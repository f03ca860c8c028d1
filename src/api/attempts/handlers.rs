use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::schemas::attempt::{
    AnswerResponse, ExamDataResponse, QuestionPayload, ResultResponse, SaveAnswerRequest,
    SaveAnswerResponse, StartAttemptRequest, StartAttemptResponse, SubmitResponse, TooHardRequest,
};
use crate::services::attempts::StartSettings;
use crate::services::grading::Submission;
use crate::services::rankings::Standing;

pub(super) async fn start_attempt(
    Path(paper_id): Path<String>,
    CurrentUser(student_id): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<StartAttemptRequest>,
) -> Result<(StatusCode, Json<StartAttemptResponse>), ApiError> {
    let settings = StartSettings {
        no_time_limit: payload.no_time_limit,
        show_answer_after_wrong: payload.show_answer_after_wrong,
        enable_solution_view: payload.enable_solution_view,
    };
    let started = state.engine().start(&paper_id, &student_id, settings).await?;
    let status = if started.resumed { StatusCode::OK } else { StatusCode::CREATED };
    Ok((status, Json(started)))
}

pub(super) async fn exam_data(
    Path(attempt_id): Path<String>,
    CurrentUser(student_id): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ExamDataResponse>, ApiError> {
    Ok(Json(state.engine().exam_data(&attempt_id, &student_id).await?))
}

pub(super) async fn get_question(
    Path((attempt_id, index)): Path<(String, usize)>,
    CurrentUser(student_id): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<QuestionPayload>, ApiError> {
    Ok(Json(state.engine().get_question(&attempt_id, &student_id, index).await?))
}

pub(super) async fn next_question(
    Path(attempt_id): Path<String>,
    CurrentUser(student_id): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<QuestionPayload>, ApiError> {
    Ok(Json(state.engine().next_question(&attempt_id, &student_id).await?))
}

pub(super) async fn previous_question(
    Path(attempt_id): Path<String>,
    CurrentUser(student_id): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<QuestionPayload>, ApiError> {
    Ok(Json(state.engine().previous_question(&attempt_id, &student_id).await?))
}

pub(super) async fn save_answer(
    Path((attempt_id, question_id)): Path<(String, String)>,
    CurrentUser(student_id): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<SaveAnswerRequest>,
) -> Result<Json<SaveAnswerResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let submission =
        Submission { selected_option: payload.selected_option, answer_text: payload.answer_text };
    let saved =
        state.engine().save_answer(&attempt_id, &student_id, &question_id, submission).await?;
    Ok(Json(saved))
}

pub(super) async fn mark_for_review(
    Path((attempt_id, question_id)): Path<(String, String)>,
    CurrentUser(student_id): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<AnswerResponse>, ApiError> {
    Ok(Json(state.engine().mark_for_review(&attempt_id, &student_id, &question_id).await?))
}

pub(super) async fn mark_too_hard(
    Path((attempt_id, question_id)): Path<(String, String)>,
    CurrentUser(student_id): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<TooHardRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let flag = payload
        .flag()
        .ok_or_else(|| ApiError::BadRequest("isTooHard must be a boolean".to_string()))?;

    let answer =
        state.engine().mark_too_hard(&attempt_id, &student_id, &question_id, flag).await?;
    Ok(Json(answer))
}

pub(super) async fn submit_attempt(
    Path(attempt_id): Path<String>,
    CurrentUser(student_id): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<SubmitResponse>, ApiError> {
    Ok(Json(state.engine().submit(&attempt_id, &student_id).await?))
}

pub(super) async fn attempt_result(
    Path(attempt_id): Path<String>,
    CurrentUser(student_id): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ResultResponse>, ApiError> {
    Ok(Json(state.engine().result(&attempt_id, &student_id).await?))
}

pub(super) async fn my_standing(
    CurrentUser(student_id): CurrentUser,
    State(state): State<AppState>,
) -> Json<Standing> {
    Json(state.engine().standing(&student_id).await)
}
