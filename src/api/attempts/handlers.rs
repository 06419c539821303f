use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::db::types::SectionId;
use crate::schemas::attempt::{
    result_response, AnswerUpsert, AttemptCreate, AttemptStateResponse, AttemptSummaryResponse,
    FreeTextUpsert, SectionResultResponse,
};

pub(crate) async fn create_attempt(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(payload): Json<AttemptCreate>,
) -> Result<(StatusCode, Json<AttemptStateResponse>), ApiError> {
    let snapshot = state.sessions().create_attempt(&user_id, payload.mode).await?;
    Ok((StatusCode::CREATED, Json(AttemptStateResponse::from_snapshot(&snapshot))))
}

pub(crate) async fn list_attempts(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Vec<AttemptSummaryResponse>>, ApiError> {
    let history = state.sessions().list_history(&user_id).await?;
    Ok(Json(history.iter().map(AttemptSummaryResponse::from_summary).collect()))
}

pub(crate) async fn get_attempt(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(attempt_id): Path<String>,
) -> Result<Json<AttemptStateResponse>, ApiError> {
    let snapshot = state.sessions().get_state(&user_id, &attempt_id).await?;
    Ok(Json(AttemptStateResponse::from_snapshot(&snapshot)))
}

pub(crate) async fn restore_attempt(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(attempt_id): Path<String>,
) -> Result<Json<AttemptStateResponse>, ApiError> {
    let snapshot = state.sessions().restore_attempt(&user_id, &attempt_id).await?;
    Ok(Json(AttemptStateResponse::from_snapshot(&snapshot)))
}

pub(crate) async fn pause_attempt(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(attempt_id): Path<String>,
) -> Result<Json<AttemptStateResponse>, ApiError> {
    let snapshot = state.sessions().pause(&user_id, &attempt_id).await?;
    Ok(Json(AttemptStateResponse::from_snapshot(&snapshot)))
}

pub(crate) async fn resume_attempt(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(attempt_id): Path<String>,
) -> Result<Json<AttemptStateResponse>, ApiError> {
    let snapshot = state.sessions().resume(&user_id, &attempt_id).await?;
    Ok(Json(AttemptStateResponse::from_snapshot(&snapshot)))
}

pub(crate) async fn complete_attempt(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(attempt_id): Path<String>,
) -> Result<Json<AttemptStateResponse>, ApiError> {
    let snapshot = state.sessions().complete_attempt(&user_id, &attempt_id).await?;
    Ok(Json(AttemptStateResponse::from_snapshot(&snapshot)))
}

pub(crate) async fn abandon_attempt(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(attempt_id): Path<String>,
) -> Result<Json<AttemptStateResponse>, ApiError> {
    let snapshot = state.sessions().abandon_attempt(&user_id, &attempt_id).await?;
    Ok(Json(AttemptStateResponse::from_snapshot(&snapshot)))
}

pub(crate) async fn select_section(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path((attempt_id, section)): Path<(String, SectionId)>,
) -> Result<Json<AttemptStateResponse>, ApiError> {
    let snapshot = state.sessions().select_section(&user_id, &attempt_id, section).await?;
    Ok(Json(AttemptStateResponse::from_snapshot(&snapshot)))
}

pub(crate) async fn select_part(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path((attempt_id, section, part)): Path<(String, SectionId, u32)>,
) -> Result<Json<AttemptStateResponse>, ApiError> {
    let snapshot = state.sessions().select_part(&user_id, &attempt_id, section, part).await?;
    Ok(Json(AttemptStateResponse::from_snapshot(&snapshot)))
}

pub(crate) async fn upsert_answer(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path((attempt_id, section)): Path<(String, SectionId)>,
    Json(payload): Json<AnswerUpsert>,
) -> Result<Json<AttemptStateResponse>, ApiError> {
    payload.validate().map_err(|err| ApiError::BadRequest(err.to_string()))?;

    let snapshot = state
        .sessions()
        .record_answer(&user_id, &attempt_id, section, &payload.question_id, &payload.value)
        .await?;
    Ok(Json(AttemptStateResponse::from_snapshot(&snapshot)))
}

pub(crate) async fn upsert_free_text(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path((attempt_id, section, part)): Path<(String, SectionId, u32)>,
    Json(payload): Json<FreeTextUpsert>,
) -> Result<Json<AttemptStateResponse>, ApiError> {
    payload.validate().map_err(|err| ApiError::BadRequest(err.to_string()))?;

    let snapshot = state
        .sessions()
        .record_free_text(&user_id, &attempt_id, section, part, &payload.text)
        .await?;
    Ok(Json(AttemptStateResponse::from_snapshot(&snapshot)))
}

pub(crate) async fn submit_section(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path((attempt_id, section)): Path<(String, SectionId)>,
) -> Result<Json<SectionResultResponse>, ApiError> {
    let result = state.sessions().submit_section(&user_id, &attempt_id, section).await?;
    Ok(Json(result_response(&result)))
}
