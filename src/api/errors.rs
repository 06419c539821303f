use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::session::SessionError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    detail: String,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    ServiceUnavailable(String),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::AttemptNotFound => Self::NotFound("Exam attempt not found".to_string()),
            SessionError::AttemptConflict => {
                Self::Conflict("Another exam attempt is already in progress".to_string())
            }
            SessionError::SectionAlreadySubmitted => {
                Self::Conflict("Section already submitted".to_string())
            }
            SessionError::SubmissionInFlight => {
                Self::Conflict("Section submission already in progress".to_string())
            }
            SessionError::StaleOperation => {
                Self::Conflict("Attempt finished while the operation was running".to_string())
            }
            SessionError::IncompleteSections(missing) => Self::BadRequest(format!(
                "Sections not yet scored: {}",
                missing.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
            )),
            SessionError::InvalidState(detail) => Self::BadRequest(detail.to_string()),
            SessionError::GenerationFailed(detail) => {
                tracing::error!(error = %detail, "Content generation failed");
                Self::ServiceUnavailable("Content generation is unavailable".to_string())
            }
            SessionError::ScoringFailed(detail) => {
                tracing::error!(error = %detail, "Scoring failed");
                Self::ServiceUnavailable("Scoring is unavailable".to_string())
            }
            SessionError::Storage(err) => Self::internal(err, "Attempt storage failed"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(message) => {
                let status = StatusCode::UNAUTHORIZED;
                let mut response = (
                    status,
                    Json(ErrorResponse { status: status.as_u16(), detail: message.to_string() }),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                response
            }
            ApiError::BadRequest(message) => {
                let status = StatusCode::BAD_REQUEST;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::NotFound(message) => {
                let status = StatusCode::NOT_FOUND;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::Conflict(message) => {
                let status = StatusCode::CONFLICT;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::ServiceUnavailable(message) => {
                tracing::error!(error = %message, "Service unavailable");
                let status = StatusCode::SERVICE_UNAVAILABLE;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                (status, Json(ErrorResponse { status: status.as_u16(), detail: message }))
                    .into_response()
            }
        }
    }
}
