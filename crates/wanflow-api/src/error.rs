//! Maps `OrchestratorError` onto HTTP status codes: user action errors
//! are surfaced synchronously to the caller with no state change.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use wanflow_orchestrator::OrchestratorError;

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

pub struct ApiError(OrchestratorError);

impl From<OrchestratorError> for ApiError {
    fn from(e: OrchestratorError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            OrchestratorError::JobNotFound(_) | OrchestratorError::SegmentNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            OrchestratorError::InvalidRequest(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorResponse {
            detail: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
