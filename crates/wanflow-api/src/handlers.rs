//! The user-action handlers plus a liveness probe. Each handler body
//! just forwards to `wanflow_orchestrator::actions`/`finalize`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use wanflow_models::{LoraSlot, Segment};
use wanflow_orchestrator::{actions, finalize};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}

pub async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().to_rfc3339(),
    })
}

#[derive(Deserialize)]
pub struct SubmitSegmentPromptRequest {
    pub prompt: String,
    #[serde(default)]
    pub high_lora: LoraSlot,
    #[serde(default)]
    pub low_lora: LoraSlot,
}

/// Submits a new segment prompt; if the job was waiting on one, unblocks it.
pub async fn submit_segment_prompt(
    State(state): State<AppState>,
    Path(job_id): Path<i64>,
    Json(body): Json<SubmitSegmentPromptRequest>,
) -> Result<Json<Segment>, ApiError> {
    let segment = actions::submit_segment_prompt(
        &state.services,
        job_id,
        body.prompt,
        body.high_lora,
        body.low_lora,
    )
    .await?;
    Ok(Json(segment))
}

#[derive(Serialize)]
pub struct FinalizeResponse {
    pub output_path: String,
}

/// Stitches all completed segment videos into the final output.
pub async fn finalize_job(
    State(state): State<AppState>,
    Path(job_id): Path<i64>,
) -> Result<Json<FinalizeResponse>, ApiError> {
    let dest = finalize::finalize(&state.services, job_id).await?;
    Ok(Json(FinalizeResponse {
        output_path: dest.to_string_lossy().to_string(),
    }))
}

/// Retries a failed or cancelled job, preserving completed segments.
pub async fn retry_job(
    State(state): State<AppState>,
    Path(job_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    actions::retry(&state.services, job_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Reopens a completed job so another segment can be added.
pub async fn reopen_job(
    State(state): State<AppState>,
    Path(job_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    actions::reopen(&state.services, job_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReorderDirection {
    Up,
    Down,
    Bottom,
}

#[derive(Deserialize)]
pub struct ReorderRequest {
    pub direction: ReorderDirection,
}

/// Moves a pending job up, down, or to the bottom of the queue,
/// selected by the request body's `direction`.
pub async fn reorder_job(
    State(state): State<AppState>,
    Path(job_id): Path<i64>,
    Json(body): Json<ReorderRequest>,
) -> Result<StatusCode, ApiError> {
    match body.direction {
        ReorderDirection::Up => actions::move_up(&state.services, job_id).await?,
        ReorderDirection::Down => actions::move_down(&state.services, job_id).await?,
        ReorderDirection::Bottom => actions::move_to_bottom(&state.services, job_id).await?,
    }
    Ok(StatusCode::NO_CONTENT)
}
