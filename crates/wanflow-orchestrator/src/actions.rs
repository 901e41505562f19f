//! User-triggered actions: submitting a new segment prompt, retry,
//! reopen, and queue reordering. Each validates the job's current state
//! synchronously and mutates nothing on a rejected request.

use wanflow_models::{JobStatus, LoraSlot, Segment};

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::services::Services;

/// `create_next_segment` plus the `awaiting_prompt -> pending` flip.
pub async fn submit_segment_prompt(
    services: &Services,
    job_id: i64,
    prompt: String,
    high_lora: LoraSlot,
    low_lora: LoraSlot,
) -> OrchestratorResult<Segment> {
    let job = services
        .store
        .get_job(job_id)
        .await?
        .ok_or(OrchestratorError::JobNotFound(job_id))?;

    if prompt.trim().is_empty() {
        return Err(OrchestratorError::InvalidRequest(
            "segment prompt must not be empty".to_string(),
        ));
    }

    let segment = services
        .store
        .create_next_segment(job_id, Some(prompt), high_lora, low_lora)
        .await?;

    if job.status == JobStatus::AwaitingPrompt {
        services
            .store
            .update_job_status(job_id, JobStatus::Pending, None)
            .await?;
    }

    Ok(segment)
}

/// Retry: `failed`/`cancelled` jobs only.
pub async fn retry(services: &Services, job_id: i64) -> OrchestratorResult<()> {
    let job = services
        .store
        .get_job(job_id)
        .await?
        .ok_or(OrchestratorError::JobNotFound(job_id))?;

    if !matches!(job.status, JobStatus::Failed | JobStatus::Cancelled) {
        return Err(OrchestratorError::InvalidRequest(format!(
            "cannot retry job {job_id} in status '{}'",
            job.status
        )));
    }

    services.store.reset_segments_for_retry(job_id).await?;
    services
        .store
        .update_job_status(job_id, JobStatus::Pending, Some(""))
        .await?;
    services.store.move_job_to_bottom(job_id).await?;
    Ok(())
}

/// Reopen: `completed -> awaiting_prompt` only.
pub async fn reopen(services: &Services, job_id: i64) -> OrchestratorResult<()> {
    let job = services
        .store
        .get_job(job_id)
        .await?
        .ok_or(OrchestratorError::JobNotFound(job_id))?;

    if job.status != JobStatus::Completed {
        return Err(OrchestratorError::InvalidRequest(format!(
            "cannot reopen job {job_id} in status '{}'",
            job.status
        )));
    }

    services
        .store
        .update_job_status(job_id, JobStatus::AwaitingPrompt, Some(""))
        .await?;
    Ok(())
}

/// Reorder: only `pending` jobs, swap with the adjacent pending
/// neighbor. Store already restricts the swap to the pending set and
/// reports whether anything moved.
pub async fn move_up(services: &Services, job_id: i64) -> OrchestratorResult<()> {
    if !services.store.move_job_up(job_id).await? {
        return Err(OrchestratorError::InvalidRequest(format!(
            "job {job_id} cannot move up (not pending, or already at the top)"
        )));
    }
    Ok(())
}

pub async fn move_down(services: &Services, job_id: i64) -> OrchestratorResult<()> {
    if !services.store.move_job_down(job_id).await? {
        return Err(OrchestratorError::InvalidRequest(format!(
            "job {job_id} cannot move down (not pending, or already at the bottom)"
        )));
    }
    Ok(())
}

pub async fn move_to_bottom(services: &Services, job_id: i64) -> OrchestratorResult<()> {
    if !services.store.move_job_to_bottom(job_id).await? {
        return Err(OrchestratorError::InvalidRequest(format!(
            "job {job_id} cannot move to bottom (not pending)"
        )));
    }
    Ok(())
}
