//! Finalize: invoked by the API layer once the caller is done adding
//! segments. Stitches every completed segment's video, in index order,
//! into one output file.

use std::path::PathBuf;

use chrono::Utc;
use wanflow_models::{JobStatus, SegmentStatus};

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::services::Services;

pub async fn finalize(services: &Services, job_id: i64) -> OrchestratorResult<PathBuf> {
    let job = services
        .store
        .get_job(job_id)
        .await?
        .ok_or(OrchestratorError::JobNotFound(job_id))?;

    let segments = services.store.list_segments(job_id).await?;
    let video_paths: Vec<PathBuf> = segments
        .iter()
        .filter(|s| s.status == SegmentStatus::Completed)
        .filter_map(|s| s.video_path.as_ref())
        .map(PathBuf::from)
        .filter(|p| p.exists())
        .collect();

    if video_paths.is_empty() {
        // User action error (spec.md §7): surfaced synchronously to the
        // caller, no job state change.
        let message = "no completed segment videos exist on disk".to_string();
        return Err(OrchestratorError::FinalizeFailed(message));
    }

    services
        .store
        .update_job_status(job_id, JobStatus::Running, None)
        .await?;

    let timestamp = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
    let dest = services.media.final_video_path(job_id, &job.name, &timestamp);

    if let Err(e) = wanflow_media::stitch(&video_paths, &dest).await {
        let message = format!("stitch failed: {e}");
        services
            .store
            .update_job_status(job_id, JobStatus::Failed, Some(&message))
            .await?;
        services.log_failure(job_id, None, message.clone(), Some(e.to_string())).await;
        return Err(OrchestratorError::FinalizeFailed(message));
    }

    let output = dest.to_string_lossy().to_string();
    services.store.finalize_job(job_id, &[output]).await?;
    Ok(dest)
}
