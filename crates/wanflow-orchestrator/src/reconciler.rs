//! Startup Reconciler: a one-shot pass run once at process boot, before
//! the driver loop starts, that reconciles persisted `running` state
//! against the Renderer's own history/queue and the local filesystem.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};
use wanflow_models::{JobStatus, Segment, SegmentStatus};
use wanflow_renderer::PromptStatus;

use crate::completion::{self, CompletionOutcome};
use crate::error::OrchestratorResult;
use crate::services::Services;

/// Runs the full reconciliation pass and returns the resume-monitor
/// tasks spawned for segments whose submission survived the restart and
/// are still active in the Renderer's queue. The caller (startup
/// sequence) keeps these join handles around to join best-effort at
/// teardown; it never needs to await them directly.
pub async fn reconcile(services: &Arc<Services>) -> OrchestratorResult<Vec<tokio::task::JoinHandle<()>>> {
    let mut resume_handles = Vec::new();

    for segment in services.store.get_running_segments().await? {
        reconcile_running_segment(services, segment, &mut resume_handles).await?;
    }

    reset_orphaned_running_jobs(services).await?;
    synchronize_failed_jobs(services).await?;

    let recovered_job_ids = recover_needs_recovery_segments(services).await?;
    promote_fully_completed_jobs(services, &recovered_job_ids).await?;

    Ok(resume_handles)
}

/// Applies the four-way branch to one `running` segment: video already
/// on disk, renderer history shows completed, still active in the
/// renderer queue, or orphaned.
async fn reconcile_running_segment(
    services: &Arc<Services>,
    segment: Segment,
    resume_handles: &mut Vec<tokio::task::JoinHandle<()>>,
) -> OrchestratorResult<()> {
    let job_id = segment.job_id;
    let index = segment.index;

    let Some(handle) = segment.comfyui_prompt_id.clone() else {
        warn!(job_id, index, "reconciler: running segment has no prompt handle, resetting to pending");
        services
            .store
            .update_segment_status(job_id, index, SegmentStatus::Pending, Some(""))
            .await?;
        return Ok(());
    };

    let video_path = services.media.segment_video_path(job_id, index);
    if video_path.exists() {
        info!(job_id, index, "reconciler: video already on disk, finishing post-processing");
        let outcome =
            completion::finish_from_video(&services.store, &services.renderer, &services.media, job_id, index, &video_path, Some(&handle))
                .await;
        if let CompletionOutcome::Failed(cause) = outcome {
            warn!(job_id, index, "reconciler: post-processing of recovered video failed: {cause}");
            fail_segment_and_job(services, job_id, index, cause).await?;
        }
        return Ok(());
    }

    let history_completed = matches!(
        services.renderer.get_prompt_status(&handle).await,
        Ok(PromptStatus::Completed(_))
    );
    if history_completed {
        info!(job_id, index, "reconciler: renderer history shows completed, marking needs_recovery");
        services
            .store
            .update_segment_status(job_id, index, SegmentStatus::NeedsRecovery, None)
            .await?;
        return Ok(());
    }

    let queue = services.renderer.get_queue_status().await;
    if queue.connected && (queue.running.contains(&handle) || queue.pending.contains(&handle)) {
        info!(job_id, index, "reconciler: still active in renderer queue, spawning resume monitor");
        let services = Arc::clone(services);
        resume_handles.push(tokio::spawn(async move {
            run_resume_monitor(services, job_id, index, handle).await;
        }));
        return Ok(());
    }

    warn!(job_id, index, "reconciler: prompt handle not found in history, queue, or on disk; resetting to pending");
    services
        .store
        .update_segment_status(job_id, index, SegmentStatus::Pending, Some(""))
        .await?;
    Ok(())
}

/// A short-lived worker that re-enters the normal Completion Wait for a
/// prompt handle whose submission survived the restart, then applies the
/// same job-level bookkeeping the driver loop would have.
async fn run_resume_monitor(services: Arc<Services>, job_id: i64, index: i32, handle: String) {
    let config = services.config.resolve(&services.store).await;
    let outcome = completion::wait_for_completion(
        &services.store,
        &services.renderer,
        &services.media,
        &services.http,
        &config,
        job_id,
        index,
        &handle,
    )
    .await;

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(job_id, index, "resume monitor errored: {e}");
            return;
        }
    };

    if let Err(e) = apply_resumed_outcome(&services, job_id, index, outcome).await {
        warn!(job_id, index, "resume monitor failed to persist outcome: {e}");
    }
}

/// After a resumed segment's Completion Wait finishes, decides the job's
/// next status: back to `pending` if a later segment already has a
/// prompt waiting (the driver should keep going), otherwise
/// `awaiting_prompt` (the user decides next). Mirrors the driver loop's
/// end-of-chain decision for the single-segment case a resume monitor
/// handles.
async fn apply_resumed_outcome(
    services: &Services,
    job_id: i64,
    index: i32,
    outcome: CompletionOutcome,
) -> OrchestratorResult<()> {
    match outcome {
        CompletionOutcome::Completed => {
            let segments = services.store.list_segments(job_id).await?;
            let has_further_work = segments
                .iter()
                .any(|s| s.index > index && s.status == SegmentStatus::Pending && s.has_prompt());
            let next_status = if has_further_work {
                JobStatus::Pending
            } else {
                JobStatus::AwaitingPrompt
            };
            services.store.update_job_status(job_id, next_status, None).await?;
        }
        CompletionOutcome::Failed(cause) => {
            fail_segment_and_job(services, job_id, index, cause).await?;
        }
    }
    Ok(())
}

async fn fail_segment_and_job(
    services: &Services,
    job_id: i64,
    index: i32,
    cause: String,
) -> OrchestratorResult<()> {
    services
        .store
        .update_segment_status(job_id, index, SegmentStatus::Failed, Some(&cause))
        .await?;
    let message = completion::job_failure_message(index, &cause);
    services.store.update_job_status(job_id, JobStatus::Failed, Some(&message)).await?;
    services
        .log_failure(job_id, Some(index), message, Some(cause))
        .await;
    Ok(())
}

/// For each `running` job whose segments no longer contain any
/// `running`, resets the job to `pending`. Runs after the per-segment
/// pass above, which may have just moved every one of a job's running
/// segments into `needs_recovery`/`pending`/a resume-monitor.
async fn reset_orphaned_running_jobs(services: &Services) -> OrchestratorResult<()> {
    for job in services.store.get_running_jobs().await? {
        let segments = services.store.list_segments(job.id).await?;
        let still_running = segments.iter().any(|s| s.status == SegmentStatus::Running);
        if !still_running {
            info!(job_id = job.id, "reconciler: no running segment left, resetting job to pending");
            services.store.update_job_status(job.id, JobStatus::Pending, None).await?;
        }
    }
    Ok(())
}

/// Any segment still `running` whose job is `failed` and whose prompt
/// handle is not active in the Renderer queue gets failed with "Job
/// failed during processing".
async fn synchronize_failed_jobs(services: &Services) -> OrchestratorResult<()> {
    let queue = services.renderer.get_queue_status().await;
    for job in services.store.get_jobs_by_status(JobStatus::Failed).await? {
        for segment in services.store.list_segments(job.id).await? {
            if segment.status != SegmentStatus::Running {
                continue;
            }
            let active = segment
                .comfyui_prompt_id
                .as_deref()
                .is_some_and(|h| queue.running.iter().any(|r| r == h) || queue.pending.iter().any(|p| p == h));
            if !active {
                warn!(job_id = job.id, index = segment.index, "reconciler: job failed but segment still running locally, synchronizing");
                services
                    .store
                    .update_segment_status(job.id, segment.index, SegmentStatus::Failed, Some("Job failed during processing"))
                    .await?;
                services
                    .log_failure(job.id, Some(segment.index), "Job failed during processing", None)
                    .await;
            }
        }
    }
    Ok(())
}

/// After reconciliation, for every segment in `needs_recovery`, runs the
/// recovery path (download + extract + upload + chain-forward). Returns
/// the set of job ids touched, for the completion sweep below.
async fn recover_needs_recovery_segments(services: &Services) -> OrchestratorResult<HashSet<i64>> {
    let mut touched = HashSet::new();
    for segment in services.store.get_needs_recovery_segments().await? {
        touched.insert(segment.job_id);
        let Some(handle) = segment.comfyui_prompt_id.clone() else {
            warn!(job_id = segment.job_id, index = segment.index, "reconciler: needs_recovery segment has no prompt handle");
            fail_segment_and_job(
                services,
                segment.job_id,
                segment.index,
                "needs_recovery segment has no renderer prompt handle".to_string(),
            )
            .await?;
            continue;
        };

        let outcome = completion::run_postprocessing(
            &services.store,
            &services.renderer,
            &services.media,
            &services.http,
            segment.job_id,
            segment.index,
            &handle,
        )
        .await;

        if let CompletionOutcome::Failed(cause) = outcome {
            warn!(job_id = segment.job_id, index = segment.index, "reconciler: recovery failed: {cause}");
            fail_segment_and_job(services, segment.job_id, segment.index, cause).await?;
        }
    }
    Ok(touched)
}

/// For any job whose segments are all `completed`, transitions it to
/// `awaiting_prompt` with cleared error, scoped to the jobs the recovery
/// batch above actually touched.
async fn promote_fully_completed_jobs(services: &Services, job_ids: &HashSet<i64>) -> OrchestratorResult<()> {
    for &job_id in job_ids {
        if services.store.all_segments_completed(job_id).await? {
            info!(job_id, "reconciler: all segments completed after recovery, awaiting prompt");
            services
                .store
                .update_job_status(job_id, JobStatus::AwaitingPrompt, Some(""))
                .await?;
        }
    }
    Ok(())
}
