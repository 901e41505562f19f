//! Completion Wait: polls the Renderer for one submitted prompt handle
//! until it completes, errors, or times out, then
//! runs the post-processing chain (download, extract last frame, upload,
//! chain-forward) shared by the driver loop, resume-monitors, and the
//! Reconciler's recovery path.

use std::time::Instant;

use tracing::{info, warn};
use wanflow_media::MediaConfig;
use wanflow_models::UploadRecord;
use wanflow_renderer::{PromptStatus, RendererClient};
use wanflow_store::Store;

use crate::config::OrchestratorConfig;
use crate::error::OrchestratorResult;
use crate::retry::FailureTracker;

/// Outcome of a Completion Wait: the caller (driver loop or
/// resume-monitor) decides what to do with the job from here.
pub enum CompletionOutcome {
    Completed,
    Failed(String),
}

/// Polls `get_prompt_status(handle)` until completion, error, or
/// execution timeout, then runs post-processing. Never returns `Err` for
/// a segment-level failure - those are reported as `CompletionOutcome`
/// so the caller can route them into `update_segment_status`.
pub async fn wait_for_completion(
    store: &Store,
    renderer: &RendererClient,
    media: &MediaConfig,
    http: &reqwest::Client,
    config: &OrchestratorConfig,
    job_id: i64,
    index: i32,
    handle: &str,
) -> OrchestratorResult<CompletionOutcome> {
    let deadline = Instant::now() + config.segment_execution_timeout();
    let mut tracker = FailureTracker::new(config.consecutive_error_threshold);

    loop {
        if Instant::now() >= deadline {
            return Ok(CompletionOutcome::Failed(format!(
                "timed out after {}s",
                config.segment_execution_timeout_secs
            )));
        }

        match renderer.get_prompt_status(handle).await {
            Ok(PromptStatus::Pending) => {
                tracker.record_success();
                tokio::time::sleep(config.status_poll_interval()).await;
            }
            Ok(PromptStatus::Error(message)) => {
                return Ok(CompletionOutcome::Failed(message));
            }
            Ok(PromptStatus::Completed(_)) => {
                tracker.record_success();
                return Ok(run_postprocessing(store, renderer, media, http, job_id, index, handle).await);
            }
            Err(e) if e.is_retryable() => {
                if tracker.record_failure() {
                    warn!(job_id, index, "completion wait transient error: {e}");
                }
                if tracker.failure_count() >= config.consecutive_error_threshold {
                    match reconnect_budget_wait(renderer, config).await {
                        true => tracker.record_success(),
                        false => {
                            return Ok(CompletionOutcome::Failed(format!(
                                "renderer unreachable for {}s (reconnect budget exhausted)",
                                config.reconnect_budget_secs
                            )))
                        }
                    }
                } else {
                    tokio::time::sleep(config.status_poll_interval()).await;
                }
            }
            Err(e) => {
                return Ok(CompletionOutcome::Failed(e.to_string()));
            }
        }
    }
}

/// Probes the Renderer every status-poll-interval until it reconnects or
/// the reconnect budget elapses. Returns `true` on reconnect. Shared with
/// the driver loop's queue-gate.
pub(crate) async fn reconnect_budget_wait(renderer: &RendererClient, config: &OrchestratorConfig) -> bool {
    let deadline = Instant::now() + config.reconnect_budget();
    while Instant::now() < deadline {
        let (ok, _) = renderer.check_connection().await;
        if ok {
            return true;
        }
        tokio::time::sleep(config.status_poll_interval()).await;
    }
    false
}

/// Download -> extract last frame -> upload -> persist -> chain-forward.
/// Any step failing produces a precise per-step `CompletionOutcome::Failed`
/// message naming which step failed.
pub(crate) async fn run_postprocessing(
    store: &Store,
    renderer: &RendererClient,
    media: &MediaConfig,
    http: &reqwest::Client,
    job_id: i64,
    index: i32,
    handle: &str,
) -> CompletionOutcome {
    let outputs = match renderer.get_output_media(handle).await {
        Ok(o) => o,
        Err(e) => return CompletionOutcome::Failed(format!("fetching output media: {e}")),
    };

    let Some(chosen) = select_output(&outputs) else {
        return CompletionOutcome::Failed(
            "renderer produced no .mp4/.webm/.gif output".to_string(),
        );
    };

    let video_path = media.segment_video_path(job_id, index);
    if let Err(e) = wanflow_media::download(http, &chosen.url, &video_path).await {
        return CompletionOutcome::Failed(format!("downloading segment video: {e}"));
    }

    finish_from_video(store, renderer, media, job_id, index, &video_path, Some(handle)).await
}

/// The tail half of post-processing, starting from an already-downloaded
/// video file: extract last frame, upload (dedup-protected), persist, and
/// chain-forward. Shared by the normal Completion Wait path and the
/// Reconciler's "video already on disk" recovery case, which skips the
/// download step entirely.
pub(crate) async fn finish_from_video(
    store: &Store,
    renderer: &RendererClient,
    media: &MediaConfig,
    job_id: i64,
    index: i32,
    video_path: &std::path::Path,
    handle: Option<&str>,
) -> CompletionOutcome {
    let frame_path = media.segment_last_frame_path(job_id, index);
    if let Err(e) = wanflow_media::extract_last_frame(&video_path, &frame_path).await {
        return CompletionOutcome::Failed(format!("extracting last frame: {e}"));
    }

    let frame_bytes = match tokio::fs::read(&frame_path).await {
        Ok(b) => b,
        Err(e) => return CompletionOutcome::Failed(format!("reading extracted frame: {e}")),
    };
    let content_hash = sha256_hex(&frame_bytes);

    let renderer_filename = match store.get_image_by_hash(&content_hash).await {
        Ok(Some(existing)) => existing.renderer_filename,
        Ok(None) => {
            let filename = frame_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| format!("segment_{job_id}_{index}_last_frame.jpg"));
            match renderer.upload_image(frame_bytes, &filename).await {
                Ok(name) => {
                    let record = UploadRecord {
                        content_hash: content_hash.clone(),
                        renderer_filename: name.clone(),
                        original_filename: Some(filename),
                        uploaded_at: chrono::Utc::now(),
                    };
                    if let Err(e) = store.store_uploaded_image(&record).await {
                        return CompletionOutcome::Failed(format!("recording upload dedup: {e}"));
                    }
                    name
                }
                Err(e) => return CompletionOutcome::Failed(format!("uploading extracted frame: {e}")),
            }
        }
        Err(e) => return CompletionOutcome::Failed(format!("checking upload dedup index: {e}")),
    };

    let execution_time = renderer.get_execution_time(handle).await.ok().flatten();

    if let Err(e) = store
        .update_segment_completion(
            job_id,
            index,
            &video_path.to_string_lossy(),
            &renderer_filename,
            execution_time,
        )
        .await
    {
        return CompletionOutcome::Failed(format!("persisting segment completion: {e}"));
    }

    // Chain-forward is a no-op if the next segment does not exist yet -
    // it will inherit the end-frame at creation time instead.
    match store.get_segment(job_id, index + 1).await {
        Ok(Some(_)) => {
            if let Err(e) = store
                .update_segment_start_image(job_id, index + 1, &renderer_filename)
                .await
            {
                return CompletionOutcome::Failed(format!(
                    "chaining end-frame to next segment: {e}"
                ));
            }
        }
        Ok(None) => {}
        Err(e) => return CompletionOutcome::Failed(format!("looking up next segment: {e}")),
    }

    info!(job_id, index, "segment completed");
    CompletionOutcome::Completed
}

fn select_output(outputs: &[wanflow_renderer::OutputMedia]) -> Option<&wanflow_renderer::OutputMedia> {
    const PRIORITY: [&str; 3] = [".mp4", ".webm", ".gif"];
    PRIORITY
        .iter()
        .find_map(|ext| outputs.iter().find(|o| o.filename.ends_with(ext)))
}

fn sha256_hex(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Converts a `CompletionOutcome::Failed` into the job-fatal message shape
/// ("Segment N+1 failed: <cause>"), 1-based for display.
pub fn job_failure_message(index: i32, cause: &str) -> String {
    format!("Segment {} failed: {}", index + 1, cause)
}
