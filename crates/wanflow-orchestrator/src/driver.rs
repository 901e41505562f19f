//! Driver loop: the single primary worker that drives pending jobs in
//! priority order, one segment at a time, strictly sequentially - this
//! driver never runs two segments at once.

use std::time::Instant;

use tracing::{info, warn};
use wanflow_models::{JobStatus, SegmentStatus};

use crate::completion::{self, job_failure_message, reconnect_budget_wait, CompletionOutcome};
use crate::error::OrchestratorResult;
use crate::graph_build::build_graph_params;
use crate::services::Services;

const FALLBACK_HIGH_NOISE_MODEL: &str = "wan2.2_i2v_high_noise_14B_fp16.safetensors";
const FALLBACK_LOW_NOISE_MODEL: &str = "wan2.2_i2v_low_noise_14B_fp16.safetensors";

/// Drives the queue until `shutdown` fires. Each full pass through
/// `drive_once` is one driver-loop "tick"; between ticks it sleeps for
/// `driver_poll_interval_secs` (re-read from the settings table every
/// tick so an operator can retune it live).
pub async fn run(services: &Services, mut shutdown: tokio::sync::watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            info!("driver loop stopping");
            return;
        }

        let config = services.config.resolve(&services.store).await;
        match drive_once(services, &config).await {
            Ok(did_work) => {
                if !did_work {
                    tokio::select! {
                        _ = shutdown.changed() => {}
                        _ = tokio::time::sleep(config.driver_poll_interval()) => {}
                    }
                }
            }
            Err(e) => {
                warn!("driver tick failed: {e}");
                tokio::time::sleep(config.driver_poll_interval()).await;
            }
        }
    }
}

/// One driver-loop tick. Returns `Ok(true)` if a job was picked up and
/// processed (so the caller should not sleep before the next tick),
/// `Ok(false)` if there was nothing to do.
async fn drive_once(services: &Services, config: &crate::config::OrchestratorConfig) -> OrchestratorResult<bool> {
    let pending = services.store.get_pending_jobs().await?;
    let Some(job) = pending.into_iter().next() else {
        return Ok(false);
    };

    let (connected, reason) = services.renderer.check_connection().await;
    if !connected {
        warn!(job_id = job.id, "renderer unreachable ({reason}), leaving job pending");
        return Ok(false);
    }

    services
        .store
        .update_job_status(job.id, JobStatus::Running, None)
        .await?;

    let segments = services.store.list_segments(job.id).await?;
    let mut completed_count = segments
        .iter()
        .filter(|s| s.status == SegmentStatus::Completed)
        .count();

    'segments: for pos in 0..segments.len() {
        let segment = &segments[pos];
        if segment.status == SegmentStatus::Completed {
            continue;
        }

        if !segment.has_prompt() {
            services
                .store
                .update_job_status(job.id, JobStatus::AwaitingPrompt, None)
                .await?;
            return Ok(true);
        }

        if segment.index > 0 && segment.start_image.is_none() {
            let previous = &segments[pos - 1];
            match &previous.end_frame {
                Some(end_frame) => {
                    services
                        .store
                        .update_segment_start_image(job.id, segment.index, end_frame)
                        .await?;
                }
                None => break 'segments,
            }
        }

        if let Err(message) = queue_gate(services, config).await {
            fail_segment_and_job(services, job.id, segment.index, message).await?;
            return Ok(true);
        }

        let segment = services
            .store
            .get_segment(job.id, segment.index)
            .await?
            .ok_or(crate::error::OrchestratorError::SegmentNotFound {
                job_id: job.id,
                index: segment.index,
            })?;

        let (high_noise_model, low_noise_model) = resolve_noise_models(services).await;
        let params = build_graph_params(&job, &segment, high_noise_model, low_noise_model);
        let graph = match wanflow_graph::build_graph(services.template(), &params) {
            Ok(g) => g,
            Err(e) => {
                fail_segment_and_job(services, job.id, segment.index, format!("building graph: {e}"))
                    .await?;
                return Ok(true);
            }
        };

        let handle = match services.renderer.submit_graph(&graph).await {
            Ok(h) => h,
            Err(e) => {
                fail_segment_and_job(services, job.id, segment.index, e.to_string()).await?;
                return Ok(true);
            }
        };

        services
            .store
            .update_segment_prompt_handle(job.id, segment.index, &handle)
            .await?;
        services
            .store
            .update_segment_status(job.id, segment.index, SegmentStatus::Running, None)
            .await?;

        let outcome = completion::wait_for_completion(
            &services.store,
            &services.renderer,
            &services.media,
            &services.http,
            config,
            job.id,
            segment.index,
            &handle,
        )
        .await?;

        match outcome {
            CompletionOutcome::Completed => {
                completed_count += 1;
            }
            CompletionOutcome::Failed(cause) => {
                fail_segment_and_job(services, job.id, segment.index, cause).await?;
                return Ok(true);
            }
        }
    }

    if completed_count >= 1 {
        services
            .store
            .update_job_status(job.id, JobStatus::AwaitingPrompt, None)
            .await?;
    } else {
        let message = "no segments completed";
        services
            .store
            .update_job_status(job.id, JobStatus::Failed, Some(message))
            .await?;
        services.log_failure(job.id, None, message, None).await;
    }
    Ok(true)
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
    let message = job_failure_message(index, &cause);
    services
        .store
        .update_job_status(job_id, JobStatus::Failed, Some(&message))
        .await?;
    services
        .log_failure(job_id, Some(index), message, Some(cause))
        .await;
    Ok(())
}

/// Waits for the Renderer's queue to drain before a submission; a
/// connection loss mid-wait is handled via the same reconnect-budget
/// sub-loop the Completion Wait uses, counting against the overall
/// queue-idle-wait deadline.
async fn queue_gate(services: &Services, config: &crate::config::OrchestratorConfig) -> Result<(), String> {
    let deadline = Instant::now() + config.queue_idle_wait();
    let mut last_log = Instant::now() - config.queue_gate_log_every();

    loop {
        if Instant::now() >= deadline {
            return Err(config.queue_gate_timeout_message());
        }

        let status = services.renderer.get_queue_status().await;
        if !status.connected {
            if !reconnect_budget_wait(&services.renderer, config).await {
                return Err(config.queue_gate_timeout_message());
            }
            continue;
        }
        if status.is_empty() {
            return Ok(());
        }
        if last_log.elapsed() >= config.queue_gate_log_every() {
            info!(
                "renderer queue busy ({} running, {} pending), waiting",
                status.running.len(),
                status.pending.len()
            );
            last_log = Instant::now();
        }
        tokio::time::sleep(config.queue_gate_poll()).await;
    }
}

async fn resolve_noise_models(services: &Services) -> (String, String) {
    let high = services
        .store
        .get_setting("default_high_noise_model")
        .await
        .ok()
        .flatten()
        .unwrap_or_else(|| FALLBACK_HIGH_NOISE_MODEL.to_string());
    let low = services
        .store
        .get_setting("default_low_noise_model")
        .await
        .ok()
        .flatten()
        .unwrap_or_else(|| FALLBACK_LOW_NOISE_MODEL.to_string());
    (high, low)
}
