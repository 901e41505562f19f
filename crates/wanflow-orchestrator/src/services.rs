//! The shared service bundle every orchestrator component (driver,
//! resume-monitor, reconciler, finalize, retry/reorder) is built around -
//! one `Arc<Services>` handed to each.

use serde_json::Value;
use wanflow_media::MediaConfig;
use wanflow_models::{ActivityLogEntry, LogLevel};
use wanflow_renderer::RendererClient;
use wanflow_store::Store;

use crate::config::OrchestratorConfig;
use crate::error::{OrchestratorError, OrchestratorResult};

pub struct Services {
    pub store: Store,
    pub renderer: RendererClient,
    pub media: MediaConfig,
    pub http: reqwest::Client,
    pub config: OrchestratorConfig,
    /// Parsed once at construction; `wanflow_graph::build_graph` is handed
    /// a fresh clone per submission so mutation never leaks across jobs.
    template: Value,
}

impl Services {
    pub fn new(
        store: Store,
        renderer: RendererClient,
        media: MediaConfig,
        config: OrchestratorConfig,
    ) -> OrchestratorResult<Self> {
        let template = wanflow_graph::template().map_err(OrchestratorError::from)?;
        Ok(Self {
            store,
            renderer,
            media,
            http: reqwest::Client::new(),
            config,
            template,
        })
    }

    pub fn template(&self) -> &Value {
        &self.template
    }

    /// Appends an `ERROR`-level activity log entry for a segment or job
    /// failure, carrying both the short message and, when available, a
    /// longer detail string, per spec.md §7's propagation policy. Logging
    /// failures here are themselves only `tracing::warn!`ed - a broken
    /// activity log must never mask the underlying failure being recorded.
    pub async fn log_failure(
        &self,
        job_id: i64,
        segment_index: Option<i32>,
        message: impl Into<String>,
        detail: Option<String>,
    ) {
        let entry = ActivityLogEntry {
            job_id,
            segment_index,
            timestamp: chrono::Utc::now(),
            level: LogLevel::Error,
            message: message.into(),
            detail,
        };
        if let Err(e) = self.store.append_log(&entry).await {
            tracing::warn!(job_id, "failed to append activity log entry: {e}");
        }
    }
}
