//! The segment-chaining job orchestrator: the driver loop, Completion
//! Wait, Finalize, Retry/Reorder/Reopen user actions, and the Startup
//! Reconciler, all built around one shared `Services` bundle handed out
//! as `Arc<Services>` - a single owned service instance constructed at
//! boot.

pub mod actions;
pub mod completion;
pub mod config;
pub mod driver;
pub mod error;
pub mod finalize;
pub mod graph_build;
pub mod reconciler;
pub mod retry;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use wanflow_media::MediaConfig;
use wanflow_renderer::RendererClient;
use wanflow_store::Store;

pub use config::OrchestratorConfig;
pub use error::{OrchestratorError, OrchestratorResult};
pub use services::Services;

const SHUTDOWN_JOIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Owns the whole orchestrator lifecycle: boot (Store ready -> Reconciler
/// runs -> resume-monitors spawned -> driver started if
/// `auto_start_queue` is set), the shutdown signal, and teardown (stop
/// the driver, join resume-monitors best-effort, drop the Renderer
/// client). Constructed once per process.
pub struct Orchestrator {
    services: Arc<Services>,
    shutdown_tx: tokio::sync::watch::Sender<bool>,
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
    resume_handles: Vec<tokio::task::JoinHandle<()>>,
    driver_handle: Option<tokio::task::JoinHandle<()>>,
}

impl Orchestrator {
    /// Runs the Startup Reconciler and returns an `Orchestrator` with the
    /// driver loop not yet started; call `start_if_auto` or
    /// `start_driver` next.
    pub async fn boot(
        store: Store,
        renderer: RendererClient,
        media: MediaConfig,
        config: OrchestratorConfig,
    ) -> OrchestratorResult<Self> {
        let services = Arc::new(Services::new(store, renderer, media, config)?);
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

        info!("orchestrator: running startup reconciler");
        let resume_handles = reconciler::reconcile(&services).await?;
        info!(
            resumed = resume_handles.len(),
            "orchestrator: reconciliation complete"
        );

        Ok(Self {
            services,
            shutdown_tx,
            shutdown_rx,
            resume_handles,
            driver_handle: None,
        })
    }

    pub fn services(&self) -> &Arc<Services> {
        &self.services
    }

    /// Starts the driver loop if the `auto_start_queue` setting is
    /// `"true"` (the default). No-op otherwise, and no-op if already
    /// started.
    pub async fn start_if_auto(&mut self) {
        let auto_start = self
            .services
            .store
            .get_setting("auto_start_queue")
            .await
            .ok()
            .flatten()
            .map(|v| v == "true")
            .unwrap_or(true);
        if auto_start {
            self.start_driver();
        } else {
            info!("orchestrator: auto_start_queue disabled, driver not started");
        }
    }

    /// Starts the driver loop unconditionally. Idempotent.
    pub fn start_driver(&mut self) {
        if self.driver_handle.is_some() {
            return;
        }
        let services = Arc::clone(&self.services);
        let shutdown_rx = self.shutdown_rx.clone();
        self.driver_handle = Some(tokio::spawn(async move {
            driver::run(&services, shutdown_rx).await;
        }));
        info!("orchestrator: driver loop started");
    }

    /// Signals the driver loop to stop at its next poll tick. Cancellation
    /// is honored at the next polling tick, never mid-flight.
    pub fn stop_driver(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Stops the driver and joins it plus every resume-monitor
    /// best-effort, each bounded so a hung task can't block shutdown
    /// forever. The Renderer client (a plain `reqwest::Client`) needs no
    /// explicit close; it is dropped with `services`.
    pub async fn shutdown(mut self) {
        self.stop_driver();
        if let Some(handle) = self.driver_handle.take() {
            let _ = tokio::time::timeout(SHUTDOWN_JOIN_TIMEOUT, handle).await;
        }
        for handle in self.resume_handles.drain(..) {
            let _ = tokio::time::timeout(SHUTDOWN_JOIN_TIMEOUT, handle).await;
        }
        info!("orchestrator: shutdown complete");
    }
}
