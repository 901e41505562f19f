//! Service binary: wires Store -> Renderer Client -> Orchestrator (running
//! the Startup Reconciler, then resume-monitors, then the driver loop if
//! `auto_start_queue` is set) and serves the thin external-contract
//! `axum::Router`.

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use wanflow_api::{create_router, ApiConfig, AppState};
use wanflow_media::MediaConfig;
use wanflow_orchestrator::{Orchestrator, OrchestratorConfig};
use wanflow_renderer::{RendererClient, RendererConfig};
use wanflow_store::{Store, StoreConfig};

#[tokio::main]
async fn main() {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("failed to install rustls crypto provider");

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(EnvFilter::from_default_env().add_directive("wanflow=info".parse().unwrap()))
        .init();

    info!("starting wanflow-api");

    let store_config = StoreConfig::from_env();
    let store = match Store::connect(&store_config).await {
        Ok(s) => s,
        Err(e) => {
            error!("failed to open store: {e}");
            std::process::exit(1);
        }
    };

    let comfyui_url = store
        .get_setting("comfyui_url")
        .await
        .ok()
        .flatten()
        .unwrap_or_else(|| "http://localhost:8188".to_string());
    let renderer = RendererClient::new(RendererConfig::new(comfyui_url));
    let media = MediaConfig::from_env();
    let orchestrator_config = OrchestratorConfig::from_env();

    let mut orchestrator = match Orchestrator::boot(store, renderer, media, orchestrator_config).await {
        Ok(o) => o,
        Err(e) => {
            error!("orchestrator boot failed: {e}");
            std::process::exit(1);
        }
    };
    orchestrator.start_if_auto().await;

    let app_state = AppState::new(orchestrator.services().clone());
    let router = create_router(app_state);

    let api_config = ApiConfig::from_env();
    let listener = match tokio::net::TcpListener::bind(api_config.bind_addr()).await {
        Ok(l) => l,
        Err(e) => {
            error!("failed to bind {}: {e}", api_config.bind_addr());
            std::process::exit(1);
        }
    };
    info!(addr = %api_config.bind_addr(), "wanflow-api listening");

    let server = axum::serve(listener, router).with_graceful_shutdown(async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal");
    });

    if let Err(e) = server.await {
        error!("server error: {e}");
    }

    orchestrator.shutdown().await;
    info!("wanflow-api shutdown complete");
}
