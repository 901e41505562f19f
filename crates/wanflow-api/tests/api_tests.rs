//! End-to-end router tests against a real tempdir-backed store and a
//! `wiremock` stand-in Renderer, driven through `tower::ServiceExt::oneshot`.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wanflow_api::{create_router, AppState};
use wanflow_media::MediaConfig;
use wanflow_models::{JobStatus, NewJob, ParameterBag, WorkflowKind};
use wanflow_orchestrator::{Orchestrator, OrchestratorConfig};
use wanflow_renderer::{RendererClient, RendererConfig};
use wanflow_store::{Store, StoreConfig};

async fn test_app() -> (axum::Router, tempfile::TempDir, MockServer) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store_config = StoreConfig {
        database_path: dir.path().join("queue.db"),
    };
    let store = Store::connect(&store_config).await.expect("connect");

    let renderer_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/system_stats"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&renderer_server)
        .await;

    let renderer = RendererClient::new(RendererConfig::new(renderer_server.uri()));
    let media = MediaConfig {
        output_root: dir.path().join("output"),
    };

    let orchestrator = Orchestrator::boot(store, renderer, media, OrchestratorConfig::default())
        .await
        .expect("boot");
    let state = AppState::new(orchestrator.services().clone());
    (create_router(state), dir, renderer_server)
}

#[tokio::test]
async fn healthz_returns_ok() {
    let (app, _dir, _server) = test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn retry_on_unknown_job_returns_not_found() {
    let (app, _dir, _server) = test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/jobs/999/retry")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn retry_on_pending_job_is_rejected_as_conflict() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store_config = StoreConfig {
        database_path: dir.path().join("queue.db"),
    };
    let store = Store::connect(&store_config).await.expect("connect");
    let job = store
        .create_job(NewJob {
            name: "demo".into(),
            prompt: "a cat runs".into(),
            negative_prompt: None,
            workflow_kind: WorkflowKind::ImageToVideo,
            parameters: ParameterBag::default(),
            input_image: Some("input.jpg".into()),
            seed: None,
        })
        .await
        .expect("create_job");
    assert_eq!(job.status, JobStatus::Pending);

    let renderer_server = MockServer::start().await;
    let renderer = RendererClient::new(RendererConfig::new(renderer_server.uri()));
    let media = MediaConfig {
        output_root: dir.path().join("output"),
    };
    let orchestrator = Orchestrator::boot(store, renderer, media, OrchestratorConfig::default())
        .await
        .expect("boot");
    let state = AppState::new(orchestrator.services().clone());
    let app = create_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/jobs/{}/retry", job.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn submit_segment_prompt_on_unknown_job_returns_not_found() {
    let (app, _dir, _server) = test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/jobs/42/segments")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"prompt": "the cat jumps"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
