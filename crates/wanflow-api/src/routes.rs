//! Router assembly: the five user-action routes plus `/healthz`. The
//! full REST/UI/auth/rate-limiting surface lives in a separate service
//! and is not reproduced here.

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    finalize_job, healthz, reopen_job, reorder_job, retry_job, submit_segment_prompt,
};
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let job_routes = Router::new()
        .route("/jobs/:job_id/segments", post(submit_segment_prompt))
        .route("/jobs/:job_id/finalize", post(finalize_job))
        .route("/jobs/:job_id/retry", post(retry_job))
        .route("/jobs/:job_id/reopen", post(reopen_job))
        .route("/jobs/:job_id/reorder", post(reorder_job));

    Router::new()
        .route("/healthz", get(healthz))
        .merge(job_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
