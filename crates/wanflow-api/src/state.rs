//! Shared router state: one `Arc<Services>`, `Clone` so axum can hand it
//! to every handler.

use std::sync::Arc;
use wanflow_orchestrator::Services;

#[derive(Clone)]
pub struct AppState {
    pub services: Arc<Services>,
}

impl AppState {
    pub fn new(services: Arc<Services>) -> Self {
        Self { services }
    }
}
