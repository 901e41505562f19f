//! Thin external-contract surface: exposes the handful of user-triggered
//! actions the orchestrator actually needs from the outside world (the
//! full REST/UI/auth surface lives elsewhere), plus a liveness probe, as
//! a minimal `axum::Router`, and the `main()` wiring that boots the
//! Store, Renderer Client, and Orchestrator in order.

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
