//! Renderer Client error taxonomy: a `thiserror` enum with an
//! `is_retryable()` classifier, split in two so the Completion Wait and
//! the submit path never share an error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RendererError {
    #[error("connection refused - is the renderer running?")]
    ConnectionRefused,

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid response from renderer: {0}")]
    InvalidResponse(String),
}

impl RendererError {
    /// Connection-level failures are the only ones the Orchestrator's
    /// consecutive-error counter should count against the reconnect
    /// budget; a malformed response is a bug, not a transient outage.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RendererError::ConnectionRefused | RendererError::Network(_))
    }
}

/// Structured failure from `POST /prompt`, preserving per-node errors so
/// the Orchestrator can classify missing-image vs. missing-node vs.
/// other.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("renderer rejected submission: missing image '{0}'")]
    MissingImage(String),

    #[error("renderer rejected submission: missing node '{class_type}' ({node_id}): {errors}")]
    MissingNode {
        node_id: String,
        class_type: String,
        errors: String,
    },

    #[error("renderer rejected submission: {0}")]
    Other(String),

    #[error(transparent)]
    Network(#[from] RendererError),
}
