//! Orchestrator error taxonomy. Each variant lets callers tell a caller
//! error (no state change) apart from a segment-fatal or job-fatal
//! failure.

use thiserror::Error;
use wanflow_graph::GraphError;
use wanflow_media::MediaError;
use wanflow_store::StoreError;

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("job {0} not found")]
    JobNotFound(i64),

    #[error("segment {job_id}/{index} not found")]
    SegmentNotFound { job_id: i64, index: i32 },

    /// Renderer runtime error during execution, or an unrecoverable
    /// submit rejection - segment-fatal.
    #[error("segment failed: {0}")]
    SegmentFailed(String),

    /// Queue-wait, execution, or reconnect-budget timeout - segment-fatal.
    #[error("{kind} timed out after {seconds}s")]
    Timeout { kind: &'static str, seconds: u64 },

    /// Stitch failure at finalize - job-fatal.
    #[error("finalize failed: {0}")]
    FinalizeFailed(String),

    /// User action errors: surfaced synchronously, no state mutated.
    #[error("{0}")]
    InvalidRequest(String),
}
