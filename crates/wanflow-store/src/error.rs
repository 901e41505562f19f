//! Store error taxonomy.

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("job {0} not found")]
    JobNotFound(i64),

    #[error("segment {job_id}/{index} not found")]
    SegmentNotFound { job_id: i64, index: i32 },

    #[error("malformed row: {0}")]
    Malformed(String),
}
