//! Media pipeline error taxonomy, trimmed to the operations this crate
//! actually performs: download, last-frame extraction, stitch.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type MediaResult<T> = Result<T, MediaError>;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("ffmpeg not found on PATH")]
    FfmpegNotFound,

    #[error("ffmpeg failed (exit code {exit_code:?}): {message}\n{stderr}")]
    FfmpegFailed {
        message: String,
        stderr: String,
        exit_code: Option<i32>,
    },

    #[error("download failed: {message}")]
    DownloadFailed { message: String },

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("operation cancelled")]
    Cancelled,

    #[error("operation timed out after {0}s")]
    Timeout(u64),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl MediaError {
    pub fn download_failed(message: impl Into<String>) -> Self {
        MediaError::DownloadFailed {
            message: message.into(),
        }
    }

    pub fn ffmpeg_failed(message: impl Into<String>, stderr: impl Into<String>, exit_code: Option<i32>) -> Self {
        MediaError::FfmpegFailed {
            message: message.into(),
            stderr: stderr.into(),
            exit_code,
        }
    }
}
