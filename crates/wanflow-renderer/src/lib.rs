pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::RendererClient;
pub use config::RendererConfig;
pub use error::{RendererError, SubmitError};
pub use types::{
    HistoryRecord, HistoryStatus, MediaRef, NodeOutputs, OutputMedia, PromptStatus, QueueStatus,
};
