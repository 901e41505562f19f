//! Shared data models for the wanflow segment-chaining orchestrator.
//!
//! This crate provides Serde-serializable types for:
//! - Jobs and their segments
//! - The per-segment LoRA pair slots and their legacy serialization forms
//! - The parameter bag persisted alongside each job
//! - Upload-dedup records and activity log entries

pub mod job;
pub mod lora;
pub mod parameters;
pub mod segment;
pub mod upload;

pub use job::{Job, JobStatus, NewJob, WorkflowKind};
pub use lora::{LoraEntry, LoraSlot};
pub use parameters::{FaceswapConfig, ParameterBag};
pub use segment::{NewSegment, Segment, SegmentStatus};
pub use upload::{ActivityLogEntry, LogLevel, UploadRecord};
