//! Job domain type and its state machine.

use crate::parameters::ParameterBag;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    AwaitingPrompt,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::AwaitingPrompt => "awaiting_prompt",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "running" => Some(JobStatus::Running),
            "awaiting_prompt" => Some(JobStatus::AwaitingPrompt),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            "cancelled" => Some(JobStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Carried for schema/back-compat with the `workflow_type` column;
/// the orchestrator only ever creates `ImageToVideo` jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    Txt2Img,
    Img2Img,
    ImageToVideo,
}

impl WorkflowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowKind::Txt2Img => "txt2img",
            WorkflowKind::Img2Img => "img2img",
            WorkflowKind::ImageToVideo => "image_to_video",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s {
            "txt2img" => Some(WorkflowKind::Txt2Img),
            "img2img" => Some(WorkflowKind::Img2Img),
            "image_to_video" => Some(WorkflowKind::ImageToVideo),
            _ => None,
        }
    }
}

/// Fields supplied by the caller when creating a job; the Store assigns
/// `id`, `priority`, and `seed` (unless a seed is explicitly provided).
#[derive(Debug, Clone)]
pub struct NewJob {
    pub name: String,
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub workflow_kind: WorkflowKind,
    pub parameters: ParameterBag,
    pub input_image: Option<String>,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub name: String,
    pub status: JobStatus,
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub workflow_kind: WorkflowKind,
    pub parameters: ParameterBag,
    pub input_image: Option<String>,
    pub output_media: Vec<String>,
    pub comfyui_prompt_id: Option<String>,
    pub priority: i64,
    pub seed: u64,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_as_str() {
        for status in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::AwaitingPrompt,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Cancelled,
        ] {
            assert_eq!(JobStatus::from_str_loose(status.as_str()), Some(status));
        }
    }

    #[test]
    fn only_terminal_statuses_report_terminal() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(!JobStatus::AwaitingPrompt.is_terminal());
    }
}
