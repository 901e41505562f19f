//! Segment domain type and its state machine.

use crate::lora::LoraSlot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentStatus {
    Pending,
    Running,
    Completed,
    Failed,
    NeedsRecovery,
}

impl SegmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentStatus::Pending => "pending",
            SegmentStatus::Running => "running",
            SegmentStatus::Completed => "completed",
            SegmentStatus::Failed => "failed",
            SegmentStatus::NeedsRecovery => "needs_recovery",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SegmentStatus::Pending),
            "running" => Some(SegmentStatus::Running),
            "completed" => Some(SegmentStatus::Completed),
            "failed" => Some(SegmentStatus::Failed),
            "needs_recovery" => Some(SegmentStatus::NeedsRecovery),
            _ => None,
        }
    }
}

impl fmt::Display for SegmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct NewSegment {
    pub job_id: i64,
    pub prompt: Option<String>,
    pub high_lora: LoraSlot,
    pub low_lora: LoraSlot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub job_id: i64,
    pub index: i32,
    pub status: SegmentStatus,
    pub prompt: Option<String>,
    pub start_image: Option<String>,
    pub end_frame: Option<String>,
    pub video_path: Option<String>,
    pub comfyui_prompt_id: Option<String>,
    pub execution_time_seconds: Option<f64>,
    pub error_message: Option<String>,
    pub high_lora: LoraSlot,
    pub low_lora: LoraSlot,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Segment {
    pub fn has_prompt(&self) -> bool {
        self.prompt.as_deref().is_some_and(|p| !p.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(index: i32) -> Segment {
        Segment {
            job_id: 1,
            index,
            status: SegmentStatus::Pending,
            prompt: Some("a cat runs".into()),
            start_image: Some("img.jpg".into()),
            end_frame: None,
            video_path: None,
            comfyui_prompt_id: None,
            execution_time_seconds: None,
            error_message: None,
            high_lora: LoraSlot::empty(),
            low_lora: LoraSlot::empty(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    #[test]
    fn has_prompt_false_when_empty() {
        let mut s = sample(0);
        s.prompt = Some(String::new());
        assert!(!s.has_prompt());
    }

    #[test]
    fn has_prompt_true_when_set() {
        let s = sample(0);
        assert!(s.has_prompt());
    }
}
