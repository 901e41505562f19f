//! Wire types for the Renderer's ComfyUI-like HTTP surface.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
pub struct UploadImageResponse {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitRequest<'a> {
    pub prompt: &'a Value,
    pub client_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitSuccessResponse {
    pub prompt_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitErrorBody {
    #[serde(default)]
    pub error: Option<SubmitErrorDetail>,
    #[serde(default)]
    pub node_errors: HashMap<String, NodeErrorDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitErrorDetail {
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeErrorDetail {
    pub class_type: Option<String>,
    #[serde(default)]
    pub errors: Vec<Value>,
}

#[derive(Debug, Clone)]
pub enum PromptStatus {
    Pending,
    Completed(HistoryRecord),
    Error(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryRecord {
    #[serde(default)]
    pub status: Option<HistoryStatus>,
    #[serde(default)]
    pub outputs: HashMap<String, NodeOutputs>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryStatus {
    #[serde(default)]
    pub status_str: Option<String>,
    #[serde(default)]
    pub execution_time: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeOutputs {
    #[serde(default)]
    pub images: Vec<MediaRef>,
    #[serde(default)]
    pub videos: Vec<MediaRef>,
    #[serde(default)]
    pub gifs: Vec<MediaRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaRef {
    pub filename: String,
    #[serde(default)]
    pub subfolder: String,
    #[serde(rename = "type", default = "default_media_type")]
    pub media_type: String,
}

fn default_media_type() -> String {
    "output".to_string()
}

#[derive(Debug, Clone)]
pub struct OutputMedia {
    pub url: String,
    pub filename: String,
}

#[derive(Debug, Clone, Default)]
pub struct QueueStatus {
    pub running: Vec<String>,
    pub pending: Vec<String>,
    pub connected: bool,
    pub error: Option<String>,
}

impl QueueStatus {
    pub fn is_empty(&self) -> bool {
        self.running.is_empty() && self.pending.is_empty()
    }

    pub fn total_len(&self) -> usize {
        self.running.len() + self.pending.len()
    }
}
