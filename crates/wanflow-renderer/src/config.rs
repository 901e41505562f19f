//! Renderer Client configuration.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub media_timeout: Duration,
    /// `get_loras` filters to this sub-namespace prefix, matching the
    /// source's `wan2.2/` filter.
    pub lora_namespace: String,
}

impl RendererConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: Duration::from_secs(
                std::env::var("WANFLOW_RENDERER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            media_timeout: Duration::from_secs(
                std::env::var("WANFLOW_MEDIA_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
            lora_namespace: std::env::var("WANFLOW_LORA_NAMESPACE")
                .unwrap_or_else(|_| "wan2.2/".to_string()),
        }
    }
}
