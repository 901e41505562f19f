//! Thin HTTP wrapper over the Renderer's ComfyUI-like surface: a
//! config-from-env constructor plus a typed request/response method per
//! wire endpoint.

use crate::config::RendererConfig;
use crate::error::{RendererError, SubmitError};
use crate::types::*;
use serde_json::Value;

pub struct RendererClient {
    http: reqwest::Client,
    config: RendererConfig,
}

impl RendererClient {
    pub fn new(config: RendererConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("renderer http client should build");
        Self { http, config }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// 200 on `/system_stats` counts as healthy. A connect-level failure
    /// is reported with the same message the source uses; any other
    /// error is reported via its own `Display`.
    pub async fn check_connection(&self) -> (bool, String) {
        match self.http.get(self.url("/system_stats")).send().await {
            Ok(resp) if resp.status().is_success() => (true, "ok".to_string()),
            Ok(resp) => (false, format!("unexpected status {}", resp.status())),
            Err(e) if e.is_connect() => (
                false,
                "Connection refused - is the renderer running?".to_string(),
            ),
            Err(e) => (false, e.to_string()),
        }
    }

    async fn get_object_info_field(
        &self,
        class_name: &str,
        field: &str,
    ) -> Result<Vec<String>, RendererError> {
        let resp = self
            .http
            .get(self.url(&format!("/object_info/{class_name}")))
            .send()
            .await?
            .error_for_status()?;
        let body: Value = resp.json().await?;
        let values = body
            .pointer(&format!("/{class_name}/input/required/{field}/0"))
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();
        Ok(values)
    }

    pub async fn get_checkpoints(&self) -> Result<Vec<String>, RendererError> {
        self.get_object_info_field("CheckpointLoaderSimple", "ckpt_name")
            .await
    }

    pub async fn get_samplers(&self) -> Result<Vec<String>, RendererError> {
        self.get_object_info_field("KSampler", "sampler_name").await
    }

    pub async fn get_schedulers(&self) -> Result<Vec<String>, RendererError> {
        self.get_object_info_field("KSampler", "scheduler").await
    }

    pub async fn get_loras(&self) -> Result<Vec<String>, RendererError> {
        let resp = self
            .http
            .get(self.url("/models/loras"))
            .send()
            .await?
            .error_for_status()?;
        let all: Vec<String> = resp.json().await?;
        let mut filtered: Vec<String> = all
            .into_iter()
            .filter(|name| name.starts_with(&self.config.lora_namespace))
            .collect();
        filtered.sort();
        Ok(filtered)
    }

    pub async fn upload_image(
        &self,
        bytes: Vec<u8>,
        filename: &str,
    ) -> Result<String, RendererError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("image", part);
        let resp = self
            .http
            .post(self.url("/upload/image"))
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;
        let body: UploadImageResponse = resp.json().await?;
        body.name
            .ok_or_else(|| RendererError::InvalidResponse("upload response missing name".into()))
    }

    pub async fn submit_graph(&self, graph: &Value) -> Result<String, SubmitError> {
        let client_id = uuid::Uuid::new_v4().to_string();
        let body = SubmitRequest {
            prompt: graph,
            client_id,
        };
        let resp = self
            .http
            .post(self.url("/prompt"))
            .json(&body)
            .send()
            .await
            .map_err(RendererError::from)?;

        if resp.status().is_success() {
            let parsed: SubmitSuccessResponse =
                resp.json().await.map_err(RendererError::from)?;
            return Ok(parsed.prompt_id);
        }

        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        let Ok(body) = serde_json::from_str::<SubmitErrorBody>(&text) else {
            return Err(SubmitError::Other(format!(
                "submit failed ({status}): {text}"
            )));
        };

        if let Some((node_id, detail)) = body.node_errors.iter().next() {
            let errors_str = detail
                .errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            if errors_str.to_lowercase().contains("image") {
                return Err(SubmitError::MissingImage(errors_str));
            }
            return Err(SubmitError::MissingNode {
                node_id: node_id.clone(),
                class_type: detail.class_type.clone().unwrap_or_default(),
                errors: errors_str,
            });
        }

        let message = body
            .error
            .and_then(|e| e.message)
            .unwrap_or(text);
        Err(SubmitError::Other(message))
    }

    pub async fn get_prompt_status(
        &self,
        handle: &str,
    ) -> Result<PromptStatus, RendererError> {
        let resp = self
            .http
            .get(self.url(&format!("/history/{handle}")))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(RendererError::InvalidResponse(format!(
                "unexpected status {}",
                resp.status()
            )));
        }
        let body: std::collections::HashMap<String, HistoryRecord> = resp.json().await?;
        let Some(record) = body.get(handle) else {
            return Ok(PromptStatus::Pending);
        };
        if let Some(status) = &record.status {
            if status.status_str.as_deref() == Some("error") {
                return Ok(PromptStatus::Error(
                    status.status_str.clone().unwrap_or_default(),
                ));
            }
        }
        Ok(PromptStatus::Completed(record.clone()))
    }

    /// Never returns `Err`: on any connection failure this reports
    /// `connected: false` with empty lists, so the Orchestrator can tell
    /// "renderer down" from "renderer busy".
    pub async fn get_queue_status(&self) -> QueueStatus {
        let resp = match self.http.get(self.url("/queue")).send().await {
            Ok(r) => r,
            Err(e) => {
                return QueueStatus {
                    connected: false,
                    error: Some(e.to_string()),
                    ..Default::default()
                }
            }
        };
        if !resp.status().is_success() {
            return QueueStatus {
                connected: false,
                error: Some(format!("unexpected status {}", resp.status())),
                ..Default::default()
            };
        }
        let body: Value = match resp.json().await {
            Ok(b) => b,
            Err(e) => {
                return QueueStatus {
                    connected: false,
                    error: Some(e.to_string()),
                    ..Default::default()
                }
            }
        };
        let extract_ids = |key: &str| -> Vec<String> {
            body.get(key)
                .and_then(|v| v.as_array())
                .map(|arr| {
                    arr.iter()
                        .filter_map(|entry| entry.get(1).and_then(|v| v.as_str()))
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default()
        };
        QueueStatus {
            running: extract_ids("queue_running"),
            pending: extract_ids("queue_pending"),
            connected: true,
            error: None,
        }
    }

    pub async fn get_output_media(
        &self,
        handle: &str,
    ) -> Result<Vec<OutputMedia>, RendererError> {
        let status = self.get_prompt_status(handle).await?;
        let PromptStatus::Completed(record) = status else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        for node_outputs in record.outputs.values() {
            for media in node_outputs
                .images
                .iter()
                .chain(node_outputs.videos.iter())
                .chain(node_outputs.gifs.iter())
            {
                let url = format!(
                    "{}/view?filename={}&subfolder={}&type={}",
                    self.config.base_url.trim_end_matches('/'),
                    media.filename,
                    media.subfolder,
                    media.media_type
                );
                out.push(OutputMedia {
                    url,
                    filename: media.filename.clone(),
                });
            }
        }
        Ok(out)
    }

    pub async fn get_execution_time(&self, handle: &str) -> Result<Option<f64>, RendererError> {
        let status = self.get_prompt_status(handle).await?;
        let PromptStatus::Completed(record) = status else {
            return Ok(None);
        };
        Ok(record.status.and_then(|s| s.execution_time))
    }

    pub async fn download_media(&self, url: &str, dest: &std::path::Path) -> Result<(), RendererError> {
        let resp = self
            .http
            .get(url)
            .timeout(self.config.media_timeout)
            .send()
            .await?
            .error_for_status()?;
        let bytes = resp.bytes().await?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                RendererError::InvalidResponse(format!("failed to prepare dest dir: {e}"))
            })?;
        }
        tokio::fs::write(dest, &bytes).await.map_err(|e| {
            RendererError::InvalidResponse(format!("failed to write media: {e}"))
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(base_url: String) -> RendererClient {
        RendererClient::new(RendererConfig::new(base_url))
    }

    #[tokio::test]
    async fn check_connection_reports_connection_refused() {
        let client = client_for("http://127.0.0.1:1".to_string());
        let (ok, msg) = client.check_connection().await;
        assert!(!ok);
        assert!(!msg.is_empty());
    }

    #[tokio::test]
    async fn check_connection_succeeds_on_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/system_stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;
        let client = client_for(server.uri());
        let (ok, _) = client.check_connection().await;
        assert!(ok);
    }

    #[tokio::test]
    async fn get_queue_status_never_fails_on_connection_error() {
        let client = client_for("http://127.0.0.1:1".to_string());
        let status = client.get_queue_status().await;
        assert!(!status.connected);
        assert!(status.is_empty());
    }

    #[tokio::test]
    async fn get_queue_status_parses_running_and_pending() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/queue"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "queue_running": [[0, "abc"]],
                "queue_pending": [[0, "def"], [1, "ghi"]],
            })))
            .mount(&server)
            .await;
        let client = client_for(server.uri());
        let status = client.get_queue_status().await;
        assert!(status.connected);
        assert_eq!(status.running, vec!["abc".to_string()]);
        assert_eq!(status.total_len(), 3);
    }

    #[tokio::test]
    async fn get_loras_filters_to_namespace_and_sorts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models/loras"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                "wan2.2/zeta.safetensors",
                "other/foo.safetensors",
                "wan2.2/alpha.safetensors",
            ])))
            .mount(&server)
            .await;
        let client = client_for(server.uri());
        let loras = client.get_loras().await.unwrap();
        assert_eq!(
            loras,
            vec![
                "wan2.2/alpha.safetensors".to_string(),
                "wan2.2/zeta.safetensors".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn submit_graph_classifies_missing_image_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/prompt"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "node_errors": {
                    "89": {
                        "class_type": "LoadImage",
                        "errors": ["Required input is missing: image"]
                    }
                }
            })))
            .mount(&server)
            .await;
        let client = client_for(server.uri());
        let graph = serde_json::json!({});
        let err = client.submit_graph(&graph).await.unwrap_err();
        assert!(matches!(err, SubmitError::MissingImage(_)));
    }

    #[tokio::test]
    async fn submit_graph_returns_prompt_id_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/prompt"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "prompt_id": "abc-123" })),
            )
            .mount(&server)
            .await;
        let client = client_for(server.uri());
        let graph = serde_json::json!({});
        let id = client.submit_graph(&graph).await.unwrap();
        assert_eq!(id, "abc-123");
    }
}
