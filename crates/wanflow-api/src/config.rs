//! HTTP server configuration, trimmed to the fields this thin surface
//! actually needs (no CORS/rate-limit/body-size knobs - those belong to
//! a full REST/UI surface this crate does not implement).

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            host: std::env::var("WANFLOW_API_HOST").unwrap_or(default.host),
            port: std::env::var("WANFLOW_API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.port),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
