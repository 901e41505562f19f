//! Orchestrator tunables, each read from the environment with a
//! per-field `env::var(...).ok().and_then(...).unwrap_or(default)`
//! idiom. Every field named here is also a `settings` table key (schema.rs's
//! `DEFAULT_SETTINGS`) so an operator can retune the driver at runtime
//! without a restart; `resolve()` re-reads the table once per driver
//! iteration and falls back to the process-start value when a key is
//! absent or unparsable.

use std::time::Duration;
use wanflow_store::Store;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub driver_poll_interval_secs: u64,
    pub queue_idle_wait_secs: u64,
    pub segment_execution_timeout_secs: u64,
    pub reconnect_budget_secs: u64,
    pub status_poll_interval_secs: u64,
    /// Fixed - not a settings-table key.
    pub queue_gate_poll_secs: u64,
    /// Fixed - not a settings-table key.
    pub queue_gate_log_every_secs: u64,
    /// Consecutive Completion Wait errors before entering the
    /// reconnect-budget sub-loop.
    pub consecutive_error_threshold: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            driver_poll_interval_secs: 2,
            queue_idle_wait_secs: 1800,
            segment_execution_timeout_secs: 1200,
            reconnect_budget_secs: 600,
            status_poll_interval_secs: 1,
            queue_gate_poll_secs: 10,
            queue_gate_log_every_secs: 60,
            consecutive_error_threshold: 30,
        }
    }
}

impl OrchestratorConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            driver_poll_interval_secs: std::env::var("WANFLOW_DRIVER_POLL_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.driver_poll_interval_secs),
            queue_idle_wait_secs: std::env::var("WANFLOW_QUEUE_IDLE_WAIT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.queue_idle_wait_secs),
            segment_execution_timeout_secs: std::env::var("WANFLOW_SEGMENT_EXECUTION_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.segment_execution_timeout_secs),
            reconnect_budget_secs: std::env::var("WANFLOW_RECONNECT_BUDGET_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.reconnect_budget_secs),
            status_poll_interval_secs: std::env::var("WANFLOW_STATUS_POLL_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.status_poll_interval_secs),
            ..default
        }
    }

    /// Re-read the overridable fields from the Store's `settings` table,
    /// falling back to `self`'s value when the key is absent or fails to
    /// parse. Called once per driver-loop iteration.
    pub async fn resolve(&self, store: &Store) -> OrchestratorConfig {
        let mut resolved = self.clone();
        if let Some(v) = setting_u64(store, "queue_idle_wait_secs").await {
            resolved.queue_idle_wait_secs = v;
        }
        if let Some(v) = setting_u64(store, "segment_execution_timeout_secs").await {
            resolved.segment_execution_timeout_secs = v;
        }
        if let Some(v) = setting_u64(store, "reconnect_budget_secs").await {
            resolved.reconnect_budget_secs = v;
        }
        if let Some(v) = setting_u64(store, "driver_poll_interval_secs").await {
            resolved.driver_poll_interval_secs = v;
        }
        if let Some(v) = setting_u64(store, "status_poll_interval_secs").await {
            resolved.status_poll_interval_secs = v;
        }
        resolved
    }

    pub fn driver_poll_interval(&self) -> Duration {
        Duration::from_secs(self.driver_poll_interval_secs)
    }

    pub fn queue_idle_wait(&self) -> Duration {
        Duration::from_secs(self.queue_idle_wait_secs)
    }

    pub fn segment_execution_timeout(&self) -> Duration {
        Duration::from_secs(self.segment_execution_timeout_secs)
    }

    pub fn reconnect_budget(&self) -> Duration {
        Duration::from_secs(self.reconnect_budget_secs)
    }

    pub fn status_poll_interval(&self) -> Duration {
        Duration::from_secs(self.status_poll_interval_secs)
    }

    pub fn queue_gate_poll(&self) -> Duration {
        Duration::from_secs(self.queue_gate_poll_secs)
    }

    pub fn queue_gate_log_every(&self) -> Duration {
        Duration::from_secs(self.queue_gate_log_every_secs)
    }

    /// Exact message operators grep their logs for.
    pub fn queue_gate_timeout_message(&self) -> String {
        format!(
            "ComfyUI queue did not clear after {} minutes...",
            self.queue_idle_wait_secs / 60
        )
    }
}

async fn setting_u64(store: &Store, key: &str) -> Option<u64> {
    store.get_setting(key).await.ok().flatten()?.parse().ok()
}
