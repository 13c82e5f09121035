use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Client configuration. There is no CLI and no environment surface; these
/// defaults mirror the deployed backend and the UI constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the detection backend.
    pub backend_url: String,
    /// How long to wait for the auth backend to report a user before giving
    /// up, in milliseconds.
    pub auth_wait_ms: u64,
    /// Seek step for the rewind/forward controls, in seconds.
    pub seek_interval_secs: f64,
    /// Maximum number of evidence frames kept in the gallery and persisted
    /// on a record.
    pub max_heatmap_frames: usize,
    /// Request timeout for detection calls, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: "https://api.integrify.live".to_string(),
            auth_wait_ms: 3000,
            seek_interval_secs: 10.0,
            max_heatmap_frames: 6,
            request_timeout_secs: 300,
        }
    }
}

impl ClientConfig {
    pub fn auth_wait(&self) -> Duration {
        Duration::from_millis(self.auth_wait_ms)
    }
}
