use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 客户端配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the device registration service.
    pub registration_url: String,
    /// Base URL of the subscription service.
    pub subscription_url: String,
    /// WebSocket endpoint of the push transport.
    pub transport_url: String,
    /// Sender identity sent with token requests.
    pub sender_id: String,
    pub timeout_seconds: u64,
    /// Directory holding the token preferences file. `None` selects the
    /// platform data directory.
    pub store_dir: Option<PathBuf>,
    /// Repeat the (idempotent) register call when a stored token is found.
    pub reregister_on_start: bool,
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            registration_url: "http://127.0.0.1:3000/device".to_string(),
            subscription_url: "http://127.0.0.1:3000/push".to_string(),
            transport_url: "ws://127.0.0.1:3000/transport".to_string(),
            sender_id: "pushsync".to_string(),
            timeout_seconds: 30,
            store_dir: None,
            reregister_on_start: false,
        }
    }
}
