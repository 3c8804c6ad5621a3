//! Service configuration
//!
//! Device parameters are read once at startup into an explicit
//! [`DeviceConfig`] and passed into the transport; nothing reads the
//! environment after construction.

use cardpass_device::DeviceConfig;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub device: DeviceConfig,
    pub database_path: String,
}

impl Config {
    pub fn from_env() -> Self {
        let host =
            std::env::var("CARD_DEVICE_HOST").unwrap_or_else(|_| "127.0.0.1".into());
        let port = std::env::var("CARD_DEVICE_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(7700);
        let timeout_secs = std::env::var("CARD_DEVICE_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(60);

        Self {
            device: DeviceConfig::new(host, port)
                .with_timeout(Duration::from_secs(timeout_secs)),
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "cardpass.db".into()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
