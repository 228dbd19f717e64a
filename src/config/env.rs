use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::policy::Policy;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub policy: Policy,
    pub surface: SurfaceConfig,
    pub bridge: BridgeConfig,
    pub directories: DirectoryConfig,
    pub logging: LoggingConfig,
}

/// Classification and report service.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: Url,
    pub request_timeout: Duration,
    pub report_timeout: Duration,
}

/// Extension pages the host sends tabs to.
#[derive(Debug, Clone)]
pub struct SurfaceConfig {
    pub warning_page: Url,
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub max_inbound_frame: usize,
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub logs_dir: String,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
