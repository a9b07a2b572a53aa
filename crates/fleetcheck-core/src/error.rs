//! Error types for check configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for configuration loading and validation.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised before any discovery or probe traffic is sent.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("discovery server URL is required")]
    MissingDiscovery,

    #[error("service is required")]
    MissingService,

    #[error("invalid discovery URL {url}: {source}")]
    InvalidDiscoveryUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("timeout must be greater than zero")]
    InvalidTimeout,

    #[error("deadline must be greater than zero")]
    InvalidDeadline,

    #[error("max in-flight probes must be greater than zero")]
    InvalidConcurrency,

    #[error("warn threshold ({warn}) must not be lower than crit threshold ({crit})")]
    ThresholdOrder { warn: u32, crit: u32 },

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid arguments: {0}")]
    Arguments(String),
}
