use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

/// Server configuration. Every field has a default so the server starts
/// with no environment at all; the binary loads overrides from `AIO_*`
/// variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Listen address (default: 0.0.0.0:8000)
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Directory holding `agent` artifacts.
    #[serde(default = "default_agent_dir")]
    pub agent_exec_dir: PathBuf,

    /// Directory holding `mcp` artifacts.
    #[serde(default = "default_mcp_dir")]
    pub mcp_exec_dir: PathBuf,

    /// Timeout applied when a request does not name one.
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,

    /// Upper bound for request-supplied timeouts.
    #[serde(default = "default_max_timeout_secs")]
    pub max_timeout_secs: u64,

    /// Per-stream capture limit for child stdout/stderr.
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,

    /// Request body limit for uploads.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Optional cap on simultaneous runs of one artifact path.
    #[serde(default)]
    pub max_concurrent_per_artifact: Option<usize>,

    /// CORS origins; `*` allows any.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// When set, logs are also written to daily-rotated files here.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("default timeout ({default}s) exceeds the maximum ({max}s)")]
    TimeoutOutOfRange { default: u64, max: u64 },
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

fn default_agent_dir() -> PathBuf {
    PathBuf::from("uploads/agent")
}

fn default_mcp_dir() -> PathBuf {
    PathBuf::from("uploads/mcp")
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_timeout_secs() -> u64 {
    300
}

fn default_max_output_bytes() -> usize {
    1024 * 1024
}

fn default_max_upload_bytes() -> usize {
    100 * 1024 * 1024
}

fn default_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            agent_exec_dir: default_agent_dir(),
            mcp_exec_dir: default_mcp_dir(),
            default_timeout_secs: default_timeout_secs(),
            max_timeout_secs: default_max_timeout_secs(),
            max_output_bytes: default_max_output_bytes(),
            max_upload_bytes: default_max_upload_bytes(),
            max_concurrent_per_artifact: None,
            allowed_origins: default_allowed_origins(),
            log_dir: None,
        }
    }
}

impl ServerConfig {
    /// Check cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_timeout_secs == 0 {
            return Err(ConfigError::Zero("default_timeout_secs"));
        }
        if self.max_timeout_secs == 0 {
            return Err(ConfigError::Zero("max_timeout_secs"));
        }
        if self.default_timeout_secs > self.max_timeout_secs {
            return Err(ConfigError::TimeoutOutOfRange {
                default: self.default_timeout_secs,
                max: self.max_timeout_secs,
            });
        }
        if self.max_output_bytes == 0 {
            return Err(ConfigError::Zero("max_output_bytes"));
        }
        if self.max_concurrent_per_artifact == Some(0) {
            return Err(ConfigError::Zero("max_concurrent_per_artifact"));
        }
        Ok(())
    }

    /// Clamp a caller-supplied timeout into `1..=max_timeout_secs`,
    /// falling back to the default when none is given.
    #[must_use]
    pub fn effective_timeout_secs(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.default_timeout_secs)
            .clamp(1, self.max_timeout_secs)
    }
}
