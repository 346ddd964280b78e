use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Media root; every served path resolves inside it
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Connections held open by the listener at once. Further connections
    /// wait in the OS backlog.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Work units in the thumbnail admission pool
    #[serde(default = "default_admission_capacity")]
    pub admission_capacity: u32,

    /// Directory entries read between cancellation checks
    #[serde(default = "default_readdir_batch_size")]
    pub readdir_batch_size: usize,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum request body size in MB (batch lookups)
    #[serde(default = "default_max_body_size_mb")]
    pub max_body_size_mb: usize,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Metrics endpoint enabled
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            root: default_root(),
            max_connections: default_max_connections(),
            admission_capacity: default_admission_capacity(),
            readdir_batch_size: default_readdir_batch_size(),
            timeout_secs: default_timeout_secs(),
            max_body_size_mb: default_max_body_size_mb(),
            enable_cors: default_true(),
            log_level: default_log_level(),
            metrics_enabled: default_true(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables and config files
    pub fn load() -> anyhow::Result<Self> {
        let builder = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::with_name("server").required(false))
            // Override with environment variables
            .add_source(config::Environment::with_prefix("SUZUNO_SERVER").separator("__"));

        let mut config: ServerConfig = builder.build()?.try_deserialize()?;

        // A pool smaller than one maximal request would park that request forever.
        if config.admission_capacity < suzuno::MAX_WEIGHT {
            tracing::warn!(
                "admission_capacity {} is below the maximum request weight, raising to {}",
                config.admission_capacity,
                suzuno::MAX_WEIGHT
            );
            config.admission_capacity = suzuno::MAX_WEIGHT;
        }
        config.max_connections = config.max_connections.max(1);

        Ok(config)
    }

    /// Replace the media root, as given on the command line
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get max body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_max_connections() -> usize {
    20
}

fn default_admission_capacity() -> u32 {
    suzuno::DEFAULT_CAPACITY
}

fn default_readdir_batch_size() -> usize {
    suzuno::READDIR_BATCH_SIZE
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_body_size_mb() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}
