use crate::config::ServerConfig;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Instant;
use suzuno::{Admission, Library, WeightedPool};

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Media library over the configured root (shared across requests)
    pub library: Library,

    /// Prometheus recorder handle, present when metrics are enabled
    pub metrics: Option<PrometheusHandle>,

    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl ServerState {
    /// Create new server state with a fresh admission pool
    pub fn new(config: ServerConfig) -> Self {
        let pool: Arc<dyn Admission> = Arc::new(WeightedPool::new(config.admission_capacity));
        Self::with_pool(config, pool)
    }

    /// Create server state around an existing admission pool
    pub fn with_pool(config: ServerConfig, pool: Arc<dyn Admission>) -> Self {
        let library =
            Library::new(config.root.clone(), pool).with_batch_size(config.readdir_batch_size);

        Self {
            config: Arc::new(config),
            library,
            metrics: None,
            started_at: Instant::now(),
        }
    }

    /// Attach the Prometheus handle rendered by `/metrics`
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Admission pool shared by all thumbnail requests
    pub fn pool(&self) -> &Arc<dyn Admission> {
        self.library.pool()
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Server metadata for health checks
#[derive(Debug, serde::Serialize)]
pub struct ServerMetadata {
    pub version: String,
    pub uptime_seconds: u64,
}
