//! Server initialization and routing
//!
//! This module handles the Axum server setup including:
//! - Router configuration with all endpoints
//! - Middleware stack (liveness, logging, compression, etc.)
//! - Connection limiting and graceful shutdown

use crate::config::ServerConfig;
use crate::listener::LimitedListener;
use crate::middleware::{log_requests, request_id, track_liveness};
use crate::routes::{api_info, health, media, meta, not_found};
use crate::state::ServerState;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Build the Axum router with all routes and middleware
///
/// Middleware stack, innermost first:
/// 1. Compression (JSON and service routes only)
/// 2. Liveness tracking (cancelled when the request future is dropped)
/// 3. Timeout handling
/// 4. Body size limit
/// 5. CORS
/// 6. Request logging
/// 7. Request ID tracking
/// 8. HTTP tracing
///
/// Liveness sits inside the timeout so a request that times out is
/// observed as cancelled by the work it started. `/file` and `/thumbnail`
/// bodies go out unencoded: their strong ETags and byte ranges describe
/// the stored bytes.
pub fn build_router(state: Arc<ServerState>) -> Router {
    // CORS layer
    let cors = if state.config.enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    let service_routes = Router::new()
        .route("/", get(api_info))
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        .route("/metadata", get(health::server_metadata));

    let meta_routes = Router::new()
        .route("/meta/directory", get(meta::list_root))
        .route("/meta/directory/", get(meta::list_root))
        .route("/meta/directory/{*path}", get(meta::list_directory))
        .route("/meta/batch", post(meta::lookup_batch));

    let media_routes = Router::new()
        .route("/file/{*path}", get(media::serve_file))
        .route("/thumbnail/{*path}", get(media::serve_thumbnail));

    Router::new()
        .merge(
            service_routes
                .merge(meta_routes)
                .layer(CompressionLayer::new()),
        )
        .merge(media_routes)
        .fallback(not_found)
        .layer(from_fn(track_liveness))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.config.timeout(),
        ))
        .layer(DefaultBodyLimit::max(state.config.max_body_size()))
        .layer(cors)
        .layer(from_fn(log_requests))
        .layer(from_fn(request_id))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the media server
///
/// Initializes logging and metrics, then serves the configured root until
/// SIGTERM or Ctrl+C.
///
/// # Example
///
/// ```rust,no_run
/// use server::ServerConfig;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = ServerConfig::load()?;
///     server::start_server(config).await?;
///     Ok(())
/// }
/// ```
///
/// # Initialization
///
/// 1. Sets up structured JSON logging with the configured log level
/// 2. Installs the Prometheus recorder when metrics are enabled
/// 3. Creates shared server state (library, admission pool)
/// 4. Binds to the configured TCP address behind a connection limit
/// 5. Starts the HTTP server with graceful shutdown support
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .json()
        .init();

    let mut state = ServerState::new(config.clone());
    if config.metrics_enabled {
        let handle = PrometheusBuilder::new().install_recorder()?;
        state = state.with_metrics(handle);
    }
    let state = Arc::new(state);

    let app = build_router(state);
    let addr: SocketAddr = config.socket_addr()?;

    tracing::info!(
        root = %config.root.display(),
        "Starting suzuno on {}",
        addr
    );
    tracing::info!(
        "Admission capacity: {} units, max connections: {}",
        config.admission_capacity,
        config.max_connections
    );
    tracing::info!(
        "Timeout: {}s, Max body: {}MB",
        config.timeout_secs,
        config.max_body_size_mb
    );
    tracing::info!(
        "CORS: {}, Metrics: {}",
        config.enable_cors,
        config.metrics_enabled
    );

    let tcp = tokio::net::TcpListener::bind(addr).await?;
    let listener = LimitedListener::new(tcp, config.max_connections);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Shutdown signal handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
