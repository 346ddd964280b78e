//! Suzuno Server - HTTP front end for a media directory
//!
//! This crate serves one directory tree over HTTP:
//!
//! - **Files**: Raw bytes with content-hash ETags, `304` revalidation and
//!   single byte ranges
//! - **Thumbnails**: 384×384 JPEG previews, rendered under a weighted
//!   admission pool so large images cannot exhaust memory
//! - **Metadata**: Directory listings and batch lookups for a browsing UI
//! - **Health & Metrics**: Liveness probe and Prometheus-compatible metrics
//!
//! # Features
//!
//! - **Backpressure**: Connection limit at the listener, weighted admission
//!   for thumbnail work
//! - **Cancellation**: Work stops early when the client goes away
//! - **Middleware**: Compression, CORS, request ID tracking, structured logging
//! - **Configuration**: Environment variable and file-based configuration
//! - **Graceful Shutdown**: Proper signal handling for production deployments
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?.with_root("/srv/photos");
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `GET /` - API information
//! - `GET /health` - Liveness probe
//! - `GET /metrics` - Prometheus metrics
//! - `GET /metadata` - Server metadata
//! - `GET /meta/directory/{path}` - List a directory
//! - `POST /meta/batch` - Look up many paths
//! - `GET /file/{path}` - Raw file
//! - `GET /thumbnail/{path}` - JPEG thumbnail

pub mod config;
pub mod error;
pub mod listener;
pub mod middleware;
pub mod range;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use listener::LimitedListener;
pub use server::{build_router, start_server};
pub use state::ServerState;
