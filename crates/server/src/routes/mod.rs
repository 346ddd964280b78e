//! API route handlers
//!
//! This module contains all HTTP endpoint implementations for the media
//! server. Routes are organized by functionality:
//!
//! - `health`: Liveness and Prometheus metrics
//! - `media`: Raw files and thumbnails, with conditional fetches
//! - `meta`: Directory listings and batch metadata lookups

pub mod health;
pub mod media;
pub mod meta;

use crate::error::{ServerError, ServerResult};
use axum::Json;
use axum::http::HeaderMap;
use axum::http::header::IF_NONE_MATCH;
use axum::response::IntoResponse;
use serde_json::json;
use suzuno::PipelineError;

/// API version and base info
///
/// Returns server information including version and available endpoints.
///
/// # Response
///
/// ```json
/// {
///   "name": "suzuno",
///   "version": "0.1.0",
///   "endpoints": ["..."]
/// }
/// ```
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "suzuno",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/meta/directory/{path}",
            "/meta/batch",
            "/file/{path}",
            "/thumbnail/{path}",
            "/health",
            "/metrics"
        ]
    })))
}

/// 404 Not Found handler
///
/// Returns a standardized error response for undefined routes.
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}

/// Turn a wildcard capture into a logical path.
pub(crate) fn logical_path(captured: &str) -> String {
    format!("/{}", captured.trim_start_matches('/'))
}

/// All `If-None-Match` values, joined.
pub(crate) fn if_none_match(headers: &HeaderMap) -> Option<String> {
    let values: Vec<&str> = headers
        .get_all(IF_NONE_MATCH)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.join(", "))
    }
}

/// Log a pipeline failure with the logical path it concerned, then convert
/// it for the client.
///
/// Abandoned requests are expected and only traced at debug level.
pub(crate) fn report(logical: &str, err: PipelineError) -> ServerError {
    match &err {
        PipelineError::Cancelled => {
            tracing::debug!(path = %logical, "request abandoned by client");
        }
        PipelineError::NotFound | PipelineError::BadRequest(_) => {}
        _ => {
            tracing::error!(path = %logical, error = %err, "request failed");
        }
    }
    err.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn logical_path_is_rooted() {
        assert_eq!(logical_path("a/b.png"), "/a/b.png");
        assert_eq!(logical_path(""), "/");
        assert_eq!(logical_path("/x"), "/x");
    }

    #[test]
    fn if_none_match_joins_repeated_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(if_none_match(&headers), None);

        headers.append(IF_NONE_MATCH, HeaderValue::from_static("\"a\""));
        headers.append(IF_NONE_MATCH, HeaderValue::from_static("\"b\""));
        assert_eq!(if_none_match(&headers).as_deref(), Some("\"a\", \"b\""));
    }
}
