use crate::error::{ServerError, ServerResult};
use crate::routes::{logical_path, report};
use crate::state::ServerState;
use axum::Extension;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::http::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use suzuno::{BatchRequest, DirectoryListing, Liveness, ResourceInfo};

/// Batch lookup response
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchResponse {
    pub resources: Vec<ResourceInfo>,
}

/// List the media root
pub async fn list_root(
    State(state): State<Arc<ServerState>>,
    Extension(liveness): Extension<Liveness>,
) -> ServerResult<Json<DirectoryListing>> {
    list(&state, "/", &liveness).await
}

/// List a directory below the media root
///
/// Only directories and image files appear; entries are in enumeration
/// order. Enumeration stops early if the client disconnects.
///
/// # Response
///
/// ```json
/// {
///   "resources": [
///     {"type": "directory", "name": "trips", "path": "/trips", "modified_at": 1700000000, "size": 0},
///     {"type": "file", "name": "a.png", "path": "/a.png", "modified_at": 1700000000, "size": 5120,
///      "thumbnail_url": "/thumbnail/a.png", "file_url": "/file/a.png"}
///   ],
///   "path": "/"
/// }
/// ```
pub async fn list_directory(
    State(state): State<Arc<ServerState>>,
    Extension(liveness): Extension<Liveness>,
    Path(path): Path<String>,
) -> ServerResult<Json<DirectoryListing>> {
    list(&state, &logical_path(&path), &liveness).await
}

async fn list(
    state: &ServerState,
    logical: &str,
    liveness: &Liveness,
) -> ServerResult<Json<DirectoryListing>> {
    state
        .library
        .list_directory(logical, liveness)
        .await
        .map(Json)
        .map_err(|err| report(logical, err))
}

/// Look up metadata for many paths at once
///
/// Every target yields exactly one entry, in request order. Targets that do
/// not resolve to a directory or image file come back as `"type": "empty"`
/// placeholders instead of failing the batch.
///
/// # Example
/// ```json
/// // Request
/// { "targets": ["/a.png", "/missing.png"] }
///
/// // Response
/// {
///   "resources": [
///     { "type": "file", "name": "a.png", "path": "/a.png", ... },
///     { "type": "empty", "name": "missing.png", "path": "/missing.png", "modified_at": 0, "size": 0 }
///   ]
/// }
/// ```
pub async fn lookup_batch(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ServerResult<Json<BatchResponse>> {
    if !is_json(&headers) {
        return Err(ServerError::BadRequest(
            "expected an application/json body".to_string(),
        ));
    }
    let request = BatchRequest::from_json(&body).map_err(|err| report("/meta/batch", err))?;

    tracing::debug!(targets = request.targets.len(), "batch lookup");
    let resources = state
        .library
        .lookup_batch(request.targets)
        .await
        .map_err(|err| report("/meta/batch", err))?;

    Ok(Json(BatchResponse { resources }))
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| ct.split(';').next())
        .map(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn json_content_type_detection() {
        let mut headers = HeaderMap::new();
        assert!(!is_json(&headers));

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        assert!(!is_json(&headers));

        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("Application/JSON; charset=utf-8"),
        );
        assert!(is_json(&headers));
    }
}
