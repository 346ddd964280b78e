use crate::error::{ServerError, ServerResult};
use crate::range::{self, RangeRequest};
use crate::routes::{if_none_match, logical_path, report};
use crate::state::ServerState;
use axum::Extension;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header::{ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, ETAG};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use std::io::SeekFrom;
use std::sync::Arc;
use std::time::Instant;
use suzuno::{FileOutcome, Fingerprint, Liveness, PipelineError, ThumbnailOutcome};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

/// Stream a raw file
///
/// The response carries `ETag: "file:v1:<sha256>"`. A request whose
/// `If-None-Match` names that tag gets `304 Not Modified` with no body.
/// A single `Range: bytes=` request gets `206 Partial Content`, or `416`
/// when it cannot be satisfied. The body never extends past the bytes that
/// were fingerprinted.
pub async fn serve_file(
    State(state): State<Arc<ServerState>>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> ServerResult<Response> {
    let logical = logical_path(&path);
    let validator = if_none_match(&headers);

    let (resource, opened) = match state.library.open_file(&logical, validator).await {
        Ok(FileOutcome::NotModified(tag)) => return Ok(not_modified(&tag)),
        Ok(FileOutcome::Ready { resource, opened }) => (resource, opened),
        Err(err) => return Err(report(&logical, err)),
    };

    let total = opened.len;
    let mut file = tokio::fs::File::from_std(opened.file);
    let builder = Response::builder()
        .header(ETAG, opened.fingerprint.as_str())
        .header(ACCEPT_RANGES, "bytes");

    let response = match range::evaluate(&headers, opened.fingerprint.as_str(), total) {
        RangeRequest::Full => builder
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, suzuno::content_type_for(resource.name()))
            .header(CONTENT_LENGTH, total)
            .body(Body::from_stream(ReaderStream::new(file.take(total)))),
        RangeRequest::Partial(span) => {
            file.seek(SeekFrom::Start(span.start))
                .await
                .map_err(|e| ServerError::Internal(format!("seek failed: {e}")))?;
            tracing::debug!(path = %logical, range = %span.content_range(total), "partial file");

            builder
                .status(StatusCode::PARTIAL_CONTENT)
                .header(CONTENT_TYPE, suzuno::content_type_for(resource.name()))
                .header(CONTENT_RANGE, span.content_range(total))
                .header(CONTENT_LENGTH, span.len())
                .body(Body::from_stream(ReaderStream::new(file.take(span.len()))))
        }
        RangeRequest::Unsatisfiable => builder
            .status(StatusCode::RANGE_NOT_SATISFIABLE)
            .header(CONTENT_RANGE, format!("bytes */{total}"))
            .body(Body::empty()),
    };

    response.map_err(|e| ServerError::Internal(e.to_string()))
}

/// Render a square JPEG thumbnail
///
/// The pipeline runs in its own task so that, if the client disconnects
/// and this handler is dropped, the task still reaches its release point;
/// it learns about the disconnect through the request's [`Liveness`].
///
/// # Pipeline
/// 1. **Gate**: digest the source, answer `304` if `If-None-Match` matches
///    `"thumbnail:v1:<sha256>"`
/// 2. **Estimate**: weight from the image header
/// 3. **Admit**: wait for that many units in the shared pool
/// 4. **Generate**: centre crop, resample to 384×384, release, encode JPEG
pub async fn serve_thumbnail(
    State(state): State<Arc<ServerState>>,
    Extension(liveness): Extension<Liveness>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> ServerResult<Response> {
    let logical = logical_path(&path);
    let validator = if_none_match(&headers);
    let started = Instant::now();

    let task = {
        let library = state.library.clone();
        let logical = logical.clone();
        tokio::spawn(async move { library.thumbnail(&logical, validator, &liveness).await })
    };
    let outcome = task
        .await
        .map_err(|e| ServerError::Internal(format!("thumbnail task failed: {e}")))?;

    metrics::gauge!("suzuno_admission_units_in_use").set(f64::from(state.pool().in_use()));

    match outcome {
        Ok(ThumbnailOutcome::NotModified(tag)) => {
            metrics::counter!("suzuno_thumbnails_total", "outcome" => "not_modified").increment(1);
            Ok(not_modified(&tag))
        }
        Ok(ThumbnailOutcome::Rendered {
            fingerprint,
            weight,
            jpeg,
        }) => {
            metrics::counter!("suzuno_thumbnails_total", "outcome" => "rendered").increment(1);
            metrics::histogram!("suzuno_thumbnail_render_seconds")
                .record(started.elapsed().as_secs_f64());
            tracing::debug!(
                path = %logical,
                weight = weight.units(),
                bytes = jpeg.len(),
                "thumbnail rendered"
            );

            Response::builder()
                .status(StatusCode::OK)
                .header(CONTENT_TYPE, "image/jpeg")
                .header(ETAG, fingerprint.as_str())
                .body(Body::from(jpeg))
                .map_err(|e| ServerError::Internal(e.to_string()))
        }
        Err(err) => {
            metrics::counter!("suzuno_thumbnails_total", "outcome" => failure_label(&err))
                .increment(1);
            Err(report(&logical, err))
        }
    }
}

fn not_modified(tag: &Fingerprint) -> Response {
    (StatusCode::NOT_MODIFIED, [(ETAG, tag.to_string())]).into_response()
}

fn failure_label(err: &PipelineError) -> &'static str {
    match err {
        PipelineError::Cancelled => "cancelled",
        PipelineError::NotFound => "not_found",
        PipelineError::Decode(_) => "decode_error",
        _ => "error",
    }
}
