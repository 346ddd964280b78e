//! Error surface of the thumbnail pipeline.
//!
//! Every stage of the pipeline (gate, estimator, admission, generator,
//! listing) reports failures through [`PipelineError`]. The HTTP layer maps
//! each variant onto a status code; the variants are deliberately coarse so
//! that no native path or decoder detail has to cross that boundary.
//!
//! | Error | Typical cause | HTTP |
//! |-------|---------------|------|
//! | [`NotFound`](PipelineError::NotFound) | missing file, directory where a file was expected | 404 |
//! | [`BadRequest`](PipelineError::BadRequest) | malformed batch body | 400 |
//! | [`Decode`](PipelineError::Decode) | corrupt or unsupported image | 500 |
//! | [`Internal`](PipelineError::Internal) | stat/read failure, join failure | 500 |
//! | [`Cancelled`](PipelineError::Cancelled) | client went away | none |
//! | [`Oversized`](PipelineError::Oversized) | weight above pool capacity | 500 |

use std::io;

use thiserror::Error;

use crate::admission::AdmissionError;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors produced while resolving, fingerprinting, admitting or rendering
/// a resource.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PipelineError {
    /// The target does not exist or is not the kind of entry the operation
    /// needs (a directory for a file fetch, a file for a listing).
    #[error("resource not found")]
    NotFound,

    /// The client payload could not be understood.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Image header or pixel data could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] image::ImageError),

    /// Filesystem or runtime failure.
    #[error("internal error: {0}")]
    Internal(String),

    /// The originating request was abandoned before work started.
    ///
    /// Not a failure: callers stop without producing a response body and
    /// without logging at error level.
    #[error("request cancelled")]
    Cancelled,

    /// A weight exceeded the admission pool's total capacity and could never
    /// be admitted.
    #[error("weight {weight} exceeds admission capacity {capacity}")]
    Oversized { weight: u32, capacity: u32 },
}

impl PipelineError {
    /// Wrap an I/O failure that is not a plain "not found".
    pub(crate) fn io(context: &str, err: io::Error) -> Self {
        PipelineError::Internal(format!("{context}: {err}"))
    }

    /// `true` when the request was abandoned rather than failed.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled)
    }
}

/// Errors that mean "nothing usable at this path" rather than a failure.
pub(crate) fn is_missing(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

impl From<AdmissionError> for PipelineError {
    fn from(err: AdmissionError) -> Self {
        match err {
            AdmissionError::Cancelled => PipelineError::Cancelled,
            AdmissionError::Oversized { weight, capacity } => {
                PipelineError::Oversized { weight, capacity }
            }
            AdmissionError::Closed => PipelineError::Internal("admission pool closed".to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(err: tokio::task::JoinError) -> Self {
        PipelineError::Internal(format!("blocking task failed: {err}"))
    }
}
