//! Core of the suzuno media server.
//!
//! The server browses a directory tree, serves original files, and renders
//! square thumbnails of images on demand. This crate holds everything that
//! is not HTTP plumbing:
//!
//! - [`path`]: logical paths, their confinement to the media root, URL encoding
//! - [`gate`]: content fingerprints (ETags) and conditional fetches
//! - [`cost`]: admission weight of an image from its header
//! - [`admission`]: the weighted pool bounding concurrent decode work
//! - [`thumbnail`]: centred square crop, bilinear resample, JPEG encode
//! - [`lifecycle`]: request liveness used for cooperative cancellation
//! - [`projection`]: directory listings and batch metadata lookups
//! - [`library`]: async entry points composing the above
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use suzuno::{Library, Liveness, ThumbnailOutcome, WeightedPool};
//!
//! # async fn run() -> Result<(), suzuno::PipelineError> {
//! let library = Library::new("/srv/media", Arc::new(WeightedPool::default()));
//! match library.thumbnail("/holiday/beach.jpg", None, &Liveness::new()).await? {
//!     ThumbnailOutcome::Rendered { jpeg, fingerprint, .. } => {
//!         println!("{} bytes, etag {fingerprint}", jpeg.len());
//!     }
//!     ThumbnailOutcome::NotModified(_) => unreachable!("no validator was sent"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod admission;
pub mod cost;
pub mod error;
pub mod gate;
pub mod library;
pub mod lifecycle;
pub mod path;
pub mod projection;
pub mod thumbnail;

pub use admission::{
    Admission, AdmissionError, AdmissionGuard, DEFAULT_CAPACITY, WeightedPool, admit,
};
pub use cost::{MAX_WEIGHT, WEIGHT_UNIT, Weight, estimate_weight};
pub use error::{PipelineError, PipelineResult};
pub use gate::{EtagNamespace, Fingerprint, GateOutcome, OpenedFile, open_conditional};
pub use library::{FileOutcome, Library, ThumbnailOutcome};
pub use lifecycle::Liveness;
pub use path::{ResourcePath, clean_logical, content_type_for, encode_url_path};
pub use projection::{
    BatchRequest, DirectoryListing, READDIR_BATCH_SIZE, ResourceInfo, ResourceKind, UrlPrefixes,
};
pub use thumbnail::{CropBox, THUMBNAIL_SIZE};
