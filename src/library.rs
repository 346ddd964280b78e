//! The media library: narrow async entry points over a root directory.
//!
//! [`Library`] owns the configured root and the shared admission pool and
//! exposes one method per server operation. Blocking filesystem and image
//! work runs on tokio's blocking pool; the admission wait is the only point
//! where a thumbnail request can be parked behind other requests.
//!
//! The thumbnail path is:
//!
//! ```text
//! gate (digest, 304?) -> estimate weight -> admit -> liveness? -> decode/resample -> release -> JPEG
//! ```

use std::io::{BufReader, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task;

use crate::admission::{self, Admission};
use crate::cost::{self, Weight};
use crate::error::{PipelineError, PipelineResult};
use crate::gate::{self, EtagNamespace, Fingerprint, GateOutcome};
use crate::lifecycle::Liveness;
use crate::path::ResourcePath;
use crate::projection::{self, DirectoryListing, READDIR_BATCH_SIZE, ResourceInfo, UrlPrefixes};
use crate::thumbnail;

/// A rendered thumbnail, or proof the client already has it.
#[derive(Debug)]
pub enum ThumbnailOutcome {
    NotModified(Fingerprint),
    Rendered {
        fingerprint: Fingerprint,
        weight: Weight,
        jpeg: Vec<u8>,
    },
}

/// A raw file ready to stream, or proof the client already has it.
#[derive(Debug)]
pub enum FileOutcome {
    NotModified(Fingerprint),
    Ready {
        resource: ResourcePath,
        opened: gate::OpenedFile,
    },
}

#[derive(Debug, Clone)]
pub struct Library {
    root: Arc<PathBuf>,
    pool: Arc<dyn Admission>,
    prefixes: Arc<UrlPrefixes>,
    batch_size: usize,
}

impl Library {
    pub fn new(root: impl Into<PathBuf>, pool: Arc<dyn Admission>) -> Self {
        Self {
            root: Arc::new(root.into()),
            pool,
            prefixes: Arc::new(UrlPrefixes::default()),
            batch_size: READDIR_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_prefixes(mut self, prefixes: UrlPrefixes) -> Self {
        self.prefixes = Arc::new(prefixes);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pool(&self) -> &Arc<dyn Admission> {
        &self.pool
    }

    /// Fingerprint the raw file at `logical` and open it for streaming.
    pub async fn open_file(
        &self,
        logical: &str,
        validator: Option<String>,
    ) -> PipelineResult<FileOutcome> {
        let resource = ResourcePath::resolve(&self.root, logical);
        task::spawn_blocking(move || -> PipelineResult<FileOutcome> {
            match gate::open_conditional(
                resource.native(),
                EtagNamespace::File,
                validator.as_deref(),
            )? {
                GateOutcome::NotModified(tag) => Ok(FileOutcome::NotModified(tag)),
                GateOutcome::Fresh(opened) => Ok(FileOutcome::Ready { resource, opened }),
            }
        })
        .await?
    }

    /// Produce the thumbnail for `logical` under admission control.
    ///
    /// Returns [`PipelineError::Cancelled`] when `liveness` is cancelled
    /// while waiting for admission or by the time admission is granted; in
    /// the latter case the units are handed back without decoding anything.
    pub async fn thumbnail(
        &self,
        logical: &str,
        validator: Option<String>,
        liveness: &Liveness,
    ) -> PipelineResult<ThumbnailOutcome> {
        let resource = ResourcePath::resolve(&self.root, logical);

        let probed = task::spawn_blocking(move || -> PipelineResult<_> {
            let opened = match gate::open_conditional(
                resource.native(),
                EtagNamespace::Thumbnail,
                validator.as_deref(),
            )? {
                GateOutcome::NotModified(tag) => return Ok(Err(tag)),
                GateOutcome::Fresh(opened) => opened,
            };

            let mut reader = BufReader::new(opened.file);
            let weight = cost::estimate_weight(&mut reader)?;
            reader
                .rewind()
                .map_err(|err| PipelineError::io("seek failed", err))?;
            Ok(Ok((reader, opened.fingerprint, weight)))
        })
        .await??;

        let (reader, fingerprint, weight) = match probed {
            Ok(ready) => ready,
            Err(tag) => return Ok(ThumbnailOutcome::NotModified(tag)),
        };

        let guard = admission::admit(&self.pool, weight, liveness).await?;
        if !liveness.is_active() {
            guard.release();
            return Err(PipelineError::Cancelled);
        }

        let jpeg = task::spawn_blocking(move || {
            let generated = thumbnail::decode_and_generate(reader);
            guard.release();
            thumbnail::encode_jpeg(&generated?)
        })
        .await??;

        Ok(ThumbnailOutcome::Rendered {
            fingerprint,
            weight,
            jpeg,
        })
    }

    /// List the directory at `logical`.
    pub async fn list_directory(
        &self,
        logical: &str,
        liveness: &Liveness,
    ) -> PipelineResult<DirectoryListing> {
        let root = Arc::clone(&self.root);
        let prefixes = Arc::clone(&self.prefixes);
        let logical = logical.to_string();
        let liveness = liveness.clone();
        let batch_size = self.batch_size;
        task::spawn_blocking(move || {
            projection::list_directory(&root, &logical, &prefixes, batch_size, &liveness)
        })
        .await?
    }

    /// One projection per target, in order.
    pub async fn lookup_batch(&self, targets: Vec<String>) -> PipelineResult<Vec<ResourceInfo>> {
        let root = Arc::clone(&self.root);
        let prefixes = Arc::clone(&self.prefixes);
        Ok(task::spawn_blocking(move || projection::lookup_batch(&root, &targets, &prefixes)).await?)
    }
}
