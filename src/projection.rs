//! Client-facing views of filesystem entries.
//!
//! A [`ResourceInfo`] is what the browser UI sees for a file, a directory,
//! or (in batch lookups) a target that could not be resolved. Only image
//! files and directories are projected; other regular files are hidden from
//! listings and show up as placeholders in batches.

use std::fs::{self, Metadata};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult, is_missing};
use crate::lifecycle::Liveness;
use crate::path::ResourcePath;

/// Directory entries read per batch between liveness checks.
pub const READDIR_BATCH_SIZE: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    File,
    Directory,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceInfo {
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub name: String,
    pub path: String,
    pub modified_at: i64,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
}

/// URL prefixes under which files and thumbnails are served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlPrefixes {
    pub thumbnail: String,
    pub file: String,
}

impl Default for UrlPrefixes {
    fn default() -> Self {
        Self {
            thumbnail: "/thumbnail".to_string(),
            file: "/file".to_string(),
        }
    }
}

impl ResourceInfo {
    /// Project `meta` for `res`, or `None` if the entry is neither a
    /// directory nor an image file.
    pub fn project(res: &ResourcePath, meta: &Metadata, prefixes: &UrlPrefixes) -> Option<Self> {
        let name = res.name().to_string();
        let path = res.logical().to_string();

        if meta.is_file() && res.is_image() {
            let encoded = res.encoded();
            Some(ResourceInfo {
                kind: ResourceKind::File,
                name,
                path,
                modified_at: modified_epoch(meta),
                size: meta.len(),
                thumbnail_url: Some(format!("{}{}", prefixes.thumbnail, encoded)),
                file_url: Some(format!("{}{}", prefixes.file, encoded)),
            })
        } else if meta.is_dir() {
            Some(ResourceInfo {
                kind: ResourceKind::Directory,
                name,
                path,
                modified_at: modified_epoch(meta),
                size: 0,
                thumbnail_url: None,
                file_url: None,
            })
        } else {
            None
        }
    }

    /// Placeholder for a batch target that did not resolve.
    pub fn empty(res: &ResourcePath) -> Self {
        ResourceInfo {
            kind: ResourceKind::Empty,
            name: res.name().to_string(),
            path: res.logical().to_string(),
            modified_at: 0,
            size: 0,
            thumbnail_url: None,
            file_url: None,
        }
    }
}

fn modified_epoch(meta: &Metadata) -> i64 {
    meta.modified().map(epoch_seconds).unwrap_or(0)
}

/// Whole seconds since the epoch, rounded toward negative infinity.
fn epoch_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => after.as_secs() as i64,
        Err(before) => {
            let before = before.duration();
            let secs = -(before.as_secs() as i64);
            if before.subsec_nanos() > 0 { secs - 1 } else { secs }
        }
    }
}

/// Listing of one directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryListing {
    pub resources: Vec<ResourceInfo>,
    pub path: String,
}

/// Enumerate the directory at `logical`, in enumeration order.
///
/// Entries are read `batch_size` at a time and `liveness` is checked before
/// each batch; an abandoned request stops with
/// [`PipelineError::Cancelled`]. Blocking.
pub fn list_directory(
    root: &Path,
    logical: &str,
    prefixes: &UrlPrefixes,
    batch_size: usize,
    liveness: &Liveness,
) -> PipelineResult<DirectoryListing> {
    let dir = ResourcePath::resolve(root, logical);

    let meta = match fs::metadata(dir.native()) {
        Ok(meta) => meta,
        Err(err) if is_missing(&err) => return Err(PipelineError::NotFound),
        Err(err) => return Err(PipelineError::io("stat failed", err)),
    };
    if !meta.is_dir() {
        return Err(PipelineError::NotFound);
    }

    let mut entries =
        fs::read_dir(dir.native()).map_err(|err| PipelineError::io("readdir failed", err))?;
    let batch_size = batch_size.max(1);
    let mut resources = Vec::new();

    loop {
        if !liveness.is_active() {
            return Err(PipelineError::Cancelled);
        }

        let mut read = 0;
        for entry in entries.by_ref().take(batch_size) {
            read += 1;
            let entry = entry.map_err(|err| PipelineError::io("readdir failed", err))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                tracing::debug!(dir = dir.logical(), "skipping entry with non UTF-8 name");
                continue;
            };
            // Unreadable entries (raced deletion) are skipped like hidden ones.
            let Ok(meta) = entry.metadata() else {
                continue;
            };
            let child = dir.child(root, name);
            if let Some(info) = ResourceInfo::project(&child, &meta, prefixes) {
                resources.push(info);
            }
        }

        if read < batch_size {
            break;
        }
    }

    Ok(DirectoryListing {
        resources,
        path: dir.logical().to_string(),
    })
}

/// Body of a batch lookup: `{"targets": ["/a.png", ...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub targets: Vec<String>,
}

impl BatchRequest {
    pub fn from_json(body: &[u8]) -> PipelineResult<Self> {
        serde_json::from_slice(body)
            .map_err(|err| PipelineError::BadRequest(format!("invalid batch body: {err}")))
    }
}

/// Project each of `targets`, preserving order.
///
/// A target that does not resolve to a readable directory or image file
/// becomes a [`ResourceKind::Empty`] placeholder. Blocking.
pub fn lookup_batch(root: &Path, targets: &[String], prefixes: &UrlPrefixes) -> Vec<ResourceInfo> {
    targets
        .iter()
        .map(|target| {
            let res = ResourcePath::resolve(root, target);
            fs::metadata(res.native())
                .ok()
                .and_then(|meta| ResourceInfo::project(&res, &meta, prefixes))
                .unwrap_or_else(|| ResourceInfo::empty(&res))
        })
        .collect()
}
