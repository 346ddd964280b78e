//! Conditional fetch: open, fingerprint, and short-circuit on a match.
//!
//! Every file response carries an entity tag derived from the file's full
//! content:
//!
//! ```text
//! "<namespace><hex(SHA-256(content))>"
//! ```
//!
//! The namespace keeps raw-file tags (`file:v1:`) and thumbnail tags
//! (`thumbnail:v1:`) disjoint, so a client cannot replay one as the other.
//!
//! The whole file is read once here, before any admission wait, so the
//! thumbnail pool is only ever charged for decode and resample work. The
//! handle is rewound before it is handed on.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{PipelineError, PipelineResult, is_missing};

/// Which kind of representation an entity tag describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtagNamespace {
    File,
    Thumbnail,
}

impl EtagNamespace {
    pub fn prefix(self) -> &'static str {
        match self {
            EtagNamespace::File => "file:v1:",
            EtagNamespace::Thumbnail => "thumbnail:v1:",
        }
    }
}

/// A quoted strong entity tag, ready for the `ETag` header.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Stream `reader` to the end through SHA-256.
    pub fn digest<R: Read>(namespace: EtagNamespace, reader: &mut R) -> io::Result<Self> {
        Self::digest_counted(namespace, reader).map(|(tag, _)| tag)
    }

    /// Like [`digest`](Self::digest), also returning how many bytes were
    /// hashed.
    pub fn digest_counted<R: Read>(
        namespace: EtagNamespace,
        reader: &mut R,
    ) -> io::Result<(Self, u64)> {
        let mut hasher = Sha256::new();
        let hashed = io::copy(reader, &mut hasher)?;
        let hex = hex::encode(hasher.finalize());
        Ok((
            Fingerprint(format!("\"{}{}\"", namespace.prefix(), hex)),
            hashed,
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` if the client's `If-None-Match` value names this tag.
    pub fn is_held_by(&self, validator: &str) -> bool {
        !validator.is_empty() && validator.contains(&self.0)
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A regular file, fully digested and rewound to offset zero.
#[derive(Debug)]
pub struct OpenedFile {
    pub file: File,
    pub fingerprint: Fingerprint,
    /// Bytes covered by `fingerprint`.
    pub len: u64,
}

/// Result of passing a request through the gate.
#[derive(Debug)]
pub enum GateOutcome {
    /// The client already holds this representation. The file is closed.
    NotModified(Fingerprint),
    /// The representation must be produced from this handle.
    Fresh(OpenedFile),
}

/// Open `native`, fingerprint it under `namespace` and compare against the
/// client's validator.
///
/// Blocking; run it on the blocking pool from async code.
pub fn open_conditional(
    native: &Path,
    namespace: EtagNamespace,
    validator: Option<&str>,
) -> PipelineResult<GateOutcome> {
    let meta = match fs::metadata(native) {
        Ok(meta) => meta,
        Err(err) if is_missing(&err) => return Err(PipelineError::NotFound),
        Err(err) => return Err(PipelineError::io("stat failed", err)),
    };
    if !meta.is_file() {
        return Err(PipelineError::NotFound);
    }

    let mut file = match File::open(native) {
        Ok(file) => file,
        Err(err) if is_missing(&err) => return Err(PipelineError::NotFound),
        Err(err) => return Err(PipelineError::io("open failed", err)),
    };

    let (fingerprint, len) = Fingerprint::digest_counted(namespace, &mut file)
        .map_err(|err| PipelineError::io("read failed", err))?;

    if validator.is_some_and(|v| fingerprint.is_held_by(v)) {
        return Ok(GateOutcome::NotModified(fingerprint));
    }

    file.seek(SeekFrom::Start(0))
        .map_err(|err| PipelineError::io("seek failed", err))?;

    Ok(GateOutcome::Fresh(OpenedFile {
        file,
        fingerprint,
        len,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn fresh(outcome: GateOutcome) -> OpenedFile {
        match outcome {
            GateOutcome::Fresh(opened) => opened,
            GateOutcome::NotModified(tag) => panic!("unexpected 304 for {tag}"),
        }
    }

    #[test]
    fn fingerprint_is_namespaced_and_quoted() {
        let file_tag = Fingerprint::digest(EtagNamespace::File, &mut Cursor::new(b"abc")).unwrap();
        let thumb_tag =
            Fingerprint::digest(EtagNamespace::Thumbnail, &mut Cursor::new(b"abc")).unwrap();

        assert_eq!(
            file_tag.as_str(),
            "\"file:v1:ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad\""
        );
        assert!(thumb_tag.as_str().starts_with("\"thumbnail:v1:ba7816bf"));
        assert!(!thumb_tag.is_held_by(file_tag.as_str()));
    }

    #[test]
    fn digest_counts_the_bytes_it_hashed() {
        let (tag, hashed) =
            Fingerprint::digest_counted(EtagNamespace::File, &mut Cursor::new(b"hello world"))
                .unwrap();
        assert_eq!(hashed, 11);
        assert_eq!(
            tag,
            Fingerprint::digest(EtagNamespace::File, &mut Cursor::new(b"hello world")).unwrap()
        );
    }

    #[test]
    fn length_matches_the_digested_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.bin");
        fs::write(&path, vec![7u8; 4096]).unwrap();

        let mut opened = fresh(open_conditional(&path, EtagNamespace::File, None).unwrap());
        let mut body = Vec::new();
        opened.file.read_to_end(&mut body).unwrap();
        assert_eq!(opened.len, body.len() as u64);
    }

    #[test]
    fn validator_matching_requires_exact_tag() {
        let tag = Fingerprint::digest(EtagNamespace::File, &mut Cursor::new(b"x")).unwrap();
        assert!(tag.is_held_by(tag.as_str()));
        assert!(tag.is_held_by(&format!("\"other\", {}", tag.as_str())));
        assert!(!tag.is_held_by(""));
        assert!(!tag.is_held_by("\"file:v1:00\""));
    }

    #[test]
    fn second_fetch_with_tag_is_not_modified() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, b"hello").unwrap();

        let first = fresh(open_conditional(&path, EtagNamespace::File, None).unwrap());
        assert_eq!(first.len, 5);

        let second =
            open_conditional(&path, EtagNamespace::File, Some(first.fingerprint.as_str())).unwrap();
        assert!(matches!(second, GateOutcome::NotModified(ref t) if *t == first.fingerprint));
    }

    #[test]
    fn handle_is_rewound_after_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, b"payload").unwrap();

        let mut opened = fresh(open_conditional(&path, EtagNamespace::File, None).unwrap());
        let mut body = String::new();
        opened.file.read_to_string(&mut body).unwrap();
        assert_eq!(body, "payload");
    }

    #[test]
    fn changed_content_changes_the_tag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, b"one").unwrap();
        let before = fresh(open_conditional(&path, EtagNamespace::File, None).unwrap());

        fs::write(&path, b"two").unwrap();
        let after = open_conditional(&path, EtagNamespace::File, Some(before.fingerprint.as_str()))
            .unwrap();
        assert!(matches!(after, GateOutcome::Fresh(_)));
    }

    #[test]
    fn missing_files_and_directories_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = open_conditional(&dir.path().join("nope"), EtagNamespace::File, None);
        assert!(matches!(missing, Err(PipelineError::NotFound)));

        let directory = open_conditional(dir.path(), EtagNamespace::File, None);
        assert!(matches!(directory, Err(PipelineError::NotFound)));

        fs::write(dir.path().join("file"), b"x").unwrap();
        let under_file = open_conditional(&dir.path().join("file/child"), EtagNamespace::File, None);
        assert!(matches!(under_file, Err(PipelineError::NotFound)));
    }
}
