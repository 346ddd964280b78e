//! Logical (client-visible) paths and their native counterparts.
//!
//! A logical path is always slash separated and rooted at `/`. Before it
//! touches the filesystem it is cleaned lexically: empty and `.` segments
//! are dropped and `..` pops the previous segment, never climbing above the
//! root. The native path is then built by pushing only normal components
//! onto the configured root, so a cleaned path cannot escape it on any
//! platform.
//!
//! ```rust
//! use std::path::Path;
//! use suzuno::ResourcePath;
//!
//! let res = ResourcePath::resolve(Path::new("/srv/media"), "/../../etc/passwd");
//! assert_eq!(res.logical(), "/etc/passwd");
//! assert!(res.native().starts_with("/srv/media"));
//! ```

use std::path::{Component, Path, PathBuf};

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters left untouched when a single path segment is placed in a URL.
///
/// Unreserved characters plus the sub-delimiters that are safe inside a
/// segment; `/`, `;`, `,` and `?` are escaped.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b':')
    .remove(b'=')
    .remove(b'@');

/// Extensions the server knows how to thumbnail.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif"];

/// A request target: the cleaned logical path and where it lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePath {
    logical: String,
    native: PathBuf,
}

impl ResourcePath {
    /// Clean `logical` and join it onto `root`.
    pub fn resolve(root: &Path, logical: &str) -> Self {
        let logical = clean_logical(logical);
        let mut native = root.to_path_buf();
        for segment in logical.split('/').filter(|s| !s.is_empty()) {
            for component in Path::new(segment).components() {
                if let Component::Normal(part) = component {
                    native.push(part);
                }
            }
        }
        Self { logical, native }
    }

    /// Resolve the entry `name` inside this directory.
    pub fn child(&self, root: &Path, name: &str) -> Self {
        Self::resolve(root, &format!("{}/{}", self.logical, name))
    }

    pub fn logical(&self) -> &str {
        &self.logical
    }

    pub fn native(&self) -> &Path {
        &self.native
    }

    /// Last segment of the logical path; the root is named `/`.
    pub fn name(&self) -> &str {
        match self.logical.rsplit('/').next() {
            Some("") | None => "/",
            Some(name) => name,
        }
    }

    /// The logical path with every segment percent-encoded.
    pub fn encoded(&self) -> String {
        encode_url_path(&self.logical)
    }

    pub fn is_image(&self) -> bool {
        has_image_extension(self.name())
    }
}

/// Lexically clean a slash path into rooted form.
///
/// `""` and `"/"` both become `"/"`; trailing slashes are removed.
pub fn clean_logical(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// Percent-encode each segment of a slash path, keeping the slashes.
pub fn encode_url_path(path: &str) -> String {
    path.split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Case-insensitive check against the thumbnailable extensions.
pub fn has_image_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// MIME type for raw file responses, guessed from the extension.
pub fn content_type_for(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("webp") => "image/webp",
        Some("mp4") => "video/mp4",
        Some("json") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_collapses_dot_segments() {
        assert_eq!(clean_logical(""), "/");
        assert_eq!(clean_logical("/"), "/");
        assert_eq!(clean_logical("a/b/"), "/a/b");
        assert_eq!(clean_logical("/a/./b/../c"), "/a/c");
        assert_eq!(clean_logical("//a//b"), "/a/b");
        assert_eq!(clean_logical("/../../etc/passwd"), "/etc/passwd");
    }

    #[test]
    fn resolve_never_escapes_root() {
        let root = Path::new("/srv/media");
        for raw in [
            "/../../etc/passwd",
            "../..",
            "/a/../../../b",
            "..\\..\\windows",
        ] {
            let res = ResourcePath::resolve(root, raw);
            assert!(
                res.native().starts_with(root),
                "{raw} escaped to {:?}",
                res.native()
            );
        }
        assert_eq!(
            ResourcePath::resolve(root, "/../../etc/passwd").native(),
            Path::new("/srv/media/etc/passwd")
        );
    }

    #[test]
    fn root_resolves_to_root() {
        let root = Path::new("/srv/media");
        let res = ResourcePath::resolve(root, "/");
        assert_eq!(res.native(), root);
        assert_eq!(res.name(), "/");
    }

    #[test]
    fn child_joins_logically() {
        let root = Path::new("/srv");
        let dir = ResourcePath::resolve(root, "/photos");
        let child = dir.child(root, "cat.png");
        assert_eq!(child.logical(), "/photos/cat.png");
        assert_eq!(child.name(), "cat.png");
        assert!(child.is_image());

        let top = ResourcePath::resolve(root, "/").child(root, "a.jpg");
        assert_eq!(top.logical(), "/a.jpg");
    }

    #[test]
    fn encoding_escapes_reserved_characters() {
        assert_eq!(encode_url_path("/a b/c#d.png"), "/a%20b/c%23d.png");
        assert_eq!(encode_url_path("/x?y/100%"), "/x%3Fy/100%25");
        assert_eq!(encode_url_path("/a;b,c"), "/a%3Bb%2Cc");
        assert_eq!(encode_url_path("/keep$&+:=@~-_."), "/keep$&+:=@~-_.");
        assert_eq!(encode_url_path("/日本.png"), "/%E6%97%A5%E6%9C%AC.png");
    }

    #[test]
    fn image_extension_is_case_insensitive() {
        assert!(has_image_extension("a.PNG"));
        assert!(has_image_extension("b.JpEg"));
        assert!(has_image_extension("c.gif"));
        assert!(!has_image_extension("d.mp4"));
        assert!(!has_image_extension("png"));
    }

    #[test]
    fn content_types() {
        assert_eq!(content_type_for("a.JPG"), "image/jpeg");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }
}
