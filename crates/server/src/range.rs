//! Byte-range requests for raw files
//!
//! Only a single `bytes=` range is served as `206 Partial Content`. A
//! request naming several ranges gets the whole file, since multipart
//! bodies are not produced. Malformed or out-of-bounds ranges are
//! unsatisfiable (`416`).
//!
//! `If-Range` is honoured only when it names the file's current entity tag;
//! any other value (including HTTP dates) falls back to the full body.

use axum::http::HeaderMap;
use axum::http::header::{IF_RANGE, RANGE};

/// Inclusive byte range within a representation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` value for a representation of `total` bytes
    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, total)
    }
}

/// What part of the file a request asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeRequest {
    Full,
    Partial(ByteRange),
    Unsatisfiable,
}

/// Evaluate `Range` and `If-Range` against a `len`-byte file tagged `etag`.
pub fn evaluate(headers: &HeaderMap, etag: &str, len: u64) -> RangeRequest {
    let Some(range) = headers.get(RANGE).and_then(|v| v.to_str().ok()) else {
        return RangeRequest::Full;
    };
    if let Some(if_range) = headers.get(IF_RANGE) {
        if if_range.to_str().ok().map(str::trim) != Some(etag) {
            return RangeRequest::Full;
        }
    }
    parse(range, len)
}

/// Parse a `Range` header value for a `len`-byte file.
pub fn parse(value: &str, len: u64) -> RangeRequest {
    let Some(set) = value.trim().strip_prefix("bytes=") else {
        return RangeRequest::Unsatisfiable;
    };
    let specs: Vec<&str> = set
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    match specs.as_slice() {
        [] => RangeRequest::Unsatisfiable,
        [single] => parse_spec(single, len),
        _ => RangeRequest::Full,
    }
}

fn parse_spec(spec: &str, len: u64) -> RangeRequest {
    let Some((first, last)) = spec.split_once('-') else {
        return RangeRequest::Unsatisfiable;
    };
    let (first, last) = (first.trim(), last.trim());

    // Suffix form: the final `n` bytes.
    if first.is_empty() {
        return match last.parse::<u64>() {
            Ok(n) if n > 0 && len > 0 => RangeRequest::Partial(ByteRange {
                start: len - n.min(len),
                end: len - 1,
            }),
            _ => RangeRequest::Unsatisfiable,
        };
    }

    let start = match first.parse::<u64>() {
        Ok(start) if start < len => start,
        _ => return RangeRequest::Unsatisfiable,
    };
    let end = if last.is_empty() {
        len - 1
    } else {
        match last.parse::<u64>() {
            Ok(end) if end >= start => end.min(len - 1),
            _ => return RangeRequest::Unsatisfiable,
        }
    };

    RangeRequest::Partial(ByteRange { start, end })
}
