//! Route template scanner.
//!
//! Splits a route template into an ordered sequence of segments before the
//! radix tree consumes it. A template is plain literal text interleaved with
//! two kinds of capture markers:
//!
//! - `:name` binds a single path segment (everything up to the next `/`)
//! - `*name` binds the remainder of the path, slashes included, and must
//!   terminate the template
//!
//! Markers may start mid-segment (`/user_:name`, `/hero-*dir`). All template
//! violations are reported as [`RouteError`] values so the build step can
//! abort before any tree structure exists.

use crate::error::RouteError;
use crate::utils::ensure;

/// One piece of a scanned route template, borrowing from the template string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Segment<'t> {
    Literal(&'t str),
    Param(&'t str),
    Wildcard(&'t str),
}

/// Scan result: the segment sequence plus the number of capturing segments,
/// which callers use to size parameter pools.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Scanned<'t> {
    pub(crate) segments: Vec<Segment<'t>>,
    pub(crate) captures: usize,
}

pub(crate) fn scan(template: &str) -> Result<Scanned<'_>, RouteError> {
    ensure!(template.starts_with('/'), RouteError::missing_leading_slash(template));
    ensure!(!template.contains(char::is_whitespace), RouteError::embedded_whitespace(template));

    let bytes = template.as_bytes();
    let mut segments = Vec::new();
    let mut captures = 0;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b':' => {
                if i > start {
                    segments.push(Segment::Literal(&template[start..i]));
                }
                let name_start = i + 1;
                let mut end = name_start;
                while end < bytes.len() && bytes[end] != b'/' {
                    ensure!(bytes[end] != b':' && bytes[end] != b'*', RouteError::double_marker(template));
                    end += 1;
                }
                ensure!(end > name_start, RouteError::missing_name(template));
                segments.push(Segment::Param(&template[name_start..end]));
                captures += 1;
                start = end;
                i = end;
            }
            b'*' => {
                if i > start {
                    segments.push(Segment::Literal(&template[start..i]));
                }
                let name = &template[i + 1..];
                ensure!(!name.is_empty(), RouteError::missing_name(template));
                ensure!(!name.contains('/'), RouteError::misplaced_wildcard(template));
                ensure!(!name.contains(':') && !name.contains('*'), RouteError::double_marker(template));
                segments.push(Segment::Wildcard(name));
                captures += 1;
                start = bytes.len();
                i = bytes.len();
            }
            _ => i += 1,
        }
    }

    if start < bytes.len() {
        segments.push(Segment::Literal(&template[start..]));
    }

    Ok(Scanned { segments, captures })
}
