//! Path utilities supporting the dispatch fallbacks.
//!
//! [`ReversePathBuffer`] backs the case-insensitive search: the corrected
//! path is assembled while the tree recursion unwinds, so spans arrive in
//! reverse (leaf-most first) and are written back-to-front into a buffer of
//! exactly the final length. Short paths stay on the stack; only paths longer
//! than [`STACK_BUF_SIZE`] spill to the heap.
//!
//! [`clean_path`] normalizes a request path before the case-insensitive
//! retry: it resolves `.` and `..` elements, collapses repeated slashes and
//! roots the result, while preserving a trailing slash.

use std::borrow::Cow;
use std::str;

/// Corrected paths up to this length are assembled on the stack.
pub(crate) const STACK_BUF_SIZE: usize = 128;

/// Fixed-size byte buffer written back-to-front.
#[derive(Debug)]
pub(crate) struct ReversePathBuffer {
    inline: [u8; STACK_BUF_SIZE],
    spill: Vec<u8>,
    write: usize,
    capacity: usize,
}

impl ReversePathBuffer {
    /// `capacity` must be the exact length of the path being reassembled.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let spill = if capacity > STACK_BUF_SIZE { vec![0; capacity] } else { Vec::new() };
        Self { inline: [0; STACK_BUF_SIZE], spill, write: capacity, capacity }
    }

    /// Copies `span` directly in front of everything written so far.
    pub(crate) fn prepend(&mut self, span: &[u8]) {
        debug_assert!(span.len() <= self.write, "reverse path buffer overflow");
        let start = self.write - span.len();
        let storage: &mut [u8] = if self.capacity > STACK_BUF_SIZE { &mut self.spill } else { &mut self.inline };
        storage[start..self.write].copy_from_slice(span);
        self.write = start;
    }

    /// Materializes the written region as an owned path.
    ///
    /// Every span originates from a `&str` slice cut on ASCII boundaries, so
    /// the assembled bytes are valid UTF-8; `None` is unreachable in correct
    /// usage.
    pub(crate) fn into_string(self) -> Option<String> {
        let written = if self.capacity > STACK_BUF_SIZE {
            &self.spill[self.write..self.capacity]
        } else {
            &self.inline[self.write..self.capacity]
        };
        str::from_utf8(written).ok().map(str::to_owned)
    }
}

/// Fast pre-check: a clean path needs no rebuilding at all.
fn is_clean(path: &str) -> bool {
    path.starts_with('/')
        && !path.contains("//")
        && !path.contains("/./")
        && !path.contains("/../")
        && !path.ends_with("/.")
        && !path.ends_with("/..")
}

/// Normalizes a request path: collapses repeated slashes, resolves `.` and
/// `..` elements, and always returns a rooted path. A trailing slash is
/// preserved. Returns the input unchanged when it is already clean.
pub(crate) fn clean_path(path: &str) -> Cow<'_, str> {
    if path.is_empty() {
        return Cow::Borrowed("/");
    }
    if is_clean(path) {
        return Cow::Borrowed(path);
    }

    let trailing = path.len() > 1 && path.ends_with('/');
    let mut kept: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                kept.pop();
            }
            other => kept.push(other),
        }
    }

    let mut cleaned = String::with_capacity(path.len());
    for segment in &kept {
        cleaned.push('/');
        cleaned.push_str(segment);
    }
    if cleaned.is_empty() {
        cleaned.push('/');
    }
    if trailing && !cleaned.ends_with('/') {
        cleaned.push('/');
    }

    if cleaned == path { Cow::Borrowed(path) } else { Cow::Owned(cleaned) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_buffer_inline() {
        let mut buf = ReversePathBuffer::with_capacity(10);
        buf.prepend(b"/Posts");
        buf.prepend(b"7");
        buf.prepend(b"/a/");
        assert_eq!(buf.into_string().as_deref(), Some("/a/7/Posts"));
    }

    #[test]
    fn test_reverse_buffer_spills_to_heap() {
        let long = "x".repeat(STACK_BUF_SIZE + 40);
        let mut buf = ReversePathBuffer::with_capacity(long.len() + 1);
        buf.prepend(long.as_bytes());
        buf.prepend(b"/");
        assert_eq!(buf.into_string(), Some(format!("/{long}")));
    }

    #[test]
    fn test_reverse_buffer_exact_capacity() {
        let mut buf = ReversePathBuffer::with_capacity(1);
        buf.prepend(b"/");
        assert_eq!(buf.into_string().as_deref(), Some("/"));
    }

    #[test]
    fn test_clean_path_untouched_when_clean() {
        for clean in ["/", "/users/find", "/a/b/", "/.well-known/acme"] {
            assert!(matches!(clean_path(clean), Cow::Borrowed(p) if p == clean));
        }
    }

    #[test]
    fn test_clean_path_collapses_slashes() {
        assert_eq!(clean_path("//a///b"), "/a/b");
        assert_eq!(clean_path("/a//"), "/a/");
    }

    #[test]
    fn test_clean_path_resolves_dots() {
        assert_eq!(clean_path("/a/./b"), "/a/b");
        assert_eq!(clean_path("/a/../b"), "/b");
        assert_eq!(clean_path("/a/b/.."), "/a");
        assert_eq!(clean_path("/.."), "/");
        assert_eq!(clean_path("/../x"), "/x");
    }

    #[test]
    fn test_clean_path_roots_relative_input() {
        assert_eq!(clean_path(""), "/");
        assert_eq!(clean_path("users/find"), "/users/find");
    }

    #[test]
    fn test_clean_path_preserves_trailing_slash() {
        assert_eq!(clean_path("/a/b//"), "/a/b/");
        assert_eq!(clean_path("/a/./"), "/a/");
    }
}
