//! Compressed-prefix (radix) tree storing route templates.
//!
//! Each node owns the literal bytes it contributes beyond its parent
//! (`prefix`). Literal children are kept sorted by first byte and addressed
//! through a dense `[min..=max]` byte index with a parallel table of child
//! prefix lengths, so candidate lookup is a table probe instead of a sibling
//! scan. Parametric and wildcard continuations live in dedicated single
//! child slots that sibling templates share.
//!
//! Nodes are held in an arena and addressed by index, which keeps the
//! restructuring operations (prefix splitting, branch creation) free of
//! ownership gymnastics: an insert only ever rewrites indices.
//!
//! # Insertion
//!
//! Inserting a literal run walks existing children byte-by-byte and lands in
//! one of four cases: append a fresh child, descend ("traversal"), insert a
//! branch above an existing child ("expansion"), or split at the longest
//! common prefix ("collision"). A node that terminates a route records the
//! original template, the handler, and the capture names along its path,
//! reversed so they line up with the unwind-order value appends of the
//! search.
//!
//! # Search
//!
//! Search tries, at every node: the indexed literal child, then the param
//! slot, then the wildcard slot. A literal subtree that fails to reach a
//! terminal node does not block the fallbacks — the recursion discards
//! non-terminal results and backtracks. Empty captures never match, with one
//! exception: a wildcard directly following a `/` may bind the empty
//! remainder (`/images/*filepath` matches `/images/`).
//!
//! The case-insensitive variant folds ASCII during comparison, probes the
//! byte index twice (raw byte, then case-swapped) and reconstructs the
//! registered casing of the matched path through a [`ReversePathBuffer`].

use std::str;
use std::sync::Arc;

use tracing::trace;

use crate::error::RouteError;
use crate::params::ParamValues;
use crate::path::ReversePathBuffer;
use crate::scanner::{Segment, scan};

pub(crate) type NodeId = usize;

const ROOT: NodeId = 0;

/// A node of the radix tree. Only terminal nodes carry `template`,
/// `handler` and `param_keys`.
#[derive(Debug)]
pub(crate) struct Node<T> {
    /// Literal bytes owned by this node since its parent. Empty only for the
    /// root and for param/wildcard slot nodes.
    prefix: Box<[u8]>,
    template: Option<Box<str>>,
    handler: Option<T>,
    /// Capture names root-to-leaf, stored reversed.
    param_keys: Option<Arc<[Box<str>]>>,
    /// Literal children, sorted by first prefix byte.
    children: Vec<NodeId>,
    /// Smallest first byte among children; base of the dense tables.
    index_min: u8,
    /// Byte → child slot + 1; zero marks "no child".
    index: Box<[u16]>,
    /// Byte → prefix length of the child registered under that byte.
    prefix_lens: Box<[u32]>,
    param: Option<NodeId>,
    wildcard: Option<NodeId>,
}

impl<T> Node<T> {
    fn new(prefix: &[u8]) -> Self {
        Self {
            prefix: prefix.into(),
            template: None,
            handler: None,
            param_keys: None,
            children: Vec::new(),
            index_min: 0,
            index: Box::default(),
            prefix_lens: Box::default(),
            param: None,
            wildcard: None,
        }
    }

    /// Indexed candidate lookup: the child starting with `byte` and its
    /// prefix length, without touching the child node itself.
    fn child_for(&self, byte: u8) -> Option<(NodeId, usize)> {
        if byte < self.index_min {
            return None;
        }
        let offset = (byte - self.index_min) as usize;
        let slot = *self.index.get(offset)? as usize;
        if slot == 0 {
            return None;
        }
        Some((self.children[slot - 1], self.prefix_lens[offset] as usize))
    }

    pub(crate) fn handler(&self) -> Option<&T> {
        self.handler.as_ref()
    }

    pub(crate) fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    pub(crate) fn param_keys(&self) -> Option<&Arc<[Box<str>]>> {
        self.param_keys.as_ref()
    }
}

/// Result of a successful [`Tree::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Inserted {
    pub(crate) node: NodeId,
    /// Number of capturing segments; callers size parameter pools with it.
    pub(crate) captures: usize,
}

#[derive(Debug)]
pub(crate) struct Tree<T> {
    nodes: Vec<Node<T>>,
}

impl<T> Tree<T> {
    pub(crate) fn new() -> Self {
        Self { nodes: vec![Node::new(b"")] }
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node<T> {
        &self.nodes[id]
    }

    /// Inserts a route template, restructuring the tree as needed.
    ///
    /// Param and wildcard segments reuse the existing slot child when one is
    /// present, so multiple templates share one param branch with different
    /// continuations. Registering a template whose terminal node is already
    /// taken fails with [`RouteError::Conflict`].
    pub(crate) fn insert(&mut self, template: &str, handler: T) -> Result<Inserted, RouteError> {
        let scanned = scan(template)?;
        trace!(template, captures = scanned.captures, "inserting route");

        let mut current = ROOT;
        let mut keys: Vec<Box<str>> = Vec::new();
        for (i, segment) in scanned.segments.iter().enumerate() {
            match *segment {
                Segment::Literal(text) => {
                    // the tree stores paths without their leading slash
                    let text = if i == 0 { &text[1..] } else { text };
                    current = self.insert_literal(current, text.as_bytes());
                }
                Segment::Param(name) => {
                    keys.push(name.into());
                    current = self.param_slot(current);
                }
                Segment::Wildcard(name) => {
                    keys.push(name.into());
                    current = self.wildcard_slot(current);
                }
            }
        }

        let node = &mut self.nodes[current];
        if let Some(existing) = &node.template {
            return Err(RouteError::conflict(template, existing));
        }
        node.template = Some(template.into());
        node.handler = Some(handler);
        if !keys.is_empty() {
            // reversed so the unwind-order value appends of search line up
            keys.reverse();
            node.param_keys = Some(keys.into());
        }
        Ok(Inserted { node: current, captures: scanned.captures })
    }

    fn insert_literal(&mut self, mut current: NodeId, text: &[u8]) -> NodeId {
        let mut remaining = text;
        loop {
            if remaining.is_empty() {
                return current;
            }
            let Some((child, child_len)) = self.nodes[current].child_for(remaining[0]) else {
                let id = self.push_node(remaining);
                self.attach_child(current, id);
                return id;
            };
            let common = common_prefix(&self.nodes[child].prefix, remaining);
            if common == child_len {
                // traversal: descend and keep matching the remainder
                current = child;
                remaining = &remaining[common..];
            } else if common == remaining.len() {
                // expansion: the new route ends inside the child's prefix
                return self.split_child(current, child, common);
            } else {
                // collision: branch at the longest common prefix
                let branch = self.split_child(current, child, common);
                let id = self.push_node(&remaining[common..]);
                self.attach_child(branch, id);
                return id;
            }
        }
    }

    fn param_slot(&mut self, node: NodeId) -> NodeId {
        if let Some(id) = self.nodes[node].param {
            return id;
        }
        let id = self.push_node(b"");
        self.nodes[node].param = Some(id);
        id
    }

    fn wildcard_slot(&mut self, node: NodeId) -> NodeId {
        if let Some(id) = self.nodes[node].wildcard {
            return id;
        }
        let id = self.push_node(b"");
        self.nodes[node].wildcard = Some(id);
        id
    }

    fn push_node(&mut self, prefix: &[u8]) -> NodeId {
        self.nodes.push(Node::new(prefix));
        self.nodes.len() - 1
    }

    /// Demotes `child` under a fresh branch node holding the first `at`
    /// bytes of its prefix; the branch takes the child's place under
    /// `parent`. Returns the branch.
    fn split_child(&mut self, parent: NodeId, child: NodeId, at: usize) -> NodeId {
        let (head, tail) = {
            let prefix = &self.nodes[child].prefix;
            (prefix[..at].to_vec(), prefix[at..].to_vec())
        };
        let branch = self.push_node(&head);
        self.nodes[child].prefix = tail.into_boxed_slice();

        let children = &mut self.nodes[parent].children;
        if let Some(slot) = children.iter().position(|&c| c == child) {
            children[slot] = branch;
        }
        self.nodes[branch].children.push(child);
        self.rebuild_index(parent);
        self.rebuild_index(branch);
        branch
    }

    fn attach_child(&mut self, parent: NodeId, child: NodeId) {
        let first = self.nodes[child].prefix[0];
        let pos = self.nodes[parent]
            .children
            .iter()
            .position(|&c| self.nodes[c].prefix[0] > first)
            .unwrap_or(self.nodes[parent].children.len());
        self.nodes[parent].children.insert(pos, child);
        self.rebuild_index(parent);
    }

    fn rebuild_index(&mut self, id: NodeId) {
        let entries: Vec<(u8, u32)> = self.nodes[id]
            .children
            .iter()
            .map(|&child| {
                let prefix = &self.nodes[child].prefix;
                (prefix[0], prefix.len() as u32)
            })
            .collect();

        let node = &mut self.nodes[id];
        let (Some(&(min, _)), Some(&(max, _))) = (entries.first(), entries.last()) else {
            node.index_min = 0;
            node.index = Box::default();
            node.prefix_lens = Box::default();
            return;
        };
        let mut index = vec![0u16; (max - min) as usize + 1];
        let mut prefix_lens = vec![0u32; (max - min) as usize + 1];
        for (slot, &(byte, len)) in entries.iter().enumerate() {
            let offset = (byte - min) as usize;
            index[offset] = slot as u16 + 1;
            prefix_lens[offset] = len;
        }
        node.index_min = min;
        node.index = index.into_boxed_slice();
        node.prefix_lens = prefix_lens.into_boxed_slice();
    }

    /// Finds the terminal node for `path`, appending captured values to
    /// `values` while the recursion unwinds (leaf-most binding first).
    pub(crate) fn search(&self, path: &str, values: &mut ParamValues) -> Option<NodeId> {
        let path = path.as_bytes();
        let path = strip_leading_slash(path);
        if path.is_empty() {
            let root = &self.nodes[ROOT];
            if root.handler.is_some() {
                return Some(ROOT);
            }
            if let Some(wildcard) = root.wildcard {
                values.append("");
                return Some(wildcard);
            }
            return None;
        }
        self.search_in(ROOT, path, values)
    }

    fn search_in(&self, current: NodeId, path: &[u8], values: &mut ParamValues) -> Option<NodeId> {
        debug_assert!(!path.is_empty());
        let node = &self.nodes[current];

        if let Some((child_id, prefix_len)) = node.child_for(path[0]) {
            let child = &self.nodes[child_id];
            if path.len() == prefix_len && *path == *child.prefix {
                if child.handler.is_some() {
                    return Some(child_id);
                }
                // a wildcard straight after '/' may bind the empty remainder
                if let Some(wildcard) = child.wildcard
                    && child.prefix.ends_with(b"/")
                {
                    values.append("");
                    return Some(wildcard);
                }
            } else if path.len() > prefix_len
                && path[..prefix_len] == *child.prefix
                && let Some(found) = self.search_in(child_id, &path[prefix_len..], values)
            {
                return Some(found);
            }
            // dead end below: fall through to the param/wildcard fallbacks
        }

        if let Some(param) = node.param {
            match path.iter().position(|&b| b == b'/') {
                None => {
                    // the param consumes the whole remainder, but only a
                    // terminal param node may end the match here
                    if self.nodes[param].handler.is_some() {
                        append_capture(values, path);
                        return Some(param);
                    }
                }
                Some(slash) if slash > 0 => {
                    if let Some(found) = self.search_in(param, &path[slash..], values) {
                        append_capture(values, &path[..slash]);
                        return Some(found);
                    }
                }
                // an empty capture never matches
                Some(_) => {}
            }
        }

        if let Some(wildcard) = node.wildcard {
            append_capture(values, path);
            return Some(wildcard);
        }

        None
    }

    /// Case-insensitive variant of [`search`](Tree::search). On success also
    /// returns the matched path rebuilt with the registered casing of every
    /// literal span.
    pub(crate) fn search_case_insensitive(
        &self,
        path: &str,
        values: &mut ParamValues,
    ) -> Option<(NodeId, String)> {
        let bytes = path.as_bytes();
        let stripped = strip_leading_slash(bytes);
        let mut buf = ReversePathBuffer::with_capacity(stripped.len() + 1);

        let found = if stripped.is_empty() {
            let root = &self.nodes[ROOT];
            if root.handler.is_some() {
                Some(ROOT)
            } else if let Some(wildcard) = root.wildcard {
                values.append("");
                Some(wildcard)
            } else {
                None
            }
        } else {
            self.search_ci_in(ROOT, stripped, values, &mut buf)
        }?;

        buf.prepend(b"/");
        let corrected = buf.into_string()?;
        Some((found, corrected))
    }

    fn search_ci_in(
        &self,
        current: NodeId,
        path: &[u8],
        values: &mut ParamValues,
        buf: &mut ReversePathBuffer,
    ) -> Option<NodeId> {
        debug_assert!(!path.is_empty());
        let node = &self.nodes[current];

        let (candidates, candidate_count) = fold_candidates(path[0]);
        for &byte in &candidates[..candidate_count] {
            let Some((child_id, prefix_len)) = node.child_for(byte) else {
                continue;
            };
            let child = &self.nodes[child_id];
            if path.len() == prefix_len && path.eq_ignore_ascii_case(&child.prefix) {
                if child.handler.is_some() {
                    buf.prepend(&child.prefix);
                    return Some(child_id);
                }
                if let Some(wildcard) = child.wildcard
                    && child.prefix.ends_with(b"/")
                {
                    values.append("");
                    buf.prepend(&child.prefix);
                    return Some(wildcard);
                }
            } else if path.len() > prefix_len
                && path[..prefix_len].eq_ignore_ascii_case(&child.prefix)
                && let Some(found) = self.search_ci_in(child_id, &path[prefix_len..], values, buf)
            {
                buf.prepend(&child.prefix);
                return Some(found);
            }
        }

        if let Some(param) = node.param {
            match path.iter().position(|&b| b == b'/') {
                None => {
                    if self.nodes[param].handler.is_some() {
                        append_capture(values, path);
                        buf.prepend(path);
                        return Some(param);
                    }
                }
                Some(slash) if slash > 0 => {
                    if let Some(found) = self.search_ci_in(param, &path[slash..], values, buf) {
                        append_capture(values, &path[..slash]);
                        buf.prepend(&path[..slash]);
                        return Some(found);
                    }
                }
                Some(_) => {}
            }
        }

        if let Some(wildcard) = node.wildcard {
            append_capture(values, path);
            buf.prepend(path);
            return Some(wildcard);
        }

        None
    }
}

fn strip_leading_slash(path: &[u8]) -> &[u8] {
    match path.first() {
        Some(&b'/') => &path[1..],
        _ => path,
    }
}

/// Captures are always cut on ASCII boundaries (`/` separators or whole
/// template-literal matches) of a UTF-8 request path, so the slice is valid
/// UTF-8.
fn append_capture(values: &mut ParamValues, bytes: &[u8]) {
    if let Ok(value) = str::from_utf8(bytes) {
        values.append(value);
    }
}

fn common_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

/// The raw byte plus, for ASCII letters, its case-swapped form.
fn fold_candidates(byte: u8) -> ([u8; 2], usize) {
    if byte.is_ascii_alphabetic() { ([byte, byte ^ 0b0010_0000], 2) } else { ([byte, 0], 1) }
}
