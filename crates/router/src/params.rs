//! Path parameter capture and pooling.
//!
//! Matching a parametric route produces an ordered set of `name → value`
//! pairs. The containers in this module are built so that the dispatch hot
//! path performs no heap allocation in the steady state:
//!
//! - [`ParamValues`] is a fixed-capacity value buffer. The `String` slots are
//!   reused between matches (`clear` + `push_str`), so after warm-up an
//!   append costs a byte copy only. Parameter *names* are never owned by the
//!   buffer: the matched tree node shares its name list via an `Arc` at match
//!   time.
//! - [`ParamPool`] is a mutex-protected free-list of value buffers, one pool
//!   per multiplexer. [`PooledParams`] is the acquire guard: dropping it
//!   resets the buffer and returns it to the pool, which makes double release
//!   and use-after-release unrepresentable.
//! - [`Params`] is the read-only view handed to callers. A match without
//!   captures carries the shared empty view and never touches the pool.
//!
//! Value/name ordering mirrors the tree search: values are appended while the
//! recursion unwinds (leaf-most binding first) and the stored name list is
//! pre-reversed to line up with that order. Public iteration re-reverses, so
//! callers always observe template order.

use std::collections::HashMap;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};

/// Ordered, fixed-capacity parameter capture buffer.
#[derive(Debug, Default)]
pub(crate) struct ParamValues {
    values: Vec<String>,
    len: usize,
    names: Option<Arc<[Box<str>]>>,
    capacity: usize,
}

impl ParamValues {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self { values: Vec::with_capacity(capacity), len: 0, names: None, capacity }
    }

    /// Appends one captured value at the cursor, reusing the `String` slot
    /// left behind by a previous match when there is one.
    ///
    /// Appends beyond the declared capacity are silently dropped; the tree
    /// never binds more values than the deepest registered route declares,
    /// so the bound is purely defensive.
    pub(crate) fn append(&mut self, value: &str) {
        if self.len >= self.capacity {
            return;
        }
        if let Some(slot) = self.values.get_mut(self.len) {
            slot.clear();
            slot.push_str(value);
        } else {
            self.values.push(value.to_owned());
        }
        self.len += 1;
    }

    /// Attaches the matched node's name list to the values bound during the
    /// search. Called once per successful match, after the tree walk.
    pub(crate) fn set_names(&mut self, names: &Arc<[Box<str>]>) {
        self.values.truncate(names.len());
        self.len = self.len.min(names.len());
        self.names = Some(Arc::clone(names));
    }

    /// Clears names and cursor without deallocating the value buffer.
    pub(crate) fn reset(&mut self) {
        self.len = 0;
        self.names = None;
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn get(&self, name: &str) -> Option<&str> {
        let names = self.names.as_deref()?;
        names
            .iter()
            .take(self.len)
            .position(|n| &**n == name)
            .map(|i| self.values[i].as_str())
    }

    /// Pairs in template order (root-most binding first).
    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        let names: &[Box<str>] = self.names.as_deref().unwrap_or(&[]);
        names.iter().zip(self.values.iter()).take(self.len).rev().map(|(n, v)| (&**n, v.as_str()))
    }
}

/// A free-list of [`ParamValues`] buffers shared by all requests hitting one
/// multiplexer. Buffers are sized to the maximum capture count seen while
/// the multiplexer was built.
#[derive(Debug)]
pub(crate) struct ParamPool {
    capacity: usize,
    free: Mutex<Vec<ParamValues>>,
}

impl ParamPool {
    pub(crate) fn new(capacity: usize) -> Self {
        Self { capacity, free: Mutex::new(Vec::new()) }
    }

    pub(crate) fn acquire(&self) -> PooledParams<'_> {
        let values = self
            .free
            .lock()
            .ok()
            .and_then(|mut free| free.pop())
            .unwrap_or_else(|| ParamValues::with_capacity(self.capacity));
        PooledParams { pool: self, values }
    }

    fn release(&self, mut values: ParamValues) {
        values.reset();
        if let Ok(mut free) = self.free.lock() {
            free.push(values);
        }
    }
}

/// Exclusive hold on one pooled buffer; the buffer flows back into the pool
/// when the guard drops.
#[derive(Debug)]
pub(crate) struct PooledParams<'pool> {
    pool: &'pool ParamPool,
    values: ParamValues,
}

impl Deref for PooledParams<'_> {
    type Target = ParamValues;

    fn deref(&self) -> &ParamValues {
        &self.values
    }
}

impl DerefMut for PooledParams<'_> {
    fn deref_mut(&mut self) -> &mut ParamValues {
        &mut self.values
    }
}

impl Drop for PooledParams<'_> {
    fn drop(&mut self) {
        self.pool.release(mem::take(&mut self.values));
    }
}

/// Path parameters of a matched route.
///
/// A view over the pooled capture buffer (or the shared empty set when the
/// matched route declares no parameters). The pooled buffer is recycled as
/// soon as this value is dropped; take a [`snapshot`](Params::snapshot) to
/// keep the pairs around longer.
#[derive(Debug)]
pub struct Params<'router> {
    kind: ParamsKind<'router>,
}

#[derive(Debug)]
enum ParamsKind<'router> {
    None,
    Pooled(PooledParams<'router>),
}

impl<'router> Params<'router> {
    /// The shared empty parameter set.
    #[inline]
    pub const fn empty() -> Self {
        Self { kind: ParamsKind::None }
    }

    pub(crate) fn pooled(pooled: PooledParams<'router>) -> Self {
        if pooled.len() == 0 {
            // dropping here already hands the buffer back
            Self::empty()
        } else {
            Self { kind: ParamsKind::Pooled(pooled) }
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn len(&self) -> usize {
        match &self.kind {
            ParamsKind::None => 0,
            ParamsKind::Pooled(pooled) => pooled.len(),
        }
    }

    /// Gets the value bound under `name`, or `None` if the matched route has
    /// no such parameter.
    #[inline]
    pub fn get(&self, name: impl AsRef<str>) -> Option<&str> {
        match &self.kind {
            ParamsKind::None => None,
            ParamsKind::Pooled(pooled) => pooled.get(name.as_ref()),
        }
    }

    /// Iterates `(name, value)` pairs in template order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        let pooled = match &self.kind {
            ParamsKind::None => None,
            ParamsKind::Pooled(pooled) => Some(pooled.iter()),
        };
        pooled.into_iter().flatten()
    }

    pub fn for_each(&self, mut f: impl FnMut(&str, &str)) {
        for (name, value) in self.iter() {
            f(name, value);
        }
    }

    pub fn to_map(&self) -> HashMap<String, String> {
        self.iter().map(|(n, v)| (n.to_owned(), v.to_owned())).collect()
    }

    pub fn to_vec(&self) -> Vec<(String, String)> {
        self.iter().map(|(n, v)| (n.to_owned(), v.to_owned())).collect()
    }

    /// Deep, independent copy of the pairs. Required when a handler wants to
    /// keep parameters past its own return, since the pooled original is
    /// recycled immediately afterwards.
    pub fn snapshot(&self) -> OwnedParams {
        OwnedParams { pairs: self.to_vec() }
    }
}

/// An owned snapshot of matched parameters, detached from the pool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnedParams {
    pairs: Vec<(String, String)>,
}

impl OwnedParams {
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn get(&self, name: impl AsRef<str>) -> Option<&str> {
        let name = name.as_ref();
        self.pairs.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}
