//! Per-method matching backends and the strategy selection heuristic.
//!
//! Every HTTP method gets exactly one multiplexer, picked at compile time
//! from the ratio of literal-only routes among the method's registrations:
//!
//! - `100%` literal: a pure [`StaticMux`] — a path map guarded by a length
//!   bucket, so most negative lookups never hash.
//! - `>= 30%` literal: a hybrid — the static table is probed first, the
//!   radix tree handles the rest. Static routes are inserted into the tree
//!   as well, so the fallback searches (trailing slash, case correction)
//!   see the complete route set; the table stores node indices instead of
//!   duplicating handlers.
//! - otherwise: a pure [`RadixMux`] over the tree.
//!
//! Multiplexers are immutable once built; the parameter pool inside
//! [`RadixMux`] is the only shared mutable state and is safe under
//! concurrent dispatch.

use std::collections::HashMap;

use tracing::debug;

use crate::error::RouteError;
use crate::params::{ParamPool, Params};
use crate::scanner::scan;
use crate::tree::{NodeId, Tree};

/// Minimum percentage of literal routes for which the hybrid strategy pays
/// off.
const HYBRID_THRESHOLD: usize = 30;

/// A successful exact match.
#[derive(Debug)]
pub(crate) struct MuxMatch<'router, T> {
    pub(crate) handler: &'router T,
    pub(crate) template: &'router str,
    pub(crate) params: Params<'router>,
}

/// A successful case-insensitive match, carrying the path in its registered
/// casing instead of the template.
#[derive(Debug)]
pub(crate) struct CorrectedMatch<'router, T> {
    pub(crate) handler: &'router T,
    pub(crate) corrected_path: String,
    pub(crate) params: Params<'router>,
}

/// Existence filter bucketing registered paths by byte length.
#[derive(Debug, Default)]
struct LengthSet {
    buckets: Vec<bool>,
}

impl LengthSet {
    fn add(&mut self, len: usize) {
        if self.buckets.len() <= len {
            self.buckets.resize(len + 1, false);
        }
        self.buckets[len] = true;
    }

    fn contains(&self, len: usize) -> bool {
        self.buckets.get(len).copied().unwrap_or(false)
    }
}

/// Exact map from full path to a value, with a length-bucket pre-check.
///
/// Pure static multiplexers store handlers directly (`V = T`); the hybrid
/// strategy stores tree node indices (`V = NodeId`) so each handler has a
/// single owner.
#[derive(Debug)]
pub(crate) struct StaticMux<V> {
    routes: HashMap<Box<str>, V>,
    lengths: LengthSet,
}

impl<V> Default for StaticMux<V> {
    fn default() -> Self {
        Self { routes: HashMap::new(), lengths: LengthSet::default() }
    }
}

impl<V> StaticMux<V> {
    fn insert(&mut self, template: String, value: V) -> Result<(), RouteError> {
        if self.routes.contains_key(template.as_str()) {
            return Err(RouteError::conflict(&template, &template));
        }
        self.lengths.add(template.len());
        self.routes.insert(template.into_boxed_str(), value);
        Ok(())
    }

    fn get(&self, path: &str) -> Option<(&str, &V)> {
        if !self.lengths.contains(path.len()) {
            return None;
        }
        self.routes.get_key_value(path).map(|(key, value)| (key.as_ref(), value))
    }

    /// Case-insensitive lookup; the length bucket filters before the scan.
    fn get_fold(&self, path: &str) -> Option<(&str, &V)> {
        if !self.lengths.contains(path.len()) {
            return None;
        }
        self.routes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(path))
            .map(|(key, value)| (key.as_ref(), value))
    }
}

/// Tree-backed multiplexer with its parameter pool.
#[derive(Debug)]
pub(crate) struct RadixMux<T> {
    tree: Tree<T>,
    pool: ParamPool,
}

impl<T> RadixMux<T> {
    fn find(&self, path: &str) -> Option<MuxMatch<'_, T>> {
        let mut pooled = self.pool.acquire();
        let node_id = self.tree.search(path, &mut pooled)?;
        let node = self.tree.node(node_id);
        let handler = node.handler()?;
        let template = node.template()?;
        let params = match node.param_keys() {
            Some(keys) => {
                pooled.set_names(keys);
                Params::pooled(pooled)
            }
            None => Params::empty(),
        };
        Some(MuxMatch { handler, template, params })
    }

    fn find_ci(&self, path: &str) -> Option<CorrectedMatch<'_, T>> {
        let mut pooled = self.pool.acquire();
        let (node_id, corrected_path) = self.tree.search_case_insensitive(path, &mut pooled)?;
        let node = self.tree.node(node_id);
        let handler = node.handler()?;
        let params = match node.param_keys() {
            Some(keys) => {
                pooled.set_names(keys);
                Params::pooled(pooled)
            }
            None => Params::empty(),
        };
        Some(CorrectedMatch { handler, corrected_path, params })
    }

    fn matches(&self, path: &str) -> bool {
        let mut pooled = self.pool.acquire();
        self.tree.search(path, &mut pooled).is_some()
    }
}

/// One matching backend bound to one HTTP method.
#[derive(Debug)]
pub(crate) enum Mux<T> {
    Static(StaticMux<T>),
    Radix(RadixMux<T>),
    Hybrid { table: StaticMux<NodeId>, radix: RadixMux<T> },
}

impl<T> Mux<T> {
    /// Builds the multiplexer for one method's route set. `routes` must be
    /// non-empty.
    pub(crate) fn build(routes: Vec<(String, T)>) -> Result<Self, RouteError> {
        // scan up front: validates every template before any structure
        // exists and yields the literal/parametric ratio
        let mut scanned = Vec::with_capacity(routes.len());
        let mut static_count = 0usize;
        for (template, handler) in routes {
            let captures = scan(&template)?.captures;
            if captures == 0 {
                static_count += 1;
            }
            scanned.push((template, handler, captures));
        }

        let total = scanned.len();
        let static_percentage = static_count * 100 / total;

        let mux = if static_percentage == 100 {
            let mut table = StaticMux::default();
            for (template, handler, _) in scanned {
                table.insert(template, handler)?;
            }
            Mux::Static(table)
        } else if static_percentage >= HYBRID_THRESHOLD {
            let mut tree = Tree::new();
            let mut table = StaticMux::default();
            let mut max_captures = 0;
            for (template, handler, captures) in scanned {
                let inserted = tree.insert(&template, handler)?;
                max_captures = max_captures.max(inserted.captures);
                if captures == 0 {
                    table.insert(template, inserted.node)?;
                }
            }
            Mux::Hybrid { table, radix: RadixMux { tree, pool: ParamPool::new(max_captures) } }
        } else {
            let mut tree = Tree::new();
            let mut max_captures = 0;
            for (template, handler, _) in scanned {
                let inserted = tree.insert(&template, handler)?;
                max_captures = max_captures.max(inserted.captures);
            }
            Mux::Radix(RadixMux { tree, pool: ParamPool::new(max_captures) })
        };

        debug!(routes = total, static_percentage, strategy = mux.strategy(), "built multiplexer");
        Ok(mux)
    }

    pub(crate) fn strategy(&self) -> &'static str {
        match self {
            Mux::Static(_) => "static",
            Mux::Radix(_) => "radix",
            Mux::Hybrid { .. } => "hybrid",
        }
    }

    pub(crate) fn find(&self, path: &str) -> Option<MuxMatch<'_, T>> {
        match self {
            Mux::Static(table) => {
                let (template, handler) = table.get(path)?;
                Some(MuxMatch { handler, template, params: Params::empty() })
            }
            Mux::Radix(radix) => radix.find(path),
            Mux::Hybrid { table, radix } => {
                if let Some((template, &node_id)) = table.get(path) {
                    let handler = radix.tree.node(node_id).handler()?;
                    return Some(MuxMatch { handler, template, params: Params::empty() });
                }
                radix.find(path)
            }
        }
    }

    pub(crate) fn find_ci(&self, path: &str) -> Option<CorrectedMatch<'_, T>> {
        match self {
            Mux::Static(table) => {
                let (registered, handler) = table.get_fold(path)?;
                Some(CorrectedMatch {
                    handler,
                    corrected_path: registered.to_owned(),
                    params: Params::empty(),
                })
            }
            Mux::Radix(radix) => radix.find_ci(path),
            Mux::Hybrid { table, radix } => {
                if let Some((registered, &node_id)) = table.get_fold(path) {
                    let handler = radix.tree.node(node_id).handler()?;
                    return Some(CorrectedMatch {
                        handler,
                        corrected_path: registered.to_owned(),
                        params: Params::empty(),
                    });
                }
                radix.find_ci(path)
            }
        }
    }

    /// Existence probe used by the method-not-allowed computation.
    pub(crate) fn matches(&self, path: &str) -> bool {
        match self {
            Mux::Static(table) => table.get(path).is_some(),
            Mux::Radix(radix) => radix.matches(path),
            Mux::Hybrid { table, radix } => table.get(path).is_some() || radix.matches(path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(routes: &[&str]) -> Mux<String> {
        Mux::build(routes.iter().map(|r| ((*r).to_owned(), (*r).to_owned())).collect())
            .expect("mux should build")
    }

    #[test]
    fn test_all_static_selects_static_strategy() {
        let mux = build(&["/a", "/b", "/c"]);
        assert_eq!(mux.strategy(), "static");
    }

    #[test]
    fn test_mixed_selects_hybrid_strategy() {
        let mux = build(&["/a", "/b", "/users/:id"]);
        assert_eq!(mux.strategy(), "hybrid");
    }

    #[test]
    fn test_param_heavy_selects_radix_strategy() {
        let mux = build(&["/a", "/:b", "/:c/d", "/:e/f"]);
        assert_eq!(mux.strategy(), "radix");
    }

    #[test]
    fn test_static_lookup_with_length_filter() {
        let mux = build(&["/users/find", "/health"]);
        let found = mux.find("/users/find").expect("should match");
        assert_eq!(found.template, "/users/find");
        assert!(found.params.is_empty());
        // same length as a registered path, different bytes
        assert!(mux.find("/users/fund").is_none());
        // length bucket rejects before hashing
        assert!(mux.find("/users/find/extra").is_none());
    }

    #[test]
    fn test_hybrid_prefers_static_table() {
        let mux = build(&["/users/find", "/users/:name"]);
        let found = mux.find("/users/find").expect("should match");
        assert_eq!(found.template, "/users/find");
        assert!(found.params.is_empty());

        let found = mux.find("/users/bob").expect("should match");
        assert_eq!(found.template, "/users/:name");
        assert_eq!(found.params.get("name"), Some("bob"));
    }

    #[test]
    fn test_radix_lookup_binds_params() {
        let mux = build(&["/:lang/docs/*rest", "/:lang/blog"]);
        let found = mux.find("/en/docs/a/b").expect("should match");
        assert_eq!(found.template, "/:lang/docs/*rest");
        assert_eq!(found.params.get("lang"), Some("en"));
        assert_eq!(found.params.get("rest"), Some("a/b"));
    }

    #[test]
    fn test_static_case_insensitive_returns_registered_casing() {
        let mux = build(&["/Users/Find"]);
        let corrected = mux.find_ci("/users/find").expect("should match");
        assert_eq!(corrected.corrected_path, "/Users/Find");
        assert!(corrected.params.is_empty());
    }

    #[test]
    fn test_hybrid_case_insensitive_falls_through_to_tree() {
        let mux = build(&["/health", "/Users/:id"]);
        let corrected = mux.find_ci("/USERS/7").expect("should match");
        assert_eq!(corrected.corrected_path, "/Users/7");
        assert_eq!(corrected.params.get("id"), Some("7"));
    }

    #[test]
    fn test_duplicate_static_route_conflicts() {
        let result = Mux::build(vec![("/a".to_owned(), 1), ("/a".to_owned(), 2)]);
        assert_eq!(result.err(), Some(RouteError::conflict("/a", "/a")));
    }

    #[test]
    fn test_matches_probe() {
        let mux = build(&["/users/find", "/users/:id"]);
        assert!(mux.matches("/users/find"));
        assert!(mux.matches("/users/7"));
        assert!(!mux.matches("/nope"));
    }
}
