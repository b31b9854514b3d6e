//! Route registration, compilation and request dispatch.
//!
//! [`RouterBuilder`] accumulates `(method, template, handler)` triples plus
//! the fallback configuration; [`RouterBuilder::build`] is the compile step
//! that groups routes per method and builds one multiplexer each. The
//! resulting [`Router`] is immutable and shared freely across threads.
//!
//! Dispatch runs a fixed attempt sequence: exact match, then (if enabled)
//! a retry with the trailing slash toggled, then (if enabled) a retry on
//! the normalized path with case folding. When everything misses and
//! method-not-allowed reporting is on, every other registered method is
//! probed with the exact path to produce an `Allow` value.

use http::{Method, StatusCode};
use tracing::trace;

use crate::error::RouteError;
use crate::mux::Mux;
use crate::params::Params;
use crate::path::clean_path;

/// The built-in verbs, in the fixed ascending order used for the
/// method-not-allowed probe.
static BUILTIN_METHODS: [Method; 9] = [
    Method::CONNECT,
    Method::DELETE,
    Method::GET,
    Method::HEAD,
    Method::OPTIONS,
    Method::PATCH,
    Method::POST,
    Method::PUT,
    Method::TRACE,
];

fn builtin_slot(method: &Method) -> Option<usize> {
    BUILTIN_METHODS.iter().position(|m| m == method)
}

/// What a fallback stage (trailing slash, path correction) does on a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fallback {
    /// Do not attempt the fallback at all.
    #[default]
    Skip,
    /// Serve the request with the adjusted path.
    Execute,
    /// Answer with a redirect to the adjusted path.
    Redirect(StatusCode),
}

/// A matched route handed back by [`Router::dispatch`].
#[derive(Debug)]
pub struct RouteMatch<'router, T> {
    handler: &'router T,
    params: Params<'router>,
    template: Option<&'router str>,
    corrected_path: Option<String>,
}

impl<'router, T> RouteMatch<'router, T> {
    pub fn handler(&self) -> &'router T {
        self.handler
    }

    pub fn params(&self) -> &Params<'router> {
        &self.params
    }

    /// The registered template that matched. `None` for case-corrected
    /// matches, where [`corrected_path`](RouteMatch::corrected_path) is the
    /// authoritative route identity.
    pub fn template(&self) -> Option<&'router str> {
        self.template
    }

    /// The request path rebuilt in the registered casing; present only for
    /// case-corrected matches.
    pub fn corrected_path(&self) -> Option<&str> {
        self.corrected_path.as_deref()
    }
}

/// Outcome of one dispatch attempt. Failing to match is a regular outcome,
/// never an error.
#[derive(Debug)]
pub enum RouteOutcome<'router, T> {
    Matched(RouteMatch<'router, T>),
    /// A fallback stage configured for redirecting hit; answer with
    /// `status` and a `Location` of `location`.
    Redirect { location: String, status: StatusCode },
    /// No route on this method, but `allow` lists methods that do serve the
    /// path.
    MethodNotAllowed { allow: String },
    NotFound,
}

/// An immutable, compiled request router.
///
/// Built once via [`Router::builder`]; afterwards every lookup is read-only
/// and safe under unlimited concurrency. Handlers are an opaque payload
/// `T` — the router stores and returns them, invocation stays with the
/// embedding server.
#[derive(Debug)]
pub struct Router<T> {
    builtin: [Option<Mux<T>>; 9],
    custom: Vec<(Method, Mux<T>)>,
    trailing_slash: Fallback,
    path_correction: Fallback,
    method_not_allowed: bool,
}

impl<T> Router<T> {
    pub fn builder() -> RouterBuilder<T> {
        RouterBuilder::default()
    }

    fn mux_for(&self, method: &Method) -> Option<&Mux<T>> {
        match builtin_slot(method) {
            Some(slot) => self.builtin[slot].as_ref(),
            None => self.custom.iter().find(|(m, _)| m == method).map(|(_, mux)| mux),
        }
    }

    /// Selects the handler for `(method, path)`.
    ///
    /// The attempt sequence is: exact match, trailing-slash retry, then
    /// case-insensitive retry on the normalized path — the latter two only
    /// when configured. A miss yields [`RouteOutcome::MethodNotAllowed`] or
    /// [`RouteOutcome::NotFound`].
    pub fn dispatch(&self, method: &Method, path: &str) -> RouteOutcome<'_, T> {
        if let Some(mux) = self.mux_for(method) {
            if let Some(found) = mux.find(path) {
                return RouteOutcome::Matched(RouteMatch {
                    handler: found.handler,
                    params: found.params,
                    template: Some(found.template),
                    corrected_path: None,
                });
            }

            match self.trailing_slash {
                Fallback::Skip => {}
                behavior => {
                    if path != "/" {
                        let toggled = toggle_trailing_slash(path);
                        if let Some(found) = mux.find(&toggled) {
                            return match behavior {
                                Fallback::Redirect(status) => {
                                    RouteOutcome::Redirect { location: toggled, status }
                                }
                                _ => RouteOutcome::Matched(RouteMatch {
                                    handler: found.handler,
                                    params: found.params,
                                    template: Some(found.template),
                                    corrected_path: None,
                                }),
                            };
                        }
                    }
                }
            }

            match self.path_correction {
                Fallback::Skip => {}
                behavior => {
                    let cleaned = clean_path(path);
                    if let Some(corrected) = mux.find_ci(&cleaned) {
                        return match behavior {
                            Fallback::Redirect(status) => {
                                RouteOutcome::Redirect { location: corrected.corrected_path, status }
                            }
                            _ => RouteOutcome::Matched(RouteMatch {
                                handler: corrected.handler,
                                params: corrected.params,
                                // reconstructed rather than looked up; the
                                // corrected path is the route identity here
                                template: None,
                                corrected_path: Some(corrected.corrected_path),
                            }),
                        };
                    }
                }
            }
        }

        if self.method_not_allowed {
            let allow = self.allowed(method, path);
            if !allow.is_empty() {
                trace!(%method, path, %allow, "method not allowed");
                return RouteOutcome::MethodNotAllowed { allow };
            }
        }

        trace!(%method, path, "no route matched");
        RouteOutcome::NotFound
    }

    /// Joins every other method that serves `path` exactly into an `Allow`
    /// header value: built-in verbs in fixed ascending order, then custom
    /// verbs in registration order.
    pub fn allowed(&self, method: &Method, path: &str) -> String {
        let mut verbs: Vec<&str> = Vec::new();
        for (slot, mux) in self.builtin.iter().enumerate() {
            let Some(mux) = mux else { continue };
            let candidate = &BUILTIN_METHODS[slot];
            if candidate != method && mux.matches(path) {
                verbs.push(candidate.as_str());
            }
        }
        for (candidate, mux) in &self.custom {
            if candidate != method && mux.matches(path) {
                verbs.push(candidate.as_str());
            }
        }
        verbs.join(", ")
    }
}

/// Builder accumulating routes and configuration for a [`Router`].
#[derive(Debug)]
pub struct RouterBuilder<T> {
    routes: Vec<(Method, String, T)>,
    trailing_slash: Fallback,
    path_correction: Fallback,
    method_not_allowed: bool,
}

impl<T> Default for RouterBuilder<T> {
    fn default() -> Self {
        Self {
            routes: Vec::new(),
            trailing_slash: Fallback::Skip,
            path_correction: Fallback::Skip,
            method_not_allowed: false,
        }
    }
}

impl<T> RouterBuilder<T> {
    /// Registers one `(method, template, handler)` triple.
    pub fn route(mut self, method: Method, template: impl Into<String>, handler: T) -> Self {
        self.routes.push((method, template.into(), handler));
        self
    }

    /// Behavior when the path matches with its trailing slash toggled.
    pub fn trailing_slash(mut self, fallback: Fallback) -> Self {
        self.trailing_slash = fallback;
        self
    }

    /// Behavior when the normalized, case-folded path matches.
    pub fn path_correction(mut self, fallback: Fallback) -> Self {
        self.path_correction = fallback;
        self
    }

    /// Enables probing other methods for an `Allow` listing when nothing
    /// matches. Off by default.
    pub fn handle_method_not_allowed(mut self, enabled: bool) -> Self {
        self.method_not_allowed = enabled;
        self
    }

    /// The compile step: groups routes per method and builds one multiplexer
    /// each. Fails fast on the first malformed or conflicting template.
    pub fn build(self) -> Result<Router<T>, RouteError> {
        let mut grouped: Vec<(Method, Vec<(String, T)>)> = Vec::new();
        for (method, template, handler) in self.routes {
            match grouped.iter_mut().find(|(m, _)| *m == method) {
                Some((_, routes)) => routes.push((template, handler)),
                None => grouped.push((method, vec![(template, handler)])),
            }
        }

        let mut builtin = [const { None }; 9];
        let mut custom = Vec::new();
        for (method, routes) in grouped {
            let mux = Mux::build(routes)?;
            match builtin_slot(&method) {
                Some(slot) => builtin[slot] = Some(mux),
                None => custom.push((method, mux)),
            }
        }

        Ok(Router {
            builtin,
            custom,
            trailing_slash: self.trailing_slash,
            path_correction: self.path_correction,
            method_not_allowed: self.method_not_allowed,
        })
    }
}

fn toggle_trailing_slash(path: &str) -> String {
    match path.strip_suffix('/') {
        Some(stripped) => stripped.to_owned(),
        None => {
            let mut toggled = String::with_capacity(path.len() + 1);
            toggled.push_str(path);
            toggled.push('/');
            toggled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expect_match<'r>(outcome: RouteOutcome<'r, &'static str>) -> RouteMatch<'r, &'static str> {
        match outcome {
            RouteOutcome::Matched(found) => found,
            other => panic!("expected a match, got {other:?}"),
        }
    }

    fn router() -> Router<&'static str> {
        Router::builder()
            .route(Method::GET, "/users/find", "find")
            .route(Method::GET, "/users/find/:name", "find by name")
            .route(Method::GET, "/images/*filepath", "images")
            .route(Method::POST, "/users", "create user")
            .build()
            .expect("router should build")
    }

    #[test]
    fn test_dispatch_static_and_param() {
        let router = router();

        let found = expect_match(router.dispatch(&Method::GET, "/users/find"));
        assert_eq!(found.handler(), &"find");
        assert_eq!(found.template(), Some("/users/find"));
        assert!(found.params().is_empty());

        let found = expect_match(router.dispatch(&Method::GET, "/users/find/yousuf"));
        assert_eq!(found.handler(), &"find by name");
        assert_eq!(found.params().get("name"), Some("yousuf"));
        assert_eq!(found.template(), Some("/users/find/:name"));
    }

    #[test]
    fn test_dispatch_wildcard_empty_tail() {
        let router = router();

        let found = expect_match(router.dispatch(&Method::GET, "/images/"));
        assert_eq!(found.handler(), &"images");
        assert_eq!(found.params().get("filepath"), Some(""));

        assert!(matches!(router.dispatch(&Method::GET, "/images"), RouteOutcome::NotFound));
    }

    #[test]
    fn test_dispatch_respects_method() {
        let router = router();
        assert!(matches!(router.dispatch(&Method::POST, "/users/find"), RouteOutcome::NotFound));
        let found = expect_match(router.dispatch(&Method::POST, "/users"));
        assert_eq!(found.handler(), &"create user");
    }

    #[test]
    fn test_dispatch_fallback_collision() {
        let router = Router::builder()
            .route(Method::GET, "/color|:hex", "hex")
            .route(Method::GET, "/:text", "text")
            .build()
            .expect("router should build");

        let found = expect_match(router.dispatch(&Method::GET, "/color|"));
        assert_eq!(found.handler(), &"text");
        assert_eq!(found.params().get("text"), Some("color|"));

        let found = expect_match(router.dispatch(&Method::GET, "/color|bada55"));
        assert_eq!(found.handler(), &"hex");
        assert_eq!(found.params().get("hex"), Some("bada55"));
    }

    #[test]
    fn test_trailing_slash_skipped_by_default() {
        let router = router();
        assert!(matches!(router.dispatch(&Method::GET, "/users/find/"), RouteOutcome::NotFound));
    }

    #[test]
    fn test_trailing_slash_execute() {
        let router = Router::builder()
            .route(Method::GET, "/users/find", "find")
            .route(Method::GET, "/docs/", "docs")
            .trailing_slash(Fallback::Execute)
            .build()
            .expect("router should build");

        let found = expect_match(router.dispatch(&Method::GET, "/users/find/"));
        assert_eq!(found.handler(), &"find");
        // the slash is added as well as removed
        let found = expect_match(router.dispatch(&Method::GET, "/docs"));
        assert_eq!(found.handler(), &"docs");
    }

    #[test]
    fn test_trailing_slash_redirect() {
        let router = Router::builder()
            .route(Method::GET, "/users/find", "find")
            .trailing_slash(Fallback::Redirect(StatusCode::MOVED_PERMANENTLY))
            .build()
            .expect("router should build");

        match router.dispatch(&Method::GET, "/users/find/") {
            RouteOutcome::Redirect { location, status } => {
                assert_eq!(location, "/users/find");
                assert_eq!(status, StatusCode::MOVED_PERMANENTLY);
            }
            other => panic!("expected a redirect, got {other:?}"),
        }
    }

    #[test]
    fn test_path_correction_execute_drops_template() {
        let router = Router::builder()
            .route(Method::GET, "/Users/:id/Posts", "posts")
            .path_correction(Fallback::Execute)
            .build()
            .expect("router should build");

        let found = expect_match(router.dispatch(&Method::GET, "/users/7/POSTS"));
        assert_eq!(found.handler(), &"posts");
        assert_eq!(found.params().get("id"), Some("7"));
        assert_eq!(found.template(), None);
        assert_eq!(found.corrected_path(), Some("/Users/7/Posts"));
    }

    #[test]
    fn test_path_correction_normalizes_before_matching() {
        let router = Router::builder()
            .route(Method::GET, "/users/find", "find")
            .path_correction(Fallback::Redirect(StatusCode::PERMANENT_REDIRECT))
            .build()
            .expect("router should build");

        match router.dispatch(&Method::GET, "//users/./FIND") {
            RouteOutcome::Redirect { location, status } => {
                assert_eq!(location, "/users/find");
                assert_eq!(status, StatusCode::PERMANENT_REDIRECT);
            }
            other => panic!("expected a redirect, got {other:?}"),
        }
    }

    #[test]
    fn test_method_not_allowed_lists_serving_methods() {
        let bar = Method::from_bytes(b"BAR").expect("valid method");
        let xyz = Method::from_bytes(b"XYZ").expect("valid method");
        let router = Router::builder()
            .route(Method::GET, "/foo/foo", "get")
            .route(Method::POST, "/foo/foo", "post")
            .route(Method::TRACE, "/foo/foo", "trace")
            .route(Method::CONNECT, "/foo/foo", "connect")
            .route(bar, "/foo/foo", "bar")
            .route(xyz, "/foo/foo", "xyz")
            .handle_method_not_allowed(true)
            .build()
            .expect("router should build");

        match router.dispatch(&Method::OPTIONS, "/foo/foo") {
            RouteOutcome::MethodNotAllowed { allow } => {
                assert_eq!(allow, "CONNECT, GET, POST, TRACE, BAR, XYZ");
            }
            other => panic!("expected method-not-allowed, got {other:?}"),
        }
    }

    #[test]
    fn test_method_not_allowed_disabled_by_default() {
        let router = Router::builder()
            .route(Method::GET, "/foo", "get")
            .build()
            .expect("router should build");
        assert!(matches!(router.dispatch(&Method::POST, "/foo"), RouteOutcome::NotFound));
    }

    #[test]
    fn test_method_not_allowed_with_no_other_candidates() {
        let router = Router::builder()
            .route(Method::GET, "/foo", "get")
            .handle_method_not_allowed(true)
            .build()
            .expect("router should build");
        assert!(matches!(router.dispatch(&Method::GET, "/bar"), RouteOutcome::NotFound));
    }

    #[test]
    fn test_custom_method_dispatch() {
        let purge = Method::from_bytes(b"PURGE").expect("valid method");
        let router = Router::builder()
            .route(purge.clone(), "/cache/:key", "purge")
            .build()
            .expect("router should build");

        let found = expect_match(router.dispatch(&purge, "/cache/users"));
        assert_eq!(found.handler(), &"purge");
        assert_eq!(found.params().get("key"), Some("users"));
    }

    #[test]
    fn test_compile_is_idempotent() {
        let build = || {
            Router::builder()
                .route(Method::GET, "/users/find", "find")
                .route(Method::GET, "/users/:id", "by id")
                .route(Method::GET, "/files/*rest", "files")
                .build()
                .expect("router should build")
        };
        let first = build();
        let second = build();

        for path in ["/users/find", "/users/9", "/files/a/b", "/nope"] {
            let a = first.dispatch(&Method::GET, path);
            let b = second.dispatch(&Method::GET, path);
            match (a, b) {
                (RouteOutcome::Matched(a), RouteOutcome::Matched(b)) => {
                    assert_eq!(a.handler(), b.handler());
                    assert_eq!(a.params().to_vec(), b.params().to_vec());
                    assert_eq!(a.template(), b.template());
                }
                (RouteOutcome::NotFound, RouteOutcome::NotFound) => {}
                other => panic!("dispatch diverged for {path}: {other:?}"),
            }
        }
    }

    #[test]
    fn test_build_rejects_malformed_template() {
        let result = Router::builder().route(Method::GET, "users", "no slash").build();
        assert_eq!(result.err(), Some(RouteError::missing_leading_slash("users")));

        let result = Router::builder().route(Method::GET, "/a/*w/b", "bad wildcard").build();
        assert_eq!(result.err(), Some(RouteError::misplaced_wildcard("/a/*w/b")));
    }

    #[test]
    fn test_build_rejects_duplicate_registration() {
        let result = Router::builder()
            .route(Method::GET, "/dup", "one")
            .route(Method::GET, "/dup", "two")
            .build();
        assert_eq!(result.err(), Some(RouteError::conflict("/dup", "/dup")));
    }

    #[test]
    fn test_pool_reuse_across_dispatches() {
        let router = Router::builder()
            .route(Method::GET, "/users/:id", "by id")
            .route(Method::GET, "/users/:id/posts/:post", "post")
            .build()
            .expect("router should build");

        for round in 0..3 {
            let found = expect_match(router.dispatch(&Method::GET, &format!("/users/{round}")));
            assert_eq!(found.params().get("id"), Some(format!("{round}").as_str()));

            let found =
                expect_match(router.dispatch(&Method::GET, &format!("/users/{round}/posts/p{round}")));
            assert_eq!(found.params().get("id"), Some(format!("{round}").as_str()));
            assert_eq!(found.params().get("post"), Some(format!("p{round}").as_str()));
        }
    }
}
