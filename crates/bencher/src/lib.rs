#[derive(Debug, Copy, Clone)]
pub struct RouteTable {
    name: &'static str,
    routes: &'static [&'static str],
    requests: &'static [(&'static str, &'static str)],
}

impl RouteTable {
    pub const fn new(
        name: &'static str,
        routes: &'static [&'static str],
        requests: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self { name, routes, requests }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn routes(&self) -> &'static [&'static str] {
        self.routes
    }

    /// `(path, expected handler)` pairs driven through the built router.
    pub fn requests(&self) -> &'static [(&'static str, &'static str)] {
        self.requests
    }
}

/// Rewrites a route template into the `{name}` / `{*name}` syntax the
/// `matchit` baseline expects. Only segment-aligned markers are converted,
/// which all benchmark tables respect.
pub fn to_matchit(template: &str) -> String {
    template
        .split('/')
        .map(|segment| match segment.as_bytes().first() {
            Some(b':') => format!("{{{}}}", &segment[1..]),
            Some(b'*') => format!("{{*{}}}", &segment[1..]),
            _ => segment.to_owned(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// A fully literal table: exercises the hash-map strategy.
pub static STATIC_TABLE: RouteTable = RouteTable::new(
    "static",
    &[
        "/",
        "/index.html",
        "/about",
        "/contact",
        "/login",
        "/logout",
        "/signup",
        "/settings",
        "/settings/profile",
        "/settings/security",
        "/api/health",
        "/api/version",
    ],
    &[("/", "/"), ("/settings/security", "/settings/security"), ("/api/health", "/api/health")],
);

/// A parameter-heavy table: exercises the pure radix strategy.
pub static PARAM_TABLE: RouteTable = RouteTable::new(
    "param",
    &[
        "/:lang",
        "/:lang/docs",
        "/:lang/docs/:page",
        "/:lang/blog/:year/:month/:slug",
        "/:lang/files/*filepath",
    ],
    &[
        ("/en/docs/routing", "/:lang/docs/:page"),
        ("/de/blog/2025/04/radix-trees", "/:lang/blog/:year/:month/:slug"),
        ("/en/files/css/site.css", "/:lang/files/*filepath"),
    ],
);

/// A mixed api-style table: exercises the hybrid strategy.
pub static API_TABLE: RouteTable = RouteTable::new(
    "api",
    &[
        "/user",
        "/user/emails",
        "/user/keys",
        "/user/keys/:id",
        "/users/:user",
        "/users/:user/repos",
        "/repos/:owner/:repo",
        "/repos/:owner/:repo/issues",
        "/repos/:owner/:repo/issues/:number",
        "/repos/:owner/:repo/contents/*path",
        "/orgs/:org",
        "/orgs/:org/members",
    ],
    &[
        ("/user", "/user"),
        ("/users/octocat/repos", "/users/:user/repos"),
        ("/repos/foldright/micro-router/issues/7", "/repos/:owner/:repo/issues/:number"),
        ("/repos/foldright/micro-router/contents/src/lib.rs", "/repos/:owner/:repo/contents/*path"),
    ],
);

pub fn route_tables() -> Vec<RouteTable> {
    vec![STATIC_TABLE, PARAM_TABLE, API_TABLE]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_matchit_conversion() {
        assert_eq!(to_matchit("/users/:user/repos"), "/users/{user}/repos");
        assert_eq!(to_matchit("/files/*filepath"), "/files/{*filepath}");
        assert_eq!(to_matchit("/static/only"), "/static/only");
    }
}
