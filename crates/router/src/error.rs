use thiserror::Error;

/// Errors raised while registering routes or compiling the router.
///
/// All of these are registration-time failures and abort the build step:
/// [`RouterBuilder::build`](crate::RouterBuilder::build) stops at the first
/// offending template instead of producing a partially built router. A
/// request that matches nothing is *not* an error, it is reported through
/// [`RouteOutcome::NotFound`](crate::RouteOutcome::NotFound).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("route must start with '/': {template}")]
    MissingLeadingSlash { template: String },

    #[error("route must not contain whitespace: {template}")]
    EmbeddedWhitespace { template: String },

    #[error("route segment declares more than one parameter or wildcard: {template}")]
    DoubleMarker { template: String },

    #[error("wildcard must be the final segment of the route: {template}")]
    MisplacedWildcard { template: String },

    #[error("parameter or wildcard is missing a name: {template}")]
    MissingName { template: String },

    #[error("route '{new}' conflicts with previously registered '{existing}'")]
    Conflict { new: String, existing: String },
}

impl RouteError {
    pub fn missing_leading_slash<S: ToString>(template: S) -> Self {
        Self::MissingLeadingSlash { template: template.to_string() }
    }

    pub fn embedded_whitespace<S: ToString>(template: S) -> Self {
        Self::EmbeddedWhitespace { template: template.to_string() }
    }

    pub fn double_marker<S: ToString>(template: S) -> Self {
        Self::DoubleMarker { template: template.to_string() }
    }

    pub fn misplaced_wildcard<S: ToString>(template: S) -> Self {
        Self::MisplacedWildcard { template: template.to_string() }
    }

    pub fn missing_name<S: ToString>(template: S) -> Self {
        Self::MissingName { template: template.to_string() }
    }

    pub fn conflict<N: ToString, E: ToString>(new: N, existing: E) -> Self {
        Self::Conflict { new: new.to_string(), existing: existing.to_string() }
    }
}
