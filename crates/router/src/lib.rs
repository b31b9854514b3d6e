//! A compiled HTTP request router
//!
//! This crate matches request paths against registered route templates and
//! hands back the associated handler together with captured path parameters.
//! Routes are compiled once into per-method matching structures; afterwards
//! every dispatch is read-only, allocation-free in the steady state, and safe
//! under unlimited concurrency.
//!
//! # Features
//!
//! - Literal routes, single-segment parameters (`/users/:id`) and trailing
//!   wildcards (`/static/*filepath`)
//! - Compressed radix tree matching with static-first priority and
//!   backtracking
//! - Automatic per-method strategy selection: hash map, radix tree, or a
//!   hybrid of both depending on the route mix
//! - Pooled parameter buffers, so matching a parametric route performs no
//!   heap allocation after warm-up
//! - Optional fallbacks: trailing-slash tolerance, path normalization with
//!   case-insensitive retry, and `Allow` computation for 405 responses
//! - Handlers are an opaque payload: the router stores and returns them,
//!   invocation stays with the embedding server
//!
//! # Example
//!
//! ```
//! use http::Method;
//! use micro_router::{Fallback, RouteOutcome, Router};
//!
//! let router = Router::builder()
//!     .route(Method::GET, "/users/find", "find users")
//!     .route(Method::GET, "/users/:id", "user by id")
//!     .route(Method::GET, "/static/*filepath", "assets")
//!     .trailing_slash(Fallback::Execute)
//!     .build()?;
//!
//! match router.dispatch(&Method::GET, "/users/42") {
//!     RouteOutcome::Matched(found) => {
//!         assert_eq!(found.handler(), &"user by id");
//!         assert_eq!(found.params().get("id"), Some("42"));
//!     }
//!     _ => unreachable!(),
//! }
//! # Ok::<(), micro_router::RouteError>(())
//! ```

mod error;
mod mux;
mod params;
mod path;
mod router;
mod scanner;
mod tree;
mod utils;

pub use error::RouteError;
pub use params::OwnedParams;
pub use params::Params;
pub use router::Fallback;
pub use router::RouteMatch;
pub use router::RouteOutcome;
pub use router::Router;
pub use router::RouterBuilder;
