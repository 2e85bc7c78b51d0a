//! Declarative HTTP request router.
//!
//! Routes are declared against the [`router::Router`] facade as URI
//! templates with named `{segment}` placeholders, optionally inside nested
//! groups composing prefixes, namespaces, segment constraints and
//! middleware. At request time the router matches the path in declaration
//! order, negotiates the method (404 vs 405 vs OPTIONS pre-flight),
//! threads the request through the route's middleware chain and resolves
//! handler arguments from the matched segments and the resolver registry.

pub mod controller;
pub mod error;
pub mod middleware;
pub mod pattern;
pub mod request;
pub mod resolver;
pub mod response;
pub mod route;
pub mod router;
pub mod server;

pub use controller::{Controller, ControllerRegistry, ParamSpec, INVOKABLE_METHOD};
pub use error::RouterError;
pub use pattern::{CompiledMatcher, Constraint, MatchResult};
pub use request::Request;
pub use resolver::{Arg, ResolverContext, ResolverRegistry};
pub use response::{HandlerOutput, Response};
pub use route::{DispatchContext, Handler, Route};
pub use router::{GroupScope, RouteCollection, Router};
