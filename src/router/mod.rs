//! # Router Module
//!
//! Route declaration and request dispatch.
//!
//! Routes are declared against the [`Router`] facade as URI templates with
//! named `{segment}` placeholders, optionally inside nested [`GroupScope`]s
//! that compose prefixes, namespaces, segment constraints and middleware
//! onto every route declared within them.
//!
//! ## Matching
//!
//! The [`RouteCollection`] scans routes in declaration order; the first
//! route whose compiled pattern accepts the path *and* whose method set
//! contains the request method wins and is dispatched. When only the path
//! matched, the collection distinguishes 405 from 404 and synthesizes
//! OPTIONS pre-flight answers from the union of the matching routes'
//! methods.
//!
//! ## Example
//!
//! ```rust,ignore
//! use routier::router::{GroupScope, Router};
//! use routier::route::Handler;
//!
//! let mut router = Router::new();
//! router.get("/ping", Handler::from_fn(|_, _| Ok("pong".into())));
//! router.group(GroupScope::new().prefix("/api"), |r| {
//!     r.get("/users/{id}", "Users@show").where_("id", r"\d+");
//! });
//!
//! let response = router.dispatch(&request)?;
//! ```

mod core;

pub use self::core::{GroupScope, RouteCollection, Router};
