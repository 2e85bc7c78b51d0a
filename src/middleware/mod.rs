//! # Middleware Module
//!
//! Per-request middleware chains around route handlers.
//!
//! Each route carries an ordered list of middleware identifiers. At
//! dispatch time the [`MiddlewareRegistry`] resolves the identifiers
//! (expanding named groups inline and substituting aliases), constructs a
//! fresh instance per identifier and links them into a singly linked
//! chain; the innermost link's continuation invokes the handler.
//!
//! A middleware that returns without calling its continuation
//! short-circuits the chain - the handler never runs and the middleware's
//! response is the chain's result.

mod auth;
mod core;
mod trace;

pub use self::auth::TokenAuthMiddleware;
pub use self::core::{Middleware, MiddlewareFactory, MiddlewareLink, MiddlewareRegistry, Next};
pub use self::trace::TraceMiddleware;
