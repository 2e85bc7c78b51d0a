//! # Server Module
//!
//! HTTP serving layer built on `may_minihttp` and the `may` coroutine
//! runtime.
//!
//! The router itself never touches the wire; this module adapts it:
//!
//! 1. [`parse_request`] extracts the method, path, headers and JSON body
//!    from a wire request.
//! 2. [`AppService`] implements `HttpService`, driving
//!    [`Router::dispatch`](crate::router::Router::dispatch) and flushing
//!    the resulting response. Failures the router propagates (unknown
//!    controllers, unresolved parameter types, handler errors) are written
//!    as 500 JSON bodies.
//! 3. [`serve`] binds the listener and returns a [`RouterHandle`] with a
//!    readiness probe and stop/join; each connection is handled on a
//!    `may` coroutine, so one request maps to one logical task.
//!
//! The router must be fully declared before `serve` is called; after that
//! it is shared read-only between connections.

/// Wire request parsing
pub mod request;
/// Response flushing
pub mod response;
/// HttpService implementation and the serve entry point
pub mod service;

pub use request::parse_request;
pub use response::{write_json_error, write_response};
pub use service::{serve, AppService, RouterHandle};
