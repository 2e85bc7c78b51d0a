use std::fmt;

use http::Method;

/// Failures raised while declaring routes or dispatching a request.
///
/// `NoRouteForRequest` and `MethodNotAllowed` are caught at the facade
/// boundary and rendered as 404/405 responses; everything else propagates
/// to the caller of [`crate::router::Router::dispatch`].
#[derive(Debug)]
pub enum RouterError {
    /// Malformed URI template or constraint pattern, or a duplicate segment
    /// name within one template. Surfaces during declaration and is fatal
    /// for that route.
    InvalidTemplate {
        /// The offending template string
        template: String,
        /// What made it invalid
        reason: String,
    },
    /// No declared route's path matched the request path.
    NoRouteForRequest {
        /// Method of the unmatched request
        method: Method,
        /// Path of the unmatched request
        path: String,
    },
    /// At least one route matched the path but none allowed the method.
    MethodNotAllowed {
        /// Union of the methods the matching routes accept, in
        /// declaration order
        supported: Vec<Method>,
    },
    /// A string handler referenced a controller that is not registered.
    UnknownController {
        /// The namespace-qualified controller reference
        controller: String,
    },
    /// The controller exists but does not expose the requested method.
    UnknownMethod {
        /// The controller the method was looked up on
        controller: String,
        /// The missing method name
        method: String,
    },
    /// A handler parameter declared a type no resolver is registered for.
    UnresolvedParameterType {
        /// The parameter name
        name: String,
        /// The declared type that failed to resolve
        ty: String,
    },
    /// A middleware identifier resolved to no registered factory.
    UnknownMiddleware {
        /// The fully-qualified identifier after alias and group expansion
        id: String,
    },
    /// Failure raised inside a user handler or middleware, propagated
    /// unchanged out of dispatch.
    Handler(anyhow::Error),
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouterError::InvalidTemplate { template, reason } => {
                write!(f, "invalid route template `{template}`: {reason}")
            }
            RouterError::NoRouteForRequest { method, path } => {
                write!(f, "no route for {method} {path}")
            }
            RouterError::MethodNotAllowed { supported } => {
                let list = supported
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "method not allowed; supported: {list}")
            }
            RouterError::UnknownController { controller } => {
                write!(f, "unknown controller `{controller}`")
            }
            RouterError::UnknownMethod { controller, method } => {
                write!(f, "controller `{controller}` has no method `{method}`")
            }
            RouterError::UnresolvedParameterType { name, ty } => {
                write!(
                    f,
                    "no resolver registered for parameter `{name}` of type `{ty}`"
                )
            }
            RouterError::UnknownMiddleware { id } => {
                write!(f, "unknown middleware `{id}`")
            }
            RouterError::Handler(err) => write!(f, "handler failed: {err}"),
        }
    }
}

impl std::error::Error for RouterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RouterError::Handler(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for RouterError {
    fn from(err: anyhow::Error) -> Self {
        RouterError::Handler(err)
    }
}
