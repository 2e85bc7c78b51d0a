use serde_json::json;

use super::{Middleware, Next};
use crate::error::RouterError;
use crate::pattern::MatchResult;
use crate::request::Request;
use crate::response::Response;

/// Token-based authentication middleware.
///
/// Checks the `Authorization` header against the configured token and
/// short-circuits with 401 Unauthorized when it is missing or wrong; the
/// rest of the chain and the handler never run.
pub struct TokenAuthMiddleware {
    token: String,
}

impl TokenAuthMiddleware {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl Middleware for TokenAuthMiddleware {
    fn handle(
        &self,
        request: &Request,
        result: &MatchResult,
        next: Next<'_>,
    ) -> Result<Response, RouterError> {
        match request.header("authorization") {
            Some(h) if h == self.token => next.run(request, result),
            _ => Ok(Response::json(json!({ "error": "Unauthorized" })).with_status(401)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn test_wrong_token_short_circuits() {
        let mw = TokenAuthMiddleware::new("secret");
        let request = Request::new(Method::GET, "/me").with_header("Authorization", "nope");
        let result = MatchResult::empty();
        let terminal =
            |_: &Request, _: &MatchResult| -> Result<Response, RouterError> { unreachable!() };
        let next = super::super::core::test_next(&terminal);
        let response = mw.handle(&request, &result, next).unwrap();
        assert_eq!(response.status, 401);
    }

    #[test]
    fn test_matching_token_continues() {
        let mw = TokenAuthMiddleware::new("secret");
        let request = Request::new(Method::GET, "/me").with_header("Authorization", "secret");
        let result = MatchResult::empty();
        let terminal = |_: &Request, _: &MatchResult| -> Result<Response, RouterError> {
            Ok(Response::text("through"))
        };
        let next = super::super::core::test_next(&terminal);
        let response = mw.handle(&request, &result, next).unwrap();
        assert_eq!(response.status, 200);
    }
}
