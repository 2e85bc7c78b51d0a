use std::time::Instant;

use tracing::{info, info_span, warn};

use super::{Middleware, Next};
use crate::error::RouterError;
use crate::pattern::MatchResult;
use crate::request::Request;
use crate::response::Response;

/// Logs one structured event per request with status and latency, inside a
/// span carrying the method and path.
pub struct TraceMiddleware;

impl Middleware for TraceMiddleware {
    fn handle(
        &self,
        request: &Request,
        result: &MatchResult,
        next: Next<'_>,
    ) -> Result<Response, RouterError> {
        let span = info_span!("request", method = %request.method, path = %request.path);
        let _guard = span.enter();

        let start = Instant::now();
        let outcome = next.run(request, result);
        let latency_ms = start.elapsed().as_millis() as u64;

        match &outcome {
            Ok(response) => info!(status = response.status, latency_ms, "Request handled"),
            Err(err) => warn!(error = %err, latency_ms, "Request failed"),
        }
        outcome
    }
}
