use std::collections::HashMap;

use http::Method;
use serde_json::Value;

/// Incoming HTTP request as seen by the router.
///
/// Protocol parsing belongs to the serving layer; the router only needs the
/// method, the path with the query string already stripped, headers with
/// lowercased names and an optional JSON body.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Value>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Attach a header; names are stored lowercased, matching the wire
    /// parser.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.into());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// True when the client signalled it wants JSON renditions of
    /// router-generated responses: the AJAX marker header or an explicit
    /// JSON accept.
    pub fn wants_json(&self) -> bool {
        if let Some(v) = self.header("x-requested-with") {
            if v.eq_ignore_ascii_case("xmlhttprequest") {
                return true;
            }
        }
        self.header("accept")
            .is_some_and(|v| v.contains("application/json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let req = Request::new(Method::GET, "/").with_header("X-Token", "abc");
        assert_eq!(req.header("x-token"), Some("abc"));
        assert_eq!(req.header("X-TOKEN"), Some("abc"));
    }

    #[test]
    fn test_wants_json_via_ajax_marker() {
        let req =
            Request::new(Method::GET, "/").with_header("X-Requested-With", "XMLHttpRequest");
        assert!(req.wants_json());
    }

    #[test]
    fn test_wants_json_via_accept() {
        let req = Request::new(Method::GET, "/")
            .with_header("Accept", "application/json, text/plain");
        assert!(req.wants_json());
    }

    #[test]
    fn test_plain_request_does_not_want_json() {
        let req = Request::new(Method::GET, "/").with_header("Accept", "text/html");
        assert!(!req.wants_json());
    }
}
