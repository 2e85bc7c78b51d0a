use std::collections::HashMap;

use http::Method;
use serde::Serialize;
use serde_json::{json, Value};

/// HTTP response produced by the router.
///
/// The body keeps the serving layer's wire convention: `Value::String`
/// flushes as `text/plain`, `Value::Null` as an empty body and any other
/// value as `application/json`. An explicit `Content-Type` header wins
/// over the convention.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub status: u16,
    #[serde(skip_serializing)]
    pub headers: HashMap<String, String>,
    pub body: Value,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    /// Empty 200 response.
    pub fn new() -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            body: Value::Null,
        }
    }

    /// 200 response with a plain-text body.
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            body: Value::String(body.into()),
        }
    }

    /// 200 response with a JSON body. The content type is pinned so even a
    /// string body goes out JSON-encoded.
    pub fn json(body: Value) -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            body,
        }
        .with_header("Content-Type", "application/json")
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// 404 rendition used at the facade boundary.
    pub(crate) fn not_found(wants_json: bool) -> Self {
        if wants_json {
            Self::json(json!({
                "ok": false,
                "message": "Unknown resource.",
                "status": 404,
            }))
            .with_status(404)
        } else {
            Self::text("Not found.").with_status(404)
        }
    }

    /// 405 rendition carrying the supported method list.
    pub(crate) fn method_not_allowed(wants_json: bool, supported: &[Method]) -> Self {
        let list = join_methods(supported);
        let response = if wants_json {
            Self::json(json!({
                "ok": false,
                "message": "Method not allowed.",
                "allowed": method_values(supported),
                "status": 405,
            }))
        } else {
            Self::text(list.clone())
        };
        response.with_status(405).with_header("Allow", list)
    }

    /// 200 answer to an OPTIONS pre-flight for a path with no OPTIONS
    /// route of its own.
    pub(crate) fn preflight(wants_json: bool, supported: &[Method]) -> Self {
        let list = join_methods(supported);
        let response = if wants_json {
            Self::json(Value::Array(method_values(supported)))
        } else {
            Self::text(list.clone())
        };
        response
            .with_header("Allow", list.clone())
            .with_header("Access-Control-Allow-Methods", list)
    }
}

fn join_methods(methods: &[Method]) -> String {
    methods
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn method_values(methods: &[Method]) -> Vec<Value> {
    methods
        .iter()
        .map(|m| Value::String(m.as_str().to_string()))
        .collect()
}

/// Value returned by a handler before coercion into a [`Response`].
#[derive(Debug, Clone)]
pub enum HandlerOutput {
    /// Pre-built response, flushed as-is.
    Response(Response),
    /// Arbitrary value, coerced by [`HandlerOutput::into_response`].
    Value(Value),
    /// Nothing; flushes an empty 200.
    Empty,
}

impl HandlerOutput {
    /// Coerce into the response sent to the client: strings and numbers
    /// become a text body, booleans, sequences and maps encode as JSON,
    /// absent values flush an empty 200.
    #[must_use]
    pub fn into_response(self) -> Response {
        match self {
            HandlerOutput::Response(response) => response,
            HandlerOutput::Empty => Response::new(),
            HandlerOutput::Value(Value::Null) => Response::new(),
            HandlerOutput::Value(Value::String(s)) => Response::text(s),
            HandlerOutput::Value(Value::Number(n)) => Response::text(n.to_string()),
            HandlerOutput::Value(other) => Response::json(other),
        }
    }
}

impl From<Response> for HandlerOutput {
    fn from(response: Response) -> Self {
        HandlerOutput::Response(response)
    }
}

impl From<Value> for HandlerOutput {
    fn from(value: Value) -> Self {
        HandlerOutput::Value(value)
    }
}

impl From<&str> for HandlerOutput {
    fn from(value: &str) -> Self {
        HandlerOutput::Value(Value::String(value.to_string()))
    }
}

impl From<String> for HandlerOutput {
    fn from(value: String) -> Self {
        HandlerOutput::Value(Value::String(value))
    }
}

impl From<()> for HandlerOutput {
    fn from(_: ()) -> Self {
        HandlerOutput::Empty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_coerces_to_text() {
        let response = HandlerOutput::from("pong").into_response();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, Value::String("pong".to_string()));
        assert_eq!(response.header("Content-Type"), None);
    }

    #[test]
    fn test_number_coerces_to_text() {
        let response = HandlerOutput::Value(json!(42)).into_response();
        assert_eq!(response.body, Value::String("42".to_string()));
    }

    #[test]
    fn test_bool_and_map_coerce_to_json() {
        let response = HandlerOutput::Value(json!(true)).into_response();
        assert_eq!(response.header("Content-Type"), Some("application/json"));

        let response = HandlerOutput::Value(json!({ "ok": true })).into_response();
        assert_eq!(response.header("Content-Type"), Some("application/json"));
        assert_eq!(response.body, json!({ "ok": true }));
    }

    #[test]
    fn test_empty_coerces_to_empty_200() {
        let response = HandlerOutput::Empty.into_response();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, Value::Null);
    }

    #[test]
    fn test_prebuilt_response_passes_through() {
        let response = HandlerOutput::from(Response::text("made").with_status(201))
            .into_response();
        assert_eq!(response.status, 201);
    }

    #[test]
    fn test_not_found_renditions() {
        let plain = Response::not_found(false);
        assert_eq!(plain.status, 404);
        assert_eq!(plain.body, Value::String("Not found.".to_string()));

        let json = Response::not_found(true);
        assert_eq!(json.status, 404);
        assert_eq!(json.body["message"], "Unknown resource.");
        assert_eq!(json.body["status"], 404);
    }

    #[test]
    fn test_method_not_allowed_carries_allow_header() {
        let response =
            Response::method_not_allowed(false, &[Method::POST, Method::GET, Method::HEAD]);
        assert_eq!(response.status, 405);
        assert_eq!(response.header("Allow"), Some("POST, GET, HEAD"));
        assert_eq!(
            response.body,
            Value::String("POST, GET, HEAD".to_string())
        );
    }

    #[test]
    fn test_preflight_headers_and_json_sequence() {
        let plain = Response::preflight(false, &[Method::POST]);
        assert_eq!(plain.status, 200);
        assert_eq!(plain.header("Allow"), Some("POST"));
        assert_eq!(plain.header("Access-Control-Allow-Methods"), Some("POST"));

        let json = Response::preflight(true, &[Method::POST, Method::GET]);
        assert_eq!(json.body, json!(["POST", "GET"]));
    }
}
