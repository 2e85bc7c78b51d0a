use std::collections::HashSet;
use std::sync::Mutex;

use may_minihttp::Response as WireResponse;
use once_cell::sync::Lazy;
use serde_json::Value;

use crate::response::Response;

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        _ => "OK",
    }
}

// may_minihttp only accepts whole `Name: value` header lines with a
// 'static lifetime. Dynamic lines are interned once and reused; after the
// declaration phase the distinct set is bounded by the routing table, so
// nothing accumulates per request.
static HEADER_LINES: Lazy<Mutex<HashSet<&'static str>>> =
    Lazy::new(|| Mutex::new(HashSet::new()));

fn header_line(name: &str, value: &str) -> &'static str {
    if name.eq_ignore_ascii_case("content-type") {
        match value {
            "application/json" => return "Content-Type: application/json",
            "text/plain" => return "Content-Type: text/plain",
            _ => {}
        }
    }
    let line = format!("{name}: {value}");
    let mut lines = HEADER_LINES.lock().unwrap();
    if let Some(existing) = lines.get(line.as_str()).copied() {
        return existing;
    }
    let interned: &'static str = Box::leak(line.into_boxed_str());
    lines.insert(interned);
    interned
}

/// Flush a router response onto the wire.
///
/// `Value::String` bodies go out as `text/plain`, `Value::Null` as an
/// empty body and everything else as `application/json`, unless the
/// response carries an explicit `Content-Type` header.
pub fn write_response(res: &mut WireResponse, response: &Response) {
    res.status_code(response.status as usize, status_reason(response.status));

    let explicit_content_type = response
        .headers
        .keys()
        .any(|k| k.eq_ignore_ascii_case("content-type"));
    for (name, value) in &response.headers {
        res.header(header_line(name, value));
    }

    match &response.body {
        Value::Null => {}
        Value::String(s) if !explicit_content_type => {
            res.header("Content-Type: text/plain");
            res.body_vec(s.clone().into_bytes());
        }
        other => {
            if !explicit_content_type {
                res.header("Content-Type: application/json");
            }
            res.body_vec(serde_json::to_vec(other).unwrap_or_default());
        }
    }
}

/// Flush a bare JSON error body, used for failures the router propagates
/// instead of rendering.
pub fn write_json_error(res: &mut WireResponse, status: u16, body: Value) {
    res.status_code(status as usize, status_reason(status));
    res.header("Content-Type: application/json");
    res.body_vec(body.to_string().into_bytes());
}
