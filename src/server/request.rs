use std::collections::HashMap;
use std::io::Read;

use http::Method;
use may_minihttp::Request as WireRequest;

use crate::request::Request;

/// Extract the routing-relevant parts of a wire request: the method, the
/// path with the query string stripped, headers with lowercased names and
/// the body when it parses as JSON.
pub fn parse_request(req: WireRequest) -> Request {
    let method = req.method().parse::<Method>().unwrap_or(Method::GET);
    let raw_path = req.path().to_string();
    let path = raw_path.split('?').next().unwrap_or("/").to_string();

    let headers: HashMap<String, String> = req
        .headers()
        .iter()
        .map(|h| {
            (
                h.name.to_ascii_lowercase(),
                String::from_utf8_lossy(h.value).to_string(),
            )
        })
        .collect();

    let body = {
        let mut body_str = String::new();
        match req.body().read_to_string(&mut body_str) {
            Ok(size) if size > 0 => serde_json::from_str(&body_str).ok(),
            _ => None,
        }
    };

    Request {
        method,
        path,
        headers,
        body,
    }
}
