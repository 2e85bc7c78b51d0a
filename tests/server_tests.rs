//! End-to-end serving over may_minihttp: raw HTTP requests against a
//! declared router.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use routier::server::serve;
use routier::{Handler, HandlerOutput, Router};

const ADDR: &str = "127.0.0.1:17466";

fn http_request(raw: &str) -> String {
    let mut stream = TcpStream::connect(ADDR).unwrap();
    stream.write_all(raw.as_bytes()).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_millis(500)))
        .unwrap();
    let mut buf = Vec::new();
    // The connection may stay open; the read timeout bounds the drain and
    // the buffer keeps whatever arrived.
    let _ = stream.read_to_end(&mut buf);
    String::from_utf8_lossy(&buf).to_string()
}

#[test]
fn test_serve_round_trips_over_the_wire() {
    let mut router = Router::new();
    router.get(
        "/ping",
        Handler::from_fn(|_, _| Ok(HandlerOutput::from("pong"))),
    );
    router.post(
        "/items",
        Handler::from_fn(|_, _| Ok(HandlerOutput::from("created"))),
    );
    router.get(
        "/items",
        Handler::from_fn(|_, _| Ok(HandlerOutput::from("listed"))),
    );

    let handle = serve(router, ADDR).unwrap();
    handle.wait_until_ready(Duration::from_secs(2)).unwrap();

    let ok = http_request("GET /ping HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    assert!(ok.starts_with("HTTP/1.1 200"), "unexpected response: {ok}");
    assert!(ok.contains("Content-Type: text/plain"));
    assert!(ok.contains("pong"));

    let not_allowed =
        http_request("DELETE /items HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    assert!(
        not_allowed.starts_with("HTTP/1.1 405"),
        "unexpected response: {not_allowed}"
    );
    assert!(not_allowed.contains("Allow: POST, GET, HEAD"));

    let missing = http_request(
        "GET /nowhere HTTP/1.1\r\nHost: localhost\r\nAccept: application/json\r\nConnection: close\r\n\r\n",
    );
    assert!(
        missing.starts_with("HTTP/1.1 404"),
        "unexpected response: {missing}"
    );
    assert!(missing.contains("Content-Type: application/json"));
    assert!(missing.contains("\"status\":404"));

    handle.stop();
}
