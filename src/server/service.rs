use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use http::Method;
use may::coroutine::JoinHandle;
use may_minihttp::{
    HttpServer, HttpService, Request as WireRequest, Response as WireResponse,
};
use serde_json::json;
use tracing::{error, info};

use super::request::parse_request;
use super::response::{write_json_error, write_response};
use crate::router::Router;

/// HTTP service driving a fully declared router.
///
/// The router is finalized before the service is constructed; requests
/// only ever read it, so service clones share one `Arc` with no locking.
#[derive(Clone)]
pub struct AppService {
    router: Arc<Router>,
}

impl AppService {
    pub fn new(router: Router) -> Self {
        let service = Self {
            router: Arc::new(router),
        };

        let routes_summary: Vec<String> = service
            .router
            .routes
            .iter()
            .take(10)
            .map(|route| {
                let methods = route
                    .methods()
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join("|");
                format!("{methods} {}", route.uri())
            })
            .collect();
        info!(
            routes_count = service.router.routes.len(),
            routes_summary = ?routes_summary,
            "Routing table finalized"
        );

        service
    }

    pub fn router(&self) -> &Router {
        &self.router
    }
}

impl HttpService for AppService {
    fn call(&mut self, req: WireRequest, res: &mut WireResponse) -> io::Result<()> {
        let request = parse_request(req);
        match self.router.dispatch(&request) {
            Ok(response) => write_response(res, &response),
            Err(err) => {
                error!(
                    method = %request.method,
                    path = %request.path,
                    error = %err,
                    "Dispatch failed"
                );
                write_json_error(
                    res,
                    500,
                    json!({
                        "error": err.to_string(),
                        "method": request.method.as_str(),
                        "path": request.path,
                    }),
                );
            }
        }
        Ok(())
    }
}

/// How often `wait_until_ready` probes the listening socket.
const READY_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Handle to a router being served.
pub struct RouterHandle {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl RouterHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Block until the listener accepts connections, up to `timeout`.
    ///
    /// # Errors
    ///
    /// `TimedOut` when nothing is accepting on the bound address within
    /// the timeout.
    pub fn wait_until_ready(&self, timeout: Duration) -> io::Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            match TcpStream::connect(self.addr) {
                Ok(_) => return Ok(()),
                Err(err) => {
                    if Instant::now() >= deadline {
                        return Err(io::Error::new(
                            io::ErrorKind::TimedOut,
                            format!(
                                "router not accepting connections on {}: {err}",
                                self.addr
                            ),
                        ));
                    }
                    thread::sleep(READY_POLL_INTERVAL);
                }
            }
        }
    }

    /// Stop serving and reap the listener coroutine.
    pub fn stop(self) {
        unsafe {
            self.handle.coroutine().cancel();
        }
        let _ = self.handle.join();
    }

    pub fn join(self) -> std::thread::Result<()> {
        self.handle.join()
    }
}

/// Serve a fully declared router; each connection is handled on a `may`
/// coroutine.
///
/// Declaration must be finished before calling this; the router becomes
/// shared and read-only from here on.
///
/// # Errors
///
/// Returns an error when the address is invalid or cannot be bound.
pub fn serve<A: ToSocketAddrs>(router: Router, addr: A) -> io::Result<RouterHandle> {
    let addr = addr
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no address to bind"))?;
    let handle = HttpServer(AppService::new(router)).start(addr)?;
    info!(addr = %addr, "Router serving");
    Ok(RouterHandle { addr, handle })
}
