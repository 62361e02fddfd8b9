//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use bytes::Bytes;
use http::{Request, Response};
use http_front::routing::RouteFuture;
use http_front::{HttpService, RequestRouter, ServiceBuilder, ServiceError};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Echoes the request body and counts how often it was called.
#[derive(Clone, Default)]
pub struct CountingEcho {
    calls: Arc<AtomicUsize>,
}

impl CountingEcho {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RequestRouter for CountingEcho {
    fn route(&self, request: Request<Bytes>) -> RouteFuture {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move { Ok(Response::new(request.into_body())) })
    }
}

/// Loopback, ephemeral port, small pools, short grace period.
pub fn builder() -> ServiceBuilder {
    HttpService::builder()
        .host("127.0.0.1")
        .port(0)
        .acceptor_threads(1)
        .worker_threads(2)
        .shutdown_grace_period(Duration::from_secs(2))
}

/// A service blocked in `start()` on its own thread.
pub struct Running {
    pub service: HttpService,
    pub addr: SocketAddr,
    handle: Option<JoinHandle<Result<(), ServiceError>>>,
}

impl Running {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Stop the service and return what `start()` returned.
    pub fn stop(mut self) -> Result<(), ServiceError> {
        self.service.stop();
        self.join()
    }

    fn join(&mut self) -> Result<(), ServiceError> {
        match self.handle.take() {
            Some(handle) => handle.join().expect("start thread panicked"),
            None => Ok(()),
        }
    }
}

impl Drop for Running {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.service.stop();
            let _ = self.join();
        }
    }
}

/// Start `service` on a dedicated thread and wait until it accepts.
pub fn start(service: HttpService) -> Running {
    let runner = service.clone();
    let handle = std::thread::spawn(move || runner.start());
    let addr = service
        .wait_for_running(Duration::from_secs(5))
        .expect("service did not reach running");
    Running {
        service,
        addr,
        handle: Some(handle),
    }
}

/// `Running::stop` without blocking the test's runtime.
pub async fn stop(running: Running) -> Result<(), ServiceError> {
    tokio::task::spawn_blocking(move || running.stop())
        .await
        .expect("stop task panicked")
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

/// Response read straight off the wire.
#[derive(Debug)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Read one `Content-Length` framed response. `Ok(None)` on a clean EOF
/// before any byte arrived.
pub async fn read_response<S: AsyncRead + Unpin>(stream: &mut S) -> io::Result<Option<RawResponse>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            if buf.is_empty() {
                return Ok(None);
            }
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let status = head
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    let headers: Vec<(String, String)> = head
        .lines()
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();
    let len = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse().ok())
        .unwrap_or(0usize);

    let mut body = buf[header_end..].to_vec();
    while body.len() < len {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(len);

    Ok(Some(RawResponse {
        status,
        headers,
        body,
    }))
}
