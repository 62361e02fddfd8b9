//! Observability tap: the first stage of every connection pipeline.
//!
//! A [`TrafficTap`] sees raw connection events (open, read, write, error,
//! close) without touching the bytes. One tap instance is shared by every
//! connection, so implementations must not keep per-connection mutable state;
//! the connection id passed with each event is the only per-connection data.

use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::net::connection::ConnectionId;

/// Observer of raw connection traffic.
pub trait TrafficTap: Send + Sync + 'static {
    fn on_open(&self, _id: ConnectionId, _peer: SocketAddr) {}

    fn on_read(&self, _id: ConnectionId, _data: &[u8]) {}

    fn on_write(&self, _id: ConnectionId, _data: &[u8]) {}

    fn on_error(&self, _id: ConnectionId, _error: &(dyn std::error::Error + 'static)) {}

    fn on_close(&self, _id: ConnectionId) {}
}

/// Default tap: forwards every event to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingTap;

impl TrafficTap for LoggingTap {
    fn on_open(&self, id: ConnectionId, peer: SocketAddr) {
        tracing::debug!(connection_id = %id, peer_addr = %peer, "OPEN");
    }

    fn on_read(&self, id: ConnectionId, data: &[u8]) {
        tracing::trace!(connection_id = %id, bytes = data.len(), "READ");
    }

    fn on_write(&self, id: ConnectionId, data: &[u8]) {
        tracing::trace!(connection_id = %id, bytes = data.len(), "WRITE");
    }

    fn on_error(&self, id: ConnectionId, error: &(dyn std::error::Error + 'static)) {
        tracing::debug!(connection_id = %id, error = %error, "EXCEPTION");
    }

    fn on_close(&self, id: ConnectionId) {
        tracing::debug!(connection_id = %id, "CLOSE");
    }
}

/// Transport wrapper that reports reads, writes and I/O errors to a tap.
pub struct TappedIo<T> {
    inner: T,
    id: ConnectionId,
    tap: Arc<dyn TrafficTap>,
}

impl<T> TappedIo<T> {
    pub fn new(inner: T, id: ConnectionId, tap: Arc<dyn TrafficTap>) -> Self {
        Self { inner, id, tap }
    }

    fn report<R>(&self, result: io::Result<R>) -> io::Result<R> {
        if let Err(e) = &result {
            self.tap.on_error(self.id, e);
        }
        result
    }
}

impl<T: AsyncRead + Unpin> AsyncRead for TappedIo<T> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        let result = match Pin::new(&mut this.inner).poll_read(cx, buf) {
            Poll::Ready(result) => result,
            Poll::Pending => return Poll::Pending,
        };
        if result.is_ok() {
            let data = &buf.filled()[before..];
            if !data.is_empty() {
                this.tap.on_read(this.id, data);
            }
        }
        Poll::Ready(this.report(result))
    }
}

impl<T: AsyncWrite + Unpin> AsyncWrite for TappedIo<T> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let result = match Pin::new(&mut this.inner).poll_write(cx, buf) {
            Poll::Ready(result) => result,
            Poll::Pending => return Poll::Pending,
        };
        if let Ok(written) = result {
            this.tap.on_write(this.id, &buf[..written]);
        }
        Poll::Ready(this.report(result))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_flush(cx) {
            Poll::Ready(result) => Poll::Ready(this.report(result)),
            Poll::Pending => Poll::Pending,
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_shutdown(cx) {
            Poll::Ready(result) => Poll::Ready(this.report(result)),
            Poll::Pending => Poll::Pending,
        }
    }
}
