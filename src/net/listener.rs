//! Acceptance loop.
//!
//! # Responsibilities
//! - Own the listening socket for the service's running lifetime
//! - Accept incoming TCP connections and apply per-connection socket options
//! - Hand each connection to the worker pool with a fresh pipeline
//! - On shutdown: close the listener, then drain connections within a grace period
//!
//! Never parses a byte of HTTP itself.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Handle;

use crate::http::pipeline::PipelineTemplate;
use crate::lifecycle::shutdown::ShutdownSignal;
use crate::net::buffer::BufferPolicy;
use crate::net::connection::ConnectionTracker;
use crate::observability::metrics;

/// Pause after a failed `accept` (e.g. file descriptor exhaustion) before retrying.
const ACCEPT_ERROR_PAUSE: Duration = Duration::from_millis(50);

/// Accepts connections and dispatches them to the worker pool.
pub struct AcceptanceLoop {
    listener: TcpListener,
    local_addr: SocketAddr,
    policy: BufferPolicy,
    pipeline: Arc<PipelineTemplate>,
    workers: Handle,
    tracker: ConnectionTracker,
    grace_period: Duration,
}

impl AcceptanceLoop {
    /// Wrap a bound listener.
    ///
    /// Must be called from within the acceptance runtime so the listener
    /// registers with its reactor.
    pub fn new(
        listener: std::net::TcpListener,
        policy: BufferPolicy,
        pipeline: Arc<PipelineTemplate>,
        workers: Handle,
        tracker: ConnectionTracker,
        grace_period: Duration,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::from_std(listener)?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
            policy,
            pipeline,
            workers,
            tracker,
            grace_period,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept until `shutdown` fires, then close the listener and drain.
    ///
    /// Returns the part of the grace period the drain did not use.
    pub async fn run(self, mut shutdown: ShutdownSignal) -> Duration {
        let graceful = GracefulShutdown::new();

        loop {
            tokio::select! {
                biased;

                _ = shutdown.recv() => {
                    tracing::debug!(address = %self.local_addr, "Shutdown signal received, closing listener");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => self.dispatch(stream, peer, &graceful),
                    Err(e) => {
                        tracing::warn!(address = %self.local_addr, error = %e, "Failed to accept connection");
                        metrics::record_accept_error();
                        tokio::time::sleep(ACCEPT_ERROR_PAUSE).await;
                    }
                },
            }
        }

        let Self {
            listener,
            local_addr,
            grace_period,
            tracker,
            ..
        } = self;
        drop(listener);
        let drain_started = Instant::now();

        tracing::info!(
            address = %local_addr,
            connections = tracker.active_count(),
            "Listener closed, draining connections"
        );

        match tokio::time::timeout(grace_period, graceful.shutdown()).await {
            Ok(()) => tracing::debug!(address = %local_addr, "All connections drained"),
            Err(_) => tracing::warn!(
                address = %local_addr,
                grace_secs = grace_period.as_secs_f64(),
                remaining = tracker.active_count(),
                "Grace period expired, remaining connections will be aborted"
            ),
        }
        grace_period.saturating_sub(drain_started.elapsed())
    }

    fn dispatch(&self, stream: TcpStream, peer: SocketAddr, graceful: &GracefulShutdown) {
        metrics::record_connection_accepted();
        let guard = self.tracker.track();
        let id = guard.id();

        if let Err(e) = self.policy.apply_to_stream(&stream) {
            tracing::debug!(connection_id = %id, error = %e, "Failed to apply socket options");
        }

        // Re-registered on the worker runtime so its reactor drives the I/O.
        let stream = match stream.into_std() {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(connection_id = %id, peer_addr = %peer, error = %e, "Failed to detach accepted socket");
                return;
            }
        };

        tracing::debug!(connection_id = %id, peer_addr = %peer, "Connection accepted");

        let watcher = graceful.watcher();
        let pipeline = Arc::clone(&self.pipeline);
        self.workers.spawn(async move {
            let _guard = guard;
            let stream = match TcpStream::from_std(stream) {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::warn!(connection_id = %id, error = %e, "Failed to register connection with worker pool");
                    return;
                }
            };

            if let Err(e) = pipeline.instantiate(stream, peer, id).run(Some(watcher)).await {
                tracing::debug!(connection_id = %id, peer_addr = %peer, error = %e, "Connection closed with error");
            }
        });
    }
}
