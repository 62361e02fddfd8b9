//! Validated, immutable service configuration.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use crate::error::ConfigurationError;
use crate::net::buffer::BufferPolicy;
use crate::observability::tap::TrafficTap;
use crate::routing::RequestRouter;

/// Port bound when none is configured.
pub const DEFAULT_PORT: u16 = 80;

/// 2 MiB.
pub const DEFAULT_MAX_AGGREGATED_REQUEST_BYTES: usize = 2 * 1024 * 1024;

/// Accepting is cheap; two threads keep one free while the other is busy.
pub const DEFAULT_ACCEPTOR_THREADS: usize = 2;

pub const DEFAULT_SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Twice the number of available processing units.
pub fn default_worker_threads() -> usize {
    std::thread::available_parallelism()
        .map(usize::from)
        .unwrap_or(1)
        .saturating_mul(2)
}

/// Resolve the socket address to bind.
///
/// No host binds the IPv4 wildcard on `port`. A host name is resolved once,
/// here, and the first address wins.
pub fn resolve_bind_address(host: Option<&str>, port: u16) -> Result<SocketAddr, ConfigurationError> {
    let Some(host) = host else {
        return Ok(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)));
    };

    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|e| ConfigurationError::UnresolvableHost {
            host: host.to_string(),
            source: Some(e),
        })?;

    addrs.next().ok_or_else(|| ConfigurationError::UnresolvableHost {
        host: host.to_string(),
        source: None,
    })
}

/// How the service binds and behaves.
///
/// Built once by [`crate::ServiceBuilder`]; nothing can change it afterwards.
/// The router and traffic tap are shared handles, not owned resources.
#[derive(Clone)]
pub struct ServiceConfiguration {
    pub(crate) host: Option<String>,
    pub(crate) port: u16,
    pub(crate) bind_address: SocketAddr,
    pub(crate) max_aggregated_request_bytes: usize,
    pub(crate) acceptor_threads: usize,
    pub(crate) worker_threads: usize,
    pub(crate) shutdown_grace_period: Duration,
    pub(crate) buffer_policy: BufferPolicy,
    pub(crate) router: Arc<dyn RequestRouter>,
    pub(crate) traffic_tap: Arc<dyn TrafficTap>,
}

impl ServiceConfiguration {
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Address resolved from host and port at build time.
    pub fn bind_address(&self) -> SocketAddr {
        self.bind_address
    }

    pub fn max_aggregated_request_bytes(&self) -> usize {
        self.max_aggregated_request_bytes
    }

    pub fn acceptor_threads(&self) -> usize {
        self.acceptor_threads
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn shutdown_grace_period(&self) -> Duration {
        self.shutdown_grace_period
    }

    pub fn buffer_policy(&self) -> &BufferPolicy {
        &self.buffer_policy
    }

    pub fn router(&self) -> &Arc<dyn RequestRouter> {
        &self.router
    }

    pub fn traffic_tap(&self) -> &Arc<dyn TrafficTap> {
        &self.traffic_tap
    }
}

impl fmt::Debug for ServiceConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfiguration")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("bind_address", &self.bind_address)
            .field(
                "max_aggregated_request_bytes",
                &self.max_aggregated_request_bytes,
            )
            .field("acceptor_threads", &self.acceptor_threads)
            .field("worker_threads", &self.worker_threads)
            .field("shutdown_grace_period", &self.shutdown_grace_period)
            .field("buffer_policy", &self.buffer_policy)
            .finish_non_exhaustive()
    }
}
