//! Service builder.
//!
//! Accumulates knobs with chaining setters and turns them into a validated
//! [`ServiceConfiguration`] plus a ready-to-start [`HttpService`].

use std::sync::Arc;
use std::time::Duration;

use crate::config::validation::validate_runtime;
use crate::config::{
    default_worker_threads, resolve_bind_address, ServiceConfiguration, ServiceSettings,
    DEFAULT_ACCEPTOR_THREADS, DEFAULT_MAX_AGGREGATED_REQUEST_BYTES, DEFAULT_PORT,
    DEFAULT_SHUTDOWN_GRACE_PERIOD,
};
use crate::error::ConfigurationError;
use crate::http::pipeline::PipelineTemplate;
use crate::lifecycle::service::HttpService;
use crate::net::buffer::BufferPolicy;
use crate::observability::tap::{LoggingTap, TrafficTap};
use crate::routing::RequestRouter;

/// Builder for [`HttpService`].
///
/// Not meant for concurrent mutation; build it on one thread, then share the
/// resulting service.
pub struct ServiceBuilder {
    host: Option<String>,
    port: u16,
    max_aggregated_request_bytes: usize,
    acceptor_threads: usize,
    worker_threads: Option<usize>,
    shutdown_grace_period: Duration,
    buffer_policy: BufferPolicy,
    router: Option<Arc<dyn RequestRouter>>,
    traffic_tap: Option<Arc<dyn TrafficTap>>,
}

impl ServiceBuilder {
    pub fn new() -> Self {
        Self {
            host: None,
            port: DEFAULT_PORT,
            max_aggregated_request_bytes: DEFAULT_MAX_AGGREGATED_REQUEST_BYTES,
            acceptor_threads: DEFAULT_ACCEPTOR_THREADS,
            worker_threads: None,
            shutdown_grace_period: DEFAULT_SHUTDOWN_GRACE_PERIOD,
            buffer_policy: BufferPolicy::default(),
            router: None,
            traffic_tap: None,
        }
    }

    /// Seed a builder from deserialized settings. The router still has to be
    /// supplied in code.
    pub fn from_settings(settings: &ServiceSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            max_aggregated_request_bytes: settings.max_aggregated_request_bytes,
            acceptor_threads: settings.acceptor_threads,
            worker_threads: settings.worker_threads,
            shutdown_grace_period: Duration::from_secs(settings.shutdown_grace_secs),
            buffer_policy: BufferPolicy::from(&settings.buffer),
            router: None,
            traffic_tap: None,
        }
    }

    /// Host to bind. Unset binds every interface.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Largest request body held in memory before the request is rejected.
    pub fn max_aggregated_request_bytes(mut self, bytes: usize) -> Self {
        self.max_aggregated_request_bytes = bytes;
        self
    }

    pub fn acceptor_threads(mut self, threads: usize) -> Self {
        self.acceptor_threads = threads;
        self
    }

    /// Worker pool size. Defaults to twice the available processing units.
    pub fn worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads);
        self
    }

    /// Upper bound on connection draining during shutdown.
    pub fn shutdown_grace_period(mut self, grace: Duration) -> Self {
        self.shutdown_grace_period = grace;
        self
    }

    pub fn buffer_policy(mut self, policy: BufferPolicy) -> Self {
        self.buffer_policy = policy;
        self
    }

    /// The capability that turns one complete request into one response.
    pub fn router<R: RequestRouter>(self, router: R) -> Self {
        self.shared_router(Arc::new(router))
    }

    /// Use a router the embedder keeps a handle to.
    pub fn shared_router(mut self, router: Arc<dyn RequestRouter>) -> Self {
        self.router = Some(router);
        self
    }

    /// Replace the default [`LoggingTap`].
    pub fn traffic_tap<T: TrafficTap>(self, tap: T) -> Self {
        self.shared_traffic_tap(Arc::new(tap))
    }

    pub fn shared_traffic_tap(mut self, tap: Arc<dyn TrafficTap>) -> Self {
        self.traffic_tap = Some(tap);
        self
    }

    /// Validate everything and produce a service in the `Created` state.
    pub fn build(self) -> Result<HttpService, ConfigurationError> {
        let router = self.router.ok_or(ConfigurationError::MissingRouter)?;
        let worker_threads = self.worker_threads.unwrap_or_else(default_worker_threads);

        validate_runtime(self.acceptor_threads, worker_threads, &self.buffer_policy)
            .map_err(ConfigurationError::Invalid)?;

        let bind_address = resolve_bind_address(self.host.as_deref(), self.port)?;

        let config = ServiceConfiguration {
            host: self.host,
            port: self.port,
            bind_address,
            max_aggregated_request_bytes: self.max_aggregated_request_bytes,
            acceptor_threads: self.acceptor_threads,
            worker_threads,
            shutdown_grace_period: self.shutdown_grace_period,
            buffer_policy: self.buffer_policy,
            router,
            traffic_tap: self
                .traffic_tap
                .unwrap_or_else(|| Arc::new(LoggingTap)),
        };

        let pipeline = PipelineTemplate::standard(&config)?;
        tracing::debug!(config = ?config, "Service configuration built");
        Ok(HttpService::new(config, pipeline))
    }
}

impl Default for ServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
