//! The embeddable HTTP service and its lifecycle.
//!
//! # Responsibilities
//! - Own both thread pools and the listening socket while running
//! - Drive the state machine in [`crate::lifecycle::state`]
//! - Always release resources, whatever way `start()` ends
//!
//! # Design Decisions
//! - `start()` blocks its caller until the listener closes
//! - `start()` reports startup failures instead of only logging them
//! - `stop()` can be called from any thread, any number of times

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::config::ServiceConfiguration;
use crate::error::ServiceError;
use crate::http::pipeline::PipelineTemplate;
use crate::lifecycle::builder::ServiceBuilder;
use crate::lifecycle::pools::{
    build_runtime, ThreadPools, ACCEPTOR_THREAD_NAME, WORKER_THREAD_NAME,
};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::state::{LifecycleState, StateCell};
use crate::net::connection::ConnectionTracker;
use crate::net::listener::AcceptanceLoop;

/// Non-blocking HTTP front end that hands complete requests to a router.
///
/// Cheap to clone; clones share one lifecycle, so one thread can block in
/// [`start`](Self::start) while another calls [`stop`](Self::stop).
#[derive(Clone)]
pub struct HttpService {
    inner: Arc<ServiceInner>,
}

struct ServiceInner {
    config: ServiceConfiguration,
    pipeline: Arc<PipelineTemplate>,
    state: StateCell,
    shutdown: Shutdown,
    bound_address: Mutex<SocketAddr>,
    connections: ConnectionTracker,
}

impl HttpService {
    pub fn builder() -> ServiceBuilder {
        ServiceBuilder::new()
    }

    pub(crate) fn new(config: ServiceConfiguration, pipeline: PipelineTemplate) -> Self {
        let bound_address = Mutex::new(config.bind_address());
        Self {
            inner: Arc::new(ServiceInner {
                config,
                pipeline: Arc::new(pipeline),
                state: StateCell::new(),
                shutdown: Shutdown::new(),
                bound_address,
                connections: ConnectionTracker::new(),
            }),
        }
    }

    /// Bind, serve, and block until the service stops.
    ///
    /// Returns `Ok(())` after a deliberate [`stop`](Self::stop). Startup
    /// failures come back as [`ServiceError::Bind`] or
    /// [`ServiceError::ThreadPool`] and leave the service in
    /// [`LifecycleState::StartFailed`]. Must not be called from inside an
    /// async runtime.
    pub fn start(&self) -> Result<(), ServiceError> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(ServiceError::IllegalState {
                operation: "start from within an async runtime",
                state: self.state(),
            });
        }
        self.inner
            .state
            .transition(LifecycleState::Created, LifecycleState::Starting)
            .map_err(|state| ServiceError::IllegalState {
                operation: "start",
                state,
            })?;

        let config = &self.inner.config;
        tracing::info!(
            address = %config.bind_address(),
            acceptor_threads = config.acceptor_threads(),
            worker_threads = config.worker_threads(),
            "Starting http service"
        );

        let mut pools = ThreadPools::new();
        let outcome = self.run(&mut pools);
        // Without a completed drain the whole grace period is left for the pools.
        let budget = match &outcome {
            Ok(remaining) => *remaining,
            Err(_) => config.shutdown_grace_period(),
        };
        let outcome = outcome.map(drop);
        if let Err(e) = &outcome {
            tracing::error!(error = %e, "Http service terminated with error");
        }
        self.release(&mut pools, budget, &outcome);
        outcome
    }

    /// Returns the grace budget left over after draining.
    fn run(&self, pools: &mut ThreadPools) -> Result<Duration, ServiceError> {
        let config = &self.inner.config;

        let acceptance = &*pools.acceptance.insert(
            build_runtime(ACCEPTOR_THREAD_NAME, config.acceptor_threads())
                .map_err(ServiceError::ThreadPool)?,
        );
        let workers = pools
            .workers
            .insert(
                build_runtime(WORKER_THREAD_NAME, config.worker_threads())
                    .map_err(ServiceError::ThreadPool)?,
            )
            .handle()
            .clone();

        let address = config.bind_address();
        let bind_error = |source| ServiceError::Bind { address, source };
        let listener = config
            .buffer_policy()
            .bind_listener(address)
            .map_err(bind_error)?;

        let acceptance_loop = {
            let _entered = acceptance.enter();
            AcceptanceLoop::new(
                listener,
                *config.buffer_policy(),
                Arc::clone(&self.inner.pipeline),
                workers,
                self.inner.connections.clone(),
                config.shutdown_grace_period(),
            )
            .map_err(bind_error)?
        };
        let local_addr = acceptance_loop.local_addr();
        *self
            .inner
            .bound_address
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = local_addr;

        self.inner.state.set(LifecycleState::Running);
        tracing::info!(address = %local_addr, "Http service running");

        let signal = self.inner.shutdown.subscribe();
        let accepting = acceptance.spawn(acceptance_loop.run(signal));
        acceptance
            .block_on(accepting)
            .map_err(ServiceError::AcceptLoop)
    }

    fn release(
        &self,
        pools: &mut ThreadPools,
        budget: Duration,
        outcome: &Result<(), ServiceError>,
    ) {
        self.inner.state.set(LifecycleState::Stopping);
        tracing::info!("Stopping http service");

        self.inner.shutdown.trigger();
        pools.shutdown(budget);

        let terminal = match outcome {
            Err(ServiceError::Bind { .. } | ServiceError::ThreadPool(_)) => {
                LifecycleState::StartFailed
            }
            _ => LifecycleState::Stopped,
        };
        self.inner.state.set(terminal);
        tracing::info!(state = %terminal, "Done stopping http service");
    }

    /// Stop accepting, drain connections, release both pools.
    ///
    /// Blocks until the thread inside [`start`](Self::start) has finished
    /// releasing resources; draining and releasing together take at most
    /// about `shutdown_grace_period`. Before `start()` it simply marks the service
    /// stopped; after termination it does nothing.
    pub fn stop(&self) {
        match self.inner.state.request_stop() {
            LifecycleState::Created => {
                tracing::info!("Http service stopped before it was started");
            }
            state if state.is_terminal() => {
                tracing::debug!(state = %state, "Http service already stopped");
            }
            state => {
                tracing::info!(state = %state, "Stop requested");
                self.inner.shutdown.trigger();
                self.inner.state.wait_until(|s| s.is_terminal(), None);
            }
        }
    }

    /// Address the service binds, or is bound, to.
    ///
    /// Resolved from host and port at build time and replaced by the actual
    /// socket address once bound, so port 0 reports the assigned port.
    pub fn bind_address(&self) -> SocketAddr {
        *self
            .inner
            .bound_address
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> LifecycleState {
        self.inner.state.get()
    }

    /// Block until the service is running, or `timeout` passes, or startup
    /// ends another way. Returns the bound address when running.
    pub fn wait_for_running(&self, timeout: Duration) -> Option<SocketAddr> {
        let state = self.inner.state.wait_until(
            |s| !matches!(s, LifecycleState::Created | LifecycleState::Starting),
            Some(timeout),
        );
        (state == LifecycleState::Running).then(|| self.bind_address())
    }

    pub fn configuration(&self) -> &ServiceConfiguration {
        &self.inner.config
    }

    /// Connections currently open on this service.
    pub fn active_connections(&self) -> u64 {
        self.inner.connections.active_count()
    }

    /// Template every accepted connection's pipeline is built from.
    pub fn pipeline(&self) -> &PipelineTemplate {
        &self.inner.pipeline
    }
}

impl std::fmt::Debug for HttpService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpService")
            .field("bind_address", &self.bind_address())
            .field("state", &self.state())
            .field("active_connections", &self.active_connections())
            .finish_non_exhaustive()
    }
}
