//! Acceptance and worker thread pools.
//!
//! Two independent multi-thread tokio runtimes: a small one that only
//! accepts connections, and a larger one that runs every connection
//! pipeline. Keeping them apart means a saturated worker pool never delays
//! `accept`.

use std::io;
use std::time::{Duration, Instant};

use tokio::runtime::{Builder, Runtime};

pub const ACCEPTOR_THREAD_NAME: &str = "http-acceptor";
pub const WORKER_THREAD_NAME: &str = "http-worker";

/// The service's two pools. Either may be absent when startup fails midway.
#[derive(Debug, Default)]
pub struct ThreadPools {
    pub(crate) acceptance: Option<Runtime>,
    pub(crate) workers: Option<Runtime>,
}

impl ThreadPools {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shut down whichever pools exist, workers first.
    ///
    /// Both pools share one `budget`; threads still busy when it runs out
    /// are abandoned.
    pub fn shutdown(&mut self, budget: Duration) {
        let deadline = Instant::now() + budget;
        if let Some(workers) = self.workers.take() {
            tracing::debug!("Shutting down worker pool");
            workers.shutdown_timeout(deadline.saturating_duration_since(Instant::now()));
        }
        if let Some(acceptance) = self.acceptance.take() {
            tracing::debug!("Shutting down acceptance pool");
            acceptance.shutdown_timeout(deadline.saturating_duration_since(Instant::now()));
        }
    }
}

/// Build a named multi-thread runtime with `threads` workers.
pub fn build_runtime(name: &str, threads: usize) -> io::Result<Runtime> {
    Builder::new_multi_thread()
        .worker_threads(threads)
        .thread_name(name)
        .enable_all()
        .build()
}
