//! Error taxonomy for the HTTP front end.
//!
//! # Propagation
//! ```text
//! ConfigurationError   → ServiceBuilder::build (never reaches start)
//! ServiceError         → HttpService::start / lifecycle misuse
//! OversizedRequestError→ one request; 413 + connection close
//! TransportError       → one connection; logged, connection closed
//! RouterError          → one request; 500
//! ```

use std::net::SocketAddr;

use crate::config::validation::ValidationError;
use crate::lifecycle::LifecycleState;

/// Error returned by a router when it cannot produce a response.
pub type RouterError = Box<dyn std::error::Error + Send + Sync>;

/// Invalid or incomplete service configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// No router capability was supplied to the builder.
    #[error("required field `router` was not set")]
    MissingRouter,

    /// The configured host did not resolve to any socket address.
    #[error("cannot resolve bind host `{host}`")]
    UnresolvableHost {
        host: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// One or more knobs hold values the service cannot run with.
    #[error("invalid configuration: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),

    /// The pipeline stage list is not the canonical order.
    #[error("invalid pipeline: {0}")]
    PipelineOrder(String),

    /// Settings file could not be read.
    #[error("cannot read settings: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file is not valid TOML for the settings schema.
    #[error("cannot parse settings: {0}")]
    Parse(#[from] toml::de::Error),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Failure reported by the service lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The listening socket could not be bound.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// A thread pool could not be created.
    #[error("failed to create thread pool: {0}")]
    ThreadPool(#[source] std::io::Error),

    /// The acceptance loop terminated abnormally while running.
    #[error("acceptance loop terminated abnormally: {0}")]
    AcceptLoop(#[source] tokio::task::JoinError),

    /// The operation is not allowed in the current lifecycle state.
    #[error("cannot {operation} while service is {state}")]
    IllegalState {
        operation: &'static str,
        state: LifecycleState,
    },
}

/// A request body exceeded the aggregation limit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("request body exceeds {limit} bytes{}", declared_suffix(.declared))]
pub struct OversizedRequestError {
    /// Configured `max_aggregated_request_bytes`.
    pub limit: usize,
    /// `Content-Length` announced by the client, when present.
    pub declared: Option<u64>,
}

fn declared_suffix(declared: &Option<u64>) -> String {
    match declared {
        Some(len) => format!(" (declared {len})"),
        None => String::new(),
    }
}

/// Per-connection I/O or protocol failure.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("http protocol error: {0}")]
    Http(#[from] hyper::Error),

    #[error("failed to read request body: {0}")]
    Body(String),
}
