//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every connection:
//!     → tap.rs (raw open/read/write/error/close events, bytes untouched)
//! Every request:
//!     → tower-http TraceLayer span (method, uri, status, latency)
//!     → metrics.rs (counters, gauges, histograms)
//! Lifecycle and accept loop:
//!     → tracing events with structured fields
//!
//! Consumers:
//!     → logging.rs installs a fmt subscriber when the embedder has none
//!     → any `metrics` recorder the embedder installs
//! ```
//!
//! # Design Decisions
//! - One tap instance shared by all connections, no per-connection state in it
//! - Metrics are facade calls; nothing is exported unless a recorder exists

pub mod logging;
pub mod metrics;
pub mod tap;

pub use tap::{LoggingTap, TappedIo, TrafficTap};
