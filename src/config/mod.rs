//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! settings file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServiceSettings
//!     → ServiceBuilder::from_settings + router supplied in code
//!     → ServiceConfiguration (validated, immutable)
//!     → shared via Arc with the lifecycle and every connection
//! ```
//!
//! # Design Decisions
//! - Configuration is immutable once built; a new service needs a new build
//! - All knobs have defaults so an empty file is a valid file
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod service;
pub mod validation;

pub use loader::{load_settings, parse_settings};
pub use schema::{BufferSettings, LoggingSettings, ServiceSettings};
pub use service::{
    default_worker_threads, resolve_bind_address, ServiceConfiguration, DEFAULT_ACCEPTOR_THREADS,
    DEFAULT_MAX_AGGREGATED_REQUEST_BYTES, DEFAULT_PORT, DEFAULT_SHUTDOWN_GRACE_PERIOD,
};
pub use validation::ValidationError;
