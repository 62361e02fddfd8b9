//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Build (builder.rs):
//!     Knobs → Validate → Resolve bind address → Pipeline template → HttpService
//!
//! Start (service.rs):
//!     Build pools (pools.rs) → Bind listener → Running → block on accept loop
//!
//! Stop (service.rs, shutdown.rs):
//!     stop() → Shutdown trigger → Close listener → Drain → Release pools → Stopped
//! ```
//!
//! # Design Decisions
//! - Every path out of start() releases whatever pools exist
//! - Startup failures are returned, not only logged
//! - Shutdown has a timeout: connections still open after the grace period are aborted

pub mod builder;
pub mod pools;
pub mod service;
pub mod shutdown;
pub mod state;

pub use builder::ServiceBuilder;
pub use service::HttpService;
pub use shutdown::{Shutdown, ShutdownSignal};
pub use state::LifecycleState;
