//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! bind_address
//!     → buffer.rs (socket2 listener: reuse, backlog, keep-alive)
//!     → listener.rs (accept loop on the acceptance pool)
//!     → buffer.rs (per-connection nodelay and socket buffer sizes)
//!     → connection.rs (id assignment, active count)
//!     → Hand off to the worker pool and the HTTP pipeline
//! ```
//!
//! # Design Decisions
//! - Socket options come from one immutable BufferPolicy
//! - Each connection tracked for graceful shutdown
//! - Accept errors are logged and retried, never fatal

pub mod buffer;
pub mod connection;
pub mod listener;

pub use buffer::BufferPolicy;
pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
pub use listener::AcceptanceLoop;
