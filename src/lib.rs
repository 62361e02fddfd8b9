//! Embeddable non-blocking HTTP front end.
//!
//! Accepts TCP connections, decodes HTTP/1 requests, aggregates each body up
//! to a configured limit and hands the complete request to a router supplied
//! by the embedding application.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;

pub use config::ServiceConfiguration;
pub use error::{ConfigurationError, OversizedRequestError, RouterError, ServiceError, TransportError};
pub use lifecycle::{HttpService, LifecycleState, ServiceBuilder};
pub use net::BufferPolicy;
pub use observability::{LoggingTap, TrafficTap};
pub use routing::RequestRouter;
