//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Accepted TCP connection
//!     → pipeline.rs (template instantiated per connection)
//!     → TappedIo + hyper HTTP/1 connection (decode / encode)
//!     → aggregate.rs (bounded body collection, 413 on overflow)
//!     → dispatch.rs (router call, 500 on router error)
//!     → response.rs (responses the pipeline writes itself)
//!     → Send to client
//! ```

pub mod aggregate;
pub mod dispatch;
pub mod pipeline;
pub mod response;

pub use pipeline::{ConnectionPipeline, PipelineTemplate, StageDescriptor};
