//! Per-connection processing pipeline.
//!
//! # Stage order
//! ```text
//! 1. logging     observability tap   TappedIo around the socket
//! 2. encoder     response encoder    hyper HTTP/1 connection (write half)
//! 3. decoder     request decoder     hyper HTTP/1 connection (read half)
//! 4. aggregator  size-bounded body   AggregateLayer
//! 5. router      dispatch            RouterService
//! ```
//!
//! The order is described once, as data, in a [`PipelineTemplate`] built at
//! configuration time. Every accepted connection gets a fresh
//! [`ConnectionPipeline`] instantiated from that template; the pipeline is
//! owned by the worker task serving the connection and dropped with it.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::server::graceful::Watcher;
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpStream;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::ServiceConfiguration;
use crate::error::{ConfigurationError, TransportError};
use crate::http::aggregate::AggregateLayer;
use crate::http::dispatch::RouterService;
use crate::net::buffer::BufferPolicy;
use crate::net::connection::ConnectionId;
use crate::observability::tap::{TappedIo, TrafficTap};
use crate::routing::RequestRouter;

/// One stage of the connection pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageDescriptor {
    ObservabilityTap,
    ResponseEncoder,
    RequestDecoder,
    RequestAggregator { max_bytes: usize },
    RouterDispatch,
}

impl StageDescriptor {
    /// Position this stage must occupy.
    pub fn position(&self) -> usize {
        match self {
            Self::ObservabilityTap => 0,
            Self::ResponseEncoder => 1,
            Self::RequestDecoder => 2,
            Self::RequestAggregator { .. } => 3,
            Self::RouterDispatch => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ObservabilityTap => "logging",
            Self::ResponseEncoder => "encoder",
            Self::RequestDecoder => "decoder",
            Self::RequestAggregator { .. } => "aggregator",
            Self::RouterDispatch => "router",
        }
    }
}

const STAGE_COUNT: usize = 5;

/// Ordered stage list plus the shared capabilities the stages need.
#[derive(Clone)]
pub struct PipelineTemplate {
    stages: Vec<StageDescriptor>,
    max_aggregated_request_bytes: usize,
    buffer_policy: BufferPolicy,
    tap: Arc<dyn TrafficTap>,
    router: Arc<dyn RequestRouter>,
}

impl PipelineTemplate {
    /// The canonical pipeline for `config`.
    pub fn standard(config: &ServiceConfiguration) -> Result<Self, ConfigurationError> {
        let stages = vec![
            StageDescriptor::ObservabilityTap,
            StageDescriptor::ResponseEncoder,
            StageDescriptor::RequestDecoder,
            StageDescriptor::RequestAggregator {
                max_bytes: config.max_aggregated_request_bytes(),
            },
            StageDescriptor::RouterDispatch,
        ];
        Self::validate_order(&stages)?;

        Ok(Self {
            stages,
            max_aggregated_request_bytes: config.max_aggregated_request_bytes(),
            buffer_policy: *config.buffer_policy(),
            tap: Arc::clone(config.traffic_tap()),
            router: Arc::clone(config.router()),
        })
    }

    /// Check that `stages` holds every stage exactly once, in canonical order.
    pub fn validate_order(stages: &[StageDescriptor]) -> Result<(), ConfigurationError> {
        if stages.len() != STAGE_COUNT {
            return Err(ConfigurationError::PipelineOrder(format!(
                "expected {STAGE_COUNT} stages, found {}",
                stages.len()
            )));
        }
        for (index, stage) in stages.iter().enumerate() {
            if stage.position() != index {
                return Err(ConfigurationError::PipelineOrder(format!(
                    "stage `{}` found at position {index}, belongs at {}",
                    stage.name(),
                    stage.position()
                )));
            }
        }
        Ok(())
    }

    pub fn stages(&self) -> &[StageDescriptor] {
        &self.stages
    }

    pub fn max_aggregated_request_bytes(&self) -> usize {
        self.max_aggregated_request_bytes
    }

    /// Build a fresh pipeline for one accepted connection.
    pub fn instantiate(&self, stream: TcpStream, peer: SocketAddr, id: ConnectionId) -> ConnectionPipeline {
        let mut codec = http1::Builder::new();
        codec.keep_alive(true).timer(TokioTimer::new());
        self.buffer_policy.configure_codec(&mut codec);

        ConnectionPipeline {
            id,
            peer,
            io: TappedIo::new(stream, id, Arc::clone(&self.tap)),
            codec,
            tap: Arc::clone(&self.tap),
            router: Arc::clone(&self.router),
            max_aggregated_request_bytes: self.max_aggregated_request_bytes,
        }
    }
}

impl fmt::Debug for PipelineTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineTemplate")
            .field("stages", &self.stages)
            .field("buffer_policy", &self.buffer_policy)
            .finish_non_exhaustive()
    }
}

/// The stages of one live connection.
pub struct ConnectionPipeline {
    id: ConnectionId,
    peer: SocketAddr,
    io: TappedIo<TcpStream>,
    codec: http1::Builder,
    tap: Arc<dyn TrafficTap>,
    router: Arc<dyn RequestRouter>,
    max_aggregated_request_bytes: usize,
}

impl ConnectionPipeline {
    /// Serve requests until the peer closes, a protocol error occurs, or the
    /// graceful-shutdown watcher asks the connection to wind down.
    pub async fn run(self, watcher: Option<Watcher>) -> Result<(), TransportError> {
        let Self {
            id,
            peer,
            io,
            codec,
            tap,
            router,
            max_aggregated_request_bytes,
        } = self;

        tap.on_open(id, peer);

        let service = ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(AggregateLayer::new(max_aggregated_request_bytes))
            .service(RouterService::new(router));

        let connection = codec.serve_connection(TokioIo::new(io), TowerToHyperService::new(service));
        let result = match watcher {
            Some(watcher) => watcher.watch(connection).await,
            None => connection.await,
        };

        if let Err(e) = &result {
            tap.on_error(id, e);
        }
        tap.on_close(id);
        result.map_err(TransportError::from)
    }
}
