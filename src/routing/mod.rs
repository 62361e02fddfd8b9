//! Router capability supplied by the embedder.
//!
//! # Data Flow
//! ```text
//! Aggregated request (Request<Bytes>)
//!     → RequestRouter::route (embedder code, shared by every worker)
//!     → Ok(Response<Bytes>)  → encoded back to the client
//!     → Err(RouterError)     → 500 Internal Server Error, logged
//! ```
//!
//! # Design Decisions
//! - The router only ever sees complete requests
//! - One instance is shared across all connections; it must be `Send + Sync`
//! - Async closures implement the trait directly

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use http::{Request, Response};

use crate::error::RouterError;

/// Future returned by [`RequestRouter::route`].
pub type RouteFuture = Pin<Box<dyn Future<Output = Result<Response<Bytes>, RouterError>> + Send>>;

/// Turns one fully-aggregated request into one response.
///
/// Implementations are invoked concurrently from worker threads and should
/// return promptly; blocking work belongs on a separate pool.
pub trait RequestRouter: Send + Sync + 'static {
    fn route(&self, request: Request<Bytes>) -> RouteFuture;
}

impl<F, Fut> RequestRouter for F
where
    F: Fn(Request<Bytes>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response<Bytes>, RouterError>> + Send + 'static,
{
    fn route(&self, request: Request<Bytes>) -> RouteFuture {
        Box::pin(self(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn closures_are_routers() {
        let router: Arc<dyn RequestRouter> = Arc::new(|request: Request<Bytes>| async move {
            Ok::<_, RouterError>(Response::new(request.into_body()))
        });

        let response = router
            .route(Request::new(Bytes::from_static(b"ping")))
            .await
            .unwrap();
        assert_eq!(response.body(), &Bytes::from_static(b"ping"));
    }

    struct Failing;

    impl RequestRouter for Failing {
        fn route(&self, _request: Request<Bytes>) -> RouteFuture {
            Box::pin(async { Err::<Response<Bytes>, RouterError>("backend unavailable".into()) })
        }
    }

    #[tokio::test]
    async fn router_errors_surface() {
        let err = Failing
            .route(Request::new(Bytes::new()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "backend unavailable");
    }
}
