//! Router dispatch: the last pipeline stage.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use bytes::Bytes;
use http::{Request, Response, StatusCode};
use http_body_util::Full;
use tower::Service;

use crate::http::response::{status_response, ResponseBody};
use crate::observability::metrics;
use crate::routing::RequestRouter;

/// Tower service that hands complete requests to the embedder's router.
#[derive(Clone)]
pub struct RouterService {
    router: Arc<dyn RequestRouter>,
}

impl RouterService {
    pub fn new(router: Arc<dyn RequestRouter>) -> Self {
        Self { router }
    }
}

impl Service<Request<Bytes>> for RouterService {
    type Response = Response<ResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        let router = Arc::clone(&self.router);
        let method = request.method().clone();
        let uri = request.uri().clone();

        Box::pin(async move {
            let start = Instant::now();
            let response = match router.route(request).await {
                Ok(response) => response.map(Full::new),
                Err(e) => {
                    tracing::error!(method = %method, uri = %uri, error = %e, "Router failed to handle request");
                    status_response(StatusCode::INTERNAL_SERVER_ERROR, false)
                }
            };
            metrics::record_request(response.status().as_u16(), start);
            Ok(response)
        })
    }
}
