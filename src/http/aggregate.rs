//! Request aggregation: the size-bounded stage before dispatch.
//!
//! Turns a streamed `Request<B>` into one in-memory `Request<Bytes>`. The
//! inner service is only called with a complete body; anything over the limit
//! is answered here and never reaches it.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use bytes::Bytes;
use http::header::CONTENT_LENGTH;
use http::{HeaderMap, Request, Response, StatusCode};
use http_body::Body;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use tower::{Layer, Service};

use crate::error::{OversizedRequestError, TransportError};
use crate::http::response::{status_response, ResponseBody};
use crate::observability::metrics;

/// Applies [`Aggregate`] with a body limit in bytes.
#[derive(Debug, Clone, Copy)]
pub struct AggregateLayer {
    limit: usize,
}

impl AggregateLayer {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }
}

impl<S> Layer<S> for AggregateLayer {
    type Service = Aggregate<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Aggregate {
            inner,
            limit: self.limit,
        }
    }
}

/// Buffers the request body, bounded by `limit`, then calls the inner service.
#[derive(Debug, Clone)]
pub struct Aggregate<S> {
    inner: S,
    limit: usize,
}

impl<S, B> Service<Request<B>> for Aggregate<S>
where
    S: Service<Request<Bytes>, Response = Response<ResponseBody>, Error = Infallible>
        + Clone
        + Send
        + 'static,
    S::Future: Send,
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Response = Response<ResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        // The ready service goes into the future; a fresh clone stays behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let limit = self.limit;

        Box::pin(async move {
            let start = Instant::now();
            let (parts, body) = request.into_parts();

            let declared = declared_length(&parts.headers);
            if let Some(len) = declared.filter(|len| *len > limit as u64) {
                let err = OversizedRequestError {
                    limit,
                    declared: Some(len),
                };
                return Ok(reject_oversized(&err, &parts.uri, start));
            }

            let body = match Limited::new(body, limit).collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
                    let err = OversizedRequestError {
                        limit,
                        declared: None,
                    };
                    return Ok(reject_oversized(&err, &parts.uri, start));
                }
                Err(e) => {
                    let err = TransportError::Body(e.to_string());
                    tracing::debug!(uri = %parts.uri, error = %err, "Discarding unreadable request");
                    metrics::record_request(StatusCode::BAD_REQUEST.as_u16(), start);
                    return Ok(status_response(StatusCode::BAD_REQUEST, true));
                }
            };

            inner.call(Request::from_parts(parts, body)).await
        })
    }
}

/// `Content-Length` when present and well formed.
fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

fn reject_oversized(
    err: &OversizedRequestError,
    uri: &http::Uri,
    start: Instant,
) -> Response<ResponseBody> {
    tracing::warn!(uri = %uri, error = %err, "Rejecting oversized request");
    metrics::record_oversized_request();
    metrics::record_request(StatusCode::PAYLOAD_TOO_LARGE.as_u16(), start);
    status_response(StatusCode::PAYLOAD_TOO_LARGE, true)
}
