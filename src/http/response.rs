//! Responses the pipeline produces on its own.
//!
//! # Responsibilities
//! - Map pipeline failures to HTTP status codes
//! - Mark failed exchanges so the connection is not reused
//!
//! # Design Decisions
//! - Oversized body → 413 Payload Too Large, connection closed
//! - Unreadable body → 400 Bad Request, connection closed
//! - Router failure → 500 Internal Server Error, connection kept

use bytes::Bytes;
use http::header::{HeaderValue, CONNECTION, CONTENT_TYPE};
use http::{Response, StatusCode};
use http_body_util::Full;

/// Body type of every response the pipeline writes.
pub type ResponseBody = Full<Bytes>;

/// Plain-text response carrying the status reason phrase.
pub fn status_response(status: StatusCode, close: bool) -> Response<ResponseBody> {
    let reason = status.canonical_reason().unwrap_or("Error");
    let mut response = Response::new(Full::new(Bytes::from_static(reason.as_bytes())));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    if close {
        response
            .headers_mut()
            .insert(CONNECTION, HeaderValue::from_static("close"));
    }
    response
}
