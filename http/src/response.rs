//! Synthesized responses for mocked branches.

use crate::HttpResponse;
use bytes::Bytes;
use http::StatusCode;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderValue};
use serde::Serialize;

/// Builds a response with `Content-Type` and a matching `Content-Length`.
pub fn with_body(
    status: StatusCode,
    content_type: &'static str,
    body: impl Into<Bytes>,
) -> HttpResponse {
    let body = body.into();
    let mut res = HttpResponse::new(Bytes::new());
    *res.status_mut() = status;
    res.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    res.headers_mut()
        .insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
    *res.body_mut() = body;
    res
}

/// Create a text/plain response
pub fn text(body: impl Into<Bytes>) -> HttpResponse {
    with_body(StatusCode::OK, "text/plain; charset=utf-8", body)
}

/// Create a text/html response
pub fn html(body: impl Into<Bytes>) -> HttpResponse {
    with_body(StatusCode::OK, "text/html; charset=utf-8", body)
}

/// Create a text/xml response
pub fn xml(body: impl Into<Bytes>) -> HttpResponse {
    with_body(StatusCode::OK, "text/xml; charset=utf-8", body)
}

/// Create a JSON response
pub fn json<T: Serialize>(body: &T) -> serde_json::Result<HttpResponse> {
    let json = serde_json::to_vec(body)?;
    Ok(with_body(StatusCode::OK, "application/json", json))
}

/// Create a 404 Not Found response
pub fn not_found() -> HttpResponse {
    status(StatusCode::NOT_FOUND)
}

/// Empty-bodied response with the given status.
pub fn status(code: StatusCode) -> HttpResponse {
    with_body(code, "text/plain; charset=utf-8", Bytes::new())
}
