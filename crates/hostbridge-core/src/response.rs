//! The canonical response — what the handler and plugins produce.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};

use crate::body::Body;

/// Host-independent representation of one outbound HTTP response.
///
/// Owned by exactly one stage at a time: hooks hand it along the
/// pipeline and the response adapter finally consumes it with
/// [`into_parts`], so status and headers cannot change concurrently
/// with body transmission.
///
/// [`into_parts`]: CanonicalResponse::into_parts
#[derive(Debug)]
pub struct CanonicalResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Body,
}

impl CanonicalResponse {
    pub fn new(status: StatusCode) -> Self {
        CanonicalResponse {
            status,
            headers: HeaderMap::new(),
            body: Body::Empty,
        }
    }

    /// Plain-text response with a `content-type` header.
    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        CanonicalResponse::new(status)
            .header("content-type", "text/plain")
            .with_body(Body::from(body.into()))
    }

    /// JSON response from pre-encoded bytes.
    pub fn json_bytes(status: StatusCode, body: impl Into<Bytes>) -> Self {
        CanonicalResponse::new(status)
            .header("content-type", "application/json")
            .with_body(Body::from(body.into()))
    }

    /// Append a header, builder style. Invalid name/value pairs are
    /// skipped, mirroring how host header tuples are normalized.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Canonical status text for the status code, when one exists.
    pub fn reason(&self) -> Option<&'static str> {
        self.status.canonical_reason()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn set_body(&mut self, body: Body) {
        self.body = body;
    }

    /// Content-type shorthand used by tests and hosts.
    pub fn content_type(&self) -> Option<&HeaderValue> {
        self.headers.get(CONTENT_TYPE)
    }

    /// Decompose for transmission. Consuming the response is what pins
    /// status and headers for the duration of the body transfer.
    pub fn into_parts(self) -> (StatusCode, HeaderMap, Body) {
        (self.status, self.headers, self.body)
    }
}
