//! The canonical request — what every host shape is normalized into.

use bytes::Bytes;
use http::{Extensions, HeaderMap, Method, Uri};

use crate::body::{Body, BodySlot};
use crate::error::AdapterResult;
use crate::signal::AbortSignal;

/// Host-independent representation of one inbound HTTP request.
///
/// Built once per invocation by the request adapter. Immutable except
/// for the body's consumption state and the annotation slot plugins use
/// to stash per-request values (a cookie jar, auth claims, timing
/// marks); the adapter itself never looks inside the annotations.
#[derive(Debug)]
pub struct CanonicalRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: BodySlot,
    signal: AbortSignal,
    annotations: Extensions,
}

impl CanonicalRequest {
    pub fn new(
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Body,
        signal: AbortSignal,
    ) -> Self {
        CanonicalRequest {
            method,
            uri,
            headers,
            body: BodySlot::new(body),
            signal,
            annotations: Extensions::new(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Absolute request URL.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable header access for `on_request` hooks that rewrite the
    /// request in place.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// The invocation's composite cancellation signal.
    pub fn signal(&self) -> &AbortSignal {
        &self.signal
    }

    /// Per-request typed annotation slot, opaque to the adapter.
    pub fn annotations(&self) -> &Extensions {
        &self.annotations
    }

    pub fn annotations_mut(&mut self) -> &mut Extensions {
        &mut self.annotations
    }

    /// Take the body for reading. At most one take succeeds.
    pub fn take_body(&self) -> AdapterResult<Body> {
        self.body.take()
    }

    pub fn body_consumed(&self) -> bool {
        self.body.is_consumed()
    }

    /// Take the body and drain it to contiguous bytes.
    pub async fn collect_body(&self) -> AdapterResult<Bytes> {
        Ok(self.take_body()?.collect().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AdapterError;

    fn request_with_body(body: Body) -> CanonicalRequest {
        CanonicalRequest::new(
            Method::POST,
            "http://localhost/submit".parse().unwrap(),
            HeaderMap::new(),
            body,
            AbortSignal::never(),
        )
    }

    #[tokio::test]
    async fn collect_body_returns_full_bytes_once() {
        let request = request_with_body(Body::from("{\"name\":\"Ada\"}"));
        let bytes = request.collect_body().await.unwrap();
        assert_eq!(bytes, Bytes::from("{\"name\":\"Ada\"}"));

        match request.collect_body().await {
            Err(AdapterError::BodyAlreadyConsumed) => {}
            other => panic!("expected BodyAlreadyConsumed, got {other:?}"),
        }
    }

    #[test]
    fn annotations_round_trip() {
        #[derive(Clone, Debug, PartialEq)]
        struct Marker(u32);

        let mut request = request_with_body(Body::Empty);
        request.annotations_mut().insert(Marker(7));
        assert_eq!(request.annotations().get::<Marker>(), Some(&Marker(7)));
    }
}
