//! One handler, four host calling conventions: the canonical request
//! must come out identical and the reply must land on each shape's own
//! channel.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;

use common::RecordingSink;
use hostbridge_adapter::{
    handler_fn, Next, RawInvocation, RawRequest, RespondSlot, ServerAdapter,
};
use hostbridge_core::{CanonicalRequest, CanonicalResponse};

/// Renders the canonical view of a request so equivalence across
/// shapes can be compared byte for byte.
fn snapshot(request: &CanonicalRequest) -> String {
    let headers: Vec<String> = request
        .headers()
        .iter()
        .map(|(name, value)| format!("{}={}", name, String::from_utf8_lossy(value.as_bytes())))
        .collect();
    format!(
        "{} {} [{}]",
        request.method(),
        request.uri(),
        headers.join(";")
    )
}

fn snapshot_adapter() -> ServerAdapter {
    ServerAdapter::builder(handler_fn(|request, _context| async move {
        Ok(Some(CanonicalResponse::text(
            StatusCode::OK,
            snapshot(&request),
        )))
    }))
    .build()
}

fn equivalent_get() -> RawRequest {
    RawRequest::new("get", "/resource?id=7")
        .header("Accept", "text/plain")
        .header("X-Trace", "a")
        .header("X-Trace", "b")
}

#[tokio::test]
async fn all_shapes_normalize_to_the_same_canonical_request() {
    let adapter = snapshot_adapter();

    // Direct: the response is the return value.
    let direct = adapter
        .invoke(RawInvocation::direct(equivalent_get()))
        .await
        .unwrap()
        .expect("direct shape returns the response");
    let direct_snapshot = direct.into_parts().2.collect().await.unwrap();

    // Paired: the response is written through the reply sink.
    let (sink, state) = RecordingSink::new();
    let returned = adapter
        .invoke(RawInvocation::paired(equivalent_get(), Box::new(sink)))
        .await
        .unwrap();
    assert!(returned.is_none(), "paired shape replies via the sink");
    let paired_snapshot = {
        let state = state.lock().unwrap();
        assert_eq!(state.head.as_ref().unwrap().0, StatusCode::OK);
        assert_eq!(state.ended, 1);
        state.body()
    };

    // Event-listener: the response arrives through respond-with.
    let (slot, rx) = RespondSlot::new();
    let returned = adapter
        .invoke(RawInvocation::event(equivalent_get(), slot))
        .await
        .unwrap();
    assert!(returned.is_none(), "event shape replies via respond-with");
    let event_snapshot = rx.await.unwrap().into_parts().2.collect().await.unwrap();

    // Middleware, matched: same write-through channel as paired.
    let (sink, state) = RecordingSink::new();
    let next_called = Arc::new(AtomicBool::new(false));
    let flag = next_called.clone();
    let returned = adapter
        .invoke(RawInvocation::middleware(
            equivalent_get(),
            Box::new(sink),
            Next::new(move || {
                let flag = flag.clone();
                async move {
                    flag.store(true, Ordering::SeqCst);
                }
            }),
        ))
        .await
        .unwrap();
    assert!(returned.is_none());
    assert!(!next_called.load(Ordering::SeqCst), "handled, so no next()");
    let middleware_snapshot = state.lock().unwrap().body();

    assert_eq!(direct_snapshot, paired_snapshot);
    assert_eq!(direct_snapshot, event_snapshot);
    assert_eq!(direct_snapshot, middleware_snapshot);
    let rendered = String::from_utf8(direct_snapshot.to_vec()).unwrap();
    assert!(rendered.starts_with("GET http://localhost/resource?id=7"));
    assert!(rendered.contains("x-trace=a"));
    assert!(rendered.contains("x-trace=b"));
}

#[tokio::test]
async fn unmatched_middleware_defers_to_next_without_writing() {
    let adapter = ServerAdapter::builder(handler_fn(|request, _context| async move {
        if request.uri().path() == "/handled" {
            Ok(Some(CanonicalResponse::text(StatusCode::OK, "mine")))
        } else {
            Ok(None)
        }
    }))
    .build();

    let (sink, state) = RecordingSink::new();
    let next_called = Arc::new(AtomicBool::new(false));
    let flag = next_called.clone();

    let returned = adapter
        .invoke(RawInvocation::middleware(
            RawRequest::new("GET", "/other"),
            Box::new(sink),
            Next::new(move || {
                let flag = flag.clone();
                async move {
                    flag.store(true, Ordering::SeqCst);
                }
            }),
        ))
        .await
        .unwrap();

    assert!(returned.is_none());
    assert!(next_called.load(Ordering::SeqCst), "next() must be invoked");
    let state = state.lock().unwrap();
    assert!(state.head.is_none(), "nothing may be written when deferring");
    assert!(state.chunks.is_empty());
    assert_eq!(state.ended, 0);
}

#[tokio::test]
async fn paired_reply_preserves_repeated_header_lines() {
    let adapter = ServerAdapter::builder(handler_fn(|_request, _context| async move {
        Ok(Some(
            CanonicalResponse::text(StatusCode::OK, "ok")
                .header("set-cookie", "a=1")
                .header("set-cookie", "b=2"),
        ))
    }))
    .build();

    let (sink, state) = RecordingSink::new();
    adapter
        .invoke(RawInvocation::paired(
            RawRequest::new("GET", "/"),
            Box::new(sink),
        ))
        .await
        .unwrap();

    let state = state.lock().unwrap();
    assert_eq!(
        state.header_values("set-cookie"),
        vec![b"a=1".to_vec(), b"b=2".to_vec()]
    );
    assert_eq!(state.body(), Bytes::from("ok"));
}
