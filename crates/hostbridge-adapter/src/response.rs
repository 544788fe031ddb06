//! Response delivery — canonical response out, host reply mechanism in.

use tracing::debug;

use hostbridge_core::{AbortSignal, AdapterResult, CanonicalResponse, StreamBridgeError};

use crate::convert;
use crate::shape::{ReplySink, RespondSlot};
use crate::stream;

/// The reply mechanism a detected shape expects.
///
/// Built by the composition root from the invocation's parts after
/// shape detection; delivery through the wrong channel is therefore
/// unrepresentable.
pub enum ReplyChannel {
    /// The response is the call's return value (direct style).
    Return,
    /// Write-through reply object (paired and middleware style).
    Sink(Box<dyn ReplySink>),
    /// One-shot respond-with slot (event-listener style).
    Respond(RespondSlot),
}

impl std::fmt::Debug for ReplyChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplyChannel::Return => f.write_str("Return"),
            ReplyChannel::Sink(_) => f.write_str("Sink"),
            ReplyChannel::Respond(_) => f.write_str("Respond"),
        }
    }
}

/// Deliver a canonical response through the shape's channel.
///
/// Returns `Some(response)` for return-value shapes and `None` when the
/// reply went out through a side channel. Write-through delivery pipes
/// the body via the stream bridge: head first (duplicate headers as
/// repeated lines), then chunks with per-chunk backpressure, then one
/// `end` — or an abnormal `abort` if the body fails mid-stream, so the
/// host never mistakes truncation for completion.
pub async fn deliver(
    response: CanonicalResponse,
    channel: ReplyChannel,
    signal: &AbortSignal,
) -> AdapterResult<Option<CanonicalResponse>> {
    match channel {
        ReplyChannel::Return => Ok(Some(response)),
        ReplyChannel::Sink(mut sink) => {
            write_through(sink.as_mut(), response, signal).await?;
            Ok(None)
        }
        ReplyChannel::Respond(slot) => {
            debug!("fulfilling respond-with slot");
            slot.fulfill(response)
                .map_err(|_| StreamBridgeError::Disconnected)?;
            Ok(None)
        }
    }
}

async fn write_through(
    sink: &mut dyn ReplySink,
    response: CanonicalResponse,
    signal: &AbortSignal,
) -> AdapterResult<()> {
    let (status, headers, body) = response.into_parts();
    let reason = status.canonical_reason();
    sink.write_head(status, reason, convert::headers_to_tuples(&headers))
        .await?;
    stream::pump(body, sink, signal).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use hostbridge_core::body::BodyReader;
    use hostbridge_core::{AdapterError, Body, IterSource};
    use http::StatusCode;

    use crate::stream::ChunkSink;

    #[derive(Default)]
    struct RecordingReply {
        head: Option<(StatusCode, Option<&'static str>, Vec<(String, Vec<u8>)>)>,
        chunks: Vec<Bytes>,
        ended: usize,
        aborted: Option<StreamBridgeError>,
    }

    #[async_trait]
    impl ChunkSink for RecordingReply {
        async fn write(&mut self, chunk: Bytes) -> Result<(), StreamBridgeError> {
            self.chunks.push(chunk);
            Ok(())
        }
        async fn end(&mut self) -> Result<(), StreamBridgeError> {
            self.ended += 1;
            Ok(())
        }
        async fn abort(&mut self, error: StreamBridgeError) {
            self.aborted = Some(error);
        }
    }

    #[async_trait]
    impl ReplySink for RecordingReply {
        async fn write_head(
            &mut self,
            status: StatusCode,
            reason: Option<&'static str>,
            headers: Vec<(String, Vec<u8>)>,
        ) -> Result<(), StreamBridgeError> {
            self.head = Some((status, reason, headers));
            Ok(())
        }
    }

    #[tokio::test]
    async fn return_channel_hands_the_response_back() {
        let response = CanonicalResponse::text(StatusCode::OK, "hi");
        let delivered = deliver(response, ReplyChannel::Return, &AbortSignal::never())
            .await
            .unwrap();
        assert_eq!(delivered.unwrap().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn write_through_emits_head_body_end() {
        let mut sink = RecordingReply::default();
        let response = CanonicalResponse::new(StatusCode::CREATED)
            .header("set-cookie", "a=1")
            .header("set-cookie", "b=2")
            .with_body(Body::Stream(BodyReader::new(IterSource::new(vec![
                Bytes::from("part1"),
                Bytes::from("part2"),
            ]))));

        write_through(&mut sink, response, &AbortSignal::never())
            .await
            .unwrap();

        let (status, reason, headers) = sink.head.expect("head written");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(reason, Some("Created"));
        let cookie_lines: Vec<_> = headers
            .iter()
            .filter(|(name, _)| name == "set-cookie")
            .map(|(_, value)| value.as_slice())
            .collect();
        assert_eq!(cookie_lines, vec![b"a=1".as_slice(), b"b=2".as_slice()]);
        assert_eq!(sink.chunks, vec![Bytes::from("part1"), Bytes::from("part2")]);
        assert_eq!(sink.ended, 1);
        assert!(sink.aborted.is_none());
    }

    #[tokio::test]
    async fn body_error_aborts_the_sink_instead_of_truncating() {
        struct FailingSource(usize);
        impl hostbridge_core::ChunkSource for FailingSource {
            fn next_chunk(&mut self) -> hostbridge_core::ChunkFuture<'_> {
                self.0 += 1;
                let step = self.0;
                Box::pin(async move {
                    if step == 1 {
                        Some(Ok(Bytes::from("partial")))
                    } else {
                        Some(Err(StreamBridgeError::Source("read failed".into())))
                    }
                })
            }
        }

        let mut sink = RecordingReply::default();
        let response = CanonicalResponse::new(StatusCode::OK)
            .with_body(Body::Stream(BodyReader::new(FailingSource(0))));

        let result = write_through(&mut sink, response, &AbortSignal::never()).await;
        assert!(matches!(
            result,
            Err(AdapterError::StreamBridge(StreamBridgeError::Source(_)))
        ));
        assert_eq!(sink.ended, 0);
        assert!(sink.aborted.is_some());
    }

    #[tokio::test]
    async fn respond_channel_fulfills_the_slot_once() {
        let (slot, rx) = RespondSlot::new();
        let response = CanonicalResponse::text(StatusCode::OK, "event");
        let delivered = deliver(response, ReplyChannel::Respond(slot), &AbortSignal::never())
            .await
            .unwrap();
        assert!(delivered.is_none());
        assert_eq!(rx.await.unwrap().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn dropped_event_host_is_an_error_not_silence() {
        let (slot, rx) = RespondSlot::new();
        drop(rx);
        let response = CanonicalResponse::text(StatusCode::OK, "event");
        let result = deliver(response, ReplyChannel::Respond(slot), &AbortSignal::never()).await;
        assert!(matches!(
            result,
            Err(AdapterError::StreamBridge(StreamBridgeError::Disconnected))
        ));
    }
}
