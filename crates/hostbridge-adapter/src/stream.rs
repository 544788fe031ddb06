//! Stream bridge — translates between push- and pull-based byte I/O.
//!
//! Host runtimes deliver request bodies two ways: pull (the consumer
//! asks for the next chunk) and push (the host fires callbacks as data
//! arrives). The canonical model only speaks pull, so everything
//! push-shaped is funneled through [`channel`], a bounded conduit that
//! suspends the pushing side while the consumer has unconsumed data
//! waiting. The reverse direction, [`pump`], drives a push-style reply
//! sink from a pull-based body one chunk at a time, waiting for the
//! sink's backpressure acknowledgment between chunks.
//!
//! Teardown is symmetric in both directions: a dropped or failed end is
//! always observable from the other end as an error or completion,
//! never as silent truncation.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::debug;

use hostbridge_core::body::{BodyReader, ChunkFuture, ChunkSource};
use hostbridge_core::signal::AbortSignal;
use hostbridge_core::{Body, StreamBridgeError};

/// Push-style byte sink with explicit backpressure.
///
/// `write` resolves when the sink has accepted the chunk and is ready
/// for the next one; `end` closes the sink normally, exactly once;
/// `abort` tears it down abnormally so the far side can distinguish
/// failure from completion.
#[async_trait]
pub trait ChunkSink: Send {
    async fn write(&mut self, chunk: Bytes) -> Result<(), StreamBridgeError>;
    async fn end(&mut self) -> Result<(), StreamBridgeError>;
    async fn abort(&mut self, error: StreamBridgeError);
}

/// Create a push→pull bridge with the given chunk capacity.
///
/// The returned [`PushHandle`] is the push end; the [`BodyReader`] is
/// the canonical pull end. With capacity 1 the bridge buffers at most
/// one unconsumed chunk: a second `push` suspends until the consumer
/// pulls. Dropping the reader makes further pushes fail with
/// [`StreamBridgeError::Disconnected`], which tells the upstream source
/// to stop producing.
pub fn channel(capacity: usize) -> (PushHandle, BodyReader) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        PushHandle { tx },
        BodyReader::new(ChannelSource { rx }),
    )
}

/// Push end of a bridged body.
pub struct PushHandle {
    tx: mpsc::Sender<Result<Bytes, StreamBridgeError>>,
}

impl PushHandle {
    /// Deliver one chunk, suspending while the bridge is full.
    pub async fn push(&self, chunk: Bytes) -> Result<(), StreamBridgeError> {
        self.tx
            .send(Ok(chunk))
            .await
            .map_err(|_| StreamBridgeError::Disconnected)
    }

    /// Terminate the stream with an error visible to the pull end.
    pub async fn fail(self, error: StreamBridgeError) {
        let _ = self.tx.send(Err(error)).await;
    }

    /// Close the stream normally; the pull end observes end-of-stream.
    pub fn close(self) {}
}

struct ChannelSource {
    rx: mpsc::Receiver<Result<Bytes, StreamBridgeError>>,
}

impl ChunkSource for ChannelSource {
    fn next_chunk(&mut self) -> ChunkFuture<'_> {
        Box::pin(self.rx.recv())
    }
}

/// Drive a push-style sink from a pull-based body.
///
/// Reads one chunk at a time and waits for the sink to acknowledge each
/// write before pulling the next, so the source never outruns the sink.
/// Source errors abort the sink; sink errors cancel the source (the
/// reader is released, which propagates upstream); an abort signal
/// firing between chunks tears down both ends promptly.
pub async fn pump<S>(
    body: Body,
    sink: &mut S,
    signal: &AbortSignal,
) -> Result<(), StreamBridgeError>
where
    S: ChunkSink + ?Sized,
{
    if let Some(reason) = signal.reason() {
        let error = StreamBridgeError::Cancelled(reason.to_string());
        sink.abort(error.clone()).await;
        return Err(error);
    }
    match body {
        Body::Empty => sink.end().await,
        Body::Full(bytes) => {
            sink.write(bytes).await?;
            sink.end().await
        }
        Body::Stream(mut reader) => loop {
            tokio::select! {
                biased;
                reason = signal.aborted() => {
                    debug!(%reason, "body transfer cancelled");
                    let error = StreamBridgeError::Cancelled(reason.to_string());
                    sink.abort(error.clone()).await;
                    return Err(error);
                }
                chunk = reader.next_chunk() => match chunk {
                    None => return sink.end().await,
                    Some(Ok(chunk)) => {
                        if let Err(error) = sink.write(chunk).await {
                            // Sink failure cancels the source: dropping the
                            // reader releases the upstream end.
                            drop(reader);
                            return Err(error);
                        }
                    }
                    Some(Err(error)) => {
                        sink.abort(error.clone()).await;
                        return Err(error);
                    }
                },
            }
        },
    }
}
