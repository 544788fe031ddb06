//! Canonical message bodies.
//!
//! Bodies are either empty, fully buffered, or a pull-based stream of
//! [`Bytes`] chunks. Streamed bodies are the only place the canonical
//! model touches I/O; everything push-shaped on the host side is turned
//! into this pull contract by the adapter's stream bridge, so handlers
//! and plugins never see raw callbacks.
//!
//! Request bodies are read at most once. [`BodySlot`] enforces that: the
//! second take fails loudly instead of silently yielding empty data.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use bytes::{Bytes, BytesMut};

use crate::error::{AdapterError, AdapterResult, StreamBridgeError};

/// Boxed future alias for chunk reads.
pub type ChunkFuture<'a> =
    Pin<Box<dyn Future<Output = Option<Result<Bytes, StreamBridgeError>>> + Send + 'a>>;

/// A pull-based byte source: call [`next_chunk`], get a chunk, an error,
/// or end-of-stream (`None`), which is delivered exactly once.
///
/// [`next_chunk`]: ChunkSource::next_chunk
pub trait ChunkSource: Send {
    fn next_chunk(&mut self) -> ChunkFuture<'_>;
}

/// The canonical pull end of a body stream.
pub struct BodyReader {
    source: Box<dyn ChunkSource>,
}

impl BodyReader {
    pub fn new(source: impl ChunkSource + 'static) -> Self {
        BodyReader {
            source: Box::new(source),
        }
    }

    /// Read the next chunk. `None` means the stream completed.
    pub async fn next_chunk(&mut self) -> Option<Result<Bytes, StreamBridgeError>> {
        self.source.next_chunk().await
    }
}

impl std::fmt::Debug for BodyReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyReader").finish_non_exhaustive()
    }
}

/// A fixed sequence of chunks exposed through the pull contract.
///
/// Used by tests and by hosts that already hold the whole body.
pub struct IterSource {
    chunks: std::vec::IntoIter<Bytes>,
}

impl IterSource {
    pub fn new(chunks: Vec<Bytes>) -> Self {
        IterSource {
            chunks: chunks.into_iter(),
        }
    }
}

impl ChunkSource for IterSource {
    fn next_chunk(&mut self) -> ChunkFuture<'_> {
        let next = self.chunks.next();
        Box::pin(async move { next.map(Ok) })
    }
}

/// A canonical message body.
#[derive(Debug, Default)]
pub enum Body {
    /// No body at all.
    #[default]
    Empty,
    /// Fully buffered body.
    Full(Bytes),
    /// Streamed body, pulled one chunk at a time.
    Stream(BodyReader),
}

impl Body {
    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty) || matches!(self, Body::Full(b) if b.is_empty())
    }

    /// Drain the body into one contiguous buffer.
    pub async fn collect(self) -> Result<Bytes, StreamBridgeError> {
        match self {
            Body::Empty => Ok(Bytes::new()),
            Body::Full(bytes) => Ok(bytes),
            Body::Stream(mut reader) => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = reader.next_chunk().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(buf.freeze())
            }
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        if bytes.is_empty() {
            Body::Empty
        } else {
            Body::Full(bytes)
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Bytes::from(bytes).into()
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Bytes::from_static(text.as_bytes()).into()
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Bytes::from(text).into()
    }
}

impl From<BodyReader> for Body {
    fn from(reader: BodyReader) -> Self {
        Body::Stream(reader)
    }
}

/// Single-consumption wrapper around a request body.
///
/// The slot can be taken exactly once; the consumption flag is the only
/// mutable state a canonical request carries besides its annotations.
#[derive(Debug)]
pub struct BodySlot {
    inner: Mutex<Option<Body>>,
}

impl BodySlot {
    pub fn new(body: Body) -> Self {
        BodySlot {
            inner: Mutex::new(Some(body)),
        }
    }

    /// Take the body out. Fails with [`AdapterError::BodyAlreadyConsumed`]
    /// on the second call.
    pub fn take(&self) -> AdapterResult<Body> {
        self.inner
            .lock()
            .expect("body slot lock")
            .take()
            .ok_or(AdapterError::BodyAlreadyConsumed)
    }

    pub fn is_consumed(&self) -> bool {
        self.inner.lock().expect("body slot lock").is_none()
    }
}
