//! Shared fixtures for the adapter integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;

use hostbridge_adapter::{ChunkSink, ReplySink};
use hostbridge_core::StreamBridgeError;

/// Route adapter logs to the test output. Safe to call repeatedly.
pub fn init_logs() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Everything a write-through reply sink observed.
#[derive(Default)]
pub struct SinkState {
    pub head: Option<(StatusCode, Option<&'static str>, Vec<(String, Vec<u8>)>)>,
    pub chunks: Vec<Bytes>,
    pub ended: usize,
    pub aborted: Option<StreamBridgeError>,
}

impl SinkState {
    pub fn body(&self) -> Bytes {
        let mut buf = Vec::new();
        for chunk in &self.chunks {
            buf.extend_from_slice(chunk);
        }
        Bytes::from(buf)
    }

    pub fn header_values(&self, name: &str) -> Vec<Vec<u8>> {
        self.head
            .as_ref()
            .map(|(_, _, headers)| {
                headers
                    .iter()
                    .filter(|(n, _)| n == name)
                    .map(|(_, v)| v.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Reply sink that records writes into shared state the test can
/// inspect after the invocation consumed the sink itself.
pub struct RecordingSink {
    state: Arc<Mutex<SinkState>>,
}

impl RecordingSink {
    pub fn new() -> (RecordingSink, Arc<Mutex<SinkState>>) {
        let state = Arc::new(Mutex::new(SinkState::default()));
        (
            RecordingSink {
                state: state.clone(),
            },
            state,
        )
    }
}

#[async_trait]
impl ChunkSink for RecordingSink {
    async fn write(&mut self, chunk: Bytes) -> Result<(), StreamBridgeError> {
        self.state.lock().unwrap().chunks.push(chunk);
        Ok(())
    }

    async fn end(&mut self) -> Result<(), StreamBridgeError> {
        self.state.lock().unwrap().ended += 1;
        Ok(())
    }

    async fn abort(&mut self, error: StreamBridgeError) {
        self.state.lock().unwrap().aborted = Some(error);
    }
}

#[async_trait]
impl ReplySink for RecordingSink {
    async fn write_head(
        &mut self,
        status: StatusCode,
        reason: Option<&'static str>,
        headers: Vec<(String, Vec<u8>)>,
    ) -> Result<(), StreamBridgeError> {
        self.state.lock().unwrap().head = Some((status, reason, headers));
        Ok(())
    }
}
