//! Error types shared across the hostbridge crates.

use http::StatusCode;
use thiserror::Error;

/// Result type alias for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Errors that can occur while adapting one invocation.
///
/// All of these are local to a single invocation; nothing is retried by
/// the adapter itself and nothing propagates across invocations.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// No supported handler shape matched the raw invocation.
    #[error("no supported handler shape matches this invocation")]
    UnrecognizedShape,

    /// Request metadata could not be parsed into the canonical form.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// A second attempt was made to read a single-consumption body.
    #[error("request body already consumed")]
    BodyAlreadyConsumed,

    /// The user handler or a plugin hook failed.
    #[error("handler error: {0}")]
    Handler(#[from] anyhow::Error),

    /// I/O failure while bridging a body between push and pull ends.
    #[error("stream bridge error: {0}")]
    StreamBridge(#[from] StreamBridgeError),
}

impl AdapterError {
    /// Status code a reply synthesized from this error should carry.
    ///
    /// Malformed requests are the client's fault; everything else is
    /// reported as a generic server error without internal detail.
    pub fn status(&self) -> StatusCode {
        match self {
            AdapterError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Errors raised by the stream bridge while moving body chunks.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StreamBridgeError {
    /// The upstream byte source failed mid-stream.
    #[error("upstream source failed: {0}")]
    Source(String),

    /// The downstream sink rejected a write or closed early.
    #[error("downstream sink failed: {0}")]
    Sink(String),

    /// The invocation's abort signal fired while bridging.
    #[error("stream cancelled: {0}")]
    Cancelled(String),

    /// The other end of the bridge went away without finishing.
    #[error("stream closed before completion")]
    Disconnected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_request_maps_to_client_error() {
        let err = AdapterError::MalformedRequest("bad method".into());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn other_errors_map_to_server_error() {
        assert_eq!(
            AdapterError::UnrecognizedShape.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AdapterError::BodyAlreadyConsumed.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn stream_error_converts() {
        let err: AdapterError = StreamBridgeError::Disconnected.into();
        assert!(matches!(err, AdapterError::StreamBridge(_)));
    }
}
