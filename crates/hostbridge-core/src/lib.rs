pub mod body;
pub mod context;
pub mod error;
pub mod options;
pub mod request;
pub mod response;
pub mod signal;

pub use body::{Body, BodyReader, ChunkFuture, ChunkSource, IterSource};
pub use context::ServerContext;
pub use error::{AdapterError, AdapterResult, StreamBridgeError};
pub use options::AdapterOptions;
pub use request::CanonicalRequest;
pub use response::CanonicalResponse;
pub use signal::{AbortHandle, AbortReason, AbortSignal, ListenerGuard};
