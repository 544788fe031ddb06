//! hostbridge-adapter — one handler across many host calling conventions.
//!
//! A single request-handling function runs unmodified on standalone
//! servers, edge/worker runtimes, serverless platforms, event-listener
//! runtimes, and middleware frameworks. Each of those invokes handlers
//! differently; this crate is the layer that absorbs the difference.
//!
//! # Architecture
//!
//! ```text
//! host runtime
//!   │
//!   ▼
//! ServerAdapter::invoke(RawInvocation)
//!   │
//!   ├── shape::detect        — classify the calling convention
//!   ├── cancel::compose      — merge abort sources into one signal
//!   ├── request::adapt       — build the canonical request (lazy body)
//!   ├── PluginPipeline::run  — on_request hooks → handler → on_response hooks
//!   ├── response::deliver    — reply via return value / write-through
//!   │                          sink / respond-with slot / next() deferral
//!   ▼
//! host-specific reply
//! ```
//!
//! Push-style host bodies are bridged into the canonical pull contract
//! by [`stream::channel`]; [`stream::pump`] drives write-through reply
//! sinks with per-chunk backpressure. Everything the handler sees is
//! host-independent: [`CanonicalRequest`] in, [`CanonicalResponse`] out.

pub mod cancel;
pub mod convert;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod server;
pub mod shape;
pub mod stream;

pub use cancel::{compose, AbortSignalComposite};
pub use pipeline::{handler_fn, Handler, HandlerFuture, Plugin, PluginPipeline};
pub use response::ReplyChannel;
pub use server::{ServerAdapter, ServerAdapterBuilder};
pub use shape::{detect, HandlerShape, Next, RawInvocation, RawRequest, ReplySink, RespondSlot};
pub use stream::{ChunkSink, PushHandle};

pub use hostbridge_core::{
    AbortHandle, AbortReason, AbortSignal, AdapterError, AdapterOptions, AdapterResult, Body,
    CanonicalRequest, CanonicalResponse, ServerContext, StreamBridgeError,
};
