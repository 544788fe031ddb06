//! Host invocation shapes.
//!
//! Every supported runtime invokes a handler with a different calling
//! convention. Rather than duck-typing arbitrary argument shapes, the
//! adapter models an invocation as an explicit bag of parts
//! ([`RawInvocation`]) and classifies it into a closed enumeration
//! ([`HandlerShape`]) with fixed-priority structural probes. New
//! conventions are added as new variants, never by loosening existing
//! probes.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use http::StatusCode;
use tokio::sync::oneshot;

use hostbridge_core::{
    AbortSignal, AdapterError, AdapterResult, Body, CanonicalResponse, ServerContext,
    StreamBridgeError,
};

use crate::stream::ChunkSink;

/// Request data as the host hands it over, before normalization.
///
/// `target` may be a path (`/x?y=1`) or an absolute URL; `scheme` and
/// `authority` are optional hints for hosts that know them out-of-band.
/// Hosts with push-style bodies bridge them through
/// [`crate::stream::channel`] first, so `body` is always pull-shaped
/// here and stays untouched until the handler reads it.
pub struct RawRequest {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, Vec<u8>)>,
    pub scheme: Option<String>,
    pub authority: Option<String>,
    pub body: Body,
}

impl RawRequest {
    pub fn new(method: impl Into<String>, target: impl Into<String>) -> Self {
        RawRequest {
            method: method.into(),
            target: target.into(),
            headers: Vec::new(),
            scheme: None,
            authority: None,
            body: Body::Empty,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl AsRef<[u8]>) -> Self {
        self.headers.push((name.into(), value.as_ref().to_vec()));
        self
    }

    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    pub fn authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = Some(authority.into());
        self
    }

    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }
}

impl fmt::Debug for RawRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawRequest")
            .field("method", &self.method)
            .field("target", &self.target)
            .field("headers", &self.headers.len())
            .finish_non_exhaustive()
    }
}

/// Writable reply object with a "write head, stream body" protocol.
///
/// Shapes that deliver the response as a side effect (paired and
/// middleware style) hand the adapter one of these. The head is written
/// once, duplicate headers arrive as repeated (name, value) lines, then
/// the body is streamed through the [`ChunkSink`] half and closed
/// exactly once with `end` — or torn down abnormally with `abort`.
#[async_trait]
pub trait ReplySink: ChunkSink {
    async fn write_head(
        &mut self,
        status: StatusCode,
        reason: Option<&'static str>,
        headers: Vec<(String, Vec<u8>)>,
    ) -> Result<(), StreamBridgeError>;
}

/// One-shot response delivery used by event-listener hosts.
///
/// Consuming `fulfill` makes "respond at most once" a type-level
/// guarantee rather than a runtime check.
pub struct RespondSlot {
    tx: oneshot::Sender<CanonicalResponse>,
}

impl RespondSlot {
    /// Create the slot plus the receiver the host event loop awaits.
    pub fn new() -> (RespondSlot, oneshot::Receiver<CanonicalResponse>) {
        let (tx, rx) = oneshot::channel();
        (RespondSlot { tx }, rx)
    }

    /// Deliver the response. Fails if the host side already went away.
    pub fn fulfill(self, response: CanonicalResponse) -> Result<(), CanonicalResponse> {
        self.tx.send(response)
    }
}

impl fmt::Debug for RespondSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RespondSlot").finish_non_exhaustive()
    }
}

type NextFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// The "defer to the rest of the chain" continuation of middleware
/// hosts. Invoked instead of writing a reply when the handler declines
/// the request.
pub struct Next {
    f: Box<dyn FnOnce() -> NextFuture + Send>,
}

impl Next {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Next {
            f: Box::new(move || Box::pin(f())),
        }
    }

    pub async fn invoke(self) {
        (self.f)().await
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}

/// Everything a host runtime supplies for one invocation.
///
/// The four shape constructors cover the supported conventions; the
/// field bag itself stays public so integrations for new hosts can
/// assemble unusual combinations and let [`detect`] judge them.
pub struct RawInvocation {
    pub request: Option<RawRequest>,
    pub reply: Option<Box<dyn ReplySink>>,
    pub respond_with: Option<RespondSlot>,
    pub next: Option<Next>,
    pub context: ServerContext,
    pub abort_sources: Vec<AbortSignal>,
}

impl fmt::Debug for RawInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawInvocation")
            .field("request", &self.request)
            .field("reply", &self.reply.is_some())
            .field("respond_with", &self.respond_with.is_some())
            .field("next", &self.next.is_some())
            .field("abort_sources", &self.abort_sources.len())
            .finish_non_exhaustive()
    }
}

impl RawInvocation {
    fn empty() -> Self {
        RawInvocation {
            request: None,
            reply: None,
            respond_with: None,
            next: None,
            context: ServerContext::empty(),
            abort_sources: Vec::new(),
        }
    }

    /// Worker/edge style: a request object in, a response back as the
    /// return value.
    pub fn direct(request: RawRequest) -> Self {
        RawInvocation {
            request: Some(request),
            ..RawInvocation::empty()
        }
    }

    /// Node-style paired request/response: response delivery is a side
    /// effect on the reply object.
    pub fn paired(request: RawRequest, reply: Box<dyn ReplySink>) -> Self {
        RawInvocation {
            request: Some(request),
            reply: Some(reply),
            ..RawInvocation::empty()
        }
    }

    /// Event-listener style: a single event carrying the request and a
    /// one-shot respond-with slot.
    pub fn event(request: RawRequest, respond_with: RespondSlot) -> Self {
        RawInvocation {
            request: Some(request),
            respond_with: Some(respond_with),
            ..RawInvocation::empty()
        }
    }

    /// Three-argument middleware style: request, reply object, and a
    /// continuation to call when the request is not handled.
    pub fn middleware(request: RawRequest, reply: Box<dyn ReplySink>, next: Next) -> Self {
        RawInvocation {
            request: Some(request),
            reply: Some(reply),
            next: Some(next),
            ..RawInvocation::empty()
        }
    }

    pub fn with_context(mut self, context: ServerContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_abort_source(mut self, source: AbortSignal) -> Self {
        self.abort_sources.push(source);
        self
    }
}

/// The closed set of supported calling conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerShape {
    Direct,
    Paired,
    EventListener,
    Middleware,
}

/// Classify an invocation by structural probes in fixed priority order.
///
/// Side-effect-free and derived from the arguments alone, so concurrent
/// invocations through one adapter instance cannot leak state into each
/// other's classification. Ambiguous bags resolve to the
/// highest-priority match; anything else is an unrecognized shape.
pub fn detect(invocation: &RawInvocation) -> AdapterResult<HandlerShape> {
    let request = invocation.request.is_some();
    let reply = invocation.reply.is_some();
    let respond_with = invocation.respond_with.is_some();
    let next = invocation.next.is_some();

    if request && !reply && !respond_with && !next {
        return Ok(HandlerShape::Direct);
    }
    if request && reply && !next {
        return Ok(HandlerShape::Paired);
    }
    if request && respond_with {
        return Ok(HandlerShape::EventListener);
    }
    if request && reply && next {
        return Ok(HandlerShape::Middleware);
    }
    Err(AdapterError::UnrecognizedShape)
}
