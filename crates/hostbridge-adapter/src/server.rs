//! The composition root — one entry point, polymorphic over host shapes.

use std::sync::Arc;

use tracing::{debug, error};

use hostbridge_core::{
    AdapterError, AdapterOptions, AdapterResult, CanonicalRequest, CanonicalResponse,
};

use crate::cancel;
use crate::pipeline::{ErrorFactory, Handler, NotFoundFactory, PipelineOutcome, Plugin, PluginPipeline};
use crate::request;
use crate::response::{self, ReplyChannel};
use crate::shape::{self, HandlerShape, RawInvocation};
use crate::stream;

/// Runtime-agnostic server adapter.
///
/// Wired once at startup with a handler, an ordered plugin list, and
/// fallback factories; then invoked concurrently with whatever raw
/// parts each host runtime supplies. Every invocation is classified,
/// normalized, run through the plugin pipeline, and answered through
/// the channel its shape expects.
pub struct ServerAdapter {
    handler: Handler,
    pipeline: PluginPipeline,
    not_found: NotFoundFactory,
    server_error: ErrorFactory,
    options: AdapterOptions,
}

impl ServerAdapter {
    pub fn builder(handler: Handler) -> ServerAdapterBuilder {
        ServerAdapterBuilder {
            handler,
            plugins: Vec::new(),
            not_found: Arc::new(|_request: &CanonicalRequest| {
                CanonicalResponse::text(http::StatusCode::NOT_FOUND, "Not Found")
            }),
            server_error: Arc::new(|err: &AdapterError| {
                let status = err.status();
                CanonicalResponse::text(status, status.canonical_reason().unwrap_or("Error"))
            }),
            options: AdapterOptions::default(),
        }
    }

    pub fn options(&self) -> &AdapterOptions {
        &self.options
    }

    /// Create a push→pull body bridge with the configured capacity.
    ///
    /// Host integrations with push-style request bodies feed chunks
    /// into the returned handle and put the reader on the raw request.
    pub fn body_channel(&self) -> (stream::PushHandle, hostbridge_core::BodyReader) {
        stream::channel(self.options.bridge_capacity)
    }

    /// Handle one invocation.
    ///
    /// Returns `Ok(Some(response))` for return-value shapes,
    /// `Ok(None)` when the reply went through a side channel or the
    /// middleware shape deferred to `next()`, and `Err` when the
    /// invocation could not be answered at all (unrecognized shape, or
    /// the host's reply channel failed mid-delivery).
    pub async fn invoke(&self, invocation: RawInvocation) -> AdapterResult<Option<CanonicalResponse>> {
        let detected = match shape::detect(&invocation) {
            Ok(detected) => detected,
            Err(err) => {
                error!(error = %err, "invocation rejected");
                return Err(err);
            }
        };
        debug!(shape = ?detected, "invocation classified");

        let RawInvocation {
            request: raw_request,
            reply,
            respond_with,
            next,
            context,
            abort_sources,
        } = invocation;
        let Some(raw_request) = raw_request else {
            return Err(AdapterError::UnrecognizedShape);
        };

        let channel = match detected {
            HandlerShape::Direct => ReplyChannel::Return,
            HandlerShape::Paired | HandlerShape::Middleware => {
                ReplyChannel::Sink(reply.ok_or(AdapterError::UnrecognizedShape)?)
            }
            HandlerShape::EventListener => {
                ReplyChannel::Respond(respond_with.ok_or(AdapterError::UnrecognizedShape)?)
            }
        };

        // The composite must outlive the whole invocation so its source
        // registrations stay armed until the reply is out.
        let composite = cancel::compose(abort_sources);
        let signal = composite.signal();

        let canonical = match request::adapt(raw_request, signal.clone(), &self.options) {
            Ok(canonical) => canonical,
            Err(err) => {
                // The shape is known, so the failure is answered through
                // the proper channel; the pipeline never ran for this
                // invocation.
                error!(error = %err, "request adaptation failed");
                let reply = (self.server_error)(&err);
                return response::deliver(reply, channel, &signal).await;
            }
        };

        let may_defer = matches!(detected, HandlerShape::Middleware) && next.is_some();
        let outcome = self
            .pipeline
            .run(
                canonical,
                context,
                &self.handler,
                may_defer,
                &self.not_found,
                &self.server_error,
            )
            .await;

        match outcome {
            PipelineOutcome::Deferred => {
                debug!("handler declined, deferring to next()");
                if let Some(next) = next {
                    next.invoke().await;
                }
                Ok(None)
            }
            PipelineOutcome::Response(reply) => {
                match response::deliver(reply, channel, &signal).await {
                    Ok(returned) => Ok(returned),
                    Err(err) => {
                        error!(error = %err, "reply delivery failed");
                        Err(err)
                    }
                }
            }
        }
    }
}

/// Construction-time configuration for [`ServerAdapter`].
pub struct ServerAdapterBuilder {
    handler: Handler,
    plugins: Vec<Arc<dyn Plugin>>,
    not_found: NotFoundFactory,
    server_error: ErrorFactory,
    options: AdapterOptions,
}

impl ServerAdapterBuilder {
    /// Register a plugin. Hooks run in registration order.
    pub fn plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Arc::new(plugin));
        self
    }

    /// Reply factory for requests the handler declines on shapes with
    /// no `next` to defer to.
    pub fn on_not_found(
        mut self,
        factory: impl Fn(&CanonicalRequest) -> CanonicalResponse + Send + Sync + 'static,
    ) -> Self {
        self.not_found = Arc::new(factory);
        self
    }

    /// Reply factory for errors nothing else answered. The response
    /// must not expose internal error detail.
    pub fn on_error(
        mut self,
        factory: impl Fn(&AdapterError) -> CanonicalResponse + Send + Sync + 'static,
    ) -> Self {
        self.server_error = Arc::new(factory);
        self
    }

    pub fn options(mut self, options: AdapterOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> ServerAdapter {
        ServerAdapter {
            handler: self.handler,
            pipeline: PluginPipeline::new(self.plugins),
            not_found: self.not_found,
            server_error: self.server_error,
            options: self.options,
        }
    }
}
