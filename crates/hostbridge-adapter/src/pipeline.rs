//! Plugin pipeline — ordered hooks around the user handler.
//!
//! Plugins are registered once at adapter construction and run in
//! registration order for every invocation: `on_request` hooks first
//! (any of them may short-circuit with a response), then the handler,
//! then `on_response` hooks over whatever response was produced. Errors
//! from the handler or any hook are routed through `on_error` hooks;
//! the first one to answer wins, and a generic server error is
//! synthesized when none does, with the original error handed to the
//! operator through the tracing channel rather than the wire.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use hostbridge_core::{AdapterError, CanonicalRequest, CanonicalResponse, ServerContext};

/// Boxed future alias for handler results.
pub type HandlerFuture =
    Pin<Box<dyn Future<Output = anyhow::Result<Option<CanonicalResponse>>> + Send>>;

/// The user handler.
///
/// Receives the canonical request and the opaque host context; returns
/// a response, or `None` to decline the request (middleware hosts then
/// defer to the rest of their chain, everyone else gets the configured
/// not-found reply).
pub type Handler = Arc<dyn Fn(Arc<CanonicalRequest>, ServerContext) -> HandlerFuture + Send + Sync>;

/// Wrap an async closure as a [`Handler`].
pub fn handler_fn<F, Fut>(f: F) -> Handler
where
    F: Fn(Arc<CanonicalRequest>, ServerContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Option<CanonicalResponse>>> + Send + 'static,
{
    Arc::new(move |request, context| Box::pin(f(request, context)))
}

/// A pipeline hook. All methods default to "not interested".
///
/// `on_request` may mutate the request in place (headers, annotations)
/// or short-circuit by returning a response. `on_response` may mutate
/// the response through the exclusive reference or replace it by
/// returning a new one. `on_error` may convert a failure into a
/// response; returning `None` passes the error along.
#[async_trait]
pub trait Plugin: Send + Sync {
    async fn on_request(
        &self,
        _request: &mut CanonicalRequest,
        _context: &ServerContext,
    ) -> anyhow::Result<Option<CanonicalResponse>> {
        Ok(None)
    }

    async fn on_response(
        &self,
        _request: &CanonicalRequest,
        _context: &ServerContext,
        _response: &mut CanonicalResponse,
    ) -> anyhow::Result<Option<CanonicalResponse>> {
        Ok(None)
    }

    async fn on_error(
        &self,
        _request: &CanonicalRequest,
        _context: &ServerContext,
        _error: &AdapterError,
    ) -> Option<CanonicalResponse> {
        None
    }
}

/// What one pipeline run produced.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// A response, ready for delivery.
    Response(CanonicalResponse),
    /// The handler declined and the shape supports deferral.
    Deferred,
}

/// Factory for the reply when the handler declines and cannot defer.
pub type NotFoundFactory = Arc<dyn Fn(&CanonicalRequest) -> CanonicalResponse + Send + Sync>;

/// Factory for the generic reply to an unhandled error. Must not leak
/// internal detail into the response.
pub type ErrorFactory = Arc<dyn Fn(&AdapterError) -> CanonicalResponse + Send + Sync>;

enum PreOutcome {
    Continue,
    Short(CanonicalResponse),
    Fail(AdapterError),
}

/// The immutable, ordered plugin chain.
pub struct PluginPipeline {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginPipeline {
    pub fn new(plugins: Vec<Arc<dyn Plugin>>) -> Self {
        PluginPipeline { plugins }
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Run the full hook/handler sequence for one invocation.
    ///
    /// `may_defer` is true only for shapes with a `next` continuation;
    /// it turns a declining handler into [`PipelineOutcome::Deferred`]
    /// instead of a not-found reply.
    pub async fn run(
        &self,
        request: CanonicalRequest,
        context: ServerContext,
        handler: &Handler,
        may_defer: bool,
        not_found: &NotFoundFactory,
        server_error: &ErrorFactory,
    ) -> PipelineOutcome {
        let mut request = request;

        let mut pre = PreOutcome::Continue;
        for plugin in &self.plugins {
            match plugin.on_request(&mut request, &context).await {
                Ok(None) => {}
                Ok(Some(response)) => {
                    debug!("request short-circuited by plugin");
                    pre = PreOutcome::Short(response);
                    break;
                }
                Err(err) => {
                    pre = PreOutcome::Fail(AdapterError::Handler(err));
                    break;
                }
            }
        }

        // Mutation ends here; hooks and the handler share the request
        // read-only from now on.
        let request = Arc::new(request);

        let produced: Result<Option<CanonicalResponse>, AdapterError> = match pre {
            PreOutcome::Short(response) => Ok(Some(response)),
            PreOutcome::Fail(err) => Err(err),
            PreOutcome::Continue => match handler(request.clone(), context.clone()).await {
                Ok(response) => Ok(response),
                Err(err) => Err(AdapterError::Handler(err)),
            },
        };

        match produced {
            Err(err) => {
                PipelineOutcome::Response(
                    self.recover(&request, &context, err, server_error, true).await,
                )
            }
            Ok(None) if may_defer => PipelineOutcome::Deferred,
            Ok(response) => {
                let response = response.unwrap_or_else(|| not_found(&request));
                match self.post_process(&request, &context, response).await {
                    Ok(response) => PipelineOutcome::Response(response),
                    Err(err) => PipelineOutcome::Response(
                        self.recover(&request, &context, err, server_error, false).await,
                    ),
                }
            }
        }
    }

    /// Run `on_response` hooks in order over a produced response.
    async fn post_process(
        &self,
        request: &CanonicalRequest,
        context: &ServerContext,
        mut response: CanonicalResponse,
    ) -> Result<CanonicalResponse, AdapterError> {
        for plugin in &self.plugins {
            match plugin.on_response(request, context, &mut response).await {
                Ok(None) => {}
                Ok(Some(replacement)) => response = replacement,
                Err(err) => return Err(AdapterError::Handler(err)),
            }
        }
        Ok(response)
    }

    /// Route an error through `on_error` hooks; first response wins.
    ///
    /// A winning error response still gets `on_response` post-processing
    /// (`allow_post`), except when the error came from the
    /// `on_response` chain itself — that would loop. The synthesized
    /// last-resort reply skips post-processing either way.
    async fn recover(
        &self,
        request: &CanonicalRequest,
        context: &ServerContext,
        err: AdapterError,
        server_error: &ErrorFactory,
        allow_post: bool,
    ) -> CanonicalResponse {
        error!(error = %err, "invocation failed, running error hooks");
        for plugin in &self.plugins {
            if let Some(response) = plugin.on_error(request, context, &err).await {
                if !allow_post {
                    return response;
                }
                return match self.post_process(request, context, response).await {
                    Ok(response) => response,
                    Err(post_err) => {
                        error!(error = %post_err, "response hooks failed on an error response");
                        server_error(&post_err)
                    }
                };
            }
        }
        server_error(&err)
    }
}
