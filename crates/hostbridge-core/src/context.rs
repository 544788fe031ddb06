//! Opaque per-invocation host context.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Caller-supplied value threaded through the pipeline unchanged.
///
/// The host integration owns the contents; the adapter only moves the
/// handle around for the duration of one invocation and never inspects
/// it. Handlers and plugins that know the concrete type can get it back
/// with [`downcast_ref`].
///
/// [`downcast_ref`]: ServerContext::downcast_ref
#[derive(Clone, Default)]
pub struct ServerContext {
    inner: Option<Arc<dyn Any + Send + Sync>>,
}

impl ServerContext {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        ServerContext {
            inner: Some(Arc::new(value)),
        }
    }

    /// A context carrying nothing, for hosts that have no ambient state.
    pub fn empty() -> Self {
        ServerContext { inner: None }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_none()
    }

    pub fn downcast_ref<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.inner.as_deref().and_then(|any| any.downcast_ref())
    }
}

impl fmt::Debug for ServerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerContext")
            .field("present", &self.inner.is_some())
            .finish()
    }
}
