//! Abort signals — cooperative cancellation for one invocation.
//!
//! An [`AbortSignal`] is the read side of a one-shot cancellation flag.
//! It can be inspected synchronously (`is_aborted`/`reason`), awaited
//! (`aborted`), or observed through a registered one-shot listener that
//! deregisters itself when its guard is dropped. The write side is an
//! [`AbortHandle`]; the first `abort` wins and records its reason, later
//! aborts are observed but change nothing.
//!
//! The listener registry is what makes any-of composition portable: the
//! cancellation bridge registers a listener per source and drops the
//! remaining registrations as soon as the first source fires, so no
//! listener outlives the request it belongs to.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::oneshot;

/// Why a signal was aborted. Cheap to clone and compare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbortReason(Arc<str>);

impl AbortReason {
    pub fn new(message: impl Into<String>) -> Self {
        AbortReason(message.into().into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

type Listener = Box<dyn FnOnce(&AbortReason) + Send>;

struct SignalState {
    reason: Option<AbortReason>,
    listeners: HashMap<u64, Listener>,
    next_listener_id: u64,
}

struct Shared {
    state: Mutex<SignalState>,
}

impl Shared {
    fn new() -> Self {
        Shared {
            state: Mutex::new(SignalState {
                reason: None,
                listeners: HashMap::new(),
                next_listener_id: 0,
            }),
        }
    }

    fn abort(&self, reason: AbortReason) {
        let fired = {
            let mut state = self.state.lock().expect("signal lock");
            if state.reason.is_some() {
                // Later aborts are observed but the first reason stands.
                return;
            }
            state.reason = Some(reason.clone());
            std::mem::take(&mut state.listeners)
        };
        // Listeners run outside the lock; they may touch other signals.
        for (_, listener) in fired {
            listener(&reason);
        }
    }
}

/// Read side of a cancellation flag.
///
/// Cloning is cheap and every clone observes the same state. A signal
/// constructed with [`AbortSignal::never`] carries no state at all and
/// never aborts.
#[derive(Clone)]
pub struct AbortSignal {
    shared: Option<Arc<Shared>>,
}

/// Write side of a cancellation flag. The first abort wins.
#[derive(Clone)]
pub struct AbortHandle {
    shared: Arc<Shared>,
}

impl AbortHandle {
    /// Abort the paired signal. Idempotent; only the first reason is
    /// recorded.
    pub fn abort(&self, reason: AbortReason) {
        self.shared.abort(reason);
    }
}

impl AbortSignal {
    /// Create a connected handle/signal pair.
    pub fn new() -> (AbortHandle, AbortSignal) {
        let shared = Arc::new(Shared::new());
        (
            AbortHandle {
                shared: shared.clone(),
            },
            AbortSignal {
                shared: Some(shared),
            },
        )
    }

    /// A signal that never aborts. Used when an invocation has no
    /// cancellation sources.
    pub fn never() -> AbortSignal {
        AbortSignal { shared: None }
    }

    /// A signal that is already aborted with the given reason.
    pub fn already_aborted(reason: AbortReason) -> AbortSignal {
        let (handle, signal) = AbortSignal::new();
        handle.abort(reason);
        signal
    }

    pub fn is_aborted(&self) -> bool {
        self.reason().is_some()
    }

    /// The recorded reason, if the signal has aborted.
    pub fn reason(&self) -> Option<AbortReason> {
        let shared = self.shared.as_ref()?;
        shared.state.lock().expect("signal lock").reason.clone()
    }

    /// Register a one-shot listener.
    ///
    /// If the signal is already aborted the listener runs immediately on
    /// the calling task. Otherwise it runs once when the signal aborts,
    /// unless the returned guard is dropped first.
    pub fn on_abort(&self, listener: impl FnOnce(&AbortReason) + Send + 'static) -> ListenerGuard {
        let Some(shared) = self.shared.as_ref() else {
            return ListenerGuard::inert();
        };
        let id = {
            let mut state = shared.state.lock().expect("signal lock");
            if let Some(reason) = state.reason.clone() {
                drop(state);
                listener(&reason);
                return ListenerGuard::inert();
            }
            let id = state.next_listener_id;
            state.next_listener_id += 1;
            state.listeners.insert(id, Box::new(listener));
            id
        };
        ListenerGuard {
            shared: Some(Arc::downgrade(shared)),
            id,
        }
    }

    /// Wait until the signal aborts. Pends forever on a never-aborting
    /// signal.
    ///
    /// Built on the listener registry, so cancelling the wait (dropping
    /// the future) deregisters cleanly and an abort that races the
    /// registration is still delivered.
    pub async fn aborted(&self) -> AbortReason {
        if self.shared.is_none() {
            return std::future::pending().await;
        }
        let (tx, rx) = oneshot::channel();
        let _guard = self.on_abort(move |reason| {
            let _ = tx.send(reason.clone());
        });
        match rx.await {
            Ok(reason) => reason,
            // The listener can only vanish with the guard, which we
            // hold; treat the impossible as "never aborts".
            Err(_) => std::future::pending().await,
        }
    }
}

impl fmt::Debug for AbortSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortSignal")
            .field("aborted", &self.is_aborted())
            .finish()
    }
}

impl fmt::Debug for AbortHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortHandle").finish_non_exhaustive()
    }
}

/// Deregisters its listener when dropped, so listeners never outlive the
/// scope that registered them.
pub struct ListenerGuard {
    shared: Option<Weak<Shared>>,
    id: u64,
}

impl ListenerGuard {
    fn inert() -> ListenerGuard {
        ListenerGuard {
            shared: None,
            id: 0,
        }
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take().and_then(|weak| weak.upgrade()) {
            shared
                .state
                .lock()
                .expect("signal lock")
                .listeners
                .remove(&self.id);
        }
    }
}
