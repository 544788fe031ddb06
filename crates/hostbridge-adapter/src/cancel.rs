//! Cancellation bridge — any-of composition of abort sources.
//!
//! A host may hand the adapter several independent cancellation sources
//! for one invocation (the connection closing, a deadline, an explicit
//! host abort). The bridge merges them into one derived signal with
//! any-of semantics, without relying on a native combinator: it
//! registers a one-shot listener per source and drops the remaining
//! registrations as soon as the first source fires, so no listener
//! outlives the request.

use std::sync::{Arc, Mutex};

use hostbridge_core::signal::{AbortReason, AbortSignal, ListenerGuard};

/// A derived signal plus the listener registrations that feed it.
///
/// The registrations live exactly as long as the composite: dropping it
/// deregisters every remaining listener from its source.
pub struct AbortSignalComposite {
    signal: AbortSignal,
    _guards: Arc<Mutex<Vec<ListenerGuard>>>,
}

impl AbortSignalComposite {
    /// Clone of the derived signal, handed to the canonical request.
    pub fn signal(&self) -> AbortSignal {
        self.signal.clone()
    }

    pub fn is_aborted(&self) -> bool {
        self.signal.is_aborted()
    }

    pub fn reason(&self) -> Option<AbortReason> {
        self.signal.reason()
    }
}

/// Merge any number of abort sources into one composite signal.
///
/// Zero sources yield a signal that never aborts. A single source is
/// mirrored directly with no extra wrapping. With several sources, a
/// source already aborted at composition time makes the composite start
/// aborted with that source's reason; otherwise the first source to
/// fire transitions the composite exactly once, records its reason, and
/// deregisters the listeners on the other sources. Later aborts are
/// observed but do not change the recorded reason.
pub fn compose(sources: Vec<AbortSignal>) -> AbortSignalComposite {
    let inert_guards = Arc::new(Mutex::new(Vec::new()));
    match sources.len() {
        0 => AbortSignalComposite {
            signal: AbortSignal::never(),
            _guards: inert_guards,
        },
        1 => {
            let mut sources = sources;
            AbortSignalComposite {
                signal: sources.remove(0),
                _guards: inert_guards,
            }
        }
        _ => {
            for source in &sources {
                if let Some(reason) = source.reason() {
                    return AbortSignalComposite {
                        signal: AbortSignal::already_aborted(reason),
                        _guards: inert_guards,
                    };
                }
            }

            let (handle, signal) = AbortSignal::new();
            let guards: Arc<Mutex<Vec<ListenerGuard>>> = Arc::new(Mutex::new(Vec::new()));
            for source in &sources {
                let handle = handle.clone();
                let remaining = guards.clone();
                let guard = source.on_abort(move |reason| {
                    handle.abort(reason.clone());
                    // First fire wins; dropping the other guards
                    // deregisters their listeners immediately.
                    remaining.lock().expect("composite guards lock").clear();
                });
                guards.lock().expect("composite guards lock").push(guard);
            }
            // A source may have fired while registrations were still
            // being added; sweep the leftovers in that case.
            if signal.is_aborted() {
                guards.lock().expect("composite guards lock").clear();
            }
            AbortSignalComposite {
                signal,
                _guards: guards,
            }
        }
    }
}
