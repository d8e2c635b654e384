//! Tracking Context
//!
//! The tracking context records which tracker is currently discovering its
//! dependencies. Observed fields consult it on every read: if a tracker is
//! active, the field's subscription records that tracker.
//!
//! # Implementation
//!
//! We use a thread-local stack rather than a single slot. A tracker entering
//! discovery pushes itself; the returned guard pops it on drop, so the entry
//! is released on every exit path, including a failed resolution or an
//! unwinding panic. Building a tracker while another one is discovering
//! nests cleanly: reads are attributed to the innermost tracker only.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::subscription::Subscription;
use super::tracker::{TrackerId, TrackerInner};

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextEntry>> = const { RefCell::new(Vec::new()) };
}

/// An entry in the tracking stack.
struct ContextEntry {
    tracker_id: TrackerId,
    tracker: Weak<TrackerInner>,
    /// Subscriptions that newly recorded this tracker during this pass.
    registrations: usize,
}

/// Guard that keeps a tracker on the stack until dropped.
///
/// Scopes are only entered by [`Tracker`](super::Tracker) construction.
/// [`is_active`](Self::is_active), [`current`](Self::current) and
/// [`depth`](Self::depth) are read-only diagnostics for logging and tests;
/// nothing outside the crate can push or pop an entry.
pub struct TrackingScope {
    tracker_id: TrackerId,
}

impl TrackingScope {
    /// Make `tracker` the active tracker until the guard is dropped.
    pub(crate) fn enter(tracker: &Rc<TrackerInner>) -> Self {
        let tracker_id = tracker.id();
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().push(ContextEntry {
                tracker_id,
                tracker: Rc::downgrade(tracker),
                registrations: 0,
            });
        });

        Self { tracker_id }
    }

    /// Check if any tracker is discovering dependencies.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// The innermost active tracker, if any.
    pub fn current() -> Option<TrackerId> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().map(|entry| entry.tracker_id))
    }

    /// Number of nested discovery passes in progress.
    pub fn depth() -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().len())
    }

    /// Record the innermost active tracker on `subscription`.
    ///
    /// Called by observed fields when they are read.
    pub(crate) fn record_read(subscription: &Subscription) {
        CONTEXT_STACK.with(|stack| {
            if let Some(entry) = stack.borrow_mut().last_mut() {
                if subscription.record(entry.tracker_id, entry.tracker.clone()) {
                    entry.registrations += 1;
                }
            }
        });
    }

    /// Subscriptions that recorded this scope's tracker so far.
    pub(crate) fn registrations(&self) -> usize {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .iter()
                .rev()
                .find(|entry| entry.tracker_id == self.tracker_id)
                .map_or(0, |entry| entry.registrations)
        })
    }
}

impl Drop for TrackingScope {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            // Scopes are strictly nested; anything else is a bug in the core.
            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry.tracker_id, self.tracker_id,
                    "TrackingScope mismatch: expected {:?}, got {:?}",
                    self.tracker_id, entry.tracker_id
                );
            }
        });
    }
}
