//! Subscriptions
//!
//! Every observed field owns exactly one [`Subscription`]: the ordered list of
//! trackers that read the field during their dependency discovery. When the
//! field changes, the subscription updates each tracker in recording order.
//!
//! Subscriptions hold weak references. The binding that created a tracker
//! owns it; once the last handle is dropped the entry is skipped, and it is
//! pruned on the next notification or the next recording.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use tracing::{trace, warn};

use super::tracker::{Tracker, TrackerId, TrackerInner};
use crate::error::{NotifyFailures, Result};

/// Ordered collection of trackers interested in one field.
///
/// A tracker appears at most once no matter how often it read the field.
#[derive(Default)]
pub struct Subscription {
    subscribers: RefCell<IndexMap<TrackerId, Weak<TrackerInner>>>,
}

impl Subscription {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `tracker` unless it is already recorded.
    ///
    /// Returns whether the tracker was added.
    pub fn add_subscriber(&self, tracker: &Tracker) -> bool {
        self.record(tracker.id(), Rc::downgrade(tracker.inner()))
    }

    pub(crate) fn record(&self, id: TrackerId, tracker: Weak<TrackerInner>) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        // Fields that are read but never written would otherwise keep every
        // dropped tracker forever.
        subscribers.retain(|_, tracker| tracker.strong_count() > 0);
        if subscribers.contains_key(&id) {
            return false;
        }
        subscribers.insert(id, tracker);
        true
    }

    /// Update every recorded tracker, in recording order.
    ///
    /// All trackers are updated even if some of them fail; the failures are
    /// returned together once the fan-out is complete.
    pub fn notify(&self) -> Result<()> {
        // Trackers may write other fields or build new trackers from their
        // callbacks, so no borrow is held while they run.
        let snapshot: Vec<(TrackerId, Weak<TrackerInner>)> = self
            .subscribers
            .borrow()
            .iter()
            .map(|(id, tracker)| (*id, tracker.clone()))
            .collect();

        let mut failures = NotifyFailures::default();
        let mut dropped = Vec::new();

        for (id, tracker) in snapshot {
            let Some(tracker) = tracker.upgrade() else {
                dropped.push(id);
                continue;
            };
            if let Err(error) = tracker.update() {
                warn!(tracker = %id, path = %tracker.key_path(), %error, "tracker update failed");
                failures.push(error);
            }
        }

        if !dropped.is_empty() {
            trace!(count = dropped.len(), "pruning dropped trackers");
            let mut subscribers = self.subscribers.borrow_mut();
            for id in dropped {
                subscribers.shift_remove(&id);
            }
        }

        failures.into_result()
    }

    /// Number of recorded trackers that are still alive.
    pub fn len(&self) -> usize {
        self.subscribers
            .borrow()
            .values()
            .filter(|tracker| tracker.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `id` is recorded and still alive.
    pub fn contains(&self, id: TrackerId) -> bool {
        self.subscribers
            .borrow()
            .get(&id)
            .is_some_and(|tracker| tracker.strong_count() > 0)
    }

    /// Ids of the live trackers, in recording order.
    pub fn subscriber_ids(&self) -> Vec<TrackerId> {
        self.subscribers
            .borrow()
            .iter()
            .filter(|(_, tracker)| tracker.strong_count() > 0)
            .map(|(id, _)| *id)
            .collect()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("subscribers", &self.subscriber_ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Object, Value};
    use crate::error::{CallbackError, Error};
    use std::cell::RefCell;

    fn logging_tracker(root: &Object, label: &'static str, log: &Rc<RefCell<Vec<String>>>) -> Tracker {
        let log = Rc::clone(log);
        Tracker::infallible(root, "x", move |value| {
            log.borrow_mut().push(format!("{label}={value}"));
        })
        .unwrap()
    }

    #[test]
    fn add_subscriber_dedupes() {
        let root = Object::new().with("x", 1);
        let tracker = Tracker::infallible(&root, "x", |_| {}).unwrap();
        let subscription = Subscription::new();

        assert!(subscription.add_subscriber(&tracker));
        assert!(!subscription.add_subscriber(&tracker));
        assert_eq!(subscription.len(), 1);
        assert!(subscription.contains(tracker.id()));
    }

    #[test]
    fn notify_runs_in_recording_order() {
        let root = Object::new().with("x", 1);
        let log = Rc::new(RefCell::new(Vec::new()));
        let first = logging_tracker(&root, "first", &log);
        let second = logging_tracker(&root, "second", &log);
        log.borrow_mut().clear();

        let subscription = Subscription::new();
        subscription.add_subscriber(&second);
        subscription.add_subscriber(&first);
        subscription.notify().unwrap();

        assert_eq!(*log.borrow(), vec!["second=1", "first=1"]);
    }

    #[test]
    fn notify_isolates_failures() {
        let root = Object::new().with("x", 1);
        let log = Rc::new(RefCell::new(Vec::new()));
        let failing = Tracker::new(&root, "x", {
            let armed = Rc::new(RefCell::new(false));
            move |_: &Value| -> std::result::Result<(), CallbackError> {
                let mut armed = armed.borrow_mut();
                if *armed {
                    return Err("binding is gone".into());
                }
                *armed = true;
                Ok(())
            }
        })
        .unwrap();
        let healthy = logging_tracker(&root, "healthy", &log);
        log.borrow_mut().clear();

        let subscription = Subscription::new();
        subscription.add_subscriber(&failing);
        subscription.add_subscriber(&healthy);

        let failures = match subscription.notify() {
            Err(Error::Notify(failures)) => failures,
            other => panic!("expected notify failures, got {other:?}"),
        };
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures.iter().next(), Some(Error::Callback { .. })));
        assert_eq!(*log.borrow(), vec!["healthy=1"]);
    }

    #[test]
    fn recording_prunes_dropped_trackers() {
        let root = Object::new().with("x", 1);
        let subscription = Subscription::new();

        for _ in 0..1000 {
            let tracker = Tracker::infallible(&root, "x", |_| {}).unwrap();
            subscription.add_subscriber(&tracker);
        }
        let kept = Tracker::infallible(&root, "x", |_| {}).unwrap();
        subscription.add_subscriber(&kept);

        assert_eq!(subscription.len(), 1);
        assert_eq!(subscription.subscribers.borrow().len(), 1);
    }

    #[test]
    fn pruning_on_record_keeps_order() {
        let root = Object::new().with("x", 1);
        let first = Tracker::infallible(&root, "x", |_| {}).unwrap();
        let gone = Tracker::infallible(&root, "x", |_| {}).unwrap();
        let last = Tracker::infallible(&root, "x", |_| {}).unwrap();

        let subscription = Subscription::new();
        subscription.add_subscriber(&first);
        subscription.add_subscriber(&gone);
        drop(gone);
        subscription.add_subscriber(&last);

        assert_eq!(subscription.subscribers.borrow().len(), 2);
        assert_eq!(subscription.subscriber_ids(), vec![first.id(), last.id()]);
    }

    #[test]
    fn dropped_trackers_are_pruned() {
        let root = Object::new().with("x", 1);
        let log = Rc::new(RefCell::new(Vec::new()));
        let kept = logging_tracker(&root, "kept", &log);
        let dropped = logging_tracker(&root, "dropped", &log);
        log.borrow_mut().clear();

        let subscription = Subscription::new();
        subscription.add_subscriber(&dropped);
        subscription.add_subscriber(&kept);
        drop(dropped);

        assert_eq!(subscription.len(), 1);
        subscription.notify().unwrap();
        assert_eq!(*log.borrow(), vec!["kept=1"]);
        assert_eq!(subscription.subscriber_ids(), vec![kept.id()]);
    }
}
