//! Trackers
//!
//! A [`Tracker`] is one downstream computation, such as "keep this text node
//! showing `user.name`". It is bound to a root object, a key path and a
//! callback.
//!
//! # Lifecycle
//!
//! 1. On construction the tracker enters a [`TrackingScope`] and resolves its
//!    key path. Every observed field read along the way records the tracker
//!    in its subscription.
//!
//! 2. The scope is released, then the callback runs once with the resolved
//!    value.
//!
//! 3. Whenever one of those fields changes, [`Tracker::update`] re-resolves
//!    the path with untracked reads and hands the new value to the callback.
//!
//! Dependencies are discovered exactly once. If the path later resolves
//! through different fields (for example after an intermediate object was
//! replaced), those fields are not tracked.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace};

use super::context::TrackingScope;
use crate::data::{Access, KeyPath, Object, Value};
use crate::error::{CallbackError, Error, Result};

/// Unique identifier for a tracker.
///
/// Subscriptions use it to record each tracker at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackerId(u64);

impl TrackerId {
    /// Generate a new unique tracker ID.
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TrackerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

type OnChange = Box<dyn FnMut(&Value) -> std::result::Result<(), CallbackError>>;

pub(crate) struct TrackerInner {
    id: TrackerId,
    root: Object,
    path: KeyPath,
    on_change: RefCell<OnChange>,
    /// Subscriptions that recorded this tracker during discovery.
    dependencies: Cell<usize>,
    /// Callback invocations, the initial one included.
    run_count: Cell<usize>,
}

impl TrackerInner {
    pub(crate) fn id(&self) -> TrackerId {
        self.id
    }

    pub(crate) fn key_path(&self) -> &KeyPath {
        &self.path
    }

    /// Re-resolve without tracking and deliver the result.
    pub(crate) fn update(&self) -> Result<()> {
        let value = self.path.resolve(&self.root, Access::Untracked)?;
        trace!(tracker = %self.id, path = %self.path, %value, "tracker recomputed");
        self.deliver(&value)
    }

    fn deliver(&self, value: &Value) -> Result<()> {
        let mut on_change = self
            .on_change
            .try_borrow_mut()
            .map_err(|_| Error::ReentrantUpdate {
                tracker: self.id,
                path: self.path.to_string(),
            })?;

        self.run_count.set(self.run_count.get() + 1);
        (&mut **on_change)(value).map_err(|source| Error::Callback {
            tracker: self.id,
            path: self.path.to_string(),
            source,
        })
    }
}

/// A computation bound to a key path, re-run when the fields it read change.
///
/// Cloning the handle shares the tracker. Subscriptions only hold weak
/// references, so the tracker stays live for as long as its owner keeps a
/// handle; dropping the last one stops further updates.
///
/// # Example
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// use serde_json::json;
/// use weft_core::{observe, Tracker, Value};
///
/// let data = observe(json!({ "count": 1 })).unwrap();
/// let log = Rc::new(RefCell::new(Vec::new()));
/// let sink = Rc::clone(&log);
///
/// // Keep the handle for as long as the binding should stay live.
/// let _binding = Tracker::infallible(&data, "count", move |value| {
///     sink.borrow_mut().push(value.clone());
/// })
/// .unwrap();
///
/// data.set("count", 1).unwrap();
/// data.set("count", 2).unwrap();
/// assert_eq!(*log.borrow(), vec![Value::from(1), Value::from(2)]);
/// ```
///
/// Discarding the handle is a lint error, not a silently dead binding:
///
/// ```compile_fail
/// #![deny(unused_must_use)]
///
/// use serde_json::json;
/// use weft_core::{observe, Tracker};
///
/// let data = observe(json!({ "count": 1 })).unwrap();
/// Tracker::infallible(&data, "count", |_| {}).unwrap();
/// ```
#[must_use = "dropping the last handle stops notifications"]
#[derive(Clone)]
pub struct Tracker(Rc<TrackerInner>);

impl Tracker {
    /// Create a tracker and run its dependency discovery.
    ///
    /// Before this returns, the callback has been invoked once with the
    /// initial value. Fails if the key path is malformed, cannot be
    /// resolved, or the initial callback fails; no usable tracker exists in
    /// that case and the tracking context is already released.
    pub fn new<F>(root: &Object, key_path: &str, on_change: F) -> Result<Self>
    where
        F: FnMut(&Value) -> std::result::Result<(), CallbackError> + 'static,
    {
        let path = KeyPath::parse(key_path)?;
        let tracker = Self(Rc::new(TrackerInner {
            id: TrackerId::new(),
            root: root.clone(),
            path,
            on_change: RefCell::new(Box::new(on_change)),
            dependencies: Cell::new(0),
            run_count: Cell::new(0),
        }));
        let inner = &tracker.0;

        debug!(tracker = %inner.id, path = %inner.path, root = %root.id(), "discovering dependencies");
        let value = {
            let scope = TrackingScope::enter(inner);
            let resolved = inner.path.resolve(&inner.root, Access::Tracked);
            inner.dependencies.set(scope.registrations());
            resolved
        }?;
        debug!(
            tracker = %inner.id,
            dependencies = inner.dependencies.get(),
            "dependency discovery finished"
        );

        inner.deliver(&value)?;
        Ok(tracker)
    }

    /// Like [`Tracker::new`] for callbacks that cannot fail.
    pub fn infallible<F>(root: &Object, key_path: &str, mut on_change: F) -> Result<Self>
    where
        F: FnMut(&Value) + 'static,
    {
        Self::new(root, key_path, move |value| {
            on_change(value);
            Ok(())
        })
    }

    pub fn id(&self) -> TrackerId {
        self.0.id
    }

    pub fn key_path(&self) -> &KeyPath {
        &self.0.path
    }

    pub fn root(&self) -> &Object {
        &self.0.root
    }

    /// Re-read the key path and invoke the callback.
    ///
    /// Subscriptions call this when a dependency changes; owners may call it
    /// directly to force a refresh. Never records new dependencies.
    pub fn update(&self) -> Result<()> {
        self.0.update()
    }

    /// Number of fields this tracker depends on.
    pub fn dependency_count(&self) -> usize {
        self.0.dependencies.get()
    }

    /// Number of times the callback has run.
    pub fn run_count(&self) -> usize {
        self.0.run_count.get()
    }

    pub(crate) fn inner(&self) -> &Rc<TrackerInner> {
        &self.0
    }
}

impl fmt::Debug for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracker")
            .field("id", &self.0.id)
            .field("path", &self.0.path.as_str())
            .field("dependency_count", &self.dependency_count())
            .field("run_count", &self.run_count())
            .finish()
    }
}
