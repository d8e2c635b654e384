//! Reactive Core
//!
//! This module implements implicit dependency tracking: fields observe their
//! readers, and writes re-run exactly the computations that read them.
//!
//! # Concepts
//!
//! ## Conversion
//!
//! [`convert`] turns the fields of a plain object graph into observed fields
//! in place. Each observed field owns one [`Subscription`].
//!
//! ## Trackers
//!
//! A [`Tracker`] binds a key path on a root object to a callback. Building
//! one resolves the path while the tracker is the active entry of the
//! [`TrackingScope`] stack, so every observed field on the path records it.
//! The callback then receives the initial value.
//!
//! ## Notification
//!
//! Writing a different value to an observed field updates every tracker in
//! its subscription, synchronously and in recording order, before the write
//! returns. A single write can therefore run an unbounded amount of work.
//!
//! # Implementation Notes
//!
//! Discovery happens once, at construction. Later updates re-read the path
//! without tracking, so the dependency set of a tracker never changes.
//! Everything is single-threaded: handles are `Rc`-based and the tracking
//! stack is thread-local.

mod context;
mod observe;
mod subscription;
mod tracker;

pub use context::TrackingScope;
pub use observe::{convert, convert_object, observe};
pub use subscription::Subscription;
pub use tracker::{Tracker, TrackerId};

pub(crate) use observe::Field;
