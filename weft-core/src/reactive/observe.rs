//! Reactive Conversion
//!
//! Conversion walks a plain object graph depth-first and replaces every
//! field with an observed field: a value plus the [`Subscription`] that
//! records who read it. Nested objects are converted before the field that
//! holds them, so the whole graph present at conversion time is observed.
//!
//! # Limitations
//!
//! - Arrays are stored as observed references only; their elements are never
//!   visited and mutating an array does not notify.
//! - Fields added to an object after conversion stay plain.
//! - An object assigned into an observed field is not converted. Call
//!   [`convert`] on it explicitly if its fields should be observed.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use tracing::{debug, trace};

use super::context::TrackingScope;
use super::subscription::Subscription;
use crate::data::{Object, Value};
use crate::error::{Error, Result};

/// An observed field: the current value and the one subscription owned by it.
pub(crate) struct Field {
    key: Rc<str>,
    value: RefCell<Value>,
    dep: Subscription,
}

impl Field {
    pub(crate) fn new(key: &str, value: Value) -> Self {
        Self {
            key: Rc::from(key),
            value: RefCell::new(value),
            dep: Subscription::new(),
        }
    }

    /// Read the value, recording the active tracker if there is one.
    pub(crate) fn get(&self) -> Value {
        if TrackingScope::is_active() {
            TrackingScope::record_read(&self.dep);
        }
        self.value.borrow().clone()
    }

    pub(crate) fn get_untracked(&self) -> Value {
        self.value.borrow().clone()
    }

    /// Store `value` and notify dependents, unless it is strictly equal to
    /// the current value.
    pub(crate) fn set(&self, value: Value) -> Result<()> {
        if self.value.borrow().strict_eq(&value) {
            trace!(field = %self.key, "write skipped, value unchanged");
            return Ok(());
        }

        // The borrow ends here: trackers read this field again while notified.
        *self.value.borrow_mut() = value;
        debug!(field = %self.key, subscribers = self.dep.len(), "field changed");
        self.dep.notify()
    }

    pub(crate) fn subscription(&self) -> &Subscription {
        &self.dep
    }
}

/// Make a value reactive in place.
///
/// Objects are converted with [`convert_object`]; every other value,
/// arrays included, is left untouched.
pub fn convert(value: &Value) {
    if let Value::Object(object) = value {
        convert_object(object);
    }
}

/// Make every field of `object` observed, recursively.
///
/// Fields that are already observed keep their subscription, so converting
/// twice is harmless. Reference cycles between objects are followed once.
pub fn convert_object(object: &Object) {
    let mut visited = HashSet::new();
    object.observe_fields(&mut visited);
    debug!(root = %object.id(), objects = visited.len(), "converted object graph");
}

/// Build an object graph from JSON and convert it.
///
/// Fails with [`Error::NotAnObject`] unless the JSON root is an object.
pub fn observe(json: serde_json::Value) -> Result<Object> {
    match Value::from_json(json) {
        Value::Object(object) => {
            convert_object(&object);
            Ok(object)
        }
        _ => Err(Error::NotAnObject),
    }
}
