//! Objects
//!
//! An [`Object`] is a shared handle to an ordered set of named fields. A
//! freshly built object is *plain*: reads and writes have no side effects.
//! [`convert`](crate::reactive::convert) turns its fields into observed
//! fields in place, after which every read may record a dependency and every
//! changing write notifies the trackers that depend on the field.
//!
//! Fields added after conversion stay plain, and objects assigned into an
//! observed field are not converted automatically.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use tracing::warn;

use super::Value;
use crate::error::Result;
use crate::reactive::Field;

/// Unique identifier for an object, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(u64);

impl ObjectId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Storage behind a single field name.
#[derive(Clone)]
enum Slot {
    Plain(Value),
    Observed(Rc<Field>),
}

struct ObjectInner {
    id: ObjectId,
    slots: RefCell<IndexMap<String, Slot>>,
}

/// Shared handle to a data object.
///
/// Cloning the handle does not copy the fields; all clones see the same data.
#[derive(Clone)]
pub struct Object(Rc<ObjectInner>);

impl Object {
    /// Create an empty, plain object.
    pub fn new() -> Self {
        Self(Rc::new(ObjectInner {
            id: ObjectId::new(),
            slots: RefCell::new(IndexMap::new()),
        }))
    }

    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    /// Builder form of [`Object::set`], for assembling plain data before
    /// conversion.
    ///
    /// Writing an observed field through the builder is a bug: its
    /// notification failures would be lost. Debug builds panic on it; release
    /// builds log the failures and discard them. Use `set` on observed data.
    pub fn with(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        debug_assert!(
            !self.is_observed(&key),
            "Object::with called on observed field {key:?}; use Object::set"
        );
        if let Err(error) = self.set(&key, value) {
            warn!(object = %self.0.id, field = %key, %error, "notification failed while building object");
        }
        self
    }

    /// Read a field.
    ///
    /// Reading an observed field while a tracker is discovering its
    /// dependencies records that tracker on the field. Returns `None` when
    /// the object has no such field.
    pub fn get(&self, key: &str) -> Option<Value> {
        match self.slot(key)? {
            Slot::Plain(value) => Some(value),
            Slot::Observed(field) => Some(field.get()),
        }
    }

    /// Read a field without recording a dependency.
    pub fn get_untracked(&self, key: &str) -> Option<Value> {
        match self.slot(key)? {
            Slot::Plain(value) => Some(value),
            Slot::Observed(field) => Some(field.get_untracked()),
        }
    }

    /// Write a field.
    ///
    /// Writing a missing field creates it as a plain field. Writing an
    /// observed field runs its setter: a strictly equal value is ignored,
    /// anything else is stored and every dependent tracker is updated before
    /// this call returns. Tracker failures do not stop the fan-out; they are
    /// all returned together as [`Error::Notify`](crate::Error::Notify).
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let field = {
            let mut slots = self.0.slots.borrow_mut();
            match slots.get_mut(key) {
                Some(Slot::Observed(field)) => Rc::clone(field),
                Some(Slot::Plain(current)) => {
                    *current = value;
                    return Ok(());
                }
                None => {
                    slots.insert(key.to_owned(), Slot::Plain(value));
                    return Ok(());
                }
            }
        };
        field.set(value)
    }

    /// Whether `key` names an observed field.
    pub fn is_observed(&self, key: &str) -> bool {
        matches!(self.slot(key), Some(Slot::Observed(_)))
    }

    /// Number of live trackers recorded on an observed field.
    ///
    /// `None` when the field is missing or plain.
    pub fn subscriber_count(&self, key: &str) -> Option<usize> {
        match self.slot(key)? {
            Slot::Observed(field) => Some(field.subscription().len()),
            Slot::Plain(_) => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.slots.borrow().contains_key(key)
    }

    /// Field names in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.0.slots.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.slots.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.slots.borrow().is_empty()
    }

    /// Whether both handles refer to the same object.
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Snapshot of every field, read without tracking.
    pub(crate) fn entries_untracked(&self) -> Vec<(String, Value)> {
        self.0
            .slots
            .borrow()
            .iter()
            .map(|(key, slot)| {
                let value = match slot {
                    Slot::Plain(value) => value.clone(),
                    Slot::Observed(field) => field.get_untracked(),
                };
                (key.clone(), value)
            })
            .collect()
    }

    /// Turn every field into an observed field, nested objects first.
    ///
    /// `visited` breaks reference cycles between objects.
    pub(crate) fn observe_fields(&self, visited: &mut HashSet<ObjectId>) {
        if !visited.insert(self.0.id) {
            return;
        }

        for key in self.keys() {
            let nested = match self.slot(&key) {
                Some(Slot::Plain(Value::Object(object))) => Some(object),
                Some(Slot::Observed(field)) => field.get_untracked().as_object().cloned(),
                _ => None,
            };
            if let Some(object) = nested {
                object.observe_fields(visited);
            }

            let mut slots = self.0.slots.borrow_mut();
            if let Some(slot) = slots.get_mut(&key) {
                if let Slot::Plain(value) = slot {
                    let value = std::mem::replace(value, Value::Null);
                    *slot = Slot::Observed(Rc::new(Field::new(&key, value)));
                }
            }
        }
    }

    /// Clone the slot out so no borrow is held while a field runs.
    fn slot(&self, key: &str) -> Option<Slot> {
        self.0.slots.borrow().get(key).cloned()
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> FromIterator<(K, V)> for Object
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let object = Object::new();
        {
            let mut slots = object.0.slots.borrow_mut();
            for (key, value) in iter {
                slots.insert(key.into(), Slot::Plain(value.into()));
            }
        }
        object
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("id", &self.0.id)
            .field("keys", &self.keys())
            .finish()
    }
}
