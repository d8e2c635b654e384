//! Data Model
//!
//! Plain data as the binding layer hands it to the core: dynamically typed
//! [`Value`]s, [`Object`]s made of named fields, and dotted [`KeyPath`]s that
//! address a value nested inside an object.
//!
//! Objects start out plain. The reactive layer converts their fields in place
//! (see [`crate::reactive::convert`]); after that, ordinary `get`/`set` calls
//! carry the tracking side effects without any change for the caller.

mod object;
mod path;
mod value;

pub use object::{Object, ObjectId};
pub use path::{Access, KeyPath};
pub use value::{Array, Value};
