//! Key Paths
//!
//! A key path names a value nested inside a root object, for example
//! `user.address.city`. Resolution walks the segments one field at a time.

use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use super::{Object, Value};
use crate::error::{Error, Result};

/// How fields are read while resolving a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Ordinary reads; an active tracker is recorded on every field touched.
    Tracked,
    /// Reads that never record a dependency.
    Untracked,
}

/// A parsed, immutable dotted key path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPath {
    raw: Rc<str>,
    segments: SmallVec<[Rc<str>; 4]>,
}

impl KeyPath {
    /// Parse a dotted key path.
    ///
    /// The path must be non-empty and may not contain empty segments.
    pub fn parse(path: &str) -> Result<Self> {
        if path.is_empty() {
            return Err(Error::InvalidKeyPath {
                path: path.to_owned(),
                reason: "key path is empty",
            });
        }

        let segments: SmallVec<[Rc<str>; 4]> = path.split('.').map(Rc::from).collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(Error::InvalidKeyPath {
                path: path.to_owned(),
                reason: "key path contains an empty segment",
            });
        }

        Ok(Self {
            raw: Rc::from(path),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(|segment| &**segment)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false: a parsed path has at least one segment.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Resolve the path against `root`.
    ///
    /// Each segment is read from the value produced by the previous one.
    /// Reading a segment from a scalar or an array yields [`Value::Null`], as
    /// does a missing field. Reading any segment from a null value fails
    /// with [`Error::PathResolution`] naming that segment's index.
    pub fn resolve(&self, root: &Object, access: Access) -> Result<Value> {
        let mut current = Value::Object(root.clone());

        for (index, segment) in self.segments.iter().enumerate() {
            current = match &current {
                Value::Object(object) => match access {
                    Access::Tracked => object.get(segment),
                    Access::Untracked => object.get_untracked(segment),
                }
                .unwrap_or(Value::Null),
                value if value.is_absent() => return Err(self.failure(root, index)),
                // Scalars and arrays have no named fields.
                _ => Value::Null,
            };
        }

        Ok(current)
    }

    fn failure(&self, root: &Object, index: usize) -> Error {
        Error::PathResolution {
            root: root.id(),
            path: self.raw.to_string(),
            index,
            segment: self.segments[index].to_string(),
        }
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
