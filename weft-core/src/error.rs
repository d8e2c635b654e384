//! Error types for the Weft core.
//!
//! Everything fallible in the crate reports through [`Error`]. Failures that
//! happen while a write fans out to several trackers are collected into
//! [`NotifyFailures`] so one broken binding cannot hide the others.

use std::fmt;

use thiserror::Error;

use crate::data::ObjectId;
use crate::reactive::TrackerId;

/// Error type returned by tracker callbacks.
pub type CallbackError = Box<dyn std::error::Error + 'static>;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the reactive core.
#[derive(Debug, Error)]
pub enum Error {
    /// A dotted key path could not be parsed.
    #[error("invalid key path {path:?}: {reason}")]
    InvalidKeyPath {
        path: String,
        reason: &'static str,
    },

    /// A key path reached a missing or null value before all of its
    /// segments were consumed.
    #[error("cannot resolve {path:?} on object {root}: segment {index} ({segment:?}) was read from an absent value")]
    PathResolution {
        root: ObjectId,
        path: String,
        index: usize,
        segment: String,
    },

    /// A tracker's callback reported a failure.
    #[error("callback of tracker {tracker} ({path}) failed: {source}")]
    Callback {
        tracker: TrackerId,
        path: String,
        #[source]
        source: CallbackError,
    },

    /// A tracker was asked to update while its own callback was still running.
    #[error("tracker {tracker} ({path}) was updated from inside its own callback")]
    ReentrantUpdate { tracker: TrackerId, path: String },

    /// One or more trackers failed while a field change was being delivered.
    #[error(transparent)]
    Notify(NotifyFailures),

    /// An operation that needs an object was handed some other value.
    #[error("expected an object")]
    NotAnObject,
}

/// Per-tracker failures collected during a single notification pass.
///
/// Failures are kept in the order the trackers were notified.
#[derive(Debug, Default)]
pub struct NotifyFailures {
    failures: Vec<Error>,
}

impl NotifyFailures {
    pub(crate) fn push(&mut self, error: Error) {
        self.failures.push(error);
    }

    /// Number of trackers that failed.
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Whether no tracker failed.
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Iterate over the individual failures.
    pub fn iter(&self) -> impl Iterator<Item = &Error> {
        self.failures.iter()
    }

    /// Take ownership of the individual failures.
    pub fn into_vec(self) -> Vec<Error> {
        self.failures
    }

    /// `Ok(())` when nothing failed, otherwise [`Error::Notify`].
    pub(crate) fn into_result(self) -> Result<()> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(Error::Notify(self))
        }
    }
}

impl fmt::Display for NotifyFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} tracker(s) failed during notification", self.failures.len())?;
        if let Some(first) = self.failures.first() {
            write!(f, "; first: {first}")?;
        }
        Ok(())
    }
}

impl std::error::Error for NotifyFailures {}
