//! Weft Core
//!
//! This crate provides the dependency-tracking core of the Weft data binding
//! layer. It implements:
//!
//! - Conversion of plain data objects into objects with observed fields
//! - Automatic dependency discovery from field reads
//! - Synchronous re-evaluation of exactly the dependent computations on write
//!
//! Template parsing and DOM wiring live outside this crate; they hand the core
//! a data object and the dotted key paths their bindings display.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `data`: Values, objects and key paths
//! - `reactive`: Conversion, subscriptions, trackers and the tracking context
//! - `error`: The crate-wide error type
//!
//! # Example
//!
//! ```rust,ignore
//! use weft_core::reactive::{observe, Tracker};
//! use serde_json::json;
//!
//! let data = observe(json!({ "count": 1 }))?;
//!
//! // Runs once right away, printing "count: 1"
//! let _binding = Tracker::infallible(&data, "count", |value| {
//!     println!("count: {value}");
//! })?;
//!
//! data.set("count", 1)?; // unchanged, nothing runs
//! data.set("count", 2)?; // prints "count: 2"
//! ```

pub mod data;
pub mod error;
pub mod reactive;

pub use data::{Array, KeyPath, Object, Value};
pub use error::{CallbackError, Error, NotifyFailures, Result};
pub use reactive::{convert, convert_object, observe, Tracker};
