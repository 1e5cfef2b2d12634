//! Merge module - Applies partial instructions to stored values.
//!
//! [`Merger`] walks a [`Patch`](crate::value::Patch) against the current value
//! and reports what it did as a [`ChangeSet`]. [`diff`] computes the same kind
//! of change set between two plain values.

mod changes;
mod diff;
mod engine;


pub use changes::*;
pub use diff::*;
pub use engine::*;
