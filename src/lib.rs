//! # Entity Assign
//!
//! Change tracking and partial merge for entities with structured properties.
//!
//! An `assign` merges a partial update into a tracked entity. Inside a
//! structured property a key the update omits is handled by the merge mode, a
//! key set to `null` is deleted, and any other value replaces or recurses.
//! Changed leaf paths are tracked until flush, when each structured property
//! is stored as one encoded document and reloads deep-equal.
//!
//! ## Modules
//!
//! - [`value`] - Structured values and merge instructions
//! - [`fieldpath`] - Paths into nested documents and sets of them
//! - [`schema`] - Entity and type declarations
//! - [`typed`] - Validation against declared shapes and comparison views
//! - [`merge`] - The merge engine and leaf-level diff
//! - [`tracker`] - Pending changes per entity between flushes
//! - [`codec`] - Encoding of stored documents
//! - [`store`] - The storage collaborator
//! - [`session`] - Context, sessions and entity handles
//! - [`config`] / [`logging`] - Configuration and log setup

pub mod codec;
pub mod config;
pub mod error;
pub mod fieldpath;
pub mod logging;
pub mod merge;
pub mod schema;
pub mod session;
pub mod store;
pub mod tracker;
pub mod typed;
pub mod value;

pub use config::Config;
pub use error::{Error, Result};
pub use fieldpath::{Path, PathElement, Set as FieldPathSet};
pub use merge::{diff, merge, Change, ChangeKind, ChangeSet, MergeMode, MergeOutcome, Merger};
pub use schema::Schema;
pub use session::{AssignOptions, Context, Entity, EntityKey, Session};
pub use typed::Comparison;
pub use value::{Patch, Value};
