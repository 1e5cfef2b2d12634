//! Store module - The storage collaborator that rows are written to.
//!
//! Rows are keyed by table name and primary key. Scalar properties are stored
//! as plain columns; structured properties as opaque encoded documents.

mod memory;

pub use memory::*;

use crate::error::Result;
use crate::value::Value;
use std::collections::BTreeMap;

/// Column is one stored cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Column {
    Scalar(Value),
    Document(Vec<u8>),
}

/// Row maps column names to cells. A column missing from the row is null.
pub type Row = BTreeMap<String, Column>;

/// Storage interface.
///
/// Writes are visible to every later read once they return.
pub trait Storage: Send + Sync + std::fmt::Debug {
    /// Inserts a new row. Fails with `DuplicateEntity` if the key exists.
    fn insert(&self, table: &str, id: &Value, row: Row) -> Result<()>;

    /// Replaces an existing row. Fails with `NotFound` if the key is missing.
    fn update(&self, table: &str, id: &Value, row: Row) -> Result<()>;

    fn get(&self, table: &str, id: &Value) -> Result<Option<Row>>;

    /// Returns false if there was nothing to delete.
    fn delete(&self, table: &str, id: &Value) -> Result<bool>;

    /// Drops every row of every table.
    fn clear(&self) -> Result<()>;
}
