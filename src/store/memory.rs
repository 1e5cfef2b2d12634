//! In-memory storage.

use super::{Row, Storage};
use crate::error::{Error, Result};
use crate::value::Value;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

type Tables = BTreeMap<String, BTreeMap<Value, Row>>;

/// MemoryStorage keeps rows in process memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage::default()
    }

    /// Number of rows in `table`.
    pub fn count(&self, table: &str) -> Result<usize> {
        Ok(self.read()?.get(table).map(|t| t.len()).unwrap_or(0))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|e| Error::Storage(format!("lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|e| Error::Storage(format!("lock poisoned: {}", e)))
    }
}

impl Storage for MemoryStorage {
    fn insert(&self, table: &str, id: &Value, row: Row) -> Result<()> {
        let mut tables = self.write()?;
        let rows = tables.entry(table.to_string()).or_default();
        if rows.contains_key(id) {
            return Err(Error::DuplicateEntity {
                entity: table.to_string(),
                id: id.to_string(),
            });
        }
        rows.insert(id.clone(), row);
        tracing::trace!(table, %id, "Inserted row");
        Ok(())
    }

    fn update(&self, table: &str, id: &Value, row: Row) -> Result<()> {
        let mut tables = self.write()?;
        let slot = tables
            .get_mut(table)
            .and_then(|rows| rows.get_mut(id))
            .ok_or_else(|| Error::not_found(table, id))?;
        *slot = row;
        tracing::trace!(table, %id, "Updated row");
        Ok(())
    }

    fn get(&self, table: &str, id: &Value) -> Result<Option<Row>> {
        Ok(self.read()?.get(table).and_then(|rows| rows.get(id)).cloned())
    }

    fn delete(&self, table: &str, id: &Value) -> Result<bool> {
        let mut tables = self.write()?;
        Ok(tables
            .get_mut(table)
            .map(|rows| rows.remove(id).is_some())
            .unwrap_or(false))
    }

    fn clear(&self) -> Result<()> {
        self.write()?.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Column;
    use pretty_assertions::assert_eq;

    fn row(name: &str) -> Row {
        let mut row = Row::new();
        row.insert("name".to_string(), Column::Scalar(Value::from(name)));
        row.insert("instructions".to_string(), Column::Document(b"{}".to_vec()));
        row
    }

    #[test]
    fn test_insert_get_update() {
        let storage = MemoryStorage::new();
        let id = Value::Int(1);
        storage.insert("Recipe", &id, row("Cheesecake")).unwrap();
        assert_eq!(storage.get("Recipe", &id).unwrap(), Some(row("Cheesecake")));

        storage.update("Recipe", &id, row("Flan")).unwrap();
        assert_eq!(storage.get("Recipe", &id).unwrap(), Some(row("Flan")));
        assert_eq!(storage.count("Recipe").unwrap(), 1);
    }

    #[test]
    fn test_duplicate_insert() {
        let storage = MemoryStorage::new();
        storage.insert("Recipe", &Value::Int(1), row("a")).unwrap();
        let err = storage.insert("Recipe", &Value::Int(1), row("b")).unwrap_err();
        assert!(matches!(err, Error::DuplicateEntity { .. }));
    }

    #[test]
    fn test_update_missing_row() {
        let storage = MemoryStorage::new();
        let err = storage.update("Recipe", &Value::Int(9), row("a")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_delete_and_clear() {
        let storage = MemoryStorage::new();
        storage.insert("Recipe", &Value::Int(1), row("a")).unwrap();
        storage.insert("Recipe", &Value::Int(2), row("b")).unwrap();
        assert!(storage.delete("Recipe", &Value::Int(1)).unwrap());
        assert!(!storage.delete("Recipe", &Value::Int(1)).unwrap());
        storage.clear().unwrap();
        assert_eq!(storage.get("Recipe", &Value::Int(2)).unwrap(), None);
    }
}
