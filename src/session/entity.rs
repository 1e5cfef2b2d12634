//! Managed entity handles.

use crate::error::{Error, Result};
use crate::fieldpath::Path;
use crate::value::{Map, Value};
use std::fmt;

/// EntityKey identifies an entity by name and primary key value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityKey {
    pub entity: String,
    pub id: Value,
}

impl EntityKey {
    pub fn new(entity: impl Into<String>, id: impl Into<Value>) -> Self {
        EntityKey {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.entity, self.id)
    }
}

/// EntityState is where an entity stands relative to storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityState {
    /// Known to the session but not scheduled for insert.
    Transient,
    /// Scheduled for insert at the next flush.
    New,
    /// Loaded from or written to storage.
    Managed,
}

/// Entity is the live value of a tracked entity: a record of property name
/// to property value.
///
/// Mutations made here are picked up at the next flush.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    key: EntityKey,
    state: EntityState,
    doc: Value,
}

impl Entity {
    pub(crate) fn new(key: EntityKey, state: EntityState, doc: Map) -> Self {
        Entity {
            key,
            state,
            doc: Value::Map(doc),
        }
    }

    pub fn key(&self) -> &EntityKey {
        &self.key
    }

    pub fn state(&self) -> EntityState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: EntityState) {
        self.state = state;
    }

    /// The value of property `name`.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.doc.as_map().and_then(|m| m.get(name))
    }

    /// The value at `path`, where the first element names the property.
    pub fn get(&self, path: &Path) -> Option<&Value> {
        path.lookup(&self.doc)
    }

    /// Sets the value at `path`, creating intermediate records as needed.
    ///
    /// `null` stored under a record key clears it: the key is removed, as a
    /// `null` in an assigned patch would.
    pub fn set(&mut self, path: &Path, value: impl Into<Value>) -> Result<()> {
        if path.is_empty() {
            return Err(Error::InvalidPath {
                path: path.to_string(),
                reason: "cannot replace the whole entity".to_string(),
            });
        }
        match value.into() {
            Value::Null if path.last().is_some_and(|e| e.is_field_name()) => {
                path.remove(&mut self.doc);
                Ok(())
            }
            value => path.assign(&mut self.doc, value),
        }
    }

    /// Removes the key at `path` and returns what was there.
    pub fn unset(&mut self, path: &Path) -> Option<Value> {
        path.remove(&mut self.doc)
    }

    /// The live row document.
    pub fn value(&self) -> &Value {
        &self.doc
    }

    pub(crate) fn replace(&mut self, doc: Value) {
        self.doc = doc;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::from_yaml;
    use pretty_assertions::assert_eq;

    fn entity() -> Entity {
        let doc = from_yaml("{id: 1, instructions: {cooking: {Oven: {degrees: 200}}, notes: stir}}").unwrap();
        let Value::Map(doc) = doc else { unreachable!() };
        Entity::new(EntityKey::new("Recipe", 1), EntityState::Managed, doc)
    }

    #[test]
    fn test_key_display() {
        assert_eq!(EntityKey::new("Recipe", 1).to_string(), "Recipe#1");
        assert_eq!(EntityKey::new("Tag", "x").to_string(), "Tag#\"x\"");
    }

    #[test]
    fn test_set_and_unset() {
        let mut e = entity();
        let notes = Path::parse("instructions.notes").unwrap();
        assert_eq!(e.unset(&notes), Some(Value::from("stir")));
        assert_eq!(e.get(&notes), None);

        e.set(&Path::parse("instructions.cooking.Grill.degrees").unwrap(), 300).unwrap();
        assert_eq!(
            e.field("instructions"),
            Some(&from_yaml("{cooking: {Oven: {degrees: 200}, Grill: {degrees: 300}}}").unwrap())
        );
    }

    #[test]
    fn test_set_null_clears() {
        let mut e = entity();
        e.set(&Path::parse("instructions.notes").unwrap(), Value::Null).unwrap();
        assert_eq!(
            e.field("instructions"),
            Some(&from_yaml("{cooking: {Oven: {degrees: 200}}}").unwrap())
        );
        e.set(&Path::parse("instructions.missing").unwrap(), Value::Null).unwrap();
        assert_eq!(e.get(&Path::parse("instructions.missing").unwrap()), None);
    }

    #[test]
    fn test_set_through_scalar_fails() {
        let mut e = entity();
        let err = e.set(&Path::parse("id.x").unwrap(), 1).unwrap_err();
        assert!(matches!(err, Error::InvalidPath { .. }));
        assert!(e.set(&Path::new(), 1).is_err());
    }
}
