//! Merge instructions.

use super::value::{Map, Value};
use std::collections::BTreeMap;

/// Patch is a partial value supplied to update a tracked value.
///
/// A key missing from a [`Patch::Map`] was not mentioned by the caller. A key
/// mapped to [`Patch::Clear`] was explicitly cleared and must be removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch {
    /// The absence sentinel: delete whatever is at this path.
    Clear,
    /// Replace the value at this path wholesale.
    Value(Value),
    /// Record instruction, applied key by key.
    Map(BTreeMap<String, Patch>),
}

impl Patch {
    /// Builds a patch that replaces the target wholesale, even when `value` is a record.
    pub fn replace(value: Value) -> Self {
        Patch::Value(value)
    }

    /// Builds an empty record instruction.
    pub fn map() -> Self {
        Patch::Map(BTreeMap::new())
    }

    /// Adds an entry to a record instruction. Has no effect on other variants.
    pub fn with(mut self, key: impl Into<String>, patch: impl Into<Patch>) -> Self {
        if let Patch::Map(entries) = &mut self {
            entries.insert(key.into(), patch.into());
        }
        self
    }

    /// Adds a cleared entry to a record instruction.
    pub fn clear(self, key: impl Into<String>) -> Self {
        self.with(key, Patch::Clear)
    }

    pub fn is_clear(&self) -> bool {
        matches!(self, Patch::Clear)
    }

    /// Short name of the instruction's shape.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Patch::Clear => "clear",
            Patch::Value(v) => v.kind_name(),
            Patch::Map(_) => "map",
        }
    }

    /// Materializes the value this patch would produce over an absent target.
    ///
    /// Returns `None` for [`Patch::Clear`]; cleared entries inside records are dropped.
    pub fn to_value(&self) -> Option<Value> {
        match self {
            Patch::Clear => None,
            Patch::Value(v) => Some(v.clone()),
            Patch::Map(entries) => Some(Value::Map(
                entries
                    .iter()
                    .filter_map(|(k, p)| p.to_value().map(|v| (k.clone(), v)))
                    .collect::<Map>(),
            )),
        }
    }

    /// Parses an instruction from JSON; `null` is the absence sentinel.
    pub fn from_json(json: &str) -> Result<Patch, serde_json::Error> {
        let value: Value = serde_json::from_str(json)?;
        Ok(Patch::from(value))
    }

    /// Parses an instruction from YAML; `null` / `~` is the absence sentinel.
    pub fn from_yaml(yaml: &str) -> Result<Patch, serde_yaml::Error> {
        let value: Value = serde_yaml::from_str(yaml)?;
        Ok(Patch::from(value))
    }
}

/// Records become record instructions and `Null` becomes [`Patch::Clear`].
/// List items are taken verbatim since lists are replaced wholesale.
impl From<Value> for Patch {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Patch::Clear,
            Value::Map(m) => Patch::Map(m.into_iter().map(|(k, v)| (k, Patch::from(v))).collect()),
            other => Patch::Value(other),
        }
    }
}

impl From<&str> for Patch {
    fn from(s: &str) -> Self {
        Patch::Value(Value::from(s))
    }
}

impl From<i64> for Patch {
    fn from(i: i64) -> Self {
        Patch::Value(Value::Int(i))
    }
}

impl From<i32> for Patch {
    fn from(i: i32) -> Self {
        Patch::Value(Value::Int(i64::from(i)))
    }
}

impl From<bool> for Patch {
    fn from(b: bool) -> Self {
        Patch::Value(Value::Bool(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::from_yaml;

    #[test]
    fn test_null_becomes_clear() {
        let patch = Patch::from_yaml("{notes: ~, name: Pizza}").unwrap();
        let Patch::Map(entries) = patch else {
            panic!("expected record instruction");
        };
        assert!(entries.get("notes").is_some_and(Patch::is_clear));
        assert_eq!(entries.get("name"), Some(&Patch::from("Pizza")));
    }

    #[test]
    fn test_list_items_are_verbatim() {
        let patch = Patch::from_json(r#"[{"a": null}]"#).unwrap();
        assert_eq!(
            patch,
            Patch::Value(from_yaml("[{a: ~}]").unwrap())
        );
    }

    #[test]
    fn test_to_value_drops_cleared_entries() {
        let patch = Patch::map()
            .with("Oven", Patch::map().with("degrees", 200).with("time", 12))
            .clear("Microwave");
        assert_eq!(
            patch.to_value(),
            Some(from_yaml("{Oven: {degrees: 200, time: 12}}").unwrap())
        );
        assert_eq!(Patch::Clear.to_value(), None);
    }

    #[test]
    fn test_replace_keeps_record_whole() {
        let v = from_yaml("{a: 1}").unwrap();
        assert_eq!(Patch::replace(v.clone()), Patch::Value(v));
    }
}
