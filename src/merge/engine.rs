//! The merge engine: applies a [`Patch`] to a current value.

use super::changes::{Change, ChangeSet};
use super::diff::diff_into;
use crate::error::{Error, Result};
use crate::fieldpath::Path;
use crate::schema::{Atom, ElementRelationship, Schema, TypeRef};
use crate::typed::expected;
use crate::value::{Patch, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// MergeMode decides what happens to keys a record instruction omits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MergeMode {
    /// Omitted keys are left untouched.
    #[serde(rename = "shallow-preserve-omitted")]
    ShallowPreserveOmitted,
    /// Omitted keys are deleted, recursively at every record level.
    #[default]
    #[serde(rename = "full-replace-deletes-omitted")]
    FullReplaceDeletesOmitted,
}

impl MergeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeMode::ShallowPreserveOmitted => "shallow-preserve-omitted",
            MergeMode::FullReplaceDeletesOmitted => "full-replace-deletes-omitted",
        }
    }

    fn deletes_omitted(&self) -> bool {
        matches!(self, MergeMode::FullReplaceDeletesOmitted)
    }
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "shallow-preserve-omitted" | "preserve" => Ok(MergeMode::ShallowPreserveOmitted),
            "full-replace-deletes-omitted" | "replace" => Ok(MergeMode::FullReplaceDeletesOmitted),
            other => Err(format!("unknown merge mode: {}", other)),
        }
    }
}

/// MergeOutcome is the result of one merge. `next` is `None` when the
/// instruction cleared the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub next: Option<Value>,
    pub changes: ChangeSet,
}

/// Merger applies patches in a given mode, optionally guided by a schema.
///
/// Without a schema, an instruction may not change the kind (scalar, list or
/// record) of a non-null value. With a schema, the declared type decides which
/// kinds are accepted, and records declared atomic are replaced wholesale.
#[derive(Debug, Clone)]
pub struct Merger<'a> {
    mode: MergeMode,
    schema: Option<&'a Schema>,
    root: TypeRef,
}

impl<'a> Merger<'a> {
    pub fn new(mode: MergeMode) -> Self {
        Merger {
            mode,
            schema: None,
            root: TypeRef::untyped(),
        }
    }

    /// Guides the merge by `root` resolved in `schema`.
    pub fn with_schema(mut self, schema: &'a Schema, root: &TypeRef) -> Self {
        self.schema = Some(schema);
        self.root = root.clone();
        self
    }

    pub fn mode(&self) -> MergeMode {
        self.mode
    }

    /// Merges `patch` into `current`, where `None` means the target is absent.
    ///
    /// Applying the same patch to the returned value again yields no changes.
    pub fn merge(&self, current: Option<&Value>, patch: &Patch) -> Result<MergeOutcome> {
        let mut changes = ChangeSet::new();
        let root = self.root.clone();
        let next = self.merge_at(current, patch, Some(&root), &Path::new(), &mut changes)?;
        tracing::trace!(mode = %self.mode, changes = changes.len(), "merged instruction");
        Ok(MergeOutcome { next, changes })
    }

    fn merge_at(
        &self,
        current: Option<&Value>,
        patch: &Patch,
        tr: Option<&TypeRef>,
        path: &Path,
        changes: &mut ChangeSet,
    ) -> Result<Option<Value>> {
        let atom = self.atom(tr);
        match patch {
            Patch::Clear => {
                if current.is_some() {
                    changes.push(Change::removed(path.clone()));
                }
                Ok(None)
            }
            Patch::Value(value) => {
                self.check_shape(current, value, atom.as_ref(), path)?;
                diff_into(current, Some(value), path, changes);
                Ok(Some(value.clone()))
            }
            Patch::Map(entries) => {
                self.check_record(current, atom.as_ref(), path)?;
                let shape = atom.as_ref().and_then(|a| a.map.as_ref());
                let atomic = shape
                    .map(|m| m.element_relationship == ElementRelationship::Atomic)
                    .unwrap_or(false);

                match current {
                    Some(Value::Map(existing)) if !atomic => {
                        let mut next = existing.clone();
                        if self.mode.deletes_omitted() {
                            for key in existing.keys().filter(|k| !entries.contains_key(*k)) {
                                tracing::trace!(path = %path.with_field(key.clone()), "dropping omitted key");
                                next.delete(key);
                                changes.push(Change::removed(path.with_field(key.clone())));
                            }
                        }
                        for (key, child) in entries {
                            let child_type = shape.and_then(|m| m.type_of(key));
                            let child_path = path.with_field(key.clone());
                            match self.merge_at(existing.get(key), child, child_type, &child_path, changes)? {
                                Some(v) => next.set(key.clone(), v),
                                None => {
                                    next.delete(key);
                                }
                            }
                        }
                        Ok(Some(Value::Map(next)))
                    }
                    _ => {
                        // Absent, null or atomic: build the record from scratch,
                        // then report it against whatever was there.
                        let mut scratch = ChangeSet::new();
                        let mut next = crate::value::Map::new();
                        for (key, child) in entries {
                            let child_type = shape.and_then(|m| m.type_of(key));
                            let child_path = path.with_field(key.clone());
                            if let Some(v) = self.merge_at(None, child, child_type, &child_path, &mut scratch)? {
                                next.set(key.clone(), v);
                            }
                        }
                        let next = Value::Map(next);
                        diff_into(current, Some(&next), path, changes);
                        Ok(Some(next))
                    }
                }
            }
        }
    }

    fn atom(&self, tr: Option<&TypeRef>) -> Option<Atom> {
        let schema = self.schema?;
        schema.resolve(tr?).filter(|a| !a.is_untyped())
    }

    fn check_shape(&self, current: Option<&Value>, value: &Value, atom: Option<&Atom>, path: &Path) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        if let Some(atom) = atom {
            let allowed = match value {
                Value::List(_) => atom.is_list(),
                Value::Map(_) => atom.is_map(),
                _ => atom.is_scalar(),
            };
            if !allowed {
                return Err(Error::shape_mismatch(path, expected(atom), value.kind_name()));
            }
            return Ok(());
        }
        match current {
            Some(existing) if !existing.is_null() && category(existing) != category(value) => {
                Err(Error::shape_mismatch(path, category(existing), category(value)))
            }
            _ => Ok(()),
        }
    }

    fn check_record(&self, current: Option<&Value>, atom: Option<&Atom>, path: &Path) -> Result<()> {
        if let Some(atom) = atom {
            if !atom.is_map() {
                return Err(Error::shape_mismatch(path, expected(atom), "map"));
            }
            return Ok(());
        }
        match current {
            Some(existing) if !existing.is_null() && !existing.is_map() => {
                Err(Error::shape_mismatch(path, category(existing), "map"))
            }
            _ => Ok(()),
        }
    }
}

fn category(value: &Value) -> &'static str {
    match value {
        Value::List(_) => "list",
        Value::Map(_) => "map",
        _ => "scalar",
    }
}

/// Merges `patch` into `current` without a schema.
pub fn merge(current: Option<&Value>, patch: &Patch, mode: MergeMode) -> Result<MergeOutcome> {
    Merger::new(mode).merge(current, patch)
}
