//! Change sets produced by merges and diffs.

use crate::error::Result;
use crate::fieldpath::{Path, Set};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// ChangeKind says what happened at a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// Change is one leaf-level edit. `value` is the new value for additions and
/// modifications and `None` for removals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub path: Path,
    pub kind: ChangeKind,
    pub value: Option<Value>,
}

impl Change {
    pub fn added(path: Path, value: Value) -> Self {
        Change {
            path,
            kind: ChangeKind::Added,
            value: Some(value),
        }
    }

    pub fn modified(path: Path, value: Value) -> Self {
        Change {
            path,
            kind: ChangeKind::Modified,
            value: Some(value),
        }
    }

    pub fn removed(path: Path) -> Self {
        Change {
            path,
            kind: ChangeKind::Removed,
            value: None,
        }
    }

    /// Replays this change onto `root`.
    pub fn apply(&self, root: &mut Value) -> Result<()> {
        match (&self.kind, &self.value) {
            (ChangeKind::Removed, _) | (_, None) => {
                self.path.remove(root);
                Ok(())
            }
            (_, Some(value)) => self.path.assign(root, value.clone()),
        }
    }

    /// Returns the same change located under `prefix`.
    pub fn prefixed(&self, prefix: &Path) -> Change {
        Change {
            path: self.path.prefixed(prefix),
            kind: self.kind,
            value: self.value.clone(),
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, &self.value) {
            (ChangeKind::Added, Some(v)) => write!(f, "+ {} = {}", self.path, v),
            (ChangeKind::Modified, Some(v)) => write!(f, "~ {} = {}", self.path, v),
            _ => write!(f, "- {}", self.path),
        }
    }
}

/// ChangeSet is the ordered list of changes one operation produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    pub fn new() -> Self {
        ChangeSet {
            changes: Vec::new(),
        }
    }

    pub fn push(&mut self, change: Change) {
        self.changes.push(change);
    }

    pub fn extend(&mut self, other: ChangeSet) {
        self.changes.extend(other.changes);
    }

    /// Keeps only the changes for which `keep` returns true.
    pub fn retain<F: FnMut(&Change) -> bool>(&mut self, keep: F) {
        self.changes.retain(keep);
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.changes.iter()
    }

    /// The set of paths touched, whatever the kind of change.
    pub fn paths(&self) -> Set {
        self.changes.iter().map(|c| c.path.clone()).collect()
    }

    /// Paths of changes of the given kind, in order.
    pub fn paths_of(&self, kind: ChangeKind) -> Vec<&Path> {
        self.changes
            .iter()
            .filter(|c| c.kind == kind)
            .map(|c| &c.path)
            .collect()
    }

    /// Returns the same changes located under `prefix`.
    pub fn prefixed(&self, prefix: &Path) -> ChangeSet {
        self.changes.iter().map(|c| c.prefixed(prefix)).collect()
    }

    /// Replays every change, in order, onto `root`.
    pub fn apply(&self, root: &mut Value) -> Result<()> {
        for change in &self.changes {
            change.apply(root)?;
        }
        Ok(())
    }
}

impl FromIterator<Change> for ChangeSet {
    fn from_iter<T: IntoIterator<Item = Change>>(iter: T) -> Self {
        ChangeSet {
            changes: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ChangeSet {
    type Item = Change;
    type IntoIter = std::vec::IntoIter<Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

impl fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, change) in self.changes.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", change)?;
        }
        Ok(())
    }
}
