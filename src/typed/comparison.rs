//! Comparison result types.

use crate::fieldpath::Set;
use crate::merge::{ChangeKind, ChangeSet};
use std::fmt;

/// Comparison groups the paths of a change set by kind.
///
/// No path appears in more than one of the three sets.
/// If all of them are empty, the compared values were equal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comparison {
    /// Paths present before but not after.
    pub removed: Set,
    /// Paths present on both sides with different values.
    pub modified: Set,
    /// Paths present after but not before.
    pub added: Set,
}

impl Comparison {
    /// Creates a new empty Comparison.
    pub fn new() -> Self {
        Comparison::default()
    }

    /// Groups the paths of `changes`. When a path changes more than once,
    /// only its latest kind is kept.
    pub fn from_changes(changes: &ChangeSet) -> Self {
        let mut comparison = Comparison::new();
        for change in changes.iter() {
            comparison.removed = comparison.removed.difference(&single(&change.path));
            comparison.modified = comparison.modified.difference(&single(&change.path));
            comparison.added = comparison.added.difference(&single(&change.path));
            match change.kind {
                ChangeKind::Added => comparison.added.insert(&change.path),
                ChangeKind::Modified => comparison.modified.insert(&change.path),
                ChangeKind::Removed => comparison.removed.insert(&change.path),
            }
        }
        comparison
    }

    /// Returns true if there are no changes.
    pub fn is_same(&self) -> bool {
        self.removed.is_empty() && self.modified.is_empty() && self.added.is_empty()
    }

    /// Every path mentioned, whatever its kind.
    pub fn touched(&self) -> Set {
        self.removed.union(&self.modified).union(&self.added)
    }

    /// Excludes the given paths from the comparison result.
    pub fn exclude_fields(&mut self, fields: &Set) {
        self.removed = self.removed.difference(fields);
        self.modified = self.modified.difference(fields);
        self.added = self.added.difference(fields);
    }

    pub fn has_removed(&self) -> bool {
        !self.removed.is_empty()
    }

    pub fn has_modified(&self) -> bool {
        !self.modified.is_empty()
    }

    pub fn has_added(&self) -> bool {
        !self.added.is_empty()
    }
}

fn single(path: &crate::fieldpath::Path) -> Set {
    std::iter::once(path.clone()).collect()
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sections = [
            ("Modified Fields", &self.modified),
            ("Added Fields", &self.added),
            ("Removed Fields", &self.removed),
        ];
        let mut first = true;
        for (title, set) in sections {
            if set.is_empty() {
                continue;
            }
            if !first {
                writeln!(f)?;
            }
            first = false;
            write!(f, "- {}:", title)?;
            for path in set.iter() {
                write!(f, "\n  {}", path)?;
            }
        }
        Ok(())
    }
}
