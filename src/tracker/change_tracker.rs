//! Pending-change tracking for structured properties.
//!
//! Every tracked entity carries the row document it was last persisted with
//! and the changes recorded since. Flushing folds the changes into the
//! snapshot and hands back the document to write.

use crate::error::{Error, Result};
use crate::fieldpath::{Path, Set};
use crate::merge::{Change, ChangeSet};
use crate::session::EntityKey;
use crate::value::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct Tracked {
    /// Row document (property name to value) as last persisted.
    snapshot: Value,
    /// Changes since the snapshot, paths rooted at the row document.
    pending: ChangeSet,
}

/// Tracks pending changes per entity.
#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    entries: BTreeMap<EntityKey, Tracked>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        ChangeTracker {
            entries: BTreeMap::new(),
        }
    }

    /// Starts tracking `key` from `snapshot`, discarding anything pending.
    ///
    /// New entities register with an empty record.
    #[tracing::instrument(level = "trace", skip(self, snapshot))]
    pub fn register(&mut self, key: EntityKey, snapshot: Value) {
        let snapshot = if snapshot.is_map() {
            snapshot
        } else {
            Value::Map(Map::new())
        };
        self.entries.insert(
            key,
            Tracked {
                snapshot,
                pending: ChangeSet::new(),
            },
        );
    }

    pub fn is_tracked(&self, key: &EntityKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Records `changes` made to `property` of `key`.
    pub fn track(&mut self, key: &EntityKey, property: &str, changes: &ChangeSet) -> Result<()> {
        let prefix = Path::from_fields([property]);
        self.record(key, &changes.prefixed(&prefix))
    }

    /// Records changes whose paths already start at the row document.
    ///
    /// A change replaces every pending change at its path or below it.
    pub fn record(&mut self, key: &EntityKey, changes: &ChangeSet) -> Result<()> {
        let tracked = self.tracked_mut(key)?;
        for change in changes.iter() {
            tracked.pending.retain(|c| !c.path.starts_with(&change.path));
            tracked.pending.push(change.clone());
        }
        tracing::trace!(
            entity = %key,
            recorded = changes.len(),
            pending = tracked.pending.len(),
            "Recorded changes"
        );
        Ok(())
    }

    /// The snapshot with all pending changes applied. Nothing is cleared.
    pub fn projected(&self, key: &EntityKey) -> Result<Value> {
        let tracked = self.tracked(key)?;
        let mut value = tracked.snapshot.clone();
        tracked.pending.apply(&mut value)?;
        Ok(value)
    }

    /// Folds pending changes into the snapshot and returns it.
    ///
    /// With nothing pending the last snapshot comes back unchanged.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn flush_dirty(&mut self, key: &EntityKey) -> Result<Value> {
        let tracked = self.tracked_mut(key)?;
        if tracked.pending.is_empty() {
            tracing::debug!(entity = %key, "Nothing pending");
            return Ok(tracked.snapshot.clone());
        }
        let pending = std::mem::take(&mut tracked.pending);
        pending.apply(&mut tracked.snapshot)?;
        tracing::debug!(entity = %key, applied = pending.len(), "Flushed pending changes");
        Ok(tracked.snapshot.clone())
    }

    pub fn is_dirty(&self, key: &EntityKey) -> bool {
        self.entries
            .get(key)
            .map(|t| !t.pending.is_empty())
            .unwrap_or(false)
    }

    /// Paths with pending changes, rooted at the row document.
    pub fn dirty_paths(&self, key: &EntityKey) -> Result<Set> {
        Ok(self.tracked(key)?.pending.paths())
    }

    pub fn pending(&self, key: &EntityKey) -> Result<&ChangeSet> {
        Ok(&self.tracked(key)?.pending)
    }

    pub fn snapshot(&self, key: &EntityKey) -> Result<&Value> {
        Ok(&self.tracked(key)?.snapshot)
    }

    /// Stops tracking `key`. Returns false if it was not tracked.
    pub fn forget(&mut self, key: &EntityKey) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records a single change.
    pub fn record_one(&mut self, key: &EntityKey, change: Change) -> Result<()> {
        self.record(key, &std::iter::once(change).collect())
    }

    fn tracked(&self, key: &EntityKey) -> Result<&Tracked> {
        self.entries
            .get(key)
            .ok_or_else(|| Error::NotTracked(key.to_string()))
    }

    fn tracked_mut(&mut self, key: &EntityKey) -> Result<&mut Tracked> {
        self.entries
            .get_mut(key)
            .ok_or_else(|| Error::NotTracked(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::{diff, merge, ChangeKind, MergeMode};
    use crate::value::{from_yaml, Patch};
    use pretty_assertions::assert_eq;

    fn key() -> EntityKey {
        EntityKey::new("Recipe", 1)
    }

    fn p(text: &str) -> Path {
        Path::parse(text).unwrap()
    }

    fn loaded() -> ChangeTracker {
        let mut tracker = ChangeTracker::new();
        tracker.register(
            key(),
            from_yaml("{id: 1, instructions: {cooking: {Oven: {degrees: 200}, Microwave: {degrees: 180}}, notes: stir}}")
                .unwrap(),
        );
        tracker
    }

    #[test]
    fn test_flush_without_pending_returns_snapshot() {
        let mut tracker = loaded();
        assert!(!tracker.is_dirty(&key()));
        let before = tracker.snapshot(&key()).unwrap().clone();
        assert_eq!(tracker.flush_dirty(&key()).unwrap(), before);
    }

    #[test]
    fn test_unknown_key_is_not_tracked() {
        let mut tracker = ChangeTracker::new();
        let err = tracker.flush_dirty(&key()).unwrap_err();
        assert!(matches!(err, Error::NotTracked(_)));
        assert!(tracker.projected(&key()).is_err());
    }

    #[test]
    fn test_track_prefixes_property() {
        let mut tracker = loaded();
        let current = from_yaml("{cooking: {Oven: {degrees: 200}, Microwave: {degrees: 180}}, notes: stir}").unwrap();
        let patch = Patch::from_yaml("{cooking: {Oven: {degrees: 200}}, notes: ~}").unwrap();
        let outcome = merge(Some(&current), &patch, MergeMode::FullReplaceDeletesOmitted).unwrap();
        tracker.track(&key(), "instructions", &outcome.changes).unwrap();

        let dirty = tracker.dirty_paths(&key()).unwrap();
        assert!(dirty.has(&p("instructions.cooking.Microwave")));
        assert!(dirty.has(&p("instructions.notes")));
        assert_eq!(dirty.len(), 2);

        let flushed = tracker.flush_dirty(&key()).unwrap();
        assert_eq!(
            flushed,
            from_yaml("{id: 1, instructions: {cooking: {Oven: {degrees: 200}}}}").unwrap()
        );
        assert!(!tracker.is_dirty(&key()));
        assert_eq!(tracker.snapshot(&key()).unwrap(), &flushed);
    }

    #[test]
    fn test_later_change_replaces_nested_pending() {
        let mut tracker = loaded();
        tracker
            .record_one(&key(), Change::modified(p("instructions.cooking.Oven.degrees"), Value::Int(220)))
            .unwrap();
        tracker
            .record_one(&key(), Change::removed(p("instructions.cooking")))
            .unwrap();

        let pending = tracker.pending(&key()).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending.paths_of(ChangeKind::Removed), vec![&p("instructions.cooking")]);
    }

    #[test]
    fn test_projected_does_not_clear() {
        let mut tracker = loaded();
        tracker
            .record_one(&key(), Change::removed(p("instructions.notes")))
            .unwrap();
        let projected = tracker.projected(&key()).unwrap();
        assert_eq!(p("instructions.notes").lookup(&projected), None);
        assert!(tracker.is_dirty(&key()));
    }

    #[test]
    fn test_new_entity_tracks_from_empty_record() {
        let mut tracker = ChangeTracker::new();
        tracker.register(key(), Value::Null);
        let initial = from_yaml("{id: 1, name: Cheesecake}").unwrap();
        let changes = diff(tracker.snapshot(&key()).ok(), Some(&initial));
        tracker.record(&key(), &changes).unwrap();
        assert_eq!(tracker.flush_dirty(&key()).unwrap(), initial);
    }

    #[test]
    fn test_forget() {
        let mut tracker = loaded();
        assert!(tracker.is_tracked(&key()));
        assert!(tracker.forget(&key()));
        assert!(!tracker.is_tracked(&key()));
        assert!(!tracker.forget(&key()));
        assert!(tracker.is_empty());
    }
}
