//! Leaf-level difference between two values.

use super::changes::{Change, ChangeSet};
use crate::fieldpath::Path;
use crate::value::Value;

/// Computes the changes that turn `old` into `new`.
///
/// Records are compared key by key. Scalars and lists are leaves: a list that
/// differs in any way is reported as modified as a whole. An added record is
/// reported through its leaves; an empty record is a leaf of its own.
pub fn diff(old: Option<&Value>, new: Option<&Value>) -> ChangeSet {
    let mut changes = ChangeSet::new();
    diff_into(old, new, &Path::new(), &mut changes);
    changes
}

/// Like [`diff`], appending to `changes` with paths rooted at `path`.
pub fn diff_into(old: Option<&Value>, new: Option<&Value>, path: &Path, changes: &mut ChangeSet) {
    match (old, new) {
        (None, None) => {}
        (None, Some(new)) => added_leaves(new, path, changes),
        (Some(_), None) => changes.push(Change::removed(path.clone())),
        (Some(old), Some(new)) if old == new => {}
        (Some(Value::Map(old)), Some(Value::Map(new))) => {
            for (key, old_value) in old.iter() {
                if !new.has(key) {
                    diff_into(Some(old_value), None, &path.with_field(key.clone()), changes);
                }
            }
            for (key, new_value) in new.iter() {
                diff_into(old.get(key), Some(new_value), &path.with_field(key.clone()), changes);
            }
        }
        (Some(_), Some(new)) => changes.push(Change::modified(path.clone(), new.clone())),
    }
}

fn added_leaves(value: &Value, path: &Path, changes: &mut ChangeSet) {
    match value {
        Value::Map(m) if !m.is_empty() => {
            for (key, v) in m.iter() {
                added_leaves(v, &path.with_field(key.clone()), changes);
            }
        }
        leaf => changes.push(Change::added(path.clone(), leaf.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::ChangeKind;
    use crate::value::{from_yaml, Map};
    use pretty_assertions::assert_eq;

    fn p(text: &str) -> Path {
        Path::parse(text).unwrap()
    }

    #[test]
    fn test_equal_values_have_no_changes() {
        let v = from_yaml("{a: {b: [1, 2]}}").unwrap();
        assert!(diff(Some(&v), Some(&v)).is_empty());
        assert!(diff(None, None).is_empty());
    }

    #[test]
    fn test_removed_key_is_reported_once() {
        let old = from_yaml("{Oven: {degrees: 200, time: 12}, Microwave: {degrees: 180, time: 15}}").unwrap();
        let new = from_yaml("{Oven: {degrees: 200, time: 12}}").unwrap();
        let changes = diff(Some(&old), Some(&new));
        assert_eq!(changes.len(), 1);
        assert_eq!(changes.paths_of(ChangeKind::Removed), vec![&p("Microwave")]);
    }

    #[test]
    fn test_added_record_reports_leaves() {
        let new = from_yaml("{step: {degrees: 180, time: 15}, extra: {}}").unwrap();
        let changes = diff(Some(&Value::Map(Map::new())), Some(&new));
        assert_eq!(
            changes.paths_of(ChangeKind::Added),
            vec![&p("extra"), &p("step.degrees"), &p("step.time")]
        );
    }

    #[test]
    fn test_lists_are_leaves() {
        let old = from_yaml("{items: [{units: 1}, {units: 2}]}").unwrap();
        let new = from_yaml("{items: [{units: 1}, {units: 3}]}").unwrap();
        let changes = diff(Some(&old), Some(&new));
        assert_eq!(
            changes,
            vec![Change::modified(p("items"), from_yaml("[{units: 1}, {units: 3}]").unwrap())]
                .into_iter()
                .collect()
        );
    }

    #[test]
    fn test_kind_change_is_a_modification() {
        let old = from_yaml("{notes: text}").unwrap();
        let new = from_yaml("{notes: {lang: en}}").unwrap();
        let changes = diff(Some(&old), Some(&new));
        assert_eq!(changes.paths_of(ChangeKind::Modified), vec![&p("notes")]);
    }

    #[test]
    fn test_replaying_diff_reproduces_target() {
        let old = from_yaml("{a: 1, b: {c: 2, d: [1]}, e: x}").unwrap();
        let new = from_yaml("{a: 2, b: {d: [1, 2], f: {}}, g: {h: true}}").unwrap();
        let mut replay = old.clone();
        diff(Some(&old), Some(&new)).apply(&mut replay).unwrap();
        assert_eq!(replay, new);
    }
}
