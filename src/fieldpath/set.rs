//! Set of field paths.

use super::path::Path;
use std::collections::BTreeSet;
use std::fmt;

/// Set is an ordered collection of paths, used to report which parts of a
/// document were touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Set {
    members: BTreeSet<Path>,
}

impl Set {
    /// Creates a new empty set.
    pub fn new() -> Self {
        Set {
            members: BTreeSet::new(),
        }
    }

    /// Returns true if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns the number of paths in the set.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Inserts a path into the set.
    pub fn insert(&mut self, path: &Path) {
        self.members.insert(path.clone());
    }

    /// Returns true if the set contains exactly the given path.
    pub fn has(&self, path: &Path) -> bool {
        self.members.contains(path)
    }

    /// Returns true if the set contains the path or any path beneath it.
    pub fn touches(&self, path: &Path) -> bool {
        self.members
            .range(path.clone()..)
            .next()
            .is_some_and(|p| p.starts_with(path))
    }

    /// Returns the paths beneath `prefix`, with the prefix stripped.
    pub fn under(&self, prefix: &Path) -> Set {
        Set {
            members: self
                .members
                .range(prefix.clone()..)
                .map_while(|p| p.strip_prefix(prefix))
                .collect(),
        }
    }

    /// Returns the union of two sets.
    pub fn union(&self, other: &Set) -> Set {
        Set {
            members: self.members.union(&other.members).cloned().collect(),
        }
    }

    /// Returns the intersection of two sets.
    pub fn intersection(&self, other: &Set) -> Set {
        Set {
            members: self.members.intersection(&other.members).cloned().collect(),
        }
    }

    /// Returns the difference of two sets (self - other).
    pub fn difference(&self, other: &Set) -> Set {
        Set {
            members: self.members.difference(&other.members).cloned().collect(),
        }
    }

    /// Returns an iterator over the paths in order.
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.members.iter()
    }
}

impl FromIterator<Path> for Set {
    fn from_iter<T: IntoIterator<Item = Path>>(iter: T) -> Self {
        Set {
            members: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Set {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, path) in self.members.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(text: &str) -> Path {
        Path::parse(text).unwrap()
    }

    #[test]
    fn test_set_insert_and_has() {
        let mut set = Set::new();
        assert!(set.is_empty());
        set.insert(&p("instructions.notes"));
        set.insert(&p("instructions.notes"));
        assert_eq!(set.len(), 1);
        assert!(set.has(&p("instructions.notes")));
        assert!(!set.has(&p("instructions")));
    }

    #[test]
    fn test_touches() {
        let set: Set = [p("instructions.cooking.Microwave"), p("name")].into_iter().collect();
        assert!(set.touches(&p("instructions")));
        assert!(set.touches(&p("instructions.cooking")));
        assert!(set.touches(&p("name")));
        assert!(!set.touches(&p("instructions.notes")));
        assert!(!set.touches(&p("id")));
    }

    #[test]
    fn test_under() {
        let set: Set = [p("a.x"), p("a.y.z"), p("b")].into_iter().collect();
        let under = set.under(&p("a"));
        assert_eq!(under, [p("x"), p("y.z")].into_iter().collect());
    }

    #[test]
    fn test_set_operations() {
        let s1: Set = [p("a"), p("b")].into_iter().collect();
        let s2: Set = [p("b"), p("c")].into_iter().collect();

        assert_eq!(s1.union(&s2).len(), 3);
        assert_eq!(s1.intersection(&s2), [p("b")].into_iter().collect());
        assert_eq!(s1.difference(&s2), [p("a")].into_iter().collect());
    }

    #[test]
    fn test_set_display() {
        let set: Set = [p("b"), p("a[0]")].into_iter().collect();
        assert_eq!(set.to_string(), ".a[0] .b");
    }
}
