//! Path element and path types.

use crate::error::{Error, Result};
use crate::value::{Map, Value};

/// PathElement represents one level of path navigation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathElement {
    /// Field name for record fields.
    FieldName(String),
    /// Position in a list.
    Index(usize),
}

impl PathElement {
    /// Creates a new field name path element.
    pub fn field_name(name: impl Into<String>) -> Self {
        PathElement::FieldName(name.into())
    }

    /// Creates a new index path element.
    pub fn index(i: usize) -> Self {
        PathElement::Index(i)
    }

    /// Returns true if this is a field name element.
    pub fn is_field_name(&self) -> bool {
        matches!(self, PathElement::FieldName(_))
    }
}

/// Path represents a complete path to a nested field. The empty path is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    elements: Vec<PathElement>,
}

impl Path {
    /// Creates a new empty path.
    pub fn new() -> Self {
        Path {
            elements: Vec::new(),
        }
    }

    /// Creates a path from a vector of elements.
    pub fn from_elements(elements: Vec<PathElement>) -> Self {
        Path { elements }
    }

    /// Creates a path made only of field names.
    pub fn from_fields<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names.into_iter().map(PathElement::field_name).collect()
    }

    /// Parses the textual form produced by `Display`, e.g. `.instructions.ingredients[2]`.
    /// The leading dot is optional.
    pub fn parse(text: &str) -> Result<Path> {
        let invalid = |reason: &str| Error::InvalidPath {
            path: text.to_string(),
            reason: reason.to_string(),
        };

        let mut path = Path::new();
        let mut rest = text.strip_prefix('.').unwrap_or(text);
        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix('[') {
                let end = after.find(']').ok_or_else(|| invalid("unterminated index"))?;
                let index = after[..end]
                    .parse::<usize>()
                    .map_err(|_| invalid("index is not a number"))?;
                path.push(PathElement::Index(index));
                rest = &after[end + 1..];
                rest = rest.strip_prefix('.').unwrap_or(rest);
                continue;
            }
            let end = rest.find(['.', '[']).unwrap_or(rest.len());
            if end == 0 {
                return Err(invalid("empty field name"));
            }
            path.push(PathElement::field_name(&rest[..end]));
            rest = &rest[end..];
            rest = rest.strip_prefix('.').unwrap_or(rest);
        }
        Ok(path)
    }

    /// Returns the number of elements in the path.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns true if the path is empty.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Returns an iterator over the path elements.
    pub fn iter(&self) -> impl Iterator<Item = &PathElement> {
        self.elements.iter()
    }

    /// Appends a path element.
    pub fn push(&mut self, element: PathElement) {
        self.elements.push(element);
    }

    /// Removes and returns the last path element.
    pub fn pop(&mut self) -> Option<PathElement> {
        self.elements.pop()
    }

    pub fn first(&self) -> Option<&PathElement> {
        self.elements.first()
    }

    /// Returns the last path element.
    pub fn last(&self) -> Option<&PathElement> {
        self.elements.last()
    }

    /// Creates a new path with the given element appended.
    pub fn with(&self, element: PathElement) -> Self {
        let mut new_path = self.clone();
        new_path.push(element);
        new_path
    }

    /// Creates a new path with the given field name appended.
    pub fn with_field(&self, name: impl Into<String>) -> Self {
        self.with(PathElement::field_name(name))
    }

    /// Returns `prefix` followed by this path.
    pub fn prefixed(&self, prefix: &Path) -> Self {
        prefix.elements.iter().chain(self.elements.iter()).cloned().collect()
    }

    /// Returns true if `prefix` is this path or one of its ancestors.
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.elements.starts_with(&prefix.elements)
    }

    /// Returns the remainder after `prefix`, if this path starts with it.
    pub fn strip_prefix(&self, prefix: &Path) -> Option<Path> {
        self.elements
            .strip_prefix(prefix.elements.as_slice())
            .map(|rest| Path::from_elements(rest.to_vec()))
    }

    /// Returns a slice of the path elements.
    pub fn as_slice(&self) -> &[PathElement] {
        &self.elements
    }

    /// Finds the value this path points at inside `root`.
    pub fn lookup<'v>(&self, root: &'v Value) -> Option<&'v Value> {
        let mut current = root;
        for element in &self.elements {
            current = match (element, current) {
                (PathElement::FieldName(name), Value::Map(m)) => m.get(name)?,
                (PathElement::Index(i), Value::List(items)) => items.get(*i)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Stores `value` at this path inside `root`, creating intermediate records.
    ///
    /// A `null` or missing record along the way is replaced by an empty record.
    /// An index may address an existing item or the position just past the end.
    pub fn assign(&self, root: &mut Value, value: Value) -> Result<()> {
        let Some((last, parents)) = self.elements.split_last() else {
            *root = value;
            return Ok(());
        };

        let mut current = root;
        for (depth, element) in parents.iter().enumerate() {
            current = match element {
                PathElement::FieldName(name) => {
                    let map = self.as_record(current, depth)?;
                    map.fields
                        .entry(name.clone())
                        .or_insert_with(|| Value::Map(Map::new()))
                }
                PathElement::Index(i) => self.list_item(current, *i, depth)?,
            };
        }

        match last {
            PathElement::FieldName(name) => {
                let map = self.as_record(current, parents.len())?;
                map.set(name.clone(), value);
            }
            PathElement::Index(i) => match current {
                Value::List(items) if *i < items.len() => items[*i] = value,
                Value::List(items) if *i == items.len() => items.push(value),
                Value::List(_) => return Err(self.invalid(parents.len(), "index out of range")),
                other => {
                    return Err(self.invalid(
                        parents.len(),
                        &format!("expected list, found {}", other.kind_name()),
                    ))
                }
            },
        }
        Ok(())
    }

    /// Removes the value at this path from `root`, returning it.
    ///
    /// The root itself cannot be removed; removing through a missing
    /// or non-container parent is a no-op.
    pub fn remove(&self, root: &mut Value) -> Option<Value> {
        let (last, parents) = self.elements.split_last()?;
        let mut current = root;
        for element in parents {
            current = match (element, current) {
                (PathElement::FieldName(name), Value::Map(m)) => m.get_mut(name)?,
                (PathElement::Index(i), Value::List(items)) => items.get_mut(*i)?,
                _ => return None,
            };
        }
        match (last, current) {
            (PathElement::FieldName(name), Value::Map(m)) => m.delete(name),
            (PathElement::Index(i), Value::List(items)) if *i < items.len() => {
                Some(items.remove(*i))
            }
            _ => None,
        }
    }

    fn as_record<'v>(&self, value: &'v mut Value, depth: usize) -> Result<&'v mut Map> {
        if value.is_null() {
            *value = Value::Map(Map::new());
        }
        match value {
            Value::Map(m) => Ok(m),
            other => Err(self.invalid(
                depth,
                &format!("expected map, found {}", other.kind_name()),
            )),
        }
    }

    fn list_item<'v>(&self, value: &'v mut Value, i: usize, depth: usize) -> Result<&'v mut Value> {
        match value {
            Value::List(items) => items
                .get_mut(i)
                .ok_or_else(|| self.invalid(depth, "index out of range")),
            other => Err(self.invalid(
                depth,
                &format!("expected list, found {}", other.kind_name()),
            )),
        }
    }

    fn invalid(&self, depth: usize, reason: &str) -> Error {
        let at = Path::from_elements(self.elements[..=depth.min(self.len().saturating_sub(1))].to_vec());
        Error::InvalidPath {
            path: at.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl FromIterator<PathElement> for Path {
    fn from_iter<T: IntoIterator<Item = PathElement>>(iter: T) -> Self {
        Path {
            elements: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Path {
    type Item = PathElement;
    type IntoIter = std::vec::IntoIter<PathElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a PathElement;
    type IntoIter = std::slice::Iter<'a, PathElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl std::fmt::Display for PathElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathElement::FieldName(name) => write!(f, ".{}", name),
            PathElement::Index(i) => write!(f, "[{}]", i),
        }
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.elements.is_empty() {
            return write!(f, ".");
        }
        for element in &self.elements {
            write!(f, "{}", element)?;
        }
        Ok(())
    }
}
