//! Validation of values against declared shapes.

use crate::fieldpath::{Path, PathElement};
use crate::schema::{Atom, Scalar, Schema, TypeRef};
use crate::value::Value;
use std::fmt;
use thiserror::Error;

/// ValidationError represents a single way a value violates its declared type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{path}: type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("{path}: unknown field: {field}")]
    UnknownField { path: String, field: String },

    #[error("{path}: missing required field: {field}")]
    MissingField { path: String, field: String },

    #[error("{message}")]
    SchemaError { message: String },
}

impl ValidationError {
    /// Creates a type mismatch error.
    pub fn type_mismatch(path: impl Into<String>, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        ValidationError::TypeMismatch {
            path: path.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates an unknown field error.
    pub fn unknown_field(path: impl Into<String>, field: impl Into<String>) -> Self {
        ValidationError::UnknownField {
            path: path.into(),
            field: field.into(),
        }
    }

    /// Creates a missing field error.
    pub fn missing_field(path: impl Into<String>, field: impl Into<String>) -> Self {
        ValidationError::MissingField {
            path: path.into(),
            field: field.into(),
        }
    }

    /// Creates a schema error.
    pub fn schema_error(message: impl Into<String>) -> Self {
        ValidationError::SchemaError {
            message: message.into(),
        }
    }
}

/// ValidationErrors is a collection of validation errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    /// Creates a new empty ValidationErrors.
    pub fn new() -> Self {
        ValidationErrors { errors: Vec::new() }
    }

    /// Creates ValidationErrors from a single error.
    pub fn from_error(error: ValidationError) -> Self {
        ValidationErrors {
            errors: vec![error],
        }
    }

    /// Adds an error.
    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Extends with another ValidationErrors.
    pub fn extend(&mut self, other: ValidationErrors) {
        self.errors.extend(other.errors);
    }

    /// Returns true if there are no errors.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns an iterator over the errors.
    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter()
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Validates `value` against the type `tr` resolved in `schema`.
///
/// `null` is accepted wherever a value is; whether a key may be absent is
/// governed by the `optional` flag of the enclosing record's field.
pub fn validate(value: &Value, tr: &TypeRef, schema: &Schema) -> Result<(), ValidationErrors> {
    validate_at(value, tr, schema, &Path::new())
}

/// Like [`validate`], reporting errors relative to `base`.
pub fn validate_at(
    value: &Value,
    tr: &TypeRef,
    schema: &Schema,
    base: &Path,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    validate_value(value, tr, schema, base.clone(), &mut errors);
    errors.into_result()
}

fn validate_value(value: &Value, tr: &TypeRef, schema: &Schema, path: Path, errors: &mut ValidationErrors) {
    let Some(atom) = schema.resolve(tr) else {
        if let Some(ref name) = tr.named_type {
            errors.add(ValidationError::schema_error(format!(
                "no type found matching: {}",
                name
            )));
        }
        return;
    };

    if atom.is_untyped() || value.is_null() {
        return;
    }

    match value {
        Value::List(items) => {
            let Some(ref list) = atom.list else {
                errors.add(ValidationError::type_mismatch(path.to_string(), expected(&atom), "list"));
                return;
            };
            for (i, item) in items.iter().enumerate() {
                validate_value(item, &list.element_type, schema, path.with(PathElement::index(i)), errors);
            }
        }
        Value::Map(fields) => {
            let Some(ref map) = atom.map else {
                errors.add(ValidationError::type_mismatch(path.to_string(), expected(&atom), "map"));
                return;
            };
            let open = map.fields.is_empty() && map.element_type.is_none();
            for (key, val) in fields.iter() {
                match map.type_of(key) {
                    Some(field_type) => {
                        validate_value(val, field_type, schema, path.with_field(key.clone()), errors)
                    }
                    None if open => {}
                    None => errors.add(ValidationError::unknown_field(path.to_string(), key.clone())),
                }
            }
            for field in map.fields.iter().filter(|f| !f.optional) {
                if !fields.has(&field.name) {
                    errors.add(ValidationError::missing_field(path.to_string(), field.name.clone()));
                }
            }
        }
        scalar => {
            let valid = match atom.scalar {
                Some(Scalar::Numeric) => scalar.is_int() || scalar.is_float(),
                Some(Scalar::String) => scalar.is_string(),
                Some(Scalar::Boolean) => scalar.is_bool(),
                Some(Scalar::Untyped) => true,
                None => false,
            };
            if !valid {
                errors.add(ValidationError::type_mismatch(
                    path.to_string(),
                    expected(&atom),
                    scalar.kind_name(),
                ));
            }
        }
    }
}

/// Describes the shapes an atom accepts, e.g. `"string or map"`.
pub fn expected(atom: &Atom) -> String {
    let mut kinds = Vec::new();
    match atom.scalar {
        Some(Scalar::Numeric) => kinds.push("numeric"),
        Some(Scalar::String) => kinds.push("string"),
        Some(Scalar::Boolean) => kinds.push("boolean"),
        Some(Scalar::Untyped) => kinds.push("scalar"),
        None => {}
    }
    if atom.is_list() {
        kinds.push("list");
    }
    if atom.is_map() {
        kinds.push("map");
    }
    if kinds.is_empty() {
        return "any".to_string();
    }
    kinds.join(" or ")
}
