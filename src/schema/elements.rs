//! Core schema elements and type definitions.

use crate::error::{Error, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Schema is a list of named types plus the entities built from them.
///
/// Types and entities are indexed in maps before the first search so this
/// type should be considered immutable once constructed.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<TypeDef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<EntityDef>,

    #[serde(skip)]
    type_map: OnceCell<HashMap<String, usize>>,

    #[serde(skip)]
    entity_map: OnceCell<HashMap<String, usize>>,
}

impl Clone for Schema {
    fn clone(&self) -> Self {
        Schema::new(self.types.clone(), self.entities.clone())
    }
}

/// TypeDef represents a named type in a schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeDef {
    /// Every type must have a unique name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(flatten)]
    pub atom: Atom,
}

/// TypeRef either refers to a named type or declares an inlined type.
///
/// A TypeRef that does neither is untyped: any value is accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeRef {
    /// Reference to named type in schema.
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "namedType")]
    pub named_type: Option<String>,

    /// Inline type definition.
    #[serde(flatten)]
    pub inlined: Box<Atom>,

    /// If this reference refers to a map type, this field overrides the
    /// `ElementRelationship` of the referred type when resolved.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        rename = "elementRelationship"
    )]
    pub element_relationship: Option<ElementRelationship>,
}

/// Atom represents the smallest possible pieces of the type system.
/// Each set field in the Atom represents a possible shape for the value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scalar: Option<Scalar>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<List>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<Map>,
}

/// Scalar (AKA "primitive") represents a type which has a single value which is
/// either numeric, string, or boolean, or untyped for any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scalar {
    Numeric,
    String,
    Boolean,
    Untyped,
}

/// ElementRelationship states how a record behaves under assignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementRelationship {
    /// The record is a leaf: any assignment replaces it wholesale.
    Atomic,
    /// The record's keys are merged one by one according to the merge mode.
    #[default]
    Separable,
}

/// Map is a record type.
///
/// Declared `fields` make it a partial record with a fixed key set; an
/// `elementType` admits dynamic keys. Both may be combined.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Map {
    /// Each struct field appears exactly once in this list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<StructField>,

    /// ElementType is the type of keys not listed in `fields`.
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "elementType")]
    pub element_type: Option<Box<TypeRef>>,

    #[serde(
        default,
        skip_serializing_if = "is_default_element_relationship",
        rename = "elementRelationship"
    )]
    pub element_relationship: ElementRelationship,

    #[serde(skip)]
    field_map: OnceCell<HashMap<String, usize>>,
}

fn is_default_element_relationship(er: &ElementRelationship) -> bool {
    *er == ElementRelationship::Separable
}

/// StructField pairs a field name with a field type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructField {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, rename = "type")]
    pub field_type: TypeRef,

    /// Optional fields may be absent; required fields must be present.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
}

/// List represents a type which contains zero or more elements, all of the
/// same subtype. Lists are always replaced wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct List {
    #[serde(default, rename = "elementType")]
    pub element_type: TypeRef,
}

/// EntityDef declares a persisted entity: its primary key and its fields.
///
/// Scalar-typed fields are stored as plain columns, list or map typed fields
/// as encoded documents.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EntityDef {
    pub name: String,

    #[serde(rename = "primaryKey")]
    pub primary_key: String,

    #[serde(default)]
    pub fields: Vec<StructField>,

    #[serde(skip)]
    field_map: OnceCell<HashMap<String, usize>>,
}

impl Clone for EntityDef {
    fn clone(&self) -> Self {
        EntityDef {
            name: self.name.clone(),
            primary_key: self.primary_key.clone(),
            fields: self.fields.clone(),
            field_map: OnceCell::new(),
        }
    }
}

impl Schema {
    /// Creates a schema with the given type and entity definitions.
    pub fn new(types: Vec<TypeDef>, entities: Vec<EntityDef>) -> Self {
        Schema {
            types,
            entities,
            type_map: OnceCell::new(),
            entity_map: OnceCell::new(),
        }
    }

    /// Adds an entity definition.
    pub fn entity_def(mut self, entity: EntityDef) -> Self {
        self.entities.push(entity);
        self.entity_map = OnceCell::new();
        self
    }

    /// Adds a named type definition.
    pub fn type_def(mut self, name: impl Into<String>, atom: Atom) -> Self {
        self.types.push(TypeDef {
            name: name.into(),
            atom,
        });
        self.type_map = OnceCell::new();
        self
    }

    /// Parses a schema from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Schema> {
        let schema: Schema = serde_yaml::from_str(yaml)?;
        Ok(schema)
    }

    /// Returns the referenced TypeDef, if it exists.
    pub fn find_named_type(&self, name: &str) -> Option<&TypeDef> {
        let map = self.type_map.get_or_init(|| {
            self.types
                .iter()
                .enumerate()
                .map(|(i, t)| (t.name.clone(), i))
                .collect()
        });
        map.get(name).map(|&i| &self.types[i])
    }

    /// Returns the entity definition with the given name, if it exists.
    pub fn find_entity(&self, name: &str) -> Option<&EntityDef> {
        let map = self.entity_map.get_or_init(|| {
            self.entities
                .iter()
                .enumerate()
                .map(|(i, e)| (e.name.clone(), i))
                .collect()
        });
        map.get(name).map(|&i| &self.entities[i])
    }

    /// Like [`Schema::find_entity`] but fails with [`Error::UnknownEntity`].
    pub fn entity(&self, name: &str) -> Result<&EntityDef> {
        self.find_entity(name)
            .ok_or_else(|| Error::UnknownEntity(name.to_string()))
    }

    /// Returns the names of all entities.
    pub fn entity_names(&self) -> Vec<&str> {
        self.entities.iter().map(|e| e.name.as_str()).collect()
    }

    /// Resolve returns the atom referenced, whether it is inline or named.
    /// Returns None if a named type can't be found.
    pub fn resolve(&self, tr: &TypeRef) -> Option<Atom> {
        let mut atom = match tr.named_type {
            Some(ref named) => self.find_named_type(named)?.atom.clone(),
            None => (*tr.inlined).clone(),
        };
        if let (Some(er), Some(map)) = (tr.element_relationship, atom.map.as_mut()) {
            map.element_relationship = er;
        }
        Some(atom)
    }

    /// Checks that every named reference resolves and every entity has a
    /// scalar primary key among its fields.
    pub fn check(&self) -> Result<()> {
        let mut seen = HashMap::new();
        for t in &self.types {
            if seen.insert(t.name.as_str(), ()).is_some() {
                return Err(Error::Schema(format!("duplicate type name: {}", t.name)));
            }
            self.check_atom(&t.atom, &t.name)?;
        }

        let mut seen = HashMap::new();
        for e in &self.entities {
            if seen.insert(e.name.as_str(), ()).is_some() {
                return Err(Error::Schema(format!("duplicate entity name: {}", e.name)));
            }
            let pk = e.find_field(&e.primary_key).ok_or_else(|| {
                Error::Schema(format!(
                    "{}: primary key {} is not a field",
                    e.name, e.primary_key
                ))
            })?;
            if pk.optional {
                return Err(Error::Schema(format!(
                    "{}: primary key {} cannot be optional",
                    e.name, e.primary_key
                )));
            }
            for f in &e.fields {
                self.check_type_ref(&f.field_type, &format!("{}.{}", e.name, f.name))?;
            }
            if self.is_document(&pk.field_type) {
                return Err(Error::Schema(format!(
                    "{}: primary key {} must be scalar",
                    e.name, e.primary_key
                )));
            }
        }
        Ok(())
    }

    /// Returns true if values of this type are stored as encoded documents
    /// rather than plain columns.
    pub fn is_document(&self, tr: &TypeRef) -> bool {
        match self.resolve(tr) {
            Some(atom) => !atom.is_scalar() || atom.is_list() || atom.is_map(),
            None => true,
        }
    }

    fn check_type_ref(&self, tr: &TypeRef, context: &str) -> Result<()> {
        if let Some(ref named) = tr.named_type {
            if self.find_named_type(named).is_none() {
                return Err(Error::Schema(format!(
                    "{}: no type found matching: {}",
                    context, named
                )));
            }
            return Ok(());
        }
        self.check_atom(&tr.inlined, context)
    }

    fn check_atom(&self, atom: &Atom, context: &str) -> Result<()> {
        if let Some(ref list) = atom.list {
            self.check_type_ref(&list.element_type, &format!("{}[]", context))?;
        }
        if let Some(ref map) = atom.map {
            for f in &map.fields {
                self.check_type_ref(&f.field_type, &format!("{}.{}", context, f.name))?;
            }
            if let Some(ref et) = map.element_type {
                self.check_type_ref(et, &format!("{}.*", context))?;
            }
        }
        Ok(())
    }
}

impl TypeRef {
    /// References a named type.
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef {
            named_type: Some(name.into()),
            ..Default::default()
        }
    }

    /// Declares an inline scalar type.
    pub fn scalar(scalar: Scalar) -> Self {
        TypeRef::inline(Atom {
            scalar: Some(scalar),
            ..Default::default()
        })
    }

    /// Declares an inline list type.
    pub fn list(element_type: TypeRef) -> Self {
        TypeRef::inline(Atom {
            list: Some(List { element_type }),
            ..Default::default()
        })
    }

    /// Declares an inline map type.
    pub fn map(map: Map) -> Self {
        TypeRef::inline(Atom {
            map: Some(map),
            ..Default::default()
        })
    }

    /// Declares an inline type from an atom.
    pub fn inline(atom: Atom) -> Self {
        TypeRef {
            inlined: Box::new(atom),
            ..Default::default()
        }
    }

    /// Accepts any value.
    pub fn untyped() -> Self {
        TypeRef::default()
    }

    /// Overrides the element relationship of the referenced map.
    pub fn atomic(mut self) -> Self {
        self.element_relationship = Some(ElementRelationship::Atomic);
        self
    }
}

impl PartialEq for Map {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
            && self.element_type == other.element_type
            && self.element_relationship == other.element_relationship
    }
}

impl Map {
    /// Creates a new Map with the given fields.
    pub fn with_fields(fields: Vec<StructField>) -> Self {
        Map {
            fields,
            ..Default::default()
        }
    }

    /// Creates a new Map with the given element type.
    pub fn with_element_type(element_type: TypeRef) -> Self {
        Map {
            element_type: Some(Box::new(element_type)),
            ..Default::default()
        }
    }

    /// Returns the field declaration for `name`, if declared.
    pub fn find_field(&self, name: &str) -> Option<&StructField> {
        let map = self.field_map.get_or_init(|| {
            self.fields
                .iter()
                .enumerate()
                .map(|(i, f)| (f.name.clone(), i))
                .collect()
        });
        map.get(name).map(|&i| &self.fields[i])
    }

    /// Returns the type of the value stored under `key`: the declared field's
    /// type, or the element type for dynamic keys.
    pub fn type_of(&self, key: &str) -> Option<&TypeRef> {
        self.find_field(key)
            .map(|f| &f.field_type)
            .or(self.element_type.as_deref())
    }
}

impl StructField {
    /// Creates a required field.
    pub fn new(name: impl Into<String>, field_type: TypeRef) -> Self {
        StructField {
            name: name.into(),
            field_type,
            optional: false,
        }
    }

    /// Creates an optional field.
    pub fn optional(name: impl Into<String>, field_type: TypeRef) -> Self {
        StructField {
            name: name.into(),
            field_type,
            optional: true,
        }
    }
}

impl EntityDef {
    /// Creates an entity definition with no fields yet.
    pub fn new(name: impl Into<String>, primary_key: impl Into<String>) -> Self {
        EntityDef {
            name: name.into(),
            primary_key: primary_key.into(),
            fields: Vec::new(),
            field_map: OnceCell::new(),
        }
    }

    /// Adds a required field.
    pub fn field(mut self, name: impl Into<String>, field_type: TypeRef) -> Self {
        self.fields.push(StructField::new(name, field_type));
        self.field_map = OnceCell::new();
        self
    }

    /// Returns the field declaration for `name`, if declared.
    pub fn find_field(&self, name: &str) -> Option<&StructField> {
        let map = self.field_map.get_or_init(|| {
            self.fields
                .iter()
                .enumerate()
                .map(|(i, f)| (f.name.clone(), i))
                .collect()
        });
        map.get(name).map(|&i| &self.fields[i])
    }

    /// Like [`EntityDef::find_field`] but fails with [`Error::UnknownField`].
    pub fn field_def(&self, name: &str) -> Result<&StructField> {
        self.find_field(name).ok_or_else(|| Error::UnknownField {
            entity: self.name.clone(),
            field: name.to_string(),
        })
    }

    /// The whole entity as a record type, for validating rows.
    pub fn as_type(&self) -> TypeRef {
        TypeRef::map(Map::with_fields(self.fields.clone()))
    }
}

impl Atom {
    /// Returns true if this atom represents a scalar type.
    pub fn is_scalar(&self) -> bool {
        self.scalar.is_some()
    }

    /// Returns true if this atom represents a list type.
    pub fn is_list(&self) -> bool {
        self.list.is_some()
    }

    /// Returns true if this atom represents a map type.
    pub fn is_map(&self) -> bool {
        self.map.is_some()
    }

    /// Returns true if nothing is declared, i.e. any value is accepted.
    pub fn is_untyped(&self) -> bool {
        !self.is_scalar() && !self.is_list() && !self.is_map()
    }
}
