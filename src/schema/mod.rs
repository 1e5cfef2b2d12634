//! Schema module - explicit shape declarations for entities and their documents.
//!
//! Schemas are plain data: build them with constructors such as
//! [`EntityDef::new`] and [`TypeRef::named`], or deserialize them from YAML.
//! The merge engine and the validator look shapes up through [`Schema::resolve`].

mod elements;

pub use elements::*;
