//! Sessions: identity map, assign and flush.

use super::context::Context;
use super::entity::{Entity, EntityKey, EntityState};
use crate::codec::{self, DocumentFormat};
use crate::error::{Error, Result};
use crate::fieldpath::Path;
use crate::merge::{diff, ChangeSet, MergeMode, Merger};
use crate::schema::{EntityDef, Schema};
use crate::store::{Column, Row};
use crate::tracker::ChangeTracker;
use crate::typed::{validate, ValidationError, ValidationErrors};
use crate::value::{Map, Patch, Value};
use std::collections::BTreeMap;

/// Per-call overrides for [`Session::assign_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssignOptions {
    /// Overrides the configured merge mode.
    pub merge_mode: Option<MergeMode>,
}

impl AssignOptions {
    pub fn merge_mode(mode: MergeMode) -> Self {
        AssignOptions {
            merge_mode: Some(mode),
        }
    }
}

/// Session is a unit of work over a [`Context`].
///
/// Each session has its own identity map: an entity is loaded at most once
/// and every lookup of the same key returns the same live value.
#[derive(Debug)]
pub struct Session {
    ctx: Context,
    identity: BTreeMap<EntityKey, Entity>,
    tracker: ChangeTracker,
}

/// What one flush will write for one entity.
struct Planned {
    key: EntityKey,
    direct: ChangeSet,
    /// The tracker's projection with `direct` applied; what gets stored.
    persisted: Value,
    row: Row,
    insert: bool,
}

impl Session {
    pub(crate) fn new(ctx: Context) -> Self {
        Session {
            ctx,
            identity: BTreeMap::new(),
            tracker: ChangeTracker::new(),
        }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// A fresh session over the same context, sharing no cached state.
    pub fn fork(&self) -> Session {
        self.ctx.session()
    }

    /// Creates a tracked entity from `initial`, a record of property values.
    ///
    /// The entity is scheduled for insert unless `persist_on_create` is off.
    #[tracing::instrument(level = "debug", skip(self, initial))]
    pub fn create(&mut self, entity: &str, initial: Value) -> Result<EntityKey> {
        let ctx = self.ctx.clone();
        let schema = ctx.schema();
        let def = schema.entity(entity)?;

        let doc = match initial {
            Value::Map(doc) => doc,
            other => return Err(Error::shape_mismatch(Path::new(), "map", other.kind_name())),
        };
        for property in doc.keys() {
            def.field_def(property)?;
        }
        let value = Value::Map(doc.clone());
        validate(&value, &def.as_type(), schema)?;

        let key = EntityKey::new(def.name.clone(), primary_key(def, &value)?);
        if self.identity.contains_key(&key) {
            return Err(Error::DuplicateEntity {
                entity: key.entity,
                id: key.id.to_string(),
            });
        }

        let state = if ctx.config().persist_on_create {
            EntityState::New
        } else {
            EntityState::Transient
        };
        let empty = Value::Map(Map::new());
        self.tracker.register(key.clone(), empty.clone());
        self.tracker.record(&key, &diff(Some(&empty), Some(&value)))?;
        self.identity
            .insert(key.clone(), Entity::new(key.clone(), state, doc));
        tracing::debug!(entity = %key, ?state, "Created entity");
        Ok(key)
    }

    /// Schedules a transient entity for insert.
    pub fn persist(&mut self, key: &EntityKey) -> Result<()> {
        let entity = self.entity_mut(key)?;
        if entity.state() == EntityState::Transient {
            entity.set_state(EntityState::New);
        }
        Ok(())
    }

    pub fn persist_and_flush(&mut self, key: &EntityKey) -> Result<usize> {
        self.persist(key)?;
        self.flush()
    }

    /// Writes every new or changed entity and returns how many rows were written.
    ///
    /// Direct mutations of live values are picked up here. Every entity is
    /// checked before anything is written, so a validation failure leaves
    /// storage untouched. Pending changes are folded only once their row is
    /// written; an entity whose write fails stays dirty for the next flush.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn flush(&mut self) -> Result<usize> {
        let ctx = self.ctx.clone();
        let schema = ctx.schema();
        let format = ctx.config().document_format;

        let mut plan = Vec::new();
        for (key, entity) in &self.identity {
            if entity.state() == EntityState::Transient {
                continue;
            }
            let def = schema.entity(&key.entity)?;
            let mut persisted = self.tracker.projected(key)?;
            let direct = if &persisted == entity.value() {
                ChangeSet::new()
            } else {
                diff(Some(&persisted), Some(entity.value()))
            };

            let pk = Path::from_fields([def.primary_key.as_str()]);
            if direct.iter().any(|c| c.path.starts_with(&pk)) {
                return Err(Error::PrimaryKeyChange {
                    entity: def.name.clone(),
                });
            }

            let insert = entity.state() == EntityState::New;
            if !insert && direct.is_empty() && !self.tracker.is_dirty(key) {
                continue;
            }
            if !direct.is_empty() {
                tracing::debug!(entity = %key, changes = direct.len(), "Detected direct mutations");
                direct.apply(&mut persisted)?;
            }
            validate(&persisted, &def.as_type(), schema)?;
            plan.push(Planned {
                key: key.clone(),
                row: to_row(schema, def, &persisted, format)?,
                direct,
                persisted,
                insert,
            });
        }

        let storage = ctx.storage();
        let mut written = 0;
        for planned in plan {
            let key = &planned.key;
            let stored = if planned.insert {
                storage.insert(&key.entity, &key.id, planned.row)
            } else {
                storage.update(&key.entity, &key.id, planned.row)
            };
            if let Err(err) = stored {
                tracing::debug!(entity = %key, written, error = %err, "Write failed, changes stay pending");
                return Err(err);
            }

            self.tracker.record(key, &planned.direct)?;
            let folded = self.tracker.flush_dirty(key)?;
            debug_assert_eq!(folded, planned.persisted);
            if let Some(entity) = self.identity.get_mut(key) {
                entity.set_state(EntityState::Managed);
            }
            written += 1;
        }
        tracing::debug!(written, "Flushed session");
        Ok(written)
    }

    /// Looks `id` up in the identity map, then in storage.
    #[tracing::instrument(level = "debug", skip(self, id))]
    pub fn find_one(&mut self, entity: &str, id: impl Into<Value>) -> Result<Option<EntityKey>> {
        let ctx = self.ctx.clone();
        let def = ctx.schema().entity(entity)?;
        let key = EntityKey::new(def.name.clone(), id);
        if self.identity.contains_key(&key) {
            return Ok(Some(key));
        }

        let Some(row) = ctx.storage().get(&def.name, &key.id)? else {
            tracing::debug!(entity = %key, "Not found");
            return Ok(None);
        };
        let doc = from_row(row, ctx.config().document_format)?;
        self.tracker.register(key.clone(), Value::Map(doc.clone()));
        self.identity
            .insert(key.clone(), Entity::new(key.clone(), EntityState::Managed, doc));
        tracing::debug!(entity = %key, "Loaded entity");
        Ok(Some(key))
    }

    /// Like [`Session::find_one`] but a missing entity is an [`Error::NotFound`].
    pub fn find_one_or_fail(&mut self, entity: &str, id: impl Into<Value>) -> Result<EntityKey> {
        let id = id.into();
        self.find_one(entity, id.clone())?
            .ok_or_else(|| Error::not_found(entity, &id))
    }

    /// Merges `patch` into the entity using the configured merge mode.
    pub fn assign(&mut self, key: &EntityKey, patch: &Patch) -> Result<ChangeSet> {
        self.assign_with(key, patch, AssignOptions::default())
    }

    /// Merges `patch`, a record of property instructions, into the entity.
    ///
    /// Properties the patch omits are always kept; the merge mode applies
    /// inside structured properties. Nothing changes if the result does not
    /// validate. Returns the changes, rooted at the row document.
    #[tracing::instrument(level = "debug", skip(self, patch, options))]
    pub fn assign_with(&mut self, key: &EntityKey, patch: &Patch, options: AssignOptions) -> Result<ChangeSet> {
        let ctx = self.ctx.clone();
        let schema = ctx.schema();
        let def = schema.entity(&key.entity)?;
        let entity = self
            .identity
            .get(key)
            .ok_or_else(|| Error::NotTracked(key.to_string()))?;
        let Patch::Map(entries) = patch else {
            return Err(Error::shape_mismatch(Path::new(), "map", patch.kind_name()));
        };
        let mode = options.merge_mode.unwrap_or(ctx.config().merge_mode);

        let mut next = entity.value().clone();
        let mut touched = Vec::new();
        for (property, instruction) in entries {
            let field = def.field_def(property)?;
            let current = entity.field(property);
            if *property == def.primary_key {
                if instruction.to_value().as_ref() != current {
                    return Err(Error::PrimaryKeyChange {
                        entity: def.name.clone(),
                    });
                }
                continue;
            }

            let outcome = Merger::new(mode)
                .with_schema(schema, &field.field_type)
                .merge(current, instruction)
                .map_err(|e| under_property(e, property))?;
            if let Some(doc) = next.as_map_mut() {
                match outcome.next {
                    Some(value) => doc.set(property.clone(), value),
                    None => {
                        doc.delete(property);
                    }
                }
            }
            if !outcome.changes.is_empty() {
                touched.push((property.clone(), outcome.changes));
            }
        }
        validate(&next, &def.as_type(), schema)?;

        let mut changes = ChangeSet::new();
        for (property, property_changes) in touched {
            self.tracker.track(key, &property, &property_changes)?;
            changes.extend(property_changes.prefixed(&Path::from_fields([property.as_str()])));
        }
        if let Some(entity) = self.identity.get_mut(key) {
            entity.replace(next);
        }
        tracing::debug!(entity = %key, %mode, changes = changes.len(), "Assigned");
        Ok(changes)
    }

    /// A plain copy of the entity's live value.
    pub fn to_object(&self, key: &EntityKey) -> Result<Value> {
        Ok(self.entity(key)?.value().clone())
    }

    pub fn entity(&self, key: &EntityKey) -> Result<&Entity> {
        self.identity
            .get(key)
            .ok_or_else(|| Error::NotTracked(key.to_string()))
    }

    /// The live entity, for direct mutation.
    pub fn entity_mut(&mut self, key: &EntityKey) -> Result<&mut Entity> {
        self.identity
            .get_mut(key)
            .ok_or_else(|| Error::NotTracked(key.to_string()))
    }

    /// Paths changed since the last flush, rooted at the row document.
    /// Direct mutations show up only after the next flush.
    pub fn pending(&self, key: &EntityKey) -> Result<&ChangeSet> {
        self.tracker.pending(key)
    }

    /// Drops the identity map and every pending change.
    pub fn clear(&mut self) {
        self.identity.clear();
        self.tracker = ChangeTracker::new();
    }
}

fn primary_key(def: &EntityDef, doc: &Value) -> Result<Value> {
    match doc.as_map().and_then(|m| m.get(&def.primary_key)) {
        Some(id) if !id.is_null() => Ok(id.clone()),
        _ => Err(ValidationErrors::from_error(ValidationError::missing_field(".", def.primary_key.clone())).into()),
    }
}

fn under_property(err: Error, property: &str) -> Error {
    match err {
        Error::ShapeMismatch {
            path,
            expected,
            actual,
        } => {
            let path = if path == "." {
                format!(".{}", property)
            } else {
                format!(".{}{}", property, path)
            };
            Error::ShapeMismatch {
                path,
                expected,
                actual,
            }
        }
        other => other,
    }
}

/// Splits a row document into columns; structured properties are encoded.
fn to_row(schema: &Schema, def: &EntityDef, doc: &Value, format: DocumentFormat) -> Result<Row> {
    let mut row = Row::new();
    let Some(doc) = doc.as_map() else {
        return Ok(row);
    };
    for field in &def.fields {
        let Some(value) = doc.get(&field.name) else {
            continue;
        };
        let column = if schema.is_document(&field.field_type) {
            Column::Document(codec::encode(value, format)?)
        } else {
            Column::Scalar(value.clone())
        };
        row.insert(field.name.clone(), column);
    }
    Ok(row)
}

fn from_row(row: Row, format: DocumentFormat) -> Result<Map> {
    let mut doc = Map::new();
    for (name, column) in row {
        let value = match column {
            Column::Scalar(value) => value,
            Column::Document(bytes) => codec::decode(&bytes, format)?,
        };
        doc.set(name, value);
    }
    Ok(doc)
}
