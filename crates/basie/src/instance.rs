//! Mapped instances and their lifecycle.
//!
//! ```text
//! transient --save--> persisted --destroy--> poisoned
//!     \________________destroy_________________/
//! ```
//!
//! Every public operation except [`Instance::is_poisoned`] and [`Instance::state`]
//! checks the state first; a poisoned instance answers with
//! [`OrmError::State`] so use-after-destroy bugs surface immediately.

use crate::client::Executor;
use crate::error::{OrmError, OrmResult};
use crate::meta::EntityMeta;
use crate::statement;
use crate::value::{FromValue, Value, decode_as};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Lifecycle state of an [`Instance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Constructed, no id, no row.
    Transient,
    /// Has an id; the row exists.
    Persisted,
    /// Destroyed; terminal.
    Poisoned,
}

/// One mapped object: identity, a raw property bag and loaded relationships.
#[derive(Debug)]
pub struct Instance {
    meta: Arc<EntityMeta>,
    id: Option<i64>,
    props: BTreeMap<String, Value>,
    relations: BTreeMap<String, Vec<Instance>>,
    state: State,
}

impl Instance {
    /// A transient instance with every field unset.
    pub fn new(meta: Arc<EntityMeta>) -> Self {
        let props = meta
            .fields()
            .iter()
            .map(|f| (f.field.clone(), Value::Null))
            .collect();
        let relations = meta
            .children()
            .iter()
            .map(|c| (c.field.clone(), Vec::new()))
            .collect();
        Self {
            meta,
            id: None,
            props,
            relations,
            state: State::Transient,
        }
    }

    pub(crate) fn persisted(
        meta: Arc<EntityMeta>,
        id: i64,
        props: BTreeMap<String, Value>,
        relations: BTreeMap<String, Vec<Instance>>,
    ) -> Self {
        Self {
            meta,
            id: Some(id),
            props,
            relations,
            state: State::Persisted,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_poisoned(&self) -> bool {
        self.state == State::Poisoned
    }

    fn check_live(&self) -> OrmResult<()> {
        if self.is_poisoned() {
            return Err(OrmError::state(format!(
                "{} used after destroy",
                self.meta.name()
            )));
        }
        Ok(())
    }

    /// The entity metadata this instance is mapped with.
    pub fn entity(&self) -> OrmResult<&Arc<EntityMeta>> {
        self.check_live()?;
        Ok(&self.meta)
    }

    /// The primary key; `None` while transient.
    pub fn id(&self) -> OrmResult<Option<i64>> {
        self.check_live()?;
        Ok(self.id)
    }

    /// Current value of a field.
    pub fn get(&self, field: &str) -> OrmResult<&Value> {
        self.check_live()?;
        self.props.get(field).ok_or_else(|| self.unknown_field(field))
    }

    /// Current value of a field, decoded as `T`.
    pub fn get_as<T: FromValue>(&self, field: &str) -> OrmResult<T> {
        let value = self.get(field)?;
        decode_as(field, value)
    }

    /// Assign a field, applying its declared coercion.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> OrmResult<()> {
        self.check_live()?;
        let binding = self.meta.field(field).ok_or_else(|| self.unknown_field(field))?;
        let value = match binding.field_type {
            Some(ty) => ty
                .coerce(value.into())
                .map_err(|e| OrmError::validation(format!("{}.{field}: {e}", self.meta.name())))?,
            None => value.into(),
        };
        self.props.insert(field.to_string(), value);
        Ok(())
    }

    /// Loaded rows of a relationship (empty while transient).
    pub fn children(&self, field: &str) -> OrmResult<&[Instance]> {
        self.check_live()?;
        self.relations
            .get(field)
            .map(Vec::as_slice)
            .ok_or_else(|| self.unknown_field(field))
    }

    fn unknown_field(&self, field: &str) -> OrmError {
        OrmError::configuration(format!(
            "{} has no registered field '{field}'",
            self.meta.name()
        ))
    }

    /// Every field as `(column, value)`, failing if any is unset.
    fn column_values(&self) -> OrmResult<Vec<(&str, Value)>> {
        let missing: Vec<&str> = self
            .meta
            .fields()
            .iter()
            .filter(|f| self.props.get(&f.field).is_none_or(Value::is_null))
            .map(|f| f.field.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(OrmError::validation(format!(
                "{}: missing value for {}",
                self.meta.name(),
                missing.join(", ")
            )));
        }

        Ok(self
            .meta
            .fields()
            .iter()
            .map(|f| {
                let value = self.props.get(&f.field).cloned().unwrap_or_default();
                (f.column.as_str(), value)
            })
            .collect())
    }

    /// Insert (transient) or update (persisted) the row.
    ///
    /// All declared fields are mandatory; an unset field fails with
    /// [`OrmError::Validation`] before anything is written.
    pub async fn save(&mut self, conn: &impl Executor) -> OrmResult<()> {
        self.check_live()?;
        let values = self.column_values()?;

        match self.id {
            None => {
                let stmt = statement::insert(&self.meta, values);
                let rows = conn.query(&stmt.sql, &stmt.params).await?;
                let row = rows
                    .into_iter()
                    .next()
                    .ok_or_else(|| OrmError::execution("INSERT returned no row"))?;
                let id: i64 = row.try_get(self.meta.primary_key())?;
                self.id = Some(id);
                self.state = State::Persisted;
                tracing::debug!(target: "basie", entity = self.meta.name(), id, "inserted");
            }
            Some(id) => {
                let Some(stmt) = statement::update(&self.meta, id, values) else {
                    return Ok(());
                };
                let rows = conn.query(&stmt.sql, &stmt.params).await?;
                if rows.is_empty() {
                    return Err(OrmError::not_found(format!(
                        "{} {id} no longer exists",
                        self.meta.name()
                    )));
                }
                tracing::debug!(target: "basie", entity = self.meta.name(), id, "updated");
            }
        }
        Ok(())
    }

    /// Delete the row (if any) and poison the instance.
    ///
    /// Destroying an already-poisoned instance does nothing.
    pub async fn destroy(&mut self, conn: &impl Executor) -> OrmResult<()> {
        match (self.state, self.id) {
            (State::Poisoned, _) => return Ok(()),
            (State::Persisted, Some(id)) => {
                let stmt = statement::delete(&self.meta, id);
                conn.query(&stmt.sql, &stmt.params).await?;
                tracing::debug!(target: "basie", entity = self.meta.name(), id, "destroyed");
            }
            _ => {}
        }
        self.state = State::Poisoned;
        Ok(())
    }
}
