//! Entity metadata: column bindings and relationship bindings per declared type.
//!
//! Metadata is collected once per entity, either through [`crate::Entity::declare`]
//! (what `#[derive(Entity)]` generates) or through the explicit
//! [`Registry::register_field`] / [`Registry::register_child`] calls, and is read-only
//! afterwards.

mod registry;

#[cfg(test)]
mod tests;

pub use registry::{EntityRegistration, Registry, register_all};

use crate::entity::Entity;
use crate::error::{OrmError, OrmResult};
use crate::ident::{check_column, check_table};
use crate::value::FieldType;
use heck::ToSnakeCase;
use std::fmt;
use std::sync::Arc;

/// Default primary key column.
pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// One persisted scalar column.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMeta {
    /// Column name in the table.
    pub column: String,
    /// Property name on the instance.
    pub field: String,
    /// Declared type, used for coercion and DDL.
    pub field_type: Option<FieldType>,
}

impl FieldMeta {
    pub fn new(
        column: impl Into<String>,
        field: impl Into<String>,
        field_type: Option<FieldType>,
    ) -> Self {
        Self {
            column: column.into(),
            field: field.into(),
            field_type,
        }
    }
}

/// Deferred reference to the entity on the other side of a relationship.
///
/// Resolution happens on first use, so relationships may point at entities that
/// are declared later (or at each other).
#[derive(Clone)]
pub enum ForeignRef {
    /// Resolves by declaring the target type on demand.
    Lazy {
        name: &'static str,
        resolve: fn() -> OrmResult<Arc<EntityMeta>>,
    },
    /// Resolves by entity name through the global registry.
    Named(String),
}

impl ForeignRef {
    /// Reference a Rust entity type.
    pub fn of<T: Entity>() -> Self {
        ForeignRef::Lazy {
            name: T::NAME,
            resolve: T::metadata,
        }
    }

    /// Reference an entity by its registered name.
    pub fn named(name: impl Into<String>) -> Self {
        ForeignRef::Named(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            ForeignRef::Lazy { name, .. } => name,
            ForeignRef::Named(name) => name,
        }
    }

    pub fn resolve(&self) -> OrmResult<Arc<EntityMeta>> {
        match self {
            ForeignRef::Lazy { resolve, .. } => resolve(),
            ForeignRef::Named(name) => Registry::global().resolve_named(name),
        }
    }
}

impl PartialEq for ForeignRef {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl fmt::Debug for ForeignRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ForeignRef").field(&self.name()).finish()
    }
}

/// One one-to-many relationship.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildMeta {
    /// Property that holds the loaded collection.
    pub field: String,
    pub foreign: ForeignRef,
    /// Column on the related table pointing back at the parent id.
    pub foreign_key: Option<String>,
}

impl ChildMeta {
    pub fn new(field: impl Into<String>, foreign: ForeignRef, foreign_key: Option<&str>) -> Self {
        Self {
            field: field.into(),
            foreign,
            foreign_key: foreign_key.map(str::to_string),
        }
    }

    /// The foreign key column, falling back to `<parent>_id`.
    pub fn foreign_key_for(&self, parent: &EntityMeta) -> String {
        self.foreign_key
            .clone()
            .unwrap_or_else(|| parent.default_foreign_key())
    }
}

/// The accumulated metadata record of one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityMeta {
    name: String,
    table: String,
    primary_key: String,
    fields: Vec<FieldMeta>,
    children: Vec<ChildMeta>,
}

impl EntityMeta {
    /// A record with no bindings; table defaults to the snake_case name.
    pub fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            table: name.to_snake_case(),
            primary_key: DEFAULT_PRIMARY_KEY.to_string(),
            fields: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn fields(&self) -> &[FieldMeta] {
        &self.fields
    }

    pub fn children(&self) -> &[ChildMeta] {
        &self.children
    }

    pub fn field(&self, name: &str) -> Option<&FieldMeta> {
        self.fields.iter().find(|f| f.field == name)
    }

    pub fn child(&self, name: &str) -> Option<&ChildMeta> {
        self.children.iter().find(|c| c.field == name)
    }

    /// Whether any binding was registered for this entity.
    pub fn is_declared(&self) -> bool {
        !self.fields.is_empty() || !self.children.is_empty()
    }

    /// Resolve a property name used in criteria to its column.
    ///
    /// The primary key is addressable under its own name.
    pub fn column_for(&self, field: &str) -> OrmResult<&str> {
        if field == self.primary_key {
            return Ok(&self.primary_key);
        }
        self.field(field).map(|f| f.column.as_str()).ok_or_else(|| {
            OrmError::configuration(format!(
                "{} has no registered field '{field}'",
                self.name
            ))
        })
    }

    /// `<snake_case name>_id`, the conventional foreign key pointing at this entity.
    pub fn default_foreign_key(&self) -> String {
        format!("{}_id", self.name.to_snake_case())
    }

    pub(crate) fn set_table(&mut self, table: &str) -> OrmResult<()> {
        check_table(table)?;
        self.table = table.to_string();
        Ok(())
    }

    pub(crate) fn set_primary_key(&mut self, pk: &str) -> OrmResult<()> {
        check_column(pk)?;
        if self.fields.iter().any(|f| f.column == pk) {
            return Err(OrmError::configuration(format!(
                "{}: primary key '{pk}' is already bound to a field",
                self.name
            )));
        }
        self.primary_key = pk.to_string();
        Ok(())
    }

    fn field_name_taken(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.field == name) || self.children.iter().any(|c| c.field == name)
    }

    pub(crate) fn add_field(&mut self, field: FieldMeta) -> OrmResult<()> {
        check_column(&field.column)?;
        if field.field.is_empty() {
            return Err(OrmError::configuration(format!(
                "{}: empty field name for column '{}'",
                self.name, field.column
            )));
        }
        // Re-declaration of the same binding is a no-op.
        if self.fields.contains(&field) {
            return Ok(());
        }
        if field.column == self.primary_key {
            return Err(OrmError::configuration(format!(
                "{}: column '{}' is the primary key",
                self.name, field.column
            )));
        }
        if self.fields.iter().any(|f| f.column == field.column) {
            return Err(OrmError::configuration(format!(
                "{}: duplicate column '{}'",
                self.name, field.column
            )));
        }
        if self.field_name_taken(&field.field) {
            return Err(OrmError::configuration(format!(
                "{}: duplicate field '{}'",
                self.name, field.field
            )));
        }
        self.fields.push(field);
        Ok(())
    }

    pub(crate) fn add_child(&mut self, child: ChildMeta) -> OrmResult<()> {
        if let Some(fk) = &child.foreign_key {
            check_column(fk)?;
        }
        if self.children.contains(&child) {
            return Ok(());
        }
        if child.field.is_empty() || self.field_name_taken(&child.field) {
            return Err(OrmError::configuration(format!(
                "{}: duplicate or empty relationship field '{}'",
                self.name, child.field
            )));
        }
        self.children.push(child);
        Ok(())
    }
}

/// Collects the bindings of one entity before they are committed to a [`Registry`].
#[derive(Debug, Clone)]
pub struct Declaration {
    pub(crate) name: String,
    pub(crate) table: Option<String>,
    pub(crate) primary_key: Option<String>,
    pub(crate) fields: Vec<FieldMeta>,
    pub(crate) children: Vec<ChildMeta>,
}

impl Declaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            primary_key: None,
            fields: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&mut self, table: &str) -> &mut Self {
        self.table = Some(table.to_string());
        self
    }

    pub fn primary_key(&mut self, pk: &str) -> &mut Self {
        self.primary_key = Some(pk.to_string());
        self
    }

    /// Bind a property to a column.
    pub fn field(
        &mut self,
        column: &str,
        field: &str,
        field_type: Option<FieldType>,
    ) -> &mut Self {
        self.fields.push(FieldMeta::new(column, field, field_type));
        self
    }

    /// Bind a property to the rows of another entity whose `foreign_key` equals our id.
    pub fn has_many(
        &mut self,
        field: &str,
        foreign: ForeignRef,
        foreign_key: Option<&str>,
    ) -> &mut Self {
        self.children.push(ChildMeta::new(field, foreign, foreign_key));
        self
    }
}
