//! Typed entities.
//!
//! [`Entity`] is what `#[derive(Entity)]` implements: a name, a declaration of
//! column and relationship bindings, and (through provided methods) the whole
//! query façade. [`FromInstance`] and [`IntoInstance`] move data between a plain
//! struct and a live [`Instance`].

use crate::client::Executor;
use crate::criteria::{Criteria, Filter};
use crate::error::OrmResult;
use crate::instance::Instance;
use crate::meta::{Declaration, EntityMeta, Registry};
use crate::model::Model;
use crate::row::Row;
use std::any::TypeId;
use std::future::Future;
use std::sync::Arc;

/// A declared entity type.
///
/// # Example
///
/// ```ignore
/// struct Tag;
///
/// impl Entity for Tag {
///     const NAME: &'static str = "Tag";
///
///     fn declare(decl: &mut Declaration) {
///         decl.table("tags").field("label", "label", Some(FieldType::Text));
///     }
/// }
///
/// let tags = Tag::all(&client).await?;
/// ```
pub trait Entity: 'static {
    /// Identity of the entity in the registry.
    const NAME: &'static str;

    /// Record the entity's bindings. Runs once per process.
    fn declare(decl: &mut Declaration);

    /// The committed metadata, declaring the entity on first use.
    fn metadata() -> OrmResult<Arc<EntityMeta>> {
        Registry::global().ensure(Self::NAME, TypeId::of::<Self>(), Self::declare)
    }

    fn model() -> OrmResult<Model> {
        Self::metadata().map(Model::new)
    }

    fn new_instance() -> OrmResult<Instance> {
        Self::metadata().map(Instance::new)
    }

    fn materialize(
        conn: &impl Executor,
        row: Row,
    ) -> impl Future<Output = OrmResult<Instance>> + Send {
        async move { Self::model()?.materialize(conn, row).await }
    }

    fn find(
        conn: &impl Executor,
        id: i64,
    ) -> impl Future<Output = OrmResult<Option<Instance>>> + Send {
        async move { Self::model()?.find(conn, id).await }
    }

    fn first(conn: &impl Executor) -> impl Future<Output = OrmResult<Option<Instance>>> + Send {
        async move { Self::model()?.first(conn).await }
    }

    fn all(conn: &impl Executor) -> impl Future<Output = OrmResult<Vec<Instance>>> + Send {
        async move { Self::model()?.all(conn).await }
    }

    fn find_by(
        conn: &impl Executor,
        criteria: &Criteria,
    ) -> impl Future<Output = OrmResult<Option<Instance>>> + Send {
        async move { Self::model()?.find_by(conn, criteria).await }
    }

    fn filter(
        conn: &impl Executor,
        filter: impl Into<Filter>,
    ) -> impl Future<Output = OrmResult<Vec<Instance>>> + Send {
        let filter = filter.into();
        async move { Self::model()?.filter(conn, filter).await }
    }

    fn create_table(conn: &impl Executor) -> impl Future<Output = OrmResult<()>> + Send {
        async move { Self::model()?.create_table(conn).await }
    }

    fn drop_table(conn: &impl Executor) -> impl Future<Output = OrmResult<()>> + Send {
        async move { Self::model()?.drop_table(conn).await }
    }
}

/// Read a typed value out of a live instance.
pub trait FromInstance: Sized {
    fn from_instance(instance: &Instance) -> OrmResult<Self>;

    fn from_instances(instances: &[Instance]) -> OrmResult<Vec<Self>> {
        instances.iter().map(Self::from_instance).collect()
    }
}

/// Write a typed value's fields into an instance.
///
/// The id and relationship collections are never written: ids are assigned by
/// [`Instance::save`] and relationships are read-only.
pub trait IntoInstance {
    fn write_to(&self, instance: &mut Instance) -> OrmResult<()>;

    /// A fresh transient instance holding this value's fields.
    fn to_instance(&self) -> OrmResult<Instance>
    where
        Self: Entity,
    {
        let mut instance = Self::new_instance()?;
        self.write_to(&mut instance)?;
        Ok(instance)
    }
}
