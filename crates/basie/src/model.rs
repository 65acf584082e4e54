//! The query façade of one entity.
//!
//! A [`Model`] pairs an entity's metadata with the statement builder, an
//! [`Executor`] and the materializer. Typed entities reach it through the
//! provided methods of [`crate::Entity`]; entities registered by name use
//! [`Model::named`].
//!
//! # Example
//!
//! ```ignore
//! let users = Model::named("User")?;
//! let ann = users.find_by(&conn, &criteria! { "name" => "Ann" }).await?;
//! let matches = users.filter(&conn, ("name LIKE ?", vec!["%nn%"])).await?;
//! ```

use crate::client::Executor;
use crate::criteria::{Criteria, Filter};
use crate::error::OrmResult;
use crate::instance::Instance;
use crate::materialize::{materialize, materialize_all};
use crate::meta::{EntityMeta, Registry};
use crate::row::Row;
use crate::statement::{self, Statement};
use std::sync::Arc;

/// Query and schema operations for one entity.
#[derive(Debug, Clone)]
pub struct Model {
    meta: Arc<EntityMeta>,
}

impl Model {
    pub fn new(meta: Arc<EntityMeta>) -> Self {
        Self { meta }
    }

    /// The model of an entity in the global registry.
    pub fn named(entity: &str) -> OrmResult<Self> {
        Registry::global().resolve_named(entity).map(Self::new)
    }

    pub fn meta(&self) -> &Arc<EntityMeta> {
        &self.meta
    }

    pub fn name(&self) -> &str {
        self.meta.name()
    }

    /// A transient instance with every field unset.
    pub fn new_instance(&self) -> Instance {
        Instance::new(Arc::clone(&self.meta))
    }

    /// Turn a raw row into a persisted instance, loading its relationships.
    pub async fn materialize(&self, conn: &impl Executor, row: Row) -> OrmResult<Instance> {
        materialize(conn, Arc::clone(&self.meta), row).await
    }

    async fn fetch_optional(
        &self,
        conn: &impl Executor,
        stmt: Statement,
    ) -> OrmResult<Option<Instance>> {
        let rows = conn.query(&stmt.sql, &stmt.params).await?;
        match rows.into_iter().next() {
            Some(row) => self.materialize(conn, row).await.map(Some),
            None => Ok(None),
        }
    }

    async fn fetch_all(&self, conn: &impl Executor, stmt: Statement) -> OrmResult<Vec<Instance>> {
        let rows = conn.query(&stmt.sql, &stmt.params).await?;
        materialize_all(conn, &self.meta, rows).await
    }

    /// The instance with primary key `id`, if any.
    pub async fn find(&self, conn: &impl Executor, id: i64) -> OrmResult<Option<Instance>> {
        self.fetch_optional(conn, statement::find_by_id(&self.meta, id))
            .await
    }

    /// The instance with the lowest primary key, if any.
    pub async fn first(&self, conn: &impl Executor) -> OrmResult<Option<Instance>> {
        self.fetch_optional(conn, statement::first(&self.meta)).await
    }

    /// Every instance, ordered by primary key.
    pub async fn all(&self, conn: &impl Executor) -> OrmResult<Vec<Instance>> {
        self.fetch_all(conn, statement::all(&self.meta)).await
    }

    /// The first instance equal to every entry of `criteria`.
    ///
    /// Values are compared with `=`; wildcard characters match themselves.
    pub async fn find_by(
        &self,
        conn: &impl Executor,
        criteria: &Criteria,
    ) -> OrmResult<Option<Instance>> {
        let stmt = statement::find_by(&self.meta, criteria)?;
        self.fetch_optional(conn, stmt).await
    }

    /// Every instance matching an equality map or a literal predicate.
    pub async fn filter(
        &self,
        conn: &impl Executor,
        filter: impl Into<Filter>,
    ) -> OrmResult<Vec<Instance>> {
        let stmt = statement::filter(&self.meta, &filter.into())?;
        self.fetch_all(conn, stmt).await
    }

    /// Create the table if it does not exist.
    pub async fn create_table(&self, conn: &impl Executor) -> OrmResult<()> {
        let sql = statement::create_table(&self.meta)?;
        conn.execute_ddl(&sql).await?;
        tracing::debug!(target: "basie", entity = self.name(), table = self.meta.table(), "table created");
        Ok(())
    }

    /// Drop the table if it exists.
    pub async fn drop_table(&self, conn: &impl Executor) -> OrmResult<()> {
        conn.execute_ddl(&statement::drop_table(&self.meta)).await?;
        tracing::debug!(target: "basie", entity = self.name(), table = self.meta.table(), "table dropped");
        Ok(())
    }
}
