//! Row → instance materialization.
//!
//! Relationships are loaded eagerly: each child binding runs one query filtered by
//! the foreign key and recursively materializes the rows it returns. The instance
//! is assembled only after every field and relationship loaded, so callers never
//! see a partially populated instance.
//!
//! Recursion is bounded two ways: a `(entity, id)` pair that reappears among its
//! own ancestors is a relationship cycle, and no chain may be deeper than
//! [`crate::BasieConfig::max_relation_depth`]. Both fail with
//! [`OrmError::Configuration`].

use crate::client::Executor;
use crate::error::{OrmError, OrmResult};
use crate::instance::Instance;
use crate::meta::EntityMeta;
use crate::row::Row;
use crate::statement;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The `(entity, id)` chain from the root of one materialization call.
#[derive(Debug, Clone, Default)]
struct Ancestry {
    chain: Vec<(String, i64)>,
}

impl Ancestry {
    fn enter(&self, meta: &EntityMeta, id: i64, max_depth: usize) -> OrmResult<Ancestry> {
        if self
            .chain
            .iter()
            .any(|(name, seen)| *seen == id && name == meta.name())
        {
            let path: Vec<String> = self
                .chain
                .iter()
                .map(|(name, id)| format!("{name}#{id}"))
                .collect();
            return Err(OrmError::configuration(format!(
                "relationship cycle: {} -> {}#{id}",
                path.join(" -> "),
                meta.name()
            )));
        }
        if self.chain.len() > max_depth {
            return Err(OrmError::configuration(format!(
                "relationship depth exceeds {max_depth} while loading {}#{id}",
                meta.name()
            )));
        }
        let mut next = self.clone();
        next.chain.push((meta.name().to_string(), id));
        Ok(next)
    }
}

/// Materialize one row of `meta` together with its relationships.
pub async fn materialize<C: Executor>(
    conn: &C,
    meta: Arc<EntityMeta>,
    row: Row,
) -> OrmResult<Instance> {
    materialize_in(conn, meta, row, Ancestry::default()).await
}

/// Materialize every row, in order.
pub async fn materialize_all<C: Executor>(
    conn: &C,
    meta: &Arc<EntityMeta>,
    rows: Vec<Row>,
) -> OrmResult<Vec<Instance>> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(materialize(conn, Arc::clone(meta), row).await?);
    }
    Ok(out)
}

fn materialize_in<'a, C: Executor>(
    conn: &'a C,
    meta: Arc<EntityMeta>,
    mut row: Row,
    ancestry: Ancestry,
) -> BoxFuture<'a, OrmResult<Instance>> {
    async move {
        let id: i64 = row.try_get(meta.primary_key())?;
        let ancestry = ancestry.enter(&meta, id, conn.config().max_relation_depth)?;

        let mut props = BTreeMap::new();
        for field in meta.fields() {
            let raw = row.take(&field.column)?;
            let value = match field.field_type {
                Some(ty) => ty
                    .coerce(raw)
                    .map_err(|message| OrmError::decode(&field.column, message))?,
                None => raw,
            };
            props.insert(field.field.clone(), value);
        }

        let mut relations = BTreeMap::new();
        for child in meta.children() {
            let foreign = child.foreign.resolve()?;
            let fk = child.foreign_key_for(&meta);
            let stmt = statement::children_of(&foreign, &fk, id);
            let rows = conn.query(&stmt.sql, &stmt.params).await?;

            let mut loaded = Vec::with_capacity(rows.len());
            for child_row in rows {
                let instance =
                    materialize_in(conn, Arc::clone(&foreign), child_row, ancestry.clone()).await?;
                loaded.push(instance);
            }
            tracing::trace!(
                target: "basie",
                entity = meta.name(),
                id,
                relation = %child.field,
                count = loaded.len(),
                "relationship loaded"
            );
            relations.insert(child.field.clone(), loaded);
        }

        Ok(Instance::persisted(meta, id, props, relations))
    }
    .boxed()
}
