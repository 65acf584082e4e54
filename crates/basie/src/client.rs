//! The execution engine seam.
//!
//! basie never opens connections itself: every statement goes through an
//! [`Executor`], which is implemented for `tokio-postgres` clients and
//! transactions (and pooled clients with the `pool` feature). Tests and other
//! backends can implement it directly.

use crate::config::BasieConfig;
use crate::error::{OrmError, OrmResult};
use crate::row::Row;
use crate::value::Value;
use std::future::Future;
use tokio_postgres::types::ToSql;

/// Something that can run parameterized statements and DDL.
pub trait Executor: Send + Sync {
    /// Execute a statement with `$1, $2, ...` placeholders and return all rows.
    fn query(&self, sql: &str, params: &[Value]) -> impl Future<Output = OrmResult<Vec<Row>>> + Send;

    /// Execute a schema statement.
    fn execute_ddl(&self, sql: &str) -> impl Future<Output = OrmResult<()>> + Send;

    /// Configuration for operations run through this executor.
    fn config(&self) -> &BasieConfig {
        BasieConfig::shared_default()
    }
}

fn param_refs(params: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

fn convert_rows(rows: Vec<tokio_postgres::Row>) -> OrmResult<Vec<Row>> {
    rows.iter().map(Row::from_pg).collect()
}

impl Executor for tokio_postgres::Client {
    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        let refs = param_refs(params);
        let rows = tokio_postgres::Client::query(self, sql, &refs)
            .await
            .map_err(OrmError::from_db_error)?;
        convert_rows(rows)
    }

    async fn execute_ddl(&self, sql: &str) -> OrmResult<()> {
        self.batch_execute(sql)
            .await
            .map_err(OrmError::from_db_error)
    }
}

impl Executor for tokio_postgres::Transaction<'_> {
    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        let refs = param_refs(params);
        let rows = tokio_postgres::Transaction::query(self, sql, &refs)
            .await
            .map_err(OrmError::from_db_error)?;
        convert_rows(rows)
    }

    async fn execute_ddl(&self, sql: &str) -> OrmResult<()> {
        self.batch_execute(sql)
            .await
            .map_err(OrmError::from_db_error)
    }
}

#[cfg(feature = "pool")]
impl Executor for deadpool_postgres::Client {
    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        // Delegate to the deref target (ClientWrapper -> tokio_postgres::Client).
        let client: &tokio_postgres::Client = self;
        Executor::query(client, sql, params).await
    }

    async fn execute_ddl(&self, sql: &str) -> OrmResult<()> {
        let client: &tokio_postgres::Client = self;
        Executor::execute_ddl(client, sql).await
    }
}

impl<C: Executor> Executor for &C {
    fn query(&self, sql: &str, params: &[Value]) -> impl Future<Output = OrmResult<Vec<Row>>> + Send {
        (**self).query(sql, params)
    }

    fn execute_ddl(&self, sql: &str) -> impl Future<Output = OrmResult<()>> + Send {
        (**self).execute_ddl(sql)
    }

    fn config(&self) -> &BasieConfig {
        (**self).config()
    }
}
