//! An executor wrapper that carries configuration and logs statements via `tracing`.
//!
//! # Example
//!
//! ```ignore
//! let config = BasieConfig::from_env()?.sql_log_level(SqlLogLevel::Info);
//! let session = Session::new(client).with_config(config);
//! let users = User::all(&session).await?;
//! ```

use crate::client::Executor;
use crate::config::BasieConfig;
use crate::error::OrmResult;
use crate::row::Row;
use crate::value::Value;
use std::time::{Duration, Instant};
use tracing::Level;

fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

/// Wraps an [`Executor`] with a [`BasieConfig`].
#[derive(Debug, Clone)]
pub struct Session<C> {
    inner: C,
    config: BasieConfig,
}

impl<C: Executor> Session<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            config: BasieConfig::default(),
        }
    }

    pub fn with_config(mut self, config: BasieConfig) -> Self {
        self.config = config;
        self
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn into_inner(self) -> C {
        self.inner
    }

    fn display_sql<'a>(&self, sql: &'a str) -> std::borrow::Cow<'a, str> {
        match self.config.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)).into(),
            _ => sql.into(),
        }
    }

    fn log_outcome(&self, sql: &str, param_count: usize, elapsed: Duration, rows: Option<usize>) {
        if !self.config.log_sql {
            return;
        }

        /// Dispatch a tracing event at a runtime-determined level.
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        let sql = self.display_sql(sql);
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        let slow = self.config.slow_query().is_some_and(|t| elapsed >= t);
        let level = if slow {
            Level::WARN
        } else {
            self.config.sql_log_level.as_tracing()
        };
        emit_at_level!(
            level,
            target: "basie.sql",
            sql = %sql,
            param_count,
            rows,
            elapsed_ms,
            slow,
        );
    }

    fn log_failure(&self, sql: &str, error: &crate::OrmError) {
        tracing::warn!(target: "basie.sql", sql = %self.display_sql(sql), %error, "statement failed");
    }
}

impl<C: Executor> Executor for Session<C> {
    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        let start = Instant::now();
        match self.inner.query(sql, params).await {
            Ok(rows) => {
                self.log_outcome(sql, params.len(), start.elapsed(), Some(rows.len()));
                Ok(rows)
            }
            Err(e) => {
                self.log_failure(sql, &e);
                Err(e)
            }
        }
    }

    async fn execute_ddl(&self, sql: &str) -> OrmResult<()> {
        let start = Instant::now();
        match self.inner.execute_ddl(sql).await {
            Ok(()) => {
                self.log_outcome(sql, 0, start.elapsed(), None);
                Ok(())
            }
            Err(e) => {
                self.log_failure(sql, &e);
                Err(e)
            }
        }
    }

    fn config(&self) -> &BasieConfig {
        &self.config
    }
}
