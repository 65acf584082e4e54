//! Raw rows as returned by the execution engine.

use crate::error::{OrmError, OrmResult};
use crate::value::{FromValue, Value, decode_as};
use std::collections::BTreeMap;

/// One raw row: a mapping from column name to stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: BTreeMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for fixtures.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.columns.insert(column.into(), value.into());
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.columns.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    /// Remove a column from the row, failing if the engine did not return it.
    pub fn take(&mut self, column: &str) -> OrmResult<Value> {
        self.columns
            .remove(column)
            .ok_or_else(|| OrmError::decode(column, "column missing from row"))
    }

    /// Typed access to a column.
    pub fn try_get<T: FromValue>(&self, column: &str) -> OrmResult<T> {
        let value = self
            .columns
            .get(column)
            .ok_or_else(|| OrmError::decode(column, "column missing from row"))?;
        decode_as(column, value)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Convert a `tokio_postgres` row, decoding every column into a [`Value`].
    pub fn from_pg(row: &tokio_postgres::Row) -> OrmResult<Self> {
        let mut out = Row::new();
        for (idx, column) in row.columns().iter().enumerate() {
            let value: Value = row
                .try_get(idx)
                .map_err(|e| OrmError::decode(column.name(), e.to_string()))?;
            out.columns.insert(column.name().to_string(), value);
        }
        Ok(out)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            columns: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
