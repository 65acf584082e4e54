//! Statement builder.
//!
//! Pure functions from entity metadata (and criteria) to a parameterized SQL string
//! plus its ordered parameter list. Nothing here talks to the database.
//!
//! Table and column names are validated when the entity is declared, so they are
//! written verbatim; every value goes through a `$n` placeholder.
//!
//! # Example
//!
//! ```ignore
//! let stmt = statement::find_by(&meta, &criteria! { "name" => "Ann" })?;
//! assert_eq!(stmt.sql, "SELECT id, name, age FROM users WHERE name = $1 ORDER BY id LIMIT 1");
//! ```


use crate::criteria::{Criteria, Filter};
use crate::error::{OrmError, OrmResult};
use crate::meta::EntityMeta;
use crate::value::{FieldType, Value};
use std::fmt::Write;

/// A SQL string with `$1, $2, ...` placeholders and the values bound to them.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Debug)]
enum SqlPart {
    Raw(String),
    Param,
}

/// Accumulates SQL pieces and parameters; placeholders are numbered on render.
#[derive(Debug, Default)]
struct Sql {
    parts: Vec<SqlPart>,
    params: Vec<Value>,
}

impl Sql {
    fn new(initial_sql: impl Into<String>) -> Self {
        Self {
            parts: vec![SqlPart::Raw(initial_sql.into())],
            params: Vec::new(),
        }
    }

    fn push(&mut self, sql: &str) -> &mut Self {
        if sql.is_empty() {
            return self;
        }
        match self.parts.last_mut() {
            Some(SqlPart::Raw(last)) => last.push_str(sql),
            _ => self.parts.push(SqlPart::Raw(sql.to_string())),
        }
        self
    }

    fn push_bind(&mut self, value: Value) -> &mut Self {
        self.parts.push(SqlPart::Param);
        self.params.push(value);
        self
    }

    fn build(self) -> Statement {
        let mut sql = String::new();
        let mut idx: usize = 0;
        for part in &self.parts {
            match part {
                SqlPart::Raw(s) => sql.push_str(s),
                SqlPart::Param => {
                    idx += 1;
                    let _ = write!(&mut sql, "${idx}");
                }
            }
        }
        Statement {
            sql,
            params: self.params,
        }
    }
}

/// The primary key followed by every field column.
pub fn select_list(meta: &EntityMeta) -> String {
    let mut list = meta.primary_key().to_string();
    for field in meta.fields() {
        list.push_str(", ");
        list.push_str(&field.column);
    }
    list
}

fn select(meta: &EntityMeta) -> Sql {
    Sql::new(format!(
        "SELECT {} FROM {}",
        select_list(meta),
        meta.table()
    ))
}

fn push_order(q: &mut Sql, meta: &EntityMeta) {
    q.push(" ORDER BY ").push(meta.primary_key());
}

/// Append `WHERE a = $1 AND b = $2`, resolving property names to columns.
///
/// Values go through the field's declared coercion, so criteria accept the same
/// inputs as `Instance::set`.
fn push_match(q: &mut Sql, meta: &EntityMeta, criteria: &Criteria) -> OrmResult<()> {
    for (i, (field, value)) in criteria.iter().enumerate() {
        let column = meta.column_for(field)?;
        let value = criterion_value(meta, field, value.clone())?;
        q.push(if i == 0 { " WHERE " } else { " AND " });
        q.push(column);
        if value.is_null() {
            q.push(" IS NULL");
        } else {
            q.push(" = ").push_bind(value);
        }
    }
    Ok(())
}

fn criterion_value(meta: &EntityMeta, field: &str, value: Value) -> OrmResult<Value> {
    let ty = if field == meta.primary_key() && meta.field(field).is_none() {
        Some(FieldType::Int)
    } else {
        meta.field(field).and_then(|f| f.field_type)
    };
    match ty {
        Some(ty) => ty
            .coerce(value)
            .map_err(|e| OrmError::validation(format!("{}.{field}: {e}", meta.name()))),
        None => Ok(value),
    }
}

/// `SELECT ... WHERE id = $1 LIMIT 1`
pub fn find_by_id(meta: &EntityMeta, id: i64) -> Statement {
    let mut q = select(meta);
    q.push(" WHERE ")
        .push(meta.primary_key())
        .push(" = ")
        .push_bind(Value::Int(id))
        .push(" LIMIT 1");
    q.build()
}

/// The row with the lowest id.
pub fn first(meta: &EntityMeta) -> Statement {
    let mut q = select(meta);
    push_order(&mut q, meta);
    q.push(" LIMIT 1");
    q.build()
}

/// Every row, ordered by id.
pub fn all(meta: &EntityMeta) -> Statement {
    let mut q = select(meta);
    push_order(&mut q, meta);
    q.build()
}

/// First row matching every entry of `criteria`.
pub fn find_by(meta: &EntityMeta, criteria: &Criteria) -> OrmResult<Statement> {
    let mut q = select(meta);
    push_match(&mut q, meta, criteria)?;
    push_order(&mut q, meta);
    q.push(" LIMIT 1");
    Ok(q.build())
}

/// Every row matching every entry of `criteria`.
pub fn filter_match(meta: &EntityMeta, criteria: &Criteria) -> OrmResult<Statement> {
    let mut q = select(meta);
    push_match(&mut q, meta, criteria)?;
    push_order(&mut q, meta);
    Ok(q.build())
}

/// Rows matching a literal predicate.
///
/// The predicate is inserted verbatim after `WHERE`. Each `?` becomes the next
/// `$n` placeholder, except inside quoted literals and identifiers, comments and
/// dollar-quoted strings. Write `??` for a literal `?` operator (jsonb key
/// exists). The number of placeholders must equal `args.len()`.
pub fn filter_raw(meta: &EntityMeta, predicate: &str, args: &[Value]) -> OrmResult<Statement> {
    let segments = split_placeholders(predicate);
    let placeholders = segments.len() - 1;
    if placeholders != args.len() {
        return Err(OrmError::validation(format!(
            "predicate has {placeholders} '?' placeholder(s) but {} argument(s) were supplied",
            args.len()
        )));
    }

    let mut q = select(meta);
    q.push(" WHERE ");
    let (head, tail) = segments.split_at(1);
    q.push(&head[0]);
    for (arg, segment) in args.iter().zip(tail) {
        q.push_bind(arg.clone()).push(segment);
    }
    Ok(q.build())
}

/// Split a literal predicate at its `?` placeholders. Always returns at least
/// one segment.
fn split_placeholders(predicate: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut rest = predicate;

    while let Some(c) = rest.chars().next() {
        let verbatim = match c {
            '\'' | '"' => quoted_len(rest, c),
            '-' if rest.starts_with("--") => rest.find('\n').map_or(rest.len(), |i| i + 1),
            '/' if rest.starts_with("/*") => block_comment_len(rest),
            '$' => dollar_quoted_len(rest).unwrap_or(1),
            '?' if rest.starts_with("??") => {
                current.push('?');
                rest = &rest[2..];
                continue;
            }
            '?' => {
                segments.push(std::mem::take(&mut current));
                rest = &rest[1..];
                continue;
            }
            c => c.len_utf8(),
        };
        current.push_str(&rest[..verbatim]);
        rest = &rest[verbatim..];
    }
    segments.push(current);
    segments
}

/// `'...'` or `"..."`; a doubled quote reads as two adjacent literals.
fn quoted_len(s: &str, quote: char) -> usize {
    s[1..].find(quote).map_or(s.len(), |i| i + 2)
}

/// `/* ... */`, nesting as Postgres does.
fn block_comment_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i + 1 < bytes.len() {
        match (bytes[i], bytes[i + 1]) {
            (b'/', b'*') => {
                depth += 1;
                i += 2;
            }
            (b'*', b'/') => {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    return i;
                }
            }
            _ => i += 1,
        }
    }
    s.len()
}

/// `$$...$$` or `$tag$...$tag$`. `None` when `$` does not open a dollar quote
/// (for example `$1`).
fn dollar_quoted_len(s: &str) -> Option<usize> {
    let tag_len = s[1..].find('$')?;
    let tag = &s[1..=tag_len];
    let valid_tag = !tag.starts_with(|c: char| c.is_ascii_digit())
        && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid_tag {
        return None;
    }
    let delim = &s[..tag_len + 2];
    let body = &s[delim.len()..];
    Some(body.find(delim).map_or(s.len(), |i| 2 * delim.len() + i))
}

/// Dispatch on the shape of a `where` argument.
pub fn filter(meta: &EntityMeta, filter: &Filter) -> OrmResult<Statement> {
    match filter {
        Filter::Match(criteria) => filter_match(meta, criteria),
        Filter::Raw { predicate, args } => filter_raw(meta, predicate, args),
    }
}

/// Child rows of a relationship: `WHERE <foreign_key> = $1`.
pub fn children_of(child: &EntityMeta, foreign_key: &str, parent_id: i64) -> Statement {
    let mut q = select(child);
    q.push(" WHERE ")
        .push(foreign_key)
        .push(" = ")
        .push_bind(Value::Int(parent_id));
    push_order(&mut q, child);
    q.build()
}

/// `INSERT ... RETURNING <pk>` with the given `(column, value)` pairs.
pub fn insert(meta: &EntityMeta, values: Vec<(&str, Value)>) -> Statement {
    let mut q = Sql::new(format!("INSERT INTO {}", meta.table()));
    if values.is_empty() {
        q.push(" DEFAULT VALUES");
    } else {
        let columns: Vec<&str> = values.iter().map(|(c, _)| *c).collect();
        q.push(" (").push(&columns.join(", ")).push(") VALUES (");
        for (i, (_, value)) in values.into_iter().enumerate() {
            if i > 0 {
                q.push(", ");
            }
            q.push_bind(value);
        }
        q.push(")");
    }
    q.push(" RETURNING ").push(meta.primary_key());
    q.build()
}

/// `UPDATE ... WHERE <pk> = $n RETURNING <pk>`; `None` when there is nothing to set.
pub fn update(meta: &EntityMeta, id: i64, values: Vec<(&str, Value)>) -> Option<Statement> {
    if values.is_empty() {
        return None;
    }
    let mut q = Sql::new(format!("UPDATE {} SET ", meta.table()));
    for (i, (column, value)) in values.into_iter().enumerate() {
        if i > 0 {
            q.push(", ");
        }
        q.push(column).push(" = ").push_bind(value);
    }
    q.push(" WHERE ")
        .push(meta.primary_key())
        .push(" = ")
        .push_bind(Value::Int(id))
        .push(" RETURNING ")
        .push(meta.primary_key());
    Some(q.build())
}

/// `DELETE ... WHERE <pk> = $1`
pub fn delete(meta: &EntityMeta, id: i64) -> Statement {
    let mut q = Sql::new(format!("DELETE FROM {}", meta.table()));
    q.push(" WHERE ")
        .push(meta.primary_key())
        .push(" = ")
        .push_bind(Value::Int(id));
    q.build()
}

/// `CREATE TABLE IF NOT EXISTS`, every field `NOT NULL`.
///
/// Fails when the entity has no fields or a field has no declared type.
pub fn create_table(meta: &EntityMeta) -> OrmResult<String> {
    if meta.fields().is_empty() {
        return Err(OrmError::configuration(format!(
            "{} has no registered fields",
            meta.name()
        )));
    }

    let mut sql = format!(
        "CREATE TABLE IF NOT EXISTS {} ({} BIGSERIAL PRIMARY KEY",
        meta.table(),
        meta.primary_key()
    );
    for field in meta.fields() {
        let ty = field.field_type.ok_or_else(|| {
            OrmError::configuration(format!(
                "{}.{} has no declared type",
                meta.name(),
                field.field
            ))
        })?;
        let _ = write!(&mut sql, ", {} {} NOT NULL", field.column, ty.sql_type());
    }
    sql.push(')');
    Ok(sql)
}

/// `DROP TABLE IF EXISTS`
pub fn drop_table(meta: &EntityMeta) -> String {
    format!("DROP TABLE IF EXISTS {}", meta.table())
}
