//! An in-memory executor for integration tests.
//!
//! It understands exactly the statement shapes basie emits (plus simple literal
//! predicates: `=`, `<>`, `<`, `<=`, `>`, `>=`, `LIKE`, `IS NULL`, joined by `AND`),
//! records every statement, and can be told to fail the next one.

#![allow(dead_code)]

use basie::{BasieConfig, Executor, OrmError, OrmResult, Row, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Table {
    next_id: i64,
    rows: BTreeMap<i64, HashMap<String, Value>>,
}

#[derive(Debug, Default)]
struct State {
    tables: HashMap<String, Table>,
    log: Vec<(String, Vec<Value>)>,
    fail_next: Option<String>,
}

#[derive(Debug, Default)]
pub struct MemoryDb {
    state: Mutex<State>,
    config: BasieConfig,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: BasieConfig) -> Self {
        self.config = config;
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Insert fixture rows as-is; each must carry an `id`.
    pub fn seed(&self, table: &str, rows: Vec<Vec<(&str, Value)>>) {
        let mut state = self.lock();
        let table = state.tables.entry(table.to_string()).or_default();
        for row in rows {
            let row: HashMap<String, Value> =
                row.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
            let id = row.get("id").and_then(Value::as_int).unwrap();
            table.next_id = table.next_id.max(id);
            table.rows.insert(id, row);
        }
    }

    pub fn create(&self, table: &str) {
        self.lock().tables.entry(table.to_string()).or_default();
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.lock().tables.contains_key(table)
    }

    /// Stored rows ordered by id.
    pub fn rows(&self, table: &str) -> Vec<HashMap<String, Value>> {
        self.lock()
            .tables
            .get(table)
            .map(|t| t.rows.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn remove(&self, table: &str, id: i64) {
        if let Some(t) = self.lock().tables.get_mut(table) {
            t.rows.remove(&id);
        }
    }

    pub fn statements(&self) -> Vec<String> {
        self.lock().log.iter().map(|(sql, _)| sql.clone()).collect()
    }

    pub fn executed(&self) -> Vec<(String, Vec<Value>)> {
        self.lock().log.clone()
    }

    pub fn clear_log(&self) {
        self.lock().log.clear();
    }

    pub fn fail_next(&self, message: &str) {
        self.lock().fail_next = Some(message.to_string());
    }
}

impl Executor for MemoryDb {
    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        let mut state = self.lock();
        state.log.push((sql.to_string(), params.to_vec()));
        if let Some(message) = state.fail_next.take() {
            return Err(OrmError::execution(message));
        }
        state.run(sql, params)
    }

    async fn execute_ddl(&self, sql: &str) -> OrmResult<()> {
        let mut state = self.lock();
        state.log.push((sql.to_string(), Vec::new()));
        if let Some(message) = state.fail_next.take() {
            return Err(OrmError::execution(message));
        }
        if let Some(rest) = sql.strip_prefix("CREATE TABLE IF NOT EXISTS ") {
            let table = rest.split_whitespace().next().unwrap_or_default();
            state.tables.entry(table.to_string()).or_default();
            Ok(())
        } else if let Some(table) = sql.strip_prefix("DROP TABLE IF EXISTS ") {
            state.tables.remove(table.trim());
            Ok(())
        } else {
            Err(unsupported(sql))
        }
    }

    fn config(&self) -> &BasieConfig {
        &self.config
    }
}

fn unsupported(sql: &str) -> OrmError {
    OrmError::execution(format!("memory db cannot run: {sql}"))
}

fn missing_table(table: &str) -> OrmError {
    OrmError::execution(format!("relation \"{table}\" does not exist"))
}

impl State {
    fn table(&mut self, name: &str) -> OrmResult<&mut Table> {
        self.tables.get_mut(name).ok_or_else(|| missing_table(name))
    }

    fn run(&mut self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        if let Some(rest) = sql.strip_prefix("SELECT ") {
            self.select(rest, params)
        } else if let Some(rest) = sql.strip_prefix("INSERT INTO ") {
            self.insert(rest, params)
        } else if let Some(rest) = sql.strip_prefix("UPDATE ") {
            self.update(rest, params)
        } else if let Some(rest) = sql.strip_prefix("DELETE FROM ") {
            self.delete(rest, params)
        } else {
            Err(unsupported(sql))
        }
    }

    fn select(&mut self, rest: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        let (columns, rest) = rest.split_once(" FROM ").ok_or_else(|| unsupported(rest))?;
        let columns: Vec<&str> = columns.split(", ").collect();
        let (table, mut tail) = rest.split_once(' ').unwrap_or((rest, ""));
        tail = tail.trim();

        let mut limit = None;
        if let Some((head, n)) = tail.rsplit_once("LIMIT ") {
            limit = Some(n.trim().parse::<usize>().map_err(|_| unsupported(tail))?);
            tail = head.trim();
        }
        if let Some((head, _)) = tail.rsplit_once("ORDER BY ") {
            tail = head.trim();
        }
        let predicate = tail.strip_prefix("WHERE ").unwrap_or(tail);

        let table = self.table(table)?;
        let mut out = Vec::new();
        for stored in table.rows.values() {
            if !predicate.is_empty() && !matches(stored, predicate, params)? {
                continue;
            }
            let row = columns
                .iter()
                .filter_map(|c| stored.get(*c).map(|v| (c.to_string(), v.clone())))
                .collect::<Row>();
            out.push(row);
            if limit.is_some_and(|n| out.len() >= n) {
                break;
            }
        }
        Ok(out)
    }

    fn insert(&mut self, rest: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        let (body, pk) = rest
            .rsplit_once(" RETURNING ")
            .ok_or_else(|| unsupported(rest))?;
        let (table, body) = body.split_once(' ').ok_or_else(|| unsupported(rest))?;

        let mut row = HashMap::new();
        if body != "DEFAULT VALUES" {
            let (columns, values) = body
                .split_once(") VALUES (")
                .ok_or_else(|| unsupported(rest))?;
            let columns = columns.trim_start_matches('(').split(", ");
            let values = values.trim_end_matches(')').split(", ");
            for (column, value) in columns.zip(values) {
                row.insert(column.to_string(), operand(value, params)?);
            }
        }

        let table = self.table(table)?;
        table.next_id += 1;
        let id = table.next_id;
        row.insert(pk.to_string(), Value::Int(id));
        table.rows.insert(id, row);
        Ok(vec![Row::new().with(pk, id)])
    }

    fn update(&mut self, rest: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        let (table, rest) = rest.split_once(" SET ").ok_or_else(|| unsupported(rest))?;
        let (assignments, rest) = rest.split_once(" WHERE ").ok_or_else(|| unsupported(rest))?;
        let (predicate, pk) = rest
            .rsplit_once(" RETURNING ")
            .ok_or_else(|| unsupported(rest))?;

        let mut changes = Vec::new();
        for assignment in assignments.split(", ") {
            let (column, value) = assignment
                .split_once(" = ")
                .ok_or_else(|| unsupported(assignment))?;
            changes.push((column.to_string(), operand(value, params)?));
        }

        let table = self.table(table)?;
        let mut out = Vec::new();
        for (id, stored) in table.rows.iter_mut() {
            if matches(stored, predicate, params)? {
                for (column, value) in &changes {
                    stored.insert(column.clone(), value.clone());
                }
                out.push(Row::new().with(pk, *id));
            }
        }
        Ok(out)
    }

    fn delete(&mut self, rest: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        let (table, predicate) = rest.split_once(" WHERE ").ok_or_else(|| unsupported(rest))?;
        let table = self.table(table)?;
        let mut doomed = Vec::new();
        for (id, stored) in &table.rows {
            if matches(stored, predicate, params)? {
                doomed.push(*id);
            }
        }
        for id in doomed {
            table.rows.remove(&id);
        }
        Ok(Vec::new())
    }
}

/// `$n`, an integer literal, or a single-quoted string literal.
fn operand(token: &str, params: &[Value]) -> OrmResult<Value> {
    let token = token.trim();
    if let Some(n) = token.strip_prefix('$') {
        let n: usize = n.parse().map_err(|_| unsupported(token))?;
        return params
            .get(n - 1)
            .cloned()
            .ok_or_else(|| OrmError::execution(format!("no parameter ${n}")));
    }
    if let Some(text) = token.strip_prefix('\'').and_then(|t| t.strip_suffix('\'')) {
        return Ok(Value::Text(text.to_string()));
    }
    token
        .parse::<i64>()
        .map(Value::Int)
        .map_err(|_| unsupported(token))
}

fn matches(row: &HashMap<String, Value>, predicate: &str, params: &[Value]) -> OrmResult<bool> {
    for term in predicate.split(" AND ") {
        let tokens: Vec<&str> = term.split_whitespace().collect();
        let stored = |column: &str| row.get(column).cloned().unwrap_or(Value::Null);
        let holds = match tokens.as_slice() {
            [column, "IS", "NULL"] => stored(column).is_null(),
            [column, "IS", "NOT", "NULL"] => !stored(column).is_null(),
            [column, op, rhs] => {
                let lhs = stored(column);
                let rhs = operand(rhs, params)?;
                match (*op, compare(&lhs, &rhs)) {
                    ("LIKE", _) => match (lhs.as_str(), rhs.as_str()) {
                        (Some(text), Some(pattern)) => like(text, pattern),
                        _ => false,
                    },
                    (_, None) => false,
                    ("=", Some(ord)) => ord == Ordering::Equal,
                    ("<>" | "!=", Some(ord)) => ord != Ordering::Equal,
                    ("<", Some(ord)) => ord == Ordering::Less,
                    ("<=", Some(ord)) => ord != Ordering::Greater,
                    (">", Some(ord)) => ord == Ordering::Greater,
                    (">=", Some(ord)) => ord != Ordering::Less,
                    _ => return Err(unsupported(term)),
                }
            }
            _ => return Err(unsupported(term)),
        };
        if !holds {
            return Ok(false);
        }
    }
    Ok(true)
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
        (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// SQL `LIKE`: `%` matches any run, `_` any single character.
fn like(text: &str, pattern: &str) -> bool {
    fn go(t: &[char], p: &[char]) -> bool {
        match p.split_first() {
            None => t.is_empty(),
            Some(('%', rest)) => (0..=t.len()).any(|i| go(&t[i..], rest)),
            Some(('_', rest)) => !t.is_empty() && go(&t[1..], rest),
            Some((c, rest)) => t.first() == Some(c) && go(&t[1..], rest),
        }
    }
    let t: Vec<char> = text.chars().collect();
    let p: Vec<char> = pattern.chars().collect();
    go(&t, &p)
}
