//! SQL identifier validation.
//!
//! Identifiers cannot be bound as parameters, so every table and column name that
//! reaches a statement is checked once, when the entity is declared:
//!
//! - each `.`-separated segment must match `[A-Za-z_][A-Za-z0-9_]*`
//! - only table names may be dotted (`schema.table`)

use crate::error::{OrmError, OrmResult};

fn valid_segment(seg: &str) -> bool {
    let mut chars = seg.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first == '_' || first.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// Validate a column name.
pub fn check_column(name: &str) -> OrmResult<()> {
    if valid_segment(name) {
        Ok(())
    } else {
        Err(OrmError::configuration(format!(
            "invalid column identifier '{name}'"
        )))
    }
}

/// Validate a table name, optionally schema-qualified.
pub fn check_table(name: &str) -> OrmResult<()> {
    if !name.is_empty() && name.split('.').count() <= 2 && name.split('.').all(valid_segment) {
        Ok(())
    } else {
        Err(OrmError::configuration(format!(
            "invalid table identifier '{name}'"
        )))
    }
}
