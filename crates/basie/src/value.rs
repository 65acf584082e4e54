//! Scalar values exchanged with the execution engine, and field type coercion.

use crate::error::{OrmError, OrmResult};
use bytes::BytesMut;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::error::Error;
use std::fmt;
use tokio_postgres::types::{FromSql, IsNull, ToSql, Type, to_sql_checked};

/// A single stored scalar.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    Uuid(uuid::Uuid),
    Json(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Timestamp(_) => "timestamp",
            Value::Uuid(_) => "uuid",
            Value::Json(_) => "json",
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(v) => serde_json::Value::Bool(*v),
            Value::Int(v) => serde_json::Value::from(*v),
            Value::Float(v) => serde_json::Value::from(*v),
            Value::Text(v) => serde_json::Value::String(v.clone()),
            Value::Timestamp(v) => serde_json::Value::String(v.to_rfc3339()),
            Value::Uuid(v) => serde_json::Value::String(v.to_string()),
            Value::Json(v) => v.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "'{v}'"),
            Value::Timestamp(v) => write!(f, "'{}'", v.to_rfc3339()),
            Value::Uuid(v) => write!(f, "'{v}'"),
            Value::Json(v) => write!(f, "'{v}'"),
        }
    }
}

/// Coercion hook for custom (enum-like or boxed) column types.
pub type CoerceFn = fn(Value) -> Result<Value, String>;

/// A user-defined column type.
#[derive(Debug, Clone, Copy)]
pub struct CustomType {
    /// Name shown in error messages and used for equality.
    pub name: &'static str,
    /// SQL type used by `create_table`.
    pub sql_type: &'static str,
    pub coerce: CoerceFn,
}

impl PartialEq for CustomType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.sql_type == other.sql_type
    }
}

/// The declared type of a persisted column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldType {
    Bool,
    Int,
    Float,
    Text,
    Timestamp,
    Uuid,
    Json,
    Custom(CustomType),
}

impl FieldType {
    /// Column type used in `CREATE TABLE`.
    pub fn sql_type(&self) -> &'static str {
        match self {
            FieldType::Bool => "BOOLEAN",
            FieldType::Int => "BIGINT",
            FieldType::Float => "DOUBLE PRECISION",
            FieldType::Text => "TEXT",
            FieldType::Timestamp => "TIMESTAMPTZ",
            FieldType::Uuid => "UUID",
            FieldType::Json => "JSONB",
            FieldType::Custom(custom) => custom.sql_type,
        }
    }

    /// Coerce a stored value into this type.
    ///
    /// `Null` always passes; mandatory-field checks happen when saving.
    pub fn coerce(&self, value: Value) -> Result<Value, String> {
        if value.is_null() {
            return Ok(value);
        }
        match (self, value) {
            (FieldType::Custom(custom), v) => (custom.coerce)(v),
            (FieldType::Json, v) => Ok(Value::Json(v.to_json())),

            (FieldType::Bool, Value::Bool(v)) => Ok(Value::Bool(v)),
            (FieldType::Bool, Value::Int(0)) => Ok(Value::Bool(false)),
            (FieldType::Bool, Value::Int(1)) => Ok(Value::Bool(true)),

            (FieldType::Int, Value::Int(v)) => Ok(Value::Int(v)),
            (FieldType::Int, Value::Float(v)) if v.fract() == 0.0 && v.is_finite() => {
                if (-I64_BOUND..I64_BOUND).contains(&v) {
                    Ok(Value::Int(v as i64))
                } else {
                    Err(format!("{v} is out of range for int"))
                }
            }
            (FieldType::Int, Value::Text(s)) => s
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| format!("'{s}' is not an integer")),

            (FieldType::Float, Value::Float(v)) => Ok(Value::Float(v)),
            (FieldType::Float, Value::Int(v)) => Ok(Value::Float(v as f64)),

            (FieldType::Text, Value::Text(v)) => Ok(Value::Text(v)),

            (FieldType::Timestamp, Value::Timestamp(v)) => Ok(Value::Timestamp(v)),
            (FieldType::Timestamp, Value::Text(s)) => DateTime::parse_from_rfc3339(&s)
                .map(|t| Value::Timestamp(t.with_timezone(&Utc)))
                .map_err(|e| format!("'{s}' is not an RFC 3339 timestamp: {e}")),

            (FieldType::Uuid, Value::Uuid(v)) => Ok(Value::Uuid(v)),
            (FieldType::Uuid, Value::Text(s)) => uuid::Uuid::parse_str(&s)
                .map(Value::Uuid)
                .map_err(|e| format!("'{s}' is not a uuid: {e}")),

            (ty, v) => Err(format!("cannot store {} value as {ty:?}", v.kind())),
        }
    }
}

/// 2^63; every float in `[-2^63, 2^63)` converts to `i64` exactly.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Convert a Rust value into a stored [`Value`].
pub trait ToValue {
    fn to_value(&self) -> Value;
}

/// Convert a stored [`Value`] back into a Rust value.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, String>;

    /// Field type declared for columns of this Rust type.
    fn field_type() -> Option<FieldType> {
        None
    }
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, String> {
        Ok(value.clone())
    }
}

macro_rules! impl_int_value {
    ($($t:ty),*) => {$(
        impl ToValue for $t {
            fn to_value(&self) -> Value {
                Value::Int(i64::from(*self))
            }
        }

        impl FromValue for $t {
            fn from_value(value: &Value) -> Result<Self, String> {
                match value {
                    Value::Int(v) => <$t>::try_from(*v)
                        .map_err(|_| format!("{v} out of range for {}", stringify!($t))),
                    other => Err(format!("expected int, got {}", other.kind())),
                }
            }

            fn field_type() -> Option<FieldType> {
                Some(FieldType::Int)
            }
        }

        impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(i64::from(v))
            }
        }
    )*};
}

impl_int_value!(i8, i16, i32, i64, u8, u16, u32);

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Float(v) => Ok(*v),
            Value::Int(v) => Ok(*v as f64),
            other => Err(format!("expected float, got {}", other.kind())),
        }
    }

    fn field_type() -> Option<FieldType> {
        Some(FieldType::Float)
    }
}

impl ToValue for f32 {
    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Result<Self, String> {
        f64::from_value(value).map(|v| v as f32)
    }

    fn field_type() -> Option<FieldType> {
        Some(FieldType::Float)
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Bool(v) => Ok(*v),
            other => Err(format!("expected bool, got {}", other.kind())),
        }
    }

    fn field_type() -> Option<FieldType> {
        Some(FieldType::Bool)
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl ToValue for &str {
    fn to_value(&self) -> Value {
        Value::Text((*self).to_string())
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Text(v) => Ok(v.clone()),
            other => Err(format!("expected text, got {}", other.kind())),
        }
    }

    fn field_type() -> Option<FieldType> {
        Some(FieldType::Text)
    }
}

impl ToValue for DateTime<Utc> {
    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Timestamp(v) => Ok(*v),
            other => Err(format!("expected timestamp, got {}", other.kind())),
        }
    }

    fn field_type() -> Option<FieldType> {
        Some(FieldType::Timestamp)
    }
}

impl ToValue for uuid::Uuid {
    fn to_value(&self) -> Value {
        Value::Uuid(*self)
    }
}

impl FromValue for uuid::Uuid {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Uuid(v) => Ok(*v),
            other => Err(format!("expected uuid, got {}", other.kind())),
        }
    }

    fn field_type() -> Option<FieldType> {
        Some(FieldType::Uuid)
    }
}

impl ToValue for serde_json::Value {
    fn to_value(&self) -> Value {
        Value::Json(self.clone())
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Json(v) => Ok(v.clone()),
            other => Ok(other.to_json()),
        }
    }

    fn field_type() -> Option<FieldType> {
        Some(FieldType::Json)
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, ToValue::to_value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, String> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }

    fn field_type() -> Option<FieldType> {
        T::field_type()
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<uuid::Uuid> for Value {
    fn from(v: uuid::Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Decode a value into `T`, reporting failures against `column`.
pub(crate) fn decode_as<T: FromValue>(column: &str, value: &Value) -> OrmResult<T> {
    T::from_value(value).map_err(|message| OrmError::decode(column, message))
}

impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => v.to_sql_checked(ty, out),
            Value::Int(v) => match *ty {
                Type::INT2 => i16::try_from(*v)?.to_sql_checked(ty, out),
                Type::INT4 => i32::try_from(*v)?.to_sql_checked(ty, out),
                Type::FLOAT8 => (*v as f64).to_sql_checked(ty, out),
                _ => v.to_sql_checked(ty, out),
            },
            Value::Float(v) => match *ty {
                Type::FLOAT4 => (*v as f32).to_sql_checked(ty, out),
                _ => v.to_sql_checked(ty, out),
            },
            Value::Text(v) => v.to_sql_checked(ty, out),
            Value::Timestamp(v) => match *ty {
                Type::TIMESTAMP => v.naive_utc().to_sql_checked(ty, out),
                _ => v.to_sql_checked(ty, out),
            },
            Value::Uuid(v) => v.to_sql_checked(ty, out),
            Value::Json(v) => v.to_sql_checked(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

impl<'a> FromSql<'a> for Value {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        let value = match *ty {
            Type::BOOL => Value::Bool(bool::from_sql(ty, raw)?),
            Type::INT2 => Value::Int(i64::from(i16::from_sql(ty, raw)?)),
            Type::INT4 => Value::Int(i64::from(i32::from_sql(ty, raw)?)),
            Type::INT8 => Value::Int(i64::from_sql(ty, raw)?),
            Type::FLOAT4 => Value::Float(f64::from(f32::from_sql(ty, raw)?)),
            Type::FLOAT8 => Value::Float(f64::from_sql(ty, raw)?),
            Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
                Value::Text(String::from_sql(ty, raw)?)
            }
            Type::TIMESTAMPTZ => Value::Timestamp(DateTime::<Utc>::from_sql(ty, raw)?),
            Type::TIMESTAMP => Value::Timestamp(NaiveDateTime::from_sql(ty, raw)?.and_utc()),
            Type::UUID => Value::Uuid(uuid::Uuid::from_sql(ty, raw)?),
            Type::JSON | Type::JSONB => Value::Json(serde_json::Value::from_sql(ty, raw)?),
            _ => return Err(format!("unsupported column type {ty}").into()),
        };
        Ok(value)
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(Value::Null)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}
