//! Bind values and scalar conversions.
//!
//! [`Value`] is the closed set of scalars that can travel to a backend as a
//! bind parameter or come back in a result row. Statement trees store owned
//! `Value`s, so a tree built once can be rendered and executed repeatedly
//! against different backends.

use crate::error::{QueryError, QueryResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use uuid::Uuid;

/// A scalar bind or result value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int2(i16),
    Int4(i32),
    Int8(i64),
    Float4(f32),
    Float8(f64),
    Text(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Json(serde_json::Value),
}

/// The declared type of a column, used to coerce captured identity values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Text,
    Bytes,
    Uuid,
    Date,
    Timestamp,
    TimestampTz,
    Json,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The kind of a non-null value.
    pub fn kind(&self) -> Option<ValueKind> {
        Some(match self {
            Value::Null => return None,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int2(_) => ValueKind::Int2,
            Value::Int4(_) => ValueKind::Int4,
            Value::Int8(_) => ValueKind::Int8,
            Value::Float4(_) => ValueKind::Float4,
            Value::Float8(_) => ValueKind::Float8,
            Value::Text(_) => ValueKind::Text,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Uuid(_) => ValueKind::Uuid,
            Value::Date(_) => ValueKind::Date,
            Value::Timestamp(_) => ValueKind::Timestamp,
            Value::TimestampTz(_) => ValueKind::TimestampTz,
            Value::Json(_) => ValueKind::Json,
        })
    }

    /// Convert this value to the declared `kind` of a column.
    ///
    /// Backends report generated keys in whatever width their driver picks
    /// (commonly `Int8`); the resolver coerces them to the identity column's
    /// declared kind before comparing or materializing. Conversions are
    /// conservative: integer widening, checked narrowing, int-to-float, and
    /// text-to-uuid parsing. Anything else is a decode error.
    pub fn coerce(self, kind: ValueKind) -> QueryResult<Value> {
        if self.is_null() {
            return Ok(Value::Null);
        }
        if self.kind() == Some(kind) {
            return Ok(self);
        }

        let fail = |v: &Value| {
            Err(QueryError::decode(
                "<coerce>",
                format!("cannot convert {:?} to {:?}", v, kind),
            ))
        };

        match (&self, kind) {
            (Value::Int2(v), ValueKind::Int4) => Ok(Value::Int4(i32::from(*v))),
            (Value::Int2(v), ValueKind::Int8) => Ok(Value::Int8(i64::from(*v))),
            (Value::Int4(v), ValueKind::Int8) => Ok(Value::Int8(i64::from(*v))),
            (Value::Int4(v), ValueKind::Int2) => match i16::try_from(*v) {
                Ok(n) => Ok(Value::Int2(n)),
                Err(_) => fail(&self),
            },
            (Value::Int8(v), ValueKind::Int4) => match i32::try_from(*v) {
                Ok(n) => Ok(Value::Int4(n)),
                Err(_) => fail(&self),
            },
            (Value::Int8(v), ValueKind::Int2) => match i16::try_from(*v) {
                Ok(n) => Ok(Value::Int2(n)),
                Err(_) => fail(&self),
            },
            (Value::Int2(v), ValueKind::Float8) => Ok(Value::Float8(f64::from(*v))),
            (Value::Int4(v), ValueKind::Float8) => Ok(Value::Float8(f64::from(*v))),
            (Value::Int8(v), ValueKind::Float8) => Ok(Value::Float8(*v as f64)),
            (Value::Float4(v), ValueKind::Float8) => Ok(Value::Float8(f64::from(*v))),
            (Value::Text(s), ValueKind::Uuid) => match Uuid::parse_str(s) {
                Ok(u) => Ok(Value::Uuid(u)),
                Err(_) => fail(&self),
            },
            (Value::Int2(v), ValueKind::Text) => Ok(Value::Text(v.to_string())),
            (Value::Int4(v), ValueKind::Text) => Ok(Value::Text(v.to_string())),
            (Value::Int8(v), ValueKind::Text) => Ok(Value::Text(v.to_string())),
            _ => fail(&self),
        }
    }
}

/// Conversion into a bind [`Value`], for ergonomic builder arguments.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

macro_rules! into_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(impl IntoValue for $ty {
            fn into_value(self) -> Value {
                Value::$variant(self)
            }
        })*
    };
}

into_value! {
    bool => Bool,
    i16 => Int2,
    i32 => Int4,
    i64 => Int8,
    f32 => Float4,
    f64 => Float8,
    String => Text,
    Vec<u8> => Bytes,
    Uuid => Uuid,
    NaiveDate => Date,
    NaiveDateTime => Timestamp,
    serde_json::Value => Json,
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::Text(self.to_string())
    }
}

impl IntoValue for DateTime<Utc> {
    fn into_value(self) -> Value {
        Value::TimestampTz(self)
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => Value::Null,
        }
    }
}

/// Typed extraction out of a result [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, String>;
}

macro_rules! from_value {
    ($($ty:ty { $($pat:pat => $expr:expr),* $(,)? })*) => {
        $(impl FromValue for $ty {
            fn from_value(value: &Value) -> Result<Self, String> {
                match value {
                    $($pat => $expr,)*
                    other => Err(format!(
                        "expected {}, got {:?}",
                        stringify!($ty),
                        other
                    )),
                }
            }
        })*
    };
}

from_value! {
    bool { Value::Bool(v) => Ok(*v) }
    i16 { Value::Int2(v) => Ok(*v) }
    i32 {
        Value::Int4(v) => Ok(*v),
        Value::Int2(v) => Ok(i32::from(*v)),
    }
    i64 {
        Value::Int8(v) => Ok(*v),
        Value::Int4(v) => Ok(i64::from(*v)),
        Value::Int2(v) => Ok(i64::from(*v)),
    }
    f32 { Value::Float4(v) => Ok(*v) }
    f64 {
        Value::Float8(v) => Ok(*v),
        Value::Float4(v) => Ok(f64::from(*v)),
    }
    String { Value::Text(v) => Ok(v.clone()) }
    Vec<u8> { Value::Bytes(v) => Ok(v.clone()) }
    Uuid { Value::Uuid(v) => Ok(*v) }
    NaiveDate { Value::Date(v) => Ok(*v) }
    NaiveDateTime { Value::Timestamp(v) => Ok(*v) }
    DateTime<Utc> { Value::TimestampTz(v) => Ok(*v) }
    serde_json::Value { Value::Json(v) => Ok(v.clone()) }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, String> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, String> {
        Ok(value.clone())
    }
}
