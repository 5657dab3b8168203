use crate::{Error, Result, truncate_long};
use rust_decimal::Decimal;
use std::{fmt, str::FromStr};
use time::{PrimitiveDateTime, macros::datetime};
use uuid::Uuid;

/// Dynamically typed value flowing through sentinel comparisons and query parameters.
///
/// Equality is typed: `Int(0)` and `UInt(0)` are different values.
#[derive(Default, Debug, Clone, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Decimal(Decimal),
    Varchar(String),
    Timestamp(PrimitiveDateTime),
    Uuid(Uuid),
    Json(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::Varchar(v) => write!(f, "'{}'", truncate_long!(v)),
            Value::Timestamp(v) => write!(f, "'{v}'"),
            Value::Uuid(v) => write!(f, "'{v}'"),
            Value::Json(v) => write!(f, "'{v}'"),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Varchar(value.into())
    }
}

/// Scalar kind of a registered field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Boolean,
    Int { bits: u8 },
    UInt { bits: u8 },
    Float { bits: u8 },
    Decimal,
    Varchar,
    Timestamp,
    Uuid,
    /// String keyed object stored as a JSON document.
    Map,
    /// Sequence stored as a JSON array.
    List,
    /// Free form JSON document.
    Json,
}

/// Timestamp used as "absent" for timestamp fields.
pub const ZERO_TIMESTAMP: PrimitiveDateTime = datetime!(0001-01-01 0:00);

impl ValueKind {
    /// The default null sentinel of this kind.
    pub fn zero(&self) -> Value {
        match self {
            ValueKind::Boolean => Value::Boolean(false),
            ValueKind::Int { .. } => Value::Int(0),
            ValueKind::UInt { .. } => Value::UInt(0),
            ValueKind::Float { .. } => Value::Float(0.0),
            ValueKind::Decimal => Value::Decimal(Decimal::ZERO),
            ValueKind::Varchar => Value::Varchar(String::new()),
            ValueKind::Timestamp => Value::Timestamp(ZERO_TIMESTAMP),
            ValueKind::Uuid => Value::Uuid(Uuid::nil()),
            ValueKind::Map => Value::Json(serde_json::Value::Object(Default::default())),
            ValueKind::List => Value::Json(serde_json::Value::Array(Vec::new())),
            ValueKind::Json => Value::Null,
        }
    }

    /// Parse a literal written in a model attribute (alternate, null or clear sentinel).
    pub fn parse_literal(&self, literal: &str) -> Result<Value> {
        let error = || {
            Error::Extraction(format!(
                "literal `{}` is not a valid {:?} value",
                truncate_long!(literal),
                self
            ))
        };
        let text = literal.trim();
        Ok(match self {
            ValueKind::Boolean => match text {
                "1" | "true" | "TRUE" => Value::Boolean(true),
                "0" | "false" | "FALSE" => Value::Boolean(false),
                _ => return Err(error()),
            },
            ValueKind::Int { .. } => Value::Int(text.parse().map_err(|_| error())?),
            ValueKind::UInt { .. } => Value::UInt(text.parse().map_err(|_| error())?),
            ValueKind::Float { .. } => Value::Float(text.parse().map_err(|_| error())?),
            ValueKind::Decimal => Value::Decimal(Decimal::from_str(text).map_err(|_| error())?),
            ValueKind::Varchar => Value::Varchar(literal.to_owned()),
            ValueKind::Timestamp => {
                Value::Timestamp(
                    PrimitiveDateTime::parse(text, crate::DEFAULT_DATETIME_FORMAT)
                        .map_err(|_| error())?,
                )
            }
            ValueKind::Uuid => Value::Uuid(Uuid::parse_str(text).map_err(|_| error())?),
            ValueKind::Map | ValueKind::List | ValueKind::Json => {
                Value::Json(serde_json::from_str(text).map_err(|_| error())?)
            }
        })
    }
}
