use crate::{Config, Error, Result, Value, ValueKind, ZERO_TIMESTAMP, truncate_long};
use atoi::FromRadix10SignedChecked;
use rust_decimal::Decimal;
use serde::{Serialize, de::DeserializeOwned};
use std::{
    any,
    collections::{BTreeMap, HashMap},
    str::{self, FromStr},
};
use time::PrimitiveDateTime;
use uuid::Uuid;

/// Conversion between a Rust field type and the dynamically typed [`Value`].
///
/// `as_value` reads the current value of a field, it is compared against the field
/// null sentinel and bound as a statement parameter. `decode` turns the raw bytes
/// of a scanned column into the field type, `None` being SQL `NULL`.
///
/// # Decoding contract
/// - Scalars never fail: malformed text decodes to the zero value and logs a warning.
/// - `String` decodes `NULL` into the empty string.
/// - Structured kinds (maps, lists, JSON) are JSON decoded and return
///   [`Error::Scan`] when the payload is not valid for the type.
/// - `Option<T>` decodes `NULL` into `None`, everything else through `T`.
pub trait AsValue: Sized {
    /// Scalar kind, decides the default null sentinel and how literals are parsed.
    const KIND: ValueKind;
    /// Nullable wrappers have `Value::Null` as null sentinel.
    const NULLABLE: bool = false;

    fn as_value(&self) -> Value;

    fn decode(raw: Option<&[u8]>, config: &Config) -> Result<Self>;
}

impl<T: AsValue> From<T> for Value {
    fn from(value: T) -> Self {
        value.as_value()
    }
}

fn lossy<T: Default>(raw: &[u8], reason: impl std::fmt::Display) -> T {
    log::warn!(
        "Cannot decode `{}` as {}, using the default value: {reason}",
        truncate_long!(String::from_utf8_lossy(raw)),
        any::type_name::<T>(),
    );
    T::default()
}

macro_rules! impl_as_value_int {
    ($source:ty, $variant:path, $kind:ident, $wide:ty) => {
        impl AsValue for $source {
            const KIND: ValueKind = ValueKind::$kind {
                bits: <$source>::BITS as u8,
            };
            fn as_value(&self) -> Value {
                $variant(*self as $wide)
            }
            fn decode(raw: Option<&[u8]>, _config: &Config) -> Result<Self> {
                let Some(raw) = raw else {
                    return Ok(0);
                };
                match <$source>::from_radix_10_signed_checked(raw) {
                    (Some(v), used) if used == raw.len() && used > 0 => Ok(v),
                    _ => Ok(lossy(raw, "not an integer in range")),
                }
            }
        }
    };
}
impl_as_value_int!(i8, Value::Int, Int, i64);
impl_as_value_int!(i16, Value::Int, Int, i64);
impl_as_value_int!(i32, Value::Int, Int, i64);
impl_as_value_int!(i64, Value::Int, Int, i64);
impl_as_value_int!(u8, Value::UInt, UInt, u64);
impl_as_value_int!(u16, Value::UInt, UInt, u64);
impl_as_value_int!(u32, Value::UInt, UInt, u64);
impl_as_value_int!(u64, Value::UInt, UInt, u64);

macro_rules! impl_as_value_float {
    ($source:ty, $bits:literal) => {
        impl AsValue for $source {
            const KIND: ValueKind = ValueKind::Float { bits: $bits };
            fn as_value(&self) -> Value {
                Value::Float(*self as f64)
            }
            fn decode(raw: Option<&[u8]>, _config: &Config) -> Result<Self> {
                let Some(raw) = raw else {
                    return Ok(0.0);
                };
                match fast_float::parse::<$source, _>(raw) {
                    Ok(v) => Ok(v),
                    Err(e) => Ok(lossy(raw, e)),
                }
            }
        }
    };
}
impl_as_value_float!(f32, 32);
impl_as_value_float!(f64, 64);

impl AsValue for bool {
    const KIND: ValueKind = ValueKind::Boolean;
    fn as_value(&self) -> Value {
        Value::Boolean(*self)
    }
    fn decode(raw: Option<&[u8]>, _config: &Config) -> Result<Self> {
        Ok(matches!(raw, Some(b"1" | b"true" | b"TRUE")))
    }
}

impl AsValue for String {
    const KIND: ValueKind = ValueKind::Varchar;
    fn as_value(&self) -> Value {
        Value::Varchar(self.clone())
    }
    fn decode(raw: Option<&[u8]>, _config: &Config) -> Result<Self> {
        Ok(raw
            .map(|v| String::from_utf8_lossy(v).into_owned())
            .unwrap_or_default())
    }
}

impl AsValue for Decimal {
    const KIND: ValueKind = ValueKind::Decimal;
    fn as_value(&self) -> Value {
        Value::Decimal(*self)
    }
    fn decode(raw: Option<&[u8]>, _config: &Config) -> Result<Self> {
        let Some(raw) = raw else {
            return Ok(Decimal::ZERO);
        };
        match str::from_utf8(raw)
            .map_err(|e| e.to_string())
            .and_then(|v| Decimal::from_str(v).map_err(|e| e.to_string()))
        {
            Ok(v) => Ok(v),
            Err(e) => Ok(lossy(raw, e)),
        }
    }
}

impl AsValue for Uuid {
    const KIND: ValueKind = ValueKind::Uuid;
    fn as_value(&self) -> Value {
        Value::Uuid(*self)
    }
    fn decode(raw: Option<&[u8]>, _config: &Config) -> Result<Self> {
        let Some(raw) = raw else {
            return Ok(Uuid::nil());
        };
        if let Ok(v) = Uuid::from_slice(raw) {
            return Ok(v);
        }
        match Uuid::try_parse_ascii(raw) {
            Ok(v) => Ok(v),
            Err(e) => Ok(lossy(raw, e)),
        }
    }
}

impl AsValue for PrimitiveDateTime {
    const KIND: ValueKind = ValueKind::Timestamp;
    fn as_value(&self) -> Value {
        Value::Timestamp(*self)
    }
    fn decode(raw: Option<&[u8]>, config: &Config) -> Result<Self> {
        let Some(raw) = raw else {
            return Ok(ZERO_TIMESTAMP);
        };
        let parsed = str::from_utf8(raw)
            .map_err(|e| e.to_string())
            .and_then(|v| {
                PrimitiveDateTime::parse(v, &config.datetime_format).map_err(|e| e.to_string())
            });
        match parsed {
            Ok(v) => Ok(v),
            Err(e) => {
                log::warn!(
                    "Cannot decode `{}` as a timestamp, using the zero timestamp: {e}",
                    truncate_long!(String::from_utf8_lossy(raw)),
                );
                Ok(ZERO_TIMESTAMP)
            }
        }
    }
}

fn decode_json<T: DeserializeOwned>(raw: &[u8]) -> Result<T> {
    serde_json::from_slice(raw).map_err(|e| Error::Scan {
        column: String::new(),
        reason: format!("{} ({})", e, any::type_name::<T>()),
    })
}

fn encode_json<T: Serialize>(value: &T, empty: serde_json::Value) -> Value {
    match serde_json::to_value(value) {
        Ok(v) => Value::Json(v),
        Err(e) => {
            log::error!("{:#}", e);
            Value::Json(empty)
        }
    }
}

impl AsValue for serde_json::Value {
    const KIND: ValueKind = ValueKind::Json;
    fn as_value(&self) -> Value {
        match self {
            serde_json::Value::Null => Value::Null,
            v => Value::Json(v.clone()),
        }
    }
    fn decode(raw: Option<&[u8]>, _config: &Config) -> Result<Self> {
        match raw {
            None => Ok(serde_json::Value::Null),
            Some(v) if v.is_empty() => Ok(serde_json::Value::Null),
            Some(v) => decode_json(v),
        }
    }
}

impl<T: Serialize + DeserializeOwned> AsValue for Vec<T> {
    const KIND: ValueKind = ValueKind::List;
    fn as_value(&self) -> Value {
        encode_json(self, serde_json::Value::Array(Vec::new()))
    }
    fn decode(raw: Option<&[u8]>, _config: &Config) -> Result<Self> {
        match raw {
            None => Ok(Vec::new()),
            Some(v) if v.is_empty() => Ok(Vec::new()),
            Some(v) => decode_json(v),
        }
    }
}

macro_rules! impl_as_value_map {
    ($map:ident) => {
        impl<V: Serialize + DeserializeOwned> AsValue for $map<String, V> {
            const KIND: ValueKind = ValueKind::Map;
            fn as_value(&self) -> Value {
                encode_json(self, serde_json::Value::Object(Default::default()))
            }
            fn decode(raw: Option<&[u8]>, _config: &Config) -> Result<Self> {
                match raw {
                    None => Ok($map::new()),
                    Some(v) if v.is_empty() => Ok($map::new()),
                    Some(v) => decode_json(v),
                }
            }
        }
    };
}
impl_as_value_map!(HashMap);
impl_as_value_map!(BTreeMap);

impl<T: AsValue> AsValue for Option<T> {
    const KIND: ValueKind = T::KIND;
    const NULLABLE: bool = true;
    fn as_value(&self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => Value::Null,
        }
    }
    fn decode(raw: Option<&[u8]>, config: &Config) -> Result<Self> {
        match raw {
            None => Ok(None),
            Some(..) => T::decode(raw, config).map(Some),
        }
    }
}
