//! Value conversion between the type a value carries and the type the model
//! declares for its resource.

use std::sync::Arc;

use time::OffsetDateTime;
use time::format_description::well_known::{Iso8601, Rfc3339};

use crate::error::{CodecError, Result};
use crate::helper::{whole_f64_to_i64, whole_f64_to_u64};
use crate::model::ResourceType;
use crate::node::Value;
use crate::path::LwM2mPath;

/// Converts a value to the type expected at `path`.
pub trait ValueConverter: Send + Sync {
    /// `expected` is `None` when the model does not know the resource; the
    /// value is then returned as is.
    fn convert(&self, value: Value, expected: Option<ResourceType>, path: &LwM2mPath) -> Result<Value>;
}

/// Which built-in converter to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConverterPolicy {
    /// Reject any type mismatch
    Strict,
    /// Apply the documented coercions
    #[default]
    Lenient,
}

impl ConverterPolicy {
    pub fn converter(&self) -> Arc<dyn ValueConverter> {
        match self {
            ConverterPolicy::Strict => Arc::new(StrictValueConverter),
            ConverterPolicy::Lenient => Arc::new(LenientValueConverter),
        }
    }
}

/// Accepts values already of the expected type and nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictValueConverter;

impl ValueConverter for StrictValueConverter {
    fn convert(&self, value: Value, expected: Option<ResourceType>, path: &LwM2mPath) -> Result<Value> {
        match expected {
            Some(expected) if value.kind() != expected => {
                Err(CodecError::conversion(&value, expected, *path))
            }
            _ => Ok(value),
        }
    }
}

/// Coerces between representations when the conversion loses nothing.
///
/// | from             | to      | rule                                        |
/// |------------------|---------|---------------------------------------------|
/// | string           | boolean | `"true"` / `"false"`, any case              |
/// | integer          | boolean | `0` / `1`                                   |
/// | boolean          | integer | `false` = 0, `true` = 1                     |
/// | integer          | time    | milliseconds since the epoch                |
/// | string           | time    | ISO-8601                                    |
/// | bool, int, float | string  | plain decimal, no exponent                  |
/// | string           | opaque  | hexadecimal, even length                    |
/// | float            | integer | no fractional part and in range             |
/// | integer          | float   | always                                      |
/// | int, unsigned    | each other | when in range                            |
#[derive(Debug, Clone, Copy, Default)]
pub struct LenientValueConverter;

impl ValueConverter for LenientValueConverter {
    fn convert(&self, value: Value, expected: Option<ResourceType>, path: &LwM2mPath) -> Result<Value> {
        let Some(expected) = expected else {
            return Ok(value);
        };
        if value.kind() == expected {
            return Ok(value);
        }

        let converted = match (&value, expected) {
            (Value::String(s), ResourceType::Boolean) => {
                if s.eq_ignore_ascii_case("true") {
                    Some(Value::Boolean(true))
                } else if s.eq_ignore_ascii_case("false") {
                    Some(Value::Boolean(false))
                } else {
                    None
                }
            }
            (Value::Integer(0), ResourceType::Boolean) => Some(Value::Boolean(false)),
            (Value::Integer(1), ResourceType::Boolean) => Some(Value::Boolean(true)),
            (Value::Boolean(b), ResourceType::Integer) => Some(Value::Integer(i64::from(*b))),

            (Value::Integer(millis), ResourceType::Time) => {
                OffsetDateTime::from_unix_timestamp_nanos(i128::from(*millis) * 1_000_000)
                    .ok()
                    .map(Value::Time)
            }
            (Value::String(s), ResourceType::Time) => parse_iso8601(s).map(Value::Time),

            (Value::Boolean(_) | Value::Integer(_) | Value::UnsignedInteger(_), ResourceType::String) => {
                Some(Value::String(value.to_string()))
            }
            (Value::Float(f), ResourceType::String) if f.is_finite() => Some(Value::String(f.to_string())),

            (Value::String(s), ResourceType::Opaque) => {
                let bytes = hex::decode(s)
                    .map_err(|e| CodecError::invalid_literal_with("hex", s.as_str(), e))?;
                Some(Value::Opaque(bytes))
            }

            (Value::Float(f), ResourceType::Integer) => whole_f64_to_i64(*f).map(Value::Integer),
            (Value::Float(f), ResourceType::UnsignedInteger) => {
                whole_f64_to_u64(*f).map(Value::UnsignedInteger)
            }
            (Value::Integer(i), ResourceType::Float) => Some(Value::Float(*i as f64)),
            (Value::UnsignedInteger(u), ResourceType::Float) => Some(Value::Float(*u as f64)),
            (Value::Integer(i), ResourceType::UnsignedInteger) => {
                u64::try_from(*i).ok().map(Value::UnsignedInteger)
            }
            (Value::UnsignedInteger(u), ResourceType::Integer) => i64::try_from(*u).ok().map(Value::Integer),
            _ => None,
        };

        converted.ok_or_else(|| CodecError::conversion(&value, expected, *path))
    }
}

fn parse_iso8601(s: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(s, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(s, &Iso8601::DEFAULT))
        .ok()
}
