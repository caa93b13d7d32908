//! Conversions between wire numbers and typed values, shared by the text-based
//! codecs.

use lwm2m_senml::SenMLNumber;
use time::OffsetDateTime;

use crate::error::{CodecError, Result};
use crate::model::ResourceType;
use crate::node::Value;
use crate::path::LwM2mPath;

const NANOS_PER_MILLI: i128 = 1_000_000;

/// Drop precision below the millisecond.
pub fn truncate_to_millis(time: OffsetDateTime) -> OffsetDateTime {
    let nanos = time.unix_timestamp_nanos();
    let truncated = nanos - nanos.rem_euclid(NANOS_PER_MILLI);
    OffsetDateTime::from_unix_timestamp_nanos(truncated).unwrap_or(time)
}

/// Time from a number of seconds since the epoch, rounded to the millisecond.
pub fn seconds_to_time(seconds: SenMLNumber) -> Result<OffsetDateTime> {
    let invalid = || CodecError::invalid_literal("time", seconds.to_string());
    match seconds {
        SenMLNumber::Integer(s) => OffsetDateTime::from_unix_timestamp(s).map_err(|_| invalid()),
        SenMLNumber::Unsigned(s) => i64::try_from(s)
            .ok()
            .and_then(|s| OffsetDateTime::from_unix_timestamp(s).ok())
            .ok_or_else(invalid),
        SenMLNumber::Float(s) => {
            if !s.is_finite() {
                return Err(invalid());
            }
            let millis = (s * 1000.0).round();
            if millis.abs() > i64::MAX as f64 {
                return Err(invalid());
            }
            OffsetDateTime::from_unix_timestamp_nanos(millis as i128 * NANOS_PER_MILLI)
                .map_err(|_| invalid())
        }
    }
}

/// Seconds since the epoch; an integer unless the time carries milliseconds.
pub fn time_to_seconds(time: OffsetDateTime) -> SenMLNumber {
    let time = truncate_to_millis(time);
    if time.millisecond() == 0 {
        SenMLNumber::Integer(time.unix_timestamp())
    } else {
        let millis = time.unix_timestamp_nanos() / NANOS_PER_MILLI;
        SenMLNumber::Float(millis as f64 / 1000.0)
    }
}

/// Difference `time - base` in seconds, in the same form as [`time_to_seconds`].
pub fn seconds_between(time: OffsetDateTime, base: OffsetDateTime) -> SenMLNumber {
    let millis = (truncate_to_millis(time) - truncate_to_millis(base)).whole_milliseconds();
    if millis % 1000 == 0 {
        match i64::try_from(millis / 1000) {
            Ok(seconds) => SenMLNumber::Integer(seconds),
            Err(_) => SenMLNumber::Float(millis as f64 / 1000.0),
        }
    } else {
        SenMLNumber::Float(millis as f64 / 1000.0)
    }
}

/// Typed value for a wire number.
///
/// Without an expected type the number keeps its own representation. With
/// one, the number must fit it exactly; types a number cannot carry fail.
pub fn number_to_value(number: SenMLNumber, expected: Option<ResourceType>, path: &LwM2mPath) -> Result<Value> {
    let raw = match number {
        SenMLNumber::Integer(i) => Value::Integer(i),
        SenMLNumber::Unsigned(u) => Value::UnsignedInteger(u),
        SenMLNumber::Float(f) => Value::Float(f),
    };
    let Some(expected) = expected else {
        return Ok(raw);
    };

    let converted = match (expected, number) {
        (ResourceType::Integer, SenMLNumber::Integer(i)) => Some(Value::Integer(i)),
        (ResourceType::Integer, SenMLNumber::Unsigned(u)) => i64::try_from(u).ok().map(Value::Integer),
        (ResourceType::Integer, SenMLNumber::Float(f)) => whole_f64_to_i64(f).map(Value::Integer),
        (ResourceType::UnsignedInteger, SenMLNumber::Integer(i)) => {
            u64::try_from(i).ok().map(Value::UnsignedInteger)
        }
        (ResourceType::UnsignedInteger, SenMLNumber::Unsigned(u)) => Some(Value::UnsignedInteger(u)),
        (ResourceType::UnsignedInteger, SenMLNumber::Float(f)) => {
            whole_f64_to_u64(f).map(Value::UnsignedInteger)
        }
        (ResourceType::Float, n) => Some(Value::Float(n.as_f64())),
        (ResourceType::Time, n) => Some(Value::Time(seconds_to_time(n)?)),
        _ => None,
    };
    converted.ok_or_else(|| CodecError::conversion(&raw, expected, *path))
}

/// Wire number for a numeric or time value; `None` for other types.
pub fn value_to_number(value: &Value) -> Option<SenMLNumber> {
    match value {
        Value::Integer(i) => Some(SenMLNumber::Integer(*i)),
        Value::UnsignedInteger(u) => Some(SenMLNumber::from(*u)),
        Value::Float(f) => Some(SenMLNumber::Float(*f)),
        Value::Time(t) => Some(time_to_seconds(*t)),
        _ => None,
    }
}

/// `f` as an `i64` when it has no fractional part and fits.
pub fn whole_f64_to_i64(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, which is already out of range
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

/// `f` as a `u64` when it has no fractional part and fits.
pub fn whole_f64_to_u64(f: f64) -> Option<u64> {
    if f.is_finite() && f.fract() == 0.0 && f >= 0.0 && f < u64::MAX as f64 {
        Some(f as u64)
    } else {
        None
    }
}
