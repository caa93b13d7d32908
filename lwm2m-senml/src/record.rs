//! SenML Record types and values

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};

use crate::{Result, SenMLError};

/// Numeric SenML value.
///
/// JSON and CBOR both distinguish integers from floating point numbers, and
/// LwM2M payloads rely on that: an unsigned 64-bit counter does not survive a
/// trip through `f64`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SenMLNumber {
    /// Signed integer
    Integer(i64),
    /// Unsigned integer above `i64::MAX`
    Unsigned(u64),
    /// Floating point number
    Float(f64),
}

impl SenMLNumber {
    /// Lossy conversion to `f64`
    pub fn as_f64(&self) -> f64 {
        match *self {
            SenMLNumber::Integer(i) => i as f64,
            SenMLNumber::Unsigned(u) => u as f64,
            SenMLNumber::Float(f) => f,
        }
    }

    /// Whether the number is finite (integers always are)
    pub fn is_finite(&self) -> bool {
        match self {
            SenMLNumber::Float(f) => f.is_finite(),
            _ => true,
        }
    }

    /// Add two numbers, staying in integer arithmetic when both sides allow it.
    pub fn add(self, other: SenMLNumber) -> SenMLNumber {
        match (self, other) {
            (SenMLNumber::Integer(a), SenMLNumber::Integer(b)) => a
                .checked_add(b)
                .map(SenMLNumber::Integer)
                .unwrap_or(SenMLNumber::Float(a as f64 + b as f64)),
            (a, b) => SenMLNumber::Float(a.as_f64() + b.as_f64()),
        }
    }
}

impl From<i64> for SenMLNumber {
    fn from(value: i64) -> Self {
        SenMLNumber::Integer(value)
    }
}

impl From<u64> for SenMLNumber {
    fn from(value: u64) -> Self {
        i64::try_from(value)
            .map(SenMLNumber::Integer)
            .unwrap_or(SenMLNumber::Unsigned(value))
    }
}

impl From<f64> for SenMLNumber {
    fn from(value: f64) -> Self {
        SenMLNumber::Float(value)
    }
}

impl fmt::Display for SenMLNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SenMLNumber::Integer(i) => write!(f, "{i}"),
            SenMLNumber::Unsigned(u) => write!(f, "{u}"),
            SenMLNumber::Float(v) => write!(f, "{v}"),
        }
    }
}

/// A SenML Record as used by LwM2M.
///
/// Carries the RFC 8428 base fields LwM2M relies on (`bn`, `bt`), the regular
/// fields (`n`, `t`, `v`, `vs`, `vb`, `vd`) and the LwM2M `vlo` extension for
/// object links (`"objectId:instanceId"`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SenMLRecord {
    /// Base Name - prepended to this and following record names
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bn: Option<String>,

    /// Base Time - added to this and following record times
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bt: Option<SenMLNumber>,

    /// Name - relative to the current base name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// Time - relative to the current base time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<SenMLNumber>,

    /// Value - numeric value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub v: Option<SenMLNumber>,

    /// String Value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vs: Option<String>,

    /// Boolean Value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vb: Option<bool>,

    /// Data Value - base64url in JSON, byte string in CBOR
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "data_value"
    )]
    pub vd: Option<Vec<u8>>,

    /// Object Link Value (LwM2M extension)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlo: Option<String>,
}

/// Union type for SenML values
#[derive(Debug, Clone, PartialEq)]
pub enum SenMLValue {
    /// Numeric value
    Number(SenMLNumber),
    /// String value
    String(String),
    /// Boolean value
    Boolean(bool),
    /// Binary data
    Data(Vec<u8>),
    /// Object link, `"objectId:instanceId"`
    ObjectLink(String),
}

impl SenMLRecord {
    /// Create a new empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base name of this record
    pub fn with_base_name<S: Into<String>>(mut self, base_name: S) -> Self {
        self.bn = Some(base_name.into());
        self
    }

    /// Set the base time of this record
    pub fn with_base_time<N: Into<SenMLNumber>>(mut self, base_time: N) -> Self {
        self.bt = Some(base_time.into());
        self
    }

    /// Set the name of this record
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.n = Some(name.into());
        self
    }

    /// Set the time of this record
    pub fn with_time<N: Into<SenMLNumber>>(mut self, time: N) -> Self {
        self.t = Some(time.into());
        self
    }

    /// Set the value of this record, replacing any previous value field
    pub fn with_value(mut self, value: SenMLValue) -> Self {
        self.set_value(value);
        self
    }

    /// Replace the value of this record
    pub fn set_value(&mut self, value: SenMLValue) {
        self.v = None;
        self.vs = None;
        self.vb = None;
        self.vd = None;
        self.vlo = None;
        match value {
            SenMLValue::Number(n) => self.v = Some(n),
            SenMLValue::String(s) => self.vs = Some(s),
            SenMLValue::Boolean(b) => self.vb = Some(b),
            SenMLValue::Data(d) => self.vd = Some(d),
            SenMLValue::ObjectLink(l) => self.vlo = Some(l),
        }
    }

    /// Get the value carried by this record
    pub fn value(&self) -> Option<SenMLValue> {
        if let Some(v) = self.v {
            Some(SenMLValue::Number(v))
        } else if let Some(ref vs) = self.vs {
            Some(SenMLValue::String(vs.clone()))
        } else if let Some(vb) = self.vb {
            Some(SenMLValue::Boolean(vb))
        } else if let Some(ref vd) = self.vd {
            Some(SenMLValue::Data(vd.clone()))
        } else {
            self.vlo.as_ref().map(|l| SenMLValue::ObjectLink(l.clone()))
        }
    }

    /// Number of value fields present
    pub fn value_count(&self) -> usize {
        [
            self.v.is_some(),
            self.vs.is_some(),
            self.vb.is_some(),
            self.vd.is_some(),
            self.vlo.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }

    /// Check if this record has a value
    pub fn has_value(&self) -> bool {
        self.value_count() > 0
    }

    /// Validate this record.
    ///
    /// A record carries at most one value field. When `allow_no_value` is false
    /// it must carry exactly one; name-only records are used for path lists.
    pub fn validate(&self, allow_no_value: bool) -> Result<()> {
        match self.value_count() {
            0 if !allow_no_value => {
                return Err(SenMLError::validation(
                    "Record must have a value field (v, vs, vb, vd or vlo)",
                ));
            }
            0 | 1 => {}
            _ => {
                return Err(SenMLError::validation(
                    "Record must not have more than one value field",
                ));
            }
        }

        for (field, number) in [("bt", self.bt), ("t", self.t), ("v", self.v)] {
            if let Some(number) = number {
                if !number.is_finite() {
                    return Err(SenMLError::invalid_field_value(field, number.to_string().as_str()));
                }
            }
        }

        Ok(())
    }
}

impl From<SenMLValue> for SenMLRecord {
    fn from(value: SenMLValue) -> Self {
        SenMLRecord::new().with_value(value)
    }
}

/// Decode a SenML data value.
///
/// RFC 8428 mandates base64url without padding; the standard alphabet and
/// trailing padding are tolerated on input.
pub fn decode_data(encoded: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    let trimmed = encoded.trim_end_matches('=');
    if trimmed.contains(['+', '/']) {
        STANDARD_NO_PAD.decode(trimmed)
    } else {
        URL_SAFE_NO_PAD.decode(trimmed)
    }
}

/// Encode a SenML data value as base64url without padding.
pub fn encode_data(data: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

mod data_value {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_str(&super::encode_data(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|e| super::decode_data(&e).map_err(serde::de::Error::custom))
            .transpose()
    }
}
