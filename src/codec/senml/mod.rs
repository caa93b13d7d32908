//! SenML JSON and SenML CBOR (RFC 8428) as profiled by LwM2M 1.1.
//!
//! Both encodings share the record model of `lwm2m-senml`; only the byte
//! representation differs, so one decoder and one encoder serve both and
//! carry the [`SenMLFormat`] they read and write.

mod decoder;
mod encoder;

pub use decoder::SenMLNodeDecoder;
pub use encoder::SenMLNodeEncoder;

use lwm2m_senml::{SenMLNumber, SenMLPack, SenMLValue};

use crate::content_format::ContentFormat;
use crate::error::{CodecError, Result};
use crate::helper::time_to_seconds;
use crate::node::Value;
use crate::path::LwM2mPath;

/// Byte encoding of a SenML pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SenMLFormat {
    Json,
    Cbor,
}

impl SenMLFormat {
    pub fn content_format(&self) -> ContentFormat {
        match self {
            SenMLFormat::Json => ContentFormat::SENML_JSON,
            SenMLFormat::Cbor => ContentFormat::SENML_CBOR,
        }
    }

    /// Parse a pack; an empty payload is the empty pack.
    pub(crate) fn parse(&self, content: &[u8], path: Option<LwM2mPath>) -> Result<SenMLPack> {
        if content.is_empty() {
            return Ok(SenMLPack::new());
        }
        let pack = match self {
            SenMLFormat::Json => SenMLPack::from_json_bytes(content),
            SenMLFormat::Cbor => SenMLPack::from_cbor(content),
        };
        pack.map_err(|e| CodecError::format(format!("unable to parse {} content", self), path, e))
    }

    pub(crate) fn serialize(&self, pack: &SenMLPack, path: Option<LwM2mPath>) -> Result<Vec<u8>> {
        let bytes = match self {
            SenMLFormat::Json => pack.to_json_bytes(),
            SenMLFormat::Cbor => pack.to_cbor(),
        };
        bytes.map_err(|e| CodecError::format(format!("unable to serialize {} content", self), path, e))
    }
}

impl std::fmt::Display for SenMLFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SenMLFormat::Json => write!(f, "SenML JSON"),
            SenMLFormat::Cbor => write!(f, "SenML CBOR"),
        }
    }
}

/// Record value for a typed value; time travels as seconds.
pub(crate) fn to_senml_value(value: Value) -> SenMLValue {
    match value {
        Value::String(s) => SenMLValue::String(s),
        Value::Integer(i) => SenMLValue::Number(SenMLNumber::Integer(i)),
        Value::UnsignedInteger(u) => SenMLValue::Number(SenMLNumber::from(u)),
        Value::Float(f) => SenMLValue::Number(SenMLNumber::Float(f)),
        Value::Boolean(b) => SenMLValue::Boolean(b),
        Value::Opaque(bytes) => SenMLValue::Data(bytes),
        Value::Time(t) => SenMLValue::Number(time_to_seconds(t)),
        Value::ObjectLink(link) => SenMLValue::ObjectLink(link.to_string()),
    }
}
