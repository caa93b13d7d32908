//! OMA TLV binary format.
//!
//! Each entry is laid out as:
//!
//! ```text
//! +-----------+---------------+----------------+-------------+
//! | type byte | id (1|2 byte) | length (0..=3) | value/items |
//! +-----------+---------------+----------------+-------------+
//!
//! type byte: KK I LL VVV
//!   KK   00 object instance, 01 resource instance,
//!        10 multiple resource, 11 resource value
//!   I    identifier is 16 bits
//!   LL   00 length in VVV, 01 8 bits, 10 16 bits, 11 24 bits
//! ```
//!
//! Object instance and multiple resource entries hold nested entries; the two
//! others hold a primitive value.

mod decoder;
mod encoder;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::{trace, warn};

use crate::node::ObjectLink;

pub use decoder::TlvNodeDecoder;
pub use encoder::{InstanceMode, TlvNodeEncoder};

const KIND_MASK: u8 = 0b1100_0000;
const ID16_FLAG: u8 = 0b0010_0000;
const LENGTH_TYPE_MASK: u8 = 0b0001_1000;
const INLINE_LENGTH_MASK: u8 = 0b0000_0111;

/// Largest value a 24-bit length can carry.
pub const MAX_LENGTH: usize = 0xFF_FFFF;

/// Byte-grammar failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TlvError {
    #[error("truncated identifier at offset {offset}")]
    TruncatedIdentifier { offset: usize },

    #[error("truncated length at offset {offset}")]
    TruncatedLength { offset: usize },

    #[error("value of {length} bytes at offset {offset} exceeds the {available} remaining bytes")]
    TruncatedValue {
        offset: usize,
        length: usize,
        available: usize,
    },

    #[error("value length {length} does not fit in 24 bits")]
    LengthOverflow { length: usize },

    #[error("invalid length {length} for {kind} value")]
    InvalidWidth { kind: &'static str, length: usize },

    #[error("string value is not valid UTF-8")]
    InvalidString,
}

type TlvResult<T> = std::result::Result<T, TlvError>;

/// Kind of a TLV entry, from the two high bits of its type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TlvType {
    ObjectInstance,
    ResourceInstance,
    MultipleResource,
    ResourceValue,
}

impl TlvType {
    fn from_type_byte(byte: u8) -> Self {
        match byte & KIND_MASK {
            0b0000_0000 => TlvType::ObjectInstance,
            0b0100_0000 => TlvType::ResourceInstance,
            0b1000_0000 => TlvType::MultipleResource,
            _ => TlvType::ResourceValue,
        }
    }

    fn bits(&self) -> u8 {
        match self {
            TlvType::ObjectInstance => 0b0000_0000,
            TlvType::ResourceInstance => 0b0100_0000,
            TlvType::MultipleResource => 0b1000_0000,
            TlvType::ResourceValue => 0b1100_0000,
        }
    }

    /// Whether entries of this kind hold nested entries rather than a value.
    pub fn is_container(&self) -> bool {
        matches!(self, TlvType::ObjectInstance | TlvType::MultipleResource)
    }
}

/// Payload of an entry.
#[derive(Debug, Clone, PartialEq)]
pub enum TlvContent {
    Value(Vec<u8>),
    Children(Vec<Tlv>),
}

/// One decoded TLV entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Tlv {
    pub kind: TlvType,
    pub id: u16,
    pub content: TlvContent,
}

impl Tlv {
    pub fn object_instance(id: u16, resources: Vec<Tlv>) -> Self {
        Self {
            kind: TlvType::ObjectInstance,
            id,
            content: TlvContent::Children(resources),
        }
    }

    pub fn multiple_resource(id: u16, instances: Vec<Tlv>) -> Self {
        Self {
            kind: TlvType::MultipleResource,
            id,
            content: TlvContent::Children(instances),
        }
    }

    pub fn resource_value(id: u16, value: Vec<u8>) -> Self {
        Self {
            kind: TlvType::ResourceValue,
            id,
            content: TlvContent::Value(value),
        }
    }

    pub fn resource_instance(id: u16, value: Vec<u8>) -> Self {
        Self {
            kind: TlvType::ResourceInstance,
            id,
            content: TlvContent::Value(value),
        }
    }

    pub fn value(&self) -> Option<&[u8]> {
        match &self.content {
            TlvContent::Value(value) => Some(value),
            TlvContent::Children(_) => None,
        }
    }

    pub fn children(&self) -> &[Tlv] {
        match &self.content {
            TlvContent::Value(_) => &[],
            TlvContent::Children(children) => children,
        }
    }
}

/// Parse a flat sequence of sibling entries.
pub fn decode(bytes: &[u8]) -> TlvResult<Vec<Tlv>> {
    decode_at(bytes, 0)
}

fn decode_at(bytes: &[u8], base: usize) -> TlvResult<Vec<Tlv>> {
    let mut tlvs = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let start = base + pos;
        let type_byte = bytes[pos];
        pos += 1;
        let kind = TlvType::from_type_byte(type_byte);

        let id_width = if type_byte & ID16_FLAG == 0 { 1 } else { 2 };
        let id = read_be(bytes, pos, id_width).ok_or(TlvError::TruncatedIdentifier { offset: start })? as u16;
        pos += id_width;

        let length = match (type_byte & LENGTH_TYPE_MASK) >> 3 {
            0 => usize::from(type_byte & INLINE_LENGTH_MASK),
            width => {
                let width = usize::from(width);
                let length = read_be(bytes, pos, width).ok_or(TlvError::TruncatedLength { offset: start })?;
                pos += width;
                length as usize
            }
        };

        let available = bytes.len() - pos;
        if length > available {
            return Err(TlvError::TruncatedValue {
                offset: start,
                length,
                available,
            });
        }
        let value = &bytes[pos..pos + length];
        trace!(?kind, id, length, "decoded TLV header");

        let content = if kind.is_container() {
            TlvContent::Children(decode_at(value, base + pos)?)
        } else {
            TlvContent::Value(value.to_vec())
        };
        pos += length;
        tlvs.push(Tlv { kind, id, content });
    }

    Ok(tlvs)
}

fn read_be(bytes: &[u8], pos: usize, width: usize) -> Option<u32> {
    let slice = bytes.get(pos..pos.checked_add(width)?)?;
    Some(slice.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b)))
}

/// Serialize sibling entries with minimal identifier and length fields.
pub fn encode(tlvs: &[Tlv]) -> TlvResult<Vec<u8>> {
    let mut out = Vec::new();
    for tlv in tlvs {
        encode_into(tlv, &mut out)?;
    }
    Ok(out)
}

fn encode_into(tlv: &Tlv, out: &mut Vec<u8>) -> TlvResult<()> {
    let nested;
    let value: &[u8] = match &tlv.content {
        TlvContent::Value(value) => value,
        TlvContent::Children(children) => {
            nested = encode(children)?;
            &nested
        }
    };
    let length = value.len();
    if length > MAX_LENGTH {
        return Err(TlvError::LengthOverflow { length });
    }

    let mut type_byte = tlv.kind.bits();
    if tlv.id > 0xFF {
        type_byte |= ID16_FLAG;
    }
    let length_bytes: &[u8] = &(length as u32).to_be_bytes();
    let length_field = if length < 8 {
        type_byte |= length as u8;
        &[][..]
    } else if length <= 0xFF {
        type_byte |= 0b0000_1000;
        &length_bytes[3..]
    } else if length <= 0xFFFF {
        type_byte |= 0b0001_0000;
        &length_bytes[2..]
    } else {
        type_byte |= 0b0001_1000;
        &length_bytes[1..]
    };

    out.push(type_byte);
    if tlv.id > 0xFF {
        out.extend_from_slice(&tlv.id.to_be_bytes());
    } else {
        out.push(tlv.id as u8);
    }
    out.extend_from_slice(length_field);
    out.extend_from_slice(value);
    Ok(())
}

// Primitive values

pub fn encode_integer(value: i64) -> Vec<u8> {
    if let Ok(v) = i8::try_from(value) {
        v.to_be_bytes().to_vec()
    } else if let Ok(v) = i16::try_from(value) {
        v.to_be_bytes().to_vec()
    } else if let Ok(v) = i32::try_from(value) {
        v.to_be_bytes().to_vec()
    } else {
        value.to_be_bytes().to_vec()
    }
}

pub fn encode_unsigned(value: u64) -> Vec<u8> {
    if let Ok(v) = u8::try_from(value) {
        vec![v]
    } else if let Ok(v) = u16::try_from(value) {
        v.to_be_bytes().to_vec()
    } else if let Ok(v) = u32::try_from(value) {
        v.to_be_bytes().to_vec()
    } else {
        value.to_be_bytes().to_vec()
    }
}

/// 4 bytes when the value survives a round trip through `f32`, else 8.
pub fn encode_float(value: f64) -> Vec<u8> {
    let narrow = value as f32;
    if f64::from(narrow) == value || value.is_nan() {
        narrow.to_be_bytes().to_vec()
    } else {
        value.to_be_bytes().to_vec()
    }
}

pub fn encode_boolean(value: bool) -> Vec<u8> {
    vec![u8::from(value)]
}

/// Seconds since the epoch, as an integer.
pub fn encode_time(value: OffsetDateTime) -> Vec<u8> {
    encode_integer(value.unix_timestamp())
}

pub fn encode_object_link(value: ObjectLink) -> Vec<u8> {
    let mut out = Vec::with_capacity(4);
    out.extend_from_slice(&value.object_id.to_be_bytes());
    out.extend_from_slice(&value.instance_id.to_be_bytes());
    out
}

pub fn decode_integer(value: &[u8]) -> TlvResult<i64> {
    match *value {
        [a] => Ok(i64::from(i8::from_be_bytes([a]))),
        [a, b] => Ok(i64::from(i16::from_be_bytes([a, b]))),
        [a, b, c, d] => Ok(i64::from(i32::from_be_bytes([a, b, c, d]))),
        [a, b, c, d, e, f, g, h] => Ok(i64::from_be_bytes([a, b, c, d, e, f, g, h])),
        _ => Err(TlvError::InvalidWidth {
            kind: "integer",
            length: value.len(),
        }),
    }
}

pub fn decode_unsigned(value: &[u8]) -> TlvResult<u64> {
    match value.len() {
        1 | 2 | 4 | 8 => Ok(value.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b))),
        length => Err(TlvError::InvalidWidth {
            kind: "unsigned integer",
            length,
        }),
    }
}

pub fn decode_float(value: &[u8]) -> TlvResult<f64> {
    match *value {
        [a, b, c, d] => Ok(f64::from(f32::from_be_bytes([a, b, c, d]))),
        [a, b, c, d, e, f, g, h] => Ok(f64::from_be_bytes([a, b, c, d, e, f, g, h])),
        _ => Err(TlvError::InvalidWidth {
            kind: "float",
            length: value.len(),
        }),
    }
}

/// One byte, 0 or 1. Other byte values are tolerated and read as `false`.
pub fn decode_boolean(value: &[u8]) -> TlvResult<bool> {
    match *value {
        [0] => Ok(false),
        [1] => Ok(true),
        [other] => {
            warn!(value = other, "boolean should be encoded as 0 or 1, decoding as false");
            Ok(false)
        }
        _ => Err(TlvError::InvalidWidth {
            kind: "boolean",
            length: value.len(),
        }),
    }
}

pub fn decode_time(value: &[u8]) -> TlvResult<OffsetDateTime> {
    let seconds = decode_integer(value).map_err(|_| TlvError::InvalidWidth {
        kind: "time",
        length: value.len(),
    })?;
    OffsetDateTime::from_unix_timestamp(seconds).map_err(|_| TlvError::InvalidWidth {
        kind: "time",
        length: value.len(),
    })
}

pub fn decode_object_link(value: &[u8]) -> TlvResult<ObjectLink> {
    match *value {
        [a, b, c, d] => Ok(ObjectLink::new(u16::from_be_bytes([a, b]), u16::from_be_bytes([c, d]))),
        _ => Err(TlvError::InvalidWidth {
            kind: "object link",
            length: value.len(),
        }),
    }
}

pub fn decode_string(value: &[u8]) -> TlvResult<String> {
    String::from_utf8(value.to_vec()).map_err(|_| TlvError::InvalidString)
}
