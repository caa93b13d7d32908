//! Plain CBOR (`application/cbor`), one resource or resource instance value
//! as a single data item.
//!
//! Time is written as tag 1 (epoch seconds); tag 0 (RFC 3339 text) and a bare
//! integer are accepted on decode. Object links travel as `"obj:inst"` text.

use ciborium::value::{Integer, Value as CborValue};
use lwm2m_senml::SenMLNumber;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::trace;

use super::text::{check_value_path, single_value, single_value_node};
use crate::codec::{NodeDecoder, NodeEncoder, check_node_path};
use crate::converter::ValueConverter;
use crate::error::{CodecError, Result};
use crate::helper::{seconds_to_time, time_to_seconds};
use crate::model::{LwM2mModel, ResourceType};
use crate::node::{LwM2mNode, ObjectLink, Value};
use crate::path::LwM2mPath;

const TAG_DATE_TIME: u64 = 0;
const TAG_EPOCH: u64 = 1;

/// Decoder for `application/cbor`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CborNodeDecoder;

impl NodeDecoder for CborNodeDecoder {
    fn decode(&self, content: &[u8], path: &LwM2mPath, model: &dyn LwM2mModel) -> Result<LwM2mNode> {
        check_value_path(path, model, "CBOR")?;
        let item: CborValue = ciborium::de::from_reader(content)
            .map_err(|e| CodecError::format("unable to parse CBOR content", Some(*path), e))?;

        let value = match model.resource_type(path) {
            Some(kind) => typed_value(item, kind, path)?,
            None => {
                trace!(%path, "unknown resource, guessing the type from the CBOR item");
                guessed_value(item, path)?
            }
        };
        Ok(single_value_node(path, value))
    }
}

/// Encoder for `application/cbor`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CborNodeEncoder;

impl NodeEncoder for CborNodeEncoder {
    fn encode(
        &self,
        node: &LwM2mNode,
        path: &LwM2mPath,
        model: &dyn LwM2mModel,
        converter: &dyn ValueConverter,
    ) -> Result<Vec<u8>> {
        check_node_path(node, path)?;
        let value = single_value(node, path, "CBOR")?;
        let value = converter.convert(value.clone(), model.resource_type(path), path)?;
        trace!(%path, kind = %value.kind(), "encoding CBOR value");

        let mut buffer = Vec::new();
        ciborium::ser::into_writer(&to_cbor(value), &mut buffer)
            .map_err(|e| CodecError::format("unable to serialize CBOR content", Some(*path), e))?;
        Ok(buffer)
    }
}

fn to_cbor(value: Value) -> CborValue {
    match value {
        Value::String(s) => CborValue::Text(s),
        Value::Integer(i) => CborValue::Integer(i.into()),
        Value::UnsignedInteger(u) => CborValue::Integer(u.into()),
        Value::Float(f) => CborValue::Float(f),
        Value::Boolean(b) => CborValue::Bool(b),
        Value::Opaque(bytes) => CborValue::Bytes(bytes),
        Value::Time(t) => {
            let seconds = match time_to_seconds(t) {
                SenMLNumber::Integer(i) => CborValue::Integer(i.into()),
                SenMLNumber::Unsigned(u) => CborValue::Integer(u.into()),
                SenMLNumber::Float(f) => CborValue::Float(f),
            };
            CborValue::Tag(TAG_EPOCH, Box::new(seconds))
        }
        Value::ObjectLink(link) => CborValue::Text(link.to_string()),
    }
}

fn mismatch(item: &CborValue, kind: ResourceType, path: &LwM2mPath) -> CodecError {
    CodecError::invalid_at(*path, format!("CBOR item {:?} cannot carry a {} value", item, kind))
}

fn typed_value(item: CborValue, kind: ResourceType, path: &LwM2mPath) -> Result<Value> {
    let value = match (kind, &item) {
        (ResourceType::String, CborValue::Text(s)) => Some(Value::String(s.clone())),
        (ResourceType::Integer, CborValue::Integer(i)) => i64::try_from(*i).ok().map(Value::Integer),
        (ResourceType::UnsignedInteger, CborValue::Integer(i)) => u64::try_from(*i).ok().map(Value::UnsignedInteger),
        (ResourceType::Float, CborValue::Float(f)) => Some(Value::Float(*f)),
        (ResourceType::Float, CborValue::Integer(i)) => Some(Value::Float(i128::from(*i) as f64)),
        (ResourceType::Boolean, CborValue::Bool(b)) => Some(Value::Boolean(*b)),
        (ResourceType::Opaque, CborValue::Bytes(bytes)) => Some(Value::Opaque(bytes.clone())),
        (ResourceType::Time, _) => Some(Value::Time(time(&item, path)?)),
        (ResourceType::ObjectLink, CborValue::Text(s)) => Some(Value::ObjectLink(s.parse::<ObjectLink>()?)),
        _ => None,
    };
    value.ok_or_else(|| mismatch(&item, kind, path))
}

fn guessed_value(item: CborValue, path: &LwM2mPath) -> Result<Value> {
    if matches!(item, CborValue::Tag(TAG_DATE_TIME | TAG_EPOCH, _)) {
        return Ok(Value::Time(time(&item, path)?));
    }
    Ok(match item {
        CborValue::Text(s) => Value::String(s),
        CborValue::Integer(i) => match i64::try_from(i) {
            Ok(i) => Value::Integer(i),
            Err(_) => Value::UnsignedInteger(u64::try_from(i).map_err(|_| integer_range(i, path))?),
        },
        CborValue::Float(f) => Value::Float(f),
        CborValue::Bool(b) => Value::Boolean(b),
        CborValue::Bytes(bytes) => Value::Opaque(bytes),
        other => {
            return Err(CodecError::invalid_at(
                *path,
                format!("CBOR item {:?} is not a single value", other),
            ));
        }
    })
}

fn integer_range(i: Integer, path: &LwM2mPath) -> CodecError {
    CodecError::invalid_at(*path, format!("CBOR integer {} is out of range", i128::from(i)))
}

fn time(item: &CborValue, path: &LwM2mPath) -> Result<OffsetDateTime> {
    match item {
        CborValue::Tag(TAG_EPOCH, inner) => epoch(inner, path),
        CborValue::Tag(TAG_DATE_TIME, inner) => match inner.as_ref() {
            CborValue::Text(text) => OffsetDateTime::parse(text, &Rfc3339)
                .map_err(|e| CodecError::invalid_literal_with("time", text.as_str(), e)),
            other => Err(mismatch(other, ResourceType::Time, path)),
        },
        other => epoch(other, path),
    }
}

fn epoch(item: &CborValue, path: &LwM2mPath) -> Result<OffsetDateTime> {
    match item {
        CborValue::Integer(i) => {
            let seconds = i64::try_from(*i).map_err(|_| integer_range(*i, path))?;
            seconds_to_time(SenMLNumber::Integer(seconds))
        }
        CborValue::Float(f) => seconds_to_time(SenMLNumber::Float(*f)),
        other => Err(mismatch(other, ResourceType::Time, path)),
    }
}
