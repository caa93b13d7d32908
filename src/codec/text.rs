//! Plain text (`text/plain`), one resource or resource instance value.
//!
//! Numbers are written in decimal, booleans as `true` / `false`, opaque
//! values in standard base64 and time in RFC 3339. The decoder also accepts
//! `0` / `1` booleans and time as integer seconds since the epoch.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use time::OffsetDateTime;
use time::format_description::well_known::{Iso8601, Rfc3339};
use tracing::trace;

use crate::codec::{NodeDecoder, NodeEncoder, check_node_path};
use crate::converter::ValueConverter;
use crate::error::{CodecError, Result};
use crate::model::{LwM2mModel, ResourceType};
use crate::node::{LwM2mNode, LwM2mResource, LwM2mResourceInstance, ObjectLink, Value};
use crate::path::LwM2mPath;

/// Decoder for `text/plain`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextNodeDecoder;

impl NodeDecoder for TextNodeDecoder {
    fn decode(&self, content: &[u8], path: &LwM2mPath, model: &dyn LwM2mModel) -> Result<LwM2mNode> {
        check_value_path(path, model, "text")?;
        let text = std::str::from_utf8(content)
            .map_err(|e| CodecError::format("text content is not valid UTF-8", Some(*path), e))?;

        let value = match model.resource_type(path) {
            Some(kind) => parse(text, kind)?,
            None => {
                trace!(%path, "unknown resource, decoding text as a string");
                Value::from(text)
            }
        };
        Ok(single_value_node(path, value))
    }
}

/// Encoder for `text/plain`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextNodeEncoder;

impl NodeEncoder for TextNodeEncoder {
    fn encode(
        &self,
        node: &LwM2mNode,
        path: &LwM2mPath,
        model: &dyn LwM2mModel,
        converter: &dyn ValueConverter,
    ) -> Result<Vec<u8>> {
        check_node_path(node, path)?;
        let value = single_value(node, path, "text")?;
        let value = converter.convert(value.clone(), model.resource_type(path), path)?;
        trace!(%path, kind = %value.kind(), "encoding text value");
        Ok(format(&value, path)?.into_bytes())
    }
}

fn parse(text: &str, kind: ResourceType) -> Result<Value> {
    Ok(match kind {
        ResourceType::String => Value::from(text),
        ResourceType::Integer => Value::Integer(
            text.parse()
                .map_err(|e| CodecError::invalid_literal_with("integer", text, e))?,
        ),
        ResourceType::UnsignedInteger => Value::UnsignedInteger(
            text.parse()
                .map_err(|e| CodecError::invalid_literal_with("unsigned integer", text, e))?,
        ),
        ResourceType::Float => Value::Float(
            text.parse()
                .map_err(|e| CodecError::invalid_literal_with("float", text, e))?,
        ),
        ResourceType::Boolean => match text {
            "1" => Value::Boolean(true),
            "0" => Value::Boolean(false),
            t if t.eq_ignore_ascii_case("true") => Value::Boolean(true),
            t if t.eq_ignore_ascii_case("false") => Value::Boolean(false),
            _ => return Err(CodecError::invalid_literal("boolean", text)),
        },
        ResourceType::Opaque => Value::Opaque(
            STANDARD
                .decode(text)
                .map_err(|e| CodecError::invalid_literal_with("base64", text, e))?,
        ),
        ResourceType::Time => Value::Time(parse_time(text)?),
        ResourceType::ObjectLink => Value::ObjectLink(text.parse::<ObjectLink>()?),
    })
}

fn parse_time(text: &str) -> Result<OffsetDateTime> {
    if let Ok(seconds) = text.parse::<i64>() {
        return OffsetDateTime::from_unix_timestamp(seconds)
            .map_err(|e| CodecError::invalid_literal_with("time", text, e));
    }
    OffsetDateTime::parse(text, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(text, &Iso8601::DEFAULT))
        .map_err(|e| CodecError::invalid_literal_with("time", text, e))
}

fn format(value: &Value, path: &LwM2mPath) -> Result<String> {
    Ok(match value {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::UnsignedInteger(u) => u.to_string(),
        Value::Float(f) if f.is_finite() => f.to_string(),
        Value::Float(f) => return Err(CodecError::invalid_at(*path, format!("{} has no text form", f))),
        Value::Boolean(b) => b.to_string(),
        Value::Opaque(bytes) => STANDARD.encode(bytes),
        Value::Time(t) => t
            .format(&Rfc3339)
            .map_err(|e| CodecError::format("unable to format time", Some(*path), e))?,
        Value::ObjectLink(link) => link.to_string(),
    })
}

/// Resource or resource instance paths only.
pub(crate) fn check_value_path(path: &LwM2mPath, model: &dyn LwM2mModel, format: &str) -> Result<()> {
    if !path.is_resource() && !path.is_resource_instance() {
        return Err(CodecError::invalid_at(
            *path,
            format!("{} content only carries a resource or a resource instance", format),
        ));
    }
    if path.is_resource() && model.is_multiple_resource(path) == Some(true) {
        return Err(CodecError::invalid_at(
            *path,
            format!("{} content cannot carry a multiple resource, address one of its instances", format),
        ));
    }
    Ok(())
}

/// The node a single decoded value forms at `path`.
pub(crate) fn single_value_node(path: &LwM2mPath, value: Value) -> LwM2mNode {
    match *path {
        LwM2mPath::ResourceInstance(_, _, _, id) => LwM2mResourceInstance::new(id, value).into(),
        _ => LwM2mResource::single(path.resource_id().unwrap_or_default(), value).into(),
    }
}

/// The value of a single resource or resource instance node.
pub(crate) fn single_value<'a>(node: &'a LwM2mNode, path: &LwM2mPath, format: &str) -> Result<&'a Value> {
    match node {
        LwM2mNode::Resource(LwM2mResource::Single(single)) => Ok(single.value()),
        LwM2mNode::ResourceInstance(instance) => Ok(instance.value()),
        other => Err(CodecError::invalid_at(
            *path,
            format!("{} content cannot carry a {}", format, other.kind()),
        )),
    }
}
