use lwm2m_senml::{SenMLNumber, SenMLValue};
use time::OffsetDateTime;
use tracing::trace;

use super::{JsonEntry, JsonRoot};
use crate::codec::tree::{self, Leaf};
use crate::codec::{NodeDecoder, TimestampedNodeDecoder};
use crate::error::{CodecError, Result};
use crate::helper::seconds_to_time;
use crate::model::{LwM2mModel, ResourceType};
use crate::node::{LwM2mNode, ObjectLink, TimestampedNode, Value};
use crate::path::LwM2mPath;

/// Decoder for `application/vnd.oma.lwm2m+json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonNodeDecoder;

impl JsonNodeDecoder {
    fn parse(content: &[u8], path: &LwM2mPath) -> Result<JsonRoot> {
        serde_json::from_slice(content)
            .map_err(|e| CodecError::format("unable to parse JSON content", Some(*path), e))
    }

    fn leaves(root: JsonRoot, model: &dyn LwM2mModel) -> Result<Vec<Leaf>> {
        let base_name = root.base_name.unwrap_or_default();
        root.entries
            .into_iter()
            .map(|entry| {
                let name = format!("{}{}", base_name, entry.name.as_deref().unwrap_or_default());
                let path: LwM2mPath = name.parse()?;
                let timestamp = timestamp(root.base_time, entry.time)?;
                let value = entry_value(&entry, &path, model)?;
                Ok(Leaf { path, timestamp, value })
            })
            .collect()
    }
}

impl NodeDecoder for JsonNodeDecoder {
    /// The current value, or the most recent one of a series.
    fn decode(&self, content: &[u8], path: &LwM2mPath, model: &dyn LwM2mModel) -> Result<LwM2mNode> {
        let series = self.decode_timestamped_data(content, path, model)?;
        series
            .into_iter()
            .next()
            .map(|n| n.node)
            .ok_or_else(|| CodecError::missing_value(*path, "JSON payload holds no node"))
    }

    fn as_timestamped(&self) -> Option<&dyn TimestampedNodeDecoder> {
        Some(self)
    }
}

impl TimestampedNodeDecoder for JsonNodeDecoder {
    fn decode_timestamped_data(
        &self,
        content: &[u8],
        path: &LwM2mPath,
        model: &dyn LwM2mModel,
    ) -> Result<Vec<TimestampedNode>> {
        let root = Self::parse(content, path)?;
        trace!(%path, entries = root.entries.len(), "parsing JSON content");
        let leaves = Self::leaves(root, model)?;
        tree::build_series(path, leaves, model)
    }
}

/// Absolute time of an entry: `bt + t`, either alone, or none.
fn timestamp(base_time: Option<SenMLNumber>, time: Option<SenMLNumber>) -> Result<Option<OffsetDateTime>> {
    let seconds = match (base_time, time) {
        (Some(bt), Some(t)) => Some(bt.add(t)),
        (Some(bt), None) => Some(bt),
        (None, t) => t,
    };
    seconds.map(seconds_to_time).transpose()
}

fn entry_value(entry: &JsonEntry, path: &LwM2mPath, model: &dyn LwM2mModel) -> Result<Value> {
    let raw = entry.value(path)?;
    let expected = model.resource_type(path);
    if expected.is_none() {
        trace!(%path, "unknown resource, keeping the JSON value type");
    }

    // Opaque and object link resources may travel as strings
    match (raw, expected) {
        (SenMLValue::String(s), Some(ResourceType::Opaque)) => lwm2m_senml::decode_data(&s)
            .map(Value::Opaque)
            .map_err(|e| CodecError::format("invalid base64 value", Some(*path), e)),
        (SenMLValue::String(s), Some(ResourceType::ObjectLink)) => Ok(Value::ObjectLink(s.parse::<ObjectLink>()?)),
        (raw, expected) => tree::decode_value(raw, expected, path),
    }
}
