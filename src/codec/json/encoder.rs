use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use lwm2m_senml::SenMLNumber;
use time::OffsetDateTime;
use tracing::trace;

use super::{JsonEntry, JsonRoot};
use crate::codec::tree;
use crate::codec::{NodeEncoder, TimestampedNodeEncoder, check_node_path};
use crate::converter::ValueConverter;
use crate::error::{CodecError, Result};
use crate::helper::{seconds_between, time_to_seconds};
use crate::model::LwM2mModel;
use crate::node::{LwM2mNode, LwM2mResource, TimestampedNode, Value, sort_series};
use crate::path::LwM2mPath;

/// Encoder for `application/vnd.oma.lwm2m+json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonNodeEncoder;

impl JsonNodeEncoder {
    fn serialize(root: &JsonRoot, path: &LwM2mPath) -> Result<Vec<u8>> {
        serde_json::to_vec(root).map_err(|e| CodecError::format("unable to serialize JSON content", Some(*path), e))
    }

    /// Entries of one node, all sharing `time`.
    fn entries(
        node: &LwM2mNode,
        path: &LwM2mPath,
        base_name: &str,
        time: Option<SenMLNumber>,
        model: &dyn LwM2mModel,
        converter: &dyn ValueConverter,
    ) -> Result<Vec<JsonEntry>> {
        check_node_path(node, path)?;
        tree::flatten(node, path)?
            .into_iter()
            .map(|(leaf, value)| {
                let value = tree::encode_value(value, &leaf, model, converter)?;
                trace!(path = %leaf, kind = %value.kind(), "encoding JSON entry");
                let full = leaf.to_string();
                let name = full.strip_prefix(base_name).unwrap_or(&full);
                let mut entry = JsonEntry {
                    name: (!name.is_empty()).then(|| name.to_string()),
                    time,
                    ..Default::default()
                };
                set_value(&mut entry, value);
                Ok(entry)
            })
            .collect()
    }
}

/// `bn` for a node: its path, with a trailing slash unless it is one value.
fn base_name(node: &LwM2mNode, path: &LwM2mPath) -> String {
    match node {
        LwM2mNode::Resource(LwM2mResource::Single(_)) | LwM2mNode::ResourceInstance(_) => path.to_string(),
        _ => format!("{}/", path),
    }
}

fn set_value(entry: &mut JsonEntry, value: Value) {
    match value {
        Value::String(s) => entry.string_value = Some(s),
        Value::Integer(i) => entry.float_value = Some(SenMLNumber::Integer(i)),
        Value::UnsignedInteger(u) => entry.float_value = Some(SenMLNumber::from(u)),
        Value::Float(f) => entry.float_value = Some(SenMLNumber::Float(f)),
        Value::Boolean(b) => entry.boolean_value = Some(b),
        Value::Opaque(bytes) => entry.string_value = Some(STANDARD.encode(bytes)),
        Value::Time(t) => entry.float_value = Some(time_to_seconds(t)),
        Value::ObjectLink(link) => entry.object_link_value = Some(link.to_string()),
    }
}

impl NodeEncoder for JsonNodeEncoder {
    fn encode(
        &self,
        node: &LwM2mNode,
        path: &LwM2mPath,
        model: &dyn LwM2mModel,
        converter: &dyn ValueConverter,
    ) -> Result<Vec<u8>> {
        let base_name = base_name(node, path);
        let entries = Self::entries(node, path, &base_name, None, model, converter)?;
        let root = JsonRoot {
            base_name: Some(base_name),
            entries,
            base_time: None,
        };
        Self::serialize(&root, path)
    }

    fn as_timestamped(&self) -> Option<&dyn TimestampedNodeEncoder> {
        Some(self)
    }
}

impl TimestampedNodeEncoder for JsonNodeEncoder {
    /// When every node is timestamped, `bt` is the most recent timestamp and
    /// each `t` is relative to it. Otherwise `t` is absolute and current
    /// values carry none.
    fn encode_timestamped_data(
        &self,
        nodes: &[TimestampedNode],
        path: &LwM2mPath,
        model: &dyn LwM2mModel,
        converter: &dyn ValueConverter,
    ) -> Result<Vec<u8>> {
        let mut series = nodes.to_vec();
        sort_series(&mut series);

        let base_time: Option<OffsetDateTime> = if series.iter().all(TimestampedNode::is_timestamped) {
            series.first().and_then(|n| n.timestamp)
        } else {
            None
        };

        let mut root = JsonRoot {
            base_time: base_time.map(time_to_seconds),
            ..Default::default()
        };
        for timestamped in &series {
            let base_name = base_name(&timestamped.node, path);
            if let Some(previous) = &root.base_name {
                if *previous != base_name {
                    return Err(CodecError::invalid_at(
                        *path,
                        format!("unexpected base name {} ({} expected) in series", base_name, previous),
                    ));
                }
            }
            root.base_name = Some(base_name.clone());

            let time = match (timestamped.timestamp, base_time) {
                (Some(t), Some(bt)) if t == bt => None,
                (Some(t), Some(bt)) => Some(seconds_between(t, bt)),
                (Some(t), None) => Some(time_to_seconds(t)),
                (None, _) => None,
            };
            root.entries
                .extend(Self::entries(&timestamped.node, path, &base_name, time, model, converter)?);
        }

        Self::serialize(&root, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::LenientValueConverter;
    use crate::model::{ObjectModel, ResourceModel, ResourceType, StaticModel};
    use crate::node::{LwM2mObjectInstance, LwM2mResourceInstance, ObjectLink};

    fn model() -> StaticModel {
        StaticModel::new([ObjectModel::new(3, "Device", false)
            .with_resource(ResourceModel::single(0, "Manufacturer", ResourceType::String))
            .with_resource(ResourceModel::multiple(6, "Power Sources", ResourceType::Integer))
            .with_resource(ResourceModel::single(9, "Battery Level", ResourceType::Integer))
            .with_resource(ResourceModel::single(13, "Current Time", ResourceType::Time))
            .with_resource(ResourceModel::single(17, "Firmware", ResourceType::Opaque))
            .with_resource(ResourceModel::single(18, "Link", ResourceType::ObjectLink))])
    }

    fn encode(node: impl Into<LwM2mNode>, path: &str) -> String {
        let bytes = JsonNodeEncoder
            .encode(&node.into(), &path.parse().unwrap(), &model(), &LenientValueConverter)
            .unwrap();
        String::from_utf8(bytes).unwrap()
    }

    fn at(seconds: i64) -> Option<OffsetDateTime> {
        Some(OffsetDateTime::from_unix_timestamp(seconds).unwrap())
    }

    #[test]
    fn test_instance() {
        let instance = LwM2mObjectInstance::new(
            0,
            [
                LwM2mResource::single(0, "Open Mobile Alliance"),
                LwM2mResource::multiple(6, ResourceType::Integer, [(0, Value::Integer(1)), (1, Value::Integer(5))])
                    .unwrap(),
                LwM2mResource::single(9, 100i64),
                LwM2mResource::single(13, OffsetDateTime::from_unix_timestamp(1367491215).unwrap()),
            ],
        );
        assert_eq!(
            encode(instance, "/3/0"),
            r#"{"bn":"/3/0/","e":[{"n":"0","sv":"Open Mobile Alliance"},{"n":"6/0","v":1},{"n":"6/1","v":5},{"n":"9","v":100},{"n":"13","v":1367491215}]}"#
        );
    }

    #[test]
    fn test_single_values() {
        assert_eq!(encode(LwM2mResource::single(9, 100i64), "/3/0/9"), r#"{"bn":"/3/0/9","e":[{"v":100}]}"#);
        assert_eq!(
            encode(LwM2mResourceInstance::new(1, 5i64), "/3/0/6/1"),
            r#"{"bn":"/3/0/6/1","e":[{"v":5}]}"#
        );
        assert_eq!(
            encode(LwM2mResource::single(17, vec![1u8, 2, 3]), "/3/0/17"),
            r#"{"bn":"/3/0/17","e":[{"sv":"AQID"}]}"#
        );
        assert_eq!(
            encode(LwM2mResource::single(18, ObjectLink::new(3, 0)), "/3/0/18"),
            r#"{"bn":"/3/0/18","e":[{"ov":"3:0"}]}"#
        );
    }

    #[test]
    fn test_series_relative_to_most_recent() {
        let nodes = vec![
            TimestampedNode::new(at(110), LwM2mResource::single(9, 10i64).into()),
            TimestampedNode::new(at(130), LwM2mResource::single(9, 30i64).into()),
            TimestampedNode::new(at(120), LwM2mResource::single(9, 20i64).into()),
        ];
        let bytes = JsonNodeEncoder
            .encode_timestamped_data(&nodes, &LwM2mPath::Resource(3, 0, 9), &model(), &LenientValueConverter)
            .unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"bn":"/3/0/9","e":[{"v":30},{"v":20,"t":-10},{"v":10,"t":-20}],"bt":130}"#
        );
    }

    #[test]
    fn test_series_with_current_value() {
        let nodes = vec![
            TimestampedNode::new(at(110), LwM2mResource::single(9, 10i64).into()),
            TimestampedNode::current(LwM2mResource::single(9, 30i64).into()),
        ];
        let bytes = JsonNodeEncoder
            .encode_timestamped_data(&nodes, &LwM2mPath::Resource(3, 0, 9), &model(), &LenientValueConverter)
            .unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"bn":"/3/0/9","e":[{"v":30},{"v":10,"t":110}]}"#
        );
    }

    #[test]
    fn test_undefined_instance_at_object_path_fails() {
        let instance = LwM2mObjectInstance::undefined([LwM2mResource::single(9, 100i64)]);
        let result = JsonNodeEncoder.encode(
            &instance.into(),
            &LwM2mPath::Object(3),
            &model(),
            &LenientValueConverter,
        );
        assert!(result.is_err());
    }
}
