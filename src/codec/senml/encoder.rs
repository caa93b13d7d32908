use std::collections::BTreeMap;

use lwm2m_senml::{SenMLPack, SenMLRecord};
use time::OffsetDateTime;
use tracing::trace;

use super::{SenMLFormat, to_senml_value};
use crate::codec::tree;
use crate::codec::{
    MultiNodeEncoder, NodeEncoder, PathEncoder, TimestampedMultiNodeEncoder, TimestampedNodeEncoder,
    check_node_path,
};
use crate::converter::ValueConverter;
use crate::error::Result;
use crate::helper::{seconds_between, time_to_seconds};
use crate::model::LwM2mModel;
use crate::node::{LwM2mNode, TimestampedNode, TimestampedNodes, sort_series};
use crate::path::LwM2mPath;

/// Encoder for `application/senml+json` and `application/senml+cbor`.
#[derive(Debug, Clone, Copy)]
pub struct SenMLNodeEncoder {
    format: SenMLFormat,
}

impl SenMLNodeEncoder {
    pub fn new(format: SenMLFormat) -> Self {
        Self { format }
    }

    pub fn json() -> Self {
        Self::new(SenMLFormat::Json)
    }

    pub fn cbor() -> Self {
        Self::new(SenMLFormat::Cbor)
    }

    pub fn format(&self) -> SenMLFormat {
        self.format
    }
}

impl Default for SenMLNodeEncoder {
    fn default() -> Self {
        Self::json()
    }
}

/// Accumulates the records of one pack.
///
/// Each node opens with a `bn` record. When samples are timestamped, `bt` is
/// the most recent timestamp, written once on the first timestamped record,
/// and every `t` is relative to it.
struct PackWriter<'a> {
    model: &'a dyn LwM2mModel,
    converter: &'a dyn ValueConverter,
    base_time: Option<OffsetDateTime>,
    base_time_written: bool,
    records: Vec<SenMLRecord>,
}

impl<'a> PackWriter<'a> {
    fn new(model: &'a dyn LwM2mModel, converter: &'a dyn ValueConverter) -> Self {
        Self {
            model,
            converter,
            base_time: None,
            base_time_written: false,
            records: Vec::new(),
        }
    }

    fn with_base_time(mut self, base_time: Option<OffsetDateTime>) -> Self {
        self.base_time = base_time;
        self
    }

    fn add(&mut self, node: &LwM2mNode, path: &LwM2mPath, timestamp: Option<OffsetDateTime>) -> Result<()> {
        check_node_path(node, path)?;
        let prefix = path.to_string();

        for (index, (leaf, value)) in tree::flatten(node, path)?.into_iter().enumerate() {
            let value = tree::encode_value(value, &leaf, self.model, self.converter)?;
            trace!(path = %leaf, kind = %value.kind(), "encoding SenML record");

            let full = leaf.to_string();
            let name = full
                .strip_prefix(prefix.as_str())
                .unwrap_or(&full)
                .trim_start_matches('/');

            let mut record = SenMLRecord::new().with_value(to_senml_value(value));
            if index == 0 {
                record.bn = Some(if name.is_empty() {
                    prefix.clone()
                } else {
                    format!("{}/", prefix.trim_end_matches('/'))
                });
            }
            if !name.is_empty() {
                record.n = Some(name.to_string());
            }
            if let (Some(time), Some(base_time)) = (timestamp, self.base_time) {
                if !self.base_time_written {
                    record.bt = Some(time_to_seconds(base_time));
                    self.base_time_written = true;
                }
                if time != base_time {
                    record.t = Some(seconds_between(time, base_time));
                }
            }
            self.records.push(record);
        }
        Ok(())
    }

    fn finish(self, format: SenMLFormat, path: Option<LwM2mPath>) -> Result<Vec<u8>> {
        let mut pack = SenMLPack::new();
        pack.add_records(self.records);
        format.serialize(&pack, path)
    }
}

impl NodeEncoder for SenMLNodeEncoder {
    fn encode(
        &self,
        node: &LwM2mNode,
        path: &LwM2mPath,
        model: &dyn LwM2mModel,
        converter: &dyn ValueConverter,
    ) -> Result<Vec<u8>> {
        let mut writer = PackWriter::new(model, converter);
        writer.add(node, path, None)?;
        writer.finish(self.format, Some(*path))
    }

    fn as_timestamped(&self) -> Option<&dyn TimestampedNodeEncoder> {
        Some(self)
    }

    fn as_multi(&self) -> Option<&dyn MultiNodeEncoder> {
        Some(self)
    }

    fn as_timestamped_multi(&self) -> Option<&dyn TimestampedMultiNodeEncoder> {
        Some(self)
    }

    fn as_path_encoder(&self) -> Option<&dyn PathEncoder> {
        Some(self)
    }
}

impl TimestampedNodeEncoder for SenMLNodeEncoder {
    fn encode_timestamped_data(
        &self,
        nodes: &[TimestampedNode],
        path: &LwM2mPath,
        model: &dyn LwM2mModel,
        converter: &dyn ValueConverter,
    ) -> Result<Vec<u8>> {
        let mut series = nodes.to_vec();
        sort_series(&mut series);
        let base_time = series.iter().find_map(|n| n.timestamp);

        let mut writer = PackWriter::new(model, converter).with_base_time(base_time);
        for timestamped in &series {
            writer.add(&timestamped.node, path, timestamped.timestamp)?;
        }
        writer.finish(self.format, Some(*path))
    }
}

impl MultiNodeEncoder for SenMLNodeEncoder {
    fn encode_nodes(
        &self,
        nodes: &BTreeMap<LwM2mPath, LwM2mNode>,
        model: &dyn LwM2mModel,
        converter: &dyn ValueConverter,
    ) -> Result<Vec<u8>> {
        let mut writer = PackWriter::new(model, converter);
        for (path, node) in nodes {
            writer.add(node, path, None)?;
        }
        writer.finish(self.format, None)
    }
}

impl TimestampedMultiNodeEncoder for SenMLNodeEncoder {
    fn encode_timestamped_nodes(
        &self,
        nodes: &TimestampedNodes,
        model: &dyn LwM2mModel,
        converter: &dyn ValueConverter,
    ) -> Result<Vec<u8>> {
        let base_time = nodes.timestamps().into_iter().flatten().next();
        let mut writer = PackWriter::new(model, converter).with_base_time(base_time);
        for (timestamp, path, node) in nodes.iter() {
            writer.add(node, path, timestamp)?;
        }
        writer.finish(self.format, None)
    }
}

impl PathEncoder for SenMLNodeEncoder {
    fn encode_paths(&self, paths: &[LwM2mPath]) -> Result<Vec<u8>> {
        let mut pack = SenMLPack::new();
        pack.add_records(paths.iter().map(|path| SenMLRecord::new().with_name(path.to_string())));
        self.format.serialize(&pack, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::LenientValueConverter;
    use crate::model::{ObjectModel, ResourceModel, ResourceType, StaticModel};
    use crate::node::{LwM2mObjectInstance, LwM2mResource, LwM2mResourceInstance, ObjectLink, Value};

    fn model() -> StaticModel {
        StaticModel::new([
            ObjectModel::new(3, "Device", false)
                .with_resource(ResourceModel::single(0, "Manufacturer", ResourceType::String))
                .with_resource(ResourceModel::multiple(6, "Power Sources", ResourceType::Integer))
                .with_resource(ResourceModel::single(9, "Battery Level", ResourceType::Integer))
                .with_resource(ResourceModel::single(17, "Firmware", ResourceType::Opaque))
                .with_resource(ResourceModel::single(18, "Link", ResourceType::ObjectLink)),
            ObjectModel::new(1, "Server", true)
                .with_resource(ResourceModel::single(1, "Lifetime", ResourceType::Integer)),
        ])
    }

    fn encode(node: impl Into<LwM2mNode>, path: &str) -> String {
        let bytes = SenMLNodeEncoder::json()
            .encode(&node.into(), &path.parse().unwrap(), &model(), &LenientValueConverter)
            .unwrap();
        String::from_utf8(bytes).unwrap()
    }

    fn at(seconds: i64) -> Option<OffsetDateTime> {
        Some(OffsetDateTime::from_unix_timestamp(seconds).unwrap())
    }

    #[test]
    fn test_single_resource() {
        assert_eq!(
            encode(LwM2mResource::single(0, "Open Mobile Alliance"), "/3/0/0"),
            r#"[{"bn":"/3/0/0","vs":"Open Mobile Alliance"}]"#
        );
    }

    #[test]
    fn test_instance() {
        let instance = LwM2mObjectInstance::new(
            0,
            [
                LwM2mResource::single(0, "OMA"),
                LwM2mResource::multiple(6, ResourceType::Integer, [(0, Value::Integer(1)), (1, Value::Integer(5))])
                    .unwrap(),
                LwM2mResource::single(17, vec![1u8, 2, 3]),
                LwM2mResource::single(18, ObjectLink::new(1, 0)),
            ],
        );
        assert_eq!(
            encode(instance, "/3/0"),
            r#"[{"bn":"/3/0/","n":"0","vs":"OMA"},{"n":"6/0","v":1},{"n":"6/1","v":5},{"n":"17","vd":"AQID"},{"n":"18","vlo":"1:0"}]"#
        );
    }

    #[test]
    fn test_object_and_resource_instance() {
        let instance = LwM2mObjectInstance::new(0, [LwM2mResource::single(1, 300i64)]);
        assert_eq!(encode(instance, "/1"), r#"[{"bn":"/1/","n":"0/1","v":300}]"#);
        assert_eq!(
            encode(LwM2mResourceInstance::new(1, 5i64), "/3/0/6/1"),
            r#"[{"bn":"/3/0/6/1","v":5}]"#
        );
    }

    #[test]
    fn test_empty_multiple_resource() {
        let empty = LwM2mResource::multiple(6, ResourceType::Integer, Vec::<(u16, Value)>::new()).unwrap();
        assert_eq!(encode(empty, "/3/0/6"), "[]");
    }

    #[test]
    fn test_series() {
        let nodes = vec![
            TimestampedNode::new(at(110), LwM2mResource::single(9, 10i64).into()),
            TimestampedNode::current(LwM2mResource::single(9, 40i64).into()),
            TimestampedNode::new(at(130), LwM2mResource::single(9, 30i64).into()),
            TimestampedNode::new(at(120), LwM2mResource::single(9, 20i64).into()),
        ];
        let bytes = SenMLNodeEncoder::json()
            .encode_timestamped_data(&nodes, &LwM2mPath::Resource(3, 0, 9), &model(), &LenientValueConverter)
            .unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"[{"bn":"/3/0/9","v":40},{"bn":"/3/0/9","bt":130,"v":30},{"bn":"/3/0/9","t":-10,"v":20},{"bn":"/3/0/9","t":-20,"v":10}]"#
        );
    }

    #[test]
    fn test_nodes() {
        let mut nodes = BTreeMap::new();
        nodes.insert(LwM2mPath::Resource(3, 0, 9), LwM2mResource::single(9, 95i64).into());
        nodes.insert(LwM2mPath::Resource(1, 0, 1), LwM2mResource::single(1, 300i64).into());
        let bytes = SenMLNodeEncoder::json()
            .encode_nodes(&nodes, &model(), &LenientValueConverter)
            .unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"[{"bn":"/1/0/1","v":300},{"bn":"/3/0/9","v":95}]"#
        );
    }

    #[test]
    fn test_timestamped_nodes() {
        let nodes = TimestampedNodes::builder()
            .put(at(100), LwM2mPath::Resource(3, 0, 9), LwM2mResource::single(9, 90i64).into())
            .put(at(200), LwM2mPath::Resource(3, 0, 9), LwM2mResource::single(9, 95i64).into())
            .put(at(200), LwM2mPath::Resource(1, 0, 1), LwM2mResource::single(1, 300i64).into())
            .build()
            .unwrap();
        let bytes = SenMLNodeEncoder::json()
            .encode_timestamped_nodes(&nodes, &model(), &LenientValueConverter)
            .unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"[{"bn":"/1/0/1","bt":200,"v":300},{"bn":"/3/0/9","v":95},{"bn":"/3/0/9","t":-100,"v":90}]"#
        );
    }

    #[test]
    fn test_paths() {
        let bytes = SenMLNodeEncoder::json()
            .encode_paths(&[LwM2mPath::Resource(3, 0, 1), LwM2mPath::ObjectInstance(1, 0)])
            .unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), r#"[{"n":"/3/0/1"},{"n":"/1/0"}]"#);
    }

    #[test]
    fn test_cbor() {
        let bytes = SenMLNodeEncoder::cbor()
            .encode(&LwM2mResource::single(9, 95i64).into(), &LwM2mPath::Resource(3, 0, 9), &model(), &LenientValueConverter)
            .unwrap();
        assert_eq!(hex::encode_upper(bytes), "81A221662F332F302F3902185F");
    }
}
