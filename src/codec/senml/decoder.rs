use std::collections::BTreeMap;

use lwm2m_senml::{NormalizedRecord, SenMLPack};
use tracing::trace;

use super::SenMLFormat;
use crate::codec::tree::{self, Leaf};
use crate::codec::{
    MultiNodeDecoder, NodeDecoder, PathDecoder, TimestampedMultiNodeDecoder, TimestampedNodeDecoder,
};
use crate::error::{CodecError, Result};
use crate::helper::seconds_to_time;
use crate::model::LwM2mModel;
use crate::node::{LwM2mNode, TimestampedNode, TimestampedNodes};
use crate::path::LwM2mPath;

/// Decoder for `application/senml+json` and `application/senml+cbor`.
#[derive(Debug, Clone, Copy)]
pub struct SenMLNodeDecoder {
    format: SenMLFormat,
}

impl SenMLNodeDecoder {
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

    /// Parse and validate a pack whose records must all carry a value.
    fn parse(&self, content: &[u8], path: Option<LwM2mPath>, allow_no_value: bool) -> Result<SenMLPack> {
        let pack = self.format.parse(content, path)?;
        pack.validate(allow_no_value)
            .map_err(|e| CodecError::format(format!("invalid {} pack", self.format), path, e))?;
        trace!(format = %self.format, records = pack.len(), "parsed SenML pack");
        Ok(pack)
    }

    /// Every record resolved to an absolute path, a time and a typed value.
    fn leaves(&self, content: &[u8], path: Option<LwM2mPath>, model: &dyn LwM2mModel) -> Result<Vec<Leaf>> {
        let pack = self.parse(content, path, false)?;
        pack.normalize()
            .records
            .into_iter()
            .map(|record| leaf(record, model))
            .collect()
    }
}

impl Default for SenMLNodeDecoder {
    fn default() -> Self {
        Self::json()
    }
}

fn leaf(record: NormalizedRecord, model: &dyn LwM2mModel) -> Result<Leaf> {
    let path = resolve(&record.name)?;
    let timestamp = record.time.map(seconds_to_time).transpose()?;
    let raw = record
        .value
        .ok_or_else(|| CodecError::missing_value(path, "SenML record carries no value"))?;
    let value = tree::decode_value(raw, model.resource_type(&path), &path)?;
    Ok(Leaf { path, timestamp, value })
}

/// Path of a resolved record name, which must address a value.
fn resolve(name: &str) -> Result<LwM2mPath> {
    let path: LwM2mPath = name.parse()?;
    if path.is_resource() || path.is_resource_instance() {
        Ok(path)
    } else {
        Err(CodecError::invalid_at(
            path,
            "SenML record name must address a resource or a resource instance",
        ))
    }
}

impl NodeDecoder for SenMLNodeDecoder {
    /// The current value, or the most recent one of a series.
    fn decode(&self, content: &[u8], path: &LwM2mPath, model: &dyn LwM2mModel) -> Result<LwM2mNode> {
        self.decode_timestamped_data(content, path, model)?
            .into_iter()
            .next()
            .map(|n| n.node)
            .ok_or_else(|| CodecError::missing_value(*path, "SenML payload holds no node"))
    }

    fn as_timestamped(&self) -> Option<&dyn TimestampedNodeDecoder> {
        Some(self)
    }

    fn as_multi(&self) -> Option<&dyn MultiNodeDecoder> {
        Some(self)
    }

    fn as_timestamped_multi(&self) -> Option<&dyn TimestampedMultiNodeDecoder> {
        Some(self)
    }

    fn as_path_decoder(&self) -> Option<&dyn PathDecoder> {
        Some(self)
    }
}

impl TimestampedNodeDecoder for SenMLNodeDecoder {
    fn decode_timestamped_data(
        &self,
        content: &[u8],
        path: &LwM2mPath,
        model: &dyn LwM2mModel,
    ) -> Result<Vec<TimestampedNode>> {
        let leaves = self.leaves(content, Some(*path), model)?;
        tree::build_series(path, leaves, model)
    }
}

impl MultiNodeDecoder for SenMLNodeDecoder {
    /// Timestamps are ignored; a path met twice is an error.
    fn decode_nodes(
        &self,
        content: &[u8],
        paths: Option<&[LwM2mPath]>,
        model: &dyn LwM2mModel,
    ) -> Result<BTreeMap<LwM2mPath, LwM2mNode>> {
        let leaves = self.leaves(content, None, model)?;
        let mut nodes = BTreeMap::new();

        match paths {
            Some(requested) => {
                let mut groups: BTreeMap<LwM2mPath, Vec<_>> = BTreeMap::new();
                for leaf in leaves {
                    let owner = requested.iter().find(|p| leaf.path.starts_with(p)).ok_or_else(|| {
                        CodecError::invalid_at(leaf.path, "SenML record is not below any requested path")
                    })?;
                    groups.entry(*owner).or_default().push((leaf.path, leaf.value));
                }
                for (path, leaves) in groups {
                    nodes.insert(path, tree::build_node(&path, leaves, model)?);
                }
            }
            None => {
                for leaf in leaves {
                    let path = leaf.path;
                    let node = tree::build_node(&path, [(path, leaf.value)], model)?;
                    if nodes.insert(path, node).is_some() {
                        return Err(CodecError::duplicate("path", path, path));
                    }
                }
            }
        }
        Ok(nodes)
    }
}

impl TimestampedMultiNodeDecoder for SenMLNodeDecoder {
    fn decode_timestamped_nodes(&self, content: &[u8], model: &dyn LwM2mModel) -> Result<TimestampedNodes> {
        let leaves = self.leaves(content, None, model)?;
        let mut builder = TimestampedNodes::builder().raise_on_duplicate(true);
        for leaf in leaves {
            let path = leaf.path;
            let node = tree::build_node(&path, [(path, leaf.value)], model)?;
            builder = builder.put(leaf.timestamp, path, node);
        }
        builder.build()
    }
}

impl PathDecoder for SenMLNodeDecoder {
    fn decode_paths(&self, content: &[u8]) -> Result<Vec<LwM2mPath>> {
        let pack = self.parse(content, None, true)?;
        if let Some(record) = pack.iter().find(|r| r.has_value() || r.t.is_some()) {
            return Err(CodecError::invalid(format!(
                "SenML path list records carry a name only, got {:?}",
                record
            )));
        }
        pack.normalize()
            .records
            .into_iter()
            .map(|record| record.name.parse())
            .collect()
    }
}
