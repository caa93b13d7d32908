//! Per-format node codecs.
//!
//! Every format implements [`NodeDecoder`] and [`NodeEncoder`]. Batch and
//! time-series operations are optional capabilities: a codec that supports one
//! returns itself from the matching `as_*` accessor, the others keep the
//! default `None`.

pub mod cbor;
pub mod json;
pub mod opaque;
pub mod senml;
pub mod text;
pub mod tlv;
mod tree;

use std::collections::BTreeMap;

use crate::converter::ValueConverter;
use crate::error::{CodecError, Result};
use crate::model::LwM2mModel;
use crate::node::{InstanceId, LwM2mNode, LwM2mObjectInstance, NodeKind, TimestampedNode, TimestampedNodes};
use crate::path::LwM2mPath;

pub use cbor::{CborNodeDecoder, CborNodeEncoder};
pub use json::{JsonNodeDecoder, JsonNodeEncoder};
pub use opaque::{OpaqueNodeDecoder, OpaqueNodeEncoder};
pub use senml::{SenMLFormat, SenMLNodeDecoder, SenMLNodeEncoder};
pub use text::{TextNodeDecoder, TextNodeEncoder};
pub use tlv::{InstanceMode, TlvNodeDecoder, TlvNodeEncoder};

/// Bytes to a single node.
pub trait NodeDecoder: Send + Sync {
    /// Decode the node addressed by `path`; its level selects the node kind.
    fn decode(&self, content: &[u8], path: &LwM2mPath, model: &dyn LwM2mModel) -> Result<LwM2mNode>;

    /// Decode a node of `kind` at `path`. An object instance can be read at its
    /// object's path when the payload holds bare resources or a single instance.
    fn decode_kind(
        &self,
        content: &[u8],
        path: &LwM2mPath,
        model: &dyn LwM2mModel,
        kind: NodeKind,
    ) -> Result<LwM2mNode> {
        let node = self.decode(content, path, model)?;
        if node.kind() == kind {
            return Ok(node);
        }
        match (node, kind) {
            (LwM2mNode::Object(object), NodeKind::ObjectInstance) => {
                let mut instances = object.instances().values();
                match (instances.next(), instances.next()) {
                    (Some(instance), None) => Ok(instance.clone().into()),
                    _ => Err(CodecError::invalid_at(
                        *path,
                        format!(
                            "expected one object instance, the payload holds {}",
                            object.instances().len()
                        ),
                    )),
                }
            }
            (node, kind) => Err(CodecError::invalid_at(
                *path,
                format!("a {} cannot be decoded at this path, the payload holds a {}", kind, node.kind()),
            )),
        }
    }

    fn as_timestamped(&self) -> Option<&dyn TimestampedNodeDecoder> {
        None
    }

    fn as_multi(&self) -> Option<&dyn MultiNodeDecoder> {
        None
    }

    fn as_timestamped_multi(&self) -> Option<&dyn TimestampedMultiNodeDecoder> {
        None
    }

    fn as_path_decoder(&self) -> Option<&dyn PathDecoder> {
        None
    }
}

/// Historical series of one path.
pub trait TimestampedNodeDecoder {
    /// Samples sorted current value first, then most recent first.
    fn decode_timestamped_data(
        &self,
        content: &[u8],
        path: &LwM2mPath,
        model: &dyn LwM2mModel,
    ) -> Result<Vec<TimestampedNode>>;
}

/// Several paths in one payload.
pub trait MultiNodeDecoder {
    /// With `paths`, one node per requested path that the payload covers.
    /// Without, one node per value found in the payload.
    fn decode_nodes(
        &self,
        content: &[u8],
        paths: Option<&[LwM2mPath]>,
        model: &dyn LwM2mModel,
    ) -> Result<BTreeMap<LwM2mPath, LwM2mNode>>;
}

/// Several paths sampled at several times.
pub trait TimestampedMultiNodeDecoder {
    fn decode_timestamped_nodes(&self, content: &[u8], model: &dyn LwM2mModel) -> Result<TimestampedNodes>;
}

/// A list of paths without values.
pub trait PathDecoder {
    fn decode_paths(&self, content: &[u8]) -> Result<Vec<LwM2mPath>>;
}

/// A single node to bytes.
pub trait NodeEncoder: Send + Sync {
    fn encode(
        &self,
        node: &LwM2mNode,
        path: &LwM2mPath,
        model: &dyn LwM2mModel,
        converter: &dyn ValueConverter,
    ) -> Result<Vec<u8>>;

    fn as_timestamped(&self) -> Option<&dyn TimestampedNodeEncoder> {
        None
    }

    fn as_multi(&self) -> Option<&dyn MultiNodeEncoder> {
        None
    }

    fn as_timestamped_multi(&self) -> Option<&dyn TimestampedMultiNodeEncoder> {
        None
    }

    fn as_path_encoder(&self) -> Option<&dyn PathEncoder> {
        None
    }
}

pub trait TimestampedNodeEncoder {
    fn encode_timestamped_data(
        &self,
        nodes: &[TimestampedNode],
        path: &LwM2mPath,
        model: &dyn LwM2mModel,
        converter: &dyn ValueConverter,
    ) -> Result<Vec<u8>>;
}

pub trait MultiNodeEncoder {
    fn encode_nodes(
        &self,
        nodes: &BTreeMap<LwM2mPath, LwM2mNode>,
        model: &dyn LwM2mModel,
        converter: &dyn ValueConverter,
    ) -> Result<Vec<u8>>;
}

pub trait TimestampedMultiNodeEncoder {
    fn encode_timestamped_nodes(
        &self,
        nodes: &TimestampedNodes,
        model: &dyn LwM2mModel,
        converter: &dyn ValueConverter,
    ) -> Result<Vec<u8>>;
}

pub trait PathEncoder {
    fn encode_paths(&self, paths: &[LwM2mPath]) -> Result<Vec<u8>>;
}

/// Check that `node` may be encoded at `path`.
///
/// An object instance may also be written at its object's path, with or
/// without an id.
pub(crate) fn check_node_path(node: &LwM2mNode, path: &LwM2mPath) -> Result<()> {
    let consistent = match (node, path) {
        (LwM2mNode::ObjectInstance(_), LwM2mPath::Object(_)) => true,
        (LwM2mNode::ObjectInstance(instance), LwM2mPath::ObjectInstance(_, id)) => {
            instance.id() == InstanceId::Undefined || instance.id() == InstanceId::Id(*id)
        }
        _ => node.is_consistent_with(path),
    };
    if consistent {
        Ok(())
    } else {
        Err(CodecError::invalid_at(
            *path,
            format!(
                "{} with id {} cannot be encoded at this path",
                node.kind(),
                node.id().map_or_else(|| "UNDEFINED".to_string(), |id| id.to_string()),
            ),
        ))
    }
}

/// Path of an object instance written at `path`, which may be its object's.
pub(crate) fn instance_path(instance: &LwM2mObjectInstance, path: &LwM2mPath) -> Result<LwM2mPath> {
    match (*path, instance.id()) {
        (LwM2mPath::ObjectInstance(..), _) => Ok(*path),
        (LwM2mPath::Object(object_id), InstanceId::Id(id)) => Ok(LwM2mPath::ObjectInstance(object_id, id)),
        _ => Err(CodecError::invalid_at(*path, "object instance id is mandatory for this format")),
    }
}
