//! Raw bytes (`application/octet-stream`) for opaque resources.

use tracing::trace;

use super::text::{check_value_path, single_value, single_value_node};
use crate::codec::{NodeDecoder, NodeEncoder, check_node_path};
use crate::converter::ValueConverter;
use crate::error::{CodecError, Result};
use crate::model::{LwM2mModel, ResourceType};
use crate::node::{LwM2mNode, Value};
use crate::path::LwM2mPath;

/// Decoder for `application/octet-stream`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpaqueNodeDecoder;

impl NodeDecoder for OpaqueNodeDecoder {
    fn decode(&self, content: &[u8], path: &LwM2mPath, model: &dyn LwM2mModel) -> Result<LwM2mNode> {
        check_value_path(path, model, "opaque")?;
        match model.resource_type(path) {
            Some(ResourceType::Opaque) => {}
            Some(other) => {
                return Err(CodecError::invalid_at(
                    *path,
                    format!("opaque content cannot carry a {} resource", other),
                ));
            }
            None => trace!(%path, "unknown resource, decoding raw bytes as opaque"),
        }
        Ok(single_value_node(path, Value::Opaque(content.to_vec())))
    }
}

/// Encoder for `application/octet-stream`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpaqueNodeEncoder;

impl NodeEncoder for OpaqueNodeEncoder {
    fn encode(
        &self,
        node: &LwM2mNode,
        path: &LwM2mPath,
        model: &dyn LwM2mModel,
        converter: &dyn ValueConverter,
    ) -> Result<Vec<u8>> {
        check_node_path(node, path)?;
        let value = single_value(node, path, "opaque")?;
        let expected = model.resource_type(path).unwrap_or(ResourceType::Opaque);
        match converter.convert(value.clone(), Some(expected), path)? {
            Value::Opaque(bytes) => Ok(bytes),
            other => Err(CodecError::invalid_at(
                *path,
                format!("opaque content cannot carry a {} value", other.kind()),
            )),
        }
    }
}
