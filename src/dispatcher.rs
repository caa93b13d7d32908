//! Content-format registries.
//!
//! [`LwM2mDecoder`] and [`LwM2mEncoder`] map a [`ContentFormat`] to the codec
//! handling it and expose the single, batch and time-series operations over
//! every registered format. A format that lacks a batch or series capability
//! either falls back to its single-node codec (series of one current node) or
//! reports [`CodecError::UnsupportedOperation`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::debug;

use crate::codec::{
    CborNodeDecoder, CborNodeEncoder, JsonNodeDecoder, JsonNodeEncoder, NodeDecoder, NodeEncoder,
    OpaqueNodeDecoder, OpaqueNodeEncoder, SenMLNodeDecoder, SenMLNodeEncoder, TextNodeDecoder,
    TextNodeEncoder, TlvNodeDecoder, TlvNodeEncoder,
};
use crate::config::Config;
use crate::content_format::ContentFormat;
use crate::converter::ValueConverter;
use crate::error::{CodecError, Result};
use crate::model::LwM2mModel;
use crate::node::{LwM2mNode, NodeKind, TimestampedNode, TimestampedNodes};
use crate::path::LwM2mPath;

/// Node kind a decode at `path` produces; the root addresses none.
pub fn node_kind_for_path(path: &LwM2mPath) -> Result<NodeKind> {
    NodeKind::for_path(path).ok_or_else(|| CodecError::invalid_at(*path, "no node kind for the root path"))
}

fn required(format: Option<ContentFormat>) -> Result<ContentFormat> {
    format.ok_or(CodecError::MissingContentFormat)
}

fn sorted(formats: impl Iterator<Item = ContentFormat>) -> Vec<ContentFormat> {
    let mut formats: Vec<_> = formats.collect();
    formats.sort();
    formats
}

/// Decodes payloads of every registered content format.
#[derive(Clone)]
pub struct LwM2mDecoder {
    decoders: HashMap<ContentFormat, Arc<dyn NodeDecoder>>,
}

impl LwM2mDecoder {
    pub fn new(config: &Config) -> Self {
        let tlv: Arc<dyn NodeDecoder> = Arc::new(TlvNodeDecoder);
        let json: Arc<dyn NodeDecoder> = Arc::new(JsonNodeDecoder);

        let mut decoders: HashMap<ContentFormat, Arc<dyn NodeDecoder>> = HashMap::new();
        decoders.insert(ContentFormat::TEXT, Arc::new(TextNodeDecoder));
        decoders.insert(ContentFormat::OPAQUE, Arc::new(OpaqueNodeDecoder));
        decoders.insert(ContentFormat::CBOR, Arc::new(CborNodeDecoder));
        decoders.insert(ContentFormat::SENML_JSON, Arc::new(SenMLNodeDecoder::json()));
        decoders.insert(ContentFormat::SENML_CBOR, Arc::new(SenMLNodeDecoder::cbor()));
        decoders.insert(ContentFormat::TLV, tlv.clone());
        decoders.insert(ContentFormat::JSON, json.clone());
        if config.support_deprecated_content_format {
            decoders.insert(ContentFormat::OLD_TLV, tlv);
            decoders.insert(ContentFormat::OLD_JSON, json);
        }
        Self { decoders }
    }

    /// Register `decoder` for `format`, replacing any previous one.
    pub fn with_decoder(mut self, format: ContentFormat, decoder: Arc<dyn NodeDecoder>) -> Self {
        self.decoders.insert(format, decoder);
        self
    }

    pub fn is_supported(&self, format: ContentFormat) -> bool {
        self.decoders.contains_key(&format)
    }

    /// Registered formats in ascending code order.
    pub fn supported_formats(&self) -> Vec<ContentFormat> {
        sorted(self.decoders.keys().copied())
    }

    fn decoder(&self, format: Option<ContentFormat>, path: Option<&LwM2mPath>) -> Result<(ContentFormat, &dyn NodeDecoder)> {
        let format = required(format)?;
        let decoder = self
            .decoders
            .get(&format)
            .ok_or(CodecError::UnsupportedContentFormat { format, path: path.copied() })?;
        Ok((format, decoder.as_ref()))
    }

    /// Decode the node at `path`; its level selects the node kind.
    pub fn decode(
        &self,
        content: &[u8],
        format: Option<ContentFormat>,
        path: &LwM2mPath,
        model: &dyn LwM2mModel,
    ) -> Result<LwM2mNode> {
        let (format, decoder) = self.decoder(format, Some(path))?;
        debug!(%format, %path, len = content.len(), "decoding node");
        decoder.decode(content, path, model)
    }

    /// Decode a node of `kind` at `path`. An object instance may be requested
    /// at its object's path.
    pub fn decode_as(
        &self,
        content: &[u8],
        format: Option<ContentFormat>,
        path: &LwM2mPath,
        model: &dyn LwM2mModel,
        kind: NodeKind,
    ) -> Result<LwM2mNode> {
        node_kind_for_path(path)?;
        let (format, decoder) = self.decoder(format, Some(path))?;
        debug!(%format, %path, %kind, len = content.len(), "decoding node");
        decoder.decode_kind(content, path, model, kind)
    }

    /// Several nodes from one payload, for the requested paths or every path
    /// the payload holds.
    pub fn decode_nodes(
        &self,
        content: &[u8],
        format: Option<ContentFormat>,
        paths: Option<&[LwM2mPath]>,
        model: &dyn LwM2mModel,
    ) -> Result<BTreeMap<LwM2mPath, LwM2mNode>> {
        let (format, decoder) = self.decoder(format, None)?;
        let multi = decoder.as_multi().ok_or(CodecError::UnsupportedOperation {
            operation: "decode_nodes",
            format,
        })?;
        debug!(%format, requested = ?paths, "decoding nodes");
        multi.decode_nodes(content, paths, model)
    }

    /// Series of one path, current value first, then most recent first.
    ///
    /// Formats without series support yield their node as the current value.
    pub fn decode_timestamped_data(
        &self,
        content: &[u8],
        format: Option<ContentFormat>,
        path: &LwM2mPath,
        model: &dyn LwM2mModel,
    ) -> Result<Vec<TimestampedNode>> {
        let (format, decoder) = self.decoder(format, Some(path))?;
        match decoder.as_timestamped() {
            Some(timestamped) => {
                debug!(%format, %path, "decoding time series");
                timestamped.decode_timestamped_data(content, path, model)
            }
            None => {
                debug!(%format, %path, "no time series support, decoding a current node");
                Ok(vec![TimestampedNode::current(decoder.decode(content, path, model)?)])
            }
        }
    }

    pub fn decode_timestamped_nodes(
        &self,
        content: &[u8],
        format: Option<ContentFormat>,
        model: &dyn LwM2mModel,
    ) -> Result<TimestampedNodes> {
        let (format, decoder) = self.decoder(format, None)?;
        let multi = decoder.as_timestamped_multi().ok_or(CodecError::UnsupportedOperation {
            operation: "decode_timestamped_nodes",
            format,
        })?;
        debug!(%format, "decoding timestamped nodes");
        multi.decode_timestamped_nodes(content, model)
    }

    pub fn decode_paths(&self, content: &[u8], format: Option<ContentFormat>) -> Result<Vec<LwM2mPath>> {
        let (format, decoder) = self.decoder(format, None)?;
        let paths = decoder.as_path_decoder().ok_or(CodecError::UnsupportedOperation {
            operation: "decode_paths",
            format,
        })?;
        debug!(%format, "decoding paths");
        paths.decode_paths(content)
    }
}

impl Default for LwM2mDecoder {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl std::fmt::Debug for LwM2mDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LwM2mDecoder")
            .field("formats", &self.supported_formats())
            .finish()
    }
}

/// Encodes nodes into every registered content format.
#[derive(Clone)]
pub struct LwM2mEncoder {
    encoders: HashMap<ContentFormat, Arc<dyn NodeEncoder>>,
    converter: Arc<dyn ValueConverter>,
}

impl LwM2mEncoder {
    pub fn new(config: &Config) -> Self {
        let tlv: Arc<dyn NodeEncoder> =
            Arc::new(TlvNodeEncoder::new().with_instance_mode(config.tlv_instance_mode));
        let json: Arc<dyn NodeEncoder> = Arc::new(JsonNodeEncoder);

        let mut encoders: HashMap<ContentFormat, Arc<dyn NodeEncoder>> = HashMap::new();
        encoders.insert(ContentFormat::TEXT, Arc::new(TextNodeEncoder));
        encoders.insert(ContentFormat::OPAQUE, Arc::new(OpaqueNodeEncoder));
        encoders.insert(ContentFormat::CBOR, Arc::new(CborNodeEncoder));
        encoders.insert(ContentFormat::SENML_JSON, Arc::new(SenMLNodeEncoder::json()));
        encoders.insert(ContentFormat::SENML_CBOR, Arc::new(SenMLNodeEncoder::cbor()));
        encoders.insert(ContentFormat::TLV, tlv.clone());
        encoders.insert(ContentFormat::JSON, json.clone());
        if config.support_deprecated_content_format {
            encoders.insert(ContentFormat::OLD_TLV, tlv);
            encoders.insert(ContentFormat::OLD_JSON, json);
        }
        Self {
            encoders,
            converter: config.converter.converter(),
        }
    }

    /// Register `encoder` for `format`, replacing any previous one.
    pub fn with_encoder(mut self, format: ContentFormat, encoder: Arc<dyn NodeEncoder>) -> Self {
        self.encoders.insert(format, encoder);
        self
    }

    pub fn with_converter(mut self, converter: Arc<dyn ValueConverter>) -> Self {
        self.converter = converter;
        self
    }

    pub fn is_supported(&self, format: ContentFormat) -> bool {
        self.encoders.contains_key(&format)
    }

    /// Registered formats in ascending code order.
    pub fn supported_formats(&self) -> Vec<ContentFormat> {
        sorted(self.encoders.keys().copied())
    }

    fn encoder(&self, format: Option<ContentFormat>, path: Option<&LwM2mPath>) -> Result<(ContentFormat, &dyn NodeEncoder)> {
        let format = required(format)?;
        let encoder = self
            .encoders
            .get(&format)
            .ok_or(CodecError::UnsupportedContentFormat { format, path: path.copied() })?;
        Ok((format, encoder.as_ref()))
    }

    pub fn encode(
        &self,
        node: &LwM2mNode,
        format: Option<ContentFormat>,
        path: &LwM2mPath,
        model: &dyn LwM2mModel,
    ) -> Result<Vec<u8>> {
        let (format, encoder) = self.encoder(format, Some(path))?;
        debug!(%format, %path, kind = %node.kind(), "encoding node");
        encoder.encode(node, path, model, self.converter.as_ref())
    }

    pub fn encode_nodes(
        &self,
        nodes: &BTreeMap<LwM2mPath, LwM2mNode>,
        format: Option<ContentFormat>,
        model: &dyn LwM2mModel,
    ) -> Result<Vec<u8>> {
        let (format, encoder) = self.encoder(format, None)?;
        let multi = encoder.as_multi().ok_or(CodecError::UnsupportedOperation {
            operation: "encode_nodes",
            format,
        })?;
        debug!(%format, count = nodes.len(), "encoding nodes");
        multi.encode_nodes(nodes, model, self.converter.as_ref())
    }

    /// Series of one path.
    ///
    /// Formats without series support only accept a single current node.
    pub fn encode_timestamped_data(
        &self,
        nodes: &[TimestampedNode],
        format: Option<ContentFormat>,
        path: &LwM2mPath,
        model: &dyn LwM2mModel,
    ) -> Result<Vec<u8>> {
        let (format, encoder) = self.encoder(format, Some(path))?;
        if let Some(timestamped) = encoder.as_timestamped() {
            debug!(%format, %path, samples = nodes.len(), "encoding time series");
            return timestamped.encode_timestamped_data(nodes, path, model, self.converter.as_ref());
        }
        match nodes {
            [single] if !single.is_timestamped() => {
                debug!(%format, %path, "no time series support, encoding the current node");
                encoder.encode(&single.node, path, model, self.converter.as_ref())
            }
            _ => Err(CodecError::UnsupportedOperation {
                operation: "encode_timestamped_data",
                format,
            }),
        }
    }

    pub fn encode_timestamped_nodes(
        &self,
        nodes: &TimestampedNodes,
        format: Option<ContentFormat>,
        model: &dyn LwM2mModel,
    ) -> Result<Vec<u8>> {
        let (format, encoder) = self.encoder(format, None)?;
        let multi = encoder.as_timestamped_multi().ok_or(CodecError::UnsupportedOperation {
            operation: "encode_timestamped_nodes",
            format,
        })?;
        debug!(%format, count = nodes.len(), "encoding timestamped nodes");
        multi.encode_timestamped_nodes(nodes, model, self.converter.as_ref())
    }

    pub fn encode_paths(&self, paths: &[LwM2mPath], format: Option<ContentFormat>) -> Result<Vec<u8>> {
        let (format, encoder) = self.encoder(format, None)?;
        let path_encoder = encoder.as_path_encoder().ok_or(CodecError::UnsupportedOperation {
            operation: "encode_paths",
            format,
        })?;
        debug!(%format, count = paths.len(), "encoding paths");
        path_encoder.encode_paths(paths)
    }
}

impl Default for LwM2mEncoder {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl std::fmt::Debug for LwM2mEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LwM2mEncoder")
            .field("formats", &self.supported_formats())
            .finish()
    }
}
