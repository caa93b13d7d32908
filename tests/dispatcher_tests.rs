//! Format selection and behavior shared by every content format.

use std::sync::Arc;

use lwm2m_codec::codec::{NodeDecoder, NodeEncoder};
use lwm2m_codec::converter::ValueConverter;
use lwm2m_codec::model::LwM2mModel;
use lwm2m_codec::test_utils::{device_resources, init_tracing, test_model};
use lwm2m_codec::{
    CodecError, Config, ContentFormat, LwM2mDecoder, LwM2mEncoder, LwM2mNode, LwM2mObjectInstance, LwM2mPath,
    LwM2mResource, NodeKind, TimestampedNode, Value,
};

const HEX_TEXT: ContentFormat = ContentFormat::new(65000);

/// Single values as upper case hex text, registered under a private code.
struct HexCodec;

impl NodeDecoder for HexCodec {
    fn decode(&self, content: &[u8], path: &LwM2mPath, _model: &dyn LwM2mModel) -> lwm2m_codec::Result<LwM2mNode> {
        let bytes = hex::decode(content).map_err(|e| CodecError::invalid_literal_with("hex", "content", e))?;
        Ok(LwM2mResource::single(path.resource_id().unwrap_or_default(), bytes).into())
    }
}

impl NodeEncoder for HexCodec {
    fn encode(
        &self,
        node: &LwM2mNode,
        path: &LwM2mPath,
        _model: &dyn LwM2mModel,
        _converter: &dyn ValueConverter,
    ) -> lwm2m_codec::Result<Vec<u8>> {
        match node.as_resource().and_then(LwM2mResource::value) {
            Some(Value::Opaque(bytes)) => Ok(hex::encode_upper(bytes).into_bytes()),
            _ => Err(CodecError::invalid_at(*path, "hex text carries opaque resources only")),
        }
    }
}

fn device_instance() -> LwM2mNode {
    LwM2mObjectInstance::new(0, device_resources()).into()
}

mod format_selection_tests {
    use super::*;

    #[test]
    fn test_instance_formats_agree() {
        init_tracing();
        let path = LwM2mPath::ObjectInstance(3, 0);
        let encoder = LwM2mEncoder::default();
        let decoder = LwM2mDecoder::default();

        for format in [
            ContentFormat::TLV,
            ContentFormat::JSON,
            ContentFormat::SENML_JSON,
            ContentFormat::SENML_CBOR,
        ] {
            let content = encoder
                .encode(&device_instance(), Some(format), &path, &test_model())
                .unwrap();
            let decoded = decoder.decode(&content, Some(format), &path, &test_model()).unwrap();
            assert_eq!(decoded, device_instance(), "format {}", format);
        }
    }

    #[test]
    fn test_single_value_formats_reject_instances() {
        let path = LwM2mPath::ObjectInstance(3, 0);
        for format in [ContentFormat::TEXT, ContentFormat::CBOR, ContentFormat::OPAQUE] {
            let result = LwM2mEncoder::default().encode(&device_instance(), Some(format), &path, &test_model());
            assert!(matches!(result, Err(CodecError::Invalid { .. })), "format {}", format);
        }
    }

    #[test]
    fn test_node_must_match_path() {
        let result = LwM2mEncoder::default().encode(
            &LwM2mResource::single(9, 100i64).into(),
            Some(ContentFormat::TLV),
            &LwM2mPath::Resource(3, 0, 10),
            &test_model(),
        );
        assert!(matches!(result, Err(CodecError::Invalid { .. })));
    }

    #[test]
    fn test_deprecated_codes() {
        let config = Config::default().with_deprecated_content_format(true);
        let path = LwM2mPath::Resource(3, 0, 9);
        let node: LwM2mNode = LwM2mResource::single(9, 100i64).into();

        let content = LwM2mEncoder::new(&config)
            .encode(&node, Some(ContentFormat::OLD_JSON), &path, &test_model())
            .unwrap();
        assert_eq!(String::from_utf8(content.clone()).unwrap(), r#"{"bn":"/3/0/9","e":[{"v":100}]}"#);
        let decoded = LwM2mDecoder::new(&config)
            .decode(&content, Some(ContentFormat::OLD_JSON), &path, &test_model())
            .unwrap();
        assert_eq!(decoded, node);

        let result = LwM2mDecoder::default().decode(&content, Some(ContentFormat::OLD_JSON), &path, &test_model());
        assert!(matches!(result, Err(CodecError::UnsupportedContentFormat { .. })));
    }

    #[test]
    fn test_decode_as_checks_the_kind() {
        let decoder = LwM2mDecoder::default();
        let content = hex::decode("C10964").unwrap();
        let path = LwM2mPath::Resource(3, 0, 9);
        assert!(decoder
            .decode_as(&content, Some(ContentFormat::TLV), &path, &test_model(), NodeKind::Resource)
            .is_ok());
        assert!(matches!(
            decoder.decode_as(&content, Some(ContentFormat::TLV), &path, &test_model(), NodeKind::Object),
            Err(CodecError::Invalid { .. })
        ));
    }

    #[test]
    fn test_decode_as_instance_at_object_path() {
        let decoder = LwM2mDecoder::default();
        let content = hex::decode("C10964").unwrap();
        let node = decoder
            .decode_as(&content, Some(ContentFormat::TLV), &LwM2mPath::Object(3), &test_model(), NodeKind::ObjectInstance)
            .unwrap();
        let expected: LwM2mNode = LwM2mObjectInstance::new(0, [LwM2mResource::single(9, 100i64)]).into();
        assert_eq!(node, expected);

        let wrapped = hex::decode("0300C10964").unwrap();
        let node = decoder
            .decode_as(&wrapped, Some(ContentFormat::TLV), &LwM2mPath::Object(3), &test_model(), NodeKind::ObjectInstance)
            .unwrap();
        assert_eq!(node, expected);
    }

    #[test]
    fn test_decode_as_rejects_other_mismatches() {
        let decoder = LwM2mDecoder::default();
        let two_instances = hex::decode("0300C100010301C10002").unwrap();
        assert!(matches!(
            decoder.decode_as(
                &two_instances,
                Some(ContentFormat::TLV),
                &LwM2mPath::Object(1),
                &test_model(),
                NodeKind::ObjectInstance
            ),
            Err(CodecError::Invalid { .. })
        ));

        let content = hex::decode("C10964").unwrap();
        assert!(matches!(
            decoder.decode_as(
                &content,
                Some(ContentFormat::TLV),
                &LwM2mPath::Object(3),
                &test_model(),
                NodeKind::Resource
            ),
            Err(CodecError::Invalid { .. })
        ));
        assert!(matches!(
            decoder.decode_as(&content, Some(ContentFormat::TLV), &LwM2mPath::Root, &test_model(), NodeKind::Object),
            Err(CodecError::Invalid { .. })
        ));
    }

    #[test]
    fn test_operations_without_support() {
        let decoder = LwM2mDecoder::default();
        let encoder = LwM2mEncoder::default();

        assert!(matches!(
            decoder.decode_paths(b"", Some(ContentFormat::TLV)),
            Err(CodecError::UnsupportedOperation { operation: "decode_paths", .. })
        ));
        assert!(matches!(
            decoder.decode_nodes(b"1", Some(ContentFormat::TEXT), None, &test_model()),
            Err(CodecError::UnsupportedOperation { operation: "decode_nodes", .. })
        ));
        assert!(matches!(
            encoder.encode_paths(&[LwM2mPath::Object(3)], Some(ContentFormat::JSON)),
            Err(CodecError::UnsupportedOperation { operation: "encode_paths", .. })
        ));

        let series = [TimestampedNode::new(
            Some(time::OffsetDateTime::UNIX_EPOCH),
            LwM2mResource::single(9, 100i64).into(),
        )];
        assert!(matches!(
            encoder.encode_timestamped_data(&series, Some(ContentFormat::TLV), &LwM2mPath::Resource(3, 0, 9), &test_model()),
            Err(CodecError::UnsupportedOperation { operation: "encode_timestamped_data", .. })
        ));
    }
}

mod registration_tests {
    use super::*;

    #[test]
    fn test_custom_codec() {
        let decoder = LwM2mDecoder::default().with_decoder(HEX_TEXT, Arc::new(HexCodec));
        let encoder = LwM2mEncoder::default().with_encoder(HEX_TEXT, Arc::new(HexCodec));
        assert!(decoder.is_supported(HEX_TEXT));
        assert_eq!(decoder.supported_formats().last(), Some(&HEX_TEXT));

        let path = LwM2mPath::Resource(0, 0, 3);
        let node: LwM2mNode = LwM2mResource::single(3, vec![0xCAu8, 0xFE]).into();
        let content = encoder.encode(&node, Some(HEX_TEXT), &path, &test_model()).unwrap();
        assert_eq!(content, b"CAFE");
        assert_eq!(decoder.decode(&content, Some(HEX_TEXT), &path, &test_model()).unwrap(), node);
    }

    #[test]
    fn test_custom_codec_replaces_builtin() {
        let decoder = LwM2mDecoder::default().with_decoder(ContentFormat::TEXT, Arc::new(HexCodec));
        let node = decoder
            .decode(b"0102", Some(ContentFormat::TEXT), &LwM2mPath::Resource(0, 0, 3), &test_model())
            .unwrap();
        assert_eq!(node.as_resource().unwrap().value(), Some(&Value::Opaque(vec![1, 2])));
    }

    #[test]
    fn test_custom_converter() {
        struct Doubling;

        impl ValueConverter for Doubling {
            fn convert(
                &self,
                value: Value,
                _expected: Option<lwm2m_codec::model::ResourceType>,
                _path: &LwM2mPath,
            ) -> lwm2m_codec::Result<Value> {
                Ok(match value {
                    Value::Integer(i) => Value::Integer(i * 2),
                    other => other,
                })
            }
        }

        let encoder = LwM2mEncoder::default().with_converter(Arc::new(Doubling));
        let content = encoder
            .encode(
                &LwM2mResource::single(9, 21i64).into(),
                Some(ContentFormat::TEXT),
                &LwM2mPath::Resource(3, 0, 9),
                &test_model(),
            )
            .unwrap();
        assert_eq!(content, b"42");
    }
}
