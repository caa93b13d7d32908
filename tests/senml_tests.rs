//! SenML JSON and SenML CBOR payloads.

use std::collections::BTreeMap;

use lwm2m_codec::test_utils::{device_resources, test_model};
use lwm2m_codec::{
    CodecError, ContentFormat, LwM2mDecoder, LwM2mEncoder, LwM2mNode, LwM2mObjectInstance, LwM2mPath,
    LwM2mResource, TimestampedNode, TimestampedNodes, Value,
};
use time::OffsetDateTime;

const DEVICE: &str = r#"[{"bn":"/3/0/","n":"0","vs":"Open Mobile Alliance"},{"n":"1","vs":"Lightweight M2M Client"},{"n":"2","vs":"345000123"},{"n":"3","vs":"1.0"},{"n":"6/0","v":1},{"n":"6/1","v":5},{"n":"7/0","v":3800},{"n":"7/1","v":5000},{"n":"8/0","v":125},{"n":"8/1","v":900},{"n":"9","v":100},{"n":"10","v":15},{"n":"11/0","v":0},{"n":"13","v":1367491215},{"n":"14","vs":"+02:00"},{"n":"16","vs":"U"}]"#;

fn decoder() -> LwM2mDecoder {
    LwM2mDecoder::default()
}

fn encoder() -> LwM2mEncoder {
    LwM2mEncoder::default()
}

fn decode(json: &str, path: LwM2mPath) -> Result<LwM2mNode, CodecError> {
    decoder().decode(json.as_bytes(), Some(ContentFormat::SENML_JSON), &path, &test_model())
}

fn encode(node: impl Into<LwM2mNode>, path: LwM2mPath) -> String {
    let bytes = encoder()
        .encode(&node.into(), Some(ContentFormat::SENML_JSON), &path, &test_model())
        .unwrap();
    String::from_utf8(bytes).unwrap()
}

fn at(seconds: i64) -> Option<OffsetDateTime> {
    Some(OffsetDateTime::from_unix_timestamp(seconds).unwrap())
}

fn value(instance: &LwM2mObjectInstance, id: u16) -> Value {
    instance.resource(id).unwrap().value().cloned().unwrap()
}

mod decode_tests {
    use super::*;

    #[test]
    fn test_device_instance() {
        let node = decode(DEVICE, LwM2mPath::ObjectInstance(3, 0)).unwrap();
        assert_eq!(node, LwM2mNode::from(LwM2mObjectInstance::new(0, device_resources())));
    }

    #[test]
    fn test_single_and_multiple_resources() {
        let node = decode(r#"[{"bn":"/3/0/0","vs":"Open Mobile Alliance"}]"#, LwM2mPath::Resource(3, 0, 0)).unwrap();
        assert_eq!(node.as_resource().unwrap().value(), Some(&Value::from("Open Mobile Alliance")));

        let node = decode(
            r#"[{"bn":"/3/0/7/","n":"0","v":3800},{"n":"1","v":5000}]"#,
            LwM2mPath::Resource(3, 0, 7),
        )
        .unwrap();
        let resource = node.as_resource().unwrap();
        assert!(resource.is_multiple());
        assert_eq!(resource.instance(0), Some(&Value::Integer(3800)));
        assert_eq!(resource.instance(1), Some(&Value::Integer(5000)));
    }

    #[test]
    fn test_base_name_ends_inside_a_resource_id() {
        let node = decode(r#"[{"bn":"/3/0/1","n":"1/0","v":1},{"n":"1/1","v":5}]"#, LwM2mPath::Resource(3, 0, 11)).unwrap();
        let resource = node.as_resource().unwrap();
        assert_eq!(resource.id(), 11);
        assert!(resource.is_multiple());
        assert_eq!(resource.instance(0), Some(&Value::Integer(1)));
        assert_eq!(resource.instance(1), Some(&Value::Integer(5)));
    }

    #[test]
    fn test_time_as_float() {
        let node = decode(r#"[{"bn":"/3/0/13","v":1.638435E9}]"#, LwM2mPath::Resource(3, 0, 13)).unwrap();
        assert_eq!(
            node.as_resource().unwrap().value(),
            Some(&Value::Time(OffsetDateTime::from_unix_timestamp(1638435000).unwrap()))
        );
    }

    #[test]
    fn test_large_integers_stay_exact() {
        let node = decode(r#"[{"n":"/0/0/16","v":18446744073709551615}]"#, LwM2mPath::Resource(0, 0, 16)).unwrap();
        assert_eq!(node.as_resource().unwrap().value(), Some(&Value::UnsignedInteger(u64::MAX)));

        let node = decode(r#"[{"n":"/1/0/2","v":9223372036854775800}]"#, LwM2mPath::Resource(1, 0, 2)).unwrap();
        assert_eq!(
            node.as_resource().unwrap().value(),
            Some(&Value::Integer(9223372036854775800))
        );
    }

    #[test]
    fn test_empty_multiple_resource() {
        for payload in ["", "[]"] {
            let node = decode(payload, LwM2mPath::Resource(3, 0, 6)).unwrap();
            let resource = node.as_resource().unwrap();
            assert_eq!(resource.id(), 6);
            assert!(resource.is_multiple());
            assert_eq!(resource.instance(0), None);
        }
        assert!(matches!(
            decode("[]", LwM2mPath::Resource(3, 0, 9)),
            Err(CodecError::MissingValue { .. })
        ));
    }

    #[test]
    fn test_opaque() {
        let node = decode(r#"[{"bn":"/0/0/3","vd":"q83v"}]"#, LwM2mPath::Resource(0, 0, 3)).unwrap();
        assert_eq!(
            node.as_resource().unwrap().value(),
            Some(&Value::Opaque(vec![0xAB, 0xCD, 0xEF]))
        );

        let cbor = hex::decode("81a221662f302f302f330843abcdef").unwrap();
        let node = decoder()
            .decode(&cbor, Some(ContentFormat::SENML_CBOR), &LwM2mPath::Resource(0, 0, 3), &test_model())
            .unwrap();
        assert_eq!(
            node.as_resource().unwrap().value(),
            Some(&Value::Opaque(vec![0xAB, 0xCD, 0xEF]))
        );
    }

    #[test]
    fn test_timestamped_resource() {
        let json = r#"[{"bn":"/1024/0/1","v":22.9,"bt":268500000},{"v":22.4,"t":-5},{"v":24.1,"t":-50}]"#;
        let series = decoder()
            .decode_timestamped_data(
                json.as_bytes(),
                Some(ContentFormat::SENML_JSON),
                &LwM2mPath::Resource(1024, 0, 1),
                &test_model(),
            )
            .unwrap();
        let samples: Vec<_> = series
            .iter()
            .map(|n| (n.timestamp, n.node.as_resource().unwrap().value().cloned().unwrap()))
            .collect();
        assert_eq!(
            samples,
            vec![
                (at(268500000), Value::Float(22.9)),
                (at(268500000 - 5), Value::Float(22.4)),
                (at(268500000 - 50), Value::Float(24.1)),
            ]
        );
    }

    #[test]
    fn test_timestamped_instance() {
        let json = r#"[{"bn":"/1024/0/","bt":268600000, "n":"1", "v":22.9},{"n":"1","v":24.1,"t":-50},{"bt":268500000, "n":"0","vs":"a string"},{"n":"1","v":22.4}]"#;
        let series = decoder()
            .decode_timestamped_data(
                json.as_bytes(),
                Some(ContentFormat::SENML_JSON),
                &LwM2mPath::ObjectInstance(1024, 0),
                &test_model(),
            )
            .unwrap();
        assert_eq!(series.len(), 3);

        assert_eq!(series[0].timestamp, at(268600000));
        assert_eq!(value(series[0].node.as_object_instance().unwrap(), 1), Value::Float(22.9));
        assert_eq!(series[1].timestamp, at(268600000 - 50));
        assert_eq!(value(series[1].node.as_object_instance().unwrap(), 1), Value::Float(24.1));

        assert_eq!(series[2].timestamp, at(268500000));
        let oldest = series[2].node.as_object_instance().unwrap();
        assert_eq!(value(oldest, 0), Value::from("a string"));
        assert_eq!(value(oldest, 1), Value::Float(22.4));
    }

    #[test]
    fn test_nodes_for_requested_paths() {
        let json = r#"[{"bn":"/3/0/0","vs":"Open Mobile Alliance"},{"bn":"/3/0/9","v":95},{"bn":"/1/0/1","v":86400}]"#;
        let paths = [
            LwM2mPath::Resource(3, 0, 0),
            LwM2mPath::Resource(3, 0, 9),
            LwM2mPath::Resource(1, 0, 1),
        ];
        let nodes = decoder()
            .decode_nodes(json.as_bytes(), Some(ContentFormat::SENML_JSON), Some(&paths), &test_model())
            .unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(
            nodes[&paths[0]].as_resource().unwrap().value(),
            Some(&Value::from("Open Mobile Alliance"))
        );
        assert_eq!(nodes[&paths[1]].as_resource().unwrap().value(), Some(&Value::Integer(95)));
        assert_eq!(nodes[&paths[2]].as_resource().unwrap().value(), Some(&Value::Integer(86400)));
    }

    #[test]
    fn test_nodes_mixing_resources_and_instance() {
        let json = r#"[{"bn":"/4/0/0","v":45},{"bn":"/4/0/1","v":30},{"bn":"/4/0/2","v":100},{"bn":"/6/0/","n":"0","v":43.918998},{"n":"1","v":2.351149},{"n":"5","v":1610029880}]"#;
        let paths = [
            LwM2mPath::Resource(4, 0, 0),
            LwM2mPath::Resource(4, 0, 1),
            LwM2mPath::Resource(4, 0, 2),
            LwM2mPath::ObjectInstance(6, 0),
        ];
        let nodes = decoder()
            .decode_nodes(json.as_bytes(), Some(ContentFormat::SENML_JSON), Some(&paths), &test_model())
            .unwrap();
        assert_eq!(nodes.len(), 4);

        let location = nodes[&paths[3]].as_object_instance().unwrap();
        assert_eq!(value(location, 0), Value::Float(43.918998));
        assert_eq!(value(location, 1), Value::Float(2.351149));
        assert_eq!(value(location, 5), Value::Integer(1610029880));
    }

    #[test]
    fn test_paths() {
        let expected = vec![
            LwM2mPath::Resource(4, 0, 0),
            LwM2mPath::Resource(4, 0, 1),
            LwM2mPath::Resource(4, 0, 2),
        ];
        for json in [
            r#"[{"n":"/4/0/0"},{"n":"/4/0/1"},{"n":"/4/0/2"}]"#,
            r#"[{"bn":"/4/0/", "n":"0"},{"n":"1"},{"n":"2"}]"#,
        ] {
            let paths = decoder()
                .decode_paths(json.as_bytes(), Some(ContentFormat::SENML_JSON))
                .unwrap();
            assert_eq!(paths, expected);
        }
    }

    #[test]
    fn test_paths_reject_values_and_times() {
        for json in [
            r#"[{"bn":"/4/0/", "n":"0"},{"n":"1", "v":200},{"n":"2"}]"#,
            r#"[{"bn":"/4/0/", "n":"0"},{"n":"1", "t":20000000},{"n":"2"}]"#,
        ] {
            assert!(decoder()
                .decode_paths(json.as_bytes(), Some(ContentFormat::SENML_JSON))
                .is_err());
        }
    }

    #[test]
    fn test_timestamped_nodes() {
        let json = r#"[{"bn":"/0/0/0","bt":500000001,"vs":"TestString"},{"bn":"/0/1/","bt":500000002,"n":"1","vb":true},{"n":"2","v":123}]"#;
        let nodes = decoder()
            .decode_timestamped_nodes(json.as_bytes(), Some(ContentFormat::SENML_JSON), &test_model())
            .unwrap();
        assert_eq!(nodes.timestamps(), vec![at(500000002), at(500000001)]);

        let latest = nodes.nodes_at(at(500000002)).unwrap();
        assert_eq!(
            latest[&LwM2mPath::Resource(0, 1, 1)].as_resource().unwrap().value(),
            Some(&Value::Boolean(true))
        );
        assert_eq!(
            latest[&LwM2mPath::Resource(0, 1, 2)].as_resource().unwrap().value(),
            Some(&Value::Integer(123))
        );
        let oldest = nodes.nodes_at(at(500000001)).unwrap();
        assert_eq!(
            oldest[&LwM2mPath::Resource(0, 0, 0)].as_resource().unwrap().value(),
            Some(&Value::from("TestString"))
        );
    }
}

mod encode_tests {
    use super::*;

    #[test]
    fn test_device_instance() {
        let instance = LwM2mObjectInstance::new(0, device_resources());
        assert_eq!(encode(instance, LwM2mPath::ObjectInstance(3, 0)), DEVICE);
    }

    #[test]
    fn test_single_and_multiple_resources() {
        assert_eq!(
            encode(LwM2mResource::single(0, "Open Mobile Alliance"), LwM2mPath::Resource(3, 0, 0)),
            r#"[{"bn":"/3/0/0","vs":"Open Mobile Alliance"}]"#
        );

        let voltage = device_resources().into_iter().find(|r| r.id() == 7).unwrap();
        assert_eq!(
            encode(voltage, LwM2mPath::Resource(3, 0, 7)),
            r#"[{"bn":"/3/0/7/","n":"0","v":3800},{"n":"1","v":5000}]"#
        );
    }

    #[test]
    fn test_opaque() {
        let resource = LwM2mResource::single(3, vec![0xABu8, 0xCD, 0xEF]);
        assert_eq!(
            encode(resource.clone(), LwM2mPath::Resource(0, 0, 3)),
            r#"[{"bn":"/0/0/3","vd":"q83v"}]"#
        );

        let cbor = encoder()
            .encode(&resource.into(), Some(ContentFormat::SENML_CBOR), &LwM2mPath::Resource(0, 0, 3), &test_model())
            .unwrap();
        assert_eq!(hex::encode(cbor), "81a221662f302f302f330843abcdef");
    }

    #[test]
    fn test_nodes() {
        let nodes: BTreeMap<LwM2mPath, LwM2mNode> = [
            (LwM2mPath::Resource(3, 0, 0), LwM2mResource::single(0, "Open Mobile Alliance").into()),
            (LwM2mPath::Resource(3, 0, 9), LwM2mResource::single(9, 95i64).into()),
            (LwM2mPath::Resource(1, 0, 1), LwM2mResource::single(1, 86400i64).into()),
        ]
        .into_iter()
        .collect();
        let bytes = encoder()
            .encode_nodes(&nodes, Some(ContentFormat::SENML_JSON), &test_model())
            .unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"[{"bn":"/1/0/1","v":86400},{"bn":"/3/0/0","vs":"Open Mobile Alliance"},{"bn":"/3/0/9","v":95}]"#
        );
    }

    #[test]
    fn test_nodes_mixing_resources_and_instance() {
        let nodes: BTreeMap<LwM2mPath, LwM2mNode> = [
            (LwM2mPath::Resource(4, 0, 0), LwM2mResource::single(0, 45i64).into()),
            (LwM2mPath::Resource(4, 0, 1), LwM2mResource::single(1, 30i64).into()),
            (
                LwM2mPath::ObjectInstance(6, 0),
                LwM2mObjectInstance::new(
                    0,
                    [LwM2mResource::single(0, 43.918998), LwM2mResource::single(1, 2.351149)],
                )
                .into(),
            ),
        ]
        .into_iter()
        .collect();
        let bytes = encoder()
            .encode_nodes(&nodes, Some(ContentFormat::SENML_JSON), &test_model())
            .unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"[{"bn":"/4/0/0","v":45},{"bn":"/4/0/1","v":30},{"bn":"/6/0/","n":"0","v":43.918998},{"n":"1","v":2.351149}]"#
        );
    }

    #[test]
    fn test_paths() {
        let paths = [LwM2mPath::Resource(4, 0, 0), LwM2mPath::Resource(4, 0, 1), LwM2mPath::Resource(4, 0, 2)];
        let bytes = encoder()
            .encode_paths(&paths, Some(ContentFormat::SENML_JSON))
            .unwrap();
        assert_eq!(
            String::from_utf8(bytes.clone()).unwrap(),
            r#"[{"n":"/4/0/0"},{"n":"/4/0/1"},{"n":"/4/0/2"}]"#
        );
        assert_eq!(
            decoder().decode_paths(&bytes, Some(ContentFormat::SENML_JSON)).unwrap(),
            paths
        );
    }

    #[test]
    fn test_timestamped_resource() {
        let nodes = vec![
            TimestampedNode::new(at(268500000), LwM2mResource::single(1, 22.9).into()),
            TimestampedNode::new(at(268500010), LwM2mResource::single(1, 22.4).into()),
            TimestampedNode::new(at(268500020), LwM2mResource::single(1, 24.1).into()),
        ];
        let bytes = encoder()
            .encode_timestamped_data(
                &nodes,
                Some(ContentFormat::SENML_JSON),
                &LwM2mPath::Resource(1024, 0, 1),
                &test_model(),
            )
            .unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"[{"bn":"/1024/0/1","bt":268500020,"v":24.1},{"bn":"/1024/0/1","t":-10,"v":22.4},{"bn":"/1024/0/1","t":-20,"v":22.9}]"#
        );
    }

    #[test]
    fn test_timestamped_nodes() {
        let nodes = TimestampedNodes::builder()
            .put(at(500000001), LwM2mPath::Resource(0, 0, 0), LwM2mResource::single(0, "TestString").into())
            .put(
                at(500000002),
                LwM2mPath::ObjectInstance(0, 1),
                LwM2mObjectInstance::new(1, [LwM2mResource::single(1, true), LwM2mResource::single(2, 123i64)])
                    .into(),
            )
            .build()
            .unwrap();
        let bytes = encoder()
            .encode_timestamped_nodes(&nodes, Some(ContentFormat::SENML_JSON), &test_model())
            .unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"[{"bn":"/0/1/","bt":500000002,"n":"1","vb":true},{"n":"2","v":123},{"bn":"/0/0/0","t":-1,"vs":"TestString"}]"#
        );
    }

    #[test]
    fn test_cbor_round_trip_of_device_instance() {
        let instance: LwM2mNode = LwM2mObjectInstance::new(0, device_resources()).into();
        let path = LwM2mPath::ObjectInstance(3, 0);
        let cbor = encoder()
            .encode(&instance, Some(ContentFormat::SENML_CBOR), &path, &test_model())
            .unwrap();
        let decoded = decoder()
            .decode(&cbor, Some(ContentFormat::SENML_CBOR), &path, &test_model())
            .unwrap();
        assert_eq!(decoded, instance);
    }
}
