//! Test utilities shared by unit tests, integration tests and benchmarks.
//!
//! [`test_model`] describes the standard objects used by the test vectors
//! (Security, Server, ACL, Device) plus a few custom objects with every
//! resource type.

use time::{Duration, OffsetDateTime};

use crate::model::{ObjectModel, ResourceModel, ResourceType, StaticModel};
use crate::node::{LwM2mResource, MultipleResource, Value};

/// Object id of the custom object holding one resource per value type.
pub const TYPES_OBJECT_ID: u16 = 3441;

/// Model of the objects used across the test suites.
pub fn test_model() -> StaticModel {
    use ResourceType::*;

    StaticModel::new([
        ObjectModel::new(0, "LWM2M Security", true)
            .with_resource(ResourceModel::single(0, "LWM2M Server URI", String))
            .with_resource(ResourceModel::single(1, "Bootstrap-Server", Boolean))
            .with_resource(ResourceModel::single(2, "Security Mode", Integer))
            .with_resource(ResourceModel::single(3, "Public Key or Identity", Opaque))
            .with_resource(ResourceModel::single(4, "Server Public Key", Opaque))
            .with_resource(ResourceModel::single(5, "Secret Key", Opaque))
            .with_resource(ResourceModel::single(10, "Short Server ID", Integer))
            .with_resource(ResourceModel::single(16, "SNI", UnsignedInteger)),
        ObjectModel::new(1, "LwM2M Server", true)
            .with_resource(ResourceModel::single(0, "Short Server ID", Integer))
            .with_resource(ResourceModel::single(1, "Lifetime", Integer))
            .with_resource(ResourceModel::single(2, "Default Minimum Period", Integer))
            .with_resource(ResourceModel::single(3, "Default Maximum Period", Integer))
            .with_resource(ResourceModel::executable(4, "Disable"))
            .with_resource(ResourceModel::single(5, "Disable Timeout", Integer))
            .with_resource(ResourceModel::single(6, "Notification Storing", Boolean))
            .with_resource(ResourceModel::single(7, "Binding", String))
            .with_resource(ResourceModel::executable(8, "Registration Update Trigger")),
        ObjectModel::new(2, "LwM2M Access Control", true)
            .with_resource(ResourceModel::single(0, "Object ID", Integer))
            .with_resource(ResourceModel::single(1, "Object Instance ID", Integer))
            .with_resource(ResourceModel::multiple(2, "ACL", Integer))
            .with_resource(ResourceModel::single(3, "Access Control Owner", Integer)),
        ObjectModel::new(3, "Device", false)
            .with_resource(ResourceModel::single(0, "Manufacturer", String))
            .with_resource(ResourceModel::single(1, "Model Number", String))
            .with_resource(ResourceModel::single(2, "Serial Number", String))
            .with_resource(ResourceModel::single(3, "Firmware Version", String))
            .with_resource(ResourceModel::executable(4, "Reboot"))
            .with_resource(ResourceModel::executable(5, "Factory Reset"))
            .with_resource(ResourceModel::multiple(6, "Available Power Sources", Integer))
            .with_resource(ResourceModel::multiple(7, "Power Source Voltage", Integer))
            .with_resource(ResourceModel::multiple(8, "Power Source Current", Integer))
            .with_resource(ResourceModel::single(9, "Battery Level", Integer))
            .with_resource(ResourceModel::single(10, "Memory Free", Integer))
            .with_resource(ResourceModel::multiple(11, "Error Code", Integer))
            .with_resource(ResourceModel::executable(12, "Reset Error Code"))
            .with_resource(ResourceModel::single(13, "Current Time", Time))
            .with_resource(ResourceModel::single(14, "UTC Offset", String))
            .with_resource(ResourceModel::single(15, "Timezone", String))
            .with_resource(ResourceModel::single(16, "Supported Binding and Modes", String))
            .with_resource(ResourceModel::single(17, "Device Type", String))
            .with_resource(ResourceModel::single(18, "Hardware Version", String))
            .with_resource(ResourceModel::single(19, "Software Version", String))
            .with_resource(ResourceModel::single(20, "Battery Status", Integer))
            .with_resource(ResourceModel::single(21, "Memory Total", Integer))
            .with_resource(ResourceModel::multiple(22, "ExtDevInfo", ObjectLink)),
        ObjectModel::new(65, "Service Bundle", true)
            .with_resource(ResourceModel::multiple(0, "Services", ObjectLink))
            .with_resource(ResourceModel::single(1, "Subscriber Number", String))
            .with_resource(ResourceModel::single(2, "Bundle Code", Integer)),
        ObjectModel::new(66, "Service", true)
            .with_resource(ResourceModel::single(0, "Name", String))
            .with_resource(ResourceModel::single(1, "Access Point", String))
            .with_resource(ResourceModel::single(2, "Next Service", ObjectLink)),
        ObjectModel::new(1024, "Sensor", true)
            .with_resource(ResourceModel::single(0, "Label", String))
            .with_resource(ResourceModel::single(1, "Sensor Value", Float))
            .with_resource(ResourceModel::single(2, "Enabled", Boolean)),
        ObjectModel::new(TYPES_OBJECT_ID, "Value Types", true)
            .with_resource(ResourceModel::single(110, "String Value", String))
            .with_resource(ResourceModel::single(120, "Integer Value", Integer))
            .with_resource(ResourceModel::single(125, "Unsigned Integer Value", UnsignedInteger))
            .with_resource(ResourceModel::single(130, "Float Value", Float))
            .with_resource(ResourceModel::single(140, "Boolean Value", Boolean))
            .with_resource(ResourceModel::single(150, "Opaque Value", Opaque))
            .with_resource(ResourceModel::single(160, "Time Value", Time))
            .with_resource(ResourceModel::single(170, "Objlnk Value", ObjectLink))
            .with_resource(ResourceModel::multiple(1110, "Multiple String Value", String))
            .with_resource(ResourceModel::multiple(1120, "Multiple Integer Value", Integer))
            .with_resource(ResourceModel::multiple(1125, "Multiple Unsigned Integer Value", UnsignedInteger)),
    ])
}

/// Resources of the reference Device instance used by the TLV, JSON and
/// SenML vectors.
pub fn device_resources() -> Vec<LwM2mResource> {
    let integers = |id: u16, values: &[(u16, i64)]| {
        LwM2mResource::Multiple(
            MultipleResource::new(
                id,
                ResourceType::Integer,
                values.iter().map(|&(i, v)| (i, Value::Integer(v))),
            )
            .expect("integer instances"),
        )
    };

    vec![
        LwM2mResource::single(0, "Open Mobile Alliance"),
        LwM2mResource::single(1, "Lightweight M2M Client"),
        LwM2mResource::single(2, "345000123"),
        LwM2mResource::single(3, "1.0"),
        integers(6, &[(0, 1), (1, 5)]),
        integers(7, &[(0, 3800), (1, 5000)]),
        integers(8, &[(0, 125), (1, 900)]),
        LwM2mResource::single(9, 100i64),
        LwM2mResource::single(10, 15i64),
        integers(11, &[(0, 0)]),
        LwM2mResource::single(13, OffsetDateTime::UNIX_EPOCH + Duration::seconds(1367491215)),
        LwM2mResource::single(14, "+02:00"),
        LwM2mResource::single(16, "U"),
    ]
}

/// Route `tracing` output to the test harness, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
