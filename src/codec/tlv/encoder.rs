use tracing::trace;

use super::Tlv;
use crate::codec::{NodeEncoder, check_node_path};
use crate::converter::ValueConverter;
use crate::error::{CodecError, Result};
use crate::model::LwM2mModel;
use crate::node::{
    InstanceId, LwM2mNode, LwM2mObject, LwM2mObjectInstance, LwM2mResource, LwM2mResourceInstance, Value,
};
use crate::path::LwM2mPath;

/// How object instances are framed when an object or an instance is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstanceMode {
    /// Wrap when the instance id is known, not implied by the path and the
    /// object may hold several instances
    #[default]
    Auto,
    /// Write resources directly, never an instance entry
    Omit,
    /// Always write the instance entry
    Wrap,
}

/// Encoder for `application/vnd.oma.lwm2m+tlv`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TlvNodeEncoder {
    instance_mode: InstanceMode,
}

impl TlvNodeEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_instance_mode(mut self, mode: InstanceMode) -> Self {
        self.instance_mode = mode;
        self
    }

    pub fn instance_mode(&self) -> InstanceMode {
        self.instance_mode
    }

    /// Encode with an instance mode chosen for this call only.
    pub fn encode_with_mode(
        &self,
        node: &LwM2mNode,
        path: &LwM2mPath,
        model: &dyn LwM2mModel,
        converter: &dyn ValueConverter,
        mode: InstanceMode,
    ) -> Result<Vec<u8>> {
        check_node_path(node, path)?;
        trace!(%path, kind = %node.kind(), ?mode, "encoding node into TLV");

        let encoder = Encoder { model, converter, mode };
        let tlvs = match node {
            LwM2mNode::Object(object) => encoder.object(object, path)?,
            LwM2mNode::ObjectInstance(instance) => encoder.object_instance(instance, path)?,
            LwM2mNode::Resource(resource) => {
                let object_id = object_id(path)?;
                vec![encoder.resource(resource, object_id, path)?]
            }
            LwM2mNode::ResourceInstance(instance) => vec![encoder.resource_instance(instance, path)?],
        };
        super::encode(&tlvs).map_err(|e| CodecError::tlv(e, *path))
    }
}

impl NodeEncoder for TlvNodeEncoder {
    fn encode(
        &self,
        node: &LwM2mNode,
        path: &LwM2mPath,
        model: &dyn LwM2mModel,
        converter: &dyn ValueConverter,
    ) -> Result<Vec<u8>> {
        self.encode_with_mode(node, path, model, converter, self.instance_mode)
    }
}

fn object_id(path: &LwM2mPath) -> Result<u16> {
    path.object_id()
        .ok_or_else(|| CodecError::invalid_at(*path, "TLV cannot be encoded at the root path"))
}

struct Encoder<'a> {
    model: &'a dyn LwM2mModel,
    converter: &'a dyn ValueConverter,
    mode: InstanceMode,
}

impl Encoder<'_> {
    fn object(&self, object: &LwM2mObject, path: &LwM2mPath) -> Result<Vec<Tlv>> {
        let instances = object.instances();
        let bare = match self.mode {
            InstanceMode::Omit => true,
            InstanceMode::Auto => {
                self.single_instance_object(object.id())
                    || (instances.len() == 1 && matches!(instances.keys().next(), Some(InstanceId::Undefined)))
            }
            InstanceMode::Wrap => false,
        };

        if bare {
            if instances.len() > 1 {
                return Err(CodecError::invalid_at(
                    *path,
                    format!(
                        "{} object instances cannot be encoded without instance entries",
                        instances.len()
                    ),
                ));
            }
            return match instances.values().next() {
                Some(instance) => self.resources(instance, object.id(), path),
                None => Ok(Vec::new()),
            };
        }

        instances
            .values()
            .map(|instance| {
                let id = instance.id().id().ok_or_else(|| {
                    CodecError::invalid_at(*path, "object instance id is mandatory to wrap an instance")
                })?;
                let instance_path = LwM2mPath::ObjectInstance(object.id(), id);
                Ok(Tlv::object_instance(
                    id,
                    self.resources(instance, object.id(), &instance_path)?,
                ))
            })
            .collect()
    }

    fn object_instance(&self, instance: &LwM2mObjectInstance, path: &LwM2mPath) -> Result<Vec<Tlv>> {
        let object_id = object_id(path)?;
        let id = instance.id().id().or_else(|| path.instance_id());
        let wrapped_id = match (self.mode, path) {
            (InstanceMode::Omit, _) => None,
            (InstanceMode::Auto, LwM2mPath::Object(_)) if !self.single_instance_object(object_id) => id,
            (InstanceMode::Auto, _) => None,
            (InstanceMode::Wrap, _) => Some(id.ok_or_else(|| {
                CodecError::invalid_at(*path, "object instance id is mandatory to wrap an instance")
            })?),
        };

        match wrapped_id {
            Some(id) => {
                let instance_path = LwM2mPath::ObjectInstance(object_id, id);
                Ok(vec![Tlv::object_instance(
                    id,
                    self.resources(instance, object_id, &instance_path)?,
                )])
            }
            None => self.resources(instance, object_id, path),
        }
    }

    fn single_instance_object(&self, object_id: u16) -> bool {
        self.model.is_multiple_object(object_id) == Some(false)
    }

    fn resources(&self, instance: &LwM2mObjectInstance, object_id: u16, path: &LwM2mPath) -> Result<Vec<Tlv>> {
        instance
            .resources()
            .values()
            .map(|resource| {
                let resource_path = match *path {
                    LwM2mPath::ObjectInstance(o, i) => LwM2mPath::Resource(o, i, resource.id()),
                    other => other,
                };
                self.resource(resource, object_id, &resource_path)
            })
            .collect()
    }

    fn resource(&self, resource: &LwM2mResource, object_id: u16, path: &LwM2mPath) -> Result<Tlv> {
        match resource {
            LwM2mResource::Single(single) => Ok(Tlv::resource_value(
                single.id(),
                self.value(single.value(), object_id, single.id(), path)?,
            )),
            LwM2mResource::Multiple(multiple) => {
                let instances = multiple
                    .instances()
                    .iter()
                    .map(|(id, value)| {
                        Ok(Tlv::resource_instance(
                            *id,
                            self.value(value, object_id, multiple.id(), path)?,
                        ))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Tlv::multiple_resource(multiple.id(), instances))
            }
        }
    }

    fn resource_instance(&self, instance: &LwM2mResourceInstance, path: &LwM2mPath) -> Result<Tlv> {
        let (object_id, resource_id) = match *path {
            LwM2mPath::ResourceInstance(o, _, r, _) => (o, r),
            _ => return Err(CodecError::invalid_at(*path, "resource instance needs a resource instance path")),
        };
        Ok(Tlv::resource_instance(
            instance.id(),
            self.value(instance.value(), object_id, resource_id, path)?,
        ))
    }

    fn value(&self, value: &Value, object_id: u16, resource_id: u16, path: &LwM2mPath) -> Result<Vec<u8>> {
        let expected = self
            .model
            .resource_model(object_id, resource_id)
            .and_then(|r| r.kind);
        let value = self.converter.convert(value.clone(), expected, path)?;
        trace!(%path, kind = %value.kind(), "encoding TLV value");

        Ok(match value {
            Value::String(s) => s.into_bytes(),
            Value::Integer(i) => super::encode_integer(i),
            Value::UnsignedInteger(u) => super::encode_unsigned(u),
            Value::Float(f) => super::encode_float(f),
            Value::Boolean(b) => super::encode_boolean(b),
            Value::Opaque(bytes) => bytes,
            Value::Time(t) => super::encode_time(t),
            Value::ObjectLink(link) => super::encode_object_link(link),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{LenientValueConverter, StrictValueConverter};
    use crate::model::{ObjectModel, ResourceModel, ResourceType, StaticModel};

    fn model() -> StaticModel {
        StaticModel::new([
            ObjectModel::new(3, "Device", false)
                .with_resource(ResourceModel::single(9, "Battery Level", ResourceType::Integer))
                .with_resource(ResourceModel::single(13, "Current Time", ResourceType::Time)),
            ObjectModel::new(4, "Connectivity", true)
                .with_resource(ResourceModel::single(0, "Network Bearer", ResourceType::Integer)),
        ])
    }

    fn encode(node: impl Into<LwM2mNode>, path: LwM2mPath, mode: InstanceMode) -> Result<String> {
        TlvNodeEncoder::new()
            .encode_with_mode(&node.into(), &path, &model(), &LenientValueConverter, mode)
            .map(hex::encode_upper)
    }

    fn battery(id: u16) -> LwM2mObjectInstance {
        LwM2mObjectInstance::new(id, [LwM2mResource::single(9, 100i64)])
    }

    #[test]
    fn test_single_resource() {
        let hex = encode(LwM2mResource::single(9, 100i64), LwM2mPath::Resource(3, 0, 9), InstanceMode::Auto);
        assert_eq!(hex.unwrap(), "C10964");
    }

    #[test]
    fn test_converter_applied() {
        let hex = encode(LwM2mResource::single(9, "100"), LwM2mPath::Resource(3, 0, 9), InstanceMode::Auto);
        assert!(hex.is_err());
        let hex = encode(LwM2mResource::single(9, 100.0), LwM2mPath::Resource(3, 0, 9), InstanceMode::Auto);
        assert_eq!(hex.unwrap(), "C10964");

        let strict = TlvNodeEncoder::new().encode(
            &LwM2mResource::single(9, 100.0).into(),
            &LwM2mPath::Resource(3, 0, 9),
            &model(),
            &StrictValueConverter,
        );
        assert!(matches!(strict, Err(CodecError::Conversion { .. })));
    }

    #[test]
    fn test_instance_modes_at_instance_path() {
        let path = LwM2mPath::ObjectInstance(3, 0);
        assert_eq!(encode(battery(0), path, InstanceMode::Auto).unwrap(), "C10964");
        assert_eq!(encode(battery(0), path, InstanceMode::Omit).unwrap(), "C10964");
        assert_eq!(encode(battery(0), path, InstanceMode::Wrap).unwrap(), "0300C10964");

        let undefined = LwM2mObjectInstance::undefined([LwM2mResource::single(9, 100i64)]);
        assert_eq!(encode(undefined, path, InstanceMode::Wrap).unwrap(), "0300C10964");
    }

    #[test]
    fn test_instance_at_object_path() {
        let path = LwM2mPath::Object(4);
        assert_eq!(encode(battery(0), path, InstanceMode::Auto).unwrap(), "0300C10964");
        let undefined = LwM2mObjectInstance::undefined([LwM2mResource::single(9, 100i64)]);
        assert_eq!(encode(undefined.clone(), path, InstanceMode::Auto).unwrap(), "C10964");
        assert!(encode(undefined, path, InstanceMode::Wrap).is_err());
    }

    #[test]
    fn test_single_instance_object_is_bare() {
        let path = LwM2mPath::Object(3);
        assert_eq!(encode(battery(0), path, InstanceMode::Auto).unwrap(), "C10964");
        assert_eq!(encode(battery(0), path, InstanceMode::Wrap).unwrap(), "0300C10964");

        let object = LwM2mObject::new(3, [battery(0)]);
        assert_eq!(encode(object.clone(), path, InstanceMode::Auto).unwrap(), "C10964");
        assert_eq!(encode(object, path, InstanceMode::Wrap).unwrap(), "0300C10964");
    }

    #[test]
    fn test_object_modes() {
        let object = LwM2mObject::new(4, [battery(0), battery(1)]);
        let path = LwM2mPath::Object(4);
        assert_eq!(
            encode(object.clone(), path, InstanceMode::Auto).unwrap(),
            "0300C109640301C10964"
        );
        assert!(encode(object, path, InstanceMode::Omit).is_err());

        let single = LwM2mObject::new(3, [battery(0)]);
        assert_eq!(encode(single, LwM2mPath::Object(3), InstanceMode::Omit).unwrap(), "C10964");
    }

    #[test]
    fn test_resource_instance() {
        let hex = encode(
            LwM2mResourceInstance::new(1, 5i64),
            LwM2mPath::ResourceInstance(3, 0, 6, 1),
            InstanceMode::Auto,
        );
        assert_eq!(hex.unwrap(), "410105");
    }

    #[test]
    fn test_inconsistent_path() {
        let err = encode(battery(1), LwM2mPath::ObjectInstance(3, 0), InstanceMode::Auto).unwrap_err();
        assert!(matches!(err, CodecError::Invalid { .. }));
    }
}
