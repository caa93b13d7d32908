use std::collections::BTreeMap;

use tracing::{trace, warn};

use super::{Tlv, TlvType};
use crate::codec::NodeDecoder;
use crate::error::{CodecError, Result};
use crate::model::{LwM2mModel, ResourceType};
use crate::node::{
    InstanceId, LwM2mNode, LwM2mObject, LwM2mObjectInstance, LwM2mResource, LwM2mResourceInstance,
    MultipleResource, Value,
};
use crate::path::LwM2mPath;

/// Decoder for `application/vnd.oma.lwm2m+tlv`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TlvNodeDecoder;

impl NodeDecoder for TlvNodeDecoder {
    fn decode(&self, content: &[u8], path: &LwM2mPath, model: &dyn LwM2mModel) -> Result<LwM2mNode> {
        let tlvs = super::decode(content).map_err(|e| CodecError::tlv(e, *path))?;
        trace!(%path, entries = tlvs.len(), "parsing TLV content");

        match *path {
            LwM2mPath::Root => Err(CodecError::invalid_at(*path, "TLV cannot be decoded at the root path")),
            LwM2mPath::Object(object_id) => parse_object(&tlvs, object_id, model).map(Into::into),
            LwM2mPath::ObjectInstance(object_id, instance_id) => {
                parse_object_instance(&tlvs, object_id, instance_id, path, model).map(Into::into)
            }
            LwM2mPath::Resource(object_id, instance_id, resource_id) => {
                parse_resource_at(&tlvs, object_id, instance_id, resource_id, path, model).map(Into::into)
            }
            LwM2mPath::ResourceInstance(..) => parse_resource_instance_at(&tlvs, path, model).map(Into::into),
        }
    }
}

fn parse_object(tlvs: &[Tlv], object_id: u16, model: &dyn LwM2mModel) -> Result<LwM2mObject> {
    let first_is_resource = tlvs
        .first()
        .is_some_and(|tlv| matches!(tlv.kind, TlvType::MultipleResource | TlvType::ResourceValue));

    // Resources without the object instance wrapper
    if first_is_resource {
        let instance_id = match model.is_multiple_object(object_id) {
            None => {
                warn!(
                    object_id,
                    "no model for object, decoding TLV resources as instance 0 of a single instance object"
                );
                InstanceId::Id(0)
            }
            Some(false) => InstanceId::Id(0),
            Some(true) => InstanceId::Undefined,
        };
        let instance = parse_instance_resources(tlvs, object_id, instance_id, model)?;
        return Ok(LwM2mObject::new(object_id, [instance]));
    }

    let mut instances = BTreeMap::new();
    for tlv in tlvs {
        if tlv.kind != TlvType::ObjectInstance {
            return Err(CodecError::invalid_at(
                LwM2mPath::Object(object_id),
                format!("expected TLV of type ObjectInstance but was {:?}", tlv.kind),
            ));
        }
        let instance = parse_instance_resources(tlv.children(), object_id, InstanceId::Id(tlv.id), model)?;
        if instances.insert(tlv.id, instance).is_some() {
            return Err(CodecError::duplicate(
                "object instance",
                tlv.id,
                LwM2mPath::Object(object_id),
            ));
        }
    }
    Ok(LwM2mObject::new(object_id, instances.into_values()))
}

fn parse_object_instance(
    tlvs: &[Tlv],
    object_id: u16,
    instance_id: u16,
    path: &LwM2mPath,
    model: &dyn LwM2mModel,
) -> Result<LwM2mObjectInstance> {
    match tlvs {
        [wrapper] if wrapper.kind == TlvType::ObjectInstance => {
            if wrapper.id != instance_id {
                return Err(CodecError::invalid_at(
                    *path,
                    format!("id conflict between path and instance TLV (object instance id={})", wrapper.id),
                ));
            }
            parse_instance_resources(wrapper.children(), object_id, InstanceId::Id(instance_id), model)
        }
        _ => parse_instance_resources(tlvs, object_id, InstanceId::Id(instance_id), model),
    }
}

fn parse_instance_resources(
    tlvs: &[Tlv],
    object_id: u16,
    instance_id: InstanceId,
    model: &dyn LwM2mModel,
) -> Result<LwM2mObjectInstance> {
    let mut resources = BTreeMap::new();
    for tlv in tlvs {
        let path = resource_path(object_id, instance_id, tlv.id);
        let resource = parse_resource(tlv, object_id, &path, model)?;
        if resources.insert(tlv.id, resource).is_some() {
            return Err(CodecError::duplicate("resource", tlv.id, path));
        }
    }
    Ok(LwM2mObjectInstance::with_instance_id(instance_id, resources.into_values()))
}

/// Path used for lookups and errors; an undefined instance reports its object.
fn resource_path(object_id: u16, instance_id: InstanceId, resource_id: u16) -> LwM2mPath {
    match instance_id {
        InstanceId::Id(id) => LwM2mPath::Resource(object_id, id, resource_id),
        InstanceId::Undefined => LwM2mPath::Object(object_id),
    }
}

fn parse_resource(tlv: &Tlv, object_id: u16, path: &LwM2mPath, model: &dyn LwM2mModel) -> Result<LwM2mResource> {
    let kind = resource_type(model, object_id, tlv.id, path);
    match tlv.kind {
        TlvType::MultipleResource => parse_resource_instances(tlv.children(), tlv.id, kind, path),
        TlvType::ResourceValue => Ok(LwM2mResource::single(tlv.id, parse_value(tlv, kind, path)?)),
        other => Err(CodecError::invalid_at(
            *path,
            format!("invalid TLV type {:?} for resource {}", other, tlv.id),
        )),
    }
}

fn parse_resource_instances(
    tlvs: &[Tlv],
    resource_id: u16,
    kind: ResourceType,
    path: &LwM2mPath,
) -> Result<LwM2mResource> {
    let mut instances = BTreeMap::new();
    for tlv in tlvs {
        if tlv.kind != TlvType::ResourceInstance {
            return Err(CodecError::invalid_at(
                *path,
                format!("expected TLV of type ResourceInstance but was {:?}", tlv.kind),
            ));
        }
        let value = parse_value(tlv, kind, path)?;
        if instances.insert(tlv.id, value).is_some() {
            return Err(CodecError::duplicate("resource instance", tlv.id, *path));
        }
    }
    Ok(LwM2mResource::Multiple(MultipleResource::new(resource_id, kind, instances)?))
}

fn parse_resource_at(
    tlvs: &[Tlv],
    object_id: u16,
    instance_id: u16,
    resource_id: u16,
    path: &LwM2mPath,
    model: &dyn LwM2mModel,
) -> Result<LwM2mResource> {
    // A consistent object instance wrapper is tolerated
    let tlvs = match tlvs {
        [wrapper] if wrapper.kind == TlvType::ObjectInstance => {
            if wrapper.id != instance_id {
                return Err(CodecError::invalid_at(
                    *path,
                    format!("id conflict between path and instance TLV (object instance id={})", wrapper.id),
                ));
            }
            wrapper.children()
        }
        _ => tlvs,
    };

    match tlvs {
        [] if model.is_multiple_resource(path) == Some(false) => Err(CodecError::missing_value(
            *path,
            "TLV payload is mandatory for a single resource",
        )),
        [tlv] if tlv.kind != TlvType::ResourceInstance => {
            if tlv.id != resource_id {
                return Err(CodecError::invalid_at(
                    *path,
                    format!("id conflict between path and resource TLV (resource id={})", tlv.id),
                ));
            }
            parse_resource(tlv, object_id, path, model)
        }
        _ => {
            let kind = resource_type(model, object_id, resource_id, path);
            parse_resource_instances(tlvs, resource_id, kind, path)
        }
    }
}

fn parse_resource_instance_at(
    tlvs: &[Tlv],
    path: &LwM2mPath,
    model: &dyn LwM2mModel,
) -> Result<LwM2mResourceInstance> {
    let tlv = match tlvs {
        [] => {
            return Err(CodecError::missing_value(
                *path,
                "TLV payload is mandatory for a resource instance",
            ));
        }
        [tlv] => tlv,
        _ => {
            return Err(CodecError::invalid_at(
                *path,
                "TLV payload must contain exactly one resource instance",
            ));
        }
    };

    if tlv.kind != TlvType::ResourceInstance {
        return Err(CodecError::invalid_at(
            *path,
            format!("expected TLV of type ResourceInstance but was {:?}", tlv.kind),
        ));
    }
    if path.resource_instance_id() != Some(tlv.id) {
        return Err(CodecError::invalid_at(
            *path,
            format!("id conflict between path and resource instance TLV (id={})", tlv.id),
        ));
    }

    let kind = model.resource_type(path).unwrap_or_else(|| {
        trace!(%path, "unknown resource type, decoding as opaque");
        ResourceType::Opaque
    });
    Ok(LwM2mResourceInstance::new(tlv.id, parse_value(tlv, kind, path)?))
}

/// Declared type, opaque when the model does not know the resource.
fn resource_type(model: &dyn LwM2mModel, object_id: u16, resource_id: u16, path: &LwM2mPath) -> ResourceType {
    model
        .resource_model(object_id, resource_id)
        .and_then(|r| r.kind)
        .unwrap_or_else(|| {
            trace!(%path, resource_id, "unknown resource type, decoding as opaque");
            ResourceType::Opaque
        })
}

fn parse_value(tlv: &Tlv, kind: ResourceType, path: &LwM2mPath) -> Result<Value> {
    let bytes = tlv.value().unwrap_or_default();
    trace!(%path, %kind, len = bytes.len(), "parsing TLV value");
    let value = match kind {
        ResourceType::String => super::decode_string(bytes).map(Value::String),
        ResourceType::Integer => super::decode_integer(bytes).map(Value::Integer),
        ResourceType::UnsignedInteger => super::decode_unsigned(bytes).map(Value::UnsignedInteger),
        ResourceType::Float => super::decode_float(bytes).map(Value::Float),
        ResourceType::Boolean => super::decode_boolean(bytes).map(Value::Boolean),
        ResourceType::Time => super::decode_time(bytes).map(Value::Time),
        ResourceType::ObjectLink => super::decode_object_link(bytes).map(Value::ObjectLink),
        ResourceType::Opaque => Ok(Value::Opaque(bytes.to_vec())),
    };
    value.map_err(|e| CodecError::tlv(e, *path))
}
