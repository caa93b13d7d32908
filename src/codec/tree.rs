//! Conversion between node trees and flat lists of leaf values.
//!
//! The JSON and SenML codecs both carry one entry per single resource or
//! resource instance. Decoding resolves each entry to an absolute path and a
//! typed value, then rebuilds the node expected at the requested path.

use std::collections::BTreeMap;

use lwm2m_senml::SenMLValue;
use time::OffsetDateTime;
use tracing::trace;

use super::instance_path;
use crate::converter::ValueConverter;
use crate::error::{CodecError, Result};
use crate::helper::number_to_value;
use crate::model::{LwM2mModel, ResourceType};
use crate::node::{
    LwM2mNode, LwM2mObject, LwM2mObjectInstance, LwM2mResource, LwM2mResourceInstance,
    MultipleResource, ObjectLink, TimestampKey, TimestampedNode, Value, timestamp_key,
};
use crate::path::LwM2mPath;

/// A resolved payload entry.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Leaf {
    pub path: LwM2mPath,
    pub timestamp: Option<OffsetDateTime>,
    pub value: Value,
}

/// Typed value for a payload value, checked against the expected type.
pub(crate) fn decode_value(raw: SenMLValue, expected: Option<ResourceType>, path: &LwM2mPath) -> Result<Value> {
    let value = match raw {
        SenMLValue::Number(number) => return number_to_value(number, expected, path),
        SenMLValue::String(s) => Value::String(s),
        SenMLValue::Boolean(b) => Value::Boolean(b),
        SenMLValue::Data(data) => Value::Opaque(data),
        SenMLValue::ObjectLink(link) => Value::ObjectLink(link.parse::<ObjectLink>()?),
    };
    match expected {
        Some(expected) if expected != value.kind() => Err(CodecError::conversion(&value, expected, *path)),
        _ => Ok(value),
    }
}

/// Apply the converter to a value about to be written at `path`.
pub(crate) fn encode_value(
    value: &Value,
    path: &LwM2mPath,
    model: &dyn LwM2mModel,
    converter: &dyn ValueConverter,
) -> Result<Value> {
    converter.convert(value.clone(), model.resource_type(path), path)
}

/// Every value of `node`, written at `path`, in ascending path order.
pub(crate) fn flatten<'a>(node: &'a LwM2mNode, path: &LwM2mPath) -> Result<Vec<(LwM2mPath, &'a Value)>> {
    let mut leaves = Vec::new();
    match node {
        LwM2mNode::Object(object) => {
            for instance in object.instances().values() {
                let id = instance.id().id().ok_or_else(|| {
                    CodecError::invalid_at(*path, "object instance id is mandatory for this format")
                })?;
                flatten_instance(instance, &LwM2mPath::ObjectInstance(object.id(), id), &mut leaves);
            }
        }
        LwM2mNode::ObjectInstance(instance) => {
            flatten_instance(instance, &instance_path(instance, path)?, &mut leaves);
        }
        LwM2mNode::Resource(resource) => flatten_resource(resource, path, &mut leaves),
        LwM2mNode::ResourceInstance(instance) => leaves.push((*path, instance.value())),
    }
    Ok(leaves)
}

fn flatten_instance<'a>(
    instance: &'a LwM2mObjectInstance,
    path: &LwM2mPath,
    leaves: &mut Vec<(LwM2mPath, &'a Value)>,
) {
    if let LwM2mPath::ObjectInstance(o, i) = *path {
        for resource in instance.resources().values() {
            flatten_resource(resource, &LwM2mPath::Resource(o, i, resource.id()), leaves);
        }
    }
}

fn flatten_resource<'a>(resource: &'a LwM2mResource, path: &LwM2mPath, leaves: &mut Vec<(LwM2mPath, &'a Value)>) {
    match (resource, *path) {
        (LwM2mResource::Single(single), _) => leaves.push((*path, single.value())),
        (LwM2mResource::Multiple(multiple), LwM2mPath::Resource(o, i, r)) => {
            for (id, value) in multiple.instances() {
                leaves.push((LwM2mPath::ResourceInstance(o, i, r, *id), value));
            }
        }
        _ => {}
    }
}

enum Slot {
    Single(Value),
    Multiple(BTreeMap<u16, Value>),
}

/// Rebuild the node expected at `request` from its leaves.
///
/// Every leaf must lie at or below `request`; two leaves at the same path are
/// an error.
pub(crate) fn build_node<I>(request: &LwM2mPath, leaves: I, model: &dyn LwM2mModel) -> Result<LwM2mNode>
where
    I: IntoIterator<Item = (LwM2mPath, Value)>,
{
    if request.is_resource_instance() {
        return build_resource_instance(request, leaves).map(Into::into);
    }
    let object_id = request
        .object_id()
        .ok_or_else(|| CodecError::invalid_at(*request, "a node cannot be decoded at the root path"))?;

    let mut instances: BTreeMap<u16, BTreeMap<u16, Slot>> = BTreeMap::new();
    for (path, value) in leaves {
        check_below(&path, request)?;
        match path {
            LwM2mPath::Resource(_, i, r) => {
                if instances.entry(i).or_default().insert(r, Slot::Single(value)).is_some() {
                    return Err(CodecError::duplicate("resource", r, path));
                }
            }
            LwM2mPath::ResourceInstance(_, i, r, ri) => {
                let slot = instances
                    .entry(i)
                    .or_default()
                    .entry(r)
                    .or_insert_with(|| Slot::Multiple(BTreeMap::new()));
                match slot {
                    Slot::Multiple(values) => {
                        if values.insert(ri, value).is_some() {
                            return Err(CodecError::duplicate("resource instance", ri, path));
                        }
                    }
                    Slot::Single(_) => return Err(CodecError::duplicate("resource", r, path)),
                }
            }
            _ => {
                return Err(CodecError::invalid_at(
                    path,
                    "entry path must address a resource or a resource instance",
                ));
            }
        }
    }

    let mut built: BTreeMap<u16, Vec<LwM2mResource>> = BTreeMap::new();
    for (instance_id, slots) in instances {
        let resources = slots
            .into_iter()
            .map(|(resource_id, slot)| {
                to_resource(&LwM2mPath::Resource(object_id, instance_id, resource_id), slot, model)
            })
            .collect::<Result<Vec<_>>>()?;
        built.insert(instance_id, resources);
    }

    match *request {
        LwM2mPath::Object(_) => Ok(LwM2mObject::new(
            object_id,
            built
                .into_iter()
                .map(|(id, resources)| LwM2mObjectInstance::new(id, resources)),
        )
        .into()),
        LwM2mPath::ObjectInstance(_, instance_id) => {
            let resources = built.remove(&instance_id).unwrap_or_default();
            Ok(LwM2mObjectInstance::new(instance_id, resources).into())
        }
        LwM2mPath::Resource(_, instance_id, resource_id) => {
            let resource = built
                .remove(&instance_id)
                .and_then(|resources| resources.into_iter().find(|r| r.id() == resource_id));
            match resource {
                Some(resource) => Ok(resource.into()),
                None => empty_resource(request, model).map(Into::into),
            }
        }
        _ => Err(CodecError::invalid_at(*request, "a node cannot be decoded at this path")),
    }
}

fn build_resource_instance<I>(request: &LwM2mPath, leaves: I) -> Result<LwM2mResourceInstance>
where
    I: IntoIterator<Item = (LwM2mPath, Value)>,
{
    let mut found = None;
    for (path, value) in leaves {
        check_below(&path, request)?;
        if found.replace(value).is_some() {
            return Err(CodecError::duplicate(
                "resource instance",
                request.resource_instance_id().unwrap_or_default(),
                path,
            ));
        }
    }
    let value = found.ok_or_else(|| CodecError::missing_value(*request, "no value for the resource instance"))?;
    let id = request.resource_instance_id().unwrap_or_default();
    Ok(LwM2mResourceInstance::new(id, value))
}

fn check_below(path: &LwM2mPath, request: &LwM2mPath) -> Result<()> {
    if path.starts_with(request) {
        Ok(())
    } else {
        Err(CodecError::invalid_at(
            *path,
            format!("entry path is not below the requested path {}", request),
        ))
    }
}

fn to_resource(path: &LwM2mPath, slot: Slot, model: &dyn LwM2mModel) -> Result<LwM2mResource> {
    let resource_id = path.resource_id().unwrap_or_default();
    match slot {
        Slot::Single(value) => Ok(LwM2mResource::single(resource_id, value)),
        Slot::Multiple(values) => {
            let kind = model
                .resource_type(path)
                .or_else(|| values.values().next().map(Value::kind))
                .unwrap_or(ResourceType::String);
            MultipleResource::new(resource_id, kind, values)
                .map(LwM2mResource::Multiple)
                .map_err(|e| CodecError::invalid_at(*path, e.to_string()))
        }
    }
}

/// A resource requested but absent from the payload.
///
/// Only a multi-instance resource may be empty; without a model the resource
/// is assumed to be one.
fn empty_resource(path: &LwM2mPath, model: &dyn LwM2mModel) -> Result<LwM2mResource> {
    if model.is_multiple_resource(path) == Some(false) {
        return Err(CodecError::missing_value(*path, "no value for the single resource"));
    }
    let kind = model.resource_type(path).unwrap_or(ResourceType::String);
    trace!(%path, %kind, "no entry for the resource, decoding an empty multiple resource");
    Ok(LwM2mResource::Multiple(MultipleResource::empty(
        path.resource_id().unwrap_or_default(),
        kind,
    )))
}

/// One node per timestamp, current value first, then most recent first.
///
/// An empty payload still yields one current node built from no leaves.
pub(crate) fn build_series(
    request: &LwM2mPath,
    leaves: Vec<Leaf>,
    model: &dyn LwM2mModel,
) -> Result<Vec<TimestampedNode>> {
    let mut by_timestamp: BTreeMap<TimestampKey, Vec<(LwM2mPath, Value)>> = BTreeMap::new();
    for leaf in leaves {
        by_timestamp
            .entry(timestamp_key(leaf.timestamp))
            .or_default()
            .push((leaf.path, leaf.value));
    }
    if by_timestamp.is_empty() {
        by_timestamp.insert(None, Vec::new());
    }

    by_timestamp
        .into_iter()
        .map(|(key, leaves)| {
            let timestamp = key.map(|std::cmp::Reverse(t)| t);
            Ok(TimestampedNode::new(timestamp, build_node(request, leaves, model)?))
        })
        .collect()
}
