//! The LwM2M data tree.
//!
//! Nodes are plain values: a parent owns its children and nothing points back
//! up. Which node kind a codec produces is decided by the level of the target
//! [`LwM2mPath`](crate::path::LwM2mPath).

mod timestamped;
mod value;

use std::collections::BTreeMap;
use std::fmt;

pub use timestamped::{TimestampedNode, TimestampedNodes, TimestampedNodesBuilder};
pub(crate) use timestamped::{TimestampKey, key as timestamp_key, sort_series};
pub use value::{ObjectLink, Value};

use crate::error::{CodecError, Result};
use crate::model::ResourceType;
use crate::path::{Level, LwM2mPath};

/// Id of an object instance.
///
/// `Undefined` is produced when a TLV object payload omits the instance
/// wrapper and the model does not pin the object to a single instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InstanceId {
    Id(u16),
    Undefined,
}

impl InstanceId {
    pub fn id(&self) -> Option<u16> {
        match self {
            InstanceId::Id(id) => Some(*id),
            InstanceId::Undefined => None,
        }
    }
}

impl From<u16> for InstanceId {
    fn from(id: u16) -> Self {
        InstanceId::Id(id)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceId::Id(id) => write!(f, "{}", id),
            InstanceId::Undefined => f.write_str("UNDEFINED"),
        }
    }
}

/// Which variant of [`LwM2mNode`] a decode must produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Object,
    ObjectInstance,
    Resource,
    ResourceInstance,
}

impl NodeKind {
    /// Node kind addressed by a path; the root addresses no single node.
    pub fn for_path(path: &LwM2mPath) -> Option<Self> {
        match path.level() {
            Level::Root => None,
            Level::Object => Some(NodeKind::Object),
            Level::ObjectInstance => Some(NodeKind::ObjectInstance),
            Level::Resource => Some(NodeKind::Resource),
            Level::ResourceInstance => Some(NodeKind::ResourceInstance),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Object => "object",
            NodeKind::ObjectInstance => "object instance",
            NodeKind::Resource => "resource",
            NodeKind::ResourceInstance => "resource instance",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LwM2mObject {
    id: u16,
    instances: BTreeMap<InstanceId, LwM2mObjectInstance>,
}

impl LwM2mObject {
    pub fn new<I>(id: u16, instances: I) -> Self
    where
        I: IntoIterator<Item = LwM2mObjectInstance>,
    {
        Self {
            id,
            instances: instances.into_iter().map(|i| (i.id(), i)).collect(),
        }
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn instances(&self) -> &BTreeMap<InstanceId, LwM2mObjectInstance> {
        &self.instances
    }

    pub fn instance(&self, id: u16) -> Option<&LwM2mObjectInstance> {
        self.instances.get(&InstanceId::Id(id))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LwM2mObjectInstance {
    id: InstanceId,
    resources: BTreeMap<u16, LwM2mResource>,
}

impl LwM2mObjectInstance {
    pub fn new<I>(id: u16, resources: I) -> Self
    where
        I: IntoIterator<Item = LwM2mResource>,
    {
        Self::with_instance_id(InstanceId::Id(id), resources)
    }

    /// Instance whose id the payload did not carry.
    pub fn undefined<I>(resources: I) -> Self
    where
        I: IntoIterator<Item = LwM2mResource>,
    {
        Self::with_instance_id(InstanceId::Undefined, resources)
    }

    pub fn with_instance_id<I>(id: InstanceId, resources: I) -> Self
    where
        I: IntoIterator<Item = LwM2mResource>,
    {
        Self {
            id,
            resources: resources.into_iter().map(|r| (r.id(), r)).collect(),
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn resources(&self) -> &BTreeMap<u16, LwM2mResource> {
        &self.resources
    }

    pub fn resource(&self, id: u16) -> Option<&LwM2mResource> {
        self.resources.get(&id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SingleResource {
    id: u16,
    value: Value,
}

impl SingleResource {
    pub fn new<V: Into<Value>>(id: u16, value: V) -> Self {
        Self {
            id,
            value: value.into(),
        }
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn kind(&self) -> ResourceType {
        self.value.kind()
    }
}

/// A multi-instance resource. Zero instances is a valid, present resource.
#[derive(Debug, Clone, PartialEq)]
pub struct MultipleResource {
    id: u16,
    kind: ResourceType,
    instances: BTreeMap<u16, Value>,
}

impl MultipleResource {
    /// Build a multiple resource; every value must be of type `kind`.
    pub fn new<I>(id: u16, kind: ResourceType, instances: I) -> Result<Self>
    where
        I: IntoIterator<Item = (u16, Value)>,
    {
        let instances: BTreeMap<u16, Value> = instances.into_iter().collect();
        if let Some((instance_id, value)) = instances.iter().find(|(_, v)| v.kind() != kind) {
            return Err(CodecError::invalid(format!(
                "resource instance {} of resource {} is {} but the resource is {}",
                instance_id,
                id,
                value.kind(),
                kind
            )));
        }
        Ok(Self {
            id,
            kind,
            instances,
        })
    }

    pub fn empty(id: u16, kind: ResourceType) -> Self {
        Self {
            id,
            kind,
            instances: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn kind(&self) -> ResourceType {
        self.kind
    }

    pub fn instances(&self) -> &BTreeMap<u16, Value> {
        &self.instances
    }

    pub fn instance(&self, id: u16) -> Option<&Value> {
        self.instances.get(&id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LwM2mResource {
    Single(SingleResource),
    Multiple(MultipleResource),
}

impl LwM2mResource {
    pub fn single<V: Into<Value>>(id: u16, value: V) -> Self {
        LwM2mResource::Single(SingleResource::new(id, value))
    }

    pub fn multiple<I>(id: u16, kind: ResourceType, instances: I) -> Result<Self>
    where
        I: IntoIterator<Item = (u16, Value)>,
    {
        MultipleResource::new(id, kind, instances).map(LwM2mResource::Multiple)
    }

    pub fn id(&self) -> u16 {
        match self {
            LwM2mResource::Single(r) => r.id(),
            LwM2mResource::Multiple(r) => r.id(),
        }
    }

    pub fn kind(&self) -> ResourceType {
        match self {
            LwM2mResource::Single(r) => r.kind(),
            LwM2mResource::Multiple(r) => r.kind(),
        }
    }

    pub fn is_multiple(&self) -> bool {
        matches!(self, LwM2mResource::Multiple(_))
    }

    /// Value of a single resource.
    pub fn value(&self) -> Option<&Value> {
        match self {
            LwM2mResource::Single(r) => Some(r.value()),
            LwM2mResource::Multiple(_) => None,
        }
    }

    /// Value of one instance of a multiple resource.
    pub fn instance(&self, id: u16) -> Option<&Value> {
        match self {
            LwM2mResource::Single(_) => None,
            LwM2mResource::Multiple(r) => r.instance(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LwM2mResourceInstance {
    id: u16,
    value: Value,
}

impl LwM2mResourceInstance {
    pub fn new<V: Into<Value>>(id: u16, value: V) -> Self {
        Self {
            id,
            value: value.into(),
        }
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn kind(&self) -> ResourceType {
        self.value.kind()
    }
}

/// Any addressable node of the data tree.
#[derive(Debug, Clone, PartialEq)]
pub enum LwM2mNode {
    Object(LwM2mObject),
    ObjectInstance(LwM2mObjectInstance),
    Resource(LwM2mResource),
    ResourceInstance(LwM2mResourceInstance),
}

impl LwM2mNode {
    pub fn kind(&self) -> NodeKind {
        match self {
            LwM2mNode::Object(_) => NodeKind::Object,
            LwM2mNode::ObjectInstance(_) => NodeKind::ObjectInstance,
            LwM2mNode::Resource(_) => NodeKind::Resource,
            LwM2mNode::ResourceInstance(_) => NodeKind::ResourceInstance,
        }
    }

    /// Own id of the node; `None` for an object instance with an undefined id.
    pub fn id(&self) -> Option<u16> {
        match self {
            LwM2mNode::Object(o) => Some(o.id()),
            LwM2mNode::ObjectInstance(i) => i.id().id(),
            LwM2mNode::Resource(r) => Some(r.id()),
            LwM2mNode::ResourceInstance(ri) => Some(ri.id()),
        }
    }

    /// Whether this node can live at `path`: same level and same id.
    pub fn is_consistent_with(&self, path: &LwM2mPath) -> bool {
        match (self, path) {
            (LwM2mNode::Object(o), LwM2mPath::Object(id)) => o.id() == *id,
            (LwM2mNode::ObjectInstance(i), LwM2mPath::ObjectInstance(_, id)) => {
                i.id() == InstanceId::Id(*id)
            }
            (LwM2mNode::Resource(r), LwM2mPath::Resource(_, _, id)) => r.id() == *id,
            (LwM2mNode::ResourceInstance(ri), LwM2mPath::ResourceInstance(_, _, _, id)) => {
                ri.id() == *id
            }
            _ => false,
        }
    }

    pub fn as_object(&self) -> Option<&LwM2mObject> {
        match self {
            LwM2mNode::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_object_instance(&self) -> Option<&LwM2mObjectInstance> {
        match self {
            LwM2mNode::ObjectInstance(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_resource(&self) -> Option<&LwM2mResource> {
        match self {
            LwM2mNode::Resource(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_resource_instance(&self) -> Option<&LwM2mResourceInstance> {
        match self {
            LwM2mNode::ResourceInstance(ri) => Some(ri),
            _ => None,
        }
    }
}

impl From<LwM2mObject> for LwM2mNode {
    fn from(node: LwM2mObject) -> Self {
        LwM2mNode::Object(node)
    }
}

impl From<LwM2mObjectInstance> for LwM2mNode {
    fn from(node: LwM2mObjectInstance) -> Self {
        LwM2mNode::ObjectInstance(node)
    }
}

impl From<LwM2mResource> for LwM2mNode {
    fn from(node: LwM2mResource) -> Self {
        LwM2mNode::Resource(node)
    }
}

impl From<LwM2mResourceInstance> for LwM2mNode {
    fn from(node: LwM2mResourceInstance) -> Self {
        LwM2mNode::ResourceInstance(node)
    }
}
