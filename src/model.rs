//! Object model lookup.
//!
//! The codecs never load object descriptions themselves; they query an
//! [`LwM2mModel`] for the declared type and multiplicity of what they decode or
//! encode. [`StaticModel`] is a simple in-memory implementation.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::path::LwM2mPath;

/// Declared data type of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    String,
    Integer,
    UnsignedInteger,
    Float,
    Boolean,
    Opaque,
    Time,
    ObjectLink,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceType::String => "STRING",
            ResourceType::Integer => "INTEGER",
            ResourceType::UnsignedInteger => "UNSIGNED_INTEGER",
            ResourceType::Float => "FLOAT",
            ResourceType::Boolean => "BOOLEAN",
            ResourceType::Opaque => "OPAQUE",
            ResourceType::Time => "TIME",
            ResourceType::ObjectLink => "OBJLNK",
        };
        f.write_str(name)
    }
}

/// Description of one resource of an object.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceModel {
    pub id: u16,
    pub name: String,
    pub multiple: bool,
    /// `None` for resources without a value (executable ones).
    pub kind: Option<ResourceType>,
}

impl ResourceModel {
    pub fn single<S: Into<String>>(id: u16, name: S, kind: ResourceType) -> Self {
        Self {
            id,
            name: name.into(),
            multiple: false,
            kind: Some(kind),
        }
    }

    pub fn multiple<S: Into<String>>(id: u16, name: S, kind: ResourceType) -> Self {
        Self {
            id,
            name: name.into(),
            multiple: true,
            kind: Some(kind),
        }
    }

    pub fn executable<S: Into<String>>(id: u16, name: S) -> Self {
        Self {
            id,
            name: name.into(),
            multiple: false,
            kind: None,
        }
    }
}

/// Description of an object and its resources.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectModel {
    pub id: u16,
    pub name: String,
    pub multiple: bool,
    pub resources: BTreeMap<u16, ResourceModel>,
}

impl ObjectModel {
    pub fn new<S: Into<String>>(id: u16, name: S, multiple: bool) -> Self {
        Self {
            id,
            name: name.into(),
            multiple,
            resources: BTreeMap::new(),
        }
    }

    /// Add a resource description, replacing one with the same id.
    pub fn with_resource(mut self, resource: ResourceModel) -> Self {
        self.resources.insert(resource.id, resource);
        self
    }
}

/// Schema lookup consumed by the codecs.
///
/// Implementations must be safe for concurrent reads; codecs only borrow them
/// for the duration of one call.
pub trait LwM2mModel: Send + Sync {
    fn object_model(&self, object_id: u16) -> Option<&ObjectModel>;

    fn resource_model(&self, object_id: u16, resource_id: u16) -> Option<&ResourceModel> {
        self.object_model(object_id)?.resources.get(&resource_id)
    }

    /// Declared type of the resource addressed by `path`, if known.
    fn resource_type(&self, path: &LwM2mPath) -> Option<ResourceType> {
        self.resource_model(path.object_id()?, path.resource_id()?)?
            .kind
    }

    /// Whether the resource addressed by `path` is multi-instance, if known.
    fn is_multiple_resource(&self, path: &LwM2mPath) -> Option<bool> {
        self.resource_model(path.object_id()?, path.resource_id()?)
            .map(|r| r.multiple)
    }

    /// Whether the object may have several instances, if known.
    fn is_multiple_object(&self, object_id: u16) -> Option<bool> {
        self.object_model(object_id).map(|o| o.multiple)
    }
}

/// In-memory model built from object descriptions.
#[derive(Debug, Clone, Default)]
pub struct StaticModel {
    objects: HashMap<u16, ObjectModel>,
}

impl StaticModel {
    pub fn new<I: IntoIterator<Item = ObjectModel>>(objects: I) -> Self {
        Self {
            objects: objects.into_iter().map(|o| (o.id, o)).collect(),
        }
    }

    pub fn add_object(&mut self, object: ObjectModel) {
        self.objects.insert(object.id, object);
    }
}

impl LwM2mModel for StaticModel {
    fn object_model(&self, object_id: u16) -> Option<&ObjectModel> {
        self.objects.get(&object_id)
    }
}
