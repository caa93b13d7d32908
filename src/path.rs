//! LwM2M path: `/objectId/instanceId/resourceId/resourceInstanceId`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{CodecError, Result};

/// Addressing level of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Level {
    Root,
    Object,
    ObjectInstance,
    Resource,
    ResourceInstance,
}

/// A path into the LwM2M data tree.
///
/// The variant encodes which levels are present, so a resource id can never
/// exist without its object and instance ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LwM2mPath {
    Root,
    Object(u16),
    ObjectInstance(u16, u16),
    Resource(u16, u16, u16),
    ResourceInstance(u16, u16, u16, u16),
}

impl LwM2mPath {
    /// Build a path from up to four ids, outermost first.
    pub fn from_ids(ids: &[u16]) -> Result<Self> {
        match *ids {
            [] => Ok(LwM2mPath::Root),
            [o] => Ok(LwM2mPath::Object(o)),
            [o, i] => Ok(LwM2mPath::ObjectInstance(o, i)),
            [o, i, r] => Ok(LwM2mPath::Resource(o, i, r)),
            [o, i, r, ri] => Ok(LwM2mPath::ResourceInstance(o, i, r, ri)),
            _ => Err(CodecError::invalid_path(
                format!("{:?}", ids),
                "a path has at most 4 components",
            )),
        }
    }

    pub fn level(&self) -> Level {
        match self {
            LwM2mPath::Root => Level::Root,
            LwM2mPath::Object(..) => Level::Object,
            LwM2mPath::ObjectInstance(..) => Level::ObjectInstance,
            LwM2mPath::Resource(..) => Level::Resource,
            LwM2mPath::ResourceInstance(..) => Level::ResourceInstance,
        }
    }

    pub fn is_root(&self) -> bool {
        self.level() == Level::Root
    }

    pub fn is_object(&self) -> bool {
        self.level() == Level::Object
    }

    pub fn is_object_instance(&self) -> bool {
        self.level() == Level::ObjectInstance
    }

    pub fn is_resource(&self) -> bool {
        self.level() == Level::Resource
    }

    pub fn is_resource_instance(&self) -> bool {
        self.level() == Level::ResourceInstance
    }

    pub fn object_id(&self) -> Option<u16> {
        self.ids().first().copied()
    }

    pub fn instance_id(&self) -> Option<u16> {
        self.ids().get(1).copied()
    }

    pub fn resource_id(&self) -> Option<u16> {
        self.ids().get(2).copied()
    }

    pub fn resource_instance_id(&self) -> Option<u16> {
        self.ids().get(3).copied()
    }

    /// Ids present in this path, outermost first.
    pub fn ids(&self) -> Vec<u16> {
        match *self {
            LwM2mPath::Root => vec![],
            LwM2mPath::Object(o) => vec![o],
            LwM2mPath::ObjectInstance(o, i) => vec![o, i],
            LwM2mPath::Resource(o, i, r) => vec![o, i, r],
            LwM2mPath::ResourceInstance(o, i, r, ri) => vec![o, i, r, ri],
        }
    }

    /// Path one level deeper.
    pub fn append(&self, id: u16) -> Result<Self> {
        let mut ids = self.ids();
        ids.push(id);
        Self::from_ids(&ids)
    }

    /// Path one level up; the root has no parent.
    pub fn parent(&self) -> Option<Self> {
        let ids = self.ids();
        let (_, parent) = ids.split_last()?;
        Self::from_ids(parent).ok()
    }

    /// Whether `self` equals `prefix` or lies below it.
    pub fn starts_with(&self, prefix: &LwM2mPath) -> bool {
        self.ids().starts_with(&prefix.ids())
    }

    /// The resource path for a resource or resource instance path.
    pub fn to_resource_path(&self) -> Option<Self> {
        match *self {
            LwM2mPath::Resource(..) => Some(*self),
            LwM2mPath::ResourceInstance(o, i, r, _) => Some(LwM2mPath::Resource(o, i, r)),
            _ => None,
        }
    }
}

impl Ord for LwM2mPath {
    /// Component-wise, a parent before its children.
    fn cmp(&self, other: &Self) -> Ordering {
        self.ids().cmp(&other.ids())
    }
}

impl PartialOrd for LwM2mPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for LwM2mPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str("/");
        }
        for id in self.ids() {
            write!(f, "/{}", id)?;
        }
        Ok(())
    }
}

impl FromStr for LwM2mPath {
    type Err = CodecError;

    /// Parse `"/3/0/1"`; leading and trailing slashes are optional, `"/"` and
    /// `""` are the root.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.strip_prefix('/').unwrap_or(s);
        let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Ok(LwM2mPath::Root);
        }

        let ids = trimmed
            .split('/')
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(CodecError::invalid_path(
                        s,
                        format!("'{}' is not a valid id", part),
                    ));
                }
                part.parse::<u16>().map_err(|_| {
                    CodecError::invalid_path(s, format!("id {} is out of range", part))
                })
            })
            .collect::<Result<Vec<u16>>>()?;

        Self::from_ids(&ids).map_err(|_| CodecError::invalid_path(s, "too many components"))
    }
}

impl TryFrom<&str> for LwM2mPath {
    type Error = CodecError;

    fn try_from(value: &str) -> Result<Self> {
        value.parse()
    }
}
