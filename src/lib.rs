//! LwM2M node codecs.
//!
//! A device is modeled as a tree of objects, object instances, resources and
//! resource instances ([`node`]), each addressed by an [`LwM2mPath`]. The
//! [`codec`] module converts those trees to and from every LwM2M content
//! format: TLV, legacy JSON, SenML JSON / CBOR, plain text, CBOR and opaque
//! bytes. [`LwM2mDecoder`] and [`LwM2mEncoder`] pick the codec from a
//! [`ContentFormat`].
//!
//! ```
//! use lwm2m_codec::model::{ObjectModel, ResourceModel, ResourceType, StaticModel};
//! use lwm2m_codec::{ContentFormat, LwM2mDecoder, LwM2mPath};
//!
//! let model = StaticModel::new([ObjectModel::new(3, "Device", false)
//!     .with_resource(ResourceModel::single(9, "Battery Level", ResourceType::Integer))]);
//!
//! let node = LwM2mDecoder::default()
//!     .decode(&[0xC1, 0x09, 0x64], Some(ContentFormat::TLV), &LwM2mPath::Resource(3, 0, 9), &model)
//!     .unwrap();
//! assert_eq!(node.as_resource().unwrap().value().unwrap().as_i64(), Some(100));
//! ```

pub mod codec;
pub mod config;
pub mod content_format;
pub mod converter;
pub mod dispatcher;
pub mod error;
pub mod helper;
pub mod model;
pub mod node;
pub mod path;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::Config;
pub use content_format::ContentFormat;
pub use dispatcher::{LwM2mDecoder, LwM2mEncoder, node_kind_for_path};
pub use error::{CodecError, Result};
pub use node::{
    InstanceId, LwM2mNode, LwM2mObject, LwM2mObjectInstance, LwM2mResource, LwM2mResourceInstance, NodeKind,
    ObjectLink, TimestampedNode, TimestampedNodes, Value,
};
pub use path::LwM2mPath;
