//! Legacy LwM2M 1.0 JSON (`application/vnd.oma.lwm2m+json`).
//!
//! ```json
//! {"bn":"/3/0/","e":[{"n":"0","sv":"Open Mobile Alliance"},{"n":"9","v":100}],"bt":1367491215}
//! ```
//!
//! `bn` prefixes every entry name by plain string concatenation; entry times
//! `t` are relative to `bt` when present.

mod decoder;
mod encoder;

pub use decoder::JsonNodeDecoder;
pub use encoder::JsonNodeEncoder;

use lwm2m_senml::{SenMLNumber, SenMLValue};
use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result};
use crate::path::LwM2mPath;

/// Root object of a JSON payload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JsonRoot {
    #[serde(rename = "bn", default, skip_serializing_if = "Option::is_none")]
    pub base_name: Option<String>,

    #[serde(rename = "e")]
    pub entries: Vec<JsonEntry>,

    #[serde(rename = "bt", default, skip_serializing_if = "Option::is_none")]
    pub base_time: Option<SenMLNumber>,
}

/// One element of the `e` array.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JsonEntry {
    #[serde(rename = "n", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "v", default, skip_serializing_if = "Option::is_none")]
    pub float_value: Option<SenMLNumber>,

    #[serde(rename = "sv", default, skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,

    #[serde(rename = "bv", default, skip_serializing_if = "Option::is_none")]
    pub boolean_value: Option<bool>,

    #[serde(rename = "ov", default, skip_serializing_if = "Option::is_none")]
    pub object_link_value: Option<String>,

    #[serde(rename = "t", default, skip_serializing_if = "Option::is_none")]
    pub time: Option<SenMLNumber>,
}

impl JsonEntry {
    /// The single value carried by this entry.
    pub fn value(&self, path: &LwM2mPath) -> Result<SenMLValue> {
        let values = [
            self.float_value.map(SenMLValue::Number),
            self.string_value.clone().map(SenMLValue::String),
            self.boolean_value.map(SenMLValue::Boolean),
            self.object_link_value.clone().map(SenMLValue::ObjectLink),
        ];
        let mut present = values.into_iter().flatten();
        match (present.next(), present.next()) {
            (Some(value), None) => Ok(value),
            (None, _) => Err(CodecError::missing_value(*path, "JSON entry carries no value")),
            (Some(_), Some(_)) => Err(CodecError::invalid_at(*path, "JSON entry carries several values")),
        }
    }
}
