//! Content-Format identifiers from the CoAP registry.

use std::fmt;

/// A CoAP Content-Format code selecting the payload codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentFormat(u16);

impl ContentFormat {
    /// text/plain;charset=utf-8
    pub const TEXT: ContentFormat = ContentFormat(0);
    /// application/octet-stream
    pub const OPAQUE: ContentFormat = ContentFormat(42);
    /// application/cbor
    pub const CBOR: ContentFormat = ContentFormat(60);
    /// application/senml+json
    pub const SENML_JSON: ContentFormat = ContentFormat(lwm2m_senml::content_format::SENML_JSON);
    /// application/senml+cbor
    pub const SENML_CBOR: ContentFormat = ContentFormat(lwm2m_senml::content_format::SENML_CBOR);
    /// application/vnd.oma.lwm2m+tlv
    pub const TLV: ContentFormat = ContentFormat(11542);
    /// application/vnd.oma.lwm2m+json
    pub const JSON: ContentFormat = ContentFormat(11543);
    /// Pre-standard TLV code, only accepted when enabled in the configuration
    pub const OLD_TLV: ContentFormat = ContentFormat(1542);
    /// Pre-standard JSON code, only accepted when enabled in the configuration
    pub const OLD_JSON: ContentFormat = ContentFormat(1543);

    pub const fn new(code: u16) -> Self {
        ContentFormat(code)
    }

    pub const fn code(&self) -> u16 {
        self.0
    }

    pub fn name(&self) -> &'static str {
        match *self {
            Self::TEXT => "TEXT",
            Self::OPAQUE => "OPAQUE",
            Self::CBOR => "CBOR",
            Self::SENML_JSON => "SENML_JSON",
            Self::SENML_CBOR => "SENML_CBOR",
            Self::TLV => "TLV",
            Self::JSON => "JSON",
            Self::OLD_TLV => "OLD_TLV",
            Self::OLD_JSON => "OLD_JSON",
            _ => "UNKNOWN",
        }
    }

    pub fn is_deprecated(&self) -> bool {
        matches!(*self, Self::OLD_TLV | Self::OLD_JSON)
    }

    /// Media type registered for this code.
    pub fn media_type(&self) -> Option<&'static str> {
        let media_type = match *self {
            Self::TEXT => "text/plain",
            Self::OPAQUE => "application/octet-stream",
            Self::CBOR => "application/cbor",
            Self::SENML_JSON => "application/senml+json",
            Self::SENML_CBOR => "application/senml+cbor",
            Self::TLV | Self::OLD_TLV => "application/vnd.oma.lwm2m+tlv",
            Self::JSON | Self::OLD_JSON => "application/vnd.oma.lwm2m+json",
            _ => return None,
        };
        Some(media_type)
    }
}

impl fmt::Display for ContentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.0)
    }
}

impl From<u16> for ContentFormat {
    fn from(code: u16) -> Self {
        ContentFormat(code)
    }
}

impl From<ContentFormat> for u16 {
    fn from(format: ContentFormat) -> Self {
        format.0
    }
}
