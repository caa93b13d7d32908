use crate::codec::tlv::InstanceMode;
use crate::converter::ConverterPolicy;

/// Settings used to build [`LwM2mDecoder`](crate::LwM2mDecoder) and
/// [`LwM2mEncoder`](crate::LwM2mEncoder) registries.
///
/// Read once at construction; later changes do not affect built registries.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Also accept the pre-standard TLV (1542) and JSON (1543) codes
    pub support_deprecated_content_format: bool,

    /// Value converter applied by encoders
    pub converter: ConverterPolicy,

    /// Object instance wrapping for TLV object encodes
    pub tlv_instance_mode: InstanceMode,
}

impl Config {
    pub fn with_deprecated_content_format(mut self, enabled: bool) -> Self {
        self.support_deprecated_content_format = enabled;
        self
    }

    pub fn with_converter(mut self, converter: ConverterPolicy) -> Self {
        self.converter = converter;
        self
    }

    pub fn with_tlv_instance_mode(mut self, mode: InstanceMode) -> Self {
        self.tlv_instance_mode = mode;
        self
    }
}
