//! # lwm2m-senml - Sensor Measurement Lists for LwM2M
//!
//! A Rust implementation of [RFC 8428](https://tools.ietf.org/html/rfc8428) - Sensor Measurement Lists (SenML),
//! restricted to the fields LwM2M uses and extended with the LwM2M object link value (`vlo`).
//!
//! ## Features
//!
//! - **JSON** (`json` feature): serde model with the RFC field names, `vd` as base64url
//! - **CBOR** (`cbor` feature): integer labels per RFC 8428 section 6
//! - **Exact numbers**: integers, unsigned integers and floats are kept apart
//! - **Normalization**: resolve sticky base name / base time into every record
//!
//! ## Quick Start
//!
//! ```rust
//! use lwm2m_senml::{Result, SenMLPack, SenMLRecord, SenMLValue};
//!
//! fn example() -> Result<()> {
//!     let mut pack = SenMLPack::new();
//!     pack.add_record(
//!         SenMLRecord::new()
//!             .with_base_name("/3/0/")
//!             .with_name("0")
//!             .with_value(SenMLValue::String("Open Mobile Alliance".into())),
//!     );
//!
//!     let json = pack.to_json()?;
//!     assert_eq!(json, r#"[{"bn":"/3/0/","n":"0","vs":"Open Mobile Alliance"}]"#);
//!
//!     let normalized = SenMLPack::from_json(&json)?.normalize();
//!     assert_eq!(normalized.records[0].name, "/3/0/0");
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

pub mod error;
pub mod normalize;
pub mod pack;
pub mod record;

#[cfg(feature = "json")]
pub mod json;

#[cfg(feature = "cbor")]
pub mod cbor;

// Re-export main types
pub use error::{Result, SenMLError};
pub use normalize::{NormalizedPack, NormalizedRecord};
pub use pack::SenMLPack;
pub use record::{SenMLNumber, SenMLRecord, SenMLValue, decode_data, encode_data};

/// SenML Content-Format identifiers for CoAP
pub mod content_format {
    /// application/senml+json
    pub const SENML_JSON: u16 = 110;
    /// application/senml+cbor
    pub const SENML_CBOR: u16 = 112;
}
