//! Error type shared by every codec.

use thiserror::Error;

use crate::codec::tlv::TlvError;
use crate::content_format::ContentFormat;
use crate::model::ResourceType;
use crate::node::Value;
use crate::path::LwM2mPath;

/// Result type alias for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn at(path: &Option<LwM2mPath>) -> String {
    path.map(|p| format!(" [{}]", p)).unwrap_or_default()
}

/// Errors raised while decoding or encoding LwM2M payloads.
///
/// Malformed input is always terminal for the call that met it; nothing is
/// retried or partially returned.
#[derive(Error, Debug)]
pub enum CodecError {
    /// No content format was supplied
    #[error("Content format is mandatory")]
    MissingContentFormat,

    /// No codec is registered for the content format
    #[error("Content format {format} is not supported{}", at(.path))]
    UnsupportedContentFormat {
        format: ContentFormat,
        path: Option<LwM2mPath>,
    },

    /// The codec exists but cannot perform this operation
    #[error("{operation} is not supported by content format {format}")]
    UnsupportedOperation {
        operation: &'static str,
        format: ContentFormat,
    },

    /// Two siblings share an id, or two entries share a path and timestamp
    #[error("Duplicate {kind} id {id} [{path}]")]
    DuplicateId {
        kind: &'static str,
        id: String,
        path: LwM2mPath,
    },

    /// A value is mandatory but the payload carries none
    #[error("Missing value [{path}]: {message}")]
    MissingValue { path: LwM2mPath, message: String },

    /// A value cannot be converted to the expected type
    #[error("Unable to convert value '{value}' from {from} to {to} [{path}]")]
    Conversion {
        value: String,
        from: ResourceType,
        to: ResourceType,
        path: LwM2mPath,
    },

    /// Malformed base64, hex, ISO-8601, object link or number literal
    #[error("Invalid {kind} literal '{literal}'")]
    InvalidLiteral {
        kind: &'static str,
        literal: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Path text that does not denote a valid LwM2M path
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Structurally invalid TLV bytes
    #[error("Invalid TLV payload{}: {source}", at(.path))]
    Tlv {
        #[source]
        source: TlvError,
        path: Option<LwM2mPath>,
    },

    /// Payload content that does not fit the requested path or model
    #[error("{message}{}", at(.path))]
    Invalid {
        message: String,
        path: Option<LwM2mPath>,
    },

    /// Underlying format library rejected the payload
    #[error("{message}{}: {source}", at(.path))]
    Format {
        message: String,
        path: Option<LwM2mPath>,
        #[source]
        source: BoxError,
    },
}

impl CodecError {
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid {
            message: message.into(),
            path: None,
        }
    }

    pub fn invalid_at<S: Into<String>>(path: LwM2mPath, message: S) -> Self {
        Self::Invalid {
            message: message.into(),
            path: Some(path),
        }
    }

    pub fn invalid_path<P: Into<String>, S: Into<String>>(path: P, reason: S) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_literal<S: Into<String>>(kind: &'static str, literal: S) -> Self {
        Self::InvalidLiteral {
            kind,
            literal: literal.into(),
            source: None,
        }
    }

    pub fn invalid_literal_with<S, E>(kind: &'static str, literal: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::InvalidLiteral {
            kind,
            literal: literal.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn format<S, E>(message: S, path: Option<LwM2mPath>, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Format {
            message: message.into(),
            path,
            source: Box::new(source),
        }
    }

    pub fn duplicate<I: ToString>(kind: &'static str, id: I, path: LwM2mPath) -> Self {
        Self::DuplicateId {
            kind,
            id: id.to_string(),
            path,
        }
    }

    pub fn missing_value<S: Into<String>>(path: LwM2mPath, message: S) -> Self {
        Self::MissingValue {
            path,
            message: message.into(),
        }
    }

    pub fn conversion(value: &Value, to: ResourceType, path: LwM2mPath) -> Self {
        Self::Conversion {
            value: value.to_string(),
            from: value.kind(),
            to,
            path,
        }
    }

    pub fn tlv(source: TlvError, path: LwM2mPath) -> Self {
        Self::Tlv {
            source,
            path: Some(path),
        }
    }

    /// The path the failure refers to, when known.
    pub fn path(&self) -> Option<&LwM2mPath> {
        match self {
            Self::UnsupportedContentFormat { path, .. }
            | Self::Tlv { path, .. }
            | Self::Invalid { path, .. }
            | Self::Format { path, .. } => path.as_ref(),
            Self::DuplicateId { path, .. }
            | Self::MissingValue { path, .. }
            | Self::Conversion { path, .. } => Some(path),
            Self::MissingContentFormat
            | Self::UnsupportedOperation { .. }
            | Self::InvalidLiteral { .. }
            | Self::InvalidPath { .. } => None,
        }
    }
}

impl From<TlvError> for CodecError {
    fn from(source: TlvError) -> Self {
        Self::Tlv { source, path: None }
    }
}
