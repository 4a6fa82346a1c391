//! Error types for registration and conversion.

use thiserror::Error;

use crate::class::ClassId;
use crate::converter::ConverterError;

/// The failure categories a conversion can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MissingProperty,
    NullViolation,
    TypeMismatch,
    NotAnObject,
    Parse,
    Conversion,
    Registry,
}

/// Errors raised by [`ObjectMapper`](crate::ObjectMapper) while converting.
///
/// Conversion is fail-fast: the first violation aborts the whole call.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("property {key} is not defined in the source object")]
    MissingProperty { key: String },

    #[error("property {key} is not a {expected}, it is null")]
    NullViolation { key: String, expected: String },

    #[error("property {key} is not {expected}, it is {found}")]
    TypeMismatch {
        key: String,
        expected: String,
        found: String,
    },

    #[error("property {key} is an array of multiple types, which is not supported")]
    MultiKindArray { key: String },

    #[error("property {property} uses converter {converter} without a {missing} operation")]
    IncompleteConverter {
        property: String,
        converter: String,
        missing: &'static str,
    },

    #[error("property {property} does not have a type and cannot be inferred from the default value")]
    UninferableType { property: String },

    #[error("source is not an object or string, it is {found}")]
    NotAnObject { found: &'static str },

    #[error("invalid JSON source: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("converter failed for property {key}: {source}")]
    Conversion {
        key: String,
        #[source]
        source: ConverterError,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl MapError {
    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingProperty { .. } => ErrorKind::MissingProperty,
            Self::NullViolation { .. } => ErrorKind::NullViolation,
            Self::TypeMismatch { .. }
            | Self::MultiKindArray { .. }
            | Self::IncompleteConverter { .. }
            | Self::UninferableType { .. } => ErrorKind::TypeMismatch,
            Self::NotAnObject { .. } => ErrorKind::NotAnObject,
            Self::Parse(_) => ErrorKind::Parse,
            Self::Conversion { .. } => ErrorKind::Conversion,
            Self::Registry(_) => ErrorKind::Registry,
        }
    }
}

/// Errors raised while defining classes or attaching metadata.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown class handle {0}")]
    UnknownClass(ClassId),

    #[error("external key {key} is already mapped to property {existing} on class {class}")]
    DuplicateExternalKey {
        class: String,
        key: String,
        existing: String,
    },

    #[error("mixing {donor} into {class} would create a cycle")]
    MixinCycle { class: String, donor: String },
}
