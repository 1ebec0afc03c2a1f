use crate::value::Value;
use thiserror::Error as ThisError;

///
/// ConfigError
///
/// Fatal, raised at field-construction time. Never recoverable at runtime;
/// surfaces as a startup failure.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[remain::sorted]
pub enum ConfigError {
    #[error("bit_length too small: '{enum_path}' needs {required} bits, declared {declared}")]
    BitLengthTooSmall {
        enum_path: String,
        required: u16,
        declared: u16,
    },

    #[error("duplicate member in '{enum_path}': {detail}")]
    DuplicateMember { enum_path: String, detail: String },

    #[error("enumeration '{enum_path}' has no members")]
    EmptyEnum { enum_path: String },

    #[error(
        "member '{member}' of '{enum_path}' does not round-trip through primitive {primitive}"
    )]
    NotSymmetric {
        enum_path: String,
        member: String,
        primitive: String,
    },

    #[error("no common storage primitive for '{enum_path}': {detail}")]
    UnresolvablePrimitive { enum_path: String, detail: String },

    #[error("primitive {primitive} cannot store enumeration '{enum_path}'")]
    UnsupportedPrimitive {
        enum_path: String,
        primitive: String,
    },
}

///
/// CoercionError
///
/// Coercion failure on a read/write/validate path. Propagated to the
/// caller, never retried.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[remain::sorted]
pub enum CoercionError {
    #[error("field '{field}' cannot coerce {value:?} into '{enum_path}'")]
    FailedToCoerce {
        field: String,
        enum_path: String,
        value: Value,
    },

    #[error("field '{field}' is not nullable")]
    NotNullable { field: String },

    #[error("field '{field}' rejects {value:?}: bits outside '{enum_path}'")]
    OutOfRange {
        field: String,
        enum_path: String,
        value: Value,
    },
}

///
/// ValidationError
///
/// Structured form/clean-path wrapper: the same coercion failure with
/// field name and attempted value for user-facing reporting.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("validation failed for field '{field}' with value {value:?}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub value: Value,
    pub message: String,
}

impl ValidationError {
    pub(crate) fn from_coercion(field: &str, value: &Value, err: &CoercionError) -> Self {
        Self {
            field: field.to_string(),
            value: value.clone(),
            message: err.to_string(),
        }
    }
}

///
/// UnsupportedOperationError
///
/// Query lookups that cannot be expressed for a given storage tier.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[remain::sorted]
pub enum UnsupportedOperationError {
    #[error("bitwise lookup '{lookup}' is unsupported on byte-encoded flag columns ('{field}')")]
    WideFlagLookup { field: String, lookup: String },
}

///
/// Error
///
/// Top-level wrapper for callers that funnel every failure into one type.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[remain::sorted]
pub enum Error {
    #[error(transparent)]
    Coercion(#[from] CoercionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Unsupported(#[from] UnsupportedOperationError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
