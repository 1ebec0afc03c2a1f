//! Variant tags and routing families for `Value`.
//!
//! `ValueKind` is the exact per-variant tag; `ValueFamily` is the coarse
//! routing category used by primitive inference. Families MUST NOT be used
//! to infer range or losslessness — those are checked per conversion.

use derive_more::Display;

///
/// ValueKind
///
/// Stable per-variant tag. Declaration-order retries in the coercion
/// engine iterate over these.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum ValueKind {
    Bytes,
    Date,
    DateTime,
    Decimal,
    Duration,
    Float,
    Int,
    IntBig,
    Null,
    Text,
    Time,
    Uint,
}

impl ValueKind {
    /// Coarse routing family for this kind.
    #[must_use]
    pub const fn family(self) -> ValueFamily {
        match self {
            Self::Int | Self::IntBig | Self::Uint => ValueFamily::Integer,
            Self::Float => ValueFamily::Float,
            Self::Decimal => ValueFamily::Decimal,
            Self::Text => ValueFamily::Text,
            Self::Bytes => ValueFamily::Bytes,
            Self::Date => ValueFamily::Date,
            Self::DateTime => ValueFamily::DateTime,
            Self::Time => ValueFamily::Time,
            Self::Duration => ValueFamily::Duration,
            Self::Null => ValueFamily::Null,
        }
    }

    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self.family(), ValueFamily::Integer)
    }
}

///
/// ValueFamily
///
/// Coarse value classification used for primitive inference routing.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ValueFamily {
    Bytes,
    Date,
    DateTime,
    Decimal,
    Duration,
    Float,
    Integer,
    Null,
    Text,
    Time,
}
