mod kind;


use crate::types::{Duration, Float64};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use num_bigint::BigInt;
use num_traits::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// re-exports
pub use kind::{ValueFamily, ValueKind};

///
/// CONSTANTS
///

const F64_SAFE_I64: i64 = 1i64 << 53;
const F64_SAFE_U64: u64 = 1u64 << 53;

///
/// TextMode
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TextMode {
    Cs, // case-sensitive
    Ci, // case-insensitive
}

///
/// Value
///
/// The raw scalar that crosses the storage boundary.
///
/// Null   → the column's value is SQL NULL.
/// IntBig → arbitrary-width integer tier (beyond native 64-bit).
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Value {
    Bytes(Vec<u8>),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Decimal(Decimal),
    Duration(Duration),
    Float(Float64),
    Int(i64),
    IntBig(BigInt),
    Null,
    Text(String),
    Time(NaiveTime),
    Uint(u64),
}

impl Value {
    ///
    /// TYPES
    ///

    /// Stable variant tag.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Bytes(_) => ValueKind::Bytes,
            Self::Date(_) => ValueKind::Date,
            Self::DateTime(_) => ValueKind::DateTime,
            Self::Decimal(_) => ValueKind::Decimal,
            Self::Duration(_) => ValueKind::Duration,
            Self::Float(_) => ValueKind::Float,
            Self::Int(_) => ValueKind::Int,
            Self::IntBig(_) => ValueKind::IntBig,
            Self::Null => ValueKind::Null,
            Self::Text(_) => ValueKind::Text,
            Self::Time(_) => ValueKind::Time,
            Self::Uint(_) => ValueKind::Uint,
        }
    }

    /// Coarse routing family.
    #[must_use]
    pub const fn family(&self) -> ValueFamily {
        self.kind().family()
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    ///
    /// CONVERSION
    ///

    #[must_use]
    pub const fn as_text(&self) -> Option<&str> {
        if let Self::Text(s) = self {
            Some(s.as_str())
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        if let Self::Bytes(b) = self {
            Some(b.as_slice())
        } else {
            None
        }
    }

    /// Exact integer view of the value.
    ///
    /// Integral floats and decimals convert exactly; text never parses here
    /// (parsing belongs to the widening path, not exact matching).
    #[must_use]
    pub fn to_big_int(&self) -> Option<BigInt> {
        match self {
            Self::Int(i) => Some(BigInt::from(*i)),
            Self::Uint(u) => Some(BigInt::from(*u)),
            Self::IntBig(b) => Some(b.clone()),
            Self::Float(f) if f.is_integral() => BigInt::from_f64(f.get()),
            Self::Decimal(d) if d.is_integer() => Some(BigInt::from(d.normalize().mantissa())),
            _ => None,
        }
    }

    // it's lossless, trust me bro
    #[expect(clippy::cast_precision_loss)]
    fn to_f64_lossless(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(f.get()),
            Self::Int(i) if (-F64_SAFE_I64..=F64_SAFE_I64).contains(i) => Some(*i as f64),
            Self::Uint(u) if *u <= F64_SAFE_U64 => Some(*u as f64),
            Self::IntBig(b) => b.to_i64().and_then(|v| {
                (-F64_SAFE_I64..=F64_SAFE_I64)
                    .contains(&v)
                    .then_some(v as f64)
            }),
            Self::Decimal(d) => d.to_f64().filter(|f| f.is_finite()),

            _ => None,
        }
    }

    fn to_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Decimal(d) => Some(*d),
            Self::Int(i) => Decimal::from_i64(*i),
            Self::Uint(u) => Decimal::from_u64(*u),
            Self::IntBig(b) => b
                .to_i128()
                .and_then(|m| Decimal::try_from_i128_with_scale(m, 0).ok()),
            Self::Float(f) => Decimal::from_f64(f.get()),

            _ => None,
        }
    }

    /// Widening/narrowing conversion into a target variant kind.
    ///
    /// This is the conversion matrix behind primitive coercion: numeric
    /// widening, integral narrowing, and text parsing for numeric and
    /// temporal kinds. Exact-match stages never call this.
    #[must_use]
    pub fn convert_to_kind(&self, target: ValueKind) -> Option<Self> {
        if self.kind() == target {
            return Some(self.clone());
        }

        match target {
            ValueKind::Int => self
                .integer_or_parsed()
                .as_ref()
                .and_then(BigInt::to_i64)
                .map(Self::Int),
            ValueKind::Uint => self
                .integer_or_parsed()
                .as_ref()
                .and_then(BigInt::to_u64)
                .map(Self::Uint),
            ValueKind::IntBig => self.integer_or_parsed().map(Self::IntBig),
            ValueKind::Float => match self {
                Self::Text(s) => f64::from_str(s).ok().and_then(Float64::try_new),
                v => v.to_f64_lossless().and_then(Float64::try_new),
            }
            .map(Self::Float),
            ValueKind::Decimal => match self {
                Self::Text(s) => Decimal::from_str(s).ok(),
                v => v.to_decimal(),
            }
            .map(Self::Decimal),
            ValueKind::Duration => match self {
                Self::Text(s) => i64::from_str(s).ok().map(Duration::from_micros),
                v => v.to_big_int().as_ref().and_then(BigInt::to_i64).map(Duration::from_micros),
            }
            .map(Self::Duration),
            ValueKind::Date => self
                .as_text()
                .and_then(|s| NaiveDate::from_str(s).ok())
                .map(Self::Date),
            ValueKind::DateTime => self
                .as_text()
                .and_then(|s| NaiveDateTime::from_str(s).ok())
                .map(Self::DateTime),
            ValueKind::Time => self
                .as_text()
                .and_then(|s| NaiveTime::from_str(s).ok())
                .map(Self::Time),

            // Text, Bytes, Null: no cross-kind conversion
            ValueKind::Text | ValueKind::Bytes | ValueKind::Null => None,
        }
    }

    fn integer_or_parsed(&self) -> Option<BigInt> {
        match self {
            Self::Text(s) => BigInt::from_str(s.trim()).ok(),
            Self::Duration(d) => Some(BigInt::from(d.as_micros())),
            v => v.to_big_int(),
        }
    }

    ///
    /// TEXT FOLDING
    ///

    pub(crate) fn fold_ci(s: &str) -> String {
        if s.is_ascii() {
            return s.to_ascii_lowercase();
        }
        // NOTE: Unicode fallback — plain to_lowercase for non-ASCII.
        s.to_lowercase()
    }

    /// Case-sensitive/insensitive text equality.
    #[must_use]
    pub fn text_eq(&self, other: &str, mode: TextMode) -> bool {
        match (self.as_text(), mode) {
            (Some(s), TextMode::Cs) => s == other,
            (Some(s), TextMode::Ci) => Self::fold_ci(s) == Self::fold_ci(other),
            (None, _) => false,
        }
    }
}

#[macro_export]
macro_rules! impl_from_for {
    ( $( $type:ty => $variant:ident ),* $(,)? ) => {
        $(
            impl From<$type> for Value {
                fn from(v: $type) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    };
}

impl_from_for! {
    NaiveDate     => Date,
    NaiveDateTime => DateTime,
    NaiveTime     => Time,
    Decimal       => Decimal,
    Duration      => Duration,
    Float64       => Float,
    i8            => Int,
    i16           => Int,
    i32           => Int,
    i64           => Int,
    BigInt        => IntBig,
    &str          => Text,
    String        => Text,
    u8            => Uint,
    u16           => Uint,
    u32           => Uint,
    u64           => Uint,
    Vec<u8>       => Bytes,
}

impl From<i128> for Value {
    fn from(v: i128) -> Self {
        Self::IntBig(BigInt::from(v))
    }
}

impl From<u128> for Value {
    fn from(v: u128) -> Self {
        Self::IntBig(BigInt::from(v))
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
