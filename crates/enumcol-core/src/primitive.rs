//! Storage primitives and primitive inference.
//!
//! A [`Primitive`] is the canonical column type backing an enumeration.
//! Inference derives it once from the union of member value families;
//! every member value must round-trip through the chosen primitive
//! (the symmetric-coercibility invariant), checked at field construction.

use crate::{
    error::ConfigError,
    model::EnumModel,
    value::{Value, ValueFamily, ValueKind},
};
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

///
/// IntWidth
///
/// Fixed-width integer storage tiers, plus the arbitrary-width fallback.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[remain::sorted]
pub enum IntWidth {
    Big,
    W16,
    W32,
    W64,
}

impl IntWidth {
    /// Native bit width, `None` for the arbitrary-width tier.
    #[must_use]
    pub const fn bits(self) -> Option<u16> {
        match self {
            Self::W16 => Some(16),
            Self::W32 => Some(32),
            Self::W64 => Some(64),
            Self::Big => None,
        }
    }

    #[must_use]
    pub fn signed_contains(self, v: &BigInt) -> bool {
        match self {
            Self::W16 => *v >= BigInt::from(i16::MIN) && *v <= BigInt::from(i16::MAX),
            Self::W32 => *v >= BigInt::from(i32::MIN) && *v <= BigInt::from(i32::MAX),
            Self::W64 => *v >= BigInt::from(i64::MIN) && *v <= BigInt::from(i64::MAX),
            Self::Big => true,
        }
    }

    #[must_use]
    pub fn unsigned_contains(self, v: &BigInt) -> bool {
        if v.is_negative() {
            return false;
        }

        match self {
            Self::W16 => *v <= BigInt::from(u16::MAX),
            Self::W32 => *v <= BigInt::from(u32::MAX),
            Self::W64 => *v <= BigInt::from(u64::MAX),
            Self::Big => true,
        }
    }

    /// Smallest signed tier whose value range spans the given magnitude
    /// bit length (sign bit excluded).
    #[must_use]
    pub const fn for_signed_bits(bits: u16) -> Self {
        match bits {
            0..=15 => Self::W16,
            16..=31 => Self::W32,
            32..=63 => Self::W64,
            _ => Self::Big,
        }
    }

    /// Smallest unsigned tier spanning the given bit length.
    #[must_use]
    pub const fn for_unsigned_bits(bits: u16) -> Self {
        match bits {
            0..=16 => Self::W16,
            17..=32 => Self::W32,
            33..=64 => Self::W64,
            _ => Self::Big,
        }
    }
}

///
/// Primitive
///
/// The canonical storage type chosen for an enumeration.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[remain::sorted]
pub enum Primitive {
    Bytes,
    Date,
    DateTime,
    Decimal { precision: u32, scale: u32 },
    Duration,
    Float,
    Int(IntWidth),
    Text { max_len: Option<u32> },
    Time,
    Uint(IntWidth),
}

impl Primitive {
    //
    // grouped helpers
    //

    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::Int(_) | Self::Uint(_))
    }

    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Int(_) | Self::Uint(_) | Self::Float | Self::Decimal { .. }
        )
    }

    #[must_use]
    pub const fn int_width(self) -> Option<IntWidth> {
        match self {
            Self::Int(w) | Self::Uint(w) => Some(w),
            _ => None,
        }
    }

    /// Flag composition requires an unsigned integer storage tier.
    #[must_use]
    pub const fn supports_flag_semantics(self) -> bool {
        matches!(self, Self::Uint(_))
    }

    /// Canonical `Value` variant this primitive stores.
    #[must_use]
    pub const fn storage_kind(self) -> ValueKind {
        match self {
            Self::Bytes => ValueKind::Bytes,
            Self::Date => ValueKind::Date,
            Self::DateTime => ValueKind::DateTime,
            Self::Decimal { .. } => ValueKind::Decimal,
            Self::Duration => ValueKind::Duration,
            Self::Float => ValueKind::Float,
            Self::Int(IntWidth::Big) | Self::Uint(IntWidth::Big) => ValueKind::IntBig,
            Self::Int(_) => ValueKind::Int,
            Self::Uint(_) => ValueKind::Uint,
            Self::Text { .. } => ValueKind::Text,
            Self::Time => ValueKind::Time,
        }
    }

    ///
    /// COERCION
    ///

    /// Coerce a value into this primitive's canonical representation.
    ///
    /// Returns `None` when the value cannot be represented losslessly
    /// (range overflow, fractional part, unparsable text, length overrun).
    #[must_use]
    pub fn coerce_value(&self, v: &Value) -> Option<Value> {
        match self {
            Self::Int(w) => {
                let Some(Value::IntBig(b)) = v.convert_to_kind(ValueKind::IntBig) else {
                    return None;
                };
                if !w.signed_contains(&b) {
                    return None;
                }
                Some(match w {
                    IntWidth::Big => Value::IntBig(b),
                    _ => Value::Int(b.to_i64()?),
                })
            }
            Self::Uint(w) => {
                let Some(Value::IntBig(b)) = v.convert_to_kind(ValueKind::IntBig) else {
                    return None;
                };
                if !w.unsigned_contains(&b) {
                    return None;
                }
                Some(match w {
                    IntWidth::Big => Value::IntBig(b),
                    _ => Value::Uint(b.to_u64()?),
                })
            }
            Self::Float => v.convert_to_kind(ValueKind::Float),
            Self::Decimal { precision, scale } => {
                let Some(Value::Decimal(d)) = v.convert_to_kind(ValueKind::Decimal) else {
                    return None;
                };
                decimal_fits(d, *precision, *scale).then(|| Value::Decimal(d))
            }
            Self::Text { max_len } => {
                let s = v.as_text()?;
                let len = u32::try_from(s.chars().count()).ok()?;
                match max_len {
                    Some(max) if len > *max => None,
                    _ => Some(v.clone()),
                }
            }
            Self::Date => v.convert_to_kind(ValueKind::Date),
            Self::DateTime => v.convert_to_kind(ValueKind::DateTime),
            Self::Time => v.convert_to_kind(ValueKind::Time),
            Self::Duration => v.convert_to_kind(ValueKind::Duration),
            Self::Bytes => v.as_bytes().map(|_| v.clone()),
        }
    }

    /// Symmetric-coercibility check: the value must survive a round trip
    /// through this primitive and back into its own variant kind.
    #[must_use]
    pub fn is_symmetric(&self, v: &Value) -> bool {
        self.coerce_value(v)
            .and_then(|pv| pv.convert_to_kind(v.kind()))
            .is_some_and(|back| back == *v)
    }

    ///
    /// INFERENCE
    ///

    /// Derive the common storage primitive for an enumeration.
    ///
    /// Integer enumerations resolve to the arbitrary-width tier here; the
    /// field factory tightens the width from range analysis.
    pub fn infer(model: &EnumModel) -> Result<Self, ConfigError> {
        let mut families: Vec<ValueFamily> = Vec::new();
        for v in model.values() {
            let family = v.family();
            if !families.contains(&family) {
                families.push(family);
            }
        }

        let unresolvable = |detail: String| ConfigError::UnresolvablePrimitive {
            enum_path: model.path.clone(),
            detail,
        };

        match families.as_slice() {
            [] => Err(unresolvable("all member values are null".to_string())),
            [ValueFamily::Integer] => Ok(Self::integer_placeholder(model)),
            [ValueFamily::Float] => Ok(Self::Float),
            [ValueFamily::Decimal] => Self::infer_decimal(model),
            [ValueFamily::Text] => Ok(Self::Text {
                max_len: infer_max_len(model),
            }),
            [ValueFamily::Bytes] => Ok(Self::Bytes),
            [ValueFamily::Date] => Ok(Self::Date),
            [ValueFamily::DateTime] => Ok(Self::DateTime),
            [ValueFamily::Time] => Ok(Self::Time),
            [ValueFamily::Duration] => Ok(Self::Duration),
            mixed => {
                let numeric = mixed
                    .iter()
                    .all(|f| matches!(f, ValueFamily::Integer | ValueFamily::Float | ValueFamily::Decimal));
                if !numeric {
                    return Err(unresolvable(format!(
                        "mixed member value families {mixed:?}"
                    )));
                }

                // numeric widening ladder: decimal absorbs float absorbs integer
                if mixed.contains(&ValueFamily::Decimal) {
                    Self::infer_decimal(model)
                } else {
                    Ok(Self::Float)
                }
            }
        }
    }

    fn integer_placeholder(model: &EnumModel) -> Self {
        if model.has_negative_values() {
            Self::Int(IntWidth::Big)
        } else {
            Self::Uint(IntWidth::Big)
        }
    }

    fn infer_decimal(model: &EnumModel) -> Result<Self, ConfigError> {
        let mut scale = 0u32;
        let mut int_digits = 1u32;

        for v in model.values() {
            let Some(Value::Decimal(d)) = v.convert_to_kind(ValueKind::Decimal) else {
                return Err(ConfigError::UnresolvablePrimitive {
                    enum_path: model.path.clone(),
                    detail: format!("member value {v:?} has no exact decimal form"),
                });
            };
            let d = d.normalize();
            scale = scale.max(d.scale());

            let whole = d.abs().trunc().normalize().mantissa();
            let digits = u32::try_from(whole.to_string().len()).unwrap_or(u32::MAX);
            int_digits = int_digits.max(digits);
        }

        Ok(Self::Decimal {
            precision: int_digits + scale,
            scale,
        })
    }
}

fn decimal_fits(d: Decimal, precision: u32, scale: u32) -> bool {
    let d = d.normalize();
    if d.scale() > scale {
        return false;
    }

    let whole_digits = u32::try_from(d.abs().trunc().normalize().mantissa().to_string().len())
        .unwrap_or(u32::MAX);
    whole_digits + scale <= precision.max(scale)
}

fn infer_max_len(model: &EnumModel) -> Option<u32> {
    model
        .values()
        .filter_map(Value::as_text)
        .map(|s| u32::try_from(s.chars().count()).unwrap_or(u32::MAX))
        .max()
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes => write!(f, "bytes"),
            Self::Date => write!(f, "date"),
            Self::DateTime => write!(f, "datetime"),
            Self::Decimal { precision, scale } => write!(f, "decimal({precision},{scale})"),
            Self::Duration => write!(f, "duration"),
            Self::Float => write!(f, "float"),
            Self::Int(IntWidth::Big) => write!(f, "intbig"),
            Self::Int(w) => write!(f, "int{}", w.bits().unwrap_or(0)),
            Self::Text { max_len: Some(n) } => write!(f, "text({n})"),
            Self::Text { max_len: None } => write!(f, "text"),
            Self::Time => write!(f, "time"),
            Self::Uint(IntWidth::Big) => write!(f, "uintbig"),
            Self::Uint(w) => write!(f, "uint{}", w.bits().unwrap_or(0)),
        }
    }
}
