//! Integer width/range analysis.
//!
//! Bit lengths use magnitude semantics (sign excluded), so tier selection
//! is driven purely by magnitude. Negative members force a signed tier and
//! disable flag composition.

use crate::{error::ConfigError, model::EnumModel, primitive::IntWidth, value::Value};
use num_bigint::BigInt;
use num_traits::Signed;

///
/// BitWidth
///
/// Range descriptor for an integer-backed enumeration.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BitWidth {
    pub min_value: BigInt,
    pub max_value: BigInt,
    pub min_bits: u16,
    pub max_bits: u16,
    pub signed: bool,
}

impl BitWidth {
    /// Analyze the integer range of an enumeration's member values.
    ///
    /// Returns `None` when no member value has an exact integer form.
    #[must_use]
    pub fn analyze(model: &EnumModel) -> Option<Self> {
        let values: Vec<BigInt> = model.values().filter_map(Value::to_big_int).collect();
        let min_value = values.iter().min()?.clone();
        let max_value = values.iter().max()?.clone();

        Some(Self {
            min_bits: magnitude_bits(&min_value),
            max_bits: magnitude_bits(&max_value),
            signed: min_value.is_negative(),
            min_value,
            max_value,
        })
    }

    /// Verify an explicit bit-length override covers the analyzed range.
    pub fn check_override(&self, declared: u16, enum_path: &str) -> Result<(), ConfigError> {
        let required = self.min_bits.max(self.max_bits);
        if required > declared {
            return Err(ConfigError::BitLengthTooSmall {
                enum_path: enum_path.to_string(),
                required,
                declared,
            });
        }

        Ok(())
    }

    /// Select the storage tier, widened to any explicit override.
    ///
    /// Flag enumerations needing 64 bits or more take the arbitrary-width
    /// tier so composition never overflows the native representation.
    #[must_use]
    pub fn tier(&self, flag: bool, declared: Option<u16>) -> IntWidth {
        let needed = self.min_bits.max(self.max_bits);
        let effective = declared.map_or(needed, |d| d.max(needed));

        if self.signed {
            IntWidth::for_signed_bits(effective)
        } else if flag && effective >= 64 {
            IntWidth::Big
        } else {
            IntWidth::for_unsigned_bits(effective)
        }
    }
}

fn magnitude_bits(v: &BigInt) -> u16 {
    u16::try_from(v.bits()).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn ints(values: &[i64]) -> Arc<EnumModel> {
        let mut b = EnumModel::builder("demo::Ints");
        for (i, v) in values.iter().enumerate() {
            b = b.variant(&format!("V{i}"), *v);
        }
        b.build().unwrap()
    }

    #[test]
    fn analyze_reports_range_and_bits() {
        let w = BitWidth::analyze(&ints(&[0, 100])).unwrap();
        assert_eq!(w.min_value, BigInt::from(0));
        assert_eq!(w.max_value, BigInt::from(100));
        assert_eq!(w.min_bits, 0);
        assert_eq!(w.max_bits, 7);
        assert!(!w.signed);
    }

    #[test]
    fn negative_members_force_signed() {
        let w = BitWidth::analyze(&ints(&[-5, 9])).unwrap();
        assert!(w.signed);
        assert_eq!(w.tier(true, None), IntWidth::W16);
    }

    #[test]
    fn override_too_small_is_rejected() {
        let w = BitWidth::analyze(&ints(&[0, 100_000])).unwrap();
        assert_eq!(w.max_bits, 17);
        let err = w.check_override(8, "demo::Ints").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::BitLengthTooSmall { required: 17, declared: 8, .. }
        ));
        assert!(w.check_override(17, "demo::Ints").is_ok());
    }

    #[test]
    fn override_widens_the_tier() {
        let w = BitWidth::analyze(&ints(&[0, 100])).unwrap();
        assert_eq!(w.tier(false, None), IntWidth::W16);
        assert_eq!(w.tier(false, Some(20)), IntWidth::W32);
        assert_eq!(w.tier(false, Some(65)), IntWidth::Big);
    }

    #[test]
    fn wide_flags_take_the_big_tier() {
        let w = BitWidth::analyze(&ints(&[1, 1 << 40])).unwrap();
        assert_eq!(w.tier(true, None), IntWidth::W64);
        assert_eq!(w.tier(true, Some(64)), IntWidth::Big);
        assert_eq!(w.tier(false, Some(64)), IntWidth::W64);
    }

    #[test]
    fn no_integer_values_yields_none() {
        let m = EnumModel::builder("demo::Text")
            .variant("A", "a")
            .build()
            .unwrap();
        assert!(BitWidth::analyze(&m).is_none());
    }
}
