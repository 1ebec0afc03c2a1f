//! Bit-flag composition, decomposition, boundary handling, and the
//! extra-wide byte codec.
//!
//! Composites are plain bitwise ORs of member values; decomposition walks
//! the canonical named single-bit members in declaration order. Values
//! wider than 64 bits are stored as big-endian minimum-length byte
//! sequences with signedness tracked from the member set.

use crate::{
    model::{Boundary, EnumMember, EnumModel},
    value::Value,
};
use num_bigint::{BigInt, Sign};
use num_traits::{One, Zero};

///
/// BoundaryOutcome
///
/// Result of applying a flag model's out-of-range policy to raw bits.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BoundaryOutcome {
    /// Bits are legal (possibly after conforming); carry them forward.
    Bits(BigInt),
    /// Eject policy: degrade to a plain integer value.
    Eject(BigInt),
    /// Strict policy: out-of-range bits are a hard failure.
    Reject,
}

/// Bitwise OR of the given member values.
#[must_use]
pub fn compose<'a>(members: impl IntoIterator<Item = &'a EnumMember>) -> BigInt {
    members
        .into_iter()
        .filter_map(|m| m.value.to_big_int())
        .fold(BigInt::zero(), |acc, b| acc | b)
}

/// True when the value is a single set bit.
#[must_use]
pub fn is_single_bit(b: &BigInt) -> bool {
    b > &BigInt::zero() && (b & (b - BigInt::one())).is_zero()
}

/// Canonical decomposition: named single-bit members, declaration order,
/// whose OR covers the set bits of `bits`.
#[must_use]
pub fn decompose<'a>(model: &'a EnumModel, bits: &BigInt) -> Vec<&'a EnumMember> {
    model
        .members
        .iter()
        .filter(|m| {
            m.value.to_big_int().is_some_and(|b| {
                is_single_bit(&b) && (bits & &b) == b
            })
        })
        .collect()
}

/// Apply the model's boundary policy to raw bits.
///
/// `mask` is the OR of every defined flag. Bits inside the mask always
/// pass; handling of the remainder depends on the policy.
#[must_use]
pub fn apply_boundary(boundary: Boundary, bits: &BigInt, mask: &BigInt) -> BoundaryOutcome {
    let known = bits & mask;
    if &known == bits {
        return BoundaryOutcome::Bits(known);
    }

    match boundary {
        Boundary::Keep => BoundaryOutcome::Bits(bits.clone()),
        Boundary::Conform => BoundaryOutcome::Bits(known),
        Boundary::Eject => BoundaryOutcome::Eject(bits.clone()),
        Boundary::Strict => BoundaryOutcome::Reject,
    }
}

/// Signedness of the wide codec for a member set.
#[must_use]
pub fn wide_signed(model: &EnumModel) -> bool {
    model.has_negative_values()
}

/// Encode to a big-endian minimum-length byte sequence.
#[must_use]
pub fn encode_wide(bits: &BigInt, signed: bool) -> Vec<u8> {
    if signed {
        bits.to_signed_bytes_be()
    } else {
        bits.magnitude().to_bytes_be()
    }
}

/// Decode a big-endian byte sequence produced by [`encode_wide`].
#[must_use]
pub fn decode_wide(bytes: &[u8], signed: bool) -> BigInt {
    if signed {
        BigInt::from_signed_bytes_be(bytes)
    } else {
        BigInt::from_bytes_be(Sign::Plus, bytes)
    }
}

/// Convenience: decode a raw storage value on the wide tier.
#[must_use]
pub fn decode_wide_value(raw: &Value, signed: bool) -> Option<BigInt> {
    match raw {
        Value::Bytes(b) => Some(decode_wide(b, signed)),
        v => v.to_big_int(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn perms() -> Arc<EnumModel> {
        EnumModel::builder("demo::Perm")
            .variant("Read", 1u64)
            .variant("Write", 2u64)
            .variant("Execute", 4u64)
            .flag()
            .boundary(Boundary::Strict)
            .build()
            .unwrap()
    }

    #[test]
    fn decompose_walks_declaration_order() {
        let model = perms();
        let parts = decompose(&model, &BigInt::from(5));
        let names: Vec<&str> = parts.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["Read", "Execute"]);
    }

    #[test]
    fn decompose_skips_composite_members() {
        let model = EnumModel::builder("demo::Perm")
            .variant("Read", 1u64)
            .variant("Write", 2u64)
            .variant("ReadWrite", 3u64)
            .flag()
            .build()
            .unwrap();
        let parts = decompose(&model, &BigInt::from(3));
        let names: Vec<&str> = parts.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["Read", "Write"]);
    }

    #[test]
    fn compose_is_bitwise_or() {
        let model = perms();
        let all = compose(model.members.iter());
        assert_eq!(all, BigInt::from(7));
    }

    #[test]
    fn boundary_policies() {
        let mask = BigInt::from(7);
        let inside = BigInt::from(5);
        let outside = BigInt::from(13);

        for boundary in [Boundary::Keep, Boundary::Conform, Boundary::Strict, Boundary::Eject] {
            assert_eq!(
                apply_boundary(boundary, &inside, &mask),
                BoundaryOutcome::Bits(BigInt::from(5))
            );
        }

        assert_eq!(
            apply_boundary(Boundary::Keep, &outside, &mask),
            BoundaryOutcome::Bits(BigInt::from(13))
        );
        assert_eq!(
            apply_boundary(Boundary::Conform, &outside, &mask),
            BoundaryOutcome::Bits(BigInt::from(5))
        );
        assert_eq!(
            apply_boundary(Boundary::Eject, &outside, &mask),
            BoundaryOutcome::Eject(BigInt::from(13))
        );
        assert_eq!(
            apply_boundary(Boundary::Strict, &outside, &mask),
            BoundaryOutcome::Reject
        );
    }

    #[test]
    fn wide_codec_round_trips_128_bit_values() {
        let big = BigInt::from(1u8) << 128usize;
        let bytes = encode_wide(&big, false);
        assert_eq!(bytes.len(), 17); // 129 bits → 17 bytes
        assert_eq!(decode_wide(&bytes, false), big);
    }

    #[test]
    fn wide_codec_signedness() {
        let neg = BigInt::from(-9);
        let bytes = encode_wide(&neg, true);
        assert_eq!(decode_wide(&bytes, true), neg);

        let model = perms();
        assert!(!wide_signed(&model));

        let signed = EnumModel::builder("demo::Signed")
            .variant("Neg", -1i64)
            .variant("Pos", 1i64)
            .build()
            .unwrap();
        assert!(wide_signed(&signed));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn unsigned_codec_round_trips(v in any::<u128>()) {
                let b = BigInt::from(v);
                prop_assert_eq!(decode_wide(&encode_wide(&b, false), false), b);
            }

            #[test]
            fn signed_codec_round_trips(v in any::<i128>()) {
                let b = BigInt::from(v);
                prop_assert_eq!(decode_wide(&encode_wide(&b, true), true), b);
            }
        }
    }
}
