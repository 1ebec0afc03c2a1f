//! The value coercion engine.
//!
//! Converts raw storage scalars into enumeration members (and composites)
//! through a staged fallback, stopping at the first success:
//!
//!   1. null handling (a null-valued member wins over plain NULL)
//!   2. direct member-value match; flag composites resolve here
//!   3. coerce through the storage primitive, then re-match
//!   4. name lookup, then case-sensitive aliases, then case-insensitive
//!   5. mixed-value models: retry through each observed member value
//!      kind, declaration order (first success wins; the order among
//!      convertible kinds is implementation-defined)
//!   6. kind-specific hook: float models match within relative tolerance
//!   7. strict failure or permissive passthrough
//!
//! A direct value match always beats a name match; a case-sensitive alias
//! always beats a case-insensitive one.

use crate::{
    error::CoercionError,
    flags::{self, BoundaryOutcome},
    model::{EnumMember, EnumModel},
    primitive::Primitive,
    value::{TextMode, Value, ValueKind},
};
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive};
use std::{fmt, sync::Arc};

///
/// MemberRef
///
/// A resolved member: shared model plus member index, cheap to clone and
/// free of borrow lifetimes.
///

#[derive(Clone)]
pub struct MemberRef {
    model: Arc<EnumModel>,
    index: usize,
}

impl MemberRef {
    pub(crate) const fn new(model: Arc<EnumModel>, index: usize) -> Self {
        Self { model, index }
    }

    #[must_use]
    pub fn member(&self) -> &EnumMember {
        &self.model.members[self.index]
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.member().name
    }

    #[must_use]
    pub fn value(&self) -> &Value {
        &self.member().value
    }

    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub const fn model(&self) -> &Arc<EnumModel> {
        &self.model
    }
}

impl PartialEq for MemberRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.model, &other.model) && self.index == other.index
    }
}

impl Eq for MemberRef {}

impl fmt::Debug for MemberRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.model.path, self.name())
    }
}

///
/// Coerced
///
/// The result of boundary coercion: a named member, a flag composite with
/// its canonical decomposition, a permissive raw passthrough, or NULL.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Coerced {
    Member(MemberRef),
    Flags { bits: BigInt, members: Vec<MemberRef> },
    Raw(Value),
    Null,
}

impl Coerced {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn as_member(&self) -> Option<&MemberRef> {
        if let Self::Member(m) = self {
            Some(m)
        } else {
            None
        }
    }
}

///
/// CoerceContext
///
/// Immutable per-field context threaded through the engine.
///

pub(crate) struct CoerceContext<'a> {
    pub model: &'a Arc<EnumModel>,
    pub primitive: Primitive,
    pub field: &'a str,
    pub strict: bool,
    pub flag_semantics: bool,
    pub mask: &'a BigInt,
    /// Member values pre-coerced through the primitive, member order.
    pub storage_values: &'a [Option<Value>],
}

impl CoerceContext<'_> {
    fn member(&self, index: usize) -> MemberRef {
        MemberRef::new(Arc::clone(self.model), index)
    }

    fn fail(&self, raw: &Value) -> CoercionError {
        CoercionError::FailedToCoerce {
            field: self.field.to_string(),
            enum_path: self.model.path.clone(),
            value: raw.clone(),
        }
    }

    fn out_of_range(&self, raw: &Value) -> CoercionError {
        CoercionError::OutOfRange {
            field: self.field.to_string(),
            enum_path: self.model.path.clone(),
            value: raw.clone(),
        }
    }
}

/// Run the staged fallback. `force` makes stage-7 failures hard even on
/// non-strict fields (validation and storage boundaries set it).
pub(crate) fn coerce(
    ctx: &CoerceContext<'_>,
    raw: &Value,
    force: bool,
) -> Result<Coerced, CoercionError> {
    // stage 1: null
    if raw.is_null() {
        let null_member = ctx
            .model
            .members
            .iter()
            .position(|m| m.value.is_null())
            .map(|i| ctx.member(i));

        return Ok(null_member.map_or(Coerced::Null, Coerced::Member));
    }

    // stage 2: direct value match / flag composite resolution
    if let Some(i) = ctx.model.members.iter().position(|m| m.value == *raw) {
        return Ok(Coerced::Member(ctx.member(i)));
    }
    if ctx.flag_semantics {
        if let Some(bits) = raw.to_big_int() {
            return flag_resolve(ctx, raw, &bits);
        }
    }

    // stage 3: through the storage primitive, then re-match
    if let Some(pv) = ctx.primitive.coerce_value(raw) {
        if let Some(i) = ctx
            .storage_values
            .iter()
            .position(|sv| sv.as_ref() == Some(&pv))
        {
            return Ok(Coerced::Member(ctx.member(i)));
        }
        if ctx.flag_semantics {
            if let Some(bits) = pv.to_big_int() {
                return flag_resolve(ctx, raw, &bits);
            }
        }
    }

    // stage 4: member name, then Cs aliases, then Ci aliases
    if let Some(name) = raw.as_text() {
        if let Some(i) = ctx.model.members.iter().position(|m| m.name == name) {
            return Ok(Coerced::Member(ctx.member(i)));
        }
    }
    for mode in [TextMode::Cs, TextMode::Ci] {
        if let Some(i) = ctx
            .model
            .members
            .iter()
            .position(|m| m.alias_matches(raw, mode))
        {
            return Ok(Coerced::Member(ctx.member(i)));
        }
    }

    // stage 5: mixed-value models retry through observed member kinds
    let kinds = ctx.model.value_kinds();
    if kinds.len() > 1 {
        for kind in kinds {
            if kind == ValueKind::Null {
                continue;
            }
            if let Some(cv) = raw.convert_to_kind(kind) {
                if let Some(i) = ctx.model.members.iter().position(|m| m.value == cv) {
                    return Ok(Coerced::Member(ctx.member(i)));
                }
            }
        }
    }

    // stage 6: kind-specific fallback (float tolerance)
    if matches!(ctx.primitive, Primitive::Float) {
        if let Some(i) = float_tolerance_match(ctx.model, raw) {
            return Ok(Coerced::Member(ctx.member(i)));
        }
    }

    // stage 7: strict failure or permissive passthrough
    if force || ctx.strict || raw.kind() != ctx.primitive.storage_kind() {
        return Err(ctx.fail(raw));
    }

    Ok(Coerced::Raw(raw.clone()))
}

/// Flag-shaped resolution: named value, then boundary policy over the
/// composite bits.
fn flag_resolve(
    ctx: &CoerceContext<'_>,
    raw: &Value,
    bits: &BigInt,
) -> Result<Coerced, CoercionError> {
    let member_by_bits = |b: &BigInt| {
        ctx.model
            .members
            .iter()
            .position(|m| m.value.to_big_int().as_ref() == Some(b))
    };

    if let Some(i) = member_by_bits(bits) {
        return Ok(Coerced::Member(ctx.member(i)));
    }

    match flags::apply_boundary(ctx.model.boundary, bits, ctx.mask) {
        BoundaryOutcome::Bits(b) => {
            if let Some(i) = member_by_bits(&b) {
                return Ok(Coerced::Member(ctx.member(i)));
            }
            let members = flags::decompose(ctx.model, &b)
                .iter()
                .filter_map(|m| {
                    ctx.model
                        .members
                        .iter()
                        .position(|n| std::ptr::eq(n, *m))
                        .map(|i| ctx.member(i))
                })
                .collect();

            Ok(Coerced::Flags { bits: b, members })
        }
        BoundaryOutcome::Eject(b) => Ok(Coerced::Raw(big_int_value(&b))),
        BoundaryOutcome::Reject => Err(ctx.out_of_range(raw)),
    }
}

/// Canonical value form for ejected composite bits.
fn big_int_value(b: &BigInt) -> Value {
    if b.is_negative() {
        b.to_i64().map_or_else(|| Value::IntBig(b.clone()), Value::Int)
    } else {
        b.to_u64().map_or_else(|| Value::IntBig(b.clone()), Value::Uint)
    }
}

/// Relative-tolerance match for float-backed models, absorbing storage
/// round-trip error across backends.
fn float_tolerance_match(model: &EnumModel, raw: &Value) -> Option<usize> {
    let Some(Value::Float(probe)) = raw.convert_to_kind(ValueKind::Float) else {
        return None;
    };

    let tolerance = model
        .values()
        .filter_map(|v| {
            if let Value::Float(f) = v {
                Some(f.get().abs() * 1e-6)
            } else {
                None
            }
        })
        .fold(None::<f64>, |acc, t| {
            Some(acc.map_or(t, |a| a.min(t)))
        })?;

    model.members.iter().position(|m| {
        if let Value::Float(f) = &m.value {
            (f.get() - probe.get()).abs() <= tolerance
        } else {
            false
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::Boundary, primitive::IntWidth, types::Float64};
    use num_traits::Zero;
    use rust_decimal::Decimal;

    fn ctx_for<'a>(
        model: &'a Arc<EnumModel>,
        primitive: Primitive,
        strict: bool,
        mask: &'a BigInt,
        storage_values: &'a [Option<Value>],
    ) -> CoerceContext<'a> {
        CoerceContext {
            model,
            primitive,
            field: "status",
            strict,
            flag_semantics: model.is_flag() && !model.has_negative_values(),
            mask,
            storage_values,
        }
    }

    fn storage_values(model: &EnumModel, primitive: Primitive) -> Vec<Option<Value>> {
        model
            .members
            .iter()
            .map(|m| primitive.coerce_value(&m.value))
            .collect()
    }

    fn priority() -> Arc<EnumModel> {
        EnumModel::builder("demo::Priority")
            .variant_labeled("Low", 0u64, "Low")
            .variant_labeled("High", 100u64, "High")
            .build()
            .unwrap()
    }

    #[test]
    fn direct_value_match() {
        let model = priority();
        let p = Primitive::Uint(IntWidth::W16);
        let sv = storage_values(&model, p);
        let mask = BigInt::zero();
        let ctx = ctx_for(&model, p, true, &mask, &sv);

        let got = coerce(&ctx, &Value::Uint(100), false).unwrap();
        assert_eq!(got.as_member().unwrap().name(), "High");
    }

    #[test]
    fn numeric_string_beats_name_lookup() {
        // adversarial: a member literally named "1" with a different value,
        // so a stringified value and a name compete for "1"
        let model = EnumModel::builder("demo::Tricky")
            .variant("One", 1u64)
            .variant("1", 7u64)
            .build()
            .unwrap();
        let p = Primitive::Uint(IntWidth::W16);
        let sv = storage_values(&model, p);
        let mask = BigInt::zero();
        let ctx = ctx_for(&model, p, true, &mask, &sv);

        // primitive coercion (stage 3) resolves "1" → value 1 before the
        // name lookup (stage 4) could resolve it to value 7
        let got = coerce(&ctx, &Value::Text("1".into()), false).unwrap();
        assert_eq!(got.as_member().unwrap().name(), "One");

        // a non-numeric string still reaches name lookup
        let got = coerce(&ctx, &Value::Text("One".into()), false).unwrap();
        assert_eq!(got.as_member().unwrap().name(), "One");
    }

    #[test]
    fn name_lookup_and_alias_precedence() {
        let model = EnumModel::builder("demo::Color")
            .variant("Red", "R")
            .alias_ci("crimson")
            .variant("Green", "G")
            .alias("crimson")
            .build()
            .unwrap();
        let p = Primitive::Text { max_len: Some(1) };
        let sv = storage_values(&model, p);
        let mask = BigInt::zero();
        let ctx = ctx_for(&model, p, true, &mask, &sv);

        // case-sensitive alias (Green) wins over case-insensitive (Red)
        let got = coerce(&ctx, &Value::Text("crimson".into()), false).unwrap();
        assert_eq!(got.as_member().unwrap().name(), "Green");

        // only the Ci alias matches once case differs
        let got = coerce(&ctx, &Value::Text("CRIMSON".into()), false).unwrap();
        assert_eq!(got.as_member().unwrap().name(), "Red");
    }

    #[test]
    fn strict_rejects_and_permissive_passes_through() {
        let model = priority();
        let p = Primitive::Uint(IntWidth::W16);
        let sv = storage_values(&model, p);
        let mask = BigInt::zero();

        let strict = ctx_for(&model, p, true, &mask, &sv);
        assert!(matches!(
            coerce(&strict, &Value::Uint(101), false),
            Err(CoercionError::FailedToCoerce { .. })
        ));

        let lax = ctx_for(&model, p, false, &mask, &sv);
        assert_eq!(
            coerce(&lax, &Value::Uint(101), false).unwrap(),
            Coerced::Raw(Value::Uint(101))
        );

        // permissive mode still rejects values of a foreign kind
        assert!(coerce(&lax, &Value::Text("abc".into()), false).is_err());

        // force makes the failure hard even on a lax field
        assert!(coerce(&lax, &Value::Uint(101), true).is_err());
    }

    #[test]
    fn null_prefers_null_valued_member() {
        let model = EnumModel::builder("demo::Opt")
            .variant("Missing", Value::Null)
            .variant("One", 1u64)
            .build()
            .unwrap();
        let p = Primitive::Uint(IntWidth::W16);
        let sv = storage_values(&model, p);
        let mask = BigInt::zero();
        let ctx = ctx_for(&model, p, true, &mask, &sv);

        let got = coerce(&ctx, &Value::Null, false).unwrap();
        assert_eq!(got.as_member().unwrap().name(), "Missing");

        let plain = priority();
        let sv2 = storage_values(&plain, p);
        let ctx2 = ctx_for(&plain, p, true, &mask, &sv2);
        assert_eq!(coerce(&ctx2, &Value::Null, false).unwrap(), Coerced::Null);
    }

    #[test]
    fn mixed_value_models_retry_by_declared_kind_order() {
        let model = EnumModel::builder("demo::Mixed")
            .variant("Missing", Value::Null)
            .variant("Count", 10u64)
            .variant("Rate", Decimal::new(25, 1)) // 2.5
            .build()
            .unwrap();
        let p = Primitive::Decimal { precision: 3, scale: 1 };
        let sv = storage_values(&model, p);
        let mask = BigInt::zero();
        let ctx = ctx_for(&model, p, true, &mask, &sv);

        // "2.5" fails uint conversion, then matches the decimal member
        let got = coerce(&ctx, &Value::Text("2.5".into()), false).unwrap();
        assert_eq!(got.as_member().unwrap().name(), "Rate");

        // an integer raw reaches the uint member through kind retry
        let got = coerce(&ctx, &Value::Int(10), false).unwrap();
        assert_eq!(got.as_member().unwrap().name(), "Count");
    }

    #[test]
    fn kind_retry_runs_when_primitive_coercion_dead_ends() {
        // int/text members under an explicit text primitive: "1" survives
        // the text primitive unchanged, matches nothing, and only resolves
        // by retrying through the observed integer member kind
        let model = EnumModel::builder("demo::Eccentric")
            .variant("One", 1u64)
            .variant("Word", "w")
            .build()
            .unwrap();
        let p = Primitive::Text { max_len: Some(4) };
        let sv = storage_values(&model, p);
        let mask = BigInt::zero();
        let ctx = ctx_for(&model, p, true, &mask, &sv);

        let got = coerce(&ctx, &Value::Text("1".into()), false).unwrap();
        assert_eq!(got.as_member().unwrap().name(), "One");
    }

    #[test]
    fn float_tolerance_hook() {
        let model = EnumModel::builder("demo::Ratio")
            .variant("Third", Float64::try_new(1.0 / 3.0).unwrap())
            .variant("Half", Float64::try_new(0.5).unwrap())
            .build()
            .unwrap();
        let p = Primitive::Float;
        let sv = storage_values(&model, p);
        let mask = BigInt::zero();
        let ctx = ctx_for(&model, p, true, &mask, &sv);

        // a value perturbed below the relative tolerance still matches
        let perturbed = 1.0 / 3.0 + 1e-9;
        let got = coerce(
            &ctx,
            &Value::Float(Float64::try_new(perturbed).unwrap()),
            false,
        )
        .unwrap();
        assert_eq!(got.as_member().unwrap().name(), "Third");

        // far-off values still fail
        assert!(coerce(
            &ctx,
            &Value::Float(Float64::try_new(0.4).unwrap()),
            false
        )
        .is_err());
    }

    #[test]
    fn flag_composites_and_boundaries() {
        let strict = EnumModel::builder("demo::Perm")
            .variant("Read", 1u64)
            .variant("Write", 2u64)
            .variant("Execute", 4u64)
            .flag()
            .boundary(Boundary::Strict)
            .build()
            .unwrap();
        let p = Primitive::Uint(IntWidth::W16);
        let sv = storage_values(&strict, p);
        let mask = strict.flag_mask();
        let ctx = ctx_for(&strict, p, true, &mask, &sv);

        // composite 5 decomposes to Read|Execute
        let got = coerce(&ctx, &Value::Uint(5), false).unwrap();
        let Coerced::Flags { bits, members } = got else {
            panic!("expected composite");
        };
        assert_eq!(bits, BigInt::from(5));
        let names: Vec<&str> = members.iter().map(MemberRef::name).collect();
        assert_eq!(names, ["Read", "Execute"]);

        // zero is always a legal flag value
        assert!(matches!(
            coerce(&ctx, &Value::Uint(0), false).unwrap(),
            Coerced::Flags { .. }
        ));

        // out-of-range bits are a hard failure under strict boundary
        assert!(matches!(
            coerce(&ctx, &Value::Uint(8), false),
            Err(CoercionError::OutOfRange { .. })
        ));

        // conform masks instead
        let conform = EnumModel::builder("demo::Perm")
            .variant("Read", 1u64)
            .variant("Write", 2u64)
            .variant("Execute", 4u64)
            .flag()
            .boundary(Boundary::Conform)
            .build()
            .unwrap();
        let sv = storage_values(&conform, p);
        let mask = conform.flag_mask();
        let ctx = ctx_for(&conform, p, true, &mask, &sv);
        let got = coerce(&ctx, &Value::Uint(13), false).unwrap();
        let Coerced::Flags { bits, .. } = got else {
            panic!("expected composite");
        };
        assert_eq!(bits, BigInt::from(5));
    }
}
