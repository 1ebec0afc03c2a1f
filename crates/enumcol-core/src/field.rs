//! Column fields: the factory, the boundary hooks, and migration state.
//!
//! A [`Field`] composes an enumeration model with its resolved storage
//! primitive and policy knobs. Construction runs primitive inference,
//! width analysis, and the symmetric-coercibility gate once; the
//! configuration is immutable afterwards and every hook is read-only.

use crate::{
    coerce::{Coerced, CoerceContext, coerce},
    constraint::{
        CheckConstraint, ConstraintExpr, ConstraintInput, FlagRange, build_check, constraint_name,
    },
    error::{CoercionError, ConfigError, Error, UnsupportedOperationError, ValidationError},
    flags,
    model::{Boundary, EnumModel, EnumValue},
    primitive::{IntWidth, Primitive},
    trace::{FieldTraceEvent, FieldTraceSink},
    value::Value,
    width::BitWidth,
};
use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

///
/// FieldOptions
///
/// Declaration-time configuration. Defaults mirror the common case:
/// strict membership, eager coercion, constrained, non-nullable.
///

#[derive(Clone)]
pub struct FieldOptions {
    pub primitive: Option<Primitive>,
    pub bit_length: Option<u16>,
    pub strict: bool,
    pub coerce: bool,
    pub constrained: bool,
    pub nullable: bool,
    pub trace: Option<Arc<dyn FieldTraceSink>>,
}

impl Default for FieldOptions {
    fn default() -> Self {
        Self {
            primitive: None,
            bit_length: None,
            strict: true,
            coerce: true,
            constrained: true,
            nullable: false,
            trace: None,
        }
    }
}

impl FieldOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

///
/// Field
///

pub struct Field {
    name: String,
    model: Arc<EnumModel>,
    primitive: Primitive,
    strict: bool,
    coerce: bool,
    constrained: bool,
    nullable: bool,
    bit_length: Option<u16>,
    width: Option<BitWidth>,
    flag_semantics: bool,
    mask: BigInt,
    /// Member values pre-coerced through the primitive, member order.
    storage_values: Vec<Option<Value>>,
    trace: Option<Arc<dyn FieldTraceSink>>,
}

impl Field {
    ///
    /// FACTORY
    ///

    /// Build a field for the given enumeration, resolving the storage
    /// primitive and width tier and enforcing the round-trip invariant.
    pub fn build(
        name: &str,
        model: Arc<EnumModel>,
        options: FieldOptions,
    ) -> Result<Self, ConfigError> {
        let explicit = options.primitive.is_some();
        let mut primitive = match options.primitive {
            Some(p) => p,
            None => Primitive::infer(&model)?,
        };

        let mut width = None;
        if primitive.is_integer() {
            width = BitWidth::analyze(&model);
            if let Some(w) = &width {
                if let Some(declared) = options.bit_length {
                    w.check_override(declared, &model.path)?;
                }
                if !explicit {
                    let tier = w.tier(model.is_flag(), options.bit_length);
                    primitive = if w.signed {
                        Primitive::Int(tier)
                    } else {
                        Primitive::Uint(tier)
                    };
                }
            }
        }

        // symmetric-coercibility gate: every member value must round-trip
        let mut offender = None;
        let mut survivors = 0usize;
        for m in &model.members {
            if m.value.is_null() {
                continue;
            }
            if primitive.is_symmetric(&m.value) {
                survivors += 1;
            } else if offender.is_none() {
                offender = Some(m.name.clone());
            }
        }
        if let Some(member) = offender {
            if survivors == 0 {
                return Err(ConfigError::UnsupportedPrimitive {
                    enum_path: model.path.clone(),
                    primitive: primitive.to_string(),
                });
            }
            return Err(ConfigError::NotSymmetric {
                enum_path: model.path.clone(),
                member,
                primitive: primitive.to_string(),
            });
        }

        let storage_values: Vec<Option<Value>> = model
            .members
            .iter()
            .map(|m| primitive.coerce_value(&m.value))
            .collect();

        let flag_semantics = model.is_flag() && primitive.supports_flag_semantics();
        let mask = model.flag_mask();

        let field = Self {
            name: name.to_string(),
            model,
            primitive,
            strict: options.strict,
            coerce: options.coerce,
            constrained: options.constrained,
            nullable: options.nullable,
            bit_length: options.bit_length,
            width,
            flag_semantics,
            mask,
            storage_values,
            trace: options.trace,
        };

        field.emit(|f| FieldTraceEvent::Resolved {
            field: f.name.clone(),
            enum_path: f.model.path.clone(),
            primitive: f.primitive,
        });

        Ok(field)
    }

    fn emit(&self, event: impl FnOnce(&Self) -> FieldTraceEvent) {
        if let Some(sink) = &self.trace {
            sink.on_event(event(self));
        }
    }

    ///
    /// ACCESSORS
    ///

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn model(&self) -> &Arc<EnumModel> {
        &self.model
    }

    #[must_use]
    pub const fn primitive(&self) -> Primitive {
        self.primitive
    }

    #[must_use]
    pub const fn nullable(&self) -> bool {
        self.nullable
    }

    #[must_use]
    pub const fn is_strict(&self) -> bool {
        self.strict
    }

    #[must_use]
    pub const fn width(&self) -> Option<&BitWidth> {
        self.width.as_ref()
    }

    /// True when bitwise composition semantics are active.
    #[must_use]
    pub const fn flag_semantics(&self) -> bool {
        self.flag_semantics
    }

    /// True when flag composites are stored byte-encoded.
    #[must_use]
    pub fn wide_flag(&self) -> bool {
        self.flag_semantics && self.primitive.int_width() == Some(IntWidth::Big)
    }

    fn ctx(&self) -> CoerceContext<'_> {
        CoerceContext {
            model: &self.model,
            primitive: self.primitive,
            field: self.name.as_str(),
            strict: self.strict,
            flag_semantics: self.flag_semantics,
            mask: &self.mask,
            storage_values: self.storage_values.as_slice(),
        }
    }

    ///
    /// COERCION HOOKS
    ///

    /// Staged coercion with this field's policy knobs.
    pub fn coerce_value(&self, raw: &Value) -> Result<Coerced, CoercionError> {
        coerce(&self.ctx(), raw, false)
    }

    /// Read-path hook: raw storage value → coerced application value.
    pub fn from_db(&self, raw: &Value) -> Result<Coerced, CoercionError> {
        let raw = self.decode_storage(raw);

        if !self.coerce {
            let pv = self
                .primitive
                .coerce_value(&raw)
                .ok_or_else(|| self.fail(&raw))?;
            return Ok(Coerced::Raw(pv));
        }

        coerce(&self.ctx(), &raw, false)
    }

    /// Write-path hook: application value → raw storage value.
    pub fn to_db(&self, value: &Value) -> Result<Value, CoercionError> {
        if value.is_null() {
            return Ok(Value::Null);
        }

        if !self.coerce {
            return self
                .primitive
                .coerce_value(value)
                .ok_or_else(|| self.fail(value));
        }

        let coerced = coerce(&self.ctx(), value, false)?;
        Ok(self.storage_value(&coerced))
    }

    /// Assignment hook: eager coercion that swallows failures by keeping
    /// the raw value verbatim. Failures resurface at validation or the
    /// storage boundary.
    #[must_use]
    pub fn assign(&self, value: Value) -> Coerced {
        if value.is_null() {
            return Coerced::Null;
        }

        coerce(&self.ctx(), &value, false).unwrap_or(Coerced::Raw(value))
    }

    /// Form-path hook: coercion whose failures carry field context.
    pub fn to_app(&self, raw: &Value) -> Result<Coerced, ValidationError> {
        let raw = self.decode_storage(raw);
        coerce(&self.ctx(), &raw, true)
            .map_err(|e| ValidationError::from_coercion(&self.name, &raw, &e))
    }

    /// Full validation: nullability plus forced coercion.
    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        if value.is_null() {
            if self.nullable || self.model.members.iter().any(|m| m.value.is_null()) {
                return Ok(());
            }
            return Err(ValidationError::from_coercion(
                &self.name,
                value,
                &CoercionError::NotNullable {
                    field: self.name.clone(),
                },
            ));
        }

        coerce(&self.ctx(), value, true)
            .map(|_| ())
            .map_err(|e| ValidationError::from_coercion(&self.name, value, &e))
    }

    ///
    /// TYPED ADAPTERS
    ///

    pub fn to_db_typed<E: EnumValue>(&self, value: &E) -> Result<Value, CoercionError> {
        self.to_db(&value.to_value())
    }

    pub fn from_db_typed<E: EnumValue>(&self, raw: &Value) -> Result<Option<E>, CoercionError> {
        match self.from_db(raw)? {
            Coerced::Member(m) => Ok(E::from_name(m.name())),
            _ => Ok(None),
        }
    }

    ///
    /// STORAGE
    ///

    /// Canonical storage value for a coercion result.
    #[must_use]
    pub fn storage_value(&self, coerced: &Coerced) -> Value {
        match coerced {
            Coerced::Member(m) => {
                if self.wide_flag() {
                    if let Some(bits) = m.value().to_big_int() {
                        return Value::Bytes(flags::encode_wide(&bits, self.wide_signed()));
                    }
                }
                self.storage_values[m.index()]
                    .clone()
                    .unwrap_or(Value::Null)
            }
            Coerced::Flags { bits, .. } => {
                if self.wide_flag() {
                    Value::Bytes(flags::encode_wide(bits, self.wide_signed()))
                } else {
                    self.primitive
                        .coerce_value(&Value::IntBig(bits.clone()))
                        .unwrap_or_else(|| Value::IntBig(bits.clone()))
                }
            }
            Coerced::Raw(v) => self.primitive.coerce_value(v).unwrap_or_else(|| v.clone()),
            Coerced::Null => Value::Null,
        }
    }

    fn wide_signed(&self) -> bool {
        flags::wide_signed(&self.model)
    }

    fn decode_storage(&self, raw: &Value) -> Value {
        if self.wide_flag() {
            if let Some(bits) = flags::decode_wide_value(raw, self.wide_signed()) {
                return Value::IntBig(bits);
            }
        }

        raw.clone()
    }

    fn fail(&self, raw: &Value) -> CoercionError {
        CoercionError::FailedToCoerce {
            field: self.name.clone(),
            enum_path: self.model.path.clone(),
            value: raw.clone(),
        }
    }

    ///
    /// CONSTRAINTS
    ///

    /// Build the CHECK constraint for this column, if any.
    #[must_use]
    pub fn check_constraint(&self, app: &str, model_name: &str) -> Option<CheckConstraint> {
        if !self.constrained {
            return None;
        }

        let name = constraint_name(app, model_name, &self.name, &self.model.path);

        // negative-valued flag models use the closed value set, never the
        // range form
        let flag_range = self.flag_semantics.then(|| FlagRange {
            min: self
                .model
                .values()
                .filter_map(Value::to_big_int)
                .filter(Signed::is_positive)
                .min()
                .unwrap_or_else(BigInt::zero),
            max: self.mask.clone(),
        });

        let constraint = build_check(ConstraintInput {
            name,
            column: &self.name,
            nullable: self.nullable,
            strict: self.strict,
            values: self.storage_values.iter().flatten().cloned().collect(),
            flag_range,
            boundary: self.model.boundary,
        });

        if let Some(c) = &constraint {
            self.emit(|f| FieldTraceEvent::ConstraintEmitted {
                field: f.name.clone(),
                name: c.name.clone(),
            });
        }

        constraint
    }

    ///
    /// QUERY LOOKUPS
    ///

    /// Render a "has any of these bits" lookup over this column.
    pub fn has_any(&self, probe: &Value) -> Result<ConstraintExpr, Error> {
        let mask = self.lookup_mask(probe, "has_any")?;
        Ok(ConstraintExpr::BitAndNonZero {
            column: self.name.clone(),
            mask,
        })
    }

    /// Render a "has all of these bits" lookup over this column.
    pub fn has_all(&self, probe: &Value) -> Result<ConstraintExpr, Error> {
        let mask = self.lookup_mask(probe, "has_all")?;
        Ok(ConstraintExpr::BitAndEq {
            column: self.name.clone(),
            mask,
        })
    }

    fn lookup_mask(&self, probe: &Value, lookup: &str) -> Result<Value, Error> {
        if !self.flag_semantics {
            return Err(self.fail(probe).into());
        }
        // database bitwise operators do not reach byte-encoded columns
        if self.wide_flag() {
            return Err(UnsupportedOperationError::WideFlagLookup {
                field: self.name.clone(),
                lookup: lookup.to_string(),
            }
            .into());
        }

        let bits = match coerce(&self.ctx(), probe, true)? {
            Coerced::Flags { bits, .. } => bits,
            Coerced::Member(m) => m.value().to_big_int().ok_or_else(|| self.fail(probe))?,
            _ => return Err(self.fail(probe).into()),
        };

        Ok(self
            .primitive
            .coerce_value(&Value::IntBig(bits.clone()))
            .unwrap_or(Value::IntBig(bits)))
    }

    ///
    /// MIGRATION STATE
    ///

    /// Serialize to enum-independent migration state. Only `(value,
    /// label)` pairs travel; the enumeration type itself never does, so
    /// historical state survives renames and moves.
    #[must_use]
    pub fn deconstruct(&self) -> FieldSpec {
        FieldSpec {
            name: self.name.clone(),
            enum_path: self.model.path.clone(),
            choices: self
                .model
                .members
                .iter()
                .map(|m| (m.value.clone(), m.label().to_string()))
                .collect(),
            flag: self.model.is_flag(),
            boundary: self.model.boundary,
            primitive: self.primitive,
            bit_length: self.bit_length,
            strict: self.strict,
            coerce: self.coerce,
            constrained: self.constrained,
            nullable: self.nullable,
        }
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("enum", &self.model.path)
            .field("primitive", &self.primitive)
            .field("strict", &self.strict)
            .field("coerce", &self.coerce)
            .field("nullable", &self.nullable)
            .finish_non_exhaustive()
    }
}

///
/// FieldSpec
///
/// Deconstructed field state: re-invoking the factory with this record
/// reproduces an equivalent, enum-independent field.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FieldSpec {
    pub name: String,
    pub enum_path: String,
    pub choices: Vec<(Value, String)>,
    pub flag: bool,
    pub boundary: Boundary,
    pub primitive: Primitive,
    pub bit_length: Option<u16>,
    pub strict: bool,
    pub coerce: bool,
    pub constrained: bool,
    pub nullable: bool,
}

impl FieldSpec {
    /// Rebuild an equivalent field around a synthesized anonymous model.
    pub fn rebuild(&self) -> Result<Field, ConfigError> {
        let mut builder = EnumModel::builder(&self.enum_path);
        for (value, label) in &self.choices {
            builder = builder.variant_labeled(label, value.clone(), label);
        }
        if self.flag {
            builder = builder.flag();
        }
        let model = builder.boundary(self.boundary).build()?;

        Field::build(
            &self.name,
            model,
            FieldOptions {
                primitive: Some(self.primitive),
                bit_length: self.bit_length,
                strict: self.strict,
                coerce: self.coerce,
                constrained: self.constrained,
                nullable: self.nullable,
                trace: None,
            },
        )
    }
}
