//! Enumeration descriptors.
//!
//! An [`EnumModel`] is the immutable, process-wide description of one
//! enumeration: ordered members, flag marker, and out-of-range boundary
//! policy. Models are built once, validated at construction, and shared
//! behind an `Arc` for the life of the process.

use crate::{
    error::ConfigError,
    value::{TextMode, Value, ValueKind},
};
use derive_more::{Display, FromStr};
use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

///
/// Boundary
///
/// Out-of-range bit handling for flag enumerations. Always present on the
/// model; there is no environment-dependent default fallback.
///

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Display, Eq, FromStr, PartialEq, Serialize,
)]
#[remain::sorted]
pub enum Boundary {
    /// Silently discard unknown bits.
    #[default]
    Conform,
    /// Degrade to a plain integer, losing flag semantics.
    Eject,
    /// Retain all bits including unknown ones; no range constraint.
    Keep,
    /// Reject any bit outside the defined flags.
    Strict,
}

///
/// SymmetricAlias
///
/// An auxiliary property usable as an alternate constructor key.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SymmetricAlias {
    pub value: Value,
    pub mode: TextMode,
}

///
/// EnumMember
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EnumMember {
    pub name: String,
    pub value: Value,
    pub label: Option<String>,
    pub aliases: Vec<SymmetricAlias>,
}

impl EnumMember {
    /// Human-facing label, falling back to the member name.
    #[must_use]
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    /// True when any alias under the given mode matches the probe value.
    #[must_use]
    pub fn alias_matches(&self, probe: &Value, mode: TextMode) -> bool {
        self.aliases.iter().filter(|a| a.mode == mode).any(|a| {
            match (mode, probe.as_text(), a.value.as_text()) {
                (TextMode::Ci, Some(p), Some(v)) => Value::fold_ci(p) == Value::fold_ci(v),
                _ => a.value == *probe,
            }
        })
    }
}

///
/// EnumModel
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EnumModel {
    pub path: String,
    pub members: Vec<EnumMember>,
    pub flag: bool,
    pub boundary: Boundary,
}

impl EnumModel {
    /// Start a builder for the given enumeration path.
    #[must_use]
    pub fn builder(path: &str) -> EnumModelBuilder {
        EnumModelBuilder {
            model: Self {
                path: path.to_string(),
                members: Vec::new(),
                flag: false,
                boundary: Boundary::default(),
            },
        }
    }

    // get
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&EnumMember> {
        self.members.iter().find(|m| m.name == name)
    }

    #[must_use]
    pub const fn is_flag(&self) -> bool {
        self.flag
    }

    /// Coerced non-null member values, declaration order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.members.iter().map(|m| &m.value).filter(|v| !v.is_null())
    }

    /// Distinct non-null member value kinds, declaration order.
    #[must_use]
    pub fn value_kinds(&self) -> Vec<ValueKind> {
        let mut kinds = Vec::new();
        for v in self.values() {
            let kind = v.kind();
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }

        kinds
    }

    /// Capability probe: does any member carry symmetric alternate keys?
    #[must_use]
    pub fn has_symmetric_lookups(&self) -> bool {
        self.members.iter().any(|m| !m.aliases.is_empty())
    }

    /// True when any member value is a negative integer.
    ///
    /// Negative members force a signed storage tier and disable flag
    /// composition semantics.
    #[must_use]
    pub fn has_negative_values(&self) -> bool {
        self.values()
            .filter_map(Value::to_big_int)
            .any(|b| b.is_negative())
    }

    /// Bitwise OR of every integer member value.
    #[must_use]
    pub fn flag_mask(&self) -> BigInt {
        self.values()
            .filter_map(Value::to_big_int)
            .fold(BigInt::zero(), |acc, b| acc | b)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.members.is_empty() {
            return Err(ConfigError::EmptyEnum {
                enum_path: self.path.clone(),
            });
        }

        for (i, m) in self.members.iter().enumerate() {
            for other in &self.members[i + 1..] {
                if m.name == other.name {
                    return Err(ConfigError::DuplicateMember {
                        enum_path: self.path.clone(),
                        detail: format!("name '{}'", m.name),
                    });
                }
                // composite flag members may repeat values; names never do
                if !self.flag && m.value == other.value {
                    return Err(ConfigError::DuplicateMember {
                        enum_path: self.path.clone(),
                        detail: format!("value {:?} ('{}', '{}')", m.value, m.name, other.name),
                    });
                }
            }
        }

        Ok(())
    }
}

///
/// EnumModelBuilder
///
/// Fluent construction; `alias`/`alias_ci` attach to the most recently
/// added variant.
///

pub struct EnumModelBuilder {
    model: EnumModel,
}

impl EnumModelBuilder {
    #[must_use]
    pub fn variant(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.model.members.push(EnumMember {
            name: name.to_string(),
            value: value.into(),
            label: None,
            aliases: Vec::new(),
        });
        self
    }

    #[must_use]
    pub fn variant_labeled(mut self, name: &str, value: impl Into<Value>, label: &str) -> Self {
        self.model.members.push(EnumMember {
            name: name.to_string(),
            value: value.into(),
            label: Some(label.to_string()),
            aliases: Vec::new(),
        });
        self
    }

    /// Case-sensitive symmetric alias on the last added variant.
    #[must_use]
    pub fn alias(mut self, value: impl Into<Value>) -> Self {
        if let Some(m) = self.model.members.last_mut() {
            m.aliases.push(SymmetricAlias {
                value: value.into(),
                mode: TextMode::Cs,
            });
        }
        self
    }

    /// Case-insensitive symmetric alias on the last added variant.
    #[must_use]
    pub fn alias_ci(mut self, text: &str) -> Self {
        if let Some(m) = self.model.members.last_mut() {
            m.aliases.push(SymmetricAlias {
                value: Value::Text(text.to_string()),
                mode: TextMode::Ci,
            });
        }
        self
    }

    /// Mark the enumeration as bit-flag shaped.
    #[must_use]
    pub fn flag(mut self) -> Self {
        self.model.flag = true;
        self
    }

    #[must_use]
    pub fn boundary(mut self, boundary: Boundary) -> Self {
        self.model.boundary = boundary;
        self
    }

    pub fn build(self) -> Result<Arc<EnumModel>, ConfigError> {
        self.model.validate()?;

        Ok(Arc::new(self.model))
    }
}

///
/// EnumValue
///
/// Typed bridge implemented by application enum types. Implementing this
/// trait IS the "usable as an enum column" capability check.
///

pub trait EnumValue: Sized {
    /// The process-wide descriptor for this enumeration.
    fn model() -> Arc<EnumModel>;

    /// The member's primary value.
    fn to_value(&self) -> Value;

    /// Resolve a typed variant from a member name.
    fn from_name(name: &str) -> Option<Self>;
}
