//! CHECK constraint expressions.
//!
//! A small predicate AST rendered to a standard SQL boolean expression
//! over literals and one column reference. Constraint names derive
//! deterministically from `{app}_{model}_{field}_{enum}` and keep the
//! trailing 64 characters when truncated (the most specific part).

use crate::{
    model::Boundary,
    value::Value,
};
use convert_case::{Case, Casing};
use num_bigint::BigInt;
use std::fmt::Write;

/// Database identifier length limit for generated constraint names.
pub const MAX_CONSTRAINT_NAME_LEN: usize = 64;

///
/// ConstraintExpr
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConstraintExpr {
    And(Vec<Self>),
    Or(Vec<Self>),
    Not(Box<Self>),
    In { column: String, values: Vec<Value> },
    Between { column: String, low: Value, high: Value },
    Eq { column: String, value: Value },
    IsNull { column: String },
    BitAndNonZero { column: String, mask: Value },
    BitAndEq { column: String, mask: Value },
}

impl ConstraintExpr {
    #[must_use]
    pub fn or(exprs: Vec<Self>) -> Self {
        Self::Or(exprs)
    }

    /// Render to a SQL boolean expression.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match self {
            Self::And(children) => join_bool(children, " AND "),
            Self::Or(children) => join_bool(children, " OR "),
            Self::Not(child) => format!("NOT ({})", child.to_sql()),
            Self::In { column, values } => {
                let items: Vec<String> = values.iter().map(sql_literal).collect();
                format!("{column} IN ({})", items.join(", "))
            }
            Self::Between { column, low, high } => {
                format!(
                    "{column} BETWEEN {} AND {}",
                    sql_literal(low),
                    sql_literal(high)
                )
            }
            Self::Eq { column, value } => format!("{column} = {}", sql_literal(value)),
            Self::IsNull { column } => format!("{column} IS NULL"),
            Self::BitAndNonZero { column, mask } => {
                format!("({column} & {}) <> 0", sql_literal(mask))
            }
            Self::BitAndEq { column, mask } => {
                let m = sql_literal(mask);
                format!("({column} & {m}) = {m}")
            }
        }
    }
}

fn join_bool(children: &[ConstraintExpr], sep: &str) -> String {
    let parts: Vec<String> = children
        .iter()
        .map(|c| format!("({})", c.to_sql()))
        .collect();

    parts.join(sep)
}

///
/// CheckConstraint
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CheckConstraint {
    pub name: String,
    pub expr: ConstraintExpr,
}

impl CheckConstraint {
    /// Full DDL fragment for the owning table.
    #[must_use]
    pub fn ddl(&self) -> String {
        format!("CONSTRAINT {} CHECK ({})", self.name, self.expr.to_sql())
    }
}

/// Derive the deterministic constraint name, truncating from the front so
/// the most specific suffix survives the identifier length limit.
#[must_use]
pub fn constraint_name(app: &str, model: &str, field: &str, enum_path: &str) -> String {
    let flat = format!(
        "{}_{}_{}_{}",
        ident(app),
        ident(model),
        ident(field),
        ident(enum_path)
    );

    let excess = flat.chars().count().saturating_sub(MAX_CONSTRAINT_NAME_LEN);
    if excess == 0 {
        return flat;
    }
    flat.chars().skip(excess).collect()
}

fn ident(part: &str) -> String {
    part.replace("::", "_").to_case(Case::Snake)
}

///
/// ConstraintInput
///
/// Everything the builder needs, precomputed by the field.
///

pub(crate) struct ConstraintInput<'a> {
    pub name: String,
    pub column: &'a str,
    pub nullable: bool,
    pub strict: bool,
    pub values: Vec<Value>,
    /// `Some` when flag composition semantics are active.
    pub flag_range: Option<FlagRange>,
    pub boundary: Boundary,
}

pub(crate) struct FlagRange {
    /// Smallest nonzero flag value.
    pub min: BigInt,
    /// Bitwise OR of every flag.
    pub max: BigInt,
}

/// Build the CHECK constraint for one column, or `None` when the policy
/// emits no range constraint.
pub(crate) fn build_check(input: ConstraintInput<'_>) -> Option<CheckConstraint> {
    let expr = match &input.flag_range {
        Some(range) => flag_expr(&input, range)?,
        None => membership_expr(&input),
    };

    Some(CheckConstraint {
        name: input.name,
        expr,
    })
}

fn membership_expr(input: &ConstraintInput<'_>) -> ConstraintExpr {
    let mut values = Vec::new();
    for v in &input.values {
        if !values.contains(v) {
            values.push(v.clone());
        }
    }

    let member = ConstraintExpr::In {
        column: input.column.to_string(),
        values,
    };

    with_null(input, member)
}

fn flag_expr(input: &ConstraintInput<'_>, range: &FlagRange) -> Option<ConstraintExpr> {
    match input.boundary {
        // keep retains unknown bits, so no storable range exists
        Boundary::Keep => return None,
        // eject constrains only when the field itself is strict
        Boundary::Eject if !input.strict => return None,
        // conform constrains the storable range even though inserts would
        // be conformed rather than rejected by the policy
        Boundary::Conform | Boundary::Strict | Boundary::Eject => {}
    }

    let column = input.column.to_string();
    let ranged = ConstraintExpr::Or(vec![
        ConstraintExpr::Between {
            column: column.clone(),
            low: big_literal(&range.min),
            high: big_literal(&range.max),
        },
        ConstraintExpr::Eq {
            column,
            value: Value::Uint(0),
        },
    ]);

    Some(with_null(input, ranged))
}

fn with_null(input: &ConstraintInput<'_>, expr: ConstraintExpr) -> ConstraintExpr {
    if !input.nullable {
        return expr;
    }

    let null_arm = ConstraintExpr::IsNull {
        column: input.column.to_string(),
    };
    match expr {
        ConstraintExpr::Or(mut children) => {
            children.push(null_arm);
            ConstraintExpr::Or(children)
        }
        other => ConstraintExpr::Or(vec![other, null_arm]),
    }
}

fn big_literal(b: &BigInt) -> Value {
    use num_traits::ToPrimitive;

    b.to_u64().map_or_else(|| Value::IntBig(b.clone()), Value::Uint)
}

fn sql_literal(v: &Value) -> String {
    match v {
        Value::Int(i) => i.to_string(),
        Value::Uint(u) => u.to_string(),
        Value::IntBig(b) => b.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Decimal(d) => d.to_string(),
        Value::Duration(d) => d.get().to_string(),
        Value::Text(s) => quote(s),
        Value::Date(d) => quote(&d.to_string()),
        Value::DateTime(dt) => quote(&dt.to_string()),
        Value::Time(t) => quote(&t.to_string()),
        Value::Bytes(bytes) => {
            let mut hex = String::with_capacity(bytes.len() * 2 + 3);
            hex.push_str("X'");
            for b in bytes {
                let _ = write!(hex, "{b:02X}");
            }
            hex.push('\'');
            hex
        }
        Value::Null => "NULL".to_string(),
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn membership_constraint_renders_in_list() {
        let c = build_check(ConstraintInput {
            name: "app_task_status_demo_priority".to_string(),
            column: "status",
            nullable: false,
            strict: true,
            values: vec![Value::Uint(0), Value::Uint(100)],
            flag_range: None,
            boundary: Boundary::Conform,
        })
        .unwrap();

        assert_eq!(c.expr.to_sql(), "status IN (0, 100)");
        assert_eq!(
            c.ddl(),
            "CONSTRAINT app_task_status_demo_priority CHECK (status IN (0, 100))"
        );
    }

    #[test]
    fn nullable_adds_null_arm() {
        let c = build_check(ConstraintInput {
            name: "n".to_string(),
            column: "status",
            nullable: true,
            strict: true,
            values: vec![Value::Uint(1)],
            flag_range: None,
            boundary: Boundary::Conform,
        })
        .unwrap();

        assert_eq!(c.expr.to_sql(), "(status IN (1)) OR (status IS NULL)");
    }

    #[test]
    fn strict_flag_constraint_matches_range_form() {
        let c = build_check(ConstraintInput {
            name: "n".to_string(),
            column: "perm",
            nullable: false,
            strict: true,
            values: vec![Value::Uint(1), Value::Uint(2), Value::Uint(4)],
            flag_range: Some(FlagRange {
                min: BigInt::from(1),
                max: BigInt::from(7),
            }),
            boundary: Boundary::Strict,
        })
        .unwrap();

        assert_eq!(c.expr.to_sql(), "(perm BETWEEN 1 AND 7) OR (perm = 0)");
    }

    #[test]
    fn flag_policy_table() {
        let build = |boundary: Boundary, strict: bool| {
            build_check(ConstraintInput {
                name: "n".to_string(),
                column: "perm",
                nullable: false,
                strict,
                values: vec![Value::Uint(1)],
                flag_range: Some(FlagRange {
                    min: BigInt::from(1),
                    max: BigInt::from(7),
                }),
                boundary,
            })
        };

        assert!(build(Boundary::Keep, true).is_none());
        assert!(build(Boundary::Strict, false).is_some());
        assert!(build(Boundary::Conform, false).is_some());
        assert!(build(Boundary::Eject, false).is_none());
        assert!(build(Boundary::Eject, true).is_some());
    }

    #[test]
    fn name_truncation_keeps_suffix() {
        let name = constraint_name("app", "model", "field", "demo::Priority");
        assert_eq!(name, "app_model_field_demo_priority");

        let long = constraint_name(
            "averylongapplicationlabel",
            "averylongmodelname",
            "averylongfieldname",
            "averylongcrate::AVeryLongEnumName",
        );
        assert_eq!(long.chars().count(), MAX_CONSTRAINT_NAME_LEN);
        assert!(long.ends_with("a_very_long_enum_name"));
    }

    #[test]
    fn literal_rendering() {
        assert_eq!(sql_literal(&Value::Text("O'Brien".into())), "'O''Brien'");
        assert_eq!(
            sql_literal(&Value::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())),
            "'2024-01-02'"
        );
        assert_eq!(sql_literal(&Value::Bytes(vec![0xAB, 0x01])), "X'AB01'");
        assert_eq!(sql_literal(&Value::Null), "NULL");
    }
}
