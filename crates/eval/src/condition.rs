//! Condition evaluation against a specimen record.
//!
//! A condition that cannot be checked (missing field, null, a value of
//! the wrong shape) is a fault, not an error. Faults are reported through
//! [`ConditionOutcome::Faulted`] so callers can audit them, and count as
//! unsatisfied everywhere a score is computed.

use std::fmt;

use crate::numeric;
use crate::types::{Condition, Record, Value};

/// Why a condition could not be checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionFault {
    MissingField { field: String },
    NullValue { field: String },
    NotNumeric { field: String, found: String },
    NotInteger { field: String, found: String },
    NotBoolean { field: String, found: String },
    NotScalar { field: String, found: String },
}

impl fmt::Display for ConditionFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionFault::MissingField { field } => write!(f, "field '{}' is missing", field),
            ConditionFault::NullValue { field } => write!(f, "field '{}' is null", field),
            ConditionFault::NotNumeric { field, found } => {
                write!(f, "field '{}' is not numeric ({})", field, found)
            }
            ConditionFault::NotInteger { field, found } => {
                write!(f, "field '{}' is not an integer ({})", field, found)
            }
            ConditionFault::NotBoolean { field, found } => {
                write!(f, "field '{}' is not a boolean ({})", field, found)
            }
            ConditionFault::NotScalar { field, found } => {
                write!(f, "field '{}' holds an {}, not a scalar", field, found)
            }
        }
    }
}

/// Tri-state result of checking one condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionOutcome {
    Satisfied,
    Unsatisfied,
    Faulted(ConditionFault),
}

impl ConditionOutcome {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, ConditionOutcome::Satisfied)
    }
}

fn from_bool(b: bool) -> ConditionOutcome {
    if b {
        ConditionOutcome::Satisfied
    } else {
        ConditionOutcome::Unsatisfied
    }
}

fn describe(v: &Value) -> String {
    match v.display_text() {
        Some(text) => format!("{} '{}'", v.type_name(), text),
        None => v.type_name().to_string(),
    }
}

/// Look up a field, faulting on absence, null or a nested value.
fn lookup<'r>(record: &'r Record, field: &str) -> Result<&'r Value, ConditionFault> {
    match record.get(field) {
        None => Err(ConditionFault::MissingField {
            field: field.to_string(),
        }),
        Some(Value::Null) => Err(ConditionFault::NullValue {
            field: field.to_string(),
        }),
        Some(v @ Value::Nested(_)) => Err(ConditionFault::NotScalar {
            field: field.to_string(),
            found: v.type_name().to_string(),
        }),
        Some(v) => Ok(v),
    }
}

fn numeric_field(record: &Record, field: &str) -> Result<rust_decimal::Decimal, ConditionFault> {
    let v = lookup(record, field)?;
    v.coerce_decimal().ok_or_else(|| ConditionFault::NotNumeric {
        field: field.to_string(),
        found: describe(v),
    })
}

fn check(condition: &Condition, record: &Record) -> Result<bool, ConditionFault> {
    match condition {
        Condition::WithinTolerance {
            field,
            target,
            tolerance,
        } => {
            let v = numeric_field(record, field)?;
            Ok(numeric::within_tolerance(v, *target, *tolerance))
        }
        Condition::EqualsIgnoreCase { field, value } => {
            let v = lookup(record, field)?;
            // Every scalar value has a text rendering.
            let text = v.display_text().unwrap_or_default();
            Ok(text.trim().to_lowercase() == value.trim().to_lowercase())
        }
        Condition::IntEquals { field, value } => {
            let v = lookup(record, field)?;
            let i = v.coerce_int().ok_or_else(|| ConditionFault::NotInteger {
                field: field.clone(),
                found: describe(v),
            })?;
            Ok(i == *value)
        }
        Condition::BoolEquals { field, value } => {
            let v = lookup(record, field)?;
            let b = v.coerce_bool().ok_or_else(|| ConditionFault::NotBoolean {
                field: field.clone(),
                found: describe(v),
            })?;
            Ok(b == *value)
        }
        Condition::Compare { field, op, value } => {
            let v = numeric_field(record, field)?;
            Ok(numeric::compare(v, *op, *value))
        }
    }
}

/// Check a condition, keeping the reason when it cannot be decided.
pub fn try_evaluate(condition: &Condition, record: &Record) -> ConditionOutcome {
    match check(condition, record) {
        Ok(b) => from_bool(b),
        Err(fault) => ConditionOutcome::Faulted(fault),
    }
}

/// Check a condition. Faults count as not satisfied.
pub fn evaluate(condition: &Condition, record: &Record) -> bool {
    try_evaluate(condition, record).is_satisfied()
}
