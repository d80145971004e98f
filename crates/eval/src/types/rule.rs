//! Identification rules and their predicates.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::EvalError;

/// Acceptance threshold used when a rule declares none.
pub const DEFAULT_THRESHOLD: Decimal = Decimal::from_parts(6, 0, 0, false, 1);

/// Relative tolerance used by `within_tolerance` when none is given (±12%).
pub const DEFAULT_TOLERANCE: Decimal = Decimal::from_parts(12, 0, 0, false, 2);

fn default_tolerance() -> Decimal {
    DEFAULT_TOLERANCE
}

/// Numeric comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Neq,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Eq => "=",
            CompareOp::Neq => "!=",
        }
    }
}

/// A closed, named test over one record field.
///
/// Conditions are plain data so they can be loaded from a bundle and
/// evaluated without executing anything from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    /// Numeric field within `target ± tolerance` (relative, inclusive).
    WithinTolerance {
        field: String,
        target: Decimal,
        #[serde(default = "default_tolerance")]
        tolerance: Decimal,
    },
    /// Field rendered as text equals `value`, ignoring case.
    EqualsIgnoreCase { field: String, value: String },
    /// Field coerced to an integer equals `value`.
    IntEquals { field: String, value: i64 },
    /// Field coerced to a boolean equals `value`.
    BoolEquals { field: String, value: bool },
    /// Numeric comparison `field <op> value`.
    Compare {
        field: String,
        op: CompareOp,
        value: Decimal,
    },
}

impl Condition {
    /// The record field this condition reads.
    pub fn field(&self) -> &str {
        match self {
            Condition::WithinTolerance { field, .. }
            | Condition::EqualsIgnoreCase { field, .. }
            | Condition::IntEquals { field, .. }
            | Condition::BoolEquals { field, .. }
            | Condition::Compare { field, .. } => field,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::WithinTolerance {
                field,
                target,
                tolerance,
            } => write!(
                f,
                "{} ≈ {} (±{}%)",
                field,
                target,
                crate::numeric::percent(*tolerance)
            ),
            Condition::EqualsIgnoreCase { field, value } => write!(f, "{} = '{}'", field, value),
            Condition::IntEquals { field, value } => write!(f, "{} = {}", field, value),
            Condition::BoolEquals { field, value } => write!(f, "{} is {}", field, value),
            Condition::Compare { field, op, value } => {
                write!(f, "{} {} {}", field, op.symbol(), value)
            }
        }
    }
}

/// Parse a tagged condition object from a bundle.
pub fn parse_condition(
    v: &serde_json::Value,
    rule_id: &str,
    index: usize,
) -> Result<Condition, EvalError> {
    serde_json::from_value(v.clone()).map_err(|e| EvalError::InvalidCondition {
        rule_id: rule_id.to_string(),
        index,
        message: e.to_string(),
    })
}

/// One identification hypothesis and the evidence that supports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub id: String,
    pub species: String,
    pub conditions: Vec<Condition>,
    pub justification: String,
    /// Fraction of conditions in [0, 1] that must hold.
    pub threshold: Decimal,
    pub reference: Option<String>,
    pub link: Option<String>,
}

impl Rule {
    pub fn new(id: impl Into<String>, species: impl Into<String>, conditions: Vec<Condition>) -> Self {
        Rule {
            id: id.into(),
            species: species.into(),
            conditions,
            justification: String::new(),
            threshold: DEFAULT_THRESHOLD,
            reference: None,
            link: None,
        }
    }

    pub fn with_threshold(mut self, threshold: Decimal) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_justification(mut self, justification: impl Into<String>) -> Self {
        self.justification = justification.into();
        self
    }

    /// Case-insensitive, whitespace-trimmed comparison against the
    /// rule's species name.
    pub fn proposes(&self, species: &str) -> bool {
        normalize_species(&self.species) == normalize_species(species)
    }
}

pub(crate) fn normalize_species(name: &str) -> String {
    name.trim().to_lowercase()
}

/// An ordered collection of rules. Definition order is the tie-break
/// for equal forward-chaining scores.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet(pub Vec<Rule>);

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        RuleSet(rules)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First rule proposing `species`, by linear scan.
    pub fn find_by_species(&self, species: &str) -> Option<&Rule> {
        let wanted = normalize_species(species);
        self.0
            .iter()
            .find(|r| normalize_species(&r.species) == wanted)
    }
}
