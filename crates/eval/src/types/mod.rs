//! Runtime types for the Carapace inference engine.
//!
//! These types are distinct from the interchange constructs. Bundles are
//! parsed and structurally checked by `carapace-interchange`, then
//! converted here into the representation the engines evaluate.

pub mod key;
pub mod knowledge;
pub mod rule;
pub mod values;

use std::fmt;

use carapace_interchange::InterchangeError;

pub use key::{
    infer_polarity, KeyGraph, KeyNode, KeyOption, OptionTarget, SpeciesCatalog, SpeciesProfile,
    TraitBinding,
};
pub use knowledge::KnowledgeBase;
pub use rule::{
    parse_condition, CompareOp, Condition, Rule, RuleSet, DEFAULT_THRESHOLD, DEFAULT_TOLERANCE,
};
pub use values::{Record, Value};

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

/// Errors raised while loading definitions or input records.
///
/// Evaluation itself never fails: a condition that cannot be checked
/// against a record counts as unsatisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// The bundle failed structural validation.
    Interchange(InterchangeError),
    /// A construct could not be converted to its runtime form.
    DeserializeError { message: String },
    /// A rule condition has an unknown kind or malformed arguments.
    InvalidCondition {
        rule_id: String,
        index: usize,
        message: String,
    },
    /// An input record is not a flat object of scalars.
    InvalidRecord { message: String },
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::Interchange(e) => write!(f, "invalid bundle: {}", e),
            EvalError::DeserializeError { message } => {
                write!(f, "deserialization error: {}", message)
            }
            EvalError::InvalidCondition {
                rule_id,
                index,
                message,
            } => {
                write!(
                    f,
                    "rule '{}' condition {}: {}",
                    rule_id, index, message
                )
            }
            EvalError::InvalidRecord { message } => {
                write!(f, "invalid record: {}", message)
            }
        }
    }
}

impl std::error::Error for EvalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EvalError::Interchange(e) => Some(e),
            _ => None,
        }
    }
}

impl From<InterchangeError> for EvalError {
    fn from(e: InterchangeError) -> Self {
        EvalError::Interchange(e)
    }
}
