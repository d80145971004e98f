//! Typed structs representing the Carapace definition bundle.
//!
//! Rule conditions and species trait values are kept as
//! `serde_json::Value` here. The evaluator owns their interpretation
//! (predicate kinds, numeric coercion), so this crate only checks the
//! structure around them.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Top-level definition bundle containing all constructs.
#[derive(Debug, Clone)]
pub struct InterchangeBundle {
    /// Bundle identifier.
    pub id: String,
    /// Bundle format version (e.g. "1.0").
    pub carapace: String,
    /// All recognised constructs, in document order.
    pub constructs: Vec<InterchangeConstruct>,
}

impl InterchangeBundle {
    pub fn rules(&self) -> impl Iterator<Item = &RuleConstruct> {
        self.constructs.iter().filter_map(|c| match c {
            InterchangeConstruct::Rule(r) => Some(r),
            _ => None,
        })
    }

    pub fn species(&self) -> impl Iterator<Item = &SpeciesConstruct> {
        self.constructs.iter().filter_map(|c| match c {
            InterchangeConstruct::Species(s) => Some(s),
            _ => None,
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &KeyConstruct> {
        self.constructs.iter().filter_map(|c| match c {
            InterchangeConstruct::Key(k) => Some(k),
            _ => None,
        })
    }

    pub fn key_nodes(&self) -> impl Iterator<Item = &KeyNodeConstruct> {
        self.constructs.iter().filter_map(|c| match c {
            InterchangeConstruct::KeyNode(n) => Some(n),
            _ => None,
        })
    }
}

/// A single construct from the bundle, dispatched by kind.
#[derive(Debug, Clone)]
pub enum InterchangeConstruct {
    Rule(RuleConstruct),
    Species(SpeciesConstruct),
    Key(KeyConstruct),
    KeyNode(KeyNodeConstruct),
}

// ── Rule ────────────────────────────────────────────────────────────

/// An identification rule: one hypothesis and the conditions supporting it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleConstruct {
    pub id: String,
    pub species: String,
    /// Tagged predicate objects, parsed by the evaluator.
    pub conditions: Vec<serde_json::Value>,
    #[serde(default)]
    pub justification: String,
    /// Minimum fraction of satisfied conditions. `None` means the evaluator default.
    #[serde(default)]
    pub threshold: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

// ── Species ─────────────────────────────────────────────────────────

/// A species record: trait columns for key scoring, free-text features
/// for the feature matcher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpeciesConstruct {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genus: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_name: Option<String>,
    #[serde(default)]
    pub traits: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub features: Vec<String>,
}

// ── Dichotomous key ─────────────────────────────────────────────────

/// Names the entry node of the bundle's dichotomous key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyConstruct {
    pub id: String,
    pub root: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// A question node of the dichotomous key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeyNodeConstruct {
    pub id: String,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Trait column this question correlates with, if any.
    #[serde(default, rename = "trait", skip_serializing_if = "Option::is_none")]
    pub trait_binding: Option<TraitBindingConstruct>,
    #[serde(default)]
    pub options: Vec<KeyOptionConstruct>,
}

/// Expected species trait values for a yes and a no answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraitBindingConstruct {
    pub column: String,
    pub yes: serde_json::Value,
    pub no: serde_json::Value,
}

/// One selectable answer of a key node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeyOptionConstruct {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<AnswerPolarity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Explicit polarity of a key option.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AnswerPolarity {
    Yes,
    No,
}
