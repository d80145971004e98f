//! Dichotomous key graph and the species catalog it resolves to.

use std::collections::BTreeMap;

use super::values::{Record, Value};

// ──────────────────────────────────────────────
// Species
// ──────────────────────────────────────────────

/// A known species with the trait columns the key scores against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeciesProfile {
    pub id: String,
    pub name: String,
    pub genus: Option<String>,
    pub family: Option<String>,
    pub common_name: Option<String>,
    pub traits: Record,
    pub features: Vec<String>,
}

impl SpeciesProfile {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        SpeciesProfile {
            id: id.into(),
            name: name.into(),
            genus: None,
            family: None,
            common_name: None,
            traits: Record::new(),
            features: Vec::new(),
        }
    }

    pub fn with_trait(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.traits.insert(column, value);
        self
    }
}

/// Species known to a key session, in definition order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeciesCatalog(pub Vec<SpeciesProfile>);

impl SpeciesCatalog {
    pub fn new(species: Vec<SpeciesProfile>) -> Self {
        SpeciesCatalog(species)
    }

    pub fn get(&self, id: &str) -> Option<&SpeciesProfile> {
        self.0.iter().find(|s| s.id == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SpeciesProfile> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ──────────────────────────────────────────────
// Key graph
// ──────────────────────────────────────────────

/// Where an option leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionTarget {
    Node(String),
    Species(String),
}

/// One answer of a key node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyOption {
    pub label: String,
    pub target: OptionTarget,
    /// Whether choosing this option answers the question with "yes".
    pub is_yes: bool,
    pub note: Option<String>,
}

impl KeyOption {
    /// Option whose polarity is inferred from its label.
    pub fn new(label: impl Into<String>, target: OptionTarget) -> Self {
        let label = label.into();
        let is_yes = infer_polarity(&label);
        KeyOption {
            label,
            target,
            is_yes,
            note: None,
        }
    }
}

/// Labels starting with SÍ, SI or YES (after trimming, any case) are yes-answers.
pub fn infer_polarity(label: &str) -> bool {
    let upper = label.trim().to_uppercase();
    ["SÍ", "SI", "YES"].iter().any(|p| upper.starts_with(p))
}

/// Correlates a question with a species trait column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraitBinding {
    pub column: String,
    pub yes: Value,
    pub no: Value,
}

impl TraitBinding {
    pub fn expected(&self, is_yes: bool) -> &Value {
        if is_yes {
            &self.yes
        } else {
            &self.no
        }
    }

    /// Whether `species` carries the expected trait value for this answer.
    /// Species without the column never match.
    pub fn supports(&self, species: &SpeciesProfile, is_yes: bool) -> bool {
        species
            .traits
            .get(&self.column)
            .map(|v| v.loosely_equals(self.expected(is_yes)))
            .unwrap_or(false)
    }
}

/// A question node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyNode {
    pub id: String,
    pub question: String,
    pub note: Option<String>,
    pub binding: Option<TraitBinding>,
    pub options: Vec<KeyOption>,
}

impl KeyNode {
    pub fn new(id: impl Into<String>, question: impl Into<String>, options: Vec<KeyOption>) -> Self {
        KeyNode {
            id: id.into(),
            question: question.into(),
            note: None,
            binding: None,
            options,
        }
    }

    pub fn with_binding(mut self, column: &str, yes: impl Into<Value>, no: impl Into<Value>) -> Self {
        self.binding = Some(TraitBinding {
            column: column.to_string(),
            yes: yes.into(),
            no: no.into(),
        });
        self
    }
}

/// Immutable, acyclic question graph with a designated root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyGraph {
    pub id: String,
    pub title: Option<String>,
    pub root: String,
    nodes: BTreeMap<String, KeyNode>,
}

impl KeyGraph {
    pub fn new(id: impl Into<String>, root: impl Into<String>, nodes: Vec<KeyNode>) -> Self {
        KeyGraph {
            id: id.into(),
            title: None,
            root: root.into(),
            nodes: nodes.into_iter().map(|n| (n.id.clone(), n)).collect(),
        }
    }

    pub fn node(&self, id: &str) -> Option<&KeyNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &KeyNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
