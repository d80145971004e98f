//! Conversion from interchange constructs to runtime definitions.

use carapace_interchange::{
    AnswerPolarity, InterchangeBundle, KeyNodeConstruct, RuleConstruct, SpeciesConstruct,
};

use super::key::{
    infer_polarity, KeyGraph, KeyNode, KeyOption, OptionTarget, SpeciesCatalog, SpeciesProfile,
    TraitBinding,
};
use super::rule::{parse_condition, Rule, RuleSet, DEFAULT_THRESHOLD};
use super::values::{Record, Value};
use super::EvalError;

/// Everything a bundle defines, ready for evaluation.
///
/// Immutable after load; safe to share across threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeBase {
    pub id: String,
    pub rules: RuleSet,
    pub catalog: SpeciesCatalog,
    pub key: Option<KeyGraph>,
}

impl KnowledgeBase {
    /// Load and validate a bundle, then convert it.
    pub fn from_interchange(bundle: &serde_json::Value) -> Result<KnowledgeBase, EvalError> {
        let parsed = carapace_interchange::from_interchange(bundle)?;
        Self::from_bundle(&parsed)
    }

    /// Convert an already-validated bundle.
    pub fn from_bundle(bundle: &InterchangeBundle) -> Result<KnowledgeBase, EvalError> {
        let rules = bundle
            .rules()
            .map(convert_rule)
            .collect::<Result<Vec<_>, _>>()?;

        let catalog = bundle
            .species()
            .map(convert_species)
            .collect::<Result<Vec<_>, _>>()?;

        let key = match bundle.keys().next() {
            Some(k) => {
                let nodes = bundle
                    .key_nodes()
                    .map(convert_node)
                    .collect::<Result<Vec<_>, _>>()?;
                let mut graph = KeyGraph::new(k.id.clone(), k.root.clone(), nodes);
                graph.title = k.title.clone();
                Some(graph)
            }
            None => None,
        };

        Ok(KnowledgeBase {
            id: bundle.id.clone(),
            rules: RuleSet::new(rules),
            catalog: SpeciesCatalog::new(catalog),
            key,
        })
    }
}

fn convert_rule(r: &RuleConstruct) -> Result<Rule, EvalError> {
    let conditions = r
        .conditions
        .iter()
        .enumerate()
        .map(|(i, c)| parse_condition(c, &r.id, i))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Rule {
        id: r.id.clone(),
        species: r.species.clone(),
        conditions,
        justification: r.justification.clone(),
        threshold: r.threshold.unwrap_or(DEFAULT_THRESHOLD),
        reference: r.reference.clone(),
        link: r.link.clone(),
    })
}

fn convert_species(s: &SpeciesConstruct) -> Result<SpeciesProfile, EvalError> {
    let mut traits = Record::new();
    for (column, raw) in &s.traits {
        let value = Value::from_json(raw).map_err(|e| EvalError::DeserializeError {
            message: format!("species '{}' trait '{}': {}", s.id, column, e),
        })?;
        traits.insert(column.clone(), value);
    }

    Ok(SpeciesProfile {
        id: s.id.clone(),
        name: s.name.clone(),
        genus: s.genus.clone(),
        family: s.family.clone(),
        common_name: s.common_name.clone(),
        traits,
        features: s.features.clone(),
    })
}

fn convert_node(n: &KeyNodeConstruct) -> Result<KeyNode, EvalError> {
    let binding = match &n.trait_binding {
        Some(b) => {
            let convert = |raw: &serde_json::Value| {
                Value::from_json(raw).map_err(|e| EvalError::DeserializeError {
                    message: format!("key node '{}' trait '{}': {}", n.id, b.column, e),
                })
            };
            Some(TraitBinding {
                column: b.column.clone(),
                yes: convert(&b.yes)?,
                no: convert(&b.no)?,
            })
        }
        None => None,
    };

    let mut options = Vec::with_capacity(n.options.len());
    for (index, o) in n.options.iter().enumerate() {
        let target = match (&o.next, &o.species) {
            (Some(next), None) => OptionTarget::Node(next.clone()),
            (None, Some(species)) => OptionTarget::Species(species.clone()),
            _ => {
                return Err(EvalError::DeserializeError {
                    message: format!(
                        "key node '{}' option {} must lead to exactly one of a node or a species",
                        n.id, index
                    ),
                })
            }
        };
        let is_yes = match o.answer {
            Some(AnswerPolarity::Yes) => true,
            Some(AnswerPolarity::No) => false,
            None => infer_polarity(&o.label),
        };
        options.push(KeyOption {
            label: o.label.clone(),
            target,
            is_yes,
            note: o.note.clone(),
        });
    }

    Ok(KeyNode {
        id: n.id.clone(),
        question: n.question.clone(),
        note: n.note.clone(),
        binding,
        options,
    })
}
