//! Load-time structural checks.
//!
//! Malformed definitions are rejected here so the evaluator can assume
//! well-formed rules and an acyclic key with resolvable references.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;

use crate::deserialize::InterchangeError;
use crate::types::{InterchangeBundle, KeyNodeConstruct};

/// Run every structural check against a parsed bundle.
pub fn validate_bundle(bundle: &InterchangeBundle) -> Result<(), InterchangeError> {
    check_rules(bundle)?;
    check_unique("Species", bundle.species().map(|s| s.id.as_str()))?;
    check_key(bundle)
}

fn check_unique<'a>(
    kind: &str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<(), InterchangeError> {
    let mut seen = BTreeSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(InterchangeError::DuplicateId {
                kind: kind.to_string(),
                id: id.to_string(),
            });
        }
    }
    Ok(())
}

fn check_rules(bundle: &InterchangeBundle) -> Result<(), InterchangeError> {
    check_unique("Rule", bundle.rules().map(|r| r.id.as_str()))?;

    for rule in bundle.rules() {
        if rule.conditions.is_empty() {
            return Err(InterchangeError::EmptyRule {
                rule_id: rule.id.clone(),
            });
        }
        if let Some(t) = rule.threshold {
            if t < Decimal::ZERO || t > Decimal::ONE {
                return Err(InterchangeError::ThresholdOutOfRange {
                    rule_id: rule.id.clone(),
                    threshold: t.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn check_key(bundle: &InterchangeBundle) -> Result<(), InterchangeError> {
    check_unique("KeyNode", bundle.key_nodes().map(|n| n.id.as_str()))?;

    let keys: Vec<_> = bundle.keys().collect();
    if keys.len() > 1 {
        return Err(InterchangeError::InvalidBundle(format!(
            "expected at most one Key construct, found {}",
            keys.len()
        )));
    }

    let nodes: BTreeMap<&str, &KeyNodeConstruct> =
        bundle.key_nodes().map(|n| (n.id.as_str(), n)).collect();
    let species: BTreeSet<&str> = bundle.species().map(|s| s.id.as_str()).collect();

    let key = match keys.first() {
        Some(k) => *k,
        None if nodes.is_empty() => return Ok(()),
        None => {
            return Err(InterchangeError::InvalidBundle(
                "KeyNode constructs present but no Key names a root".to_string(),
            ))
        }
    };

    if !nodes.contains_key(key.root.as_str()) {
        return Err(InterchangeError::MissingRoot {
            key_id: key.id.clone(),
            root: key.root.clone(),
        });
    }

    for node in nodes.values() {
        if node.options.is_empty() {
            return Err(InterchangeError::EmptyNode {
                node_id: node.id.clone(),
            });
        }
        for (index, opt) in node.options.iter().enumerate() {
            match (&opt.next, &opt.species) {
                (Some(next), None) => {
                    if !nodes.contains_key(next.as_str()) {
                        return Err(InterchangeError::UnknownNode {
                            node_id: node.id.clone(),
                            index,
                            target: next.clone(),
                        });
                    }
                }
                (None, Some(sp)) => {
                    if !species.contains(sp.as_str()) {
                        return Err(InterchangeError::UnknownSpecies {
                            node_id: node.id.clone(),
                            index,
                            species_id: sp.clone(),
                        });
                    }
                }
                (Some(_), Some(_)) => {
                    return Err(InterchangeError::MalformedOption {
                        node_id: node.id.clone(),
                        index,
                        message: "option has both 'next' and 'species'".to_string(),
                    });
                }
                (None, None) => {
                    return Err(InterchangeError::MalformedOption {
                        node_id: node.id.clone(),
                        index,
                        message: "option has neither 'next' nor 'species'".to_string(),
                    });
                }
            }
        }
    }

    check_acyclic(&key.root, &nodes)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Depth-first walk from the root; a back edge to a node still on the
/// stack is a cycle.
fn check_acyclic(
    root: &str,
    nodes: &BTreeMap<&str, &KeyNodeConstruct>,
) -> Result<(), InterchangeError> {
    let mut marks: BTreeMap<&str, Mark> = BTreeMap::new();
    // (node id, index of the next option to explore)
    let mut stack: Vec<(&str, usize)> = vec![(root, 0)];
    marks.insert(root, Mark::Visiting);

    while let Some((node_id, next_opt)) = stack.pop() {
        let Some(node) = nodes.get(node_id) else {
            continue;
        };
        match node.options.get(next_opt) {
            None => {
                marks.insert(node_id, Mark::Done);
            }
            Some(opt) => {
                stack.push((node_id, next_opt + 1));
                if let Some(child) = opt.next.as_deref() {
                    match marks.get(child) {
                        Some(Mark::Visiting) => {
                            return Err(InterchangeError::CyclicKey {
                                node_id: child.to_string(),
                            });
                        }
                        Some(Mark::Done) => {}
                        None => {
                            marks.insert(child, Mark::Visiting);
                            stack.push((child, 0));
                        }
                    }
                }
            }
        }
    }
    Ok(())
}
