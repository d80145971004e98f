//! Deserialization from definition bundles into typed structs.
//!
//! The main entry point is [`from_interchange`], which takes a
//! `&serde_json::Value`, produces an [`InterchangeBundle`] and runs the
//! load-time checks in [`crate::validate`].

use crate::types::*;

/// Errors raised while loading a definition bundle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InterchangeError {
    /// The bundle is missing a required top-level field.
    #[error("bundle missing required field: '{field}'")]
    MissingField { field: String },

    /// A construct could not be deserialized.
    #[error("{kind} '{id}': {message}")]
    ConstructError {
        kind: String,
        id: String,
        message: String,
    },

    /// Two constructs of the same kind share an id.
    #[error("duplicate {kind} id '{id}'")]
    DuplicateId { kind: String, id: String },

    /// A rule declares no conditions.
    #[error("rule '{rule_id}' has no conditions")]
    EmptyRule { rule_id: String },

    /// A rule threshold lies outside [0, 1].
    #[error("rule '{rule_id}' threshold {threshold} is outside [0, 1]")]
    ThresholdOutOfRange { rule_id: String, threshold: String },

    /// A key node has no options.
    #[error("key node '{node_id}' has no options")]
    EmptyNode { node_id: String },

    /// An option must lead to exactly one of a node or a species.
    #[error("key node '{node_id}' option {index}: {message}")]
    MalformedOption {
        node_id: String,
        index: usize,
        message: String,
    },

    /// An option references a node that does not exist.
    #[error("key node '{node_id}' option {index} references unknown node '{target}'")]
    UnknownNode {
        node_id: String,
        index: usize,
        target: String,
    },

    /// An option references a species that does not exist.
    #[error("key node '{node_id}' option {index} references unknown species '{species_id}'")]
    UnknownSpecies {
        node_id: String,
        index: usize,
        species_id: String,
    },

    /// The key root does not name an existing node.
    #[error("key '{key_id}' root '{root}' is not a key node")]
    MissingRoot { key_id: String, root: String },

    /// The graph reachable from the root contains a cycle.
    #[error("dichotomous key contains a cycle through node '{node_id}'")]
    CyclicKey { node_id: String },

    /// The bundle structure is invalid.
    #[error("invalid bundle: {0}")]
    InvalidBundle(String),
}

/// Deserialize and validate a definition bundle.
///
/// Walks the `constructs` array and dispatches on the `kind` field.
/// Unknown construct kinds are skipped for forward compatibility.
pub fn from_interchange(bundle: &serde_json::Value) -> Result<InterchangeBundle, InterchangeError> {
    let parsed = parse_bundle(bundle)?;
    crate::validate::validate_bundle(&parsed)?;
    Ok(parsed)
}

/// Deserialize a bundle without running the load-time checks.
pub fn parse_bundle(bundle: &serde_json::Value) -> Result<InterchangeBundle, InterchangeError> {
    let id = bundle
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| InterchangeError::MissingField {
            field: "id".to_string(),
        })?
        .to_string();

    let carapace = bundle
        .get("carapace")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    let constructs_arr = bundle
        .get("constructs")
        .and_then(|c| c.as_array())
        .ok_or_else(|| InterchangeError::MissingField {
            field: "constructs".to_string(),
        })?;

    let mut constructs = Vec::with_capacity(constructs_arr.len());

    for obj in constructs_arr {
        let kind = obj.get("kind").and_then(|k| k.as_str()).unwrap_or("");

        let construct = match kind {
            "Rule" => Some(InterchangeConstruct::Rule(parse_construct(obj, kind)?)),
            "Species" => Some(InterchangeConstruct::Species(parse_construct(obj, kind)?)),
            "Key" => Some(InterchangeConstruct::Key(parse_construct(obj, kind)?)),
            "KeyNode" => Some(InterchangeConstruct::KeyNode(parse_construct(obj, kind)?)),
            _ => None,
        };

        if let Some(c) = construct {
            constructs.push(c);
        }
    }

    Ok(InterchangeBundle {
        id,
        carapace,
        constructs,
    })
}

fn parse_construct<T>(obj: &serde_json::Value, kind: &str) -> Result<T, InterchangeError>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_value(obj.clone()).map_err(|e| InterchangeError::ConstructError {
        kind: kind.to_string(),
        id: obj
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or("?")
            .to_string(),
        message: e.to_string(),
    })
}
