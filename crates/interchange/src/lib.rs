//! carapace-interchange: definition bundle types and loading.
//!
//! Provides typed structs for every bundle construct kind
//! (Rule, Species, Key, KeyNode) and a single `from_interchange()`
//! entry point that deserializes a `serde_json::Value` bundle into an
//! `InterchangeBundle` and rejects malformed definitions.
//!
//! The evaluator depends on this crate for the initial parse, then
//! converts the shared types to its own runtime representation.

pub mod deserialize;
pub mod types;
pub mod validate;

pub use deserialize::{from_interchange, parse_bundle, InterchangeError};
pub use types::*;
pub use validate::validate_bundle;
