//! Carapace inference engine: accepts a definition bundle and specimen
//! records, produces ranked identifications.
//!
//! Two reasoning strategies run over the bundle's rules: forward
//! chaining ranks every species a record supports, backward chaining
//! verifies a single hypothesis. Independently, a [`KeySession`] walks
//! the bundle's dichotomous key with a running per-species score.
//!
//! Every function here is synchronous and side-effect free apart from
//! the caller-owned session.

pub mod backward;
pub mod condition;
pub mod confidence;
pub mod features;
pub mod forward;
pub mod numeric;
pub mod provenance;
pub mod session;
pub mod types;

pub use backward::{verify, VerificationResult};
pub use condition::{ConditionFault, ConditionOutcome};
pub use confidence::ConfidencePolicy;
pub use features::{match_features, parse_feature_text, FeatureMatch, MatcherConfig};
pub use forward::{candidates_to_json, evaluate_all, Candidate};
pub use provenance::RuleEvidence;
pub use session::{
    HistoryEntry, Identification, KeyConfig, KeySession, KeyStep, RankedSpecies, SessionError,
    SessionState, TraitScoreMap,
};
pub use types::{
    Condition, EvalError, KeyGraph, KnowledgeBase, Record, Rule, RuleSet, SpeciesCatalog, Value,
};

/// Begin a key walk at the root of `key`.
pub fn start_session<'a>(key: &'a KeyGraph, catalog: &'a SpeciesCatalog) -> KeySession<'a> {
    KeySession::start(key, catalog)
}

/// Load a bundle and run forward chaining over a JSON record.
///
/// # Arguments
/// * `bundle` - Definition bundle (serde_json::Value)
/// * `record` - JSON object mapping trait names to scalar values
///
/// # Returns
/// * Candidates, highest score first, or an `EvalError` when the bundle
///   or the record is malformed
pub fn identify(
    bundle: &serde_json::Value,
    record: &serde_json::Value,
) -> Result<Vec<Candidate>, EvalError> {
    let kb = KnowledgeBase::from_interchange(bundle)?;
    let record = Record::from_json(record)?;
    Ok(evaluate_all(&record, &kb.rules))
}

/// Load a bundle and verify one species hypothesis against a JSON record.
pub fn verify_species(
    bundle: &serde_json::Value,
    record: &serde_json::Value,
    species: &str,
) -> Result<VerificationResult, EvalError> {
    let kb = KnowledgeBase::from_interchange(bundle)?;
    let record = Record::from_json(record)?;
    Ok(verify(&record, species, &kb.rules))
}
