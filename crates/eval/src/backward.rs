//! Backward chaining: verify one species hypothesis against a record.

use rust_decimal::Decimal;

use crate::forward::score_rule;
use crate::numeric;
use crate::provenance::RuleEvidence;
use crate::types::{Record, RuleSet};

/// Verdict on a single species hypothesis.
///
/// When no rule proposes the species, `found` is false and every count
/// and score is zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub species: String,
    pub found: bool,
    pub verified: bool,
    /// Rounded to two decimals.
    pub score: Decimal,
    pub threshold: Decimal,
    pub matched: usize,
    pub total: usize,
    pub missing: usize,
    pub justification: String,
    pub message: String,
    pub rule_id: Option<String>,
    pub reference: Option<String>,
    pub link: Option<String>,
    pub evidence: RuleEvidence,
}

impl VerificationResult {
    fn not_found(species: &str) -> Self {
        let species = species.trim().to_string();
        VerificationResult {
            message: format!("No rule is defined for \"{}\".", species),
            species,
            found: false,
            verified: false,
            score: Decimal::ZERO,
            threshold: Decimal::ZERO,
            matched: 0,
            total: 0,
            missing: 0,
            justification: String::new(),
            rule_id: None,
            reference: None,
            link: None,
            evidence: RuleEvidence::default(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "species": self.species,
            "found": self.found,
            "verified": self.verified,
            "score": numeric::decimal_to_json(self.score),
            "threshold": numeric::decimal_to_json(self.threshold),
            "matched_count": self.matched,
            "total_count": self.total,
            "missing_count": self.missing,
            "justification": self.justification,
            "message": self.message,
            "rule_id": self.rule_id,
            "reference": self.reference,
            "link": self.link,
            "evidence": self.evidence.to_json(),
        })
    }
}

/// Verify that `record` supports `species`.
///
/// The rule is located by a linear, case-insensitive, whitespace-trimmed
/// scan of `rules`. The first matching rule wins.
pub fn verify(record: &Record, species: &str, rules: &RuleSet) -> VerificationResult {
    let Some(rule) = rules.find_by_species(species) else {
        tracing::debug!(species = species.trim(), "no rule for species");
        return VerificationResult::not_found(species);
    };

    let score = score_rule(rule, record);
    let verified = score.meets(rule.threshold);
    let missing = score.total - score.matched;
    let pct = numeric::percent(score.raw);
    let threshold_pct = numeric::percent(rule.threshold);

    let message = if verified {
        format!(
            "Hypothesis CONFIRMED: \"{}\" meets the threshold ({}% >= {}%). {} of {} conditions satisfied.",
            rule.species, pct, threshold_pct, score.matched, score.total
        )
    } else {
        format!(
            "Hypothesis REJECTED: \"{}\" does not meet the threshold ({}% < {}%). Only {} of {} conditions satisfied, {} missing.",
            rule.species, pct, threshold_pct, score.matched, score.total, missing
        )
    };

    tracing::debug!(rule = %rule.id, verified, matched = score.matched, total = score.total, "hypothesis checked");

    VerificationResult {
        species: rule.species.clone(),
        found: true,
        verified,
        score: numeric::published_score(score.raw),
        threshold: rule.threshold,
        matched: score.matched,
        total: score.total,
        missing,
        justification: rule.justification.clone(),
        message,
        rule_id: Some(rule.id.clone()),
        reference: rule.reference.clone(),
        link: rule.link.clone(),
        evidence: score.evidence,
    }
}
