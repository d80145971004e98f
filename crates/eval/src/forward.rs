//! Forward chaining: evaluate every rule against one record.
//!
//! Rules are independent. Each is scored as the fraction of its
//! conditions the record satisfies; rules meeting their own threshold
//! become candidates, ranked by published score. Definition order breaks
//! ties.

use rust_decimal::Decimal;

use crate::condition::{try_evaluate, ConditionOutcome};
use crate::numeric;
use crate::provenance::{EvidenceCollector, RuleEvidence};
use crate::types::{Record, Rule, RuleSet};

/// Outcome of scoring one rule against one record.
#[derive(Debug, Clone)]
pub(crate) struct RuleScore {
    pub matched: usize,
    pub total: usize,
    /// Unrounded `matched / total`. Threshold checks use this value.
    pub raw: Decimal,
    pub evidence: RuleEvidence,
}

impl RuleScore {
    pub fn meets(&self, threshold: Decimal) -> bool {
        self.raw >= threshold
    }
}

/// Score a rule. Faulted conditions count as unsatisfied.
pub(crate) fn score_rule(rule: &Rule, record: &Record) -> RuleScore {
    let mut collector = EvidenceCollector::new();

    for (index, condition) in rule.conditions.iter().enumerate() {
        collector.record_field(condition.field());
        let outcome = try_evaluate(condition, record);
        if let ConditionOutcome::Faulted(fault) = &outcome {
            tracing::debug!(rule = %rule.id, index, %fault, "condition faulted");
        }
        collector.record_outcome(index, outcome);
    }

    let total = rule.conditions.len();
    let matched = collector.matched();
    RuleScore {
        matched,
        total,
        raw: numeric::fraction(matched, total),
        evidence: collector.into_evidence(),
    }
}

/// A rule whose hypothesis the record supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub rule_id: String,
    pub species: String,
    /// Rounded to two decimals.
    pub score: Decimal,
    pub matched: usize,
    pub total: usize,
    pub justification: String,
    pub reference: Option<String>,
    pub link: Option<String>,
    pub evidence: RuleEvidence,
}

impl Candidate {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "rule_id": self.rule_id,
            "species": self.species,
            "score": numeric::decimal_to_json(self.score),
            "matched_count": self.matched,
            "total_count": self.total,
            "justification": self.justification,
            "reference": self.reference,
            "link": self.link,
            "evidence": self.evidence.to_json(),
        })
    }
}

/// Evaluate every rule against `record` and return the candidates,
/// highest score first.
pub fn evaluate_all(record: &Record, rules: &RuleSet) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = rules
        .iter()
        .filter_map(|rule| {
            let score = score_rule(rule, record);
            tracing::debug!(
                rule = %rule.id,
                matched = score.matched,
                total = score.total,
                "rule scored"
            );
            if !score.meets(rule.threshold) {
                return None;
            }
            Some(Candidate {
                rule_id: rule.id.clone(),
                species: rule.species.clone(),
                score: numeric::published_score(score.raw),
                matched: score.matched,
                total: score.total,
                justification: rule.justification.clone(),
                reference: rule.reference.clone(),
                link: rule.link.clone(),
                evidence: score.evidence,
            })
        })
        .collect();

    // sort_by is stable: equal scores keep definition order.
    candidates.sort_by(|a, b| b.score.cmp(&a.score));
    candidates
}

/// Serialize a candidate list for output.
pub fn candidates_to_json(candidates: &[Candidate]) -> serde_json::Value {
    let list: Vec<serde_json::Value> = candidates.iter().map(Candidate::to_json).collect();
    serde_json::json!({ "candidates": list })
}
