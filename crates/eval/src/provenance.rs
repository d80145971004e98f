//! Evidence trail construction for rule evaluation.
//!
//! Each candidate and verification result carries the evidence showing
//! which conditions held, which did not, which could not be checked and
//! which record fields were read along the way.

use crate::condition::{ConditionFault, ConditionOutcome};

/// Per-rule record of how each condition fared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleEvidence {
    /// Indices of satisfied conditions.
    pub satisfied: Vec<usize>,
    /// Indices of conditions checked and found false.
    pub unsatisfied: Vec<usize>,
    /// Indices of conditions that could not be checked, with the reason.
    pub faulted: Vec<(usize, ConditionFault)>,
    /// Record fields read, in first-access order.
    pub fields_used: Vec<String>,
}

impl RuleEvidence {
    pub fn to_json(&self) -> serde_json::Value {
        let faulted: Vec<serde_json::Value> = self
            .faulted
            .iter()
            .map(|(i, fault)| serde_json::json!({ "index": i, "fault": fault.to_string() }))
            .collect();
        serde_json::json!({
            "satisfied": self.satisfied,
            "unsatisfied": self.unsatisfied,
            "faulted": faulted,
            "fields_used": self.fields_used,
        })
    }
}

/// Collector that accumulates condition outcomes while a rule is scored.
#[derive(Debug, Clone, Default)]
pub struct EvidenceCollector {
    evidence: RuleEvidence,
}

impl EvidenceCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a field access.
    pub fn record_field(&mut self, field: &str) {
        if !self.evidence.fields_used.iter().any(|f| f == field) {
            self.evidence.fields_used.push(field.to_string());
        }
    }

    /// Record the outcome of condition `index`.
    pub fn record_outcome(&mut self, index: usize, outcome: ConditionOutcome) {
        match outcome {
            ConditionOutcome::Satisfied => self.evidence.satisfied.push(index),
            ConditionOutcome::Unsatisfied => self.evidence.unsatisfied.push(index),
            ConditionOutcome::Faulted(fault) => self.evidence.faulted.push((index, fault)),
        }
    }

    pub fn matched(&self) -> usize {
        self.evidence.satisfied.len()
    }

    /// Finalize into a RuleEvidence.
    pub fn into_evidence(self) -> RuleEvidence {
        self.evidence
    }
}
