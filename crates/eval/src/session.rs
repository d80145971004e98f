//! Dichotomous key traversal with running per-species scores.
//!
//! A [`KeySession`] walks a [`KeyGraph`] one answer at a time. Questions
//! bound to a trait column award one point to every species whose stored
//! value matches the answer given; unbound questions only navigate. The
//! history stack records each answer so undo can reverse exactly the
//! delta it applied, and replaying the history from zero always
//! reproduces the live scores.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::confidence::{confidence, ConfidencePolicy};
use crate::numeric;
use crate::types::{KeyGraph, KeyNode, OptionTarget, SpeciesCatalog};

/// Species id -> accumulated score.
pub type TraitScoreMap = BTreeMap<String, i64>;

/// Number of ranked species exposed by default.
pub const DEFAULT_TOP_N: usize = 3;

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

/// Lookup misses while driving a session. A failed call leaves the
/// session untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("species '{species_id}' already identified; undo or reset to continue")]
    Terminal { species_id: String },

    #[error("node '{node_id}' has no option {index} (options: {available})")]
    NoSuchOption {
        node_id: String,
        index: usize,
        available: usize,
    },

    #[error("key node '{node_id}' does not exist")]
    UnknownNode { node_id: String },

    #[error("species '{species_id}' is not in the catalog")]
    UnknownSpecies { species_id: String },
}

// ──────────────────────────────────────────────
// Session state
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Active { node_id: String },
    Terminal { species_id: String },
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Terminal { .. })
    }
}

/// One answer given during a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub node_id: String,
    pub option_index: usize,
    pub is_yes: bool,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedSpecies {
    pub species_id: String,
    pub name: String,
    pub score: i64,
    /// Percentage in [0, 100].
    pub confidence: Decimal,
}

/// The species a leaf resolved to, with its floored confidence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identification {
    pub species_id: String,
    pub name: String,
    pub genus: Option<String>,
    pub family: Option<String>,
    pub common_name: Option<String>,
    pub score: i64,
    pub confidence: Decimal,
    pub features: Vec<String>,
    /// Note on the option that led to the leaf.
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptOption {
    pub label: String,
    pub note: Option<String>,
}

/// The question awaiting an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub node_id: String,
    pub question: String,
    pub note: Option<String>,
    pub options: Vec<PromptOption>,
}

impl Prompt {
    fn from_node(node: &KeyNode) -> Self {
        Prompt {
            node_id: node.id.clone(),
            question: node.question.clone(),
            note: node.note.clone(),
            options: node
                .options
                .iter()
                .map(|o| PromptOption {
                    label: o.label.clone(),
                    note: o.note.clone(),
                })
                .collect(),
        }
    }
}

/// Snapshot returned after every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStep {
    pub state: SessionState,
    pub steps_taken: usize,
    pub prompt: Option<Prompt>,
    /// Top-N ranking.
    pub ranked: Vec<RankedSpecies>,
    pub identification: Option<Identification>,
}

impl KeyStep {
    pub fn to_json(&self) -> serde_json::Value {
        let state = match &self.state {
            SessionState::Active { node_id } => {
                serde_json::json!({ "status": "active", "node_id": node_id })
            }
            SessionState::Terminal { species_id } => {
                serde_json::json!({ "status": "terminal", "species_id": species_id })
            }
        };
        let prompt = self.prompt.as_ref().map(|p| {
            let options: Vec<serde_json::Value> = p
                .options
                .iter()
                .enumerate()
                .map(|(i, o)| serde_json::json!({ "number": i + 1, "label": o.label, "note": o.note }))
                .collect();
            serde_json::json!({
                "node_id": p.node_id,
                "question": p.question,
                "note": p.note,
                "options": options,
            })
        });
        let ranked: Vec<serde_json::Value> = self
            .ranked
            .iter()
            .map(|r| {
                serde_json::json!({
                    "species_id": r.species_id,
                    "name": r.name,
                    "score": r.score,
                    "confidence": numeric::decimal_to_json(r.confidence),
                })
            })
            .collect();
        let identification = self.identification.as_ref().map(|i| {
            serde_json::json!({
                "species_id": i.species_id,
                "name": i.name,
                "genus": i.genus,
                "family": i.family,
                "common_name": i.common_name,
                "score": i.score,
                "confidence": numeric::decimal_to_json(i.confidence),
                "features": i.features,
                "note": i.note,
            })
        });
        serde_json::json!({
            "state": state,
            "steps_taken": self.steps_taken,
            "prompt": prompt,
            "ranked": ranked,
            "identification": identification,
        })
    }
}

/// Tunables for a key session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyConfig {
    pub confidence: ConfidencePolicy,
    pub top_n: usize,
}

impl Default for KeyConfig {
    fn default() -> Self {
        KeyConfig {
            confidence: ConfidencePolicy::default(),
            top_n: DEFAULT_TOP_N,
        }
    }
}

// ──────────────────────────────────────────────
// Session
// ──────────────────────────────────────────────

/// One caller-owned walk through a key.
#[derive(Debug, Clone)]
pub struct KeySession<'a> {
    key: &'a KeyGraph,
    catalog: &'a SpeciesCatalog,
    config: KeyConfig,
    state: SessionState,
    scores: TraitScoreMap,
    history: Vec<HistoryEntry>,
    /// Note of the option that reached the current leaf.
    leaf_note: Option<String>,
}

impl<'a> KeySession<'a> {
    pub fn start(key: &'a KeyGraph, catalog: &'a SpeciesCatalog) -> Self {
        Self::with_config(key, catalog, KeyConfig::default())
    }

    pub fn with_config(key: &'a KeyGraph, catalog: &'a SpeciesCatalog, config: KeyConfig) -> Self {
        KeySession {
            key,
            catalog,
            config,
            state: SessionState::Active {
                node_id: key.root.clone(),
            },
            scores: zeroed(catalog),
            history: Vec::new(),
            leaf_note: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn scores(&self) -> &TraitScoreMap {
        &self.scores
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn steps_taken(&self) -> usize {
        self.history.len()
    }

    /// The node awaiting an answer, if the session is active.
    pub fn current_node(&self) -> Option<&'a KeyNode> {
        match &self.state {
            SessionState::Active { node_id } => self.key.node(node_id),
            SessionState::Terminal { .. } => None,
        }
    }

    /// Answer the current question with option `option_index` (0-based).
    pub fn answer(&mut self, option_index: usize) -> Result<KeyStep, SessionError> {
        let node_id = match &self.state {
            SessionState::Active { node_id } => node_id.clone(),
            SessionState::Terminal { species_id } => {
                return Err(SessionError::Terminal {
                    species_id: species_id.clone(),
                })
            }
        };
        let node = self
            .key
            .node(&node_id)
            .ok_or_else(|| SessionError::UnknownNode {
                node_id: node_id.clone(),
            })?;
        let option = node
            .options
            .get(option_index)
            .ok_or_else(|| SessionError::NoSuchOption {
                node_id: node_id.clone(),
                index: option_index,
                available: node.options.len(),
            })?;

        // Resolve the target before touching any state.
        let next_state = match &option.target {
            OptionTarget::Node(next) => {
                if self.key.node(next).is_none() {
                    return Err(SessionError::UnknownNode {
                        node_id: next.clone(),
                    });
                }
                SessionState::Active {
                    node_id: next.clone(),
                }
            }
            OptionTarget::Species(species_id) => {
                if self.catalog.get(species_id).is_none() {
                    return Err(SessionError::UnknownSpecies {
                        species_id: species_id.clone(),
                    });
                }
                SessionState::Terminal {
                    species_id: species_id.clone(),
                }
            }
        };

        apply_delta(self.catalog, node, option.is_yes, 1, &mut self.scores);
        self.history.push(HistoryEntry {
            node_id: node_id.clone(),
            option_index,
            is_yes: option.is_yes,
            label: option.label.clone(),
        });
        self.leaf_note = match next_state {
            SessionState::Terminal { .. } => option.note.clone(),
            SessionState::Active { .. } => None,
        };

        tracing::info!(
            node = %node_id,
            option = option_index,
            yes = option.is_yes,
            next = ?next_state,
            "key answered"
        );
        self.state = next_state;
        Ok(self.step())
    }

    /// Take back the last answer and return to the node where it was given.
    /// With no history this is a no-op at the root.
    pub fn undo(&mut self) -> KeyStep {
        if let Some(entry) = self.history.pop() {
            if let Some(node) = self.key.node(&entry.node_id) {
                apply_delta(self.catalog, node, entry.is_yes, -1, &mut self.scores);
            }
            tracing::info!(node = %entry.node_id, "key answer undone");
            self.state = SessionState::Active {
                node_id: entry.node_id,
            };
            self.leaf_note = None;
        }
        self.step()
    }

    /// Clear history and scores and return to the root.
    pub fn reset(&mut self) -> KeyStep {
        self.history.clear();
        self.scores = zeroed(self.catalog);
        self.leaf_note = None;
        self.state = SessionState::Active {
            node_id: self.key.root.clone(),
        };
        tracing::info!(root = %self.key.root, "key session reset");
        self.step()
    }

    /// Recompute the score map from the history alone.
    pub fn replay_scores(&self) -> TraitScoreMap {
        let mut scores = zeroed(self.catalog);
        for entry in &self.history {
            if let Some(node) = self.key.node(&entry.node_id) {
                apply_delta(self.catalog, node, entry.is_yes, 1, &mut scores);
            }
        }
        scores
    }

    pub fn confidence(&self, species_id: &str) -> Decimal {
        let score = self.scores.get(species_id).copied().unwrap_or(0);
        confidence(score, self.steps_taken())
    }

    /// Every catalog species, best first. Ties break on name
    /// (case-insensitive), then id.
    pub fn ranked(&self) -> Vec<RankedSpecies> {
        let steps = self.steps_taken();
        let mut ranked: Vec<RankedSpecies> = self
            .catalog
            .iter()
            .map(|s| {
                let score = self.scores.get(&s.id).copied().unwrap_or(0);
                RankedSpecies {
                    species_id: s.id.clone(),
                    name: s.name.clone(),
                    score,
                    confidence: confidence(score, steps),
                }
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
                .then_with(|| a.species_id.cmp(&b.species_id))
        });
        ranked
    }

    pub fn top(&self, n: usize) -> Vec<RankedSpecies> {
        let mut ranked = self.ranked();
        ranked.truncate(n);
        ranked
    }

    /// The identified species once a leaf has been reached.
    pub fn identification(&self) -> Option<Identification> {
        let SessionState::Terminal { species_id } = &self.state else {
            return None;
        };
        let species = self.catalog.get(species_id)?;
        let score = self.scores.get(species_id).copied().unwrap_or(0);
        Some(Identification {
            species_id: species.id.clone(),
            name: species.name.clone(),
            genus: species.genus.clone(),
            family: species.family.clone(),
            common_name: species.common_name.clone(),
            score,
            confidence: self
                .config
                .confidence
                .leaf_confidence(score, self.steps_taken()),
            features: species.features.clone(),
            note: self.leaf_note.clone(),
        })
    }

    /// Snapshot of the current state.
    pub fn step(&self) -> KeyStep {
        KeyStep {
            state: self.state.clone(),
            steps_taken: self.steps_taken(),
            prompt: self.current_node().map(Prompt::from_node),
            ranked: self.top(self.config.top_n),
            identification: self.identification(),
        }
    }
}

fn zeroed(catalog: &SpeciesCatalog) -> TraitScoreMap {
    catalog.iter().map(|s| (s.id.clone(), 0)).collect()
}

/// Add `delta` to every species supporting the answer given at `node`.
fn apply_delta(
    catalog: &SpeciesCatalog,
    node: &KeyNode,
    is_yes: bool,
    delta: i64,
    scores: &mut TraitScoreMap,
) {
    let Some(binding) = &node.binding else {
        return;
    };
    for species in catalog.iter().filter(|s| binding.supports(s, is_yes)) {
        *scores.entry(species.id.clone()).or_insert(0) += delta;
        tracing::debug!(node = %node.id, species = %species.id, delta, "score adjusted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{KeyOption, SpeciesProfile};

    // 1: lines?  yes -> 2, no -> species c
    // 2: spines? yes -> species a, no -> species b
    fn fixture() -> (KeyGraph, SpeciesCatalog) {
        let key = KeyGraph::new(
            "k",
            "1",
            vec![
                KeyNode::new(
                    "1",
                    "Carapace with transverse lines?",
                    vec![
                        KeyOption::new("SÍ", OptionTarget::Node("2".into())),
                        KeyOption::new("NO", OptionTarget::Species("c".into())),
                    ],
                )
                .with_binding("lines", 1i64, 0i64),
                KeyNode::new(
                    "2",
                    "Posterior spines?",
                    vec![
                        KeyOption::new("SÍ", OptionTarget::Species("a".into())),
                        KeyOption::new("NO", OptionTarget::Species("b".into())),
                        KeyOption::new("NO (broken)", OptionTarget::Node("missing".into())),
                    ],
                )
                .with_binding("spines", 1i64, 0i64),
            ],
        );
        let catalog = SpeciesCatalog::new(vec![
            SpeciesProfile::new("a", "Munida alpha")
                .with_trait("lines", 1i64)
                .with_trait("spines", 1i64),
            SpeciesProfile::new("b", "Munida beta")
                .with_trait("lines", 1i64)
                .with_trait("spines", 0i64),
            SpeciesProfile::new("c", "Munidopsis gamma").with_trait("lines", 0i64),
        ]);
        (key, catalog)
    }

    #[test]
    fn starts_at_root_with_zero_scores() {
        let (key, catalog) = fixture();
        let session = KeySession::start(&key, &catalog);
        assert_eq!(
            session.state(),
            &SessionState::Active {
                node_id: "1".into()
            }
        );
        assert!(session.scores().values().all(|s| *s == 0));
        assert_eq!(session.scores().len(), 3);
        assert_eq!(session.confidence("a"), Decimal::ZERO);
    }

    #[test]
    fn bound_answer_scores_matching_species() {
        let (key, catalog) = fixture();
        let mut session = KeySession::start(&key, &catalog);
        let step = session.answer(0).unwrap();
        assert_eq!(step.state, SessionState::Active { node_id: "2".into() });
        assert_eq!(session.scores()["a"], 1);
        assert_eq!(session.scores()["b"], 1);
        assert_eq!(session.scores()["c"], 0);
        assert_eq!(step.prompt.unwrap().question, "Posterior spines?");
        assert_eq!(step.ranked.len(), 3);
        assert_eq!(step.ranked[0].name, "Munida alpha");
        assert_eq!(step.ranked[0].confidence, Decimal::ONE_HUNDRED);
    }

    #[test]
    fn undo_restores_scores_and_node() {
        let (key, catalog) = fixture();
        let mut session = KeySession::start(&key, &catalog);
        session.answer(0).unwrap();
        let before = session.scores().clone();
        session.answer(1).unwrap();
        assert!(session.state().is_terminal());

        let step = session.undo();
        assert_eq!(session.scores(), &before);
        assert_eq!(step.state, SessionState::Active { node_id: "2".into() });
        assert!(step.identification.is_none());
    }

    #[test]
    fn undo_with_empty_history_stays_at_root() {
        let (key, catalog) = fixture();
        let mut session = KeySession::start(&key, &catalog);
        let step = session.undo();
        assert_eq!(step.state, SessionState::Active { node_id: "1".into() });
        assert_eq!(step.steps_taken, 0);
    }

    #[test]
    fn leaf_identification_is_floored() {
        let (key, catalog) = fixture();
        let mut session = KeySession::start(&key, &catalog);
        session.answer(0).unwrap();
        let step = session.answer(1).unwrap();
        let id = step.identification.unwrap();
        assert_eq!(id.species_id, "b");
        // b matched "lines" and "spines = 0": 2 of 2.
        assert_eq!(id.score, 2);
        assert_eq!(id.confidence, Decimal::ONE_HUNDRED);

        session.reset();
        session.answer(1).unwrap();
        let id = session.identification().unwrap();
        assert_eq!(id.species_id, "c");
        assert_eq!(id.confidence, Decimal::ONE_HUNDRED);

        session.reset();
        session.answer(0).unwrap();
        session.answer(0).unwrap();
        // b did not get the spines point; a reached the leaf with 2/2.
        assert_eq!(session.identification().unwrap().species_id, "a");
    }

    #[test]
    fn leaf_floor_applies_to_low_scores() {
        let key = KeyGraph::new(
            "k",
            "1",
            vec![KeyNode::new(
                "1",
                "Q?",
                vec![KeyOption::new("SÍ", OptionTarget::Species("x".into()))],
            )
            .with_binding("flag", 1i64, 0i64)],
        );
        let catalog = SpeciesCatalog::new(vec![
            SpeciesProfile::new("x", "Xanthid").with_trait("flag", 0i64)
        ]);
        let mut session = KeySession::start(&key, &catalog);
        session.answer(0).unwrap();
        let id = session.identification().unwrap();
        assert_eq!(id.score, 0);
        assert_eq!(id.confidence, Decimal::from(80));
    }

    #[test]
    fn failed_answers_leave_session_untouched() {
        let (key, catalog) = fixture();
        let mut session = KeySession::start(&key, &catalog);
        session.answer(0).unwrap();
        let scores = session.scores().clone();

        let err = session.answer(7).unwrap_err();
        assert_eq!(
            err,
            SessionError::NoSuchOption {
                node_id: "2".into(),
                index: 7,
                available: 3
            }
        );
        let err = session.answer(2).unwrap_err();
        assert_eq!(
            err,
            SessionError::UnknownNode {
                node_id: "missing".into()
            }
        );
        assert_eq!(session.scores(), &scores);
        assert_eq!(session.steps_taken(), 1);

        session.answer(1).unwrap();
        assert!(matches!(
            session.answer(0),
            Err(SessionError::Terminal { .. })
        ));
    }

    #[test]
    fn replay_matches_live_scores() {
        let (key, catalog) = fixture();
        let mut session = KeySession::start(&key, &catalog);
        session.answer(0).unwrap();
        session.answer(0).unwrap();
        assert_eq!(session.replay_scores(), *session.scores());
        session.undo();
        assert_eq!(session.replay_scores(), *session.scores());
    }

    #[test]
    fn reset_clears_everything() {
        let (key, catalog) = fixture();
        let mut session = KeySession::start(&key, &catalog);
        session.answer(0).unwrap();
        let step = session.reset();
        assert_eq!(step.steps_taken, 0);
        assert!(session.history().is_empty());
        assert!(session.scores().values().all(|s| *s == 0));
        assert_eq!(step.state, SessionState::Active { node_id: "1".into() });
    }

    #[test]
    fn ranking_ties_break_on_name() {
        let (key, catalog) = fixture();
        let session = KeySession::start(&key, &catalog);
        let names: Vec<String> = session.ranked().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Munida alpha", "Munida beta", "Munidopsis gamma"]);
        assert_eq!(session.top(2).len(), 2);
    }

    #[test]
    fn step_json_shape() {
        let (key, catalog) = fixture();
        let mut session = KeySession::start(&key, &catalog);
        let json = session.answer(1).unwrap().to_json();
        assert_eq!(json["state"]["status"], "terminal");
        assert_eq!(json["identification"]["species_id"], "c");
        assert!(json["prompt"].is_null());
        assert_eq!(json["steps_taken"], 1);
    }
}
