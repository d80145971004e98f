//! Weighted free-text feature matching against species feature lists.
//!
//! Each user feature scores against a species when it equals one of the
//! species features, when either contains the other, or failing both
//! when a thesaurus synonym appears in any species feature. Features
//! naming a heavy taxonomic keyword weigh more.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

use crate::numeric;
use crate::types::SpeciesCatalog;

const NOT_OBSERVED: &str = "no observado";

/// Matcher tunables. Keywords and thesaurus entries are folded to
/// trimmed lowercase on load, the same way user features are.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatcherConfig {
    pub heavy_weight: Decimal,
    pub synonym_factor: Decimal,
    #[serde(deserialize_with = "folded_list")]
    pub heavy_keywords: Vec<String>,
    #[serde(deserialize_with = "folded_thesaurus")]
    pub thesaurus: BTreeMap<String, Vec<String>>,
}

fn fold(s: &str) -> String {
    s.trim().to_lowercase()
}

fn folded_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let raw = Vec::<String>::deserialize(d)?;
    Ok(raw.iter().map(|s| fold(s)).collect())
}

fn folded_thesaurus<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<BTreeMap<String, Vec<String>>, D::Error> {
    let raw = BTreeMap::<String, Vec<String>>::deserialize(d)?;
    let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
    // "Liso" and "liso" collapse into one entry.
    for (key, synonyms) in raw {
        out.entry(fold(&key))
            .or_default()
            .extend(synonyms.iter().map(|s| fold(s)));
    }
    Ok(out)
}

impl Default for MatcherConfig {
    fn default() -> Self {
        let thesaurus = [
            ("subcilindrico", &["ovalado", "cilindrico", "alargado"][..]),
            ("ovalado", &["subcilindrico", "redondeado", "elipsoide"][..]),
            ("liso", &["suave", "sin rugosidad"][..]),
            ("rugoso", &["granulado", "estriado", "asperos", "rugosa"][..]),
        ]
        .into_iter()
        .map(|(k, syns)| (k.to_string(), syns.iter().map(|s| s.to_string()).collect()))
        .collect();

        MatcherConfig {
            heavy_weight: Decimal::new(15, 1),
            synonym_factor: Decimal::new(7, 1),
            heavy_keywords: vec![
                "rugoso".to_string(),
                "falcado".to_string(),
                "estriado".to_string(),
            ],
            thesaurus,
        }
    }
}

/// One species supported by the given features.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureMatch {
    pub species_id: String,
    pub name: String,
    pub genus: Option<String>,
    pub common_name: Option<String>,
    pub score: Decimal,
    /// Percentage in [0, 100], two decimals.
    pub probability: Decimal,
}

impl FeatureMatch {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "species_id": self.species_id,
            "name": self.name,
            "genus": self.genus,
            "common_name": self.common_name,
            "score": numeric::decimal_to_json(self.score),
            "probability": numeric::decimal_to_json(self.probability),
        })
    }
}

/// Split free text into features on commas and whitespace, dropping
/// "no observado" entries.
pub fn parse_feature_text(text: &str) -> Vec<String> {
    text.split(',')
        .map(|part| part.trim().to_lowercase())
        .filter(|part| part != NOT_OBSERVED)
        .flat_map(|part| {
            part.split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

fn normalize(features: &[String]) -> Vec<String> {
    features
        .iter()
        .map(|f| f.trim().to_lowercase())
        .filter(|f| !f.is_empty() && f != NOT_OBSERVED)
        .collect()
}

fn score_feature(feature: &str, species_features: &[String], config: &MatcherConfig) -> Decimal {
    let weight = if config
        .heavy_keywords
        .iter()
        .any(|k| feature.contains(k.as_str()))
    {
        config.heavy_weight
    } else {
        Decimal::ONE
    };

    if species_features.iter().any(|f| f == feature) {
        return weight;
    }
    if species_features
        .iter()
        .any(|f| f.contains(feature) || feature.contains(f.as_str()))
    {
        return weight;
    }
    let by_synonym = config.thesaurus.get(feature).is_some_and(|synonyms| {
        synonyms
            .iter()
            .any(|syn| species_features.iter().any(|f| f.contains(syn.as_str())))
    });
    if by_synonym {
        return weight * config.synonym_factor;
    }
    Decimal::ZERO
}

/// Rank catalog species by how well `features` describe them.
pub fn match_features(
    features: &[String],
    catalog: &SpeciesCatalog,
    config: &MatcherConfig,
) -> Vec<FeatureMatch> {
    let wanted = normalize(features);
    if wanted.is_empty() {
        return Vec::new();
    }
    let count = Decimal::from(wanted.len() as u64);

    let mut matches: Vec<FeatureMatch> = catalog
        .iter()
        .filter_map(|species| {
            let species_features = normalize(&species.features);
            let score: Decimal = wanted
                .iter()
                .map(|f| score_feature(f, &species_features, config))
                .sum();
            if score <= Decimal::ZERO {
                return None;
            }
            let probability = (score / count * Decimal::ONE_HUNDRED).min(Decimal::ONE_HUNDRED);
            tracing::debug!(species = %species.id, %score, "features matched");
            Some(FeatureMatch {
                species_id: species.id.clone(),
                name: species.name.clone(),
                genus: species.genus.clone(),
                common_name: species.common_name.clone(),
                score,
                probability: numeric::round_dp(probability, 2),
            })
        })
        .collect();

    matches.sort_by(|a, b| {
        b.probability
            .cmp(&a.probability)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    matches
}
