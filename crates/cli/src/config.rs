//! Optional TOML configuration for `carapace`.
//!
//! # Example
//!
//! ```toml
//! [key]
//! top_n = 5
//! leaf_floor = 80
//! leaf_floor_without_steps = 95
//!
//! [matcher]
//! heavy_weight = 1.5
//! synonym_factor = 0.7
//! heavy_keywords = ["rugoso", "falcado", "estriado"]
//!
//! [matcher.thesaurus]
//! liso = ["suave", "sin rugosidad"]
//! ```
//!
//! Every section and field is optional and falls back to the engine
//! defaults. Unknown keys are rejected. Thesaurus keys, synonyms and
//! heavy keywords are matched case-insensitively.

use std::path::Path;

use carapace_eval::confidence::ConfidencePolicy;
use carapace_eval::session::DEFAULT_TOP_N;
use carapace_eval::{KeyConfig, MatcherConfig};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "carapace.toml";

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CarapaceConfig {
    pub key: KeySettings,
    pub matcher: MatcherConfig,
}

/// `[key]` section: ranking size and leaf confidence floors.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeySettings {
    pub top_n: usize,
    pub leaf_floor: Decimal,
    pub leaf_floor_without_steps: Decimal,
}

impl Default for KeySettings {
    fn default() -> Self {
        let policy = ConfidencePolicy::default();
        KeySettings {
            top_n: DEFAULT_TOP_N,
            leaf_floor: policy.leaf_floor,
            leaf_floor_without_steps: policy.leaf_floor_without_steps,
        }
    }
}

impl KeySettings {
    pub fn to_key_config(&self) -> KeyConfig {
        KeyConfig {
            confidence: ConfidencePolicy::new(self.leaf_floor, self.leaf_floor_without_steps),
            top_n: self.top_n,
        }
    }
}

// ── Functions ─────────────────────────────────────────────────────────────────

/// Read and parse a config TOML file from `path`.
///
/// Returns a human-readable error string on failure.
pub fn read_config(path: &Path) -> Result<CarapaceConfig, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;

    toml::from_str(&content).map_err(|e| format!("could not parse '{}': {}", path.display(), e))
}

/// Load the explicit config file, else `carapace.toml` if it exists,
/// else the defaults.
pub fn resolve_config(explicit: Option<&Path>) -> Result<CarapaceConfig, String> {
    if let Some(path) = explicit {
        return read_config(path);
    }
    let fallback = Path::new(DEFAULT_CONFIG_FILE);
    if fallback.is_file() {
        tracing::debug!(path = DEFAULT_CONFIG_FILE, "using config from working directory");
        return read_config(fallback);
    }
    Ok(CarapaceConfig::default())
}
