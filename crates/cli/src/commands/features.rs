use std::path::Path;

use carapace_eval::{match_features, parse_feature_text, MatcherConfig};

use super::{load_knowledge, print_json};
use crate::OutputFormat;

pub(crate) fn cmd_match(
    bundle_path: &Path,
    text: &str,
    config: &MatcherConfig,
    output: OutputFormat,
    quiet: bool,
) {
    let kb = load_knowledge(bundle_path, output, quiet);
    let features = parse_feature_text(text);
    let matches = match_features(&features, &kb.catalog, config);

    if quiet {
        return;
    }
    match output {
        OutputFormat::Json => {
            let list: Vec<serde_json::Value> = matches.iter().map(|m| m.to_json()).collect();
            print_json(&serde_json::json!({ "features": features, "matches": list }));
        }
        OutputFormat::Text => {
            if matches.is_empty() {
                println!("No species matches the given features.");
                return;
            }
            for (i, m) in matches.iter().enumerate() {
                let common = m
                    .common_name
                    .as_deref()
                    .map(|c| format!(" ({})", c))
                    .unwrap_or_default();
                println!("  {}. {}{}  {:.2}%", i + 1, m.name, common, m.probability);
            }
        }
    }
}
