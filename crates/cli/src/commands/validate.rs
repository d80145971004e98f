use std::path::Path;
use std::process;

use carapace_eval::KnowledgeBase;

use super::read_json;
use crate::{report_error, OutputFormat};

static BUNDLE_SCHEMA_STR: &str = include_str!("../../../../docs/bundle-schema.json");

pub(crate) fn cmd_validate(bundle_path: &Path, output: OutputFormat, quiet: bool) {
    let schema: serde_json::Value = match serde_json::from_str(BUNDLE_SCHEMA_STR) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("internal error: failed to parse embedded bundle schema: {}", e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let validator = match jsonschema::validator_for(&schema) {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("internal error: failed to compile schema: {}", e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let doc = read_json(bundle_path, "bundle", output, quiet);

    let mut errors: Vec<String> = validator
        .iter_errors(&doc)
        .map(|e| format!("{}", e))
        .collect();

    // Structural checks only make sense once the shape is right.
    if errors.is_empty() {
        if let Err(e) = KnowledgeBase::from_interchange(&doc) {
            errors.push(e.to_string());
        }
    }

    if errors.is_empty() {
        if !quiet {
            match output {
                OutputFormat::Text => println!("valid"),
                OutputFormat::Json => println!("{{\"valid\": true}}"),
            }
        }
        return;
    }

    if quiet {
        process::exit(1);
    }
    match output {
        OutputFormat::Text => {
            eprintln!("invalid bundle");
            for err in &errors {
                eprintln!("  - {}", err);
            }
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "valid": false,
                "errors": errors
            });
            eprintln!(
                "{}",
                serde_json::to_string_pretty(&json).unwrap_or_default()
            );
        }
    }
    process::exit(1);
}
