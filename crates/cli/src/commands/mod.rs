//! Subcommand implementations.
//!
//! Each command reports failures through [`crate::report_error`] and
//! exits with status 1; `verify` additionally exits with status 2 when
//! a hypothesis is rejected.

pub(crate) mod features;
pub(crate) mod identify;
pub(crate) mod key;
pub(crate) mod validate;
pub(crate) mod verify;

use std::path::Path;
use std::process;

use carapace_eval::{KnowledgeBase, Record};

use crate::{report_error, OutputFormat};

/// Read and parse a JSON file, exiting on failure.
pub(crate) fn read_json(path: &Path, what: &str, output: OutputFormat, quiet: bool) -> serde_json::Value {
    let text = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(_) => {
            let msg = format!("error: {} file not found: {}", what, path.display());
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("error: invalid JSON in {}: {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

/// Load a definition bundle into a knowledge base, exiting on failure.
pub(crate) fn load_knowledge(path: &Path, output: OutputFormat, quiet: bool) -> KnowledgeBase {
    let bundle = read_json(path, "bundle", output, quiet);
    match KnowledgeBase::from_interchange(&bundle) {
        Ok(kb) => {
            tracing::debug!(
                bundle = %kb.id,
                rules = kb.rules.len(),
                species = kb.catalog.len(),
                "bundle loaded"
            );
            kb
        }
        Err(e) => {
            let msg = format!("error: {}: {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

/// Load a specimen record, exiting on failure.
pub(crate) fn load_record(path: &Path, output: OutputFormat, quiet: bool) -> Record {
    let raw = read_json(path, "record", output, quiet);
    match Record::from_json(&raw) {
        Ok(r) => r,
        Err(e) => {
            let msg = format!("error: {}: {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

pub(crate) fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("serialization error: {}", e))
    );
}
