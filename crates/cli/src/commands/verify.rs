use std::path::Path;
use std::process;

use carapace_eval::verify;

use super::{load_knowledge, load_record, print_json};
use crate::OutputFormat;

/// Exit status for a rejected or unknown hypothesis.
const EXIT_REJECTED: i32 = 2;

pub(crate) fn cmd_verify(
    bundle_path: &Path,
    record_path: &Path,
    species: &str,
    output: OutputFormat,
    quiet: bool,
) {
    let kb = load_knowledge(bundle_path, output, quiet);
    let record = load_record(record_path, output, quiet);

    let result = verify(&record, species, &kb.rules);

    if !quiet {
        match output {
            OutputFormat::Json => print_json(&result.to_json()),
            OutputFormat::Text => {
                println!("{}", result.message);
                if result.found {
                    println!("  score: {:.2}", result.score);
                    if !result.justification.is_empty() {
                        println!("  justification: {}", result.justification);
                    }
                    if let Some(reference) = &result.reference {
                        println!("  reference: {}", reference);
                    }
                    if let Some(link) = &result.link {
                        println!("  link: {}", link);
                    }
                    for (index, fault) in &result.evidence.faulted {
                        println!("  condition {} not checked: {}", index, fault);
                    }
                }
            }
        }
    }

    if !result.verified {
        process::exit(EXIT_REJECTED);
    }
}
