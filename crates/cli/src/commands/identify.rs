use std::path::Path;

use carapace_eval::{candidates_to_json, evaluate_all};

use super::{load_knowledge, load_record, print_json};
use crate::OutputFormat;

pub(crate) fn cmd_identify(bundle_path: &Path, record_path: &Path, output: OutputFormat, quiet: bool) {
    let kb = load_knowledge(bundle_path, output, quiet);
    let record = load_record(record_path, output, quiet);

    let candidates = evaluate_all(&record, &kb.rules);

    if quiet {
        return;
    }
    match output {
        OutputFormat::Json => print_json(&candidates_to_json(&candidates)),
        OutputFormat::Text => {
            if candidates.is_empty() {
                println!("No species meets its rule threshold.");
                return;
            }
            println!("{} candidate(s):", candidates.len());
            for (i, c) in candidates.iter().enumerate() {
                println!(
                    "  {}. {}  score {:.2} ({}/{} conditions)  [{}]",
                    i + 1,
                    c.species,
                    c.score,
                    c.matched,
                    c.total,
                    c.rule_id
                );
                if !c.justification.is_empty() {
                    println!("     {}", c.justification);
                }
                if let Some(link) = &c.link {
                    println!("     {}", link);
                }
            }
        }
    }
}
