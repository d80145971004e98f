//! `carapace key`: walk a bundle's dichotomous key.
//!
//! Runs either a scripted path (`--answers 1,2,...`, 1-based option
//! numbers) or an interactive shell in which the user answers one
//! question at a time, steps back, resets, and inspects the live ranking.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process;

use carapace_eval::{HistoryEntry, KeyConfig, KeySession, KeyStep, RankedSpecies};

use super::{load_knowledge, print_json};
use crate::{report_error, OutputFormat};

pub(crate) fn cmd_key(
    bundle_path: &Path,
    answers: Option<&[usize]>,
    config: KeyConfig,
    output: OutputFormat,
    quiet: bool,
) {
    let kb = load_knowledge(bundle_path, output, quiet);
    let Some(key) = kb.key.as_ref() else {
        let msg = format!(
            "error: bundle '{}' defines no dichotomous key",
            bundle_path.display()
        );
        report_error(&msg, output, quiet);
        process::exit(1);
    };

    let mut session = KeySession::with_config(key, &kb.catalog, config);

    match answers {
        Some(answers) => run_script(&mut session, answers, output, quiet),
        None => {
            let title = key.title.as_deref().unwrap_or(&key.id);
            println!();
            println!("  Carapace key: {}", title);
            println!(
                "  {} questions, {} species",
                key.len(),
                kb.catalog.len()
            );
            println!();
            println!("  Commands: <n>, back, reset, ranking, history, help, quit");
            run_repl(&mut session, output);
        }
    }
}

// ─── Scripted path ───────────────────────────────────────────────────────────

fn run_script(session: &mut KeySession<'_>, answers: &[usize], output: OutputFormat, quiet: bool) {
    for (i, &number) in answers.iter().enumerate() {
        if number == 0 {
            let msg = format!("error: answer {}: option numbers start at 1", i + 1);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
        if let Err(e) = session.answer(number - 1) {
            let msg = format!("error: answer {} ({}): {}", i + 1, number, e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }

    if quiet {
        return;
    }
    let step = session.step();
    match output {
        OutputFormat::Json => {
            let mut json = step.to_json();
            json["history"] = history_to_json(session.history());
            print_json(&json);
        }
        OutputFormat::Text => {
            print_history(session.history());
            print_step(&step);
        }
    }
}

// ─── Interactive shell ───────────────────────────────────────────────────────

fn run_repl(session: &mut KeySession<'_>, output: OutputFormat) {
    show(&session.step(), output);

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut line = String::new();

    loop {
        print!("carapace> ");
        if io::stdout().flush().is_err() {
            break;
        }

        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => {
                // EOF (Ctrl-D)
                println!();
                break;
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("error reading input: {}", e);
                break;
            }
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let cmd = trimmed.to_lowercase();

        match cmd.as_str() {
            "help" => print_help(),
            "back" | "undo" => {
                if session.history().is_empty() {
                    eprintln!("  nothing to undo");
                    continue;
                }
                let step = session.undo();
                show(&step, output);
            }
            "reset" => {
                let step = session.reset();
                show(&step, output);
            }
            "ranking" => print_ranking(&session.ranked()),
            "history" => print_history(session.history()),
            "quit" | "exit" => break,
            _ => match cmd.parse::<usize>() {
                Ok(number) if number >= 1 => match session.answer(number - 1) {
                    Ok(step) => show(&step, output),
                    Err(e) => eprintln!("  {}", e),
                },
                _ => {
                    eprintln!(
                        "unknown command: {}. Type 'help' for available commands.",
                        cmd
                    );
                }
            },
        }
    }
}

fn show(step: &KeyStep, output: OutputFormat) {
    match output {
        OutputFormat::Json => print_json(&step.to_json()),
        OutputFormat::Text => print_step(step),
    }
}

// ─── Rendering ───────────────────────────────────────────────────────────────

fn print_help() {
    println!();
    println!("  <n>        Choose option n for the current question");
    println!("  back       Take back the last answer");
    println!("  reset      Start again from the first question");
    println!("  ranking    Show every species with its score and confidence");
    println!("  history    Show the answers given so far");
    println!("  quit       Exit");
    println!();
}

fn print_step(step: &KeyStep) {
    println!();
    if let Some(prompt) = &step.prompt {
        println!("  [{}] {}", prompt.node_id, prompt.question);
        if let Some(note) = &prompt.note {
            println!("  ({})", note);
        }
        for (i, option) in prompt.options.iter().enumerate() {
            println!("    {}. {}", i + 1, option.label);
            if let Some(note) = &option.note {
                println!("       {}", note);
            }
        }
    }

    if let Some(id) = &step.identification {
        println!("  Identified: {}", id.name);
        let taxonomy: Vec<&str> = [id.genus.as_deref(), id.family.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if !taxonomy.is_empty() {
            println!("  Taxonomy: {}", taxonomy.join(", "));
        }
        if let Some(common) = &id.common_name {
            println!("  Common name: {}", common);
        }
        println!("  Confidence: {:.2}%", id.confidence);
        if !id.features.is_empty() {
            println!("  Features: {}", id.features.join("; "));
        }
        if let Some(note) = &id.note {
            println!("  Note: {}", note);
        }
    }

    if step.steps_taken > 0 {
        print_ranking(&step.ranked);
    }
    println!();
}

fn print_ranking(ranked: &[RankedSpecies]) {
    println!("  Candidates:");
    for (i, r) in ranked.iter().enumerate() {
        println!(
            "    {}. {}  score {}  {:.2}%",
            i + 1,
            r.name,
            r.score,
            r.confidence
        );
    }
}

fn print_history(history: &[HistoryEntry]) {
    if history.is_empty() {
        println!("  no answers yet");
        return;
    }
    for (i, entry) in history.iter().enumerate() {
        println!("  {}. [{}] {}", i + 1, entry.node_id, entry.label);
    }
}

fn history_to_json(history: &[HistoryEntry]) -> serde_json::Value {
    history
        .iter()
        .map(|h| {
            serde_json::json!({
                "node_id": h.node_id,
                "option": h.option_index + 1,
                "answer": if h.is_yes { "yes" } else { "no" },
                "label": h.label,
            })
        })
        .collect()
}
