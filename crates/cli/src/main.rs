mod commands;
mod config;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Carapace taxonomic identification toolkit.
#[derive(Parser)]
#[command(
    name = "carapace",
    version,
    about = "Carapace taxonomic identification toolkit"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Configuration file (defaults to ./carapace.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log engine decisions to stderr
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank every species whose rule a specimen record satisfies
    Identify {
        /// Path to the definition bundle
        bundle: PathBuf,
        /// Path to the specimen record JSON file
        #[arg(long)]
        record: PathBuf,
    },

    /// Check whether a specimen record supports one species
    Verify {
        /// Path to the definition bundle
        bundle: PathBuf,
        /// Path to the specimen record JSON file
        #[arg(long)]
        record: PathBuf,
        /// Species name to verify (case-insensitive)
        #[arg(long)]
        species: String,
    },

    /// Walk the bundle's dichotomous key
    Key {
        /// Path to the definition bundle
        bundle: PathBuf,
        /// Comma-separated 1-based option numbers; skips the interactive shell
        #[arg(long, value_delimiter = ',')]
        answers: Option<Vec<usize>>,
    },

    /// Rank species by free-text morphological features
    Match {
        /// Path to the definition bundle
        bundle: PathBuf,
        /// Features, separated by commas or spaces
        #[arg(long)]
        features: String,
    },

    /// Validate a definition bundle against the bundle schema
    Validate {
        /// Path to the definition bundle
        bundle: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Identify { bundle, record } => {
            commands::identify::cmd_identify(&bundle, &record, cli.output, cli.quiet);
        }
        Commands::Verify {
            bundle,
            record,
            species,
        } => {
            commands::verify::cmd_verify(&bundle, &record, &species, cli.output, cli.quiet);
        }
        Commands::Key { bundle, answers } => {
            let settings = load_config(cli.config.as_deref(), cli.output, cli.quiet);
            commands::key::cmd_key(
                &bundle,
                answers.as_deref(),
                settings.key.to_key_config(),
                cli.output,
                cli.quiet,
            );
        }
        Commands::Match { bundle, features } => {
            let settings = load_config(cli.config.as_deref(), cli.output, cli.quiet);
            commands::features::cmd_match(
                &bundle,
                &features,
                &settings.matcher,
                cli.output,
                cli.quiet,
            );
        }
        Commands::Validate { bundle } => {
            commands::validate::cmd_validate(&bundle, cli.output, cli.quiet);
        }
    }
}

/// Install the stderr log subscriber. `RUST_LOG` wins unless `--verbose`.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(
    path: Option<&std::path::Path>,
    output: OutputFormat,
    quiet: bool,
) -> config::CarapaceConfig {
    match config::resolve_config(path) {
        Ok(c) => c,
        Err(e) => {
            let msg = format!("error: config {}", e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
