use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use strata_core::LayerStack;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod normalize;
mod script;
mod source;

use config::{Config, OutputFormat};
use source::SourceFile;

#[derive(Parser)]
#[command(version, about = "Strata - layered text alignment driver", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to a KDL config file
    #[arg(long, env = "STRATA_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Output format (overrides the config file)
    #[arg(long, value_enum, global = true)]
    format: Option<OutputFormat>,

    /// Log more (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a KDL edit script against a document
    Script {
        /// Document to load as the root layer
        input: PathBuf,

        /// Edit script
        script: PathBuf,
    },
    /// Apply replacement rules to the whitespace tokens of a document
    Normalize {
        /// Document to normalize
        input: PathBuf,

        /// KDL file of `rule "from" "to"` nodes (default: rules from the config)
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Print each token's original and normalized span
        #[arg(long)]
        spans: bool,

        /// Print the segment dump of the normalized layer
        #[arg(long)]
        segments: bool,
    },
}

fn main() -> Result<()> {
    init_miette()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load(cli.config.as_deref())?;
    let format = cli.format.unwrap_or(config.format);

    match cli.command {
        Commands::Script { input, script } => run_script(&input, &script, format)?,
        Commands::Normalize {
            input,
            rules,
            spans,
            segments,
        } => {
            let rules = match rules {
                Some(path) => config::load_rules(&path)?,
                None => config.rules.clone(),
            };
            let input = SourceFile::read(&input)?;
            let report = normalize::normalize(
                &input.text,
                &rules,
                spans,
                segments || config.show_segments,
            )?;
            emit(format, &report, normalize::Report::render)?;
        }
    }

    Ok(())
}

fn run_script(input: &Path, script: &Path, format: OutputFormat) -> Result<()> {
    let input = SourceFile::read(input)?;
    let script = script::Script::parse(SourceFile::read(script)?)?;
    tracing::debug!(steps = script.steps().count(), "parsed script");
    let (mut stack, root) = LayerStack::from_text(&input.text);
    for output in script.run(&mut stack, root)? {
        emit(format, &output, script::Output::render)?;
    }
    Ok(())
}

/// Print one value to stdout: rendered text, or one JSON line.
fn emit<T: Serialize>(format: OutputFormat, value: &T, render: fn(&T) -> String) -> Result<()> {
    match format {
        OutputFormat::Text => println!("{}", render(value)),
        OutputFormat::Json => {
            let line = serde_json::to_string(value).map_err(error::CliError::from)?;
            println!("{line}");
        }
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn init_miette() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    miette::set_panic_hook();
    Ok(())
}
