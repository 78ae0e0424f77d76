pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod model;
pub mod parser;
pub mod processor;
pub mod writer;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::Rules;
use crate::diagnostics::Diagnostics;
use crate::model::ProcessedCorpus;

pub fn run() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    init_logging(args.verbose);

    let processed = analyze(&args)?;

    let stderr = std::io::stderr();
    processed
        .diagnostics
        .print(&mut stderr.lock())
        .with_context(|| "Printing diagnostics")?;

    Ok(())
}

/// `RUST_LOG` wins; otherwise `info`, or `debug` with `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

/// Load, process and write everything `args` names.
pub fn analyze(args: &cli::Cli) -> anyhow::Result<ProcessedCorpus> {
    // 1. ── Load ───────────────────────────────────────────────────────
    let rules = match &args.rules {
        Some(path) => Rules::load(path)?,
        None => Rules::default(),
    };
    let mut diagnostics = Diagnostics::new();
    let raw = parser::load(args, &rules, &mut diagnostics).with_context(|| "Loading inputs")?;

    // 2. ── Process ────────────────────────────────────────────────────
    let processed = processor::run(raw, diagnostics);

    // 3. ── Write outputs ──────────────────────────────────────────────
    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("Creating {}", args.output.display()))?;

    writer::bin::emit(&processed, &args.output).with_context(|| "Writing bitmap files")?;
    writer::json::emit(&processed, &args.output).with_context(|| "Writing report")?;

    Ok(processed)
}
