//! Component 1 – loading.
//!
//! Reads every input named on the command line into a `RawCorpus`. A
//! required file that cannot be read aborts the run; records that cannot
//! be understood and missing instance files only produce diagnostics.

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use crate::cli::Cli;
use crate::config::Rules;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::model::{DefSource, InstanceSource, RawCorpus, ScriptSource};
use crate::processor::constants::ConstantTable;

pub fn load(args: &Cli, rules: &Rules, diagnostics: &mut Diagnostics) -> Result<RawCorpus> {
    let defs = read_text(&args.defs)?;
    let constants = ConstantTable::parse(&defs, &args.defs, diagnostics);
    if constants.is_empty() {
        tracing::warn!("No constants in {}; only literal tile numbers will resolve", args.defs.display());
    } else {
        tracing::info!("Loaded {} constants from {}", constants.len(), args.defs.display());
    }

    let vars = read_text(&args.vars)?;
    let variables = parse_variables(&vars, &args.vars, diagnostics);
    tracing::info!("Loaded {} variable names from {}", variables.len(), args.vars.display());

    let scripts = load_scripts(&args.scripts)?;
    tracing::info!("Found {} script files under {}", scripts.len(), args.scripts.display());

    let instances = load_instances(&args.instances, rules, diagnostics)?;

    let def = match &args.def {
        Some(path) => Some(DefSource {
            path: path.clone(),
            text: read_text(path)?,
        }),
        None => None,
    };

    Ok(RawCorpus {
        maxtiles: args.maxtiles,
        constants,
        variables,
        scripts,
        instances,
        def,
    })
}

/// Read a file as text. Invalid UTF-8 is replaced rather than rejected.
pub fn read_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("Reading {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// `<ignored> NAME` records; only the name is kept.
pub fn parse_variables(src: &str, origin: &Path, diagnostics: &mut Diagnostics) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for (idx, line) in src.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            [] => {}
            [_, name, ..] => {
                names.insert(name.to_string());
            }
            [_] => diagnostics.at(
                DiagnosticKind::MalformedRecord,
                origin,
                idx as u32 + 1,
                format!("incomplete variable record: {}", line.trim()),
            ),
        }
    }
    names
}

/// Every regular file below `dir`, in file-name order.
pub fn load_scripts(dir: &Path) -> Result<Vec<ScriptSource>> {
    let mut scripts = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Walking {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        let text = read_text(&path)?;
        scripts.push(ScriptSource { path, text });
    }
    Ok(scripts)
}

/// One source per rule whose file exists in `dir`.
pub fn load_instances(
    dir: &Path,
    rules: &Rules,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<InstanceSource>> {
    let mut sources = Vec::new();
    for rule in &rules.rule {
        let path = dir.join(&rule.file);
        if !path.is_file() {
            diagnostics.push(
                DiagnosticKind::MissingInput,
                None,
                format!("{} not found; {} rule skipped", path.display(), rule.bitmap.stem()),
            );
            continue;
        }
        let text = read_text(&path)?;
        sources.push(InstanceSource {
            rule: rule.clone(),
            path,
            text,
        });
    }
    Ok(sources)
}
