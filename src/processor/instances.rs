//! Instance usage scanner.
//!
//! Reads grep-style instance lines (`<path>:<line>: <source text>`) and
//! marks the tile named at a fixed offset after each trigger keyword.

use super::constants::ConstantTable;
use super::lexer::Preprocessor;
use crate::config::Rule;
use crate::diagnostics::{DiagnosticKind, Diagnostics, Location};
use crate::model::{Category, InstanceSource, TileBitmap};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

static LINE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\S*?:\d+:").expect("line prefix pattern"));

static INDEX_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\d+\]$").expect("index suffix pattern"));

/// Strip the location prefix, comments, strings and quote payloads.
pub fn clean_instance_line(line: &str) -> String {
    let line = line.trim();
    let body = LINE_PREFIX.replace(line, "");
    Preprocessor::new().clean(&body)
}

/// Drop a trailing `[<digits>]` array index.
pub fn strip_index(token: &str) -> &str {
    match INDEX_SUFFIX.find(token) {
        Some(m) => &token[..m.start()],
        None => token,
    }
}

/// Argument tokens for every occurrence of the rule's keywords. `None`
/// marks an occurrence whose argument is missing.
pub fn arguments<'a>(tokens: &[&'a str], rule: &Rule) -> Vec<Option<&'a str>> {
    tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| rule.keywords.iter().any(|k| k == *t))
        .map(|(i, _)| tokens.get(i + rule.offset).copied())
        .collect()
}

/// Scanner state for one run: read-only lookups plus the four bitmaps.
pub struct InstanceScanner<'a> {
    constants: &'a ConstantTable,
    variables: &'a BTreeSet<String>,
    bitmaps: BTreeMap<Category, TileBitmap>,
}

impl<'a> InstanceScanner<'a> {
    pub fn new(
        maxtiles: usize,
        constants: &'a ConstantTable,
        variables: &'a BTreeSet<String>,
    ) -> Self {
        let bitmaps = Category::ALL
            .into_iter()
            .map(|c| (c, TileBitmap::new(maxtiles)))
            .collect();
        Self {
            constants,
            variables,
            bitmaps,
        }
    }

    pub fn scan(&mut self, source: &InstanceSource, diagnostics: &mut Diagnostics) {
        let mut marked = 0;
        for (idx, raw) in source.text.lines().enumerate() {
            let location = Location::new(&source.path, idx as u32 + 1);
            marked += self.scan_line(raw, &source.rule, location, diagnostics);
        }
        tracing::info!(
            "Scanned {} ({} {} marks)",
            source.path.display(),
            marked,
            source.rule.bitmap.stem()
        );
    }

    /// Returns how many tiles the line marked.
    fn scan_line(
        &mut self,
        raw: &str,
        rule: &Rule,
        location: Location,
        diagnostics: &mut Diagnostics,
    ) -> usize {
        let cleaned = clean_instance_line(raw);
        let tokens: Vec<&str> = cleaned.split_whitespace().collect();
        let mut marked = 0;

        for argument in arguments(&tokens, rule) {
            let Some(argument) = argument else {
                diagnostics.push(
                    DiagnosticKind::MissingArgument,
                    Some(location.clone()),
                    format!("no argument at offset {}: {cleaned}", rule.offset),
                );
                continue;
            };
            let name = strip_index(argument);
            if self.variables.contains(name) {
                continue;
            }
            let Some(tile) = self.constants.resolve(name) else {
                diagnostics.push(
                    DiagnosticKind::UnresolvedName,
                    Some(location.clone()),
                    format!("name '{name}' is unknown: {cleaned}"),
                );
                continue;
            };
            let Some(bitmap) = self.bitmaps.get_mut(&rule.bitmap) else {
                continue;
            };
            match bitmap.set(tile) {
                Ok(()) => marked += 1,
                Err(err) => diagnostics.push(
                    DiagnosticKind::TileOutOfRange,
                    Some(location.clone()),
                    format!("'{name}': {err}"),
                ),
            }
        }
        marked
    }

    pub fn finish(self) -> BTreeMap<Category, TileBitmap> {
        for (category, bitmap) in &self.bitmaps {
            tracing::info!("Number of distinct {}: {}", category.stem(), bitmap.count());
        }
        self.bitmaps
    }
}

/// Scan every instance source into its category bitmap.
pub fn scan_all(
    sources: &[InstanceSource],
    maxtiles: usize,
    constants: &ConstantTable,
    variables: &BTreeSet<String>,
    diagnostics: &mut Diagnostics,
) -> BTreeMap<Category, TileBitmap> {
    let mut scanner = InstanceScanner::new(maxtiles, constants, variables);
    for source in sources {
        scanner.scan(source, diagnostics);
    }
    scanner.finish()
}
