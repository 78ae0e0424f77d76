//! Constant table and name resolution.
//
//  Definitions source, one record per line:
//
//      <ignored> NAME VALUE
//
//  VALUE ::= YES | NO | 0x<hex> | [+-]<digits>

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use std::collections::BTreeMap;
use std::path::Path;

/// Flat name -> integer mapping. Built once, read-only afterwards.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConstantTable {
    values: BTreeMap<String, i64>,
}

impl ConstantTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a definitions source. Records that cannot be read are reported
    /// and skipped; a repeated name keeps its last value.
    pub fn parse(src: &str, origin: &Path, diagnostics: &mut Diagnostics) -> Self {
        let mut table = Self::new();
        for (idx, line) in src.lines().enumerate() {
            let line_no = idx as u32 + 1;
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.is_empty() {
                continue;
            }
            if fields.len() < 3 {
                diagnostics.at(
                    DiagnosticKind::MalformedRecord,
                    origin,
                    line_no,
                    format!("incomplete define: {}", line.trim()),
                );
                continue;
            }
            match parse_define_value(fields[2]) {
                Some(value) => table.insert(fields[1], value),
                None => diagnostics.at(
                    DiagnosticKind::MalformedRecord,
                    origin,
                    line_no,
                    format!("non integer define: {}", line.trim()),
                ),
            }
        }
        table
    }

    pub fn insert(&mut self, name: &str, value: i64) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<i64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Literal first, then the table. `None` when neither knows the token.
    pub fn resolve(&self, token: &str) -> Option<i64> {
        parse_literal(token).or_else(|| self.get(token))
    }
}

fn parse_define_value(value: &str) -> Option<i64> {
    match value {
        "YES" => Some(1),
        "NO" => Some(0),
        other => parse_literal(other),
    }
}

/// Hex (`0x1F`) or optionally signed decimal (`-12`, `+3`).
pub fn parse_literal(token: &str) -> Option<i64> {
    if let Some(hex) = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        if !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return i64::from_str_radix(hex, 16).ok();
        }
        return None;
    }

    let digits = token
        .strip_prefix('-')
        .or_else(|| token.strip_prefix('+'))
        .unwrap_or(token);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

/// True when the token is a literal rather than a name.
pub fn is_literal(token: &str) -> bool {
    parse_literal(token).is_some()
}
