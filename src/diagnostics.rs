//! Per-record diagnostics collected during one analysis run.
//!
//! Nothing recorded here aborts the batch. The collected stream is printed
//! once the run completes and summarised per kind in the JSON report.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A definitions or variable record that could not be understood.
    MalformedRecord,
    /// A name that is neither a literal nor a known constant.
    UnresolvedName,
    /// An action referenced by an actor that has no definition.
    UndefinedAction,
    /// An AI routine referenced by an actor that has no definition.
    UndefinedAi,
    /// A defined action that no actor can ever reach.
    UnusedAction,
    /// A tile number or range outside `[0, maxtiles)`.
    TileOutOfRange,
    /// Broken actor/state/event nesting; the rest of the file is skipped.
    ScopeViolation,
    /// An instance line whose keyword has no argument at the expected offset.
    MissingArgument,
    /// An instance-line file named by a rule that does not exist.
    MissingInput,
}

impl DiagnosticKind {
    pub fn label(self) -> &'static str {
        match self {
            DiagnosticKind::MalformedRecord => "malformed record",
            DiagnosticKind::UnresolvedName => "unresolved name",
            DiagnosticKind::UndefinedAction => "undefined action",
            DiagnosticKind::UndefinedAi => "undefined ai",
            DiagnosticKind::UnusedAction => "unused action",
            DiagnosticKind::TileOutOfRange => "tile out of range",
            DiagnosticKind::ScopeViolation => "scope violation",
            DiagnosticKind::MissingArgument => "missing argument",
            DiagnosticKind::MissingInput => "missing input",
        }
    }
}

/// File and line a diagnostic is attributed to. Lines start at 1.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Location {
    pub file: PathBuf,
    pub line: u32,
}

impl Location {
    pub fn new(file: &Path, line: u32) -> Self {
        Self {
            file: file.to_path_buf(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub location: Option<Location>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{loc}: {}: {}", self.kind.label(), self.message),
            None => write!(f, "{}: {}", self.kind.label(), self.message),
        }
    }
}

/// Ordered sink for every diagnostic produced by the passes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<S: Into<String>>(
        &mut self,
        kind: DiagnosticKind,
        location: Option<Location>,
        message: S,
    ) {
        let diagnostic = Diagnostic {
            kind,
            location,
            message: message.into(),
        };
        tracing::debug!("{diagnostic}");
        self.entries.push(diagnostic);
    }

    /// Shorthand for a diagnostic attributed to a file and line.
    pub fn at<S: Into<String>>(&mut self, kind: DiagnosticKind, file: &Path, line: u32, message: S) {
        self.push(kind, Some(Location::new(file, line)), message);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    pub fn counts(&self) -> BTreeMap<DiagnosticKind, usize> {
        let mut counts = BTreeMap::new();
        for d in &self.entries {
            *counts.entry(d.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Write every diagnostic on its own line, then a per-kind summary.
    pub fn print<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
        for d in &self.entries {
            writeln!(w, "{d}")?;
        }
        for (kind, count) in self.counts() {
            writeln!(w, "{count} x {}", kind.label())?;
        }
        Ok(())
    }
}
