//! `report.json`: summary counts, marked tiles and diagnostic totals.

use crate::diagnostics::DiagnosticKind;
use crate::model::{ProcessedCorpus, SymbolSummary, TileBitmap};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use super::bin::ACTOR_FRAMES;

pub const REPORT_FILE: &str = "report.json";

#[derive(Debug, Serialize)]
pub struct BitmapReport {
    pub marked: usize,
    pub tiles: Vec<usize>,
}

impl From<&TileBitmap> for BitmapReport {
    fn from(bitmap: &TileBitmap) -> Self {
        Self {
            marked: bitmap.count(),
            tiles: bitmap.marked().collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub maxtiles: usize,
    pub summary: SymbolSummary,
    /// Keyed by output file stem.
    pub bitmaps: BTreeMap<&'static str, BitmapReport>,
    pub unused_actions: &'a BTreeSet<String>,
    pub diagnostics: BTreeMap<DiagnosticKind, usize>,
}

impl<'a> Report<'a> {
    pub fn new(corpus: &'a ProcessedCorpus) -> Self {
        let mut bitmaps = BTreeMap::new();
        bitmaps.insert(ACTOR_FRAMES, BitmapReport::from(&corpus.actor_frames));
        for (category, bitmap) in &corpus.instances {
            bitmaps.insert(category.stem(), BitmapReport::from(bitmap));
        }
        for (stem, bitmap) in corpus.def_tiles.iter().flat_map(|d| d.bitmaps()) {
            bitmaps.insert(stem, BitmapReport::from(bitmap));
        }
        Self {
            maxtiles: corpus.actor_frames.len(),
            summary: corpus.summary,
            bitmaps,
            unused_actions: &corpus.unused_actions,
            diagnostics: corpus.diagnostics.counts(),
        }
    }
}

pub fn emit(corpus: &ProcessedCorpus, out_dir: &Path) -> io::Result<()> {
    let path = out_dir.join(REPORT_FILE);
    let mut w = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(&mut w, &Report::new(corpus))?;
    writeln!(w)?;
    w.flush()?;
    tracing::info!("Wrote {}", path.display());
    Ok(())
}
