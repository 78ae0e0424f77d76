//! Component 2 – the functional core.
//!
//! Runs the script passes (declarations, closure, frame marking), the
//! instance scanner and, when given, the definitions scanner over a loaded
//! corpus.
pub mod closure;
pub mod constants;
pub mod defs_scan;
pub mod instances;
pub mod lexer;
pub mod scope;
pub mod script_parser;
pub mod tiles;

use crate::diagnostics::Diagnostics;
use crate::model::{ProcessedCorpus, RawCorpus, SymbolTables, TileBitmap};

/// Everything one analysis run accumulates. Symbol tables persist across
/// files; scope state lives in the per-file parser.
pub struct Session {
    pub raw: RawCorpus,
    pub symbols: SymbolTables,
    pub diagnostics: Diagnostics,
}

impl Session {
    /// Start a session. `diagnostics` carries whatever loading reported.
    pub fn new(raw: RawCorpus, diagnostics: Diagnostics) -> Self {
        Self {
            raw,
            symbols: SymbolTables::default(),
            diagnostics,
        }
    }

    pub fn run(mut self) -> ProcessedCorpus {
        script_parser::parse_scripts(&self.raw.scripts, &mut self.symbols, &mut self.diagnostics);
        let summary = self.symbols.summary();
        tracing::info!("{summary:?}");

        let closure = closure::resolve(&self.symbols, &mut self.diagnostics);
        let mut actor_frames = TileBitmap::new(self.raw.maxtiles);
        tiles::mark_actor_frames(
            &closure,
            &self.symbols,
            &self.raw.constants,
            &mut actor_frames,
            &mut self.diagnostics,
        );

        let instances = instances::scan_all(
            &self.raw.instances,
            self.raw.maxtiles,
            &self.raw.constants,
            &self.raw.variables,
            &mut self.diagnostics,
        );

        let def_tiles = self.raw.def.as_ref().map(|def| {
            defs_scan::scan_defs(
                def,
                self.raw.maxtiles,
                &self.raw.constants,
                &mut self.diagnostics,
            )
        });

        ProcessedCorpus {
            actor_frames,
            instances,
            def_tiles,
            summary,
            unused_actions: closure.unused_actions,
            diagnostics: self.diagnostics,
        }
    }
}

/// Runs every processing pass and returns a read-only structure for writers.
pub fn run(raw: RawCorpus, diagnostics: Diagnostics) -> ProcessedCorpus {
    Session::new(raw, diagnostics).run()
}
