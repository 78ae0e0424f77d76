//! Tile usage declared by an engine definitions file.
//
//  Recognised forms, everything else is skipped:
//
//      tilefromtexture TILE { ... }
//      animtilerange FIRST LAST [SPEED [TYPE]]      (FIRST..=LAST)
//      voxel "file" { ... tile TILE ... }
//      voxel "file" { ... tile0 FIRST tile1 LAST ... }
//
//  Comments and quoted strings are removed the same way as for scripts;
//  braces are kept as separate tokens so block nesting can be followed.

use super::constants::ConstantTable;
use super::lexer::{Preprocessor, Token, TokenStream};
use crate::diagnostics::{DiagnosticKind, Diagnostics, Location};
use crate::model::{DefSource, DefTiles, TileBitmap, TileError};
use std::ops::Range;
use std::path::Path;

/// Split a cleaned line into words and single-brace tokens.
pub fn def_tokens(line: &str, line_no: u32) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut flush = |word: &mut String, tokens: &mut Vec<Token>| {
        if !word.is_empty() {
            tokens.push(Token {
                word: std::mem::take(word),
                line: line_no,
            });
        }
    };

    for c in line.chars() {
        match c {
            '{' | '}' => {
                flush(&mut word, &mut tokens);
                tokens.push(Token {
                    word: c.to_string(),
                    line: line_no,
                });
            }
            c if c.is_whitespace() => flush(&mut word, &mut tokens),
            c => word.push(c),
        }
    }
    flush(&mut word, &mut tokens);
    tokens
}

/// Inclusive tile range `first..=last` as a half-open range.
pub fn inclusive_range(first: i64, last: i64, maxtiles: usize) -> Result<Range<i64>, TileError> {
    match last.checked_add(1) {
        Some(end) => Ok(first..end),
        None => Err(TileError::OutOfRange {
            start: first,
            end: last,
            maxtiles,
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Nonempty,
    Animation,
    Voxel,
}

struct DefScanner<'a> {
    tokens: TokenStream,
    constants: &'a ConstantTable,
    tiles: &'a mut DefTiles,
    diagnostics: &'a mut Diagnostics,
    origin: &'a Path,
    depth: usize,
    /// A `voxel` keyword whose block has not opened yet.
    pending_voxel: bool,
    /// Depth of the open voxel block.
    voxel_depth: Option<usize>,
    tile0: Option<i64>,
}

impl<'a> DefScanner<'a> {
    fn run(&mut self) {
        while let Some(token) = self.tokens.next() {
            match token.word.as_str() {
                "{" => {
                    self.depth += 1;
                    if self.pending_voxel {
                        self.pending_voxel = false;
                        self.voxel_depth = Some(self.depth);
                    }
                }
                "}" => {
                    if self.voxel_depth == Some(self.depth) {
                        self.voxel_depth = None;
                        self.tile0 = None;
                    }
                    self.depth = self.depth.saturating_sub(1);
                }
                "tilefromtexture" if self.depth == 0 => {
                    self.pending_voxel = false;
                    if let Some(tile) = self.argument(&token) {
                        self.mark(Target::Nonempty, tile, tile, &token);
                    }
                }
                "animtilerange" if self.depth == 0 => {
                    self.pending_voxel = false;
                    let first = self.argument(&token);
                    let last = self.argument(&token);
                    if let (Some(first), Some(last)) = (first, last) {
                        self.mark(Target::Animation, first, last, &token);
                    }
                }
                "voxel" if self.depth == 0 => self.pending_voxel = true,
                "tile" if self.voxel_depth.is_some() => {
                    if let Some(tile) = self.argument(&token) {
                        self.mark(Target::Voxel, tile, tile, &token);
                    }
                }
                "tile0" if self.voxel_depth.is_some() => self.tile0 = self.argument(&token),
                "tile1" if self.voxel_depth.is_some() => {
                    let last = self.argument(&token);
                    match (self.tile0.take(), last) {
                        (Some(first), Some(last)) => {
                            self.mark(Target::Voxel, first, last, &token)
                        }
                        (None, Some(_)) => self.report(
                            DiagnosticKind::MissingArgument,
                            &token,
                            "tile1 without a preceding tile0".to_string(),
                        ),
                        (_, None) => {}
                    }
                }
                _ => {}
            }
        }
    }

    /// The resolved token after `keyword` on the same line. Missing and
    /// unknown arguments are reported.
    fn argument(&mut self, keyword: &Token) -> Option<i64> {
        let same_record = |t: &Token| t.line == keyword.line && t.word != "{" && t.word != "}";
        let Some(arg) = self.tokens.next_if(same_record) else {
            self.report(
                DiagnosticKind::MissingArgument,
                keyword,
                format!("`{}` is missing an argument", keyword.word),
            );
            return None;
        };
        let value = self.constants.resolve(&arg.word);
        if value.is_none() {
            self.report(
                DiagnosticKind::UnresolvedName,
                &arg,
                format!("name '{}' is unknown ({})", arg.word, keyword.word),
            );
        }
        value
    }

    /// Mark `first..=last` in the target bitmap.
    fn mark(&mut self, target: Target, first: i64, last: i64, keyword: &Token) {
        let bitmap = self.bitmap(target);
        let maxtiles = bitmap.len();
        let marked = inclusive_range(first, last, maxtiles).and_then(|r| bitmap.set_range(r));
        if let Err(err) = marked {
            self.report(
                DiagnosticKind::TileOutOfRange,
                keyword,
                format!("{}: {err}", keyword.word),
            );
        }
    }

    fn bitmap(&mut self, target: Target) -> &mut TileBitmap {
        match target {
            Target::Nonempty => &mut self.tiles.nonempty,
            Target::Animation => &mut self.tiles.animation,
            Target::Voxel => &mut self.tiles.voxel,
        }
    }

    fn report(&mut self, kind: DiagnosticKind, token: &Token, message: String) {
        self.diagnostics
            .push(kind, Some(Location::new(self.origin, token.line)), message);
    }
}

/// Scan one definitions file into fresh bitmaps.
pub fn scan_defs(
    source: &DefSource,
    maxtiles: usize,
    constants: &ConstantTable,
    diagnostics: &mut Diagnostics,
) -> DefTiles {
    let mut pre = Preprocessor::new();
    let mut tokens = Vec::new();
    for (idx, raw) in source.text.lines().enumerate() {
        tokens.extend(def_tokens(&pre.clean(raw), idx as u32 + 1));
    }

    let mut tiles = DefTiles::new(maxtiles);
    DefScanner {
        tokens: tokens.into_iter().peekable(),
        constants,
        tiles: &mut tiles,
        diagnostics,
        origin: &source.path,
        depth: 0,
        pending_voxel: false,
        voxel_depth: None,
        tile0: None,
    }
    .run();

    for (stem, bitmap) in tiles.bitmaps() {
        tracing::info!("Number of {stem} tiles: {}", bitmap.count());
    }
    tiles
}
