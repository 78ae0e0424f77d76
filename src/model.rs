use crate::diagnostics::{Diagnostics, Location};
use crate::processor::constants::{self, ConstantTable};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::Range;
use std::path::PathBuf;

/// A definition argument that is either a literal or a name to be looked up
/// in the constant table once the tile ranges are computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Literal(i64),
    Symbol(String),
}

impl Operand {
    pub fn parse(token: &str) -> Self {
        match constants::parse_literal(token) {
            Some(value) => Operand::Literal(value),
            None => Operand::Symbol(token.to_string()),
        }
    }

    pub fn resolve(&self, constants: &ConstantTable) -> Option<i64> {
        match self {
            Operand::Literal(value) => Some(*value),
            Operand::Symbol(name) => constants.get(name),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operand::Literal(value) => write!(f, "{value}"),
            Operand::Symbol(name) => f.write_str(name),
        }
    }
}

/// `action <name> <startframe> [<framecount> [<viewtype>]]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDef {
    pub name: String,
    pub startframe: Operand,
    pub framecount: Operand,
    pub viewtype: Operand,
    /// Where the definition was read, for attributing resolution failures.
    pub origin: Location,
}

impl ActionDef {
    /// Build a definition from the tokens following the action name.
    /// Missing arguments default to `0 1 1`.
    pub fn from_args(name: &str, args: &[&str], origin: Location) -> Self {
        let arg = |i: usize, default: i64| {
            args.get(i)
                .map(|t| Operand::parse(t))
                .unwrap_or(Operand::Literal(default))
        };
        Self {
            name: name.to_string(),
            startframe: arg(0, 0),
            framecount: arg(1, 1),
            viewtype: arg(2, 1),
            origin,
        }
    }
}

/// Owner name -> set of referenced names.
pub type Relation = BTreeMap<String, BTreeSet<String>>;

pub fn relate(relation: &mut Relation, owner: &str, name: &str) {
    relation
        .entry(owner.to_string())
        .or_default()
        .insert(name.to_string());
}

/// Everything the declaration collector learns from the script corpus.
/// Accumulates across files; scope state does not live here.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SymbolTables {
    pub actions: BTreeMap<String, ActionDef>,
    /// AI name -> bound action; `None` when the routine binds no action.
    pub ai: BTreeMap<String, Option<String>>,
    pub state_actions: Relation,
    pub actor_actions: Relation,
    pub state_ai: Relation,
    pub actor_ai: Relation,
    pub actor_states: Relation,
    pub state_states: Relation,
    pub initial_actions: BTreeMap<String, String>,
    /// First header that opened each actor.
    pub actor_origins: BTreeMap<String, Location>,
}

impl SymbolTables {
    pub fn summary(&self) -> SymbolSummary {
        SymbolSummary {
            actors_with_initial_action: self.initial_actions.len(),
            defined_actions: self.actions.len(),
            defined_ai: self.ai.len(),
            states_using_actions: self.state_actions.len(),
            states_using_ai: self.state_ai.len(),
            actors_using_actions: self.actor_actions.len(),
            actors_calling_states: self.actor_states.len(),
            actors_using_ai: self.actor_ai.len(),
            states_calling_states: self.state_states.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SymbolSummary {
    pub actors_with_initial_action: usize,
    pub defined_actions: usize,
    pub defined_ai: usize,
    pub states_using_actions: usize,
    pub states_using_ai: usize,
    pub actors_using_actions: usize,
    pub actors_calling_states: usize,
    pub actors_using_ai: usize,
    pub states_calling_states: usize,
}

/// Instance bitmap a scanner rule writes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Actor,
    Spawn,
    Projectile,
    Screen,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Actor,
        Category::Spawn,
        Category::Projectile,
        Category::Screen,
    ];

    /// Output file stem used by the writers.
    pub fn stem(self) -> &'static str {
        match self {
            Category::Actor => "actor_tiles",
            Category::Spawn => "spawned_tiles",
            Category::Projectile => "projectiles",
            Category::Screen => "screen_tiles",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TileError {
    #[error("tile range {start}..{end} lies outside 0..{maxtiles}")]
    OutOfRange { start: i64, end: i64, maxtiles: usize },
    #[error("tile range {start}..{end} has negative length")]
    NegativeLength { start: i64, end: i64 },
    #[error("frames {framecount} x {viewtype} from tile {tile} + {startframe} do not fit in 64 bits")]
    Overflow {
        tile: i64,
        startframe: i64,
        framecount: i64,
        viewtype: i64,
    },
}

/// One flag per tile number. Bits are only ever set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileBitmap {
    tiles: Vec<bool>,
}

impl TileBitmap {
    pub fn new(maxtiles: usize) -> Self {
        Self {
            tiles: vec![false; maxtiles],
        }
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn set(&mut self, tile: i64) -> Result<(), TileError> {
        match tile.checked_add(1) {
            Some(end) => self.set_range(tile..end),
            None => Err(TileError::OutOfRange {
                start: tile,
                end: tile,
                maxtiles: self.tiles.len(),
            }),
        }
    }

    /// Mark the half-open range. Nothing is written unless the whole range
    /// fits.
    pub fn set_range(&mut self, range: Range<i64>) -> Result<(), TileError> {
        let (start, end) = (range.start, range.end);
        if end < start {
            return Err(TileError::NegativeLength { start, end });
        }
        if start < 0 || end > self.tiles.len() as i64 {
            return Err(TileError::OutOfRange {
                start,
                end,
                maxtiles: self.tiles.len(),
            });
        }
        for tile in &mut self.tiles[start as usize..end as usize] {
            *tile = true;
        }
        Ok(())
    }

    pub fn is_set(&self, tile: usize) -> bool {
        self.tiles.get(tile).copied().unwrap_or(false)
    }

    pub fn count(&self) -> usize {
        self.tiles.iter().filter(|t| **t).count()
    }

    pub fn marked(&self) -> impl Iterator<Item = usize> + '_ {
        self.tiles
            .iter()
            .enumerate()
            .filter_map(|(i, t)| t.then_some(i))
    }

    /// One byte per tile, `0` or `1`.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.tiles.iter().map(|t| u8::from(*t)).collect()
    }
}

/// One script file as read from the corpus directory.
#[derive(Debug, Clone)]
pub struct ScriptSource {
    pub path: PathBuf,
    pub text: String,
}

/// One instance-line file together with the rule that scans it.
#[derive(Debug, Clone)]
pub struct InstanceSource {
    pub rule: crate::config::Rule,
    pub path: PathBuf,
    pub text: String,
}

/// An engine definitions (`.def`) file.
#[derive(Debug, Clone)]
pub struct DefSource {
    pub path: PathBuf,
    pub text: String,
}

/// Immediately-after-load representation of every input.
#[derive(Debug, Clone)]
pub struct RawCorpus {
    pub maxtiles: usize,
    pub constants: ConstantTable,
    pub variables: BTreeSet<String>,
    pub scripts: Vec<ScriptSource>,
    pub instances: Vec<InstanceSource>,
    pub def: Option<DefSource>,
}

/// Tiles a definitions file gives art, animation or a voxel model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefTiles {
    /// `tilefromtexture` targets.
    pub nonempty: TileBitmap,
    /// Every tile inside an `animtilerange`.
    pub animation: TileBitmap,
    /// Tiles replaced by a `voxel` block.
    pub voxel: TileBitmap,
}

impl DefTiles {
    pub fn new(maxtiles: usize) -> Self {
        Self {
            nonempty: TileBitmap::new(maxtiles),
            animation: TileBitmap::new(maxtiles),
            voxel: TileBitmap::new(maxtiles),
        }
    }

    /// Bitmaps keyed by output file stem.
    pub fn bitmaps(&self) -> [(&'static str, &TileBitmap); 3] {
        [
            ("nonempty", &self.nonempty),
            ("animation", &self.animation),
            ("voxel_tiles", &self.voxel),
        ]
    }
}

/// Fully processed output handed to `writer`.
#[derive(Debug, Clone)]
pub struct ProcessedCorpus {
    pub actor_frames: TileBitmap,
    pub instances: BTreeMap<Category, TileBitmap>,
    /// Present when a definitions file was given.
    pub def_tiles: Option<DefTiles>,
    pub summary: SymbolSummary,
    pub unused_actions: BTreeSet<String>,
    pub diagnostics: Diagnostics,
}
