//! Dump every bitmap as a raw file of `maxtiles` bytes.

use crate::model::{Category, ProcessedCorpus, TileBitmap};
use std::fs;
use std::io;
use std::path::Path;

pub const ACTOR_FRAMES: &str = "actor_frames";

pub fn emit(corpus: &ProcessedCorpus, out_dir: &Path) -> io::Result<()> {
    bitmap(&corpus.actor_frames, ACTOR_FRAMES, out_dir)?;
    for category in Category::ALL {
        // the scanner always produces all four
        if let Some(tiles) = corpus.instances.get(&category) {
            bitmap(tiles, category.stem(), out_dir)?;
        }
    }
    if let Some(def_tiles) = &corpus.def_tiles {
        for (stem, tiles) in def_tiles.bitmaps() {
            bitmap(tiles, stem, out_dir)?;
        }
    }
    Ok(())
}

fn bitmap(tiles: &TileBitmap, stem: &str, out_dir: &Path) -> io::Result<()> {
    let path = out_dir.join(format!("{stem}.bin"));
    fs::write(&path, tiles.to_bytes())?;
    tracing::info!("Wrote {} ({} marked)", path.display(), tiles.count());
    Ok(())
}
