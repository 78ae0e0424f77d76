use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Cli {
    /// Size of the tile number space; every bitmap has this many entries
    pub maxtiles: usize,
    /// Directory holding the script sources (walked recursively)
    pub scripts: PathBuf,
    /// Constant definitions, one `<ignored> NAME VALUE` record per line
    #[arg(long)]
    pub defs: PathBuf,
    /// Known variable names, one `<ignored> NAME` record per line
    #[arg(long)]
    pub vars: PathBuf,
    /// Directory holding the pre-extracted instance-line files
    #[arg(long)]
    pub instances: PathBuf,
    /// Output directory
    #[arg(long, short, default_value = "tile_stats")]
    pub output: PathBuf,
    /// Engine definitions file; adds the nonempty, animation and voxel bitmaps
    #[arg(long)]
    pub def: Option<PathBuf>,
    /// TOML file replacing the built-in instance scanner rules
    #[arg(long)]
    pub rules: Option<PathBuf>,
    /// Log per-record detail
    #[arg(long, short)]
    pub verbose: bool,
}
