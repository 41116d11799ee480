//! JoyBuild CLI: builds engine assets and maintains the content database.
//!
//! Scans a data root of models, textures, materials and shaders, writes
//! sidecar artifacts beside each source, and keeps stable identifiers for
//! every asset path.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
