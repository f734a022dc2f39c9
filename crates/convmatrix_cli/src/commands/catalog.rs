use anyhow::Result;
use convmatrix_core::ConfigLayer;
use std::io::{self, Write};
use std::path::Path;

use super::resolve_config;

/// Prints the configured catalog, one type per line.
pub fn run(config: Option<&Path>) -> Result<()> {
    let config = resolve_config(config, ConfigLayer::default())?;
    let mut out = io::stdout().lock();
    for ty in config.catalog.types() {
        writeln!(out, "{ty}")?;
    }
    Ok(())
}
