use anyhow::{Context, Result};
use convmatrix_core::synthesizer_for;
use tracing::info;

use super::resolve_config;
use crate::SourceArgs;

/// Writes the conversion program without compiling it.
pub fn run(args: &SourceArgs) -> Result<()> {
    let config = resolve_config(args.config.as_deref(), args.layer())?;
    let synthesizer = synthesizer_for(&config).context("Failed to load source template")?;
    let source = synthesizer
        .write(&config.catalog, &config.source_path)
        .with_context(|| {
            format!(
                "Failed to write conversion program: {}",
                config.source_path.display()
            )
        })?;

    info!(
        conversions = source.conversion_count(),
        "wrote conversion program"
    );
    println!("{}", config.source_path.display());
    Ok(())
}
