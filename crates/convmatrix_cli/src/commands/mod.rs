pub mod catalog;
pub mod generate;
pub mod run;

use anyhow::{Context, Result};
use convmatrix_core::{ConfigLayer, ProbeConfig, CONFIG_FILE_NAME};
use std::path::Path;
use tracing::debug;

/// Resolves defaults ← config file ← `overrides`.
///
/// An explicit `--config` must exist; the implicit `./convmatrix.toml` is
/// optional.
pub fn resolve_config(config: Option<&Path>, overrides: ConfigLayer) -> Result<ProbeConfig> {
    let file = match config {
        Some(path) => ConfigLayer::load(path)
            .with_context(|| format!("Failed to load config file: {}", path.display()))?,
        None => ConfigLayer::load_optional(Path::new(CONFIG_FILE_NAME))
            .with_context(|| format!("Failed to load {}", CONFIG_FILE_NAME))?,
    };
    if !file.is_empty() {
        debug!(?file, "loaded config file layer");
    }

    ProbeConfig::from_layers([file, overrides]).context("Invalid configuration")
}
