// convmatrix_core - Go primitive conversion probing
mod catalog;
mod config;
pub mod diagnostics;
mod matrix;
pub mod rules;
pub mod synth;
pub mod toolchain;

pub use catalog::{Catalog, CatalogError, ConversionPair, TypeName, GO_PRIMITIVES};
pub use config::{
    CatalogLayer, ConfigError, ConfigLayer, DiagnosticsLayer, OutputLayer, ProbeConfig,
    ToolchainLayer, CONFIG_FILE_NAME, DEFAULT_SOURCE_PATH,
};
pub use diagnostics::{DiagnosticPattern, ExtractionError, FailureSet, PatternError};
pub use matrix::{ConversionMatrix, MatrixCell, MatrixRow, Verdict};
pub use synth::{SourceTemplate, SynthesisError, SynthesizedSource, Synthesizer};
pub use toolchain::{Diagnostics, GoToolchain, HarvestError};

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Name written into the generated source header.
pub const GENERATOR: &str = "convmatrix";

/// Failure of one pipeline stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),
    #[error("harvesting diagnostics failed: {0}")]
    Harvest(#[from] HarvestError),
    #[error("extracting conversion failures failed: {0}")]
    Extraction(#[from] ExtractionError),
}

impl PipelineError {
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Synthesis(_) => "synthesis",
            PipelineError::Harvest(_) => "harvest",
            PipelineError::Extraction(_) => "extraction",
        }
    }
}

/// Synthesized program together with the location it was written to.
#[derive(Debug, Clone)]
pub struct GeneratedProgram {
    pub path: PathBuf,
    pub source: SynthesizedSource,
}

/// Given a written program, report which conversions the host compiler
/// rejects.
///
/// The toolchain-backed implementation is [`GoBuildProbe`]; anything that can
/// answer the question (a recorded diagnostic stream, a rules model) can stand
/// in for it.
pub trait ConversionProbe {
    fn rejected_pairs(
        &self,
        program: &GeneratedProgram,
        catalog: &Catalog,
    ) -> Result<FailureSet, PipelineError>;
}

/// Runs `go build` and scrapes its diagnostics.
#[derive(Debug, Clone)]
pub struct GoBuildProbe {
    toolchain: GoToolchain,
    pattern: DiagnosticPattern,
}

impl GoBuildProbe {
    pub fn new(toolchain: GoToolchain, pattern: DiagnosticPattern) -> Self {
        Self { toolchain, pattern }
    }

    /// Discovers the toolchain described by `config`.
    pub fn from_config(config: &ProbeConfig) -> Result<Self, HarvestError> {
        let toolchain = GoToolchain::discover(config.go_path.as_deref())?
            .with_expected_exit_code(config.expected_exit_code)
            .with_timeout(config.timeout);
        Ok(Self::new(toolchain, config.pattern.clone()))
    }

    pub fn toolchain(&self) -> &GoToolchain {
        &self.toolchain
    }

    pub fn pattern(&self) -> &DiagnosticPattern {
        &self.pattern
    }

    /// Toolchain release, when `go version` can be read.
    pub fn toolchain_version(&self) -> Option<String> {
        match self.toolchain.version() {
            Ok(version) => Some(version),
            Err(error) => {
                warn!(%error, "could not determine Go toolchain version");
                None
            }
        }
    }
}

impl ConversionProbe for GoBuildProbe {
    fn rejected_pairs(
        &self,
        program: &GeneratedProgram,
        catalog: &Catalog,
    ) -> Result<FailureSet, PipelineError> {
        let diagnostics = self.toolchain.harvest(&program.path)?;
        let failures = diagnostics::extract_failures(&diagnostics.stderr, &self.pattern, catalog)?;
        Ok(failures)
    }
}

/// Outcome of one synthesize → compile → extract run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub program: GeneratedProgram,
    pub failures: FailureSet,
    pub matrix: ConversionMatrix,
}

/// The three stages wired together for a single catalog.
pub struct Pipeline<P> {
    catalog: Catalog,
    synthesizer: Synthesizer,
    source_path: PathBuf,
    probe: P,
}

impl<P: ConversionProbe> Pipeline<P> {
    pub fn new(catalog: Catalog, source_path: impl Into<PathBuf>, probe: P) -> Self {
        Self {
            catalog,
            synthesizer: Synthesizer::new(GENERATOR),
            source_path: source_path.into(),
            probe,
        }
    }

    pub fn with_synthesizer(mut self, synthesizer: Synthesizer) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// Writes the program without compiling it.
    pub fn generate(&self) -> Result<GeneratedProgram, PipelineError> {
        let source = self.synthesizer.write(&self.catalog, &self.source_path)?;
        info!(
            path = %self.source_path.display(),
            conversions = source.conversion_count(),
            "generated conversion source"
        );
        Ok(GeneratedProgram {
            path: self.source_path.clone(),
            source,
        })
    }

    pub fn run(&self) -> Result<PipelineOutcome, PipelineError> {
        let program = self.generate()?;
        let failures = self.probe.rejected_pairs(&program, &self.catalog)?;
        info!(
            rejected = failures.len(),
            pairs = self.catalog.pair_count(),
            "classified conversions"
        );
        let matrix = ConversionMatrix::from_failures(&self.catalog, &failures);
        Ok(PipelineOutcome {
            program,
            failures,
            matrix,
        })
    }
}

/// Builds the synthesizer for `config`, loading its custom template if any.
pub fn synthesizer_for(config: &ProbeConfig) -> Result<Synthesizer, SynthesisError> {
    let synthesizer = Synthesizer::new(GENERATOR);
    match &config.template_path {
        Some(path) => Ok(synthesizer.with_template(SourceTemplate::from_file(path)?)),
        None => Ok(synthesizer),
    }
}

#[cfg(test)]
mod tests;
