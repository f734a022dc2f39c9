//! Go source synthesis.
//!
//! The generated program declares one package-level struct `p` with a field
//! per catalog entry (named after its own type) and converts every field to
//! every catalog type. Package-level variables are exempt from Go's
//! unused-variable check, so the only errors the compiler can raise are
//! conversion errors.

use crate::catalog::Catalog;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Name of the package-level variable holding one zero value per type.
pub const RECEIVER: &str = "p";

pub const GENERATOR_PLACEHOLDER: &str = "{{generator}}";
pub const FIELDS_PLACEHOLDER: &str = "{{fields}}";
pub const CONVERSIONS_PLACEHOLDER: &str = "{{conversions}}";

const BUILTIN_TEMPLATE: &str = "\
// Code generated by {{generator}}; DO NOT EDIT.

package main

var p struct {
{{fields}}}

func main() {
{{conversions}}}
";

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("failed to read source template '{path}': {source}")]
    TemplateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("source template '{path}' is missing the {placeholder} placeholder")]
    MissingPlaceholder {
        path: PathBuf,
        placeholder: &'static str,
    },
    #[error("failed to create output directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write generated source '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Text layout the generated declarations are spliced into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTemplate {
    text: String,
}

impl SourceTemplate {
    pub fn builtin() -> Self {
        Self {
            text: BUILTIN_TEMPLATE.to_string(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, SynthesisError> {
        let text = fs::read_to_string(path).map_err(|source| SynthesisError::TemplateRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(text, path)
    }

    /// Validates that `text` carries every placeholder. `origin` is only used
    /// for error reporting.
    pub fn parse(text: impl Into<String>, origin: &Path) -> Result<Self, SynthesisError> {
        let text = text.into();
        for placeholder in [
            GENERATOR_PLACEHOLDER,
            FIELDS_PLACEHOLDER,
            CONVERSIONS_PLACEHOLDER,
        ] {
            if !text.contains(placeholder) {
                return Err(SynthesisError::MissingPlaceholder {
                    path: origin.to_path_buf(),
                    placeholder,
                });
            }
        }
        Ok(Self { text })
    }

    fn render(&self, generator: &str, fields: &str, conversions: &str) -> String {
        self.text
            .replace(GENERATOR_PLACEHOLDER, generator)
            .replace(FIELDS_PLACEHOLDER, fields)
            .replace(CONVERSIONS_PLACEHOLDER, conversions)
    }
}

impl Default for SourceTemplate {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Program text produced for one catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedSource {
    text: String,
    conversions: usize,
}

impl SynthesizedSource {
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of conversion statements in the program.
    pub fn conversion_count(&self) -> usize {
        self.conversions
    }

    /// Writes the program to `path`, replacing any previous content and
    /// creating missing parent directories.
    pub fn write_to(&self, path: &Path) -> Result<(), SynthesisError> {
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| SynthesisError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, &self.text).map_err(|source| SynthesisError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), bytes = self.text.len(), "wrote generated source");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Synthesizer {
    generator: String,
    template: SourceTemplate,
}

impl Synthesizer {
    /// `generator` is written into the "Code generated by" header.
    pub fn new(generator: impl Into<String>) -> Self {
        Self {
            generator: generator.into(),
            template: SourceTemplate::builtin(),
        }
    }

    pub fn with_template(mut self, template: SourceTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn render(&self, catalog: &Catalog) -> SynthesizedSource {
        let mut fields = String::new();
        for ty in catalog.types() {
            let _ = writeln!(fields, "\t{ty} {ty}");
        }

        let mut conversions = String::new();
        let mut count = 0usize;
        for (index, from) in catalog.types().iter().enumerate() {
            if index > 0 {
                conversions.push('\n');
            }
            let _ = writeln!(conversions, "\t// {from}");
            for to in catalog.types() {
                let _ = writeln!(conversions, "\t_ = {to}({RECEIVER}.{from})");
                count += 1;
            }
        }

        SynthesizedSource {
            text: self.template.render(&self.generator, &fields, &conversions),
            conversions: count,
        }
    }

    /// Renders the program and writes it to `path`.
    pub fn write(
        &self,
        catalog: &Catalog,
        path: &Path,
    ) -> Result<SynthesizedSource, SynthesisError> {
        let source = self.render(catalog);
        source.write_to(path)?;
        Ok(source)
    }
}
