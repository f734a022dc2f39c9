use crate::catalog::{Catalog, CatalogError};
use crate::diagnostics::{DiagnosticPattern, PatternError, CANNOT_CONVERT_MARKER};
use crate::toolchain::{DEFAULT_EXPECTED_EXIT_CODE, DEFAULT_TIMEOUT};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Config file looked up in the working directory when none is given.
pub const CONFIG_FILE_NAME: &str = "convmatrix.toml";

/// Where the generated program is written.
pub const DEFAULT_SOURCE_PATH: &str = "./output/conversions.go";

const CUSTOM_PATTERN_VERSION: &str = "custom";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid catalog: {0}")]
    Catalog(#[from] CatalogError),
    #[error("invalid diagnostic pattern: {0}")]
    Pattern(#[from] PatternError),
    #[error("expected exit code must be non-zero")]
    ZeroExitCode,
    #[error("diagnostics.{0} is set but diagnostics.pattern is not")]
    PatternFieldWithoutPattern(&'static str),
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub catalog: Catalog,
    pub source_path: PathBuf,
    pub template_path: Option<PathBuf>,
    pub go_path: Option<PathBuf>,
    pub expected_exit_code: i32,
    pub timeout: Option<Duration>,
    pub pattern: DiagnosticPattern,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            catalog: Catalog::go_primitives(),
            source_path: PathBuf::from(DEFAULT_SOURCE_PATH),
            template_path: None,
            go_path: None,
            expected_exit_code: DEFAULT_EXPECTED_EXIT_CODE,
            timeout: Some(DEFAULT_TIMEOUT),
            pattern: DiagnosticPattern::pinned(),
        }
    }
}

impl ProbeConfig {
    /// Merges `layers` in order (later layers win) over the defaults.
    pub fn from_layers<I>(layers: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = ConfigLayer>,
    {
        let merged = layers
            .into_iter()
            .fold(ConfigLayer::default(), |base, layer| base.merge(layer));
        Self::resolve(merged)
    }

    pub fn resolve(layer: ConfigLayer) -> Result<Self, ConfigError> {
        let defaults = ProbeConfig::default();

        let catalog = match layer.catalog.types {
            Some(types) => Catalog::new(types)?,
            None => defaults.catalog,
        };

        let expected_exit_code = layer
            .toolchain
            .expected_exit_code
            .unwrap_or(defaults.expected_exit_code);
        if expected_exit_code == 0 {
            return Err(ConfigError::ZeroExitCode);
        }

        let timeout = match layer.toolchain.timeout_secs {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => defaults.timeout,
        };

        let diagnostics = layer.diagnostics;
        let pattern = match diagnostics.pattern {
            Some(pattern) => DiagnosticPattern::custom(
                diagnostics
                    .version
                    .unwrap_or_else(|| CUSTOM_PATTERN_VERSION.to_string()),
                diagnostics
                    .marker
                    .unwrap_or_else(|| CANNOT_CONVERT_MARKER.to_string()),
                &pattern,
            )?,
            None => {
                if diagnostics.version.is_some() {
                    return Err(ConfigError::PatternFieldWithoutPattern("version"));
                }
                if diagnostics.marker.is_some() {
                    return Err(ConfigError::PatternFieldWithoutPattern("marker"));
                }
                defaults.pattern
            }
        };

        Ok(Self {
            catalog,
            source_path: layer.output.source.unwrap_or(defaults.source_path),
            template_path: layer.output.template,
            go_path: layer.toolchain.go,
            expected_exit_code,
            timeout,
            pattern,
        })
    }
}

/// Partial configuration: one file, or the command line.
///
/// ```toml
/// [toolchain]
/// go = "/usr/local/go/bin/go"
/// expected_exit_code = 2
/// timeout_secs = 120
///
/// [output]
/// source = "./output/conversions.go"
/// template = "./template/conversions.tmpl"
///
/// [catalog]
/// types = ["bool", "int", "string"]
///
/// [diagnostics]
/// version = "go-types-v2"
/// marker = "cannot convert"
/// pattern = 'cannot convert p\.(?P<from>\w+) \(.+\) to type (?P<to>\w+)'
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigLayer {
    pub toolchain: ToolchainLayer,
    pub output: OutputLayer,
    pub catalog: CatalogLayer,
    pub diagnostics: DiagnosticsLayer,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolchainLayer {
    pub go: Option<PathBuf>,
    pub expected_exit_code: Option<i32>,
    /// `0` disables the timeout.
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputLayer {
    pub source: Option<PathBuf>,
    pub template: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogLayer {
    pub types: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiagnosticsLayer {
    pub version: Option<String>,
    pub marker: Option<String>,
    pub pattern: Option<String>,
}

impl ConfigLayer {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents, path)
    }

    /// Loads `path` when it exists, otherwise returns an empty layer.
    pub fn load_optional(path: &Path) -> Result<Self, ConfigError> {
        if path.is_file() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(contents: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Field-wise merge; values set in `other` take precedence.
    pub fn merge(self, other: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            toolchain: ToolchainLayer {
                go: other.toolchain.go.or(self.toolchain.go),
                expected_exit_code: other
                    .toolchain
                    .expected_exit_code
                    .or(self.toolchain.expected_exit_code),
                timeout_secs: other.toolchain.timeout_secs.or(self.toolchain.timeout_secs),
            },
            output: OutputLayer {
                source: other.output.source.or(self.output.source),
                template: other.output.template.or(self.output.template),
            },
            catalog: CatalogLayer {
                types: other.catalog.types.or(self.catalog.types),
            },
            diagnostics: DiagnosticsLayer {
                version: other.diagnostics.version.or(self.diagnostics.version),
                marker: other.diagnostics.marker.or(self.diagnostics.marker),
                pattern: other.diagnostics.pattern.or(self.diagnostics.pattern),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == ConfigLayer::default()
    }
}
