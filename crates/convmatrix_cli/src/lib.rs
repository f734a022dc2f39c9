// convmatrix_cli - CLI functionality (library interface for testing)
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use convmatrix_core::{ConfigLayer, OutputLayer, ToolchainLayer};
use std::path::PathBuf;

pub mod commands;
pub mod logging;
pub mod render;

#[derive(Parser)]
#[command(name = "convmatrix")]
#[command(about = "Asks the Go compiler which primitive conversions it accepts")]
#[command(version)]
pub struct Cli {
    /// More log output on stderr (repeatable)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// The subcommand to execute; `run` when none was given.
    pub fn command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Run(RunArgs::default()))
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Generate the conversion program, compile it and print the matrix
    Run(RunArgs),
    /// Only write the conversion program
    Generate(SourceArgs),
    /// List the configured primitive types in order
    Catalog {
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One section per source type
    #[default]
    Text,
    /// A from × to grid
    Table,
    /// Machine-readable report
    Json,
}

/// Options shared by every command that writes the conversion program.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceArgs {
    /// Config file (defaults to ./convmatrix.toml when present)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Where to write the generated Go source
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Custom source template with {{generator}}, {{fields}} and {{conversions}}
    #[arg(long, value_name = "PATH")]
    pub template: Option<PathBuf>,
}

impl SourceArgs {
    pub fn layer(&self) -> ConfigLayer {
        ConfigLayer {
            output: OutputLayer {
                source: self.output.clone(),
                template: self.template.clone(),
            },
            ..ConfigLayer::default()
        }
    }
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Path to the go binary
    #[arg(long, value_name = "PATH")]
    pub go: Option<PathBuf>,

    /// Exit status `go build` is expected to fail with
    #[arg(long, value_name = "CODE", allow_negative_numbers = true)]
    pub expected_exit_code: Option<i32>,

    /// Seconds to wait for the compiler; 0 waits forever
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Print yes/no instead of emoji
    #[arg(long)]
    pub ascii: bool,

    /// Fail when the compiler disagrees with the built-in conversion rules
    #[arg(long)]
    pub verify: bool,
}

impl RunArgs {
    /// The command-line configuration layer, applied over the config file.
    pub fn layer(&self) -> ConfigLayer {
        let source = self.source.layer();
        ConfigLayer {
            toolchain: ToolchainLayer {
                go: self.go.clone(),
                expected_exit_code: self.expected_exit_code,
                timeout_secs: self.timeout,
            },
            ..source
        }
    }
}
