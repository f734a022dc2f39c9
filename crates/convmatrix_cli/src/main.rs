// convmatrix CLI entry point
use anyhow::Result;
use clap::Parser;

use convmatrix_cli::{commands, logging, Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    match cli.command() {
        Commands::Run(args) => commands::run::run(&args),
        Commands::Generate(args) => commands::generate::run(&args),
        Commands::Catalog { config } => commands::catalog::run(config.as_deref()),
    }
}
