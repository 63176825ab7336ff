//! Kiln CLI entry point.

use clap::Parser;

use kiln_cli::cli::{Cli, Commands};
use kiln_cli::{commands, error, logger, ui};

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    logger::init_logger(cli.verbose, cli.quiet, cli.no_color);
    ui::init_colors();

    let result = match &cli.command {
        Some(Commands::Build) => commands::build::run(cli.config.as_deref()).await,
        Some(Commands::Dev) => commands::dev::run(cli.config.as_deref()).await,
        Some(Commands::Test) => commands::test::run().await,
        None => {
            commands::about();
            Ok(())
        }
    };

    result.map_err(error::miette::cli_error_to_miette)
}
