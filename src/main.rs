use anyhow::Context;
use clap::Parser;
use h2sweep::cli::Cli;
use h2sweep::{logging, output};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    logging::init(cli.verbose, cli.quiet).context("failed to install logger")?;

    match cli.execute().await {
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            output::print_error(&e.to_string());
            Ok(ExitCode::FAILURE)
        }
    }
}
