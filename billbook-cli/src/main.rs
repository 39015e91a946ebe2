//! Billbook CLI entry point.

use billbook_cli::app::App;
use billbook_cli::command::Cli;
use billbook_cli::config::CliConfig;
use billbook_cli::error::CliError;
use billbook_cli::logging;
use clap::Parser;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(output) => {
            print!("{}", output);
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<String, CliError> {
    let cli = Cli::parse();
    let config = CliConfig::load(cli.config.as_deref())?;
    if let Err(err) = logging::init_tracing(config.log_format) {
        eprintln!("warning: {}", err);
    }

    let mut app = App::open(config)?;
    let output = app.run(cli.command).await?;
    tracing::debug!(stats = ?app.reads().store().stats(), "cache usage");
    Ok(output)
}
