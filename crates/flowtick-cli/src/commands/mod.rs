mod run;
mod stats;
mod symbols;
mod trades;

use serde_json::Value;

use crate::cli::{Cli, Command};
use crate::config::AppConfig;
use crate::error::CliError;

/// Dispatch the parsed command; the returned value is printed as JSON.
pub async fn run(cli: &Cli, config: &AppConfig) -> Result<Value, CliError> {
    match &cli.command {
        Command::Run => run::run(config).await,
        Command::Trades(args) => trades::run(args, config),
        Command::Stats => stats::run(config),
        Command::Symbols => symbols::run(config),
    }
}
