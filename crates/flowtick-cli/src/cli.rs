//! CLI argument definitions for flowtick.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `run` | Poll the flow feed and store new trades until Ctrl-C |
//! | `trades` | Query stored trades |
//! | `stats` | Whole-store counters |
//! | `symbols` | Distinct stored symbols |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--config` | `flowtick.yaml` | YAML config file |
//! | `--pretty` | `false` | Pretty-print JSON output |
//!
//! # Examples
//!
//! ```bash
//! FLOWTICK_USERNAME=me FLOWTICK_PASSWORD=secret flowtick run
//! flowtick trades --symbol SPY --option-type CALL --min-premium 100000 --pretty
//! flowtick stats
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;

/// Options flow poller with a local DuckDB store.
#[derive(Debug, Parser)]
#[command(
    name = "flowtick",
    author,
    version,
    about = "Options flow poller with a local DuckDB store"
)]
pub struct Cli {
    /// YAML config file. Defaults to ./flowtick.yaml when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and poll the flow feed until interrupted.
    Run,

    /// Query stored trades, newest first.
    ///
    /// # Examples
    ///
    ///   flowtick trades --symbol SPY --limit 20
    ///   flowtick trades --option-type PUT --color MAGENTA --unusual
    Trades(TradesArgs),

    /// Total, today, call, and put counts.
    Stats,

    /// Distinct stored symbols.
    Symbols,
}

/// Filters for the `trades` command. List flags accept comma-separated values.
#[derive(Debug, Args)]
pub struct TradesArgs {
    /// Substring match on the symbol.
    #[arg(long)]
    pub symbol: Option<String>,

    /// CALL and/or PUT.
    #[arg(long = "option-type", value_delimiter = ',')]
    pub option_types: Vec<String>,

    /// Flow colour (YELLOW, WHITE, MAGENTA).
    #[arg(long = "color", value_delimiter = ',')]
    pub colors: Vec<String>,

    /// Security type (STOCK, ETF).
    #[arg(long = "security-type", value_delimiter = ',')]
    pub security_types: Vec<String>,

    /// GICS sector names; trades without a sector are always included.
    #[arg(long = "sector", value_delimiter = ',')]
    pub sectors: Vec<String>,

    /// Bid/ask side markers.
    #[arg(long = "bid-ask", value_delimiter = ',')]
    pub bid_ask: Vec<String>,

    /// Premium thresholds; the smallest one applies.
    #[arg(long = "min-premium", value_delimiter = ',')]
    pub min_premiums: Vec<Decimal>,

    #[arg(long, default_value_t = false)]
    pub weekly: bool,

    #[arg(long, default_value_t = false)]
    pub earnings: bool,

    #[arg(long, default_value_t = false)]
    pub unusual: bool,

    #[arg(long, default_value_t = false)]
    pub ex_div: bool,

    /// Only issuers below a 750B market cap.
    #[arg(long, default_value_t = false)]
    pub below_750b: bool,

    /// Only trades created after this instant (ms since epoch).
    #[arg(long)]
    pub after: Option<i64>,

    /// Only rows with a larger store id.
    #[arg(long)]
    pub after_id: Option<i64>,

    #[arg(long, default_value_t = 100)]
    pub limit: i64,

    #[arg(long, default_value_t = 0)]
    pub offset: i64,
}
