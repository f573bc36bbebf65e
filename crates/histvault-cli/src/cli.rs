//! CLI argument definitions for histvault.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `init` | Load the lookback window for each series, replacing stored tables |
//! | `delta` | Append today's record for each series |
//! | `show` | Print a stored table |
//! | `list` | List stored series with their bounds |
//!
//! # Examples
//!
//! ```bash
//! histvault --config histvault.toml init
//! histvault --store duckdb://history.duckdb delta 000651 600036
//! histvault show 000651 --tail 5 --pretty
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Maintain a local store of daily stock history.
#[derive(Debug, Parser)]
#[command(name = "histvault", author, version, about = "Daily stock history maintainer")]
pub struct Cli {
    /// TOML config file (store, library, series, max_attempts, ...).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Store address: `duckdb://<path>`, `<path>` or `:memory:`.
    #[arg(long, global = true)]
    pub store: Option<String>,

    /// Library holding the series tables.
    #[arg(long, global = true)]
    pub library: Option<String>,

    /// Pretty-print JSON output.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch about a year of history per series and write it.
    Init(SeriesArgs),
    /// Fetch today's record per series and append it.
    Delta(SeriesArgs),
    /// Print the stored table for one series.
    Show(ShowArgs),
    /// List stored series.
    List,
}

impl Command {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Init(_) => "init",
            Self::Delta(_) => "delta",
            Self::Show(_) => "show",
            Self::List => "list",
        }
    }
}

#[derive(Debug, Args)]
pub struct SeriesArgs {
    /// Series ids; overrides the configured list when given.
    pub series: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    pub series: String,

    /// Only print the last N rows.
    #[arg(long)]
    pub tail: Option<usize>,
}
