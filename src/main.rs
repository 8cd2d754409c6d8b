//! Collects project health signals for a development dashboard.
//!
//! # Overview
//!
//! `healthdeck` gathers signals about a Rails-style codebase and keeps the latest result of each
//! one on disk, where a dashboard front end can read it. The signals are:
//!
//! - dependency vulnerabilities, from the audit tool
//! - style offenses, from the lint tool
//! - test coverage, from the coverage result file
//! - TODO, FIXME, HACK, NOTE, and BUG markers in the source tree
//! - size and growth of the log files
//! - request timings, tailed from the development request log
//! - registry metadata for every locked package
//!
//! Each collector publishes a summary card into `summary.json` inside the data directory
//! (`.healthdeck/` by default) and caches its detail payload next to it.
//!
//! # Usage
//!
//! **Refresh every collector and print the cards:**
//! ```bash
//! healthdeck refresh
//! healthdeck refresh --force --json
//! ```
//!
//! **Print what was collected last time:**
//! ```bash
//! healthdeck summary
//! ```
//!
//! **Print one collector's full payload:**
//! ```bash
//! healthdeck detail coverage
//! healthdeck detail todos
//! ```
//!
//! **Empty a log file in place:**
//! ```bash
//! healthdeck truncate-log development
//! ```
//!
//! **Follow the request log:**
//! ```bash
//! healthdeck watch --interval 30
//! ```
//!
//! # Configuration
//!
//! All settings are optional. `healthdeck init` writes the defaults, with comments, to
//! `healthdeck.yml`; `healthdeck validate` checks a configuration file and reports settings that
//! are legal but suspicious.
//!
//! ```yaml
//! logs:
//!   warning_mb: 500
//!   danger_mb: 1024
//!
//! performance:
//!   retention_days: 3
//! ```
//!
//! # Diagnostics
//!
//! `--log-level debug` shows cache hits and misses per collector; `RUST_LOG` overrides the
//! level.

use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, Subcommand};
use healthdeck::Result;

mod commands;

use crate::commands::{
    DetailArgs, GlobalArgs, InitArgs, RefreshArgs, SummaryArgs, TruncateArgs, WatchArgs, detail, init_config, init_logging, refresh,
    summary, truncate_log, validate_config, watch,
};

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "healthdeck", version, about)]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Refresh every collector and print the summary cards
    Refresh(RefreshArgs),
    /// Print the stored summary cards
    Summary(SummaryArgs),
    /// Print one collector's detail payload as JSON
    Detail(DetailArgs),
    /// Truncate a log file in the log directory
    TruncateLog(TruncateArgs),
    /// Tail the request log on an interval
    Watch(WatchArgs),
    /// Generate a default configuration file
    Init(InitArgs),
    /// Validate a configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.global.log_level);

    match &cli.command {
        Command::Refresh(args) => refresh(&cli.global, args).await,
        Command::Summary(args) => summary(&cli.global, args),
        Command::Detail(args) => detail(&cli.global, args).await,
        Command::TruncateLog(args) => truncate_log(&cli.global, args).await,
        Command::Watch(args) => watch(&cli.global, args).await,
        Command::Init(args) => init_config(args),
        Command::Validate => validate_config(&cli.global),
    }
}
