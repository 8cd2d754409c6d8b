//! Arguments and setup shared by every subcommand.

use camino::Utf8PathBuf;
use clap::{Args, ValueEnum};
use healthdeck::Result;
use healthdeck::collectors::dashboard::Dashboard;
use healthdeck::config::Config;

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    None,
    /// Only error messages
    Error,
    /// Warning and error messages
    Warn,
    /// Info, warning, and error messages
    Info,
    /// Debug and above messages
    Debug,
    /// All messages including trace
    Trace,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Root of the project being inspected
    #[arg(long, value_name = "PATH", default_value = ".", global = true)]
    pub project_root: Utf8PathBuf,

    /// Path to configuration file [default: one of healthdeck.[toml|yml|yaml|json] ]
    #[arg(long, short = 'c', value_name = "PATH", global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "none", global = true)]
    pub log_level: LogLevel,
}

impl GlobalArgs {
    /// Load the configuration, printing any validation warnings
    pub fn load_config(&self) -> Result<Config> {
        let (config, warnings) = Config::load(&self.project_root, self.config.as_ref())?;
        print_warnings(&warnings);
        Ok(config)
    }

    /// A dashboard over the project root with the loaded configuration
    pub fn open_dashboard(&self) -> Result<Dashboard> {
        let config = self.load_config()?;
        Dashboard::new(&config, &self.project_root)
    }
}

pub fn print_warnings(warnings: &[String]) {
    if !warnings.is_empty() {
        eprintln!("\n⚠️  Configuration validation warnings:");
        for warning in warnings {
            eprintln!("   {warning}");
        }
        eprintln!();
    }
}

/// Initialize the logger; `RUST_LOG` overrides the requested level
pub fn init_logging(log_level: LogLevel) {
    let level = match log_level {
        LogLevel::None => return,
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };

    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(matches!(log_level, LogLevel::Debug | LogLevel::Trace))
        .init();
}
