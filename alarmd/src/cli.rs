//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// alarmd - threaded alarm scheduler
#[derive(Parser)]
#[command(
    name = "alarmd",
    about = "Schedule, change and cancel alarms from a line-oriented console",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Read alarm commands until end of input (default)
    Run {
        /// Read commands from this file instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Print the effective configuration as YAML
    Config,
}

/// Path of the log file written by `alarmd`
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("alarmd")
        .join("logs")
        .join("alarmd.log")
}
