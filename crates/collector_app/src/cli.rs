use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;

use crate::logging::LogDestination;

#[derive(Debug, Parser)]
#[command(
    name = "recon-collector",
    version,
    about = "Polls job providers and forwards completed job results exactly once"
)]
pub struct Cli {
    /// Path to the RON configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: PathBuf,
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
    /// Append logs to this file in addition to stderr
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
    /// Do not log to stderr (requires --log-file to see anything)
    #[arg(long, requires = "log_file")]
    pub quiet: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Poll every configured group on the configured interval until interrupted
    Run,
    /// Run a single round over every group and exit
    Once,
    /// Print the job ids stored in a group's checkpoint
    Checkpoint {
        #[arg(long)]
        group: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

impl Cli {
    pub fn log_destination(&self) -> LogDestination {
        match (&self.log_file, self.quiet) {
            (None, _) => LogDestination::Terminal,
            (Some(path), true) => LogDestination::File(path.clone()),
            (Some(path), false) => LogDestination::Both(path.clone()),
        }
    }
}
