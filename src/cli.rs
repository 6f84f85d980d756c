// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `digenv`.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "digenv",
    version,
    about = "Print, filter and sort environment variables in a pager.",
    long_about = "Runs `printenv | sort | $PAGER`, or `printenv | grep PATTERN... | sort | $PAGER` \
                  when arguments are given. Falls back to `more` if the pager cannot be run."
)]
pub struct CliArgs {
    /// Arguments passed verbatim to `grep`.
    ///
    /// Without any, no filter stage is run.
    #[arg(value_name = "PATTERN", trailing_var_arg = true, allow_hyphen_values = true)]
    pub patterns: Vec<String>,

    /// Pager program. Overrides the `PAGER` environment variable.
    #[arg(long, value_name = "PROGRAM")]
    pub pager: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DIGENV_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print the stages that would run, but don't launch anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
