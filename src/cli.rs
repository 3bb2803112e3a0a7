// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::config::loader::DEFAULT_SNAPSHOT_PATH;

/// Command-line arguments for `stagegate`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "stagegate",
    version,
    about = "Process CI pipeline snapshots: stage gating, execution policies and approval gates.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the pipeline snapshot (TOML).
    #[arg(long, value_name = "PATH", default_value = DEFAULT_SNAPSHOT_PATH)]
    pub pipeline: String,

    /// Parse + validate, print stages, jobs and edges, but don't process.
    #[arg(long)]
    pub dry_run: bool,

    /// Cancel every non-terminal job and print the updates.
    #[arg(long, conflicts_with = "simulate")]
    pub cancel: bool,

    /// Drive the pipeline until it settles, using a simulated runner.
    #[arg(long)]
    pub simulate: bool,

    /// Job the simulated runner reports as failed. Repeatable.
    #[arg(long = "fail", value_name = "NAME", requires = "simulate")]
    pub fail: Vec<String>,

    /// Simulated job duration in milliseconds.
    #[arg(long, value_name = "MS", default_value_t = 50)]
    pub job_delay_ms: u64,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `STAGEGATE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    #[value(alias = "warning")]
    Warn,
    Info,
    Debug,
    Trace,
}

pub fn parse() -> CliArgs {
    CliArgs::parse()
}
