//! CLI argument parsing for schedtime

use crate::backend::SnapshotFile;
use crate::report::DisplayUnit;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "schedtime")]
#[command(version)]
#[command(about = "Break down where a command's wall-clock time went: on-CPU, waits, locking, I/O and page faults", long_about = None)]
pub struct Cli {
    /// Show a per-task breakdown in addition to the summary
    #[arg(short, long)]
    pub verbose: bool,

    /// Display times in milliseconds instead of seconds
    #[arg(short = 'm', long = "ms")]
    pub milliseconds: bool,

    /// Write the report to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Sort the per-task listing by KEY: lifetime, comm, tid, oncpu, disk-io,
    /// page-faults, network-io, kernel-locking, involuntary-preempt,
    /// userspace-locking, voluntary-wait
    #[arg(short, long, value_name = "KEY", requires = "verbose")]
    pub sort: Option<String>,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Snapshot file written by the in-kernel collector
    #[arg(long, value_name = "FILE", default_value = SnapshotFile::DEFAULT_PATH)]
    pub snapshot: PathBuf,

    /// Analyze a saved snapshot instead of running a command
    #[arg(long, value_name = "FILE", conflicts_with = "command")]
    pub replay: Option<PathBuf>,

    /// Load the stack classification table from a TOML file
    #[arg(long, value_name = "FILE")]
    pub table: Option<PathBuf>,

    /// Resolve raw stack addresses with this kallsyms file
    #[arg(long, value_name = "FILE")]
    pub kallsyms: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(long)]
    pub debug: bool,

    /// Command to trace (everything after --)
    #[arg(last = true)]
    pub command: Option<Vec<String>>,
}

impl Cli {
    pub fn unit(&self) -> DisplayUnit {
        if self.milliseconds {
            DisplayUnit::Milliseconds
        } else {
            DisplayUnit::Seconds
        }
    }

    /// Sort key for the per-task listing; `None` when not verbose
    pub fn listing(&self) -> Option<&str> {
        self.verbose
            .then(|| self.sort.as_deref().unwrap_or("lifetime"))
    }
}
