//! CLI argument parsing for lapstat

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::collector::PairingPolicy;
use crate::report::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "lapstat")]
#[command(version)]
#[command(about = "Checkpoint profiler: replay recorded traces or run the demo workload", long_about = None)]
pub struct Cli {
    /// Enable debug tracing output on stderr
    #[arg(long, global = true)]
    pub debug: bool,

    /// Read profiler settings from a TOML file (LAPSTAT_* variables still apply on top)
    #[arg(long = "config", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Aggregate a saved checkpoint trace and print the report
    Replay {
        /// Trace file written by `lapstat demo --trace-out` or `CheckpointTrace::save`
        #[arg(value_name = "TRACE")]
        trace: PathBuf,

        /// Output format
        #[arg(long = "format", value_enum)]
        format: Option<OutputFormat>,
    },

    /// Run the built-in instrumented workload and report on it
    Demo {
        /// Iterations of the inner loop
        #[arg(short = 'n', long = "iterations", default_value = "200")]
        iterations: u32,

        /// Pairing policy
        #[arg(long = "policy", value_enum)]
        policy: Option<PairingPolicy>,

        /// Output format
        #[arg(long = "format", value_enum)]
        format: Option<OutputFormat>,

        /// Also save the report under this directory
        #[arg(long = "log-dir", value_name = "DIR")]
        log_dir: Option<PathBuf>,

        /// Save the raw checkpoint trace to this file (implies batch replay)
        #[arg(long = "trace-out", value_name = "FILE")]
        trace_out: Option<PathBuf>,
    },
}
