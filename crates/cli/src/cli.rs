use std::path::PathBuf;

use clap::Parser;

/// Evaluate a linear-algebra expression tree on a fatigue-scheduled worker pool.
///
/// Reads the expression from a JSON file and writes either the resulting
/// matrix or an error message to the output file.
#[derive(Parser, Debug)]
#[command(name = "lae", version, about)]
pub struct CliArgs {
    /// Number of worker threads (at least 1)
    pub threads: usize,

    /// Input JSON file holding the expression tree
    pub input: PathBuf,

    /// Output JSON file for the result or error
    pub output: PathBuf,

    /// Seed for worker fatigue factors (overrides LAE_FATIGUE_SEED)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Don't print the worker activity report
    #[arg(long)]
    pub no_report: bool,
}
