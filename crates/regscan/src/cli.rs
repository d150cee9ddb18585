//! CLI definitions and argument types.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use regscan::{AnalysisConfig, OrderingMode, ReportKind, RunOptions};

/// Exit code for success.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for failure.
pub const EXIT_FAILURE: i32 = 1;

#[derive(Parser)]
#[command(name = "regscan")]
#[command(about = "MIMXRT700 peripheral register access analyzer for LLVM IR")]
#[command(version)]
pub struct Cli {
    /// LLVM IR files or directories containing .ll files
    #[arg(value_name = "INPUT", required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output JSON file
    #[arg(short, long, default_value = "peripheral_analysis.json")]
    pub output: PathBuf,

    /// Enable verbose output (sets RUST_LOG=debug)
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress output (only show errors)
    #[arg(short, long, conflicts_with = "verbose")]
    pub silent: bool,

    /// Export accesses in chronological execution order
    #[arg(long)]
    pub chronological: bool,

    /// Entry point function of the walk
    #[arg(long, value_name = "NAME", default_value = "main")]
    pub entry: String,

    /// Sequence numbering scheme
    #[arg(long, value_enum, default_value = "priority")]
    pub ordering: OrderingArg,

    /// Also walk functions not reachable from the entry point
    #[arg(long)]
    pub include_unreachable: bool,

    /// Do not resolve pointer arguments through call sites
    #[arg(long)]
    pub no_trace_arguments: bool,

    /// Do not walk the bodies of recognized SDK helpers
    #[arg(long)]
    pub skip_known_call_bodies: bool,

    /// Peripheral catalog JSON file (replaces the built-in MIMXRT700 catalog)
    #[arg(long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Number of parallel parse jobs (0 = auto)
    #[arg(short = 'j', long, default_value = "0")]
    pub jobs: usize,
}

/// Sequence numbering scheme.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OrderingArg {
    /// SDK call-order priority bands
    Priority,
    /// Walk discovery order
    Traversal,
}

impl From<OrderingArg> for OrderingMode {
    fn from(arg: OrderingArg) -> Self {
        match arg {
            OrderingArg::Priority => Self::Priority,
            OrderingArg::Traversal => Self::Traversal,
        }
    }
}

impl Cli {
    /// Run options described by the flags.
    pub fn run_options(&self) -> RunOptions {
        let config = AnalysisConfig::default()
            .with_entry_point(self.entry.as_str())
            .with_ordering(self.ordering.into())
            .with_unreachable(self.include_unreachable)
            .with_argument_tracing(!self.no_trace_arguments)
            .with_known_call_descent(!self.skip_known_call_bodies);

        let report = if self.chronological {
            ReportKind::Chronological
        } else {
            ReportKind::Grouped
        };
        let options = RunOptions::new()
            .with_config(config)
            .with_report(report)
            .with_jobs(self.jobs);
        match &self.catalog {
            Some(path) => options.with_catalog(path),
            None => options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["regscan", "fw.ll"]);
        assert_eq!(cli.output, PathBuf::from("peripheral_analysis.json"));
        let options = cli.run_options();
        assert_eq!(options.report, ReportKind::Grouped);
        assert_eq!(options.config.entry_point, "main");
        assert_eq!(options.config.ordering, OrderingMode::Priority);
        assert!(options.config.trace_arguments);
        assert!(options.config.descend_known_calls);
        assert!(options.catalog.is_none());
    }

    #[test]
    fn test_flags() {
        let cli = Cli::parse_from([
            "regscan",
            "a.ll",
            "dir",
            "-o",
            "out.json",
            "--chronological",
            "--entry",
            "Reset_Handler",
            "--ordering",
            "traversal",
            "--include-unreachable",
            "--skip-known-call-bodies",
            "--catalog",
            "cat.json",
            "-j",
            "4",
        ]);
        assert_eq!(cli.inputs.len(), 2);
        let options = cli.run_options();
        assert_eq!(options.report, ReportKind::Chronological);
        assert_eq!(options.config.entry_point, "Reset_Handler");
        assert_eq!(options.config.ordering, OrderingMode::Traversal);
        assert!(options.config.include_unreachable);
        assert!(!options.config.descend_known_calls);
        assert_eq!(options.catalog, Some(PathBuf::from("cat.json")));
        assert_eq!(options.jobs, 4);
    }

    #[test]
    fn test_verbose_conflicts_with_silent() {
        assert!(Cli::try_parse_from(["regscan", "a.ll", "-v", "-s"]).is_err());
    }
}
