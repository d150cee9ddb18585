//! Command execution.

use regscan::{AnalysisSession, Error, ExecutionPhase, ReportKind, RunSummary};
use tracing::error;

use crate::cli::{Cli, EXIT_FAILURE, EXIT_SUCCESS};
use crate::terminal::{self, Mark, Spinner};

/// Run the analyzer and return the process exit code.
pub fn run_command(cli: &Cli) -> i32 {
    let options = cli.run_options();

    let spinner = if cli.silent {
        Spinner::hidden()
    } else {
        Spinner::new(format!("Analyzing {} input(s)", cli.inputs.len()))
    };
    let (session, summary) = match regscan::run(&cli.inputs, &cli.output, &options) {
        Ok(outcome) => outcome,
        Err(Error::NoModules) => {
            spinner.finish(Mark::Failed, "No LLVM IR modules could be parsed");
            return EXIT_FAILURE;
        }
        Err(e) => {
            spinner.finish(Mark::Failed, &format!("Analysis failed: {e}"));
            error!(error = %e, output = %cli.output.display(), "analysis failed");
            return EXIT_FAILURE;
        }
    };
    spinner.finish(Mark::Done, &format!(
        "Parsed {}/{} module(s)",
        summary.modules_parsed,
        summary.modules_parsed + summary.modules_failed
    ));

    if summary.modules_failed > 0 && !cli.silent {
        terminal::status(
            Mark::Warn,
            &format!("Skipped {} module(s) that failed to parse", summary.modules_failed),
        );
    }
    if cli.verbose {
        print_summary(&session, &summary, options.report);
    }
    if !cli.silent {
        let order = match options.report {
            ReportKind::Grouped => "",
            ReportKind::Chronological => " (chronological order)",
        };
        terminal::status(Mark::Done, &format!(
            "Wrote {} access(es) to {}{order}",
            session.accesses().len(),
            cli.output.display()
        ));
    }
    EXIT_SUCCESS
}

/// Per-peripheral and per-phase access counts.
fn print_summary(session: &AnalysisSession, summary: &RunSummary, report: ReportKind) {
    terminal::status(Mark::Info, &format!(
        "Found {} peripheral register accesses in {} module(s)",
        summary.accesses, summary.modules_parsed
    ));

    let mut peripherals: Vec<(&str, usize)> = Vec::new();
    for access in session.accesses() {
        match peripherals.iter_mut().find(|(name, _)| *name == access.peripheral) {
            Some((_, count)) => *count += 1,
            None => peripherals.push((access.peripheral.as_str(), 1)),
        }
    }
    terminal::count_table("Access summary by peripheral:", peripherals);

    if report == ReportKind::Chronological {
        let phases = ExecutionPhase::ALL.map(|phase| {
            let count = session
                .accesses()
                .iter()
                .filter(|a| a.order.execution_phase == phase)
                .count();
            (phase.as_str(), count)
        });
        terminal::count_table("Access summary by execution phase:", phases);
    }
    eprintln!();
}
