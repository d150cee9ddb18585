//! Styled stderr output: parse spinner, status lines and summary tables.

use std::borrow::Cow;
use std::time::Duration;

use console::{StyledObject, style};
use indicatif::{ProgressBar, ProgressStyle};

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Leading mark of a status line.
#[derive(Clone, Copy, Debug)]
pub enum Mark {
    Info,
    Done,
    Failed,
    Warn,
}

impl Mark {
    fn styled(self) -> StyledObject<&'static str> {
        match self {
            Self::Info => style("→").cyan(),
            Self::Done => style("✓").green().bold(),
            Self::Failed => style("✗").red().bold(),
            Self::Warn => style("!").yellow().bold(),
        }
    }
}

/// Print one status line to stderr.
pub fn status(mark: Mark, message: &str) {
    eprintln!("{} {message}", mark.styled());
}

/// Spinner shown while input files are parsed.
pub struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(ticking) = ProgressStyle::default_spinner()
            .tick_strings(TICKS)
            .template("{spinner:.cyan} {msg}")
        {
            bar.set_style(ticking);
        }
        bar.set_message(message);
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar }
    }

    /// Spinner that draws nothing, for `--silent`.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Clear the spinner and print the outcome. Hidden spinners only report
    /// failures.
    pub fn finish(&self, mark: Mark, message: &str) {
        let hidden = self.bar.is_hidden();
        self.bar.finish_and_clear();
        if !hidden || matches!(mark, Mark::Failed) {
            status(mark, message);
        }
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

/// Print a titled table of `name: count` rows to stderr.
pub fn count_table<'a>(title: &str, rows: impl IntoIterator<Item = (&'a str, usize)>) {
    eprintln!("\n{}", style(title).bold());
    for (name, count) in rows {
        eprintln!("  {name:<16} {} {}", style(count).cyan(), style("accesses").dim());
    }
}
