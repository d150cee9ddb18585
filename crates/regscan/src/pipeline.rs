//! High-level pipeline: input discovery, parallel parsing, analysis, export.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use regscan_analysis::{AnalysisConfig, AnalysisSession};
use regscan_catalog::PeripheralCatalog;
use regscan_ir::Module;
use tracing::{debug, info, info_span, warn};
use walkdir::WalkDir;

use crate::{Error, Result};

/// File extension of textual LLVM IR.
pub const IR_EXTENSION: &str = "ll";

/// Report layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReportKind {
    /// Accesses grouped per peripheral.
    #[default]
    Grouped,
    /// Accesses in estimated execution order.
    Chronological,
}

/// Options for an end-to-end analysis run.
#[derive(Clone, Debug)]
pub struct RunOptions {
    pub config: AnalysisConfig,
    pub report: ReportKind,
    /// Catalog file replacing the built-in MIMXRT700 catalog.
    pub catalog: Option<PathBuf>,
    /// Parser threads (0 = auto).
    pub jobs: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            config: AnalysisConfig::default(),
            report: ReportKind::Grouped,
            catalog: None,
            jobs: 0,
        }
    }
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_report(mut self, report: ReportKind) -> Self {
        self.report = report;
        self
    }

    #[must_use]
    pub fn with_catalog(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalog = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }
}

/// One input file and its parse outcome.
#[derive(Debug)]
pub struct ParsedInput {
    pub path: PathBuf,
    pub module: regscan_ir::Result<Module>,
}

/// Outcome of [`analyze_inputs`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub modules_parsed: usize,
    pub modules_failed: usize,
    pub accesses: usize,
}

/// Expand `inputs` into IR files. Directories are scanned recursively for
/// `.ll` files in sorted order; plain files are taken as given.
pub fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found = Vec::new();
            for entry in WalkDir::new(input).follow_links(true).sort_by_file_name() {
                let entry = entry?;
                let path = entry.path();
                if entry.file_type().is_file()
                    && path.extension().is_some_and(|ext| ext == IR_EXTENSION)
                {
                    found.push(path.to_path_buf());
                }
            }
            debug!(dir = %input.display(), files = found.len(), "scanned input directory");
            files.extend(found);
        } else if input.exists() {
            files.push(input.clone());
        } else {
            return Err(Error::MissingInput(input.clone()));
        }
    }
    Ok(files)
}

/// Parse every file on a dedicated rayon pool. Results keep input order.
pub fn parse_inputs(paths: &[PathBuf], jobs: usize) -> Result<Vec<ParsedInput>> {
    let _span = info_span!("parse_inputs").entered();
    let threads = if jobs == 0 { num_cpus::get() } else { jobs };
    debug!(files = paths.len(), threads, "parsing inputs");

    let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
    let parsed: Vec<ParsedInput> = pool.install(|| {
        paths
            .par_iter()
            .map(|path| ParsedInput {
                path: path.clone(),
                module: regscan_ir::parse_file(path),
            })
            .collect()
    });
    Ok(parsed)
}

/// Load the catalog named by `path`, or the built-in one.
pub fn load_catalog(path: Option<&Path>) -> Result<PeripheralCatalog> {
    match path {
        Some(path) => {
            let catalog = PeripheralCatalog::from_json_file(path)?;
            info!(path = %path.display(), peripherals = catalog.peripherals().len(), "loaded catalog");
            Ok(catalog)
        }
        None => Ok(PeripheralCatalog::mimxrt700()),
    }
}

/// Analyze parsed inputs in order against `session`. Inputs that failed to
/// parse are skipped with a warning.
pub fn analyze_inputs(session: &mut AnalysisSession, inputs: &[ParsedInput]) -> RunSummary {
    let mut summary = RunSummary::default();
    for input in inputs {
        match &input.module {
            Ok(module) => {
                summary.modules_parsed += 1;
                summary.accesses += session.analyze_module(module);
            }
            Err(e) => {
                summary.modules_failed += 1;
                warn!(path = %input.path.display(), error = %e, "skipping module");
            }
        }
    }
    debug!(
        parsed = summary.modules_parsed,
        failed = summary.modules_failed,
        accesses = summary.accesses,
        "analysis complete"
    );
    summary
}

/// Write the report selected by `kind` to `output`.
pub fn export(session: &AnalysisSession, kind: ReportKind, output: &Path) -> Result<()> {
    match kind {
        ReportKind::Grouped => regscan_analysis::write_grouped(session, output)?,
        ReportKind::Chronological => regscan_analysis::write_chronological(session, output)?,
    }
    Ok(())
}

/// Run the whole pipeline: discover, parse, analyze and export.
///
/// Fails with [`Error::NoModules`] when no input parsed; the report is not
/// written in that case.
pub fn run(inputs: &[PathBuf], output: &Path, options: &RunOptions) -> Result<(AnalysisSession, RunSummary)> {
    let catalog = load_catalog(options.catalog.as_deref())?;
    let files = collect_inputs(inputs)?;
    info!(files = files.len(), "collected inputs");
    let parsed = parse_inputs(&files, options.jobs)?;

    let mut session = AnalysisSession::new(options.config.clone(), catalog);
    let summary = analyze_inputs(&mut session, &parsed);
    if summary.modules_parsed == 0 {
        return Err(Error::NoModules);
    }
    export(&session, options.report, output)?;
    Ok((session, summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_inputs_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("b.ll"), "").unwrap();
        std::fs::write(dir.path().join("a.ll"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        std::fs::write(dir.path().join("sub").join("c.ll"), "").unwrap();

        let files = collect_inputs(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![PathBuf::from("a.ll"), PathBuf::from("b.ll"), PathBuf::from("sub/c.ll")]
        );
    }

    #[test]
    fn test_missing_input() {
        let err = collect_inputs(&[PathBuf::from("/nonexistent/x.ll")]).unwrap_err();
        assert!(matches!(err, Error::MissingInput(_)));
    }

    #[test]
    fn test_failed_parse_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.ll");
        let bad = dir.path().join("bad.bc");
        std::fs::write(&good, "define i32 @main() {\n  ret i32 0\n}\n").unwrap();
        std::fs::write(&bad, [b'B', b'C', 0xC0, 0xDE]).unwrap();

        let parsed = parse_inputs(&[bad, good], 2).unwrap();
        assert!(parsed[0].module.is_err());
        assert!(parsed[1].module.is_ok());

        let mut session = AnalysisSession::new(AnalysisConfig::default(), PeripheralCatalog::mimxrt700());
        let summary = analyze_inputs(&mut session, &parsed);
        assert_eq!(
            summary,
            RunSummary {
                modules_parsed: 1,
                modules_failed: 1,
                accesses: 0
            }
        );
    }
}
