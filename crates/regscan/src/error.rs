use std::path::PathBuf;

use thiserror::Error;

/// Analyzer errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IR error: {0}")]
    Ir(#[from] regscan_ir::IrError),
    #[error("catalog error: {0}")]
    Catalog(#[from] regscan_catalog::CatalogError),
    #[error("export error: {0}")]
    Export(#[from] regscan_analysis::ExportError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to scan input directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("failed to build parser thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("input not found: {0}")]
    MissingInput(PathBuf),
    #[error("no LLVM IR modules could be parsed")]
    NoModules,
}

pub type Result<T> = std::result::Result<T, Error>;
