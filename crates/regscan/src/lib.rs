//! regscan - static peripheral register access analyzer
//!
//! Reads clang-emitted LLVM IR of MIMXRT700 firmware and reports which
//! memory-mapped peripheral registers the program touches, in what order,
//! and with what statically known values.
//!
//! # Example
//!
//! ```ignore
//! use regscan::{AnalysisConfig, AnalysisSession, parse_file};
//!
//! let module = parse_file("firmware.ll")?;
//! let mut session = AnalysisSession::with_builtin_catalog(AnalysisConfig::default());
//! session.analyze_module(&module);
//! let json = regscan::chronological_json(&session)?;
//! ```

// Re-export from sub-crates
pub use regscan_analysis::{
    AccessType, AnalysisConfig, AnalysisSession, ExecutionPhase, ExportError, Location,
    OrderingMode, RegisterAccess, RegisterValue, chronological_json, grouped_json,
    write_chronological, write_grouped,
};
pub use regscan_catalog::{AccessLedger, CatalogError, PeripheralCatalog, RegisterRef};
pub use regscan_ir::{IrError, Module, parse_bytes, parse_file, parse_module};

mod error;
mod pipeline;

pub use error::{Error, Result};
pub use pipeline::*;
