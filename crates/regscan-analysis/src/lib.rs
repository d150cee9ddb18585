//! Peripheral register access analysis.
//!
//! Walks the call graph of parsed LLVM IR modules from the entry point,
//! classifies memory operations and calls to well-known SDK functions as
//! peripheral register accesses, and orders them into an estimated execution
//! sequence.

mod access;
mod classify;
mod config;
mod export;
mod known_calls;
mod order;
mod resolver;
pub mod rules;
mod session;
mod traversal;
mod values;

pub use access::*;
pub use classify::{AccessClassifier, UNKNOWN_PERIPHERAL, UNKNOWN_REGISTER, infer_family_address};
pub use config::*;
pub use export::{
    CHRONOLOGICAL_ANALYSIS_TYPE, CHRONOLOGICAL_DESCRIPTION, ExportError, chronological_json,
    grouped_json, write_chronological, write_grouped,
};
pub use known_calls::{KnownCallRecognizer, is_known_call};
pub use order::OrderTracker;
pub use resolver::*;
pub use rules::{FALLBACK_BASE, execution_context, execution_phase, priority_of, purpose};
pub use session::AnalysisSession;
pub use traversal::{FunctionKey, InstSite, Visit, walk, walk_roots};
pub use values::{bits_modified, extract_constant};
