//! Peripheral register catalog.
//!
//! A catalog maps absolute addresses and struct member indices to
//! `(peripheral, register)` names. The built-in catalog describes the
//! MIMXRT700 memory map; catalogs can also be loaded from JSON files.

mod builtin;
mod catalog;
mod file;
mod ledger;

pub use builtin::*;
pub use catalog::*;
pub use ledger::AccessLedger;

use thiserror::Error;

/// Catalog construction and loading errors.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("peripheral {peripheral}: invalid address `{value}`")]
    InvalidAddress { peripheral: String, value: String },
    #[error("duplicate peripheral {0}")]
    DuplicatePeripheral(String),
    #[error("address windows of {first} and {second} overlap")]
    OverlappingWindows { first: String, second: String },
    #[error("peripheral {peripheral}: register {register} at {address:#x} is outside its window")]
    RegisterOutsideWindow {
        peripheral: String,
        register: String,
        address: u64,
    },
}

pub type Result<T> = std::result::Result<T, CatalogError>;
