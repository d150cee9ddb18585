//! LLVM IR model for peripheral register analysis.
//!
//! This crate provides a small, owned model of the textual LLVM IR that clang
//! emits for firmware, plus a line-oriented parser for it. Only the parts of
//! the IR the analysis inspects are modeled in detail; every other instruction
//! is kept as an opaque [`InstKind::Other`].

mod instr;
mod module;
mod parser;
mod types;
mod value;

pub use instr::*;
pub use module::*;
pub use parser::parse_module;
pub use types::*;
pub use value::*;

use thiserror::Error;

/// IR loading and parsing errors.
#[derive(Error, Debug)]
pub enum IrError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("LLVM bitcode is not supported, disassemble it with llvm-dis first")]
    Bitcode,
    #[error("line {line}: malformed {what}")]
    Malformed { line: usize, what: &'static str },
    #[error("line {line}: function @{name} has no closing brace")]
    UnterminatedFunction { line: usize, name: String },
}

pub type Result<T> = std::result::Result<T, IrError>;

/// Bitcode wrapper/raw magic numbers.
const BITCODE_MAGIC: [u8; 4] = [b'B', b'C', 0xC0, 0xDE];
const BITCODE_WRAPPER_MAGIC: [u8; 4] = [0xDE, 0xC0, 0x17, 0x0B];

/// Parse a module from raw file bytes.
///
/// The module name is taken from `name` (usually the file path).
pub fn parse_bytes(data: &[u8], name: &str) -> Result<Module> {
    if data.starts_with(&BITCODE_MAGIC) || data.starts_with(&BITCODE_WRAPPER_MAGIC) {
        return Err(IrError::Bitcode);
    }
    let text = String::from_utf8_lossy(data);
    parse_module(&text, name)
}

/// Read and parse a module from a file.
pub fn parse_file(path: impl AsRef<std::path::Path>) -> Result<Module> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    parse_bytes(&data, &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitcode_rejected() {
        let data = [b'B', b'C', 0xC0, 0xDE, 0x35, 0x14];
        assert!(matches!(parse_bytes(&data, "x.bc"), Err(IrError::Bitcode)));
    }

    #[test]
    fn test_empty_module() {
        let module = parse_bytes(b"; empty\n", "empty.ll").unwrap();
        assert!(module.functions().is_empty());
        assert_eq!(module.name(), "empty.ll");
    }
}
