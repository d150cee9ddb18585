//! Single instruction IR.

use crate::types::Type;
use crate::value::{GepExpr, Operand};

/// Source location from debug info.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceLoc {
    /// Source file name.
    pub file: String,
    /// Line number (0 when unknown).
    pub line: u32,
    /// Enclosing IR function name.
    pub function: String,
}

impl SourceLoc {
    /// Create a new source location.
    pub fn new(file: &str, line: u32, function: &str) -> Self {
        Self {
            file: file.to_string(),
            line,
            function: function.to_string(),
        }
    }

    /// Check if this is a valid source location.
    pub fn is_valid(&self) -> bool {
        !self.file.is_empty() && self.file != "unknown" && self.line > 0
    }
}

/// Binary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    UDiv,
    SDiv,
    URem,
    SRem,
    Shl,
    LShr,
    AShr,
    And,
    Or,
    Xor,
}

impl BinOp {
    /// Parse an opcode mnemonic.
    pub fn from_mnemonic(s: &str) -> Option<Self> {
        Some(match s {
            "add" => Self::Add,
            "sub" => Self::Sub,
            "mul" => Self::Mul,
            "udiv" => Self::UDiv,
            "sdiv" => Self::SDiv,
            "urem" => Self::URem,
            "srem" => Self::SRem,
            "shl" => Self::Shl,
            "lshr" => Self::LShr,
            "ashr" => Self::AShr,
            "and" => Self::And,
            "or" => Self::Or,
            "xor" => Self::Xor,
            _ => return None,
        })
    }

    /// Check if this is one of the bitwise operators (`and`, `or`, `xor`).
    pub fn is_bitwise(self) -> bool {
        matches!(self, Self::And | Self::Or | Self::Xor)
    }
}

/// Conversion operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CastOp {
    IntToPtr,
    PtrToInt,
    BitCast,
    AddrSpaceCast,
    Trunc,
    ZExt,
    SExt,
}

impl CastOp {
    /// Parse an opcode mnemonic.
    pub fn from_mnemonic(s: &str) -> Option<Self> {
        Some(match s {
            "inttoptr" => Self::IntToPtr,
            "ptrtoint" => Self::PtrToInt,
            "bitcast" => Self::BitCast,
            "addrspacecast" => Self::AddrSpaceCast,
            "trunc" => Self::Trunc,
            "zext" => Self::ZExt,
            "sext" => Self::SExt,
            _ => return None,
        })
    }
}

/// Call target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Callee {
    /// Direct call to a named function.
    Direct(String),
    /// Call through a pointer value.
    Indirect(Operand),
    /// Inline assembly.
    Asm,
}

impl Callee {
    /// Name of a directly called function.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Direct(name) => Some(name),
            _ => None,
        }
    }
}

/// Instruction kinds the analysis distinguishes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InstKind {
    Load {
        ty: Type,
        ptr: Operand,
        volatile: bool,
    },
    Store {
        ty: Type,
        value: Operand,
        ptr: Operand,
        volatile: bool,
    },
    AtomicRmw {
        op: String,
        ty: Type,
        ptr: Operand,
        value: Operand,
        volatile: bool,
    },
    CmpXchg {
        ty: Type,
        ptr: Operand,
        expected: Operand,
        new: Operand,
        volatile: bool,
    },
    Gep(GepExpr),
    Cast {
        op: CastOp,
        value: Operand,
        to: Type,
    },
    Binary {
        op: BinOp,
        ty: Type,
        lhs: Operand,
        rhs: Operand,
    },
    Call {
        callee: Callee,
        args: Vec<Operand>,
    },
    /// Any other instruction, by opcode.
    Other(String),
}

/// IR for a single instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    /// Result name, if the instruction defines a value.
    pub result: Option<String>,
    /// Instruction kind and operands.
    pub kind: InstKind,
    /// `!dbg` metadata id, if attached.
    pub dbg: Option<u32>,
    /// Resolved source location (filled in when the module is built).
    pub source_loc: Option<SourceLoc>,
}

impl Instruction {
    /// Create a new instruction without debug info.
    pub fn new(result: Option<String>, kind: InstKind) -> Self {
        Self {
            result,
            kind,
            dbg: None,
            source_loc: None,
        }
    }

    /// Pointer operand of a memory access instruction.
    pub fn pointer_operand(&self) -> Option<&Operand> {
        match &self.kind {
            InstKind::Load { ptr, .. }
            | InstKind::Store { ptr, .. }
            | InstKind::AtomicRmw { ptr, .. }
            | InstKind::CmpXchg { ptr, .. } => Some(ptr),
            _ => None,
        }
    }

    /// Check if this is a volatile memory access.
    pub fn is_volatile(&self) -> bool {
        match &self.kind {
            InstKind::Load { volatile, .. }
            | InstKind::Store { volatile, .. }
            | InstKind::AtomicRmw { volatile, .. }
            | InstKind::CmpXchg { volatile, .. } => *volatile,
            _ => false,
        }
    }

    /// Check if this is a call.
    pub fn is_call(&self) -> bool {
        matches!(self.kind, InstKind::Call { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_operand() {
        let inst = Instruction::new(
            Some("1".into()),
            InstKind::Load {
                ty: Type::Int(32),
                ptr: Operand::Local("0".into()),
                volatile: true,
            },
        );
        assert_eq!(inst.pointer_operand(), Some(&Operand::Local("0".into())));
        assert!(inst.is_volatile());
        assert!(!inst.is_call());
    }

    #[test]
    fn test_mnemonics() {
        assert_eq!(BinOp::from_mnemonic("or"), Some(BinOp::Or));
        assert!(BinOp::Xor.is_bitwise());
        assert!(!BinOp::Add.is_bitwise());
        assert_eq!(CastOp::from_mnemonic("inttoptr"), Some(CastOp::IntToPtr));
        assert_eq!(CastOp::from_mnemonic("fptoui"), None);
    }
}
