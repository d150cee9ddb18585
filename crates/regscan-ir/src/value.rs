//! Instruction operands and constant expressions.

use crate::instr::{BinOp, CastOp};
use crate::types::Type;

/// An instruction operand.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    /// Integer constant, zero-extended from its bit width.
    Int { bits: u32, value: u64 },
    /// `null` pointer.
    Null,
    /// `undef` or `poison`.
    Undef,
    /// Function-local SSA value or parameter (`%name`).
    Local(String),
    /// Global variable or function (`@name`).
    Global(String),
    /// Constant cast expression (`inttoptr (i32 1074855936 to ptr)`).
    ConstCast { op: CastOp, value: Box<Operand> },
    /// Constant `getelementptr (...)` expression.
    ConstGep(Box<GepExpr>),
    /// Constant binary expression (`or (i32 2, i32 4)`).
    ConstBinary {
        op: BinOp,
        lhs: Box<Operand>,
        rhs: Box<Operand>,
    },
    /// Anything the analysis does not model (metadata, aggregates, floats).
    Other(String),
}

impl Operand {
    /// Create an integer constant of the given width, truncating `value`.
    pub fn int(bits: u32, value: u64) -> Self {
        Self::Int {
            bits,
            value: value & width_mask(bits),
        }
    }

    /// Constant integer value, if this is an integer constant.
    pub fn as_const_int(&self) -> Option<u64> {
        match self {
            Self::Int { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// Local value name, if this is a local.
    pub fn as_local(&self) -> Option<&str> {
        match self {
            Self::Local(name) => Some(name),
            _ => None,
        }
    }

    /// Global name, if this is a global reference.
    pub fn as_global(&self) -> Option<&str> {
        match self {
            Self::Global(name) => Some(name),
            _ => None,
        }
    }
}

/// `getelementptr` address computation (instruction or constant expression).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GepExpr {
    /// Source element type.
    pub source_ty: Type,
    /// Base pointer.
    pub base: Operand,
    /// Index operands in order.
    pub indices: Vec<Operand>,
}

impl GepExpr {
    /// Number of operands as LLVM counts them (base pointer + indices).
    pub fn num_operands(&self) -> usize {
        self.indices.len() + 1
    }

    /// Operand by LLVM operand number (0 is the base pointer).
    pub fn operand(&self, i: usize) -> Option<&Operand> {
        match i {
            0 => Some(&self.base),
            _ => self.indices.get(i - 1),
        }
    }
}

/// Mask selecting the low `bits` bits.
pub fn width_mask(bits: u32) -> u64 {
    if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 }
}
