//! IR types.

use std::fmt;

/// First-class IR type, reduced to what the analysis needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Type {
    /// Integer type with bit width (`i1`, `i8`, `i32`, ...).
    Int(u32),
    /// Pointer (opaque `ptr` or typed `T*`).
    Ptr,
    /// `void`.
    Void,
    /// Named type (`%struct.XSPI_Type`).
    Named(String),
    /// Anything else (floats, vectors, aggregates).
    Other(String),
}

impl Type {
    /// Integer bit width, if this is an integer type.
    pub fn int_width(&self) -> Option<u32> {
        match self {
            Self::Int(bits) => Some(*bits),
            _ => None,
        }
    }

    /// Check if this is a pointer type.
    pub fn is_ptr(&self) -> bool {
        matches!(self, Self::Ptr)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(bits) => write!(f, "i{bits}"),
            Self::Ptr => f.write_str("ptr"),
            Self::Void => f.write_str("void"),
            Self::Named(name) => write!(f, "%{name}"),
            Self::Other(text) => f.write_str(text),
        }
    }
}
