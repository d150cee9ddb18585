//! Register access records.

use std::fmt;

use serde::{Serialize, Serializer};

/// Kind of register access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    Read,
    Write,
    #[serde(rename = "read-modify-write")]
    ReadModifyWrite,
    VolatileRead,
    VolatileWrite,
    FunctionCallRead,
    FunctionCallWrite,
}

impl AccessType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::ReadModifyWrite => "read-modify-write",
            Self::VolatileRead => "volatile_read",
            Self::VolatileWrite => "volatile_write",
            Self::FunctionCallRead => "function_call_read",
            Self::FunctionCallWrite => "function_call_write",
        }
    }

    /// Check if the access observes the register value.
    pub fn is_read(self) -> bool {
        matches!(
            self,
            Self::Read | Self::VolatileRead | Self::FunctionCallRead | Self::ReadModifyWrite
        )
    }

    /// Check if the access changes the register value.
    pub fn is_write(self) -> bool {
        matches!(
            self,
            Self::Write | Self::VolatileWrite | Self::FunctionCallWrite | Self::ReadModifyWrite
        )
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statically known or runtime-only register value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegisterValue {
    Known(u64),
    /// Not resolvable without executing the program.
    Runtime,
}

impl RegisterValue {
    pub const RUNTIME_SENTINEL: &'static str = "RUNTIME_VALUE";

    /// Known value, if any.
    pub fn known(self) -> Option<u64> {
        match self {
            Self::Known(v) => Some(v),
            Self::Runtime => None,
        }
    }
}

impl From<Option<u64>> for RegisterValue {
    fn from(value: Option<u64>) -> Self {
        value.map_or(Self::Runtime, Self::Known)
    }
}

impl fmt::Display for RegisterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(v) => write!(f, "0x{v:08x}"),
            Self::Runtime => f.write_str(Self::RUNTIME_SENTINEL),
        }
    }
}

impl Serialize for RegisterValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Coarse execution phase of an access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPhase {
    BoardInit,
    DriverInit,
    Runtime,
}

impl ExecutionPhase {
    pub const ALL: [Self; 3] = [Self::BoardInit, Self::DriverInit, Self::Runtime];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::BoardInit => "board_init",
            Self::DriverInit => "driver_init",
            Self::Runtime => "runtime",
        }
    }
}

impl fmt::Display for ExecutionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an access happens in source and IR.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Location {
    pub file: String,
    pub function: String,
    pub line: u32,
}

/// Execution order metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderInfo {
    pub sequence_number: u64,
    pub execution_phase: ExecutionPhase,
    pub execution_context: &'static str,
    /// Enclosing function name.
    pub call_stack: String,
    /// `<function>_BB_<block index>`
    pub basic_block_id: String,
    /// Position of the instruction in its block.
    pub instruction_index: usize,
}

/// One peripheral register access.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterAccess {
    pub peripheral: String,
    pub register: String,
    pub address: u64,
    pub access_type: AccessType,
    /// 8, 16 or 32.
    pub data_size: u32,
    pub bits_modified: Vec<String>,
    pub location: Location,
    pub purpose: String,
    /// `None` when the access type does not write.
    pub value_written: Option<RegisterValue>,
    /// `None` when the access type does not read.
    pub value_read: Option<RegisterValue>,
    pub order: OrderInfo,
}

/// An access before execution order is assigned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingAccess {
    pub peripheral: String,
    pub register: String,
    pub address: u64,
    pub access_type: AccessType,
    pub data_size: u32,
    pub bits_modified: Vec<String>,
    pub location: Location,
    pub purpose: String,
    pub value_written: Option<RegisterValue>,
    pub value_read: Option<RegisterValue>,
    /// Function name the sequence priority is looked up by.
    pub priority_key: String,
}

impl PendingAccess {
    /// Value fields for an access type: written values for writes, read
    /// values for reads, both for read-modify-write.
    pub fn value_fields(
        access_type: AccessType,
        written: RegisterValue,
    ) -> (Option<RegisterValue>, Option<RegisterValue>) {
        (
            access_type.is_write().then_some(written),
            access_type.is_read().then_some(RegisterValue::Runtime),
        )
    }

    pub fn into_access(self, order: OrderInfo) -> RegisterAccess {
        RegisterAccess {
            peripheral: self.peripheral,
            register: self.register,
            address: self.address,
            access_type: self.access_type,
            data_size: self.data_size,
            bits_modified: self.bits_modified,
            location: self.location,
            purpose: self.purpose,
            value_written: self.value_written,
            value_read: self.value_read,
            order,
        }
    }
}

/// Normalize an integer width to a reported data size.
pub fn normalize_data_size(bits: u32) -> u32 {
    match bits {
        1..=8 => 8,
        9..=16 => 16,
        _ => 32,
    }
}

/// Label used when no individual bits are known.
pub fn full_width_bits(data_size: u32) -> String {
    format!("bit_0-{}", data_size.saturating_sub(1))
}
