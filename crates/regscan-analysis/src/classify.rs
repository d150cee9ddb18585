//! Memory access classification.

use regscan_catalog::{CLKCTL0_BASE, GPIO0_BASE, PeripheralCatalog, RegisterRef, XSPI2_BASE};
use regscan_ir::{Function, InstKind, Instruction, Operand, Type};

use crate::access::{
    AccessType, Location, PendingAccess, RegisterValue, full_width_bits, normalize_data_size,
};
use crate::resolver::{AddressResolver, struct_member_index};
use crate::rules;
use crate::values::{bits_modified, extract_constant};

pub const UNKNOWN_PERIPHERAL: &str = "UNKNOWN_PERIPHERAL";
pub const UNKNOWN_REGISTER: &str = "UNKNOWN_REG";

/// Default base addresses for volatile accesses whose pointer did not
/// resolve, keyed by a substring of the enclosing function name.
const FAMILY_DEFAULTS: &[(&str, u64)] = &[
    ("XSPI", XSPI2_BASE),
    ("xspi", XSPI2_BASE),
    ("GPIO", GPIO0_BASE),
    ("CLOCK", CLKCTL0_BASE),
    ("clock", CLKCTL0_BASE),
];

/// Infer a peripheral base from the name of the function making the access.
pub fn infer_family_address(function: &str) -> Option<u64> {
    FAMILY_DEFAULTS
        .iter()
        .find(|(key, _)| function.contains(key))
        .map(|&(_, addr)| addr)
}

/// Width in bits of an accessed type.
pub(crate) fn type_width(ty: &Type) -> u32 {
    match ty {
        Type::Int(bits) => *bits,
        _ => 32,
    }
}

/// Source location of `inst`, with `unknown`/0 when there is no debug info.
pub(crate) fn location_of(func: &Function, inst: &Instruction) -> Location {
    inst.source_loc.as_ref().map_or_else(
        || Location {
            file: "unknown".to_string(),
            function: func.name.clone(),
            line: 0,
        },
        |loc| Location {
            file: loc.file.clone(),
            function: func.name.clone(),
            line: loc.line,
        },
    )
}

/// Operands of a memory instruction the classifier looks at.
struct MemoryOp<'a> {
    access_type: AccessType,
    ty: &'a Type,
    ptr: &'a Operand,
    volatile: bool,
    stored: Option<&'a Operand>,
}

impl<'a> MemoryOp<'a> {
    fn from_instruction(inst: &'a Instruction) -> Option<Self> {
        let op = match &inst.kind {
            InstKind::Load { ty, ptr, volatile } => Self {
                access_type: if *volatile {
                    AccessType::VolatileRead
                } else {
                    AccessType::Read
                },
                ty,
                ptr,
                volatile: *volatile,
                stored: None,
            },
            InstKind::Store {
                ty,
                value,
                ptr,
                volatile,
            } => Self {
                access_type: if *volatile {
                    AccessType::VolatileWrite
                } else {
                    AccessType::Write
                },
                ty,
                ptr,
                volatile: *volatile,
                stored: Some(value),
            },
            InstKind::AtomicRmw {
                ty, ptr, volatile, ..
            }
            | InstKind::CmpXchg {
                ty, ptr, volatile, ..
            } => Self {
                access_type: AccessType::ReadModifyWrite,
                ty,
                ptr,
                volatile: *volatile,
                stored: None,
            },
            _ => return None,
        };
        Some(op)
    }
}

/// Turns load/store/atomic instructions into access records.
pub struct AccessClassifier<'a> {
    resolver: &'a AddressResolver<'a>,
    catalog: &'a PeripheralCatalog,
}

impl<'a> AccessClassifier<'a> {
    pub fn new(resolver: &'a AddressResolver<'a>, catalog: &'a PeripheralCatalog) -> Self {
        Self { resolver, catalog }
    }

    /// Classify one instruction of `func`. Returns `None` for anything that
    /// is not a peripheral register access.
    pub fn classify(&self, func: &Function, inst: &Instruction) -> Option<PendingAccess> {
        let op = MemoryOp::from_instruction(inst)?;

        let resolved = self.resolver.resolve(func, op.ptr);
        let address = if self.catalog.is_known_peripheral_space(resolved) {
            resolved
        } else if op.volatile && resolved == 0 {
            infer_family_address(&func.name)?
        } else {
            return None;
        };

        let RegisterRef {
            peripheral,
            register,
        } = match self
            .name_by_member(func, op.ptr, address)
            .or_else(|| self.catalog.lookup_by_address(address))
        {
            Some(reg) => reg,
            // Inferred base missing from the catalog
            None if resolved == 0 => {
                RegisterRef::new(UNKNOWN_PERIPHERAL, UNKNOWN_REGISTER)
            }
            None => return None,
        };

        let data_size = normalize_data_size(type_width(op.ty));
        let bits = match op.stored {
            Some(value) => bits_modified(func, value, data_size),
            None => vec![full_width_bits(data_size)],
        };
        let written = op
            .stored
            .and_then(|value| extract_constant(func, value))
            .into();
        let (value_written, value_read) = PendingAccess::value_fields(op.access_type, written);
        let purpose = rules::purpose(&func.name, &peripheral, &register);

        Some(PendingAccess {
            peripheral,
            register,
            address,
            access_type: op.access_type,
            data_size,
            bits_modified: bits,
            location: location_of(func, inst),
            purpose,
            value_written,
            value_read,
            priority_key: func.name.clone(),
        })
    }

    /// Name a struct member access whose GEP base resolves to a peripheral.
    /// The member name is kept only if `address` belongs to that peripheral.
    fn name_by_member(&self, func: &Function, ptr: &Operand, address: u64) -> Option<RegisterRef> {
        let gep = match ptr {
            Operand::ConstGep(gep) => gep.as_ref(),
            Operand::Local(name) => match &func.defining_instruction(name)?.kind {
                InstKind::Gep(gep) => gep,
                _ => return None,
            },
            _ => return None,
        };
        let member = struct_member_index(gep)?;
        let base = self.resolver.resolve(func, &gep.base);
        if !self.catalog.is_known_peripheral_space(base) {
            return None;
        }
        self.catalog
            .lookup_by_base_and_member(base, member)
            .filter(|reg| self.catalog.owns_address(&reg.peripheral, address))
    }
}
