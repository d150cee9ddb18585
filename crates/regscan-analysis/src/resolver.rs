//! Pointer value to absolute address resolution.

use regscan_catalog::PeripheralCatalog;
use regscan_ir::{CastOp, Function, GepExpr, InstKind, Module, Operand, ValueDef};
use tracing::trace;

/// Maximum definition chain length followed before giving up.
const MAX_DEPTH: usize = 64;

/// Register stride assumed for struct member indices.
const REGISTER_STRIDE: i64 = 4;

/// Resolves IR values to absolute addresses. 0 means unknown.
pub struct AddressResolver<'a> {
    module: &'a Module,
    catalog: &'a PeripheralCatalog,
    trace_arguments: bool,
}

impl<'a> AddressResolver<'a> {
    pub fn new(module: &'a Module, catalog: &'a PeripheralCatalog) -> Self {
        Self {
            module,
            catalog,
            trace_arguments: true,
        }
    }

    /// Enable or disable resolving parameters through call sites.
    #[must_use]
    pub fn with_argument_tracing(mut self, enabled: bool) -> Self {
        self.trace_arguments = enabled;
        self
    }

    pub fn module(&self) -> &'a Module {
        self.module
    }

    /// Resolve `value`, evaluated inside `func`, to an address.
    pub fn resolve(&self, func: &Function, value: &Operand) -> u64 {
        self.resolve_in(func, value, self.trace_arguments, 0)
    }

    /// Resolve a constant operand (no function context).
    pub fn resolve_constant(&self, value: &Operand) -> u64 {
        self.resolve_const(value, 0)
    }

    fn resolve_in(&self, func: &Function, value: &Operand, trace_args: bool, depth: usize) -> u64 {
        if depth > MAX_DEPTH {
            return 0;
        }
        let Operand::Local(name) = value else {
            return self.resolve_const(value, depth);
        };

        match func.definition(name) {
            Some(ValueDef::Param(index)) if trace_args => self.resolve_argument(func, index),
            Some(ValueDef::Inst { block, index }) => {
                let Some(inst) = func.instruction(block, index) else {
                    return 0;
                };
                match &inst.kind {
                    InstKind::Cast { op, value, .. } if is_address_cast(*op) => {
                        self.resolve_in(func, value, trace_args, depth + 1)
                    }
                    InstKind::Gep(gep) => {
                        let base = self.resolve_in(func, &gep.base, trace_args, depth + 1);
                        if base == 0 {
                            return 0;
                        }
                        base.wrapping_add_signed(gep_offset(gep))
                    }
                    // Conflates the loaded value with the load's own address
                    InstKind::Load { ptr, .. } => self.resolve_in(func, ptr, trace_args, depth + 1),
                    _ => 0,
                }
            }
            _ => 0,
        }
    }

    fn resolve_const(&self, value: &Operand, depth: usize) -> u64 {
        if depth > MAX_DEPTH {
            return 0;
        }
        match value {
            Operand::Int { value, .. } => *value,
            Operand::ConstCast { op, value } if is_address_cast(*op) => {
                self.resolve_const(value, depth + 1)
            }
            Operand::ConstGep(gep) => {
                let base = self.resolve_const(&gep.base, depth + 1);
                if base == 0 {
                    return 0;
                }
                base.wrapping_add_signed(gep_offset(gep))
            }
            Operand::Global(name) => self
                .module
                .global(name)
                .and_then(|g| g.initializer.as_ref())
                .map_or(0, |init| self.resolve_const(init, depth + 1)),
            _ => 0,
        }
    }

    /// Trace parameter `index` of `func` one hop back through its call sites.
    fn resolve_argument(&self, func: &Function, index: usize) -> u64 {
        for &site in self.module.call_sites(&func.name) {
            let Some(InstKind::Call { args, .. }) =
                self.module.call_site_instruction(site).map(|i| &i.kind)
            else {
                continue;
            };
            let Some(arg) = args.get(index) else {
                continue;
            };
            let caller = &self.module.functions()[site.function];
            let addr = self.resolve_in(caller, arg, false, 0);
            if addr != 0 && self.catalog.is_known_peripheral_space(addr) {
                trace!(
                    "{} arg {index} resolved to {addr:#x} via {}",
                    func.name, caller.name
                );
                return addr;
            }
        }
        0
    }
}

fn is_address_cast(op: CastOp) -> bool {
    matches!(op, CastOp::IntToPtr | CastOp::BitCast | CastOp::AddrSpaceCast)
}

/// Signed value of a constant index operand.
#[allow(clippy::cast_possible_wrap)]
fn const_index(op: &Operand) -> i64 {
    match op {
        Operand::Int { bits, value } if *bits > 0 && *bits < 64 => {
            let shift = 64 - bits;
            ((*value << shift) as i64) >> shift
        }
        Operand::Int { value, .. } => *value as i64,
        _ => 0,
    }
}

/// Byte offset a GEP adds to its base.
///
/// With three or more indices the GEP is treated as struct member indexing:
/// the leading array index is skipped and the last index is scaled by the
/// register stride. Shorter GEPs are a flat sum of their constant indices.
pub fn gep_offset(gep: &GepExpr) -> i64 {
    let n = gep.num_operands();
    if n >= 4 {
        (2..n)
            .filter_map(|i| gep.operand(i))
            .enumerate()
            .map(|(k, op)| {
                let v = const_index(op);
                if k + 2 == n - 1 {
                    v.wrapping_mul(REGISTER_STRIDE)
                } else {
                    v
                }
            })
            .fold(0i64, i64::wrapping_add)
    } else {
        gep.indices.iter().map(const_index).fold(0i64, i64::wrapping_add)
    }
}

/// Struct member index of a GEP (operand 3), if present and constant.
pub fn struct_member_index(gep: &GepExpr) -> Option<u32> {
    gep.operand(3)?
        .as_const_int()
        .and_then(|v| u32::try_from(v).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use regscan_ir::{Type, parse_module};

    fn gep(indices: &[u64]) -> GepExpr {
        GepExpr {
            source_ty: Type::Named("struct.T".into()),
            base: Operand::Null,
            indices: indices.iter().map(|&v| Operand::int(32, v)).collect(),
        }
    }

    #[test]
    fn test_gep_offset_struct_member() {
        // ptr, 0, 0, 3 -> 0 + 3*4
        assert_eq!(gep_offset(&gep(&[0, 0, 3])), 12);
        // ptr, 0, 2, 3 -> 2 + 3*4
        assert_eq!(gep_offset(&gep(&[0, 2, 3])), 14);
    }

    #[test]
    fn test_gep_offset_flat() {
        assert_eq!(gep_offset(&gep(&[0, 16])), 16);
        assert_eq!(gep_offset(&gep(&[256])), 256);
        // i32 -4
        assert_eq!(gep_offset(&gep(&[0xFFFF_FFFC])), -4);
    }

    #[test]
    fn test_struct_member_index() {
        assert_eq!(struct_member_index(&gep(&[0, 0, 7])), Some(7));
        assert_eq!(struct_member_index(&gep(&[0, 0])), None);
        let mut g = gep(&[0, 0]);
        g.indices.push(Operand::Local("i".into()));
        assert_eq!(struct_member_index(&g), None);
    }

    const MODULE: &str = r"
@base = internal constant ptr inttoptr (i32 1074790400 to ptr), align 4

define internal void @write_reg(ptr noundef %0, i32 noundef %1) {
  %3 = getelementptr inbounds i8, ptr %0, i32 16
  store volatile i32 %1, ptr %3, align 4
  ret void
}

define void @via_global() {
  %1 = load ptr, ptr @base, align 4
  %2 = getelementptr inbounds i8, ptr %1, i32 4
  store volatile i32 1, ptr %2, align 4
  ret void
}

define i32 @main() {
  call void @write_reg(ptr noundef null, i32 noundef 0)
  call void @write_reg(ptr noundef inttoptr (i32 1074855936 to ptr), i32 noundef 1)
  ret i32 0
}
";

    fn store_ptr(func: &Function) -> &Operand {
        func.blocks[0]
            .instructions
            .iter()
            .find_map(|i| match &i.kind {
                InstKind::Store { ptr, .. } => Some(ptr),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_argument_tracing() {
        let module = parse_module(MODULE, "t.ll").unwrap();
        let catalog = PeripheralCatalog::mimxrt700();
        let resolver = AddressResolver::new(&module, &catalog);
        let func = module.function("write_reg").unwrap();

        // First call site passes null, second a peripheral base
        assert_eq!(resolver.resolve(func, store_ptr(func)), 0x4011_0000 + 16);

        let no_trace = AddressResolver::new(&module, &catalog).with_argument_tracing(false);
        assert_eq!(no_trace.resolve(func, store_ptr(func)), 0);
    }

    #[test]
    fn test_load_through_global() {
        let module = parse_module(MODULE, "t.ll").unwrap();
        let catalog = PeripheralCatalog::mimxrt700();
        let resolver = AddressResolver::new(&module, &catalog);
        let func = module.function("via_global").unwrap();
        assert_eq!(resolver.resolve(func, store_ptr(func)), 0x4010_0004);
    }

    #[test]
    fn test_constants() {
        let module = parse_module("", "empty.ll").unwrap();
        let catalog = PeripheralCatalog::mimxrt700();
        let resolver = AddressResolver::new(&module, &catalog);
        let cast = Operand::ConstCast {
            op: CastOp::IntToPtr,
            value: Box::new(Operand::int(32, 0xE000_ED94)),
        };
        assert_eq!(resolver.resolve_constant(&cast), 0xE000_ED94);
        assert_eq!(resolver.resolve_constant(&Operand::Null), 0);
        assert_eq!(resolver.resolve_constant(&Operand::Global("missing".into())), 0);
    }
}
