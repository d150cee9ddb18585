//! Constant folding of stored values and bit-effect analysis.

use regscan_ir::{BinOp, Function, InstKind, Operand, width_mask};

use crate::access::full_width_bits;

/// A binary operation feeding a store, with operands in source order.
struct BitOp<'a> {
    op: BinOp,
    lhs: &'a Operand,
    rhs: &'a Operand,
}

/// Find the binary operation that defines `value`, as an instruction or a
/// constant expression.
fn defining_binary<'a>(func: &'a Function, value: &'a Operand) -> Option<BitOp<'a>> {
    match value {
        Operand::ConstBinary { op, lhs, rhs } => Some(BitOp { op: *op, lhs, rhs }),
        Operand::Local(name) => match &func.defining_instruction(name)?.kind {
            InstKind::Binary { op, lhs, rhs, .. } => Some(BitOp { op: *op, lhs, rhs }),
            _ => None,
        },
        _ => None,
    }
}

/// Fold two constants under a bitwise operator.
fn fold(op: BinOp, a: u64, b: u64) -> Option<u64> {
    match op {
        BinOp::Or => Some(a | b),
        BinOp::And => Some(a & b),
        BinOp::Xor => Some(a ^ b),
        _ => None,
    }
}

/// Constant value of `value` if it is a literal or a two-constant `or`/`and`.
pub fn extract_constant(func: &Function, value: &Operand) -> Option<u64> {
    if let Some(v) = value.as_const_int() {
        return Some(v);
    }
    let bin = defining_binary(func, value)?;
    if !matches!(bin.op, BinOp::Or | BinOp::And) {
        return None;
    }
    fold(bin.op, bin.lhs.as_const_int()?, bin.rhs.as_const_int()?)
}

/// Bit names touched by storing `value` into a `data_size`-bit register.
///
/// `or`/`xor` with a constant mask report the mask bits, `and` reports the
/// bits cleared by the mask. Anything else gets the full-width label.
pub fn bits_modified(func: &Function, value: &Operand, data_size: u32) -> Vec<String> {
    let bits = defining_binary(func, value)
        .filter(|bin| bin.op.is_bitwise())
        .and_then(|bin| {
            let mask = bin.rhs.as_const_int().or_else(|| bin.lhs.as_const_int())?;
            let affected = match bin.op {
                BinOp::And => !mask,
                _ => mask,
            } & width_mask(data_size);
            Some(
                (0..data_size)
                    .filter(|i| affected & (1u64 << i) != 0)
                    .map(|i| format!("bit_{i}"))
                    .collect::<Vec<_>>(),
            )
        })
        .unwrap_or_default();

    if bits.is_empty() {
        vec![full_width_bits(data_size)]
    } else {
        bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regscan_ir::parse_module;

    const MODULE: &str = r"
define void @f(i32 %x) {
  %a = or i32 %x, 6
  %b = and i32 %x, -2
  %c = xor i32 128, %x
  %d = or i32 2, 4
  %e = add i32 %x, 1
  %g = or i32 %x, 0
  ret void
}
";

    fn with_function(check: impl FnOnce(&Function)) {
        let module = parse_module(MODULE, "v.ll").unwrap();
        check(module.function("f").unwrap());
    }

    #[test]
    fn test_bits_modified() {
        with_function(|f| {
            let local = |n: &str| Operand::Local(n.into());
            assert_eq!(bits_modified(f, &local("a"), 32), vec!["bit_1", "bit_2"]);
            assert_eq!(bits_modified(f, &local("b"), 32), vec!["bit_0"]);
            assert_eq!(bits_modified(f, &local("c"), 32), vec!["bit_7"]);
            assert_eq!(bits_modified(f, &local("e"), 32), vec!["bit_0-31"]);
            assert_eq!(bits_modified(f, &local("g"), 32), vec!["bit_0-31"]);
            assert_eq!(bits_modified(f, &Operand::int(32, 5), 16), vec!["bit_0-15"]);
        });
    }

    #[test]
    fn test_extract_constant() {
        with_function(|f| {
            assert_eq!(extract_constant(f, &Operand::int(32, 9)), Some(9));
            assert_eq!(extract_constant(f, &Operand::Local("d".into())), Some(6));
            assert_eq!(extract_constant(f, &Operand::Local("a".into())), None);
            assert_eq!(extract_constant(f, &Operand::Local("x".into())), None);
            let expr = Operand::ConstBinary {
                op: BinOp::And,
                lhs: Box::new(Operand::int(32, 0xFF)),
                rhs: Box::new(Operand::int(32, 0x0F)),
            };
            assert_eq!(extract_constant(f, &expr), Some(0x0F));
        });
    }
}
