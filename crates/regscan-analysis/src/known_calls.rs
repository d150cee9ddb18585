//! Register effects of well-known SDK helper calls.
//!
//! Calls to these helpers are summarized by a single synthesized access
//! instead of walking into the helper body.

use regscan_catalog::{
    CLKCTL0_BASE, GPIO0_BASE, IOPCTL_BANKS, IOPCTL_PORT_STRIDE, MPU_BASE, PERIPHERAL_WINDOW,
    RSTCTL0_BASE, XCACHE0_BASE, XCACHE1_BASE, iopctl_register_name,
};
use regscan_ir::{Callee, Function, InstKind, Instruction, Operand};
use tracing::trace;

use crate::access::{AccessType, PendingAccess, RegisterValue, full_width_bits};
use crate::classify::location_of;
use crate::resolver::AddressResolver;
use crate::values::extract_constant;

/// Width of every synthesized access.
const CALL_DATA_SIZE: u32 = 32;

/// A fixed register written by a helper.
#[derive(Clone, Copy, Debug)]
struct Target {
    peripheral: &'static str,
    base: u64,
    offset: u64,
    register: &'static str,
}

impl Target {
    const fn new(peripheral: &'static str, base: u64, offset: u64, register: &'static str) -> Self {
        Self {
            peripheral,
            base,
            offset,
            register,
        }
    }

    const fn address(self) -> u64 {
        self.base + self.offset
    }
}

const RESET_CLEAR: Target = Target::new("RSTCTL0", RSTCTL0_BASE, 0x40, "PRSTCTLCLR0");
const MAIN_CLOCK_SELECT: Target = Target::new("CLKCTL0", CLKCTL0_BASE, 0x70, "MAINCLKSELA");
const SYSTEM_CLOCK_DIVIDER: Target = Target::new("CLKCTL0", CLKCTL0_BASE, 0x30, "SYSTEMCLKDIV");
const MPU_CTRL: Target = Target::new("MPU", MPU_BASE, 0x04, "CTRL");
const MPU_RBAR: Target = Target::new("MPU", MPU_BASE, 0x0C, "RBAR");
const MPU_MAIR0: Target = Target::new("MPU", MPU_BASE, 0x30, "MAIR0");
const XCACHE0_CCR: Target = Target::new("XCACHE0", XCACHE0_BASE, 0x00, "CCR");
const XCACHE1_CCR: Target = Target::new("XCACHE1", XCACHE1_BASE, 0x00, "CCR");
const GPIO_PDOR: Target = Target::new("GPIO0", GPIO0_BASE, 0x00, "PDOR");
const GPIO_PDIR: Target = Target::new("GPIO0", GPIO0_BASE, 0x10, "PDIR");
const GPIO_PDDR: Target = Target::new("GPIO0", GPIO0_BASE, 0x14, "PDDR");

/// MPU_CTRL bits.
const MPU_CTRL_ENABLE: u64 = 1 << 0;
const MPU_CTRL_HFNMIENA: u64 = 1 << 1;
const MPU_CTRL_PRIVDEFENA: u64 = 1 << 2;

/// Register effect of one recognized call.
#[derive(Clone, Debug)]
struct Effect {
    peripheral: String,
    register: String,
    address: u64,
    access_type: AccessType,
    value: RegisterValue,
    bits: Vec<String>,
    purpose: String,
}

impl Effect {
    fn write(target: Target, value: RegisterValue, purpose: impl Into<String>) -> Self {
        Self {
            peripheral: target.peripheral.to_string(),
            register: target.register.to_string(),
            address: target.address(),
            access_type: AccessType::FunctionCallWrite,
            value,
            bits: vec![full_width_bits(CALL_DATA_SIZE)],
            purpose: purpose.into(),
        }
    }

    fn with_bits(mut self, bits: &[&str]) -> Self {
        self.bits = bits.iter().map(|b| (*b).to_string()).collect();
        self
    }
}

/// Arguments of a recognized call, evaluated in the calling function.
struct CallArgs<'a> {
    func: &'a Function,
    args: &'a [Operand],
    resolver: &'a AddressResolver<'a>,
}

impl CallArgs<'_> {
    fn constant(&self, index: usize) -> Option<u64> {
        self.args.get(index)?.as_const_int()
    }

    /// Constant, possibly folded from a two-constant `or`/`and`.
    fn folded(&self, index: usize) -> Option<u64> {
        extract_constant(self.func, self.args.get(index)?)
    }

    fn address(&self, index: usize) -> u64 {
        self.args
            .get(index)
            .map_or(0, |arg| self.resolver.resolve(self.func, arg))
    }
}

type Handler = fn(&CallArgs<'_>) -> Option<Effect>;

/// Recognized helpers by exact callee name.
const KNOWN_CALLS: &[(&str, Handler)] = &[
    ("IOPCTL_PinMuxSet", pin_mux_set),
    ("RESET_ClearPeripheralReset", clear_peripheral_reset),
    ("CLOCK_AttachClk", attach_clock),
    ("CLOCK_SetClkDiv", set_clock_divider),
    ("ARM_MPU_SetRegion", mpu_set_region),
    ("ARM_MPU_Enable", mpu_enable),
    ("ARM_MPU_Disable", mpu_disable),
    ("ARM_MPU_SetMemAttr", mpu_set_mem_attr),
    ("XCACHE_EnableCache", cache_enable),
    ("XCACHE_DisableCache", cache_disable),
    ("GPIO_PinWrite", gpio_pin_write),
    ("GPIO_PinRead", gpio_pin_read),
    ("GPIO_PinInit", gpio_pin_init),
];

fn clear_peripheral_reset(_: &CallArgs<'_>) -> Option<Effect> {
    Some(Effect::write(RESET_CLEAR, RegisterValue::Runtime, "Clear peripheral reset"))
}

fn attach_clock(_: &CallArgs<'_>) -> Option<Effect> {
    Some(Effect::write(MAIN_CLOCK_SELECT, RegisterValue::Runtime, "Attach clock source"))
}

fn set_clock_divider(_: &CallArgs<'_>) -> Option<Effect> {
    Some(Effect::write(SYSTEM_CLOCK_DIVIDER, RegisterValue::Runtime, "Set clock divider"))
}

/// `ARM_MPU_SetRegion(rnr, rbar, rlar)`
fn mpu_set_region(args: &CallArgs<'_>) -> Option<Effect> {
    Some(Effect::write(MPU_RBAR, args.constant(1).into(), "MPU region configuration"))
}

fn mpu_disable(_: &CallArgs<'_>) -> Option<Effect> {
    Some(Effect::write(MPU_CTRL, RegisterValue::Known(0), "MPU disable").with_bits(&["ENABLE"]))
}

/// `ARM_MPU_SetMemAttr(idx, attr)`
fn mpu_set_mem_attr(args: &CallArgs<'_>) -> Option<Effect> {
    let value = args.constant(0).and(args.constant(1));
    Some(
        Effect::write(MPU_MAIR0, value.into(), "MPU memory attribute configuration")
            .with_bits(&["Attr0", "Attr1", "Attr2", "Attr3"]),
    )
}

fn cache_enable(_: &CallArgs<'_>) -> Option<Effect> {
    Some(Effect::write(XCACHE0_CCR, RegisterValue::Runtime, "Cache enable"))
}

/// `XCACHE_DisableCache(instance)`: instance 1 or the XCACHE1 base selects XCACHE1.
fn cache_disable(args: &CallArgs<'_>) -> Option<Effect> {
    let target = if args.constant(0) == Some(1) || args.address(0) == XCACHE1_BASE {
        XCACHE1_CCR
    } else {
        XCACHE0_CCR
    };
    Some(Effect::write(target, RegisterValue::Runtime, "Cache disable"))
}

fn gpio_pin_read(_: &CallArgs<'_>) -> Option<Effect> {
    let mut effect = Effect::write(GPIO_PDIR, RegisterValue::Runtime, "Read GPIO pin");
    effect.access_type = AccessType::FunctionCallRead;
    Some(effect)
}

fn gpio_pin_init(_: &CallArgs<'_>) -> Option<Effect> {
    Some(Effect::write(GPIO_PDDR, RegisterValue::Runtime, "Configure GPIO pin direction"))
}

/// `IOPCTL_PinMuxSet([base,] port, pin, mode)`
fn pin_mux_set(args: &CallArgs<'_>) -> Option<Effect> {
    let first = usize::from(args.args.len() > 3);
    let port = u32::try_from(args.constant(first)?).ok()?;
    let pin = u32::try_from(args.constant(first + 1)?).ok()?;

    let &(name, base, first_port, _) = IOPCTL_BANKS
        .iter()
        .rev()
        .find(|&&(_, _, first_port, _)| port >= first_port)?;
    let offset = u64::from(port - first_port) * IOPCTL_PORT_STRIDE + u64::from(pin) * 4;
    if offset >= PERIPHERAL_WINDOW {
        return None;
    }

    let register = iopctl_register_name(port, pin);
    Some(Effect {
        peripheral: name.to_string(),
        purpose: format!("Pin mux configuration for {register}"),
        register,
        address: base + offset,
        access_type: AccessType::FunctionCallWrite,
        value: args.constant(first + 2).into(),
        bits: vec![full_width_bits(CALL_DATA_SIZE)],
    })
}

/// `ARM_MPU_Enable(flags)`: CTRL = flags | ENABLE.
fn mpu_enable(args: &CallArgs<'_>) -> Option<Effect> {
    let Some(flags) = args.folded(0) else {
        return Some(
            Effect::write(MPU_CTRL, RegisterValue::Runtime, "MPU enable").with_bits(&["ENABLE"]),
        );
    };
    let mut bits = vec!["ENABLE"];
    if flags & MPU_CTRL_HFNMIENA != 0 {
        bits.push("HFNMIENA");
    }
    if flags & MPU_CTRL_PRIVDEFENA != 0 {
        bits.push("PRIVDEFENA");
    }
    Some(
        Effect::write(
            MPU_CTRL,
            RegisterValue::Known(flags | MPU_CTRL_ENABLE),
            "MPU enable",
        )
        .with_bits(&bits),
    )
}

/// `GPIO_PinWrite(base, pin, level)`
fn gpio_pin_write(args: &CallArgs<'_>) -> Option<Effect> {
    let level = args.constant(2);
    let purpose = match level {
        Some(0) => "Set GPIO pin LOW",
        Some(_) => "Set GPIO pin HIGH",
        None => "Write GPIO pin",
    };
    let mut effect = Effect::write(GPIO_PDOR, level.into(), purpose);
    if let Some(pin) = args.constant(1) {
        effect.bits = vec![format!("bit_{pin}")];
    }
    Some(effect)
}

/// Check if `name` is one of the recognized helpers.
pub fn is_known_call(name: &str) -> bool {
    KNOWN_CALLS.iter().any(|(n, _)| *n == name)
}

/// Synthesizes accesses for calls to recognized helpers.
pub struct KnownCallRecognizer<'a> {
    resolver: &'a AddressResolver<'a>,
}

impl<'a> KnownCallRecognizer<'a> {
    pub fn new(resolver: &'a AddressResolver<'a>) -> Self {
        Self { resolver }
    }

    /// Synthesize the access of a call instruction in `func`, if the callee
    /// is recognized and its arguments decode.
    pub fn recognize(&self, func: &Function, inst: &Instruction) -> Option<PendingAccess> {
        let InstKind::Call {
            callee: Callee::Direct(callee),
            args,
        } = &inst.kind
        else {
            return None;
        };
        let (_, handler) = KNOWN_CALLS.iter().find(|(n, _)| *n == callee.as_str())?;
        let effect = handler(&CallArgs {
            func,
            args,
            resolver: self.resolver,
        })?;
        trace!(
            "{} -> {}/{} in {}",
            callee, effect.peripheral, effect.register, func.name
        );

        let (value_written, value_read) = PendingAccess::value_fields(effect.access_type, effect.value);
        Some(PendingAccess {
            peripheral: effect.peripheral,
            register: effect.register,
            address: effect.address,
            access_type: effect.access_type,
            data_size: CALL_DATA_SIZE,
            bits_modified: effect.bits,
            location: location_of(func, inst),
            purpose: effect.purpose,
            value_written,
            value_read,
            priority_key: callee.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regscan_catalog::PeripheralCatalog;
    use regscan_ir::parse_module;

    const MODULE: &str = r"
define void @BOARD_ConfigMPU() {
  call void @XCACHE_DisableCache(ptr noundef inttoptr (i32 1075380224 to ptr))
  call void @XCACHE_DisableCache(i32 noundef 1)
  call void @XCACHE_DisableCache(i32 noundef 0)
  call void @ARM_MPU_Disable()
  call void @ARM_MPU_SetMemAttr(i32 noundef 0, i32 noundef 68)
  call void @ARM_MPU_SetRegion(i32 noundef 0, i32 noundef 536870912, i32 noundef 536936449)
  call void @ARM_MPU_Enable(i32 noundef 6)
  call void @ARM_MPU_Enable(i32 noundef or (i32 2, i32 4))
  call void @ARM_MPU_Enable(i32 noundef %flags)
  call void @XCACHE_EnableCache(ptr noundef inttoptr (i32 1075314688 to ptr))
  ret void
}

define void @BOARD_InitPins() {
  tail call void @IOPCTL_PinMuxSet(i32 noundef 0, i32 noundef 31, i32 noundef 321)
  tail call void @IOPCTL_PinMuxSet(ptr noundef null, i32 noundef 9, i32 noundef 3, i32 noundef 1)
  tail call void @IOPCTL_PinMuxSet(i32 noundef 11, i32 noundef 2, i32 noundef %m)
  tail call void @IOPCTL_PinMuxSet(i32 noundef %p, i32 noundef 2, i32 noundef 1)
  tail call void @IOPCTL_PinMuxSet(i32 noundef 43, i32 noundef 0, i32 noundef 1)
  call void @GPIO_PinWrite(ptr noundef null, i32 noundef 5, i8 noundef 1)
  call void @GPIO_PinWrite(ptr noundef null, i32 noundef 5, i8 noundef 0)
  %r = call i32 @GPIO_PinRead(ptr noundef null, i32 noundef 5)
  call void @unrelated(i32 1)
  ret void
}
";

    fn recognize_all(name: &str) -> Vec<PendingAccess> {
        let module = parse_module(MODULE, "k.ll").unwrap();
        let catalog = PeripheralCatalog::mimxrt700();
        let resolver = AddressResolver::new(&module, &catalog);
        let recognizer = KnownCallRecognizer::new(&resolver);
        let func = module.function(name).unwrap();
        func.blocks
            .iter()
            .flat_map(|b| &b.instructions)
            .filter_map(|i| recognizer.recognize(func, i))
            .collect()
    }

    #[test]
    fn test_cache_and_mpu() {
        let r = recognize_all("BOARD_ConfigMPU");
        assert_eq!(r.len(), 10);

        // Disable by base pointer, by instance, default
        assert_eq!((r[0].peripheral.as_str(), r[0].address), ("XCACHE1", XCACHE1_BASE));
        assert_eq!((r[1].peripheral.as_str(), r[1].address), ("XCACHE1", XCACHE1_BASE));
        assert_eq!((r[2].peripheral.as_str(), r[2].address), ("XCACHE0", XCACHE0_BASE));
        assert!(r[0].purpose.to_lowercase().contains("cache disable"));

        assert_eq!(r[3].register, "CTRL");
        assert_eq!(r[3].value_written, Some(RegisterValue::Known(0)));
        assert_eq!(r[3].bits_modified, vec!["ENABLE"]);

        assert_eq!(r[4].register, "MAIR0");
        assert_eq!(r[4].value_written, Some(RegisterValue::Known(68)));
        assert_eq!(r[4].bits_modified.len(), 4);

        assert_eq!(r[5].register, "RBAR");
        assert_eq!(r[5].address, 0xE000_ED9C);
        assert_eq!(r[5].value_written, Some(RegisterValue::Known(0x2000_0000)));

        for enable in &r[6..8] {
            assert_eq!(enable.address, 0xE000_ED94);
            assert_eq!(enable.value_written, Some(RegisterValue::Known(0x7)));
            assert_eq!(enable.bits_modified, vec!["ENABLE", "HFNMIENA", "PRIVDEFENA"]);
            assert_eq!(enable.access_type, AccessType::FunctionCallWrite);
            assert!(enable.purpose.to_lowercase().contains("mpu enable"));
        }
        assert_eq!(r[8].value_written, Some(RegisterValue::Runtime));
        assert_eq!(r[8].bits_modified, vec!["ENABLE"]);

        assert_eq!(r[9].peripheral, "XCACHE0");
        assert_eq!(r[9].priority_key, "XCACHE_EnableCache");
        assert_eq!(r[9].location.function, "BOARD_ConfigMPU");
    }

    #[test]
    fn test_pin_mux_and_gpio() {
        let r = recognize_all("BOARD_InitPins");
        // Non-constant port and out-of-window pin produce nothing
        assert_eq!(r.len(), 6);

        assert_eq!(r[0].peripheral, "IOPCTL0");
        assert_eq!(r[0].register, "PIO0_31");
        assert_eq!(r[0].address, 0x4000_4000 + 31 * 4);
        assert_eq!(r[0].value_written, Some(RegisterValue::Known(321)));

        assert_eq!(r[1].peripheral, "IOPCTL1");
        assert_eq!(r[1].register, "PIO9_3");
        assert_eq!(r[1].address, 0x4006_4000 + 0x80 + 12);

        assert_eq!(r[2].peripheral, "IOPCTL2");
        assert_eq!(r[2].address, 0x400A_5000 + 8);
        assert_eq!(r[2].value_written, Some(RegisterValue::Runtime));

        assert_eq!(r[3].purpose, "Set GPIO pin HIGH");
        assert_eq!(r[3].bits_modified, vec!["bit_5"]);
        assert_eq!(r[4].purpose, "Set GPIO pin LOW");
        assert_eq!(r[4].value_written, Some(RegisterValue::Known(0)));

        assert_eq!(r[5].register, "PDIR");
        assert_eq!(r[5].access_type, AccessType::FunctionCallRead);
        assert_eq!(r[5].value_written, None);
        assert_eq!(r[5].value_read, Some(RegisterValue::Runtime));
    }

    #[test]
    fn test_is_known_call() {
        assert!(is_known_call("ARM_MPU_Enable"));
        assert!(!is_known_call("arm_mpu_enable"));
        assert!(!is_known_call("unrelated"));
    }
}
