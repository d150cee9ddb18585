//! Name-based rule tables.
//!
//! Every table is an ordered list where the first matching rule wins.

use crate::access::ExecutionPhase::{BoardInit, DriverInit, Runtime};
use crate::access::{AccessType, ExecutionPhase};

/// How a rule pattern is compared against a name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NameMatch {
    Exact(&'static str),
    Prefix(&'static str),
    Contains(&'static str),
}

impl NameMatch {
    pub fn matches(self, name: &str) -> bool {
        match self {
            Self::Exact(p) => name == p,
            Self::Prefix(p) => name.starts_with(p),
            Self::Contains(p) => name.contains(p),
        }
    }
}

/// A pattern and the result it selects.
#[derive(Clone, Copy, Debug)]
pub struct Rule<T> {
    pub pattern: NameMatch,
    pub result: T,
}

const fn exact<T>(p: &'static str, result: T) -> Rule<T> {
    Rule {
        pattern: NameMatch::Exact(p),
        result,
    }
}

const fn prefix<T>(p: &'static str, result: T) -> Rule<T> {
    Rule {
        pattern: NameMatch::Prefix(p),
        result,
    }
}

const fn contains<T>(p: &'static str, result: T) -> Rule<T> {
    Rule {
        pattern: NameMatch::Contains(p),
        result,
    }
}

/// Result of the first rule matching `name`.
pub fn first_match<T: Copy>(rules: &[Rule<T>], name: &str) -> Option<T> {
    rules
        .iter()
        .find(|r| r.pattern.matches(name))
        .map(|r| r.result)
}

// ============================================================================
// Sequence priority
// ============================================================================

/// Known function priority. `substring` entries also match names that
/// contain them.
#[derive(Clone, Copy, Debug)]
pub struct PriorityEntry {
    pub name: &'static str,
    pub priority: u64,
    pub substring: bool,
}

const fn entry(name: &'static str, priority: u64) -> PriorityEntry {
    PriorityEntry {
        name,
        priority,
        substring: true,
    }
}

/// Added to a table priority when only a substring matched.
pub const SUBSTRING_OFFSET: u64 = 5;

/// Base of the trailing counter for names no table knows.
pub const FALLBACK_BASE: u64 = 10_000;

/// Function priorities, banded by boot stage.
pub const PRIORITY_TABLE: &[PriorityEntry] = &[
    PriorityEntry {
        name: "main",
        priority: 1000,
        substring: false,
    },
    // Board bring-up
    entry("BOARD_InitHardware", 2000),
    entry("BOARD_ConfigMPU", 2100),
    entry("BOARD_InitAHBSC", 2200),
    // MPU
    entry("ARM_MPU_Disable", 3000),
    entry("ARM_MPU_SetMemAttr", 3010),
    entry("ARM_MPU_SetRegion", 3020),
    entry("ARM_MPU_Enable", 3030),
    // Pin mux
    entry("BOARD_InitPins", 4000),
    entry("BOARD_InitBootPins", 4005),
    entry("IOPCTL_PinMuxSet", 4010),
    entry("BOARD_InitPsRamPins", 4020),
    // Clocks and resets
    entry("BOARD_BootClockRUN", 5000),
    entry("BOARD_InitBootClocks", 5005),
    entry("CLOCK_AttachClk", 5010),
    entry("CLOCK_SetClkDiv", 5020),
    entry("CLOCK_EnableClock", 5030),
    entry("RESET_ClearPeripheralReset", 5040),
    entry("RESET_PeripheralReset", 5050),
    entry("BOARD_SetXspiClock", 5060),
    // Debug console
    entry("BOARD_InitDebugConsole", 6000),
    entry("DbgConsole_Init", 6010),
    // Cache
    entry("XCACHE_DisableCache", 7000),
    entry("XCACHE_EnableCache", 7010),
    // XSPI
    entry("XSPI_Init", 8000),
    entry("XSPI_SetFlashConfig", 8010),
    entry("XSPI_UpdateLUT", 8020),
    entry("XSPI_TransferBlocking", 8030),
    entry("XSPI_WriteBlocking", 8040),
    entry("XSPI_ReadBlocking", 8050),
    // GPIO
    entry("GPIO_PinInit", 9000),
    entry("GPIO_PinWrite", 9010),
    entry("GPIO_PinRead", 9020),
];

/// Keyword bands for names outside [`PRIORITY_TABLE`].
pub const KEYWORD_BANDS: &[Rule<u64>] = &[
    contains("BOARD", 2500),
    contains("MPU", 3500),
    contains("IOPCTL", 4500),
    contains("Pin", 4500),
    contains("CLOCK", 5500),
    contains("Clock", 5500),
    contains("RESET", 5500),
    contains("Console", 6500),
    contains("CACHE", 7500),
    contains("Cache", 7500),
    contains("XSPI", 8500),
    contains("xspi", 8500),
    contains("GPIO", 9500),
];

/// Table priority of a function name, if any rule knows it.
pub fn priority_of(name: &str) -> Option<u64> {
    if let Some(e) = PRIORITY_TABLE.iter().find(|e| e.name == name) {
        return Some(e.priority);
    }
    if let Some(e) = PRIORITY_TABLE
        .iter()
        .find(|e| e.substring && name.contains(e.name))
    {
        return Some(e.priority + SUBSTRING_OFFSET);
    }
    first_match(KEYWORD_BANDS, name)
}

// ============================================================================
// Execution phase
// ============================================================================

/// Functions with a fixed phase.
pub const PHASE_BY_NAME: &[Rule<ExecutionPhase>] = &[
    exact("BOARD_InitHardware", BoardInit),
    exact("BOARD_SetXspiClock", BoardInit),
    exact("BOARD_DeinitXspi", BoardInit),
    exact("BOARD_InitI2c2PinAsGpio", BoardInit),
    exact("BOARD_RestoreI2c2PinMux", BoardInit),
    exact("hardware_init", BoardInit),
    exact("board_init", BoardInit),
    exact("pin_mux_init", BoardInit),
    exact("clock_config", BoardInit),
    exact("CLOCK_SetupExtClocking", BoardInit),
    exact("CLOCK_SetupFROClocking", BoardInit),
    exact("POWER_DisablePD", BoardInit),
    exact("POWER_ApplyPD", BoardInit),
    exact("XSPI_Init", DriverInit),
    exact("XSPI_SetFlashConfig", DriverInit),
    exact("XSPI_UpdateLUT", DriverInit),
    exact("GPIO_PinInit", DriverInit),
    exact("CLOCK_AttachClk", DriverInit),
    exact("CLOCK_SetClkDiv", DriverInit),
    exact("CLOCK_EnableClock", DriverInit),
    exact("RESET_PeripheralReset", DriverInit),
    exact("XSPI_TransferBlocking", Runtime),
    exact("XSPI_WriteBlocking", Runtime),
    exact("XSPI_ReadBlocking", Runtime),
    exact("GPIO_PinWrite", Runtime),
    exact("GPIO_PinRead", Runtime),
    exact("GPIO_PortSet", Runtime),
    exact("GPIO_PortClear", Runtime),
    exact("GPIO_PortToggle", Runtime),
];

/// Function name patterns, checked after [`PHASE_BY_NAME`].
pub const PHASE_BY_PATTERN: &[Rule<ExecutionPhase>] = &[
    prefix("BOARD_", BoardInit),
    prefix("board_", BoardInit),
    contains("hardware_init", BoardInit),
    contains("pin_mux", BoardInit),
    contains("clock_config", BoardInit),
    contains("CLOCK_Setup", BoardInit),
    prefix("POWER_", BoardInit),
    contains("_Init", DriverInit),
    contains("_Config", DriverInit),
    contains("CLOCK_Attach", DriverInit),
    contains("CLOCK_Enable", DriverInit),
    prefix("RESET_", DriverInit),
];

/// Source file patterns, checked last.
pub const PHASE_BY_FILE: &[Rule<ExecutionPhase>] = &[
    contains("board.c", BoardInit),
    contains("hardware_init.c", BoardInit),
    contains("pin_mux.c", BoardInit),
    contains("clock_config.c", BoardInit),
];

/// Phase of an access made from `function` defined in `file`.
pub fn execution_phase(function: &str, file: &str) -> ExecutionPhase {
    first_match(PHASE_BY_NAME, function)
        .or_else(|| first_match(PHASE_BY_PATTERN, function))
        .or_else(|| first_match(PHASE_BY_FILE, file))
        .unwrap_or(Runtime)
}

// ============================================================================
// Execution context
// ============================================================================

/// Board init contexts by function name.
pub const BOARD_CONTEXTS: &[Rule<&str>] = &[
    contains("Clock", "clock_configuration"),
    contains("CLOCK", "clock_configuration"),
    contains("Pin", "pin_configuration"),
    contains("GPIO", "pin_configuration"),
    contains("Power", "power_management"),
    contains("POWER", "power_management"),
    contains("MPU", "mpu_configuration"),
];

/// Finer-grained tag within a phase.
pub fn execution_context(
    phase: ExecutionPhase,
    function: &str,
    access_type: AccessType,
) -> &'static str {
    match phase {
        BoardInit => first_match(BOARD_CONTEXTS, function).unwrap_or("hardware_initialization"),
        DriverInit => "driver_initialization",
        Runtime if access_type.is_read() => "status_monitoring",
        Runtime => "runtime_operation",
    }
}

// ============================================================================
// Purpose
// ============================================================================

/// Purpose templates by function name: text before and after the
/// peripheral name.
pub const PURPOSE_BY_FUNCTION: &[Rule<(&str, &str)>] = &[
    contains("init", ("Initialize ", " controller")),
    contains("Init", ("Initialize ", " controller")),
    contains("config", ("Configure ", " settings")),
    contains("Config", ("Configure ", " settings")),
    contains("enable", ("Enable ", " functionality")),
    contains("Enable", ("Enable ", " functionality")),
    contains("disable", ("Disable ", " functionality")),
    contains("Disable", ("Disable ", " functionality")),
    contains("read", ("Read data from ", "")),
    contains("Read", ("Read data from ", "")),
    contains("write", ("Write data to ", "")),
    contains("Write", ("Write data to ", "")),
    contains("transfer", ("Transfer data via ", "")),
    contains("Transfer", ("Transfer data via ", "")),
];

/// Purposes by register name.
pub const PURPOSE_BY_REGISTER: &[Rule<&str>] = &[
    exact("MCR", "Module configuration"),
    exact("IPCR", "IP command configuration"),
    exact("SFAR", "Set flash address"),
    contains("BUF", "Buffer configuration"),
];

/// Describe an access to `register` of `peripheral` made from `function`.
pub fn purpose(function: &str, peripheral: &str, register: &str) -> String {
    if let Some((before, after)) = first_match(PURPOSE_BY_FUNCTION, function) {
        return format!("{before}{peripheral}{after}");
    }
    first_match(PURPOSE_BY_REGISTER, register)
        .map_or_else(|| format!("Access {register} register"), str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_exact_and_substring() {
        assert_eq!(priority_of("main"), Some(1000));
        assert_eq!(priority_of("ARM_MPU_Enable"), Some(3030));
        assert_eq!(priority_of("XCACHE_DisableCache"), Some(7000));
        // Substring of a table entry
        assert_eq!(priority_of("GPIO_PinWrite_Wrapper"), Some(9015));
        // `main` is exact-only
        assert_eq!(priority_of("domain_setup"), None);
    }

    #[test]
    fn test_priority_keyword_bands() {
        assert_eq!(priority_of("BOARD_Custom"), Some(2500));
        assert_eq!(priority_of("my_xspi_helper"), Some(8500));
        assert_eq!(priority_of("app_task"), None);
    }

    #[test]
    fn test_table_bands_ordered() {
        // MPU band precedes the cache band
        assert!(priority_of("ARM_MPU_Disable") < priority_of("XCACHE_DisableCache"));
        for pair in PRIORITY_TABLE.windows(2) {
            assert!(pair[0].priority < pair[1].priority, "{}", pair[1].name);
        }
    }

    #[test]
    fn test_execution_phase() {
        assert_eq!(execution_phase("BOARD_InitHardware", ""), BoardInit);
        assert_eq!(execution_phase("BOARD_ConfigMPU", ""), BoardInit);
        assert_eq!(execution_phase("POWER_EnablePD", ""), BoardInit);
        assert_eq!(execution_phase("LPUART_Init", ""), DriverInit);
        assert_eq!(execution_phase("RESET_ClearPeripheralReset", ""), DriverInit);
        assert_eq!(execution_phase("GPIO_PinWrite", ""), Runtime);
        assert_eq!(execution_phase("helper", "boards/pin_mux.c"), BoardInit);
        assert_eq!(execution_phase("main", "app.c"), Runtime);
    }

    #[test]
    fn test_execution_context() {
        assert_eq!(
            execution_context(BoardInit, "BOARD_BootClockRUN", AccessType::Write),
            "clock_configuration"
        );
        assert_eq!(
            execution_context(BoardInit, "BOARD_ConfigMPU", AccessType::Write),
            "mpu_configuration"
        );
        assert_eq!(
            execution_context(BoardInit, "BOARD_InitHardware", AccessType::Write),
            "hardware_initialization"
        );
        assert_eq!(
            execution_context(DriverInit, "XSPI_Init", AccessType::Read),
            "driver_initialization"
        );
        assert_eq!(
            execution_context(Runtime, "main", AccessType::VolatileRead),
            "status_monitoring"
        );
        assert_eq!(
            execution_context(Runtime, "main", AccessType::VolatileWrite),
            "runtime_operation"
        );
    }

    #[test]
    fn test_purpose() {
        assert_eq!(purpose("XSPI_Init", "XSPI2", "MCR"), "Initialize XSPI2 controller");
        assert_eq!(purpose("do_transfer", "XSPI2", "MCR"), "Transfer data via XSPI2");
        assert_eq!(purpose("helper", "XSPI2", "MCR"), "Module configuration");
        assert_eq!(purpose("helper", "XSPI2", "BUFCR0"), "Buffer configuration");
        assert_eq!(purpose("helper", "GPIO0", "PDOR"), "Access PDOR register");
    }
}
