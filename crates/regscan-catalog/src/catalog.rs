//! Peripheral definitions and address lookup.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use rustc_hash::FxHashMap;

use crate::{CatalogError, Result};

/// Size of the address window owned by each peripheral.
pub const PERIPHERAL_WINDOW: u64 = 0x1000;

/// MCU memory-mapped I/O range.
pub const MMIO_RANGE: RangeInclusive<u64> = 0x4000_0000..=0x5FFF_FFFF;

/// One memory-mapped peripheral.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeripheralDefinition {
    pub name: String,
    pub base_address: u64,
    /// Absolute register address to register name.
    pub registers: BTreeMap<u64, String>,
    /// Struct member index to register name.
    pub members: BTreeMap<u32, String>,
}

impl PeripheralDefinition {
    /// Create a peripheral with no registers.
    pub fn new(name: impl Into<String>, base_address: u64) -> Self {
        Self {
            name: name.into(),
            base_address,
            registers: BTreeMap::new(),
            members: BTreeMap::new(),
        }
    }

    /// Add a register at `offset` from the base address.
    #[must_use]
    pub fn with_register(mut self, offset: u64, name: impl Into<String>) -> Self {
        self.registers.insert(self.base_address + offset, name.into());
        self
    }

    /// Add a struct member mapping.
    #[must_use]
    pub fn with_member(mut self, index: u32, name: impl Into<String>) -> Self {
        self.members.insert(index, name.into());
        self
    }

    /// Check if `addr` falls inside this peripheral's window.
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.base_address && addr - self.base_address < PERIPHERAL_WINDOW
    }

    /// Register name for an exact address.
    pub fn register_at(&self, addr: u64) -> Option<&str> {
        self.registers.get(&addr).map(String::as_str)
    }
}

/// Resolved `(peripheral, register)` pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterRef {
    pub peripheral: String,
    pub register: String,
}

impl RegisterRef {
    pub fn new(peripheral: impl Into<String>, register: impl Into<String>) -> Self {
        Self {
            peripheral: peripheral.into(),
            register: register.into(),
        }
    }
}

/// Immutable set of peripheral definitions with lookup indexes.
#[derive(Clone, Debug, Default)]
pub struct PeripheralCatalog {
    peripherals: Vec<PeripheralDefinition>,
    by_name: FxHashMap<String, usize>,
    /// Exact register address to (peripheral index, register name).
    by_address: FxHashMap<u64, (usize, String)>,
}

impl PeripheralCatalog {
    /// Build a catalog, rejecting duplicate names and overlapping windows.
    pub fn new(peripherals: Vec<PeripheralDefinition>) -> Result<Self> {
        let catalog = Self::from_definitions(peripherals);
        catalog.validate()?;
        Ok(catalog)
    }

    pub(crate) fn from_definitions(peripherals: Vec<PeripheralDefinition>) -> Self {
        let mut by_name = FxHashMap::default();
        let mut by_address = FxHashMap::default();
        for (i, p) in peripherals.iter().enumerate() {
            by_name.entry(p.name.clone()).or_insert(i);
            for (&addr, reg) in &p.registers {
                // First peripheral in catalog order wins
                by_address.entry(addr).or_insert_with(|| (i, reg.clone()));
            }
        }
        Self {
            peripherals,
            by_name,
            by_address,
        }
    }

    /// Check catalog invariants.
    pub fn validate(&self) -> Result<()> {
        for p in &self.peripherals {
            let outside = p.registers.iter().find(|(addr, _)| !p.contains(**addr));
            if let Some((&address, register)) = outside {
                return Err(CatalogError::RegisterOutsideWindow {
                    peripheral: p.name.clone(),
                    register: register.clone(),
                    address,
                });
            }
        }

        if self.by_name.len() != self.peripherals.len() {
            let dup = self
                .peripherals
                .iter()
                .enumerate()
                .find(|(i, p)| self.by_name.get(&p.name) != Some(i))
                .map(|(_, p)| p.name.clone())
                .unwrap_or_default();
            return Err(CatalogError::DuplicatePeripheral(dup));
        }

        let mut sorted: Vec<&PeripheralDefinition> = self.peripherals.iter().collect();
        sorted.sort_by_key(|p| p.base_address);
        for pair in sorted.windows(2) {
            if pair[0].contains(pair[1].base_address) {
                return Err(CatalogError::OverlappingWindows {
                    first: pair[0].name.clone(),
                    second: pair[1].name.clone(),
                });
            }
        }
        Ok(())
    }

    /// All peripherals in catalog order.
    pub fn peripherals(&self) -> &[PeripheralDefinition] {
        &self.peripherals
    }

    pub fn len(&self) -> usize {
        self.peripherals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peripherals.is_empty()
    }

    /// Look up a peripheral by name.
    pub fn get(&self, name: &str) -> Option<&PeripheralDefinition> {
        self.by_name.get(name).map(|&i| &self.peripherals[i])
    }

    /// Base address of a named peripheral.
    pub fn base_address(&self, name: &str) -> Option<u64> {
        self.get(name).map(|p| p.base_address)
    }

    /// Peripheral whose window contains `addr` (first in catalog order).
    pub fn peripheral_at(&self, addr: u64) -> Option<&PeripheralDefinition> {
        self.peripherals.iter().find(|p| p.contains(addr))
    }

    /// Name the register at `addr`.
    ///
    /// Exact register addresses take precedence; otherwise an address inside a
    /// peripheral window gets a synthesized `REG_0x<offset>` name.
    pub fn lookup_by_address(&self, addr: u64) -> Option<RegisterRef> {
        if let Some((i, reg)) = self.by_address.get(&addr) {
            return Some(RegisterRef::new(self.peripherals[*i].name.clone(), reg.clone()));
        }
        let p = self.peripheral_at(addr)?;
        let offset = addr - p.base_address;
        Some(RegisterRef::new(p.name.clone(), format!("REG_0x{offset:X}")))
    }

    /// Name a struct member access on the peripheral based exactly at `base`.
    pub fn lookup_by_base_and_member(&self, base: u64, member: u32) -> Option<RegisterRef> {
        let p = self.peripherals.iter().find(|p| p.base_address == base)?;
        let register = p
            .members
            .get(&member)
            .cloned()
            .unwrap_or_else(|| format!("MEMBER_{member}"));
        Some(RegisterRef::new(p.name.clone(), register))
    }

    /// Check if `addr` is an exact register of `peripheral` or lies inside its
    /// window.
    pub fn owns_address(&self, peripheral: &str, addr: u64) -> bool {
        self.get(peripheral)
            .is_some_and(|p| p.contains(addr) || p.register_at(addr).is_some())
    }

    /// Check if `addr` can belong to a peripheral.
    pub fn is_known_peripheral_space(&self, addr: u64) -> bool {
        MMIO_RANGE.contains(&addr) || self.peripheral_at(addr).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> PeripheralCatalog {
        PeripheralCatalog::new(vec![
            PeripheralDefinition::new("GPIO0", 0x4010_0000)
                .with_register(0x0, "PDOR")
                .with_register(0x10, "PDIR"),
            PeripheralDefinition::new("XSPI2", 0x4041_1000)
                .with_register(0x0, "MCR")
                .with_member(1, "IPCR"),
            PeripheralDefinition::new("MPU", 0xE000_ED90).with_register(0x4, "CTRL"),
        ])
        .unwrap()
    }

    #[test]
    fn test_exact_and_window_lookup() {
        let c = catalog();
        assert_eq!(c.lookup_by_address(0x4010_0010), Some(RegisterRef::new("GPIO0", "PDIR")));
        assert_eq!(c.lookup_by_address(0x4010_0ABC), Some(RegisterRef::new("GPIO0", "REG_0xABC")));
        assert_eq!(c.lookup_by_address(0x4010_1000), None);
        assert_eq!(c.lookup_by_address(0xE000_ED94), Some(RegisterRef::new("MPU", "CTRL")));
    }

    #[test]
    fn test_member_lookup() {
        let c = catalog();
        assert_eq!(
            c.lookup_by_base_and_member(0x4041_1000, 1),
            Some(RegisterRef::new("XSPI2", "IPCR"))
        );
        assert_eq!(
            c.lookup_by_base_and_member(0x4041_1000, 9),
            Some(RegisterRef::new("XSPI2", "MEMBER_9"))
        );
        // Base must match exactly
        assert_eq!(c.lookup_by_base_and_member(0x4041_1004, 1), None);
    }

    #[test]
    fn test_owns_address() {
        let c = catalog();
        assert!(c.owns_address("XSPI2", 0x4041_1000));
        assert!(c.owns_address("XSPI2", 0x4041_1FFC));
        assert!(!c.owns_address("XSPI2", 0x4041_2F40));
        assert!(!c.owns_address("GPIO0", 0x4041_1000));
        assert!(!c.owns_address("UART0", 0x4041_1000));
    }

    #[test]
    fn test_register_outside_window_rejected() {
        let err = PeripheralCatalog::new(vec![
            PeripheralDefinition::new("GPIO0", 0x4010_0000).with_register(0x1000, "FAR"),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::RegisterOutsideWindow { address: 0x4010_1000, .. }
        ));
    }

    #[test]
    fn test_known_space() {
        let c = catalog();
        assert!(c.is_known_peripheral_space(0x4000_0000));
        assert!(c.is_known_peripheral_space(0x5FFF_FFFF));
        assert!(c.is_known_peripheral_space(0xE000_ED9C));
        assert!(!c.is_known_peripheral_space(0x2000_0000));
        assert!(!c.is_known_peripheral_space(0));
    }

    #[test]
    fn test_overlap_rejected() {
        let err = PeripheralCatalog::new(vec![
            PeripheralDefinition::new("A", 0x4000_0000),
            PeripheralDefinition::new("B", 0x4000_0800),
        ])
        .unwrap_err();
        assert!(matches!(err, CatalogError::OverlappingWindows { .. }));
    }

    #[test]
    fn test_duplicate_rejected() {
        let err = PeripheralCatalog::new(vec![
            PeripheralDefinition::new("A", 0x4000_0000),
            PeripheralDefinition::new("A", 0x4000_1000),
        ])
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicatePeripheral(name) if name == "A"));
    }
}
