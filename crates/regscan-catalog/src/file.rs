//! JSON catalog files.
//!
//! ```json
//! [
//!   {
//!     "name": "GPIO0",
//!     "base_address": "0x40100000",
//!     "registers": { "0x40100000": "PDOR", "0x10": "PDIR" },
//!     "members": { "0": "PDOR" }
//!   }
//! ]
//! ```
//!
//! Register keys below the base address are offsets from it.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::catalog::{PeripheralCatalog, PeripheralDefinition};
use crate::{CatalogError, Result};

#[derive(Deserialize)]
#[serde(untagged)]
enum Address {
    Number(u64),
    Text(String),
}

#[derive(Deserialize)]
struct PeripheralEntry {
    name: String,
    base_address: Address,
    #[serde(default)]
    registers: BTreeMap<String, String>,
    #[serde(default)]
    members: BTreeMap<String, String>,
}

fn parse_number(text: &str) -> Option<u64> {
    let text = text.trim();
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16).ok(),
        None => text.parse().ok(),
    }
}

impl PeripheralEntry {
    fn into_definition(self) -> Result<PeripheralDefinition> {
        let invalid = |value: &str| CatalogError::InvalidAddress {
            peripheral: self.name.clone(),
            value: value.to_string(),
        };

        let base = match &self.base_address {
            Address::Number(n) => *n,
            Address::Text(s) => parse_number(s).ok_or_else(|| invalid(s))?,
        };

        let mut def = PeripheralDefinition::new(self.name.clone(), base);
        for (key, reg) in &self.registers {
            let addr = parse_number(key).ok_or_else(|| invalid(key))?;
            let addr = if addr < base {
                base.checked_add(addr).ok_or_else(|| invalid(key))?
            } else {
                addr
            };
            def.registers.insert(addr, reg.clone());
        }
        for (key, reg) in &self.members {
            let idx = key.trim().parse().map_err(|_| invalid(key))?;
            def.members.insert(idx, reg.clone());
        }
        Ok(def)
    }
}

impl PeripheralCatalog {
    /// Parse a catalog from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let entries: Vec<PeripheralEntry> = serde_json::from_str(text)?;
        let defs = entries
            .into_iter()
            .map(PeripheralEntry::into_definition)
            .collect::<Result<Vec<_>>>()?;
        Self::new(defs)
    }

    /// Load a catalog from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let catalog = Self::from_json_str(&text)?;
        debug!("loaded {} peripherals from {}", catalog.len(), path.display());
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RegisterRef;

    #[test]
    fn test_from_json() {
        let c = PeripheralCatalog::from_json_str(
            r#"[
                {"name": "UART9", "base_address": "0x40200000",
                 "registers": {"0x40200004": "STAT", "0x8": "CTRL"},
                 "members": {"2": "CTRL"}},
                {"name": "TIMER9", "base_address": 1075904512}
            ]"#,
        )
        .unwrap();
        assert_eq!(c.len(), 2);
        assert_eq!(c.lookup_by_address(0x4020_0004), Some(RegisterRef::new("UART9", "STAT")));
        assert_eq!(c.lookup_by_address(0x4020_0008), Some(RegisterRef::new("UART9", "CTRL")));
        assert_eq!(
            c.lookup_by_base_and_member(0x4020_0000, 2),
            Some(RegisterRef::new("UART9", "CTRL"))
        );
        assert_eq!(c.base_address("TIMER9"), Some(0x4020_0000 + 0x1_0000));
    }

    #[test]
    fn test_invalid_address() {
        let err = PeripheralCatalog::from_json_str(r#"[{"name": "X", "base_address": "zz"}]"#)
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidAddress { .. }));
    }

    #[test]
    fn test_register_outside_window() {
        let err = PeripheralCatalog::from_json_str(
            r#"[{"name": "UART9", "base_address": "0x40200000",
                 "registers": {"0x40201000": "STAT"}}]"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::RegisterOutsideWindow { ref register, .. } if register == "STAT"
        ));

        // Offset form overflowing the address space
        let err = PeripheralCatalog::from_json_str(
            r#"[{"name": "HIGH", "base_address": "0xFFFFFFFFFFFFFFF0",
                 "registers": {"0x20": "CTRL"}}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidAddress { .. }));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, r#"[{"name": "GPIO9", "base_address": "0x40300000"}]"#).unwrap();
        let c = PeripheralCatalog::from_json_file(&path).unwrap();
        assert_eq!(c.base_address("GPIO9"), Some(0x4030_0000));

        let missing = PeripheralCatalog::from_json_file(dir.path().join("missing.json"));
        assert!(matches!(missing, Err(CatalogError::Io(_))));
    }
}
