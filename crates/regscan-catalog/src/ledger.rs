//! Per-peripheral record of accessed addresses.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use crate::catalog::PeripheralCatalog;

/// Addresses that produced an access record, per catalog peripheral.
#[derive(Clone, Debug, Default)]
pub struct AccessLedger {
    accessed: FxHashMap<String, BTreeSet<u64>>,
}

impl AccessLedger {
    /// Create an empty ledger with one slot per catalog peripheral.
    pub fn new(catalog: &PeripheralCatalog) -> Self {
        let accessed = catalog
            .peripherals()
            .iter()
            .map(|p| (p.name.clone(), BTreeSet::new()))
            .collect();
        Self { accessed }
    }

    /// Record an access. Names outside the catalog are ignored.
    pub fn record_access(&mut self, peripheral: &str, addr: u64) {
        if let Some(set) = self.accessed.get_mut(peripheral) {
            set.insert(addr);
        }
    }

    /// Addresses accessed on a peripheral, in ascending order.
    pub fn accessed(&self, peripheral: &str) -> Option<&BTreeSet<u64>> {
        self.accessed.get(peripheral)
    }

    /// Number of distinct addresses across all peripherals.
    pub fn total(&self) -> usize {
        self.accessed.values().map(BTreeSet::len).sum()
    }

    /// Forget all recorded accesses.
    pub fn clear(&mut self) {
        self.accessed.values_mut().for_each(BTreeSet::clear);
    }
}
