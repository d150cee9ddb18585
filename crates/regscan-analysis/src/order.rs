//! Execution order assignment.

use crate::access::{OrderInfo, PendingAccess, RegisterAccess};
use crate::config::OrderingMode;
use crate::rules::{self, FALLBACK_BASE};
use crate::traversal::InstSite;

/// Assigns sequence numbers, phases and contexts to accesses.
#[derive(Clone, Debug)]
pub struct OrderTracker {
    mode: OrderingMode,
    /// Trailing counter, monotonic across the session.
    counter: u64,
}

impl OrderTracker {
    pub fn new(mode: OrderingMode) -> Self {
        Self { mode, counter: 0 }
    }

    pub fn mode(&self) -> OrderingMode {
        self.mode
    }

    fn next_counter(&mut self) -> u64 {
        let n = self.counter;
        self.counter += 1;
        n
    }

    /// Sequence number for an access keyed by `name`.
    pub fn sequence_number(&mut self, name: &str) -> u64 {
        match self.mode {
            OrderingMode::Priority => {
                rules::priority_of(name).unwrap_or_else(|| FALLBACK_BASE + self.next_counter())
            }
            OrderingMode::Traversal => self.next_counter(),
        }
    }

    /// Attach order metadata to an access found at `site`.
    pub fn assign(&mut self, pending: PendingAccess, site: &InstSite<'_>) -> RegisterAccess {
        let function = site.function.name.as_str();
        let sequence_number = self.sequence_number(&pending.priority_key);
        let execution_phase = rules::execution_phase(function, &pending.location.file);
        let execution_context =
            rules::execution_context(execution_phase, function, pending.access_type);

        let order = OrderInfo {
            sequence_number,
            execution_phase,
            execution_context,
            call_stack: function.to_string(),
            basic_block_id: format!("{function}_BB_{}", site.block),
            instruction_index: site.index,
        };
        pending.into_access(order)
    }

    pub fn reset(&mut self) {
        self.counter = 0;
    }
}
