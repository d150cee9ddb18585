//! Analysis session: owns the access records of one or more modules.

use regscan_catalog::{AccessLedger, PeripheralCatalog};
use regscan_ir::{InstKind, Module};
use rustc_hash::FxHashSet;
use tracing::{debug, trace, trace_span};

use crate::access::RegisterAccess;
use crate::classify::AccessClassifier;
use crate::config::AnalysisConfig;
use crate::known_calls::KnownCallRecognizer;
use crate::order::OrderTracker;
use crate::resolver::AddressResolver;
use crate::traversal::{self, FunctionKey, Visit};

/// Accumulates register accesses across modules.
///
/// Modules analyzed by the same session share the visited-function set and
/// the trailing sequence counter. Use [`AnalysisSession::reset`] for an
/// independent run.
#[derive(Debug)]
pub struct AnalysisSession {
    config: AnalysisConfig,
    catalog: PeripheralCatalog,
    ledger: AccessLedger,
    accesses: Vec<RegisterAccess>,
    visited: FxHashSet<FunctionKey>,
    tracker: OrderTracker,
    modules: usize,
}

impl AnalysisSession {
    pub fn new(config: AnalysisConfig, catalog: PeripheralCatalog) -> Self {
        let ledger = AccessLedger::new(&catalog);
        let tracker = OrderTracker::new(config.ordering);
        Self {
            config,
            catalog,
            ledger,
            accesses: Vec::new(),
            visited: FxHashSet::default(),
            tracker,
            modules: 0,
        }
    }

    /// Session over the built-in MIMXRT700 catalog.
    pub fn with_builtin_catalog(config: AnalysisConfig) -> Self {
        Self::new(config, PeripheralCatalog::mimxrt700())
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn catalog(&self) -> &PeripheralCatalog {
        &self.catalog
    }

    pub fn ledger(&self) -> &AccessLedger {
        &self.ledger
    }

    /// Records in discovery order.
    pub fn accesses(&self) -> &[RegisterAccess] {
        &self.accesses
    }

    /// Records stable-sorted by sequence number.
    pub fn chronological_accesses(&self) -> Vec<&RegisterAccess> {
        let mut sorted: Vec<&RegisterAccess> = self.accesses.iter().collect();
        sorted.sort_by_key(|a| a.order.sequence_number);
        sorted
    }

    /// Number of modules analyzed since creation or the last reset.
    pub fn modules_analyzed(&self) -> usize {
        self.modules
    }

    /// Walk `module` and append its accesses. Returns the number of new
    /// records.
    pub fn analyze_module(&mut self, module: &Module) -> usize {
        let _span = trace_span!("analyze_module", module = module.name()).entered();
        let module_id = self.modules;
        self.modules += 1;

        let Self {
            config,
            catalog,
            ledger,
            accesses,
            visited,
            tracker,
            ..
        } = self;

        let catalog = &*catalog;
        let resolver =
            AddressResolver::new(module, catalog).with_argument_tracing(config.trace_arguments);
        let classifier = AccessClassifier::new(&resolver, catalog);
        let recognizer = KnownCallRecognizer::new(&resolver);

        let after_known_call = if config.descend_known_calls {
            Visit::Continue
        } else {
            Visit::SkipCallee
        };
        let before = accesses.len();
        let roots = traversal::walk_roots(module, config);
        let walked = traversal::walk(module, module_id, &roots, visited, |site| {
            let (pending, visit) = match &site.inst.kind {
                InstKind::Call { .. } => match recognizer.recognize(site.function, site.inst) {
                    Some(pending) => (Some(pending), after_known_call),
                    None => (None, Visit::Continue),
                },
                _ => (classifier.classify(site.function, site.inst), Visit::Continue),
            };
            if let Some(pending) = pending {
                let access = tracker.assign(pending, &site);
                trace!(
                    "#{} {}/{} {} at {:#010x} in {}",
                    access.order.sequence_number,
                    access.peripheral,
                    access.register,
                    access.access_type,
                    access.address,
                    access.location.function
                );
                ledger.record_access(&access.peripheral, access.address);
                accesses.push(access);
            }
            visit
        });

        let added = accesses.len() - before;
        debug!(
            module = module.name(),
            functions = walked,
            accesses = added,
            "module analyzed"
        );
        added
    }

    /// Drop all records and walk state, keeping configuration and catalog.
    pub fn reset(&mut self) {
        self.accesses.clear();
        self.visited.clear();
        self.ledger.clear();
        self.tracker.reset();
        self.modules = 0;
    }
}
