//! Analysis configuration.

/// How sequence numbers are assigned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OrderingMode {
    /// Function-name priority tables, then keyword bands, then a trailing counter.
    #[default]
    Priority,
    /// Order in which the call-graph walk reaches each access.
    Traversal,
}

/// Analysis configuration.
#[derive(Clone, Debug)]
pub struct AnalysisConfig {
    /// Function the call-graph walk starts from.
    pub entry_point: String,
    /// Sequence numbering scheme.
    pub ordering: OrderingMode,
    /// Also walk defined functions the entry never reaches.
    pub include_unreachable: bool,
    /// Resolve function arguments through the callers' call sites.
    pub trace_arguments: bool,
    /// Walk the bodies of recognized SDK helpers in addition to recording
    /// their synthesized access.
    pub descend_known_calls: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            entry_point: "main".to_string(),
            ordering: OrderingMode::Priority,
            include_unreachable: false,
            trace_arguments: true,
            descend_known_calls: true,
        }
    }
}

impl AnalysisConfig {
    /// Set the entry function.
    #[must_use]
    pub fn with_entry_point(mut self, name: impl Into<String>) -> Self {
        self.entry_point = name.into();
        self
    }

    /// Set the ordering mode.
    #[must_use]
    pub fn with_ordering(mut self, ordering: OrderingMode) -> Self {
        self.ordering = ordering;
        self
    }

    /// Walk unreachable functions after the entry walk.
    #[must_use]
    pub fn with_unreachable(mut self, enabled: bool) -> Self {
        self.include_unreachable = enabled;
        self
    }

    /// Enable or disable call-site argument tracing.
    #[must_use]
    pub fn with_argument_tracing(mut self, enabled: bool) -> Self {
        self.trace_arguments = enabled;
        self
    }

    /// Enter or skip the bodies of recognized helpers.
    #[must_use]
    pub fn with_known_call_descent(mut self, enabled: bool) -> Self {
        self.descend_known_calls = enabled;
        self
    }
}
