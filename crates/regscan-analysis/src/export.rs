//! JSON exporters.
//!
//! Both report shapes are pure functions of the session's records. Field
//! order follows struct declaration order, so repeated exports of the same
//! session are byte-identical.

use std::fmt;
use std::io::Write;
use std::path::Path;

use serde::{Serialize, Serializer};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use crate::access::{ExecutionPhase, Location, RegisterAccess, RegisterValue};
use crate::session::AnalysisSession;

/// Report writing errors.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to move report into place: {0}")]
    Persist(#[from] tempfile::PersistError),
}

pub type Result<T> = std::result::Result<T, ExportError>;

pub const CHRONOLOGICAL_ANALYSIS_TYPE: &str = "chronological_peripheral_access_sequence";
pub const CHRONOLOGICAL_DESCRIPTION: &str =
    "Peripheral register accesses in chronological execution order";

/// Address rendered as `0x%08x`.
#[derive(Clone, Copy)]
struct HexAddress(u64);

impl fmt::Display for HexAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl Serialize for HexAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ============================================================================
// Grouped report
// ============================================================================

#[derive(Serialize)]
struct GroupedReport<'a> {
    peripheral_accesses: Vec<PeripheralGroup<'a>>,
}

#[derive(Serialize)]
struct PeripheralGroup<'a> {
    peripheral_name: &'a str,
    base_address: Option<HexAddress>,
    accesses: Vec<GroupedAccess<'a>>,
}

#[derive(Serialize)]
struct GroupedAccess<'a> {
    register_name: &'a str,
    address: HexAddress,
    access_type: &'static str,
    data_size: u32,
    bits_modified: &'a [String],
    source_location: &'a Location,
    purpose: &'a str,
}

impl<'a> From<&'a RegisterAccess> for GroupedAccess<'a> {
    fn from(a: &'a RegisterAccess) -> Self {
        Self {
            register_name: &a.register,
            address: HexAddress(a.address),
            access_type: a.access_type.as_str(),
            data_size: a.data_size,
            bits_modified: &a.bits_modified,
            source_location: &a.location,
            purpose: &a.purpose,
        }
    }
}

/// Group accesses by peripheral, in order of first appearance.
fn group_by_peripheral(session: &AnalysisSession) -> GroupedReport<'_> {
    let mut groups: Vec<PeripheralGroup<'_>> = Vec::new();
    for access in session.accesses() {
        let index = match groups
            .iter()
            .position(|g| g.peripheral_name == access.peripheral)
        {
            Some(index) => index,
            None => {
                groups.push(PeripheralGroup {
                    peripheral_name: &access.peripheral,
                    base_address: session.catalog().base_address(&access.peripheral).map(HexAddress),
                    accesses: Vec::new(),
                });
                groups.len() - 1
            }
        };
        groups[index].accesses.push(GroupedAccess::from(access));
    }
    GroupedReport {
        peripheral_accesses: groups,
    }
}

// ============================================================================
// Chronological report
// ============================================================================

#[derive(Serialize)]
struct ChronologicalReport<'a> {
    analysis_type: &'static str,
    total_accesses: usize,
    description: &'static str,
    execution_phase_summary: PhaseSummary,
    chronological_sequence: Vec<SequencedAccess<'a>>,
}

/// Access counts per phase. All phases are always present.
#[derive(Serialize, Default)]
struct PhaseSummary {
    board_init: usize,
    driver_init: usize,
    runtime: usize,
}

impl PhaseSummary {
    fn count(&mut self, phase: ExecutionPhase) {
        match phase {
            ExecutionPhase::BoardInit => self.board_init += 1,
            ExecutionPhase::DriverInit => self.driver_init += 1,
            ExecutionPhase::Runtime => self.runtime += 1,
        }
    }
}

#[derive(Serialize)]
struct SequencedAccess<'a> {
    sequence_number: u64,
    peripheral_name: &'a str,
    register_name: &'a str,
    address: HexAddress,
    access_type: &'static str,
    data_size: u32,
    value_written: Option<RegisterValue>,
    value_read: Option<RegisterValue>,
    execution_phase: &'static str,
    execution_context: &'static str,
    call_stack: &'a str,
    basic_block_id: &'a str,
    instruction_index: usize,
    source_location: &'a Location,
    purpose: &'a str,
    bits_modified: &'a [String],
}

impl<'a> From<&'a RegisterAccess> for SequencedAccess<'a> {
    fn from(a: &'a RegisterAccess) -> Self {
        Self {
            sequence_number: a.order.sequence_number,
            peripheral_name: &a.peripheral,
            register_name: &a.register,
            address: HexAddress(a.address),
            access_type: a.access_type.as_str(),
            data_size: a.data_size,
            value_written: a.value_written,
            value_read: a.value_read,
            execution_phase: a.order.execution_phase.as_str(),
            execution_context: a.order.execution_context,
            call_stack: &a.order.call_stack,
            basic_block_id: &a.order.basic_block_id,
            instruction_index: a.order.instruction_index,
            source_location: &a.location,
            purpose: &a.purpose,
            bits_modified: &a.bits_modified,
        }
    }
}

fn chronological_report(session: &AnalysisSession) -> ChronologicalReport<'_> {
    let sorted = session.chronological_accesses();
    let mut summary = PhaseSummary::default();
    for access in &sorted {
        summary.count(access.order.execution_phase);
    }
    ChronologicalReport {
        analysis_type: CHRONOLOGICAL_ANALYSIS_TYPE,
        total_accesses: sorted.len(),
        description: CHRONOLOGICAL_DESCRIPTION,
        execution_phase_summary: summary,
        chronological_sequence: sorted.into_iter().map(SequencedAccess::from).collect(),
    }
}

// ============================================================================
// Rendering and writing
// ============================================================================

/// Render the per-peripheral report.
pub fn grouped_json(session: &AnalysisSession) -> Result<String> {
    Ok(serde_json::to_string_pretty(&group_by_peripheral(session))?)
}

/// Render the chronological report.
pub fn chronological_json(session: &AnalysisSession) -> Result<String> {
    Ok(serde_json::to_string_pretty(&chronological_report(session))?)
}

/// Write the per-peripheral report to `path`.
pub fn write_grouped(session: &AnalysisSession, path: &Path) -> Result<()> {
    write_atomic(path, &grouped_json(session)?)
}

/// Write the chronological report to `path`.
pub fn write_chronological(session: &AnalysisSession, path: &Path) -> Result<()> {
    write_atomic(path, &chronological_json(session)?)
}

/// Write through a temporary file in the destination directory and rename it
/// into place.
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(contents.as_bytes())?;
    file.write_all(b"\n")?;
    file.as_file().sync_all()?;
    file.persist(path)?;
    debug!(path = %path.display(), bytes = contents.len() + 1, "report written");
    Ok(())
}
