//! Memory profile entity

use serde::Serialize;

/// Memory/swap/hugepage state. Absence of a counter is distinct from zero:
/// `None` means the source could not be read or parsed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MemoryProfile {
    pub total: Option<u64>,
    pub available: Option<u64>,
    pub free: Option<u64>,
    pub swap_total: Option<u64>,
    pub swap_free: Option<u64>,
    pub hugepages_total: Option<u64>,
    pub hugepage_size: Option<u64>,
    /// Per-DIMM speed strings; empty means "unknown", not "no memory".
    pub dimm_speeds: Vec<String>,
    /// The DIMM tool exists but needs elevated privilege to run.
    pub dimm_needs_root: bool,
}
