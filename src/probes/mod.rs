//! Platform probe layer (Linux and macOS implementations of [`ProbeSet`])
//!
//! Probe methods are infallible at the type level: any failure inside a
//! probe resolves the affected fields as absent.

pub mod linux;
pub mod macos;

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::data::{BoostState, CacheLevel, GpuDevice, NumaNode, StorageDevice};

/// The fixed probe surface; methods may run in any order or in parallel.
pub trait ProbeSet: Sync {
    fn os_release(&self) -> OsRelease;
    fn kernel(&self) -> KernelInfo;
    /// Topology as reported by the platform's dedicated tool (lscpu/sysctl).
    fn topology_tool(&self) -> ToolTopology;
    /// Topology derived from raw sources (/proc/cpuinfo). Lower precedence
    /// than the tool record; platforms without a raw source return default.
    fn topology_raw(&self) -> RawTopology;
    fn frequency(&self) -> FrequencyProbe;
    fn caches(&self) -> Vec<CacheLevel>;
    fn numa(&self) -> Vec<NumaNode>;
    fn memory(&self) -> MemoryCounters;
    fn dimm(&self) -> DimmProbe;
    fn gpus(&self) -> Vec<GpuDevice>;
    fn storage(&self) -> Vec<StorageDevice>;
    fn toolchain(&self) -> Option<String>;
}

/// Select the probe set for the running platform, once at startup.
pub fn platform_probes() -> Box<dyn ProbeSet> {
    match std::env::consts::OS {
        "macos" => Box::new(macos::DarwinProbes),
        _ => Box::new(linux::LinuxProbes),
    }
}

/// OS release identity.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OsRelease {
    pub pretty_name: Option<String>,
    pub id: Option<String>,
    pub version: Option<String>,
}

/// Kernel identity from uname(2).
#[derive(Debug, Clone, Default, Serialize)]
pub struct KernelInfo {
    /// "Linux 6.5.0-14-generic" / "Darwin 23.4.0".
    pub kernel: Option<String>,
    pub machine: Option<String>,
}

/// Output of the dedicated topology tool, plus its full key/value dump for
/// the JSON details section.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolTopology {
    pub model: Option<String>,
    pub arch: Option<String>,
    pub sockets: Option<u32>,
    pub cores_per_socket: Option<u32>,
    pub threads_per_core: Option<u32>,
    pub logical_cpus: Option<u32>,
    pub performance_cores: Option<u32>,
    pub efficiency_cores: Option<u32>,
    /// Tool-reported current clock, a last-resort base-frequency stand-in.
    pub current_mhz: Option<f64>,
    pub max_mhz: Option<f64>,
    pub l1d: Option<String>,
    pub l1i: Option<String>,
    pub l2: Option<String>,
    pub l3: Option<String>,
    pub flags: BTreeSet<String>,
    pub raw: BTreeMap<String, String>,
}

/// Topology derived from raw sources; fallback when the tool is absent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RawTopology {
    pub model: Option<String>,
    pub sockets: Option<u32>,
    pub cores_per_socket: Option<u32>,
    pub flags: BTreeSet<String>,
}

/// Frequency scaling state with the winning derivation strategy per field.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FrequencyProbe {
    pub base_mhz: Option<f64>,
    pub base_source: Option<&'static str>,
    pub max_mhz: Option<f64>,
    pub max_source: Option<&'static str>,
    pub governor: Option<String>,
    pub driver: Option<String>,
    pub boost: BoostState,
}

/// Memory/swap/hugepage byte counters. None means unreadable, not zero.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MemoryCounters {
    pub total: Option<u64>,
    pub available: Option<u64>,
    pub free: Option<u64>,
    pub swap_total: Option<u64>,
    pub swap_free: Option<u64>,
    pub hugepages_total: Option<u64>,
    pub hugepage_size: Option<u64>,
}

/// DIMM speed probe outcome. `needs_root` distinguishes "don't know" from
/// "know how to find out, but lack privilege".
#[derive(Debug, Clone, Default, Serialize)]
pub struct DimmProbe {
    pub speeds: Vec<String>,
    pub needs_root: bool,
}

/// Resolve turbo/boost state from the two scaling toggles.
///
/// The generic cpufreq boost file is consulted first; the Intel pstate
/// no_turbo file, whose semantics are inverted ("0" means turbo active),
/// overrides it when present. Neither source resolves to Unknown.
pub fn resolve_boost(generic_boost: Option<&str>, no_turbo: Option<&str>) -> BoostState {
    let mut state = match generic_boost.map(str::trim) {
        Some("1") => BoostState::Enabled,
        Some("0") => BoostState::Disabled,
        _ => BoostState::Unknown,
    };
    match no_turbo.map(str::trim) {
        Some("0") => state = BoostState::Enabled,
        Some("1") => state = BoostState::Disabled,
        _ => {}
    }
    state
}

/// Kernel name/release/machine via uname(2), shared by both platforms.
pub(crate) fn uname_info() -> KernelInfo {
    let mut buf: libc::utsname = unsafe { std::mem::zeroed() };
    if unsafe { libc::uname(&mut buf) } != 0 {
        return KernelInfo::default();
    }
    let sysname = utsname_field(&buf.sysname);
    let release = utsname_field(&buf.release);
    let machine = utsname_field(&buf.machine);
    let kernel = match (sysname, release) {
        (Some(s), Some(r)) => Some(format!("{s} {r}")),
        (Some(s), None) => Some(s),
        _ => None,
    };
    KernelInfo { kernel, machine }
}

fn utsname_field(field: &[libc::c_char]) -> Option<String> {
    let bytes: Vec<u8> = field
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    let s = String::from_utf8_lossy(&bytes).trim().to_string();
    (!s.is_empty()).then_some(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_turbo_zero_means_boost_enabled() {
        assert_eq!(resolve_boost(None, Some("0")), BoostState::Enabled);
        assert_eq!(resolve_boost(None, Some("1")), BoostState::Disabled);
    }

    #[test]
    fn generic_toggle_has_plain_semantics() {
        assert_eq!(resolve_boost(Some("0"), None), BoostState::Disabled);
        assert_eq!(resolve_boost(Some("1"), None), BoostState::Enabled);
    }

    #[test]
    fn no_turbo_overrides_generic_toggle() {
        assert_eq!(resolve_boost(Some("0"), Some("0")), BoostState::Enabled);
        assert_eq!(resolve_boost(Some("1"), Some("1")), BoostState::Disabled);
    }

    #[test]
    fn neither_source_resolves_unknown() {
        assert_eq!(resolve_boost(None, None), BoostState::Unknown);
        assert_eq!(resolve_boost(Some("junk"), Some("junk")), BoostState::Unknown);
    }

    #[test]
    fn uname_reports_kernel_on_unix() {
        let info = uname_info();
        assert!(info.kernel.is_some());
        assert!(info.machine.is_some());
    }
}
