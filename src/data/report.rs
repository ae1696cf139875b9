//! The aggregated report and its summary projection

use std::collections::BTreeMap;

use serde::Serialize;

use crate::data::{CacheLevel, CpuProfile, GpuDevice, MemoryProfile, NumaNode, OsProfile, StorageDevice};
use crate::probes::{FrequencyProbe, MemoryCounters};
use crate::utils::parsing::mhz_to_ghz;

/// The canonical per-invocation profile, built once by the aggregator.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub cpu: CpuProfile,
    pub memory: MemoryProfile,
    pub numa: Vec<NumaNode>,
    pub gpus: Vec<GpuDevice>,
    pub storage: Vec<StorageDevice>,
    pub os: OsProfile,
    pub details: Details,
}

/// Raw per-source dumps, emitted only in full JSON mode for diagnosability.
/// Never feeds the text summary.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Details {
    /// Key/value dump of the topology tool (lscpu on Linux, sysctl on macOS).
    pub topology_tool: BTreeMap<String, String>,
    pub frequency: FrequencyProbe,
    /// Cache hierarchy as probed, before any tool-summary substitution.
    pub caches: Vec<CacheLevel>,
    pub numa: Vec<NumaNode>,
    pub memory: MemoryCounters,
    pub toolchain: Option<String>,
}

impl Report {
    /// Project the resolved field set shared by the text summary and the
    /// JSON `summary` object.
    pub fn summary(&self, show_gpus: bool, show_storage: bool) -> Summary {
        let cpu = CpuSummary {
            model: self.cpu.model.clone(),
            sockets: self.cpu.sockets,
            cores_per_socket: self.cpu.cores_per_socket,
            threads_per_core: self.cpu.threads_per_core,
            logical_cpus: self.cpu.logical_cpus,
            performance_cores: self.cpu.performance_cores,
            efficiency_cores: self.cpu.efficiency_cores,
            base_freq: self.cpu.base_mhz.map(mhz_to_ghz),
            max_freq: self.cpu.max_mhz.map(mhz_to_ghz),
            boost: self
                .cpu
                .boost
                .is_known()
                .then(|| self.cpu.boost.as_str()),
            l3_cache: self.cpu.l3_cache().map(str::to_string),
            simd: self.cpu.simd.clone(),
        };

        let memory = MemorySummary {
            total_bytes: self.memory.total,
            available_bytes: self.memory.available,
            dimm_speeds: dedup_sorted(&self.memory.dimm_speeds),
        };

        let gpus = show_gpus.then(|| {
            self.gpus
                .iter()
                .map(|g| GpuSummary {
                    vendor: g.vendor(),
                    name: g.name().map(str::to_string),
                })
                .collect()
        });

        let storage = show_storage.then(|| {
            let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
            for dev in &self.storage {
                *counts.entry(dev.media()).or_default() += 1;
            }
            counts
        });

        Summary {
            cpu,
            memory,
            gpus,
            storage,
            os: OsSummary {
                distro: self.os.distro.clone(),
                kernel: self.os.kernel.clone(),
                arch: self.cpu.arch.clone().or_else(|| self.os.machine.clone()),
            },
        }
    }
}

/// The resolved summary field set, keyed by domain.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub cpu: CpuSummary,
    pub memory: MemorySummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpus: Option<Vec<GpuSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<BTreeMap<&'static str, usize>>,
    pub os: OsSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct CpuSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sockets: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cores_per_socket: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads_per_core: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logical_cpus: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance_cores: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub efficiency_cores: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_freq: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_freq: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boost: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub l3_cache: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub simd: Vec<&'static str>,
}

/// Swap and hugepage counters are detail-only; they never appear in the
/// summary text, so they are kept out of this projection.
#[derive(Debug, Clone, Serialize)]
pub struct MemorySummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dimm_speeds: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GpuSummary {
    pub vendor: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OsSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distro: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
}

fn dedup_sorted(speeds: &[String]) -> Vec<String> {
    let mut out: Vec<String> = speeds.to_vec();
    out.sort();
    out.dedup();
    out
}
