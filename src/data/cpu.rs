//! CPU-related entities: profile, cache hierarchy, NUMA topology

use serde::Serialize;

/// Resolved CPU identity, topology, frequency and feature set. The
/// `*_source` fields name the derivation strategy that won.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CpuProfile {
    pub model: Option<String>,
    pub arch: Option<String>,
    pub sockets: Option<u32>,
    pub cores_per_socket: Option<u32>,
    pub threads_per_core: Option<u32>,
    pub logical_cpus: Option<u32>,
    /// Heterogeneous-core platforms only (e.g. Apple Silicon P/E split).
    pub performance_cores: Option<u32>,
    pub efficiency_cores: Option<u32>,
    pub base_mhz: Option<f64>,
    pub base_source: Option<&'static str>,
    pub max_mhz: Option<f64>,
    pub max_source: Option<&'static str>,
    pub governor: Option<String>,
    pub scaling_driver: Option<String>,
    pub boost: BoostState,
    pub caches: Vec<CacheLevel>,
    /// Mapped SIMD names in table order (e.g. "AVX2", "SSE4.1").
    pub simd: Vec<&'static str>,
    /// Raw capability flag union, sorted. Shown in detail output when none
    /// of the flags map to a known SIMD name.
    pub flags: Vec<String>,
}

impl CpuProfile {
    /// L3 size as reported by the topology tool or the cache hierarchy.
    pub fn l3_cache(&self) -> Option<&str> {
        self.caches
            .iter()
            .find(|c| c.level == 3)
            .map(|c| c.size.as_str())
    }

    pub fn cache_by(&self, level: u8, kind: CacheKind) -> Option<&CacheLevel> {
        self.caches
            .iter()
            .find(|c| c.level == level && c.kind == kind)
    }
}

/// Turbo/boost resolution outcome. Unknown means neither toggle existed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BoostState {
    Enabled,
    Disabled,
    #[default]
    Unknown,
}

impl BoostState {
    pub fn as_str(self) -> &'static str {
        match self {
            BoostState::Enabled => "enabled",
            BoostState::Disabled => "disabled",
            BoostState::Unknown => "unknown",
        }
    }

    pub fn is_known(self) -> bool {
        self != BoostState::Unknown
    }
}

/// One level of the cache hierarchy as exposed by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheLevel {
    pub level: u8,
    pub kind: CacheKind,
    /// Size kept as the platform's human-readable string ("32K", "16 MiB").
    pub size: String,
    pub associativity: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheKind {
    Data,
    Instruction,
    Unified,
}

impl CacheKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Data" | "data" => Some(CacheKind::Data),
            "Instruction" | "instruction" => Some(CacheKind::Instruction),
            "Unified" | "unified" => Some(CacheKind::Unified),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CacheKind::Data => "data",
            CacheKind::Instruction => "instruction",
            CacheKind::Unified => "unified",
        }
    }
}

/// A NUMA node with its CPU list and local memory.
///
/// The cpulist is an opaque kernel range expression ("0-7,16-23").
#[derive(Debug, Clone, Serialize)]
pub struct NumaNode {
    pub id: u32,
    pub cpulist: Option<String>,
    pub mem_total: Option<String>,
}
