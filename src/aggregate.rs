//! Aggregator: merges probe outputs into the canonical Report
//!
//! Field precedence: tool-reported beats raw-derived beats heuristic.

use std::collections::BTreeSet;

use crate::data::{
    CacheKind, CacheLevel, CpuProfile, Details, MemoryProfile, OsProfile, Report,
};
use crate::probes::{ProbeSet, ToolTopology};

/// Raw capability flag -> display name, in the declared output order.
/// Applied as a filter: unrecognized flags are dropped, never invented.
pub const SIMD_TABLE: &[(&str, &str)] = &[
    ("avx512f", "AVX-512F"),
    ("avx512vl", "AVX-512VL"),
    ("avx512dq", "AVX-512DQ"),
    ("avx512bw", "AVX-512BW"),
    ("avx512cd", "AVX-512CD"),
    ("avx2", "AVX2"),
    ("avx", "AVX"),
    ("sse4_2", "SSE4.2"),
    ("sse4_1", "SSE4.1"),
    ("fma", "FMA"),
    ("neon", "NEON"),
    ("asimd", "ASIMD"),
];

/// Map raw flags through the table, preserving table order.
pub fn simd_features(flags: &BTreeSet<String>) -> Vec<&'static str> {
    SIMD_TABLE
        .iter()
        .filter(|(flag, _)| flags.contains(*flag))
        .map(|(_, name)| *name)
        .collect()
}

/// Run every probe in parallel and merge the outputs.
pub fn build_report(probes: &dyn ProbeSet) -> Report {
    let ((os_release, kernel), ((tool, raw), frequency)) = rayon::join(
        || rayon::join(|| probes.os_release(), || probes.kernel()),
        || {
            rayon::join(
                || rayon::join(|| probes.topology_tool(), || probes.topology_raw()),
                || probes.frequency(),
            )
        },
    );
    let ((caches, numa), (memory, dimm)) = rayon::join(
        || rayon::join(|| probes.caches(), || probes.numa()),
        || rayon::join(|| probes.memory(), || probes.dimm()),
    );
    let ((gpus, storage), toolchain) = rayon::join(
        || rayon::join(|| probes.gpus(), || probes.storage()),
        || probes.toolchain(),
    );

    // Clock fallbacks of last resort: the tool's reported current/max clock.
    let (base_mhz, base_source) = match (frequency.base_mhz, tool.current_mhz) {
        (Some(v), _) => (Some(v), frequency.base_source),
        (None, Some(v)) => (Some(v), Some("tool-current-mhz")),
        (None, None) => (None, None),
    };
    let (max_mhz, max_source) = match (frequency.max_mhz, tool.max_mhz) {
        (Some(v), _) => (Some(v), frequency.max_source),
        (None, Some(v)) => (Some(v), Some("tool-max-mhz")),
        (None, None) => (None, None),
    };

    let mut flags: BTreeSet<String> = tool.flags.clone();
    flags.extend(raw.flags.iter().cloned());

    let cache_levels = if caches.is_empty() {
        tool_cache_levels(&tool)
    } else {
        caches.clone()
    };

    let cpu = CpuProfile {
        model: tool.model.clone().or_else(|| raw.model.clone()),
        arch: tool.arch.clone().or_else(|| kernel.machine.clone()),
        sockets: tool.sockets.or(raw.sockets),
        cores_per_socket: tool.cores_per_socket.or(raw.cores_per_socket),
        threads_per_core: tool.threads_per_core,
        logical_cpus: tool.logical_cpus,
        performance_cores: tool.performance_cores,
        efficiency_cores: tool.efficiency_cores,
        base_mhz,
        base_source,
        max_mhz,
        max_source,
        governor: frequency.governor.clone(),
        scaling_driver: frequency.driver.clone(),
        boost: frequency.boost,
        caches: cache_levels,
        simd: simd_features(&flags),
        flags: flags.iter().cloned().collect(),
    };

    let memory_profile = MemoryProfile {
        total: memory.total,
        available: memory.available,
        free: memory.free,
        swap_total: memory.swap_total,
        swap_free: memory.swap_free,
        hugepages_total: memory.hugepages_total,
        hugepage_size: memory.hugepage_size,
        dimm_speeds: dimm.speeds,
        dimm_needs_root: dimm.needs_root,
    };

    let os = OsProfile {
        distro: os_release.pretty_name,
        kernel: kernel.kernel,
        machine: kernel.machine,
        toolchain: toolchain.clone(),
    };

    let details = Details {
        topology_tool: tool.raw,
        frequency,
        caches,
        numa: numa.clone(),
        memory,
        toolchain,
    };

    Report {
        cpu,
        memory: memory_profile,
        numa,
        gpus,
        storage,
        os,
        details,
    }
}

/// Synthesize cache descriptors from the tool's summary fields when the
/// per-level hierarchy source is unavailable.
fn tool_cache_levels(tool: &ToolTopology) -> Vec<CacheLevel> {
    let mut out = Vec::new();
    let entries = [
        (&tool.l1i, 1, CacheKind::Instruction),
        (&tool.l1d, 1, CacheKind::Data),
        (&tool.l2, 2, CacheKind::Unified),
        (&tool.l3, 3, CacheKind::Unified),
    ];
    for (size, level, kind) in entries {
        if let Some(size) = size {
            out.push(CacheLevel {
                level,
                kind,
                size: size.clone(),
                associativity: None,
            });
        }
    }
    out
}
