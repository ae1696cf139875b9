//! Deterministic two-mode text rendering plus ANSI styling
//!
//! Summary mode reads only the [`Summary`] projection, so the text and the
//! JSON `summary` object describe the same resolved field set. Exceptions:
//! the CPU model and memory total print "unknown" when unresolved.

use crate::data::{CacheKind, Report, Summary};
use crate::utils::parsing::human_bytes;

/// Rendering configuration threaded into the formatter at construction.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub color: bool,
    pub show_gpu_detail: bool,
    pub show_storage_detail: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            color: true,
            show_gpu_detail: false,
            show_storage_detail: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Tint {
    Cyan,
    Yellow,
}

impl Tint {
    fn code(self) -> &'static str {
        match self {
            Tint::Cyan => "36",
            Tint::Yellow => "33",
        }
    }
}

pub struct Formatter {
    opts: RenderOptions,
}

impl Formatter {
    pub fn new(opts: RenderOptions) -> Self {
        Formatter { opts }
    }

    fn paint(&self, text: &str, tint: Tint) -> String {
        if !self.opts.color {
            return text.to_string();
        }
        format!("\x1b[1;{}m{}\x1b[0m", tint.code(), text)
    }

    /// The top summary block.
    pub fn summary_text(&self, summary: &Summary) -> String {
        let mut lines = Vec::new();

        let model = summary.cpu.model.as_deref().unwrap_or("unknown");
        lines.push(format!("{}: {}", self.paint("CPU", Tint::Cyan), model));

        let mut topo = Vec::new();
        if let Some(v) = summary.cpu.sockets {
            topo.push(format!("sockets {v}"));
        }
        if let Some(v) = summary.cpu.cores_per_socket {
            topo.push(format!("cores/socket {v}"));
        }
        if let Some(v) = summary.cpu.threads_per_core {
            topo.push(format!("threads/core {v}"));
        }
        if let Some(v) = summary.cpu.logical_cpus {
            topo.push(format!("logical {v}"));
        }
        if !topo.is_empty() {
            lines.push(format!("  {}", topo.join(", ")));
        }

        let mut kinds = Vec::new();
        if let Some(v) = summary.cpu.performance_cores {
            kinds.push(format!("performance {v}"));
        }
        if let Some(v) = summary.cpu.efficiency_cores {
            kinds.push(format!("efficiency {v}"));
        }
        if !kinds.is_empty() {
            lines.push(format!("  {}", kinds.join(", ")));
        }

        let mut clocks = Vec::new();
        if let Some(v) = &summary.cpu.base_freq {
            clocks.push(format!("base {v}"));
        }
        if let Some(v) = &summary.cpu.max_freq {
            clocks.push(format!("max {v}"));
        }
        if let Some(v) = summary.cpu.boost {
            clocks.push(format!("boost {v}"));
        }
        if !clocks.is_empty() {
            lines.push(format!("  {}", clocks.join(", ")));
        }

        if let Some(l3) = &summary.cpu.l3_cache {
            lines.push(format!("  L3: {l3}"));
        }
        if !summary.cpu.simd.is_empty() {
            lines.push(format!("  SIMD: {}", summary.cpu.simd.join(", ")));
        }

        let total = summary
            .memory
            .total_bytes
            .map(human_bytes)
            .unwrap_or_else(|| "unknown".to_string());
        let available = summary
            .memory
            .available_bytes
            .map(|b| format!(" (available {})", human_bytes(b)))
            .unwrap_or_default();
        lines.push(format!(
            "{}: {}{}",
            self.paint("Memory", Tint::Cyan),
            total,
            available
        ));
        if !summary.memory.dimm_speeds.is_empty() {
            lines.push(format!(
                "  DIMM speeds: {}",
                summary.memory.dimm_speeds.join(", ")
            ));
        }

        if let Some(gpus) = &summary.gpus {
            if !gpus.is_empty() {
                let joined = gpus
                    .iter()
                    .map(|g| match &g.name {
                        Some(name) => format!("{} {}", g.vendor, name),
                        None => g.vendor.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join("; ");
                lines.push(format!("{}: {}", self.paint("GPU", Tint::Cyan), joined));
            }
        }
        if let Some(storage) = &summary.storage {
            if !storage.is_empty() {
                let joined = storage
                    .iter()
                    .map(|(media, count)| format!("{count} {media}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                lines.push(format!("{}: {}", self.paint("Storage", Tint::Cyan), joined));
            }
        }

        let mut os = Vec::new();
        if let Some(distro) = &summary.os.distro {
            os.push(distro.clone());
        }
        if let Some(kernel) = &summary.os.kernel {
            match &summary.os.arch {
                Some(arch) => os.push(format!("{kernel} ({arch})")),
                None => os.push(kernel.clone()),
            }
        }
        if !os.is_empty() {
            lines.push(format!(
                "{}: {}",
                self.paint("OS/Kernel", Tint::Cyan),
                os.join(", ")
            ));
        }

        lines.join("\n")
    }

    /// Summary plus the per-domain sections.
    pub fn detailed_text(&self, report: &Report, summary: &Summary) -> String {
        let mut lines: Vec<String> = Vec::new();
        lines.push(self.summary_text(summary));
        lines.push(String::new());

        self.cpu_section(report, summary, &mut lines);
        self.numa_section(report, &mut lines);
        self.memory_section(report, &mut lines);
        if self.opts.show_gpu_detail {
            self.gpu_section(report, &mut lines);
        }
        if self.opts.show_storage_detail {
            self.storage_section(report, &mut lines);
        }
        self.os_section(report, &mut lines);

        lines.join("\n")
    }

    fn header(&self, title: &str) -> String {
        self.paint(&format!("== {title} =="), Tint::Yellow)
    }

    fn cpu_section(&self, report: &Report, summary: &Summary, lines: &mut Vec<String>) {
        let cpu = &report.cpu;
        lines.push(self.header("CPU Details"));
        lines.push(entry("Architecture", cpu.arch.as_deref().unwrap_or("unknown")));
        lines.push(entry("Model name", cpu.model.as_deref().unwrap_or("unknown")));
        if cpu.sockets.is_some() || cpu.cores_per_socket.is_some() || cpu.logical_cpus.is_some() {
            let fmt = |v: Option<u32>| v.map_or_else(|| "?".to_string(), |v| v.to_string());
            lines.push(entry(
                "Topology",
                &format!(
                    "sockets={}, cores/socket={}, threads/core={}, logical={}",
                    fmt(cpu.sockets),
                    fmt(cpu.cores_per_socket),
                    fmt(cpu.threads_per_core),
                    fmt(cpu.logical_cpus)
                ),
            ));
        }
        // Attempted-but-failed scaling fields explicitly print "unknown".
        lines.push(entry(
            "cpufreq",
            &format!(
                "driver={}, governor={}, boost={}",
                cpu.scaling_driver.as_deref().unwrap_or("unknown"),
                cpu.governor.as_deref().unwrap_or("unknown"),
                cpu.boost.as_str()
            ),
        ));
        lines.push(entry(
            "Clocks",
            &format!(
                "base={}, max={}",
                summary.cpu.base_freq.as_deref().unwrap_or("unknown"),
                summary.cpu.max_freq.as_deref().unwrap_or("unknown")
            ),
        ));
        let cache = |level: u8, kind: CacheKind| {
            cpu.cache_by(level, kind)
                .map_or_else(|| "-".to_string(), |c| c.size.clone())
        };
        if !cpu.caches.is_empty() {
            lines.push(entry(
                "Caches",
                &format!(
                    "L1d={}, L1i={}, L2={}, L3={}",
                    cache(1, CacheKind::Data),
                    cache(1, CacheKind::Instruction),
                    cache(2, CacheKind::Unified),
                    cache(3, CacheKind::Unified)
                ),
            ));
            for c in cpu.caches.iter().filter(|c| c.associativity.is_some()) {
                lines.push(format!(
                    "  L{} {}: {} (assoc {})",
                    c.level,
                    c.kind.as_str(),
                    c.size,
                    c.associativity.as_deref().unwrap_or("-")
                ));
            }
        }
        if !cpu.simd.is_empty() {
            lines.push(entry("SIMD", &cpu.simd.join(", ")));
        } else if !cpu.flags.is_empty() {
            // Nothing mapped; surface the raw flags so they are not lost.
            lines.push(entry("Flags", &cpu.flags.join(" ")));
        }
    }

    fn numa_section(&self, report: &Report, lines: &mut Vec<String>) {
        if report.numa.is_empty() {
            return;
        }
        lines.push(String::new());
        lines.push(self.header("NUMA Topology"));
        for node in &report.numa {
            lines.push(format!(
                "Node {}: cpus={}; mem={}",
                node.id,
                node.cpulist.as_deref().unwrap_or("-"),
                node.mem_total.as_deref().unwrap_or("unknown")
            ));
        }
    }

    fn memory_section(&self, report: &Report, lines: &mut Vec<String>) {
        let mem = &report.memory;
        lines.push(String::new());
        lines.push(self.header("Memory"));
        lines.push(entry(
            "Total",
            &mem.total.map(human_bytes).unwrap_or_else(|| "unknown".into()),
        ));
        if let Some(available) = mem.available {
            lines.push(entry("Available", &human_bytes(available)));
        }
        if let Some(swap_total) = mem.swap_total {
            lines.push(entry(
                "Swap",
                &format!(
                    "{} (free {})",
                    human_bytes(swap_total),
                    mem.swap_free
                        .map(human_bytes)
                        .unwrap_or_else(|| "unknown".into())
                ),
            ));
        }
        if let Some(total) = mem.hugepages_total {
            lines.push(entry(
                "HugePages",
                &format!(
                    "total={}, size={}",
                    total,
                    mem.hugepage_size
                        .map(human_bytes)
                        .unwrap_or_else(|| "unknown".into())
                ),
            ));
        }
        if !mem.dimm_speeds.is_empty() {
            let mut speeds = mem.dimm_speeds.clone();
            speeds.sort();
            speeds.dedup();
            lines.push(entry("DIMM speeds", &speeds.join(", ")));
        } else if mem.dimm_needs_root {
            lines.push(entry("DIMM speeds", "(run as root to read via dmidecode)"));
        }
    }

    fn gpu_section(&self, report: &Report, lines: &mut Vec<String>) {
        use crate::data::GpuDevice;
        lines.push(String::new());
        lines.push(self.header("GPU(s)"));
        if report.gpus.is_empty() {
            lines.push("No GPU info found (try installing nvidia-smi, rocm-smi, or glxinfo).".into());
            return;
        }
        for (i, gpu) in report.gpus.iter().enumerate() {
            let name = gpu.name().map(|n| format!(" {n}")).unwrap_or_default();
            lines.push(format!("[{}] {}{}", i, gpu.vendor(), name));
            match gpu {
                GpuDevice::Nvidia {
                    driver,
                    vram,
                    pstate,
                    graphics_clock,
                    ..
                } => {
                    if let Some(v) = driver {
                        lines.push(format!("      driver: {v}"));
                    }
                    if let Some(v) = vram {
                        lines.push(format!("      vram  : {v}"));
                    }
                    if let Some(v) = pstate {
                        lines.push(format!("      pstate: {v}"));
                    }
                    if let Some(v) = graphics_clock {
                        lines.push(format!("      clock : {v}"));
                    }
                }
                GpuDevice::Amd { raw, .. } => {
                    lines.push(format!("      info  : {}", raw.replace('\n', "\n              ")));
                }
                GpuDevice::Apple { vram, .. } => {
                    if let Some(v) = vram {
                        lines.push(format!("      vram  : {v}"));
                    }
                }
                GpuDevice::OpenGl { .. } => {}
            }
        }
    }

    fn storage_section(&self, report: &Report, lines: &mut Vec<String>) {
        lines.push(String::new());
        lines.push(self.header("Storage Devices"));
        if report.storage.is_empty() {
            lines.push("No disk info (lsblk not available).".into());
            return;
        }
        for dev in &report.storage {
            let mut parts = vec![
                dev.media().to_string(),
                dev.size.clone().unwrap_or_else(|| "unknown size".into()),
                format!("model={}", dev.model.as_deref().unwrap_or("unknown")),
            ];
            if let Some(state) = &dev.state {
                parts.push(format!("state={state}"));
            }
            if let Some(serial) = &dev.serial {
                parts.push(format!("serial={serial}"));
            }
            lines.push(format!("{}: {}", dev.name, parts.join(", ")));
        }
    }

    fn os_section(&self, report: &Report, lines: &mut Vec<String>) {
        lines.push(String::new());
        lines.push(self.header("OS / Kernel / Toolchain"));
        lines.push(entry(
            "Distro",
            report.os.distro.as_deref().unwrap_or("unknown"),
        ));
        let kernel = match (&report.os.kernel, &report.os.machine) {
            (Some(k), Some(m)) => format!("{k} ({m})"),
            (Some(k), None) => k.clone(),
            _ => "unknown".into(),
        };
        lines.push(entry("Kernel", &kernel));
        if let Some(toolchain) = &report.os.toolchain {
            lines.push(entry("Compiler", toolchain));
        }
    }
}

fn entry(label: &str, value: &str) -> String {
    format!("{label:<13}: {value}")
}

/// Remove ANSI SGR escape sequences.
pub fn strip_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            // Skip through the terminating 'm' of the SGR sequence.
            for e in chars.by_ref() {
                if e == 'm' {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{
        BoostState, CacheKind, CacheLevel, CpuProfile, Details, GpuDevice, MemoryProfile,
        NumaNode, OsProfile, Report, StorageDevice,
    };

    fn sample_report() -> Report {
        Report {
            cpu: CpuProfile {
                model: Some("AMD Ryzen 7 5800X 8-Core Processor".into()),
                arch: Some("x86_64".into()),
                sockets: Some(1),
                cores_per_socket: Some(8),
                threads_per_core: Some(2),
                logical_cpus: Some(16),
                performance_cores: None,
                efficiency_cores: None,
                base_mhz: Some(3800.0),
                base_source: Some("sysfs-base-frequency"),
                max_mhz: Some(4850.0),
                max_source: Some("sysfs-cpuinfo-max"),
                governor: Some("performance".into()),
                scaling_driver: Some("acpi-cpufreq".into()),
                boost: BoostState::Enabled,
                caches: vec![
                    CacheLevel {
                        level: 1,
                        kind: CacheKind::Data,
                        size: "32K".into(),
                        associativity: Some("8".into()),
                    },
                    CacheLevel {
                        level: 3,
                        kind: CacheKind::Unified,
                        size: "32 MiB".into(),
                        associativity: None,
                    },
                ],
                simd: vec!["AVX2", "SSE4.2"],
                flags: vec!["avx2".into(), "fpu".into(), "sse4_2".into()],
            },
            memory: MemoryProfile {
                total: Some(64 * 1024 * 1024 * 1024),
                available: Some(48 * 1024 * 1024 * 1024),
                free: Some(8 * 1024 * 1024 * 1024),
                swap_total: Some(2 * 1024 * 1024 * 1024),
                swap_free: Some(2 * 1024 * 1024 * 1024),
                hugepages_total: Some(0),
                hugepage_size: Some(2 * 1024 * 1024),
                dimm_speeds: vec!["3200 MT/s".into()],
                dimm_needs_root: false,
            },
            numa: vec![NumaNode {
                id: 0,
                cpulist: Some("0-15".into()),
                mem_total: Some("64.0 GiB".into()),
            }],
            gpus: vec![GpuDevice::Nvidia {
                name: "NVIDIA GeForce RTX 3080".into(),
                driver: Some("535.154.05".into()),
                vram: Some("10240 MiB".into()),
                pstate: Some("P0".into()),
                graphics_clock: Some("1710 MHz".into()),
            }],
            storage: vec![StorageDevice {
                name: "sda".into(),
                kind: "disk".into(),
                size: Some("500G".into()),
                model: Some("Samsung SSD 860".into()),
                serial: Some("S3Z9NB0K123456".into()),
                state: Some("running".into()),
                rotational: false,
            }],
            os: OsProfile {
                distro: Some("Ubuntu 22.04.4 LTS".into()),
                kernel: Some("Linux 6.5.0-14-generic".into()),
                machine: Some("x86_64".into()),
                toolchain: Some("gcc (Ubuntu 11.4.0) 11.4.0".into()),
            },
            details: Details::default(),
        }
    }

    fn formatter(color: bool) -> Formatter {
        Formatter::new(RenderOptions {
            color,
            show_gpu_detail: false,
            show_storage_detail: false,
        })
    }

    #[test]
    fn summary_is_deterministic() {
        let report = sample_report();
        let summary = report.summary(false, false);
        let f = formatter(false);
        assert_eq!(f.summary_text(&summary), f.summary_text(&summary));
    }

    #[test]
    fn stripped_color_output_matches_plain_output() {
        let report = sample_report();
        let summary = report.summary(false, false);
        let colored = formatter(true);
        let plain = formatter(false);

        assert_eq!(
            strip_ansi(&colored.summary_text(&summary)),
            plain.summary_text(&summary)
        );
        assert_eq!(
            strip_ansi(&colored.detailed_text(&report, &summary)),
            plain.detailed_text(&report, &summary)
        );
    }

    #[test]
    fn plain_output_contains_no_escape_bytes() {
        let report = sample_report();
        let summary = report.summary(true, true);
        let f = formatter(false);
        assert!(!f.detailed_text(&report, &summary).contains('\x1b'));
    }

    #[test]
    fn summary_text_mirrors_summary_json_fields() {
        let mut report = sample_report();
        // Knock out a few fields so presence and absence are both covered.
        report.cpu.threads_per_core = None;
        report.cpu.max_mhz = None;
        report.cpu.simd = Vec::new();
        report.memory.available = None;
        report.memory.dimm_speeds = Vec::new();

        let summary = report.summary(false, false);
        let text = formatter(false).summary_text(&summary);
        let json = serde_json::to_value(&summary).unwrap();

        let checks = [
            ("sockets ", json["cpu"].get("sockets").is_some()),
            ("threads/core ", json["cpu"].get("threads_per_core").is_some()),
            ("base ", json["cpu"].get("base_freq").is_some()),
            ("max ", json["cpu"].get("max_freq").is_some()),
            ("boost ", json["cpu"].get("boost").is_some()),
            ("L3: ", json["cpu"].get("l3_cache").is_some()),
            ("SIMD: ", json["cpu"].get("simd").is_some()),
            ("available ", json["memory"].get("available_bytes").is_some()),
            ("swap", json["memory"].get("swap_total_bytes").is_some()),
            ("DIMM speeds: ", json["memory"].get("dimm_speeds").is_some()),
        ];
        for (needle, in_json) in checks {
            assert_eq!(
                text.contains(needle),
                in_json,
                "text/json divergence for {needle:?}"
            );
        }
    }

    #[test]
    fn swap_is_detail_only() {
        let report = sample_report();
        let summary = report.summary(false, false);

        let json = serde_json::to_value(&summary).unwrap();
        assert!(json["memory"].get("swap_total_bytes").is_none());

        let f = formatter(false);
        assert!(!f.summary_text(&summary).to_lowercase().contains("swap"));
        assert!(f
            .detailed_text(&report, &summary)
            .contains("Swap         : 2.0 GiB (free 2.0 GiB)"));
    }

    #[test]
    fn raw_flags_line_appears_when_no_simd_name_maps() {
        let mut report = sample_report();
        report.cpu.simd = Vec::new();
        report.cpu.flags = vec!["fpu".into(), "vme".into()];
        let summary = report.summary(false, false);
        let text = formatter(false).detailed_text(&report, &summary);
        assert!(text.contains("Flags        : fpu vme"));
        assert!(!text.contains("SIMD"));

        let text = formatter(false).detailed_text(&sample_report(), &summary);
        assert!(!text.contains("Flags        :"));
    }

    #[test]
    fn absent_fields_render_unknown_only_where_documented() {
        let report = Report {
            cpu: CpuProfile::default(),
            memory: MemoryProfile::default(),
            numa: Vec::new(),
            gpus: Vec::new(),
            storage: Vec::new(),
            os: OsProfile::default(),
            details: Details::default(),
        };
        let summary = report.summary(false, false);
        let text = formatter(false).summary_text(&summary);
        assert_eq!(text, "CPU: unknown\nMemory: unknown");
    }

    #[test]
    fn gpu_and_storage_lines_appear_only_when_enabled() {
        let report = sample_report();

        let hidden = report.summary(false, false);
        let text = formatter(false).summary_text(&hidden);
        assert!(!text.contains("GPU"));
        assert!(!text.contains("Storage"));

        let shown = report.summary(true, true);
        let text = formatter(false).summary_text(&shown);
        assert!(text.contains("GPU: NVIDIA NVIDIA GeForce RTX 3080"));
        assert!(text.contains("Storage: 1 SSD"));
    }

    #[test]
    fn detailed_mode_includes_sections_and_hints() {
        let mut report = sample_report();
        report.memory.dimm_speeds = Vec::new();
        report.memory.dimm_needs_root = true;
        let summary = report.summary(false, false);
        let text = formatter(false).detailed_text(&report, &summary);

        assert!(text.contains("== CPU Details =="));
        assert!(text.contains("== NUMA Topology =="));
        assert!(text.contains("Node 0: cpus=0-15; mem=64.0 GiB"));
        assert!(text.contains("(run as root to read via dmidecode)"));
        assert!(!text.contains("== GPU(s) =="));
        assert!(!text.contains("== Storage Devices =="));
        assert!(text.contains("== OS / Kernel / Toolchain =="));
    }

    #[test]
    fn detail_flags_enable_gpu_and_storage_sections() {
        let report = sample_report();
        let summary = report.summary(true, true);
        let f = Formatter::new(RenderOptions {
            color: false,
            show_gpu_detail: true,
            show_storage_detail: true,
        });
        let text = f.detailed_text(&report, &summary);
        assert!(text.contains("== GPU(s) =="));
        assert!(text.contains("      driver: 535.154.05"));
        assert!(text.contains("== Storage Devices =="));
        assert!(text.contains("sda: SSD, 500G, model=Samsung SSD 860"));
    }

    #[test]
    fn strip_ansi_removes_sgr_sequences() {
        assert_eq!(strip_ansi("\x1b[1;36mCPU\x1b[0m: x"), "CPU: x");
        assert_eq!(strip_ansi("plain"), "plain");
    }
}
