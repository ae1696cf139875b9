//! macOS probe set: sysctl, sw_vers, vm_stat, system_profiler and diskutil.
//! Domains the platform does not expose (NUMA, governor, boost) stay absent.

use std::collections::{BTreeMap, BTreeSet};

use super::{
    uname_info, DimmProbe, FrequencyProbe, KernelInfo, MemoryCounters, OsRelease, ProbeSet,
    RawTopology, ToolTopology,
};
use crate::data::{BoostState, CacheKind, CacheLevel, GpuDevice, NumaNode, StorageDevice};
use crate::utils::command::run_if_present;
use crate::utils::parsing::{human_bytes, parse_colon_map};

pub struct DarwinProbes;

impl ProbeSet for DarwinProbes {
    fn os_release(&self) -> OsRelease {
        let Some(out) = run_if_present("sw_vers", &[]) else {
            return OsRelease::default();
        };
        let fields = parse_colon_map(&out);
        let name = fields.get("ProductName").cloned();
        let version = fields.get("ProductVersion").cloned();
        let pretty_name = match (&name, &version) {
            (Some(n), Some(v)) => Some(format!("{n} {v}")),
            (Some(n), None) => Some(n.clone()),
            _ => None,
        };
        OsRelease {
            pretty_name,
            id: name.map(|n| n.to_lowercase().replace(' ', "")),
            version,
        }
    }

    fn kernel(&self) -> KernelInfo {
        uname_info()
    }

    fn topology_tool(&self) -> ToolTopology {
        sysctl_dump()
            .map(|dump| parse_sysctl_topology(&dump))
            .unwrap_or_default()
    }

    fn topology_raw(&self) -> RawTopology {
        // sysctl is both the tool and the raw source here.
        RawTopology::default()
    }

    fn frequency(&self) -> FrequencyProbe {
        let dump = sysctl_dump().unwrap_or_default();
        // Intel Macs report the nominal clock in Hz; Apple Silicon exposes
        // neither key, and the fields simply stay absent.
        let base_mhz = sysctl_mhz(&dump, "hw.cpufrequency");
        let max_mhz = sysctl_mhz(&dump, "hw.cpufrequency_max");
        if let Some(mhz) = base_mhz {
            tracing::debug!(
                field = "base",
                strategy = "sysctl-cpufrequency",
                value = mhz,
                "frequency strategy resolved"
            );
        }
        FrequencyProbe {
            base_mhz,
            base_source: base_mhz.is_some().then_some("sysctl-cpufrequency"),
            max_mhz,
            max_source: max_mhz.is_some().then_some("sysctl-cpufrequency-max"),
            governor: None,
            driver: None,
            boost: BoostState::Unknown,
        }
    }

    fn caches(&self) -> Vec<CacheLevel> {
        sysctl_dump()
            .map(|dump| parse_sysctl_caches(&dump))
            .unwrap_or_default()
    }

    fn numa(&self) -> Vec<NumaNode> {
        // macOS exposes no NUMA topology.
        Vec::new()
    }

    fn memory(&self) -> MemoryCounters {
        let dump = sysctl_dump().unwrap_or_default();
        let total = dump.get("hw.memsize").and_then(|v| v.parse::<u64>().ok());

        let (free, available) = run_if_present("vm_stat", &[])
            .map(|out| parse_vm_stat(&out))
            .unwrap_or((None, None));

        let (swap_total, swap_free) = dump
            .get("vm.swapusage")
            .map(|v| parse_swapusage(v))
            .unwrap_or((None, None));

        MemoryCounters {
            total,
            available,
            free,
            swap_total,
            swap_free,
            hugepages_total: None,
            hugepage_size: None,
        }
    }

    fn dimm(&self) -> DimmProbe {
        let speeds = run_if_present("system_profiler", &["SPMemoryDataType"])
            .map(|out| parse_sp_memory_speeds(&out))
            .unwrap_or_default();
        DimmProbe {
            speeds,
            needs_root: false,
        }
    }

    fn gpus(&self) -> Vec<GpuDevice> {
        run_if_present("system_profiler", &["SPDisplaysDataType"])
            .map(|out| parse_sp_displays(&out))
            .unwrap_or_default()
    }

    fn storage(&self) -> Vec<StorageDevice> {
        let Some(listing) = run_if_present("diskutil", &["list", "physical"]) else {
            return Vec::new();
        };
        parse_diskutil_device_names(&listing)
            .into_iter()
            .filter_map(|name| {
                run_if_present("diskutil", &["info", &name])
                    .map(|info| parse_diskutil_info(&name, &info))
            })
            .collect()
    }

    fn toolchain(&self) -> Option<String> {
        for compiler in ["clang", "cc"] {
            if let Some(line) = run_if_present(compiler, &["--version"])
                .and_then(|out| out.lines().next().map(str::to_string))
            {
                return Some(line);
            }
        }
        None
    }
}

fn sysctl_dump() -> Option<BTreeMap<String, String>> {
    run_if_present("sysctl", &["hw", "machdep.cpu", "vm.swapusage"])
        .map(|out| parse_colon_map(&out))
}

fn sysctl_mhz(dump: &BTreeMap<String, String>, key: &str) -> Option<f64> {
    dump.get(key)
        .and_then(|v| v.parse::<f64>().ok())
        .map(|hz| hz / 1_000_000.0)
}

pub(crate) fn parse_sysctl_topology(dump: &BTreeMap<String, String>) -> ToolTopology {
    let get_u32 = |key: &str| dump.get(key).and_then(|v| v.parse::<u32>().ok());

    let sockets = get_u32("hw.packages");
    let physical = get_u32("hw.physicalcpu");
    let logical = get_u32("hw.logicalcpu").or_else(|| get_u32("hw.ncpu"));

    let cores_per_socket = match (physical, sockets) {
        (Some(p), Some(s)) if s > 0 => Some(p / s),
        (p, None) => p,
        _ => None,
    };
    let threads_per_core = match (logical, physical) {
        (Some(l), Some(p)) if p > 0 => Some(l / p),
        _ => None,
    };

    ToolTopology {
        model: dump.get("machdep.cpu.brand_string").cloned(),
        arch: None,
        sockets,
        cores_per_socket,
        threads_per_core,
        logical_cpus: logical,
        performance_cores: get_u32("hw.perflevel0.physicalcpu"),
        efficiency_cores: get_u32("hw.perflevel1.physicalcpu"),
        current_mhz: sysctl_mhz(dump, "hw.cpufrequency"),
        max_mhz: sysctl_mhz(dump, "hw.cpufrequency_max"),
        l1d: cache_size(dump, "hw.l1dcachesize"),
        l1i: cache_size(dump, "hw.l1icachesize"),
        l2: cache_size(dump, "hw.l2cachesize"),
        l3: cache_size(dump, "hw.l3cachesize"),
        flags: parse_feature_flags(dump),
        raw: dump.clone(),
    }
}

fn cache_size(dump: &BTreeMap<String, String>, key: &str) -> Option<String> {
    dump.get(key)
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|&b| b > 0)
        .map(human_bytes)
}

/// CPU feature tokens normalized to the lowercase underscore form the SIMD
/// mapping table expects ("SSE4.1" -> "sse4_1").
pub(crate) fn parse_feature_flags(dump: &BTreeMap<String, String>) -> BTreeSet<String> {
    let mut flags: BTreeSet<String> = BTreeSet::new();
    for key in ["machdep.cpu.features", "machdep.cpu.leaf7_features"] {
        if let Some(value) = dump.get(key) {
            flags.extend(
                value
                    .split_whitespace()
                    .map(|f| f.to_lowercase().replace('.', "_")),
            );
        }
    }
    // Apple Silicon advertises SIMD via hw.optional instead.
    for (key, flag) in [("hw.optional.neon", "neon"), ("hw.optional.AdvSIMD", "asimd")] {
        if dump.get(key).map(String::as_str) == Some("1") {
            flags.insert(flag.to_string());
        }
    }
    flags
}

pub(crate) fn parse_sysctl_caches(dump: &BTreeMap<String, String>) -> Vec<CacheLevel> {
    let mut out = Vec::new();
    let levels = [
        ("hw.l1icachesize", 1, CacheKind::Instruction),
        ("hw.l1dcachesize", 1, CacheKind::Data),
        ("hw.l2cachesize", 2, CacheKind::Unified),
        ("hw.l3cachesize", 3, CacheKind::Unified),
    ];
    for (key, level, kind) in levels {
        if let Some(size) = cache_size(dump, key) {
            out.push(CacheLevel {
                level,
                kind,
                size,
                associativity: None,
            });
        }
    }
    out
}

/// Free and approximate available bytes from vm_stat page counts.
/// Available sums free, inactive and purgeable pages, the closest analogue
/// of Linux MemAvailable.
pub(crate) fn parse_vm_stat(text: &str) -> (Option<u64>, Option<u64>) {
    let page_size: u64 = text
        .lines()
        .next()
        .and_then(|l| l.split("page size of").nth(1))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|n| n.parse().ok())
        .unwrap_or(4096);

    let pages = |label: &str| -> Option<u64> {
        text.lines()
            .find(|l| l.trim_start().starts_with(label))?
            .split_once(':')?
            .1
            .trim()
            .trim_end_matches('.')
            .parse()
            .ok()
    };

    let free = pages("Pages free");
    let available = match (free, pages("Pages inactive"), pages("Pages purgeable")) {
        (Some(f), inactive, purgeable) => {
            Some(f + inactive.unwrap_or(0) + purgeable.unwrap_or(0))
        }
        _ => None,
    };
    (
        free.map(|p| p * page_size),
        available.map(|p| p * page_size),
    )
}

/// Swap totals from the vm.swapusage value:
/// "total = 2048.00M  used = 1158.25M  free = 889.75M  (encrypted)"
pub(crate) fn parse_swapusage(value: &str) -> (Option<u64>, Option<u64>) {
    let field = |label: &str| -> Option<u64> {
        let rest = value.split(label).nth(1)?;
        let token = rest.trim_start().strip_prefix('=')?.trim_start();
        let token = token.split_whitespace().next()?;
        let (digits, unit) = token.split_at(token.len().saturating_sub(1));
        let scale: u64 = match unit {
            "K" => 1024,
            "M" => 1024 * 1024,
            "G" => 1024 * 1024 * 1024,
            _ => return None,
        };
        let v: f64 = digits.parse().ok()?;
        Some((v * scale as f64) as u64)
    };
    (field("total"), field("free"))
}

pub(crate) fn parse_sp_memory_speeds(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            (key.trim() == "Speed").then(|| value.trim().to_string())
        })
        .filter(|v| !v.is_empty() && v != "N/A")
        .collect()
}

pub(crate) fn parse_sp_displays(text: &str) -> Vec<GpuDevice> {
    let mut gpus = Vec::new();
    let mut current: Option<String> = None;
    let mut vram: Option<String> = None;
    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        if key == "Chipset Model" {
            if let Some(name) = current.take() {
                gpus.push(GpuDevice::Apple {
                    name,
                    vram: vram.take(),
                });
            }
            current = Some(value.to_string());
        } else if key.starts_with("VRAM") && !value.is_empty() {
            vram = Some(value.to_string());
        }
    }
    if let Some(name) = current {
        gpus.push(GpuDevice::Apple { name, vram });
    }
    gpus
}

/// Device identifiers ("disk0") from `diskutil list physical` headers like
/// "/dev/disk0 (internal, physical):".
pub(crate) fn parse_diskutil_device_names(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| line.starts_with("/dev/disk"))
        .filter_map(|line| {
            line.split_whitespace()
                .next()
                .and_then(|dev| dev.strip_prefix("/dev/"))
                .map(str::to_string)
        })
        .collect()
}

pub(crate) fn parse_diskutil_info(name: &str, text: &str) -> StorageDevice {
    let fields = parse_colon_map(text);
    let size = fields
        .get("Disk Size")
        .map(|v| v.split('(').next().unwrap_or(v).trim().to_string());
    // "Solid State: Yes" means non-rotational; absence (external enclosures)
    // defaults to rotational=false since most Mac media is flash.
    let rotational = fields.get("Solid State").map(String::as_str) == Some("No");
    StorageDevice {
        name: name.to_string(),
        kind: "disk".to_string(),
        size,
        model: fields.get("Device / Media Name").cloned(),
        serial: None,
        state: None,
        rotational,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dump(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn sysctl_topology_derives_core_splits() {
        let d = dump(&[
            ("machdep.cpu.brand_string", "Apple M2 Pro"),
            ("hw.packages", "1"),
            ("hw.physicalcpu", "10"),
            ("hw.logicalcpu", "10"),
            ("hw.perflevel0.physicalcpu", "6"),
            ("hw.perflevel1.physicalcpu", "4"),
            ("hw.l2cachesize", "4194304"),
        ]);
        let topo = parse_sysctl_topology(&d);
        assert_eq!(topo.model.as_deref(), Some("Apple M2 Pro"));
        assert_eq!(topo.sockets, Some(1));
        assert_eq!(topo.cores_per_socket, Some(10));
        assert_eq!(topo.threads_per_core, Some(1));
        assert_eq!(topo.performance_cores, Some(6));
        assert_eq!(topo.efficiency_cores, Some(4));
        assert_eq!(topo.l2.as_deref(), Some("4.0 MiB"));
    }

    #[test]
    fn empty_sysctl_dump_yields_absent_record() {
        let topo = parse_sysctl_topology(&BTreeMap::new());
        assert!(topo.model.is_none());
        assert!(topo.sockets.is_none());
        assert!(topo.flags.is_empty());
    }

    #[test]
    fn feature_flags_normalize_to_table_form() {
        let d = dump(&[
            ("machdep.cpu.features", "FPU SSE4.1 SSE4.2 AVX1.0"),
            ("machdep.cpu.leaf7_features", "AVX2 BMI1"),
        ]);
        let flags = parse_feature_flags(&d);
        assert!(flags.contains("sse4_1"));
        assert!(flags.contains("avx2"));
        assert!(!flags.contains("SSE4.1"));
    }

    #[test]
    fn apple_silicon_flags_come_from_hw_optional() {
        let d = dump(&[("hw.optional.neon", "1")]);
        assert!(parse_feature_flags(&d).contains("neon"));
    }

    #[test]
    fn vm_stat_pages_scale_by_page_size() {
        let text = "\
Mach Virtual Memory Statistics: (page size of 16384 bytes)
Pages free:                               10000.
Pages active:                            200000.
Pages inactive:                           50000.
Pages purgeable:                           5000.
";
        let (free, available) = parse_vm_stat(text);
        assert_eq!(free, Some(10000 * 16384));
        assert_eq!(available, Some(65000 * 16384));
    }

    #[test]
    fn vm_stat_garbage_yields_absent() {
        assert_eq!(parse_vm_stat("nothing useful"), (None, None));
    }

    #[test]
    fn swapusage_parses_suffixed_values() {
        let (total, free) =
            parse_swapusage("total = 2048.00M  used = 1158.25M  free = 889.75M  (encrypted)");
        assert_eq!(total, Some((2048.0 * 1024.0 * 1024.0) as u64));
        assert_eq!(free, Some((889.75 * 1024.0 * 1024.0) as u64));
        assert_eq!(parse_swapusage("garbage"), (None, None));
    }

    #[test]
    fn sp_displays_builds_apple_records() {
        let text = "\
Graphics/Displays:

    Apple M2 Pro:

      Chipset Model: Apple M2 Pro
      Type: GPU
      Bus: Built-In
      Total Number of Cores: 16
";
        let gpus = parse_sp_displays(text);
        assert_eq!(gpus.len(), 1);
        match &gpus[0] {
            GpuDevice::Apple { name, vram } => {
                assert_eq!(name, "Apple M2 Pro");
                assert!(vram.is_none());
            }
            other => panic!("expected Apple record, got {other:?}"),
        }
    }

    #[test]
    fn sp_memory_collects_speed_lines() {
        let text = "\
Memory Slots:

    BANK 0/DIMM0:

      Size: 16 GB
      Type: DDR4
      Speed: 2667 MHz

    BANK 1/DIMM1:

      Size: 16 GB
      Type: DDR4
      Speed: 2667 MHz
";
        assert_eq!(
            parse_sp_memory_speeds(text),
            vec!["2667 MHz".to_string(), "2667 MHz".to_string()]
        );
    }

    #[test]
    fn diskutil_listing_yields_device_names() {
        let text = "\
/dev/disk0 (internal, physical):
   #:                       TYPE NAME                    SIZE       IDENTIFIER
   0:      GUID_partition_scheme                        *500.3 GB   disk0
";
        assert_eq!(parse_diskutil_device_names(text), vec!["disk0".to_string()]);
    }

    #[test]
    fn diskutil_info_classifies_solid_state() {
        let text = "\
   Device Identifier:         disk0
   Device / Media Name:       APPLE SSD AP0512Z
   Disk Size:                 500.3 GB (500277790720 Bytes) (exactly 977105060 512-Byte-Units)
   Solid State:               Yes
";
        let dev = parse_diskutil_info("disk0", text);
        assert_eq!(dev.model.as_deref(), Some("APPLE SSD AP0512Z"));
        assert_eq!(dev.size.as_deref(), Some("500.3 GB"));
        assert!(!dev.rotational);
        assert_eq!(dev.media(), "SSD");
    }
}
