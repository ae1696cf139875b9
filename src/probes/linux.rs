//! Linux probe set: procfs/sysfs plus lscpu, dmidecode, lsblk and the GPU
//! vendor tools. Parsing lives in pure functions over captured text.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::{
    resolve_boost, uname_info, DimmProbe, FrequencyProbe, KernelInfo, MemoryCounters, OsRelease,
    ProbeSet, RawTopology, ToolTopology,
};
use crate::data::{CacheKind, CacheLevel, GpuDevice, NumaNode, StorageDevice};
use crate::utils::command::{command_exists, run_if_present};
use crate::utils::file::{path_exists, read_parsed, read_trimmed};
use crate::utils::parsing::{human_bytes, kb_field_to_bytes, parse_colon_map};

const CPUFREQ_POLICY0: &str = "/sys/devices/system/cpu/cpufreq/policy0";
const CPUFREQ_BOOST: &str = "/sys/devices/system/cpu/cpufreq/boost";
const INTEL_NO_TURBO: &str = "/sys/devices/system/cpu/intel_pstate/no_turbo";
const CPU0_CACHE: &str = "/sys/devices/system/cpu/cpu0/cache";
const NODE_ROOT: &str = "/sys/devices/system/node";

pub struct LinuxProbes;

impl ProbeSet for LinuxProbes {
    fn os_release(&self) -> OsRelease {
        fs::read_to_string("/etc/os-release")
            .map(|text| parse_os_release(&text))
            .unwrap_or_default()
    }

    fn kernel(&self) -> KernelInfo {
        uname_info()
    }

    fn topology_tool(&self) -> ToolTopology {
        run_if_present("lscpu", &[])
            .map(|out| parse_lscpu(&out))
            .unwrap_or_default()
    }

    fn topology_raw(&self) -> RawTopology {
        fs::read_to_string("/proc/cpuinfo")
            .map(|text| parse_cpuinfo(&text))
            .unwrap_or_default()
    }

    fn frequency(&self) -> FrequencyProbe {
        let policy = |file: &str| Path::new(CPUFREQ_POLICY0).join(file);

        let (base_mhz, base_source) = first_strategy(
            "base",
            &[
                ("sysfs-base-frequency", &|| read_khz(policy("base_frequency"))),
                ("cpuinfo-average", &|| {
                    let text = fs::read_to_string("/proc/cpuinfo").ok()?;
                    cpuinfo_mhz_average(&text)
                }),
            ],
        );
        // The policy ceiling, preferred over the scaling_max_freq alias which
        // tracks the current governor limit rather than the hardware cap.
        let (max_mhz, max_source) = first_strategy(
            "max",
            &[
                ("sysfs-cpuinfo-max", &|| read_khz(policy("cpuinfo_max_freq"))),
                ("sysfs-scaling-max", &|| read_khz(policy("scaling_max_freq"))),
            ],
        );

        let governor = read_trimmed(policy("scaling_governor"));
        let driver = read_trimmed(policy("scaling_driver"))
            .or_else(|| read_trimmed("/sys/devices/system/cpu/cpufreq/driver"));

        let generic = path_exists(CPUFREQ_BOOST)
            .then(|| read_trimmed(CPUFREQ_BOOST))
            .flatten();
        let no_turbo = path_exists(INTEL_NO_TURBO)
            .then(|| read_trimmed(INTEL_NO_TURBO))
            .flatten();
        let boost = resolve_boost(generic.as_deref(), no_turbo.as_deref());

        FrequencyProbe {
            base_mhz,
            base_source,
            max_mhz,
            max_source,
            governor,
            driver,
            boost,
        }
    }

    fn caches(&self) -> Vec<CacheLevel> {
        let mut out = Vec::new();
        let Ok(entries) = fs::read_dir(CPU0_CACHE) else {
            return out;
        };
        let mut dirs: Vec<PathBuf> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();
        for dir in dirs {
            let level: Option<u8> = read_parsed(dir.join("level"));
            let kind = read_trimmed(dir.join("type")).and_then(|t| CacheKind::parse(&t));
            let size = read_trimmed(dir.join("size"));
            if let (Some(level), Some(kind), Some(size)) = (level, kind, size) {
                out.push(CacheLevel {
                    level,
                    kind,
                    size,
                    associativity: read_trimmed(dir.join("ways_of_associativity")),
                });
            }
        }
        out
    }

    fn numa(&self) -> Vec<NumaNode> {
        let mut nodes = Vec::new();
        let Ok(entries) = fs::read_dir(NODE_ROOT) else {
            return nodes;
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok().and_then(|e| e.file_name().into_string().ok()))
            .filter(|n| n.starts_with("node"))
            .collect();
        names.sort();
        for name in names {
            let Ok(id) = name["node".len()..].parse::<u32>() else {
                continue;
            };
            let dir = Path::new(NODE_ROOT).join(&name);
            let mem_total = fs::read_to_string(dir.join("meminfo"))
                .ok()
                .and_then(|text| node_mem_total_bytes(&text))
                .map(human_bytes);
            nodes.push(NumaNode {
                id,
                cpulist: read_trimmed(dir.join("cpulist")),
                mem_total,
            });
        }
        nodes
    }

    fn memory(&self) -> MemoryCounters {
        fs::read_to_string("/proc/meminfo")
            .map(|text| parse_meminfo(&text))
            .unwrap_or_default()
    }

    fn dimm(&self) -> DimmProbe {
        if !command_exists("dmidecode") {
            return DimmProbe::default();
        }
        if unsafe { libc::geteuid() } != 0 {
            tracing::debug!("dmidecode present but euid != 0, skipping DIMM probe");
            return DimmProbe {
                speeds: Vec::new(),
                needs_root: true,
            };
        }
        let speeds = run_if_present("dmidecode", &["-t", "memory"])
            .map(|out| parse_dmidecode_memory(&out))
            .unwrap_or_default();
        DimmProbe {
            speeds,
            needs_root: false,
        }
    }

    fn gpus(&self) -> Vec<GpuDevice> {
        if let Some(out) = run_if_present(
            "nvidia-smi",
            &[
                "--query-gpu=name,driver_version,memory.total,pstate,clocks.gr,clocks.mem",
                "--format=csv,noheader,nounits",
            ],
        ) {
            let gpus = parse_nvidia_csv(&out);
            if !gpus.is_empty() {
                return gpus;
            }
        }
        if let Some(out) = run_if_present(
            "rocm-smi",
            &["--showproductname", "--showdriverversion", "--showvbios"],
        ) {
            if !out.is_empty() {
                return vec![GpuDevice::Amd {
                    name: None,
                    raw: out,
                }];
            }
        }
        if let Some(out) = run_if_present("glxinfo", &["-B"]) {
            if let Some(renderer) = glx_renderer(&out) {
                return vec![GpuDevice::OpenGl { renderer }];
            }
        }
        Vec::new()
    }

    fn storage(&self) -> Vec<StorageDevice> {
        // -d: whole devices only; -e7: exclude loop devices
        run_if_present(
            "lsblk",
            &["-d", "-e7", "-o", "NAME,TYPE,ROTA,SIZE,MODEL,SERIAL,STATE"],
        )
        .map(|out| {
            out.lines()
                .skip(1)
                .filter_map(parse_lsblk_row)
                .collect()
        })
        .unwrap_or_default()
    }

    fn toolchain(&self) -> Option<String> {
        first_version_line("gcc").or_else(|| first_version_line("cc"))
    }
}

fn first_version_line(compiler: &str) -> Option<String> {
    run_if_present(compiler, &["--version"])
        .and_then(|out| out.lines().next().map(str::to_string))
}

/// Try the named strategies in declared order; the first hit wins and its
/// name is recorded so the chosen derivation stays inspectable.
fn first_strategy(
    field: &str,
    strategies: &[(&'static str, &dyn Fn() -> Option<f64>)],
) -> (Option<f64>, Option<&'static str>) {
    for (name, probe) in strategies {
        if let Some(value) = probe() {
            tracing::debug!(field, strategy = name, value, "frequency strategy resolved");
            return (Some(value), Some(name));
        }
    }
    (None, None)
}

fn read_khz<P: AsRef<Path>>(path: P) -> Option<f64> {
    read_parsed::<f64, _>(path).map(|khz| khz / 1000.0)
}

pub(crate) fn parse_os_release(text: &str) -> OsRelease {
    let mut pretty_name = None;
    let mut name = None;
    let mut id = None;
    let mut version = None;
    for line in text.lines() {
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().trim_matches('"').to_string();
            match key {
                "PRETTY_NAME" => pretty_name = Some(value),
                "NAME" => name = Some(value),
                "ID" => id = Some(value),
                "VERSION" => version = Some(value),
                _ => {}
            }
        }
    }
    OsRelease {
        pretty_name: pretty_name.or(name),
        id,
        version,
    }
}

pub(crate) fn parse_lscpu(text: &str) -> ToolTopology {
    let raw = parse_colon_map(text);
    let get = |key: &str| raw.get(key).cloned();
    let get_u32 = |key: &str| raw.get(key).and_then(|v| v.parse::<u32>().ok());
    let get_f64 = |key: &str| raw.get(key).and_then(|v| v.parse::<f64>().ok());

    let flags = raw
        .get("Flags")
        .map(|f| f.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();

    ToolTopology {
        model: get("Model name"),
        arch: get("Architecture"),
        sockets: get_u32("Socket(s)"),
        cores_per_socket: get_u32("Core(s) per socket"),
        threads_per_core: get_u32("Thread(s) per core"),
        logical_cpus: get_u32("CPU(s)"),
        performance_cores: None,
        efficiency_cores: None,
        current_mhz: get_f64("CPU MHz"),
        max_mhz: get_f64("CPU max MHz"),
        l1d: get("L1d cache"),
        l1i: get("L1i cache"),
        l2: get("L2 cache"),
        l3: get("L3 cache"),
        flags,
        raw,
    }
}

pub(crate) fn parse_cpuinfo(text: &str) -> RawTopology {
    let mut model = None;
    let mut flags: BTreeSet<String> = BTreeSet::new();
    // physical id -> set of core ids, to count sockets and cores per socket
    let mut sockets: std::collections::BTreeMap<String, BTreeSet<String>> = Default::default();

    for block in text.split("\n\n").filter(|b| !b.trim().is_empty()) {
        let fields = parse_colon_map(block);
        if model.is_none() {
            model = fields.get("model name").cloned();
        }
        if let Some(f) = fields.get("flags") {
            flags.extend(f.split_whitespace().map(str::to_string));
        }
        let phys = fields.get("physical id").cloned().unwrap_or_else(|| "0".into());
        let core = fields.get("core id").cloned().unwrap_or_else(|| "NA".into());
        sockets.entry(phys).or_default().insert(core);
    }

    let socket_count = (!sockets.is_empty()).then(|| sockets.len() as u32);
    let cores_per_socket = sockets.values().map(|cores| cores.len() as u32).max();

    RawTopology {
        model,
        sockets: socket_count,
        cores_per_socket,
        flags,
    }
}

/// Average of the per-logical-core "cpu MHz" readings. This is the current
/// clock, not the nominal base; documented approximation when the platform
/// exposes no authoritative base frequency.
pub(crate) fn cpuinfo_mhz_average(text: &str) -> Option<f64> {
    let values: Vec<f64> = text
        .lines()
        .filter(|line| line.to_lowercase().starts_with("cpu mhz"))
        .filter_map(|line| line.split_once(':')?.1.trim().parse::<f64>().ok())
        .collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub(crate) fn parse_meminfo(text: &str) -> MemoryCounters {
    let fields = parse_colon_map(text);
    let bytes = |key: &str| fields.get(key).and_then(|v| kb_field_to_bytes(v));
    MemoryCounters {
        total: bytes("MemTotal"),
        available: bytes("MemAvailable"),
        free: bytes("MemFree"),
        swap_total: bytes("SwapTotal"),
        swap_free: bytes("SwapFree"),
        hugepages_total: fields
            .get("HugePages_Total")
            .and_then(|v| v.parse::<u64>().ok()),
        hugepage_size: bytes("Hugepagesize"),
    }
}

pub(crate) fn node_mem_total_bytes(meminfo: &str) -> Option<u64> {
    // Node meminfo lines look like "Node 0 MemTotal:       32768000 kB"
    let line = meminfo.lines().find(|l| l.contains("MemTotal:"))?;
    let after = line.split("MemTotal:").nth(1)?;
    let kb: u64 = after.split_whitespace().next()?.parse().ok()?;
    Some(kb * 1024)
}

/// Speed strings from dmidecode memory blocks, one per populated module.
/// "Configured Memory Speed" wins over the rated "Speed" field when both are
/// present; vendor formats are not reconciled beyond that, best effort.
pub(crate) fn parse_dmidecode_memory(text: &str) -> Vec<String> {
    let mut speeds = Vec::new();
    for block in text.split("\n\n") {
        let fields = parse_colon_map(block);
        if fields.get("Size").map(String::as_str) == Some("No Module Installed") {
            continue;
        }
        if let Some(speed) = fields
            .get("Configured Memory Speed")
            .or_else(|| fields.get("Speed"))
        {
            if !speed.is_empty() {
                speeds.push(speed.clone());
            }
        }
    }
    speeds
}

pub(crate) fn parse_nvidia_csv(text: &str) -> Vec<GpuDevice> {
    text.lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split(',').map(str::trim).collect();
            if parts.len() < 5 {
                return None;
            }
            let field = |i: usize| {
                parts
                    .get(i)
                    .filter(|v| !v.is_empty() && !v.contains("N/A"))
                    .map(|v| v.to_string())
            };
            Some(GpuDevice::Nvidia {
                name: parts[0].to_string(),
                driver: field(1),
                vram: field(2).map(|v| format!("{v} MiB")),
                pstate: field(3),
                graphics_clock: field(4).map(|v| format!("{v} MHz")),
            })
        })
        .collect()
}

pub(crate) fn glx_renderer(text: &str) -> Option<String> {
    text.lines()
        .find(|line| line.contains("OpenGL renderer string"))
        .and_then(|line| line.split_once(':'))
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Reconstruct one lsblk row with columns NAME TYPE ROTA SIZE MODEL SERIAL
/// STATE, where MODEL may contain embedded whitespace. With six or more
/// tokens the last two are serial and state and everything between column
/// four and them is the model; exactly five tokens means the fifth is the
/// model with no serial/state. Declared lossy for esoteric device names.
pub(crate) fn parse_lsblk_row(line: &str) -> Option<StorageDevice> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 4 {
        return None;
    }
    let (model, serial, state) = match parts.len() {
        4 => (None, None, None),
        5 => (Some(parts[4].to_string()), None, None),
        n => (
            Some(parts[4..n - 2].join(" ")),
            Some(parts[n - 2].to_string()),
            Some(parts[n - 1].to_string()),
        ),
    };
    Some(StorageDevice {
        name: parts[0].to_string(),
        kind: parts[1].to_string(),
        rotational: parts[2] == "1",
        size: Some(parts[3].to_string()),
        model,
        serial,
        state,
    })
}
