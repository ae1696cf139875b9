//! String parsing utilities

/// Extract the value after the first colon, trimmed.
pub fn extract_after_colon(line: &str) -> Option<String> {
    line.split_once(':')
        .map(|(_, v)| v.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parse a "key: value" dump (lscpu, /proc/meminfo, dmidecode blocks) into
/// key/value pairs, keeping the last occurrence of duplicate keys.
pub fn parse_colon_map(text: &str) -> std::collections::BTreeMap<String, String> {
    let mut map = std::collections::BTreeMap::new();
    for line in text.lines() {
        if let Some((k, v)) = line.split_once(':') {
            let k = k.trim();
            let v = v.trim();
            if !k.is_empty() && !v.is_empty() {
                map.insert(k.to_string(), v.to_string());
            }
        }
    }
    map
}

/// Parse a meminfo-style "NNN kB" value into bytes.
pub fn kb_field_to_bytes(value: &str) -> Option<u64> {
    let digits = value.trim().strip_suffix("kB")?.trim();
    digits.parse::<u64>().ok().map(|kb| kb * 1024)
}

/// Render a byte count as a human-readable string with one decimal place.
///
/// Values at or above each 1024 threshold promote to the next unit, so
/// `1024` renders as "1.0 KiB" and `1536` as "1.5 KiB".
pub fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Format a MHz value as "N.NN GHz".
pub fn mhz_to_ghz(mhz: f64) -> String {
    format!("{:.2} GHz", mhz / 1000.0)
}
