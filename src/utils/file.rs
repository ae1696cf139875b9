//! File reading utilities for procfs/sysfs style pseudo-files

use std::fs;
use std::path::Path;

/// Read a file to a trimmed string, or None if unreadable or empty.
pub fn read_trimmed<P: AsRef<Path>>(path: P) -> Option<String> {
    fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Read a single-line sysfs value and parse it.
pub fn read_parsed<T: std::str::FromStr, P: AsRef<Path>>(path: P) -> Option<T> {
    read_trimmed(path)?.parse().ok()
}

/// Check if a path exists.
pub fn path_exists<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().exists()
}
