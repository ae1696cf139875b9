//! OS/kernel/toolchain entity

use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct OsProfile {
    /// Distro pretty-name on Linux, product name + version on macOS.
    pub distro: Option<String>,
    /// "Linux 6.5.0-14-generic" / "Darwin 23.4.0".
    pub kernel: Option<String>,
    pub machine: Option<String>,
    /// First line of the compiler version banner, when a compiler exists.
    pub toolchain: Option<String>,
}
