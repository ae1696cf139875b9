//! Hardware/OS profiling for benchmarking hosts (Linux and macOS)
//!
//! Every value is best effort and degrades to absent rather than failing
//! report generation.

pub mod aggregate;
pub mod config;
pub mod data;
pub mod error;
pub mod probes;
pub mod render;
pub mod utils;

pub use data::{Report, Summary};
pub use error::{ProfileError, Result};

/// Probe the live system and aggregate the canonical report.
pub fn collect_report() -> Report {
    let probes = probes::platform_probes();
    aggregate::build_report(probes.as_ref())
}
