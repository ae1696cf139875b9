//! Canonical report entities; optional fields mean "could not resolve"

pub mod cpu;
pub mod gpu;
pub mod memory;
pub mod os;
pub mod report;
pub mod storage;

pub use cpu::{BoostState, CacheKind, CacheLevel, CpuProfile, NumaNode};
pub use gpu::GpuDevice;
pub use memory::MemoryProfile;
pub use os::OsProfile;
pub use report::{Details, Report, Summary};
pub use storage::StorageDevice;
