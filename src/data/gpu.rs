//! GPU device entity

use serde::Serialize;

/// One detected GPU. A variant record: only the fields the vendor tool
/// actually reports are populated, so each vendor carries its own shape.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "vendor")]
pub enum GpuDevice {
    #[serde(rename = "NVIDIA")]
    Nvidia {
        name: String,
        driver: Option<String>,
        vram: Option<String>,
        pstate: Option<String>,
        graphics_clock: Option<String>,
    },
    #[serde(rename = "AMD")]
    Amd {
        name: Option<String>,
        /// rocm-smi does not emit a stable parseable format; keep the dump.
        raw: String,
    },
    #[serde(rename = "Apple")]
    Apple { name: String, vram: Option<String> },
    #[serde(rename = "OpenGL")]
    OpenGl { renderer: String },
}

impl GpuDevice {
    pub fn vendor(&self) -> &'static str {
        match self {
            GpuDevice::Nvidia { .. } => "NVIDIA",
            GpuDevice::Amd { .. } => "AMD",
            GpuDevice::Apple { .. } => "Apple",
            GpuDevice::OpenGl { .. } => "OpenGL",
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            GpuDevice::Nvidia { name, .. } | GpuDevice::Apple { name, .. } => Some(name),
            GpuDevice::Amd { name, .. } => name.as_deref(),
            GpuDevice::OpenGl { renderer } => Some(renderer),
        }
    }
}
