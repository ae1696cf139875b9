//! Storage device entity

use serde::Serialize;

/// One physical block device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageDevice {
    pub name: String,
    pub kind: String,
    pub size: Option<String>,
    pub model: Option<String>,
    pub serial: Option<String>,
    pub state: Option<String>,
    pub rotational: bool,
}

impl StorageDevice {
    /// SSD/HDD classification derived from the rotational flag.
    pub fn media(&self) -> &'static str {
        if self.rotational {
            "HDD"
        } else {
            "SSD"
        }
    }
}
