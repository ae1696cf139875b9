//! Optional display configuration (`~/.config/benchprof/config.toml`)
//!
//! A missing or unparseable file falls back to defaults, never aborts a run.

use dirs::config_dir;
use serde::Deserialize;
use std::{fs, path::PathBuf};

#[derive(Deserialize, Debug, Default)]
pub struct Config {
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct DisplayConfig {
    /// GPU detail section in full output (off by default).
    pub show_gpu_detail: bool,
    /// Storage detail section in full output (off by default).
    pub show_storage_detail: bool,
    /// Persistent color preference; the --no-color flag still wins.
    pub color: Option<bool>,
}

fn user_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("benchprof/config.toml"))
}

pub fn load_config() -> Config {
    let Some(path) = user_config_path() else {
        return Config::default();
    };
    let Ok(data) = fs::read_to_string(&path) else {
        return Config::default();
    };
    match toml::de::from_str(&data) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "ignoring unparseable config file");
            Config::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_flags_default_off() {
        let config: Config = toml::de::from_str("").unwrap();
        assert!(!config.display.show_gpu_detail);
        assert!(!config.display.show_storage_detail);
        assert!(config.display.color.is_none());
    }

    #[test]
    fn display_flags_parse() {
        let config: Config = toml::de::from_str(
            "[display]\nshow_gpu_detail = true\ncolor = false\n",
        )
        .unwrap();
        assert!(config.display.show_gpu_detail);
        assert!(!config.display.show_storage_detail);
        assert_eq!(config.display.color, Some(false));
    }
}
