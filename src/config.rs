use anyhow::{Context, Result};
use bandmeter::WindowUnit;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_window")]
    pub window: u64,
    #[serde(default = "default_hop")]
    pub hop: u64,
    #[serde(default)]
    pub unit: WindowUnit,
    #[serde(default = "default_bands")]
    pub bands: usize,
    #[serde(default = "default_floor_db")]
    pub floor_db: f64,
    /// Defaults to the available parallelism
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default)]
    pub queue_depth: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_block_frames")]
    pub block_frames: usize,
    #[serde(default)]
    pub summary: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
            hop: default_hop(),
            unit: WindowUnit::default(),
            bands: default_bands(),
            floor_db: default_floor_db(),
            workers: None,
            queue_depth: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            block_frames: default_block_frames(),
            summary: false,
        }
    }
}

fn default_window() -> u64 { 2048 }
fn default_hop() -> u64 { 1024 }
fn default_bands() -> usize { 32 }
fn default_floor_db() -> f64 { -120.0 }
fn default_block_frames() -> usize { 4096 }

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// `./bandmeter.toml`, then `~/.config/bandmeter/config.toml`, then the
/// platform config directory.
pub fn discover_config() -> Option<PathBuf> {
    let local = PathBuf::from("bandmeter.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("bandmeter").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("bandmeter").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}
