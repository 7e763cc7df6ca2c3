//! Engine configuration
//!
//! Configuration is loaded from a TOML file; every field has a default so a
//! partial file (or none at all) still yields a usable engine.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration loading error.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file '{path}': {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML.
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        /// Path that failed to parse.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Window settings.
    pub window: WindowConfig,
    /// Fixed-timestep simulation settings.
    pub simulation: SimulationConfig,
    /// Ordered shader stage names forming the render pipeline.
    pub pipeline: Vec<String>,
    /// Root directory assets are loaded from.
    pub asset_root: PathBuf,
    /// Audio output settings.
    pub audio: AudioConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            simulation: SimulationConfig::default(),
            pipeline: Vec::new(),
            asset_root: PathBuf::from("assets"),
            audio: AudioConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window title.
    pub title: String,
    /// Drawable width in pixels.
    pub width: u32,
    /// Drawable height in pixels.
    pub height: u32,
    /// Whether to synchronize buffer swaps to the display.
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Cascade".to_string(),
            width: 1280,
            height: 720,
            vsync: true,
        }
    }
}

/// Fixed-timestep simulation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Simulation ticks per second.
    pub tick_rate: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self { tick_rate: 50 }
    }
}

impl SimulationConfig {
    /// Fixed timestep in seconds.
    pub fn timestep(&self) -> f32 {
        1.0 / self.tick_rate as f32
    }
}

/// Audio output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Master volume, 0 to 100.
    pub master_volume: u8,
    /// Start with output muted.
    pub muted: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            master_volume: 100,
            muted: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.simulation.tick_rate, 50);
        assert_eq!(config.audio.master_volume, 100);
        assert!(!config.audio.muted);
        assert!(config.pipeline.is_empty());
    }

    #[test]
    fn test_timestep_from_tick_rate() {
        let simulation = SimulationConfig { tick_rate: 50 };
        assert_relative_eq!(simulation.timestep(), 0.02);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            pipeline = ["world", "fxaa", "tonemap"]

            [window]
            width = 1920
            height = 1080

            [simulation]
            tick_rate = 100
            "#,
        )
        .unwrap();
        assert_eq!(config.window.width, 1920);
        assert_eq!(config.window.title, "Cascade");
        assert_eq!(config.simulation.tick_rate, 100);
        assert_eq!(config.pipeline, ["world", "fxaa", "tonemap"]);
        assert_eq!(config.audio.master_volume, 100);
    }
}
