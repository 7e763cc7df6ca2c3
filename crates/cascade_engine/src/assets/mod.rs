//! Asset loading
//!
//! Assets are RON files under a per-type subdirectory of the asset root.
//! The cache memoizes by type and name, so repeated lookups share one
//! `Arc` per asset.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Asset loading error.
#[derive(Debug, Error)]
pub enum AssetError {
    /// The asset file could not be read.
    #[error("failed to read asset '{path}': {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The asset file is not valid RON for its type.
    #[error("failed to parse asset '{path}': {source}")]
    Parse {
        /// Path that failed to parse.
        path: PathBuf,
        /// Underlying RON error.
        #[source]
        source: ron::error::SpannedError,
    },
}

/// A type loadable from RON files in the asset tree.
pub trait Asset: DeserializeOwned + Send + Sync + 'static {
    /// Subdirectory of the asset root this type loads from.
    const SUBDIR: &'static str;
}

/// Memoizing asset loader.
pub struct AssetCache {
    root: PathBuf,
    cache: HashMap<(TypeId, String), Arc<dyn Any + Send + Sync>>,
}

impl AssetCache {
    /// Create a cache rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: HashMap::new(),
        }
    }

    /// Directory assets load from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load the asset `name` of type `T`, or return the cached copy.
    ///
    /// `name` maps to `{root}/{T::SUBDIR}/{name}.ron`.
    pub fn get<T: Asset>(&mut self, name: &str) -> Result<Arc<T>, AssetError> {
        let key = (TypeId::of::<T>(), name.to_string());
        if let Some(cached) = self.cache.get(&key) {
            if let Ok(asset) = Arc::clone(cached).downcast::<T>() {
                return Ok(asset);
            }
        }

        let path = self.root.join(T::SUBDIR).join(format!("{name}.ron"));
        debug!("loading asset '{}'", path.display());
        let text = fs::read_to_string(&path).map_err(|source| AssetError::Io {
            path: path.clone(),
            source,
        })?;
        let asset: T = ron::from_str(&text).map_err(|source| AssetError::Parse {
            path: path.clone(),
            source,
        })?;
        let asset = Arc::new(asset);
        self.cache
            .insert(key, Arc::clone(&asset) as Arc<dyn Any + Send + Sync>);
        Ok(asset)
    }

    /// Insert an asset built in code, as if it had been loaded as `name`.
    pub fn insert<T: Asset>(&mut self, name: &str, asset: T) -> Arc<T> {
        let asset = Arc::new(asset);
        self.cache.insert(
            (TypeId::of::<T>(), name.to_string()),
            Arc::clone(&asset) as Arc<dyn Any + Send + Sync>,
        );
        asset
    }
}

/// Decoded sound: interleaved stereo 16-bit samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioClip {
    /// Interleaved stereo samples, left then right per frame.
    pub samples: Vec<i16>,
    /// Frames per second the samples were recorded at.
    pub sample_rate: u32,
}

impl AudioClip {
    /// Number of stereo frames in the clip.
    pub fn frames(&self) -> usize {
        self.samples.len() / 2
    }
}

impl Asset for AudioClip {
    const SUBDIR: &'static str = "audio";
}

/// Kind of image flowing between pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotKind {
    /// RGBA color image.
    Color,
    /// Depth image.
    Depth,
}

/// A named input or output slot on a shader stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSlot {
    /// Slot name; inputs match same-named outputs of the previous stage.
    pub name: String,
    /// Kind of image carried by the slot.
    pub kind: SlotKind,
}

/// One stage of the render pipeline: a shader program plus its declared
/// uniforms and inter-stage slots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShaderStage {
    /// GLSL vertex shader source.
    pub vertex: String,
    /// GLSL fragment shader source.
    pub fragment: String,
    /// Uniform names this stage accepts via broadcast.
    #[serde(default)]
    pub uniforms: Vec<String>,
    /// Images consumed from the previous stage.
    #[serde(default)]
    pub ins: Vec<StageSlot>,
    /// Images produced for the next stage.
    #[serde(default)]
    pub outs: Vec<StageSlot>,
}

impl Asset for ShaderStage {
    const SUBDIR: &'static str = "shaders";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root(tag: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("cascade_assets_{tag}_{}", std::process::id()));
        fs::create_dir_all(root.join("audio")).unwrap();
        root
    }

    #[test]
    fn test_load_and_memoize_audio_clip() {
        let root = temp_root("clip");
        fs::write(
            root.join("audio/beep.ron"),
            "(samples: [100, 100, -100, -100], sample_rate: 44100)",
        )
        .unwrap();
        let mut cache = AssetCache::new(&root);
        let first = cache.get::<AudioClip>("beep").unwrap();
        assert_eq!(first.frames(), 2);
        assert_eq!(first.sample_rate, 44100);
        let second = cache.get::<AudioClip>("beep").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_missing_asset_is_io_error() {
        let mut cache = AssetCache::new(std::env::temp_dir().join("cascade_assets_missing"));
        assert!(matches!(
            cache.get::<AudioClip>("nope"),
            Err(AssetError::Io { .. })
        ));
    }

    #[test]
    fn test_malformed_asset_is_parse_error() {
        let root = temp_root("bad");
        fs::write(root.join("audio/bad.ron"), "(samples: \"nope\")").unwrap();
        let mut cache = AssetCache::new(&root);
        assert!(matches!(
            cache.get::<AudioClip>("bad"),
            Err(AssetError::Parse { .. })
        ));
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_insert_bypasses_disk() {
        let mut cache = AssetCache::new("does_not_exist");
        let inserted = cache.insert(
            "silence",
            AudioClip {
                samples: vec![0; 8],
                sample_rate: 44100,
            },
        );
        let fetched = cache.get::<AudioClip>("silence").unwrap();
        assert!(Arc::ptr_eq(&inserted, &fetched));
    }

    #[test]
    fn test_same_name_different_types_do_not_collide() {
        let mut cache = AssetCache::new("does_not_exist");
        cache.insert(
            "thing",
            AudioClip {
                samples: vec![0; 2],
                sample_rate: 44100,
            },
        );
        cache.insert(
            "thing",
            ShaderStage {
                vertex: String::new(),
                fragment: String::new(),
                uniforms: Vec::new(),
                ins: Vec::new(),
                outs: Vec::new(),
            },
        );
        assert!(cache.get::<AudioClip>("thing").is_ok());
        assert!(cache.get::<ShaderStage>("thing").is_ok());
    }
}
