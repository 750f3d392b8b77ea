//! DAG construction settings, loadable from JSON

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::Error;
use super::types::Result;
use crate::voxel::svo::InteriorMaterial;

/// Largest supported octree height.
///
/// Float positions scale exactly by `2^height` only while the grid fits the f32 mantissa.
pub const MAX_HEIGHT: usize = 24;

/// Height used by the legacy 256^3 grid
pub const DEFAULT_HEIGHT: usize = 8;

/// Configuration for a [`VoxelDag`](crate::voxel::svo::VoxelDag).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DagConfig {
    /// Octree height; the grid has `2^height` cells per axis.
    pub height: usize,
    /// Fallback material written into interior nodes on insert.
    pub interior_material: InteriorMaterial,
    /// Collapse nodes whose eight children are one shared leaf during dedup.
    pub solidify: bool,
}

impl Default for DagConfig {
    fn default() -> Self {
        Self {
            height: DEFAULT_HEIGHT,
            interior_material: InteriorMaterial::default(),
            solidify: true,
        }
    }
}

impl DagConfig {
    /// Default configuration with a different height
    pub fn with_height(height: usize) -> Self {
        Self {
            height,
            ..Self::default()
        }
    }

    /// Check that the settings describe a buildable DAG
    pub fn validate(&self) -> Result<()> {
        if self.height > MAX_HEIGHT {
            return Err(Error::InvalidHeight {
                height: self.height,
                max: MAX_HEIGHT,
            });
        }
        Ok(())
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Save as pretty-printed JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, json)?;
        Ok(())
    }
}
