//! Error types for svodag

use thiserror::Error;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Invalid octree height {height} (maximum is {max})")]
    InvalidHeight { height: usize, max: usize },

    #[error("Coordinate ({x}, {y}, {z}) is outside the grid 0..{extent}")]
    OutOfBounds { x: u32, y: u32, z: u32, extent: u32 },

    #[error("Position {0} is outside the unit cube [0, 1)")]
    PositionOutOfBounds(glam::Vec3),

    #[error("Grid of {voxels} voxels does not fill an octree of height {height}")]
    GridSize { voxels: usize, height: usize },

    #[error("Serialized DAG error: {0}")]
    Serialized(String),
}
