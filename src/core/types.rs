//! Core type aliases and re-exports

pub use glam::{UVec3, Vec3};

/// Opaque material identifier stored in every voxel
pub type MaterialId = u32;

/// Reserved "empty/air" material
pub const EMPTY_MATERIAL: MaterialId = 0;

/// Standard Result type for the crate
pub type Result<T> = std::result::Result<T, crate::core::error::Error>;
