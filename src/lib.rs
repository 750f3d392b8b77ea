//! svodag - sparse voxel octrees compressed into DAGs for GPU raymarching

pub mod core;
pub mod math;
pub mod voxel;

pub use crate::core::{DagConfig, Error, MaterialId, Result, EMPTY_MATERIAL};
pub use crate::voxel::svo::{DedupStats, InteriorMaterial, QueryResult, SerializedNode, VoxelDag};
