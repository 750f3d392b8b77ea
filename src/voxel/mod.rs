//! Voxel data structures

pub mod svo;

pub use svo::{DagBuilder, InteriorMaterial, QueryResult, SerializedNode, VoxelDag, VoxelNode};
