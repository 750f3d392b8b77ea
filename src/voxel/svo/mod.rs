//! Sparse voxel octree DAG

pub mod node;
pub mod dag;
pub mod dedup;
pub mod serialize;
pub mod builder;

pub use node::{InteriorMaterial, NodeKey, NodeRef, QueryResult, VoxelNode};
pub use dag::{DagStats, VoxelDag};
pub use dedup::{DedupStats, Deduplicator};
pub use serialize::{SerializedNode, NO_CHILD, ROOT_INDEX};
pub use builder::{DagBuilder, create_test_sphere, sphere_shell};
