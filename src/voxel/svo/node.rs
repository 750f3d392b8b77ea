//! Octree node with shared, copy-on-write children

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::types::{EMPTY_MATERIAL, MaterialId};
use crate::math::octant_index;

/// Shared handle to a node. Identical subtrees point at the same allocation after dedup.
pub type NodeRef = Arc<VoxelNode>;

/// What an interior node stores as its own material after an insert below it.
///
/// Interior materials are never authoritative for sampling; they are only returned
/// when a lookup runs out of children.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteriorMaterial {
    /// Reset to [`EMPTY_MATERIAL`]
    #[default]
    Empty,
    /// Integer mean of the eight children's materials (coarse preview value)
    Average,
}

impl InteriorMaterial {
    fn resolve(self, children: &[NodeRef; 8]) -> MaterialId {
        match self {
            Self::Empty => EMPTY_MATERIAL,
            Self::Average => {
                let sum: u64 = children.iter().map(|c| c.material_id as u64).sum();
                (sum / 8) as MaterialId
            }
        }
    }
}

/// Deepest node found by a point query, with the level it sits at
#[derive(Clone, Debug)]
pub struct QueryResult {
    pub node: NodeRef,
    /// Level of `node`; the root is at the DAG height
    pub depth: usize,
}

/// One octant of the volume: a material and either zero or eight children.
#[derive(Clone, Debug, Default)]
pub struct VoxelNode {
    material_id: MaterialId,
    children: Option<[NodeRef; 8]>,
}

/// Structural key of a node: its material and the identities of its children.
///
/// Two nodes with equal keys are interchangeable once their children are canonical.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeKey {
    material_id: MaterialId,
    children: Option<[usize; 8]>,
}

/// Identity of a shared node (its allocation address)
#[inline]
pub fn node_identity(node: &NodeRef) -> usize {
    Arc::as_ptr(node) as usize
}

impl VoxelNode {
    /// Childless node with the given material
    pub fn leaf(material_id: MaterialId) -> Self {
        Self {
            material_id,
            children: None,
        }
    }

    /// Interior node from eight existing children
    pub fn with_children(material_id: MaterialId, children: [NodeRef; 8]) -> Self {
        Self {
            material_id,
            children: Some(children),
        }
    }

    pub fn material_id(&self) -> MaterialId {
        self.material_id
    }

    pub fn children(&self) -> Option<&[NodeRef; 8]> {
        self.children.as_ref()
    }

    pub fn child(&self, index: usize) -> Option<&NodeRef> {
        self.children.as_ref().map(|c| &c[index])
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Structural key used for deduplication
    pub fn key(&self) -> NodeKey {
        NodeKey {
            material_id: self.material_id,
            children: self
                .children
                .as_ref()
                .map(|c| std::array::from_fn(|i| node_identity(&c[i]))),
        }
    }

    /// Write `material_id` at the voxel `(x, y, z)` below this node, which sits at `level`.
    ///
    /// A leaf above level 0 is split into eight children that start out as one shared
    /// copy of the leaf's material. Shared children are cloned before they are
    /// descended into, so other parents of the same subtree never observe the write.
    ///
    /// Every leaf built by `insert` alone holds `0`, so inheriting the leaf's material
    /// only changes the result for leaves solidified by [`Deduplicator`].
    ///
    /// [`Deduplicator`]: super::dedup::Deduplicator
    pub fn insert(
        &mut self,
        x: u32,
        y: u32,
        z: u32,
        level: usize,
        material_id: MaterialId,
        policy: InteriorMaterial,
    ) {
        if level == 0 {
            self.material_id = material_id;
            return;
        }

        let index = octant_index(x, y, z, level);
        let fill = self.material_id;
        let children = self.children.get_or_insert_with(|| {
            let leaf = Arc::new(VoxelNode::leaf(fill));
            std::array::from_fn(|_| Arc::clone(&leaf))
        });

        Arc::make_mut(&mut children[index]).insert(x, y, z, level - 1, material_id, policy);

        self.material_id = policy.resolve(children);
    }

    /// Material at `(x, y, z)`, falling back to the deepest node on the path
    pub fn get(&self, x: u32, y: u32, z: u32, level: usize) -> MaterialId {
        if level == 0 {
            return self.material_id;
        }

        match self.child(octant_index(x, y, z, level)) {
            Some(child) => child.get(x, y, z, level - 1),
            None => self.material_id,
        }
    }

    /// Deepest node below this one on the path to `(x, y, z)`.
    ///
    /// `None` means this node itself is the deepest information available.
    pub fn query(&self, x: u32, y: u32, z: u32, level: usize) -> Option<QueryResult> {
        self.query_to_level(x, y, z, level, 0)
    }

    /// Like [`query`](Self::query) but never descends below `floor`
    pub fn query_to_level(
        &self,
        x: u32,
        y: u32,
        z: u32,
        level: usize,
        floor: usize,
    ) -> Option<QueryResult> {
        if level <= floor {
            return None;
        }

        let child = self.child(octant_index(x, y, z, level))?;
        Some(
            child
                .query_to_level(x, y, z, level - 1, floor)
                .unwrap_or_else(|| QueryResult {
                    node: Arc::clone(child),
                    depth: level - 1,
                }),
        )
    }
}
