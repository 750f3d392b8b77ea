//! Flattening into an index-addressed node array for GPU traversal
//!
//! Slot 0 is an unused all-zero placeholder so that a child address of 0 can mean
//! "no child". The root is always at index 1.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use super::node::{NodeRef, VoxelNode, node_identity};
use crate::core::error::Error;
use crate::core::types::{MaterialId, Result};

/// Index of the root entry in a serialized buffer
pub const ROOT_INDEX: u32 = 1;

/// Child address meaning "no child, sample this node's material"
pub const NO_CHILD: u32 = 0;

/// One flattened node - 36 bytes, no padding
///
/// Layout:
/// - material_id (4 bytes)
/// - children_addr (32 bytes): 1-based entry index per octant, or [`NO_CHILD`]
///
/// Any GPU-side alignment padding is the upload layer's concern.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize)]
pub struct SerializedNode {
    pub material_id: MaterialId,
    pub children_addr: [u32; 8],
}

impl SerializedNode {
    /// Entry without children
    pub const fn leaf(material_id: MaterialId) -> Self {
        Self {
            material_id,
            children_addr: [NO_CHILD; 8],
        }
    }

    pub fn has_children(&self) -> bool {
        self.children_addr.iter().any(|&addr| addr != NO_CHILD)
    }
}

impl fmt::Display for SerializedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g, h, i] = self.children_addr;
        write!(
            f,
            "{{Material: {}, Connected to: [{a}, {b}, {c}, {d}, {e}, {g}, {h}, {i}]}}",
            self.material_id
        )
    }
}

/// Flatten the graph below `root` breadth-first.
///
/// Each distinct node (by identity) gets one entry, numbered in discovery order.
/// Shared nodes are written once and referenced from every parent.
pub fn serialize(root: &NodeRef) -> Vec<SerializedNode> {
    // Identity -> assigned index; doubles as the visited set
    let mut index: HashMap<usize, u32> = HashMap::new();
    let mut queue: VecDeque<&NodeRef> = VecDeque::new();
    let mut buffer = vec![SerializedNode::zeroed()];

    index.insert(node_identity(root), ROOT_INDEX);
    queue.push_back(root);

    while let Some(node) = queue.pop_front() {
        debug_assert_eq!(index[&node_identity(node)] as usize, buffer.len());

        let mut entry = SerializedNode::leaf(node.material_id());
        if let Some(children) = node.children() {
            for (addr, child) in entry.children_addr.iter_mut().zip(children) {
                let next = index.len() as u32 + 1;
                *addr = *index.entry(node_identity(child)).or_insert_with(|| {
                    queue.push_back(child);
                    next
                });
            }
        }
        buffer.push(entry);
    }

    log::debug!(
        "Serialized DAG: {} nodes ({} bytes)",
        buffer.len() - 1,
        std::mem::size_of_val(buffer.as_slice()),
    );

    buffer
}

/// View a serialized buffer as raw bytes for upload
pub fn as_bytes(nodes: &[SerializedNode]) -> &[u8] {
    bytemuck::cast_slice(nodes)
}

/// Rebuild a shared node graph from a serialized buffer whose root sits at `height`.
///
/// Entries referenced from several parents become one shared node again.
pub fn deserialize(nodes: &[SerializedNode], height: usize) -> Result<NodeRef> {
    if nodes.len() <= ROOT_INDEX as usize {
        return Err(Error::Serialized(format!(
            "buffer of {} entries has no root at index {ROOT_INDEX}",
            nodes.len()
        )));
    }

    let mut rebuilt = HashMap::new();
    let (root, _) = rebuild(nodes, ROOT_INDEX, height, &mut rebuilt)?;
    Ok(root)
}

/// Returns the node and the depth of its subtree
fn rebuild(
    nodes: &[SerializedNode],
    index: u32,
    level: usize,
    rebuilt: &mut HashMap<u32, (NodeRef, usize)>,
) -> Result<(NodeRef, usize)> {
    if let Some((node, depth)) = rebuilt.get(&index) {
        if *depth > level {
            return Err(Error::Serialized(format!(
                "entry {index} has {depth} levels below it but is referenced at level {level}"
            )));
        }
        return Ok((Arc::clone(node), *depth));
    }

    let entry = &nodes[index as usize];
    if !entry.has_children() {
        let leaf = Arc::new(VoxelNode::leaf(entry.material_id));
        rebuilt.insert(index, (Arc::clone(&leaf), 0));
        return Ok((leaf, 0));
    }

    if entry.children_addr.contains(&NO_CHILD) {
        return Err(Error::Serialized(format!(
            "entry {index} has a partial child set {:?}",
            entry.children_addr
        )));
    }
    if level == 0 {
        return Err(Error::Serialized(format!(
            "entry {index} has children below the voxel level"
        )));
    }

    let mut children = Vec::with_capacity(8);
    let mut depth = 0;
    for &addr in &entry.children_addr {
        if addr as usize >= nodes.len() {
            return Err(Error::Serialized(format!(
                "entry {index} points at {addr}, past the end of a {}-entry buffer",
                nodes.len()
            )));
        }
        let (child, child_depth) = rebuild(nodes, addr, level - 1, rebuilt)?;
        depth = depth.max(child_depth + 1);
        children.push(child);
    }

    let children: [NodeRef; 8] = children
        .try_into()
        .map_err(|_| Error::Serialized(format!("entry {index} did not yield 8 children")))?;
    let node = Arc::new(VoxelNode::with_children(entry.material_id, children));
    rebuilt.insert(index, (Arc::clone(&node), depth));
    Ok((node, depth))
}
