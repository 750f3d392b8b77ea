//! Bottom-up structural deduplication
//!
//! Every node is keyed by its material and the identities of its already-canonical
//! children, so a single post-order pass with one hash lookup per node is enough to
//! merge all isomorphic subtrees. Nothing is ever hashed recursively.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::node::{NodeKey, NodeRef, VoxelNode, node_identity};

/// Outcome of a dedup pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DedupStats {
    /// Distinct node allocations reachable before the pass
    pub nodes_before: usize,
    /// Distinct node allocations reachable after the pass
    pub nodes_after: usize,
    /// Interior nodes replaced by their single shared leaf child
    pub solidified: usize,
}

impl DedupStats {
    pub fn compression_ratio(&self) -> f32 {
        self.nodes_before as f32 / self.nodes_after.max(1) as f32
    }
}

/// Canonicalizes isomorphic subtrees into shared instances
pub struct Deduplicator {
    /// Structural key -> surviving instance
    canonical: HashMap<NodeKey, NodeRef>,
    /// Input node identity -> canonical replacement, so shared input is visited once
    visited: HashMap<usize, NodeRef>,
    /// Collapse nodes whose eight children are one leaf
    solidify: bool,
    solidified: usize,
}

impl Deduplicator {
    pub fn new(solidify: bool) -> Self {
        Self {
            canonical: HashMap::new(),
            visited: HashMap::new(),
            solidify,
            solidified: 0,
        }
    }

    /// Canonicalize the graph below `root` and return the new root
    pub fn run(mut self, root: &NodeRef) -> (NodeRef, DedupStats) {
        let nodes_before = count_unique(root);
        let new_root = self.canonicalize(root);

        let stats = DedupStats {
            nodes_before,
            nodes_after: count_unique(&new_root),
            solidified: self.solidified,
        };

        log::info!(
            "DAG deduplication: {} nodes -> {} nodes ({:.1}x), {} solidified",
            stats.nodes_before,
            stats.nodes_after,
            stats.compression_ratio(),
            stats.solidified,
        );

        (new_root, stats)
    }

    fn canonicalize(&mut self, node: &NodeRef) -> NodeRef {
        let identity = node_identity(node);
        if let Some(done) = self.visited.get(&identity) {
            return Arc::clone(done);
        }

        let candidate = match node.children() {
            None => Arc::clone(node),
            Some(children) => {
                let canonical_children: [NodeRef; 8] =
                    std::array::from_fn(|i| self.canonicalize(&children[i]));

                let first = &canonical_children[0];
                let uniform = canonical_children[1..].iter().all(|c| Arc::ptr_eq(c, first));

                if self.solidify && uniform && first.is_leaf() {
                    self.solidified += 1;
                    let leaf = Arc::clone(first);
                    self.visited.insert(identity, Arc::clone(&leaf));
                    return leaf;
                }

                let unchanged = children
                    .iter()
                    .zip(&canonical_children)
                    .all(|(old, new)| Arc::ptr_eq(old, new));

                if unchanged {
                    Arc::clone(node)
                } else {
                    Arc::new(VoxelNode::with_children(node.material_id(), canonical_children))
                }
            }
        };

        let canonical = Arc::clone(
            self.canonical
                .entry(candidate.key())
                .or_insert(candidate),
        );
        self.visited.insert(identity, Arc::clone(&canonical));
        canonical
    }
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Number of distinct node allocations reachable from `root`
pub fn count_unique(root: &NodeRef) -> usize {
    let mut seen: HashSet<usize> = HashSet::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if !seen.insert(node_identity(node)) {
            continue;
        }
        if let Some(children) = node.children() {
            stack.extend(children.iter());
        }
    }

    seen.len()
}
