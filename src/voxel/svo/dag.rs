//! Coordinate-space wrapper around the root node

use std::collections::HashMap;
use std::sync::Arc;

use super::dedup::{DedupStats, Deduplicator, count_unique};
use super::node::{InteriorMaterial, NodeRef, QueryResult, VoxelNode, node_identity};
use super::serialize::{self, SerializedNode};
use crate::core::config::{DagConfig, DEFAULT_HEIGHT, MAX_HEIGHT};
use crate::core::error::Error;
use crate::core::types::{MaterialId, Result, UVec3, Vec3};
use crate::math::{Aabb, level_to_size, snap_down};

/// Sparse voxel octree over `[0, 1)^3` whose identical subtrees can be shared.
///
/// Built with [`insert`](Self::insert), compressed with [`dedup`](Self::dedup) and
/// flattened with [`serialize`](Self::serialize). Inserting after a dedup is fine;
/// shared subtrees are copied before they are written, but the result is not
/// recompressed until `dedup` runs again.
#[derive(Clone, Debug)]
pub struct VoxelDag {
    root: NodeRef,
    /// Octree height: `2^height` voxels per axis, root at level `height`
    height: usize,
    interior_material: InteriorMaterial,
    solidify: bool,
}

/// Size summary of a DAG
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DagStats {
    pub height: usize,
    /// Distinct node allocations reachable from the root
    pub unique_nodes: usize,
    /// Nodes the same volume needs as a plain octree
    pub tree_nodes: u128,
    /// Bytes taken by the serialized buffer (placeholder slot included)
    pub serialized_bytes: usize,
}

impl QueryResult {
    pub fn material_id(&self) -> MaterialId {
        self.node.material_id()
    }

    /// Edge length of the cell this result covers
    pub fn cell_size(&self, height: usize) -> f32 {
        level_to_size(self.depth, height)
    }

    /// World-space cell covered by this result, for a query made at `position`
    pub fn cell_bounds(&self, position: Vec3, height: usize) -> Aabb {
        Aabb::cube(snap_down(position, self.depth, height), self.cell_size(height))
    }
}

impl Default for VoxelDag {
    fn default() -> Self {
        Self::new(DEFAULT_HEIGHT)
    }
}

impl VoxelDag {
    /// Empty DAG of the given height with default settings
    ///
    /// # Panics
    /// If `height` exceeds [`MAX_HEIGHT`].
    pub fn new(height: usize) -> Self {
        assert!(height <= MAX_HEIGHT, "octree height {height} exceeds {MAX_HEIGHT}");
        Self::from_parts(Arc::new(VoxelNode::default()), &DagConfig::with_height(height))
    }

    /// Empty DAG from a validated configuration
    pub fn with_config(config: &DagConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(Arc::new(VoxelNode::default()), config))
    }

    /// Rebuild a DAG from the output of [`serialize`](Self::serialize)
    pub fn from_serialized(nodes: &[SerializedNode], config: &DagConfig) -> Result<Self> {
        config.validate()?;
        let root = serialize::deserialize(nodes, config.height)?;
        Ok(Self::from_parts(root, config))
    }

    fn from_parts(root: NodeRef, config: &DagConfig) -> Self {
        Self {
            root,
            height: config.height,
            interior_material: config.interior_material,
            solidify: config.solidify,
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Voxels per axis
    pub fn extent(&self) -> u32 {
        1 << self.height
    }

    pub fn root(&self) -> &NodeRef {
        &self.root
    }

    pub fn interior_material(&self) -> InteriorMaterial {
        self.interior_material
    }

    /// Whether integer coordinates fall inside the grid
    pub fn contains_bits(&self, x: u32, y: u32, z: u32) -> bool {
        let extent = self.extent();
        x < extent && y < extent && z < extent
    }

    /// Integer grid coordinates of a position in `[0, 1)^3` (truncating)
    pub fn position_to_bits(&self, position: Vec3) -> Result<UVec3> {
        if !Aabb::UNIT.contains_point(position) {
            return Err(Error::PositionOutOfBounds(position));
        }
        Ok((position * self.extent() as f32).as_uvec3())
    }

    fn check_bits(&self, x: u32, y: u32, z: u32) -> Result<()> {
        if self.contains_bits(x, y, z) {
            Ok(())
        } else {
            Err(Error::OutOfBounds { x, y, z, extent: self.extent() })
        }
    }

    fn bits_or_panic(&self, position: Vec3) -> UVec3 {
        match self.position_to_bits(position) {
            Ok(bits) => bits,
            Err(err) => panic!("{err}"),
        }
    }

    fn assert_bits(&self, x: u32, y: u32, z: u32) {
        if let Err(err) = self.check_bits(x, y, z) {
            panic!("{err}");
        }
    }

    /// Write `material_id` at a position in `[0, 1)^3`.
    ///
    /// # Panics
    /// If the position lies outside the unit cube.
    pub fn insert(&mut self, position: Vec3, material_id: MaterialId) {
        let bits = self.bits_or_panic(position);
        self.insert_bits(bits.x, bits.y, bits.z, material_id);
    }

    /// Write `material_id` at integer grid coordinates.
    ///
    /// # Panics
    /// If a coordinate is `>= 2^height`.
    pub fn insert_bits(&mut self, x: u32, y: u32, z: u32, material_id: MaterialId) {
        self.assert_bits(x, y, z);
        let height = self.height;
        let policy = self.interior_material;
        Arc::make_mut(&mut self.root).insert(x, y, z, height, material_id, policy);
    }

    /// Fallible [`insert`](Self::insert)
    pub fn try_insert(&mut self, position: Vec3, material_id: MaterialId) -> Result<()> {
        let bits = self.position_to_bits(position)?;
        self.try_insert_bits(bits.x, bits.y, bits.z, material_id)
    }

    /// Fallible [`insert_bits`](Self::insert_bits)
    pub fn try_insert_bits(
        &mut self,
        x: u32,
        y: u32,
        z: u32,
        material_id: MaterialId,
    ) -> Result<()> {
        self.check_bits(x, y, z)?;
        self.insert_bits(x, y, z, material_id);
        Ok(())
    }

    /// Material at a position in `[0, 1)^3`
    pub fn get(&self, position: Vec3) -> MaterialId {
        let bits = self.bits_or_panic(position);
        self.get_bits(bits.x, bits.y, bits.z)
    }

    /// Material at integer grid coordinates
    pub fn get_bits(&self, x: u32, y: u32, z: u32) -> MaterialId {
        self.assert_bits(x, y, z);
        self.root.get(x, y, z, self.height)
    }

    /// Deepest node containing `position`; the root when nothing deeper exists
    pub fn query(&self, position: Vec3) -> QueryResult {
        self.query_to_level(position, 0)
    }

    /// [`query`](Self::query) at integer grid coordinates
    pub fn query_bits(&self, x: u32, y: u32, z: u32) -> QueryResult {
        self.query_bits_to_level(x, y, z, 0)
    }

    /// Deepest node containing `position` that is no finer than `level`
    pub fn query_to_level(&self, position: Vec3, level: usize) -> QueryResult {
        let bits = self.bits_or_panic(position);
        self.query_bits_to_level(bits.x, bits.y, bits.z, level)
    }

    fn query_bits_to_level(&self, x: u32, y: u32, z: u32, level: usize) -> QueryResult {
        self.assert_bits(x, y, z);
        self.root
            .query_to_level(x, y, z, self.height, level)
            .unwrap_or_else(|| QueryResult {
                node: Arc::clone(&self.root),
                depth: self.height,
            })
    }

    /// Merge identical subtrees into shared nodes.
    ///
    /// Lookups return the same materials before and after.
    pub fn dedup(&mut self) -> DedupStats {
        let (root, stats) = Deduplicator::new(self.solidify).run(&self.root);
        self.root = root;
        stats
    }

    /// Breadth-first flattening; see [`serialize::serialize`]
    pub fn serialize(&self) -> Vec<SerializedNode> {
        serialize::serialize(&self.root)
    }

    /// Distinct node allocations reachable from the root
    pub fn unique_node_count(&self) -> usize {
        count_unique(&self.root)
    }

    /// Node count of the equivalent plain octree (every reference counted).
    ///
    /// Exact up to [`MAX_HEIGHT`]: a full octree of that height has fewer than 2^75 nodes.
    pub fn tree_node_count(&self) -> u128 {
        fn count(node: &NodeRef, memo: &mut HashMap<usize, u128>) -> u128 {
            if let Some(&n) = memo.get(&node_identity(node)) {
                return n;
            }
            let n = 1 + node
                .children()
                .map_or(0, |children| children.iter().map(|c| count(c, memo)).sum());
            memo.insert(node_identity(node), n);
            n
        }

        count(&self.root, &mut HashMap::new())
    }

    pub fn stats(&self) -> DagStats {
        let unique_nodes = self.unique_node_count();
        DagStats {
            height: self.height,
            unique_nodes,
            tree_nodes: self.tree_node_count(),
            serialized_bytes: (unique_nodes + 1) * std::mem::size_of::<SerializedNode>(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::logging;
    use crate::core::types::EMPTY_MATERIAL;
    use crate::voxel::svo::builder::sphere_shell;
    use crate::voxel::svo::serialize::ROOT_INDEX;

    /// Every nonzero address points at a real entry and the root sits at index 1
    fn assert_addressing(data: &[SerializedNode]) {
        assert!(data.len() > ROOT_INDEX as usize);
        assert_eq!(data[0], SerializedNode::default());
        for entry in &data[1..] {
            let present = entry.children_addr.iter().filter(|&&a| a != 0).count();
            assert!(present == 0 || present == 8, "partial child set {entry}");
            for &addr in &entry.children_addr {
                assert!((addr as usize) < data.len());
            }
        }
    }

    #[test]
    fn test_empty_dag() {
        let dag = VoxelDag::default();
        assert_eq!(dag.height(), 8);
        assert_eq!(dag.get(Vec3::ZERO), EMPTY_MATERIAL);

        let result = dag.query(Vec3::splat(0.5));
        assert!(Arc::ptr_eq(&result.node, dag.root()));
        assert_eq!(result.depth, dag.height());
        assert_eq!(result.material_id(), EMPTY_MATERIAL);
        assert_eq!(result.cell_bounds(Vec3::splat(0.5), dag.height()), Aabb::UNIT);
    }

    #[test]
    fn test_insert_get_origin() {
        let mut dag = VoxelDag::default();
        assert_eq!(dag.get(Vec3::ZERO), 0);
        dag.insert(Vec3::ZERO, 1);
        assert_eq!(dag.get(Vec3::ZERO), 1);
    }

    #[test]
    fn test_insert_bits_on_axis_boundary() {
        let mut dag = VoxelDag::new(8);
        dag.insert_bits(0, 128, 128, 1);
        assert_eq!(dag.get_bits(0, 128, 128), 1);
        assert_eq!(dag.get_bits(0, 127, 128), 0);
        assert_eq!(dag.get(Vec3::new(0.0, 0.5, 0.5)), 1);
    }

    #[test]
    fn test_round_trip_positions() {
        let mut dag = VoxelDag::default();
        // Deterministic spread of positions over the unit cube
        for i in 0..1000u32 {
            let t = i as f32;
            let pos = Vec3::new(
                (t * 0.618_034).fract(),
                (t * 0.414_213_6).fract(),
                (t * 0.732_050_8).fract(),
            );
            dag.insert(pos, i + 1);
            assert_eq!(dag.get(pos), i + 1, "position {pos}");
        }
    }

    #[test]
    fn test_independent_neighbours() {
        let mut dag = VoxelDag::new(4);
        dag.insert_bits(5, 9, 3, 11);
        dag.insert_bits(5, 9, 2, 22);
        assert_eq!(dag.get_bits(5, 9, 3), 11);
        assert_eq!(dag.get_bits(5, 9, 2), 22);
        dag.insert_bits(5, 9, 3, 33);
        assert_eq!(dag.get_bits(5, 9, 3), 33);
        assert_eq!(dag.get_bits(5, 9, 2), 22);
    }

    #[test]
    fn test_query_depth_and_bounds() {
        let mut dag = VoxelDag::new(3);
        dag.insert_bits(7, 7, 7, 2);

        let hit = dag.query_bits(7, 7, 7);
        assert_eq!(hit.depth, 0);
        assert_eq!(hit.material_id(), 2);

        // Far corner: the root was split once, so an empty level-2 leaf answers
        let pos = Vec3::splat(0.1);
        let miss = dag.query(pos);
        assert_eq!(miss.depth, 2);
        assert_eq!(miss.material_id(), 0);
        assert_eq!(miss.cell_size(3), 0.5);
        assert_eq!(miss.cell_bounds(pos, 3), Aabb::cube(Vec3::ZERO, 0.5));

        let coarse = dag.query_to_level(Vec3::splat(0.99), 1);
        assert_eq!(coarse.depth, 1);
    }

    #[test]
    fn test_out_of_range_errors() {
        let mut dag = VoxelDag::new(3);
        assert!(matches!(
            dag.try_insert_bits(8, 0, 0, 1),
            Err(Error::OutOfBounds { x: 8, extent: 8, .. })
        ));
        assert!(matches!(
            dag.try_insert(Vec3::new(1.0, 0.0, 0.0), 1),
            Err(Error::PositionOutOfBounds(_))
        ));
        assert!(matches!(
            dag.try_insert(Vec3::new(-0.1, 0.0, 0.0), 1),
            Err(Error::PositionOutOfBounds(_))
        ));
        assert!(dag.try_insert(Vec3::new(f32::NAN, 0.0, 0.0), 1).is_err());
        assert!(dag.try_insert_bits(7, 7, 7, 1).is_ok());
        assert_eq!(dag.get_bits(7, 7, 7), 1);
    }

    #[test]
    #[should_panic(expected = "outside the grid")]
    fn test_insert_out_of_range_panics() {
        let mut dag = VoxelDag::new(3);
        dag.insert_bits(0, 0, 8, 1);
    }

    #[test]
    #[should_panic(expected = "outside the unit cube")]
    fn test_get_out_of_range_panics() {
        VoxelDag::new(3).get(Vec3::new(0.5, 1.5, 0.5));
    }

    #[test]
    fn test_with_config_validates_height() {
        let err = VoxelDag::with_config(&DagConfig::with_height(MAX_HEIGHT + 1)).unwrap_err();
        assert!(matches!(err, Error::InvalidHeight { .. }));
        let dag = VoxelDag::with_config(&DagConfig::with_height(MAX_HEIGHT)).unwrap();
        assert_eq!(dag.extent(), 1 << MAX_HEIGHT);
    }

    #[test]
    fn test_average_policy_from_config() {
        let config = DagConfig {
            height: 1,
            interior_material: InteriorMaterial::Average,
            ..DagConfig::default()
        };
        let mut dag = VoxelDag::with_config(&config).unwrap();
        for x in 0..2 {
            for y in 0..2 {
                for z in 0..2 {
                    dag.insert_bits(x, y, z, 4);
                }
            }
        }
        assert_eq!(dag.root().material_id(), 4);
        assert_eq!(dag.get_bits(1, 0, 1), 4);
    }

    #[test]
    fn test_solidification() {
        logging::init_for_tests();
        let mut dag = VoxelDag::new(3);
        for x in 0..8 {
            for y in 0..8 {
                for z in 0..8 {
                    dag.insert_bits(x, y, z, 1);
                }
            }
        }

        dag.dedup();
        let data = dag.serialize();

        // Placeholder plus one solid root
        assert_eq!(data.len(), 2);
        assert_eq!(data[1], SerializedNode::leaf(1));
        assert_eq!(dag.get_bits(3, 6, 1), 1);
        assert_eq!(dag.query_bits(3, 6, 1).depth, 3);
    }

    #[test]
    fn test_empty_dag_dedup_and_serialize() {
        let mut dag = VoxelDag::new(5);
        let stats = dag.dedup();
        assert_eq!(stats.nodes_after, 1);

        let data = dag.serialize();
        assert_eq!(data.len(), 2);
        assert_eq!(data[1], SerializedNode::leaf(0));
    }

    #[test]
    fn test_sphere_shell_survives_dedup() {
        logging::init_for_tests();
        // Lattice points within ~0.2 voxels of radius 128
        let shell = sphere_shell(8, 16378, 16385);
        assert_eq!(shell.len(), 3483);

        let mut dag = VoxelDag::new(8);
        for (id, p) in shell.iter().enumerate() {
            dag.insert_bits(p.x, p.y, p.z, id as MaterialId);
        }

        let before = dag.unique_node_count();
        let stats = dag.dedup();
        assert_eq!(stats.nodes_before, before);
        assert!(stats.nodes_after < before);

        for (id, p) in shell.iter().enumerate() {
            assert_eq!(dag.get_bits(p.x, p.y, p.z), id as MaterialId, "voxel {p}");
        }
    }

    #[test]
    fn test_dedup_preserves_lookups() {
        let mut dag = VoxelDag::new(5);
        let shell = sphere_shell(5, 100, 196);
        for p in &shell {
            dag.insert_bits(p.x, p.y, p.z, 1 + (p.x + p.y) % 3);
        }

        let extent = dag.extent();
        let mut before = Vec::new();
        for x in 0..extent {
            for y in 0..extent {
                for z in 0..extent {
                    before.push(dag.get_bits(x, y, z));
                }
            }
        }

        dag.dedup();

        let mut i = 0;
        for x in 0..extent {
            for y in 0..extent {
                for z in 0..extent {
                    assert_eq!(dag.get_bits(x, y, z), before[i], "({x}, {y}, {z})");
                    i += 1;
                }
            }
        }
    }

    #[test]
    fn test_dedup_idempotent() {
        let mut dag = VoxelDag::new(6);
        for p in sphere_shell(6, 600, 1024) {
            dag.insert_bits(p.x, p.y, p.z, 3);
        }

        dag.dedup();
        let first = dag.serialize();
        let stats = dag.dedup();
        let second = dag.serialize();

        assert_eq!(stats.nodes_before, stats.nodes_after);
        assert_eq!(first.len(), second.len());
        assert_eq!(first, second);
    }

    #[test]
    fn test_serialize_addressing_and_determinism() {
        let mut dag = VoxelDag::new(5);
        for p in sphere_shell(5, 150, 256) {
            dag.insert_bits(p.x, p.y, p.z, p.z + 1);
        }

        // Plain tree
        let tree = dag.serialize();
        assert_addressing(&tree);
        assert_eq!(tree.len() - 1, dag.unique_node_count());
        assert_eq!(dag.serialize(), tree);

        dag.dedup();
        let compressed = dag.serialize();
        assert_addressing(&compressed);
        assert_eq!(compressed.len() - 1, dag.unique_node_count());
        assert!(compressed.len() < tree.len());
        assert_eq!(dag.serialize(), compressed);
    }

    #[test]
    fn test_insert_after_dedup_copies_shared_nodes() {
        let mut dag = VoxelDag::new(4);
        for x in 0..16 {
            for z in 0..16 {
                dag.insert_bits(x, 0, z, 9);
            }
        }
        dag.dedup();
        let shared_count = dag.unique_node_count();

        dag.insert_bits(3, 0, 12, 2);

        assert_eq!(dag.get_bits(3, 0, 12), 2);
        // Every other cell of the floor still has the shared material
        for x in 0..16 {
            for z in 0..16 {
                if (x, z) != (3, 12) {
                    assert_eq!(dag.get_bits(x, 0, z), 9, "({x}, 0, {z})");
                }
            }
        }
        assert_eq!(dag.get_bits(3, 1, 12), 0);
        assert!(dag.unique_node_count() > shared_count);
    }

    #[test]
    fn test_insert_into_solidified_region() {
        let mut dag = VoxelDag::new(2);
        for x in 0..4 {
            for y in 0..4 {
                for z in 0..4 {
                    dag.insert_bits(x, y, z, 5);
                }
            }
        }
        dag.dedup();
        assert!(dag.root().is_leaf());

        dag.insert_bits(1, 2, 3, 6);
        assert_eq!(dag.get_bits(1, 2, 3), 6);
        assert_eq!(dag.get_bits(0, 0, 0), 5);
        assert_eq!(dag.get_bits(3, 3, 3), 5);
    }

    #[test]
    fn test_serialized_round_trip() {
        let mut dag = VoxelDag::new(5);
        for p in sphere_shell(5, 150, 256) {
            dag.insert_bits(p.x, p.y, p.z, p.y + 1);
        }
        dag.dedup();
        let data = dag.serialize();

        let rebuilt = VoxelDag::from_serialized(&data, &DagConfig::with_height(5)).unwrap();
        assert_eq!(rebuilt.unique_node_count(), dag.unique_node_count());
        for p in sphere_shell(5, 150, 256) {
            assert_eq!(rebuilt.get_bits(p.x, p.y, p.z), p.y + 1);
        }
        assert_eq!(rebuilt.serialize(), data);
    }

    #[test]
    fn test_stats() {
        let mut dag = VoxelDag::new(3);
        dag.insert_bits(0, 0, 0, 1);
        // Root, 8 + 8 + 8 children along the path
        let stats = dag.stats();
        assert_eq!(stats.tree_nodes, 25);
        assert_eq!(stats.height, 3);

        dag.dedup();
        let stats = dag.stats();
        assert_eq!(stats.tree_nodes, 25);
        assert!(stats.unique_nodes < 25);
        assert_eq!(stats.serialized_bytes, dag.serialize().len() * 36);
    }

    #[test]
    fn test_stats_on_full_depth_chain() {
        // One interior entry per level from the root down to level 2, then a level-1
        // node over two leaves: every path of the 2^72-voxel grid is populated.
        let height = MAX_HEIGHT;
        let mut data = vec![SerializedNode::default()];
        for k in 1..height as u32 {
            data.push(SerializedNode { material_id: 0, children_addr: [k + 1; 8] });
        }
        let leaves = height as u32 + 1;
        data.push(SerializedNode {
            material_id: 0,
            children_addr: std::array::from_fn(|i| leaves + (i as u32 & 1)),
        });
        data.push(SerializedNode::leaf(1));
        data.push(SerializedNode::leaf(2));
        assert_eq!(data.len(), 27);

        let dag = VoxelDag::from_serialized(&data, &DagConfig::with_height(height)).unwrap();
        let stats = dag.stats();

        assert_eq!(stats.unique_nodes, 26);
        // Full octree: (8^(height + 1) - 1) / 7 nodes
        assert_eq!(stats.tree_nodes, (8u128.pow(height as u32 + 1) - 1) / 7);
        assert_eq!(dag.get_bits(0, 0, 0), 1);
        assert_eq!(dag.get_bits(0, 0, 1), 2);
    }
}
