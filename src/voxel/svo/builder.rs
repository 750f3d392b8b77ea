//! DAG construction from dense material grids and procedural test shapes

use super::dag::VoxelDag;
use crate::core::config::DagConfig;
use crate::core::error::Error;
use crate::core::types::{EMPTY_MATERIAL, MaterialId, Result, UVec3};

/// Builds a [`VoxelDag`] from a dense cubic grid of materials
pub struct DagBuilder {
    config: DagConfig,
    /// Run dedup once every voxel is inserted
    dedup: bool,
}

impl DagBuilder {
    pub fn new(config: DagConfig) -> Self {
        Self { config, dedup: true }
    }

    /// Skip the final dedup pass (useful to inspect the plain tree)
    pub fn without_dedup(mut self) -> Self {
        self.dedup = false;
        self
    }

    /// Build from `extent^3` materials in Z-Y-X order (x varies fastest).
    ///
    /// Empty voxels are not inserted; they are what an untouched DAG already returns.
    pub fn build(&self, voxels: &[MaterialId]) -> Result<VoxelDag> {
        let mut dag = VoxelDag::with_config(&self.config)?;
        let extent = dag.extent() as usize;
        if voxels.len() as u128 != (extent as u128).pow(3) {
            return Err(Error::GridSize {
                voxels: voxels.len(),
                height: self.config.height,
            });
        }

        let mut inserted = 0usize;
        for (idx, &material) in voxels.iter().enumerate() {
            if material == EMPTY_MATERIAL {
                continue;
            }
            let x = idx % extent;
            let y = (idx / extent) % extent;
            let z = idx / (extent * extent);
            dag.insert_bits(x as u32, y as u32, z as u32, material);
            inserted += 1;
        }

        log::debug!("DagBuilder: inserted {} of {} voxels", inserted, voxels.len());

        if self.dedup {
            dag.dedup();
        }

        Ok(dag)
    }
}

/// Grid coordinates whose squared distance `d` from the grid center satisfies
/// `min_sq < d < max_sq`, enumerated with x outermost and z innermost.
pub fn sphere_shell(height: usize, min_sq: u64, max_sq: u64) -> Vec<UVec3> {
    let extent = 1i64 << height;
    let center = extent / 2;
    let mut shell = Vec::new();

    for x in 0..extent {
        for y in 0..extent {
            for z in 0..extent {
                let (dx, dy, dz) = (x - center, y - center, z - center);
                let d = (dx * dx + dy * dy + dz * dz) as u64;
                if min_sq < d && d < max_sq {
                    shell.push(UVec3::new(x as u32, y as u32, z as u32));
                }
            }
        }
    }

    shell
}

/// Dense `extent^3` grid holding a solid ball of `material`, centered in the grid
pub fn create_test_sphere(height: usize, radius: f32, material: MaterialId) -> Vec<MaterialId> {
    let size = 1usize << height;
    let mut voxels = vec![EMPTY_MATERIAL; size * size * size];
    let center = size as f32 / 2.0;

    for z in 0..size {
        for y in 0..size {
            for x in 0..size {
                let dx = x as f32 - center + 0.5;
                let dy = y as f32 - center + 0.5;
                let dz = z as f32 - center + 0.5;

                if dx * dx + dy * dy + dz * dz <= radius * radius {
                    voxels[z * size * size + y * size + x] = material;
                }
            }
        }
    }

    voxels
}
