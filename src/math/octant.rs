//! Octant addressing for a `[0, 1)^3` volume split into `2^height` cells per axis
//!
//! Levels count down from the root: level `height` is the whole volume,
//! level 0 is a single voxel.

use crate::core::types::Vec3;

/// Octant (0..8) of the cell at `level` containing the integer coordinate.
///
/// Takes bit `level - 1` of each coordinate and packs them as `(x << 2) | (y << 1) | z`.
///
/// # Panics
/// If `level == 0`; descent must stop at the voxel level.
#[inline]
pub fn octant_index(x: u32, y: u32, z: u32, level: usize) -> usize {
    assert!(level >= 1, "octant_index called at level 0");
    let shift = level - 1;
    let bit = |v: u32| ((v >> shift) & 1) as usize;
    (bit(x) << 2) | (bit(y) << 1) | bit(z)
}

/// Edge length of a cell at `level`: `2^-(height - level)`
#[inline]
pub fn level_to_size(level: usize, height: usize) -> f32 {
    debug_assert!(level <= height);
    0.5f32.powi((height - level) as i32)
}

/// Floor `pos` to the corner of the enclosing cell at `level`
pub fn snap_down(pos: Vec3, level: usize, height: usize) -> Vec3 {
    let size = level_to_size(level, height);
    (pos / size).floor() * size
}

/// Ceil `pos` to the cell grid at `level`
pub fn snap_up(pos: Vec3, level: usize, height: usize) -> Vec3 {
    let size = level_to_size(level, height);
    (pos / size).ceil() * size
}
