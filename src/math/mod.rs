//! Grid addressing and box math

pub mod aabb;
pub mod octant;

pub use aabb::Aabb;
pub use octant::{level_to_size, octant_index, snap_down, snap_up};
