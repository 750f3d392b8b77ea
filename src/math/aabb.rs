//! Axis-aligned bounding box

use crate::core::types::Vec3;

/// Axis-aligned bounding box defined by min and max corners
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// The unit cube spanned by every DAG
    pub const UNIT: Self = Self {
        min: Vec3::ZERO,
        max: Vec3::ONE,
    };

    /// Cube with the given min corner and edge length
    pub fn cube(min: Vec3, size: f32) -> Self {
        Self {
            min,
            max: min + Vec3::splat(size),
        }
    }

    /// Half-open containment: `min <= p < max` on every axis
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmplt(self.max).all()
    }
}
