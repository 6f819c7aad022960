use glam::{Mat4, Vec3, Vec4};

use crate::math::bounds::BoundingBox;

/// Radius clamp applied wherever a zero-extent volume could otherwise produce
/// NaN/Inf matrices (empty scenes, point geometry).
pub const RADIUS_EPSILON: f32 = 1e-3;

/// View frustum as six inward-facing planes.
///
/// Extracted from a view-projection matrix with the Gribb-Hartmann method.
/// Plane order: Left, Right, Bottom, Top, Near, Far. The near plane follows
/// the WGPU depth convention (NDC z in `[0, 1]`).
#[derive(Debug, Clone, Copy, Default)]
pub struct Frustum {
    planes: [Vec4; 6],
}

impl Frustum {
    /// Extracts frustum planes from a view-projection matrix.
    #[must_use]
    pub fn from_matrix(m: Mat4) -> Self {
        let rows = [m.row(0), m.row(1), m.row(2), m.row(3)];

        let mut planes = [Vec4::ZERO; 6];
        // Gribb-Hartmann extraction, [0,1] depth range
        planes[0] = rows[3] + rows[0]; // Left
        planes[1] = rows[3] - rows[0]; // Right
        planes[2] = rows[3] + rows[1]; // Bottom
        planes[3] = rows[3] - rows[1]; // Top
        planes[4] = rows[2]; // Near (z >= 0)
        planes[5] = rows[3] - rows[2]; // Far

        for plane in &mut planes {
            let length = Vec3::new(plane.x, plane.y, plane.z).length();
            if length > 1e-8 {
                *plane /= length;
            }
        }

        Self { planes }
    }

    /// Variant for shadow-caster culling: the near plane is disabled so that
    /// casters between the light and the cascade volume are never rejected.
    /// Only the XY bounds and the far plane limit the caster set.
    #[must_use]
    pub fn from_matrix_shadow_caster(m: Mat4) -> Self {
        let mut frustum = Self::from_matrix(m);
        frustum.planes[4] = Vec4::ZERO;
        frustum
    }

    /// Sphere-vs-frustum test. Conservative: returns `true` when the sphere
    /// touches or crosses any plane boundary.
    #[must_use]
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        for plane in &self.planes {
            let dist = plane.x * center.x + plane.y * center.y + plane.z * center.z + plane.w;
            if dist < -radius {
                return false;
            }
        }
        true
    }

    /// AABB-vs-frustum test using the positive-vertex trick.
    #[must_use]
    pub fn intersects_aabb(&self, bbox: &BoundingBox) -> bool {
        for plane in &self.planes {
            // Farthest corner along the plane normal
            let p = Vec3::new(
                if plane.x >= 0.0 { bbox.max.x } else { bbox.min.x },
                if plane.y >= 0.0 { bbox.max.y } else { bbox.min.y },
                if plane.z >= 0.0 { bbox.max.z } else { bbox.min.z },
            );
            if plane.x * p.x + plane.y * p.y + plane.z * p.z + plane.w < 0.0 {
                return false;
            }
        }
        true
    }
}
