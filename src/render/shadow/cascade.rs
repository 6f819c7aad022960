//! Shadow fitting math, kept free of GPU types so every step is unit
//! testable: cascade splits, slice bounding spheres, texel snapping and the
//! per-face matrices of point-light cube maps.

use std::f32::consts::FRAC_PI_2;

use glam::{Mat4, Vec3, Vec4};

use crate::math::{BoundingSphere, frustum::RADIUS_EPSILON};
use crate::scene::CASCADE_COUNT;

/// Near plane used by every point-light face projection.
pub const POINT_NEAR: f32 = 0.1;

/// View-space split depths for the cascades: a fixed practical split of
/// `{near, far/20, far/5, far}`. Element `i` and `i + 1` bound cascade `i`.
#[must_use]
pub fn cascade_split_distances(near: f32, far: f32) -> [f32; CASCADE_COUNT + 1] {
    [near, far / 20.0, far / 5.0, far]
}

/// World-space corners of a frustum slice, recovered by unprojecting the NDC
/// cube corners through the inverse slice view-projection. Depth follows the
/// WGPU convention (`z` in `[0, 1]`).
#[must_use]
pub fn slice_corners_world(inv_view_proj: &Mat4) -> [Vec3; 8] {
    let mut corners = [Vec3::ZERO; 8];
    let mut i = 0;
    for x in [-1.0f32, 1.0] {
        for y in [-1.0f32, 1.0] {
            for z in [0.0f32, 1.0] {
                let clip = *inv_view_proj * Vec4::new(x, y, z, 1.0);
                corners[i] = clip.truncate() / clip.w;
                i += 1;
            }
        }
    }
    corners
}

/// Bounding sphere of a corner set: centered on the midpoint of the
/// axis-aligned extents, radius half the largest per-axis extent, clamped so
/// a degenerate slice never yields a zero-size shadow volume.
#[must_use]
pub fn slice_bounding_sphere(corners: &[Vec3; 8]) -> BoundingSphere {
    let mut min = Vec3::splat(f32::INFINITY);
    let mut max = Vec3::splat(f32::NEG_INFINITY);
    for corner in corners {
        min = min.min(*corner);
        max = max.max(*corner);
    }
    let extent = max - min;
    BoundingSphere {
        center: (min + max) * 0.5,
        radius: (extent.max_element() * 0.5).max(RADIUS_EPSILON),
    }
}

/// Up vector that is never parallel to `dir`.
#[must_use]
pub fn safe_up(dir: Vec3) -> Vec3 {
    if dir.y.abs() > 0.99 { Vec3::X } else { Vec3::Y }
}

/// Snaps the cascade center to the shadow map's texel grid in light space.
///
/// Uses an orientation-only light view (no translation), floors the X/Y
/// texel coordinates and transforms back, so a sub-texel camera move cannot
/// shift the sampled grid and shimmer the shadow edges.
#[must_use]
pub fn snap_to_texel_grid(center: Vec3, light_dir: Vec3, radius: f32, map_size: u32) -> Vec3 {
    let view = Mat4::look_at_rh(Vec3::ZERO, light_dir, safe_up(light_dir));
    let texels_per_unit = map_size as f32 / (radius * 2.0);

    let mut light_space = view.transform_point3(center);
    light_space.x = (light_space.x * texels_per_unit).floor() / texels_per_unit;
    light_space.y = (light_space.y * texels_per_unit).floor() / texels_per_unit;

    view.inverse().transform_point3(light_space)
}

/// Light-space view-projection for one directional cascade.
///
/// `light_dir` is the direction the light travels (the entity's world -Z).
/// The view looks from `center - light_dir * 2 * radius` toward the center;
/// the orthographic volume spans `[-radius, radius]` laterally with a depth
/// range stretched 6x so tall casters outside the slice still render.
#[must_use]
pub fn directional_cascade_matrix(light_dir: Vec3, center: Vec3, radius: f32) -> Mat4 {
    let eye = center - light_dir * (radius * 2.0);
    let view = Mat4::look_at_rh(eye, center, safe_up(light_dir));
    let proj = Mat4::orthographic_rh(
        -radius,
        radius,
        -radius,
        radius,
        -radius * 6.0,
        radius * 6.0,
    );
    proj * view
}

/// Clip-space z (before the perspective divide) of a point at view depth
/// `split_far`, used by the lighting shader to pick a cascade per fragment.
#[must_use]
pub fn cascade_end_clip_space(camera_proj: &Mat4, split_far: f32) -> f32 {
    (*camera_proj * Vec4::new(0.0, 0.0, -split_far, 1.0)).z
}

/// View-projection matrices for the six faces of a point-light cube map:
/// 90° square perspective from [`POINT_NEAR`] out to the attenuation radius.
/// Face order matches the cube map layer order (+X -X +Y -Y +Z -Z); the ±Y
/// faces use a Z up vector since world up is parallel to their direction.
#[must_use]
pub fn point_light_face_matrices(position: Vec3, radius: f32) -> [Mat4; 6] {
    const FACES: [(Vec3, Vec3); 6] = [
        (Vec3::X, Vec3::NEG_Y),
        (Vec3::NEG_X, Vec3::NEG_Y),
        (Vec3::Y, Vec3::Z),
        (Vec3::NEG_Y, Vec3::NEG_Z),
        (Vec3::Z, Vec3::NEG_Y),
        (Vec3::NEG_Z, Vec3::NEG_Y),
    ];

    let far = radius.max(POINT_NEAR * 2.0);
    let proj = Mat4::perspective_rh(FRAC_PI_2, 1.0, POINT_NEAR, far);

    FACES.map(|(dir, up)| proj * Mat4::look_at_rh(position, position + dir, up))
}
