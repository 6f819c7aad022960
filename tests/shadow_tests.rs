//! Shadow fitting math tests
//!
//! Tests for:
//! - Cascade split distances
//! - Point light radius derivation and monotonicity
//! - Slice bounding spheres (including degenerate slices)
//! - Texel-grid snapping stability
//! - Directional cascade and cube face matrices staying finite

use glam::{Mat4, Vec3, Vec4};
use lucent::math::frustum::RADIUS_EPSILON;
use lucent::render::shadow::cascade;
use lucent::scene::{point_light_radius, CASCADE_COUNT};

// ============================================================================
// Helper
// ============================================================================

const EPSILON: f32 = 1e-4;

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn mat4_finite(m: Mat4) -> bool {
    m.to_cols_array().iter().all(|x| x.is_finite())
}

// ============================================================================
// Splits
// ============================================================================

#[test]
fn cascade_splits_follow_fixed_scheme() {
    let splits = cascade::cascade_split_distances(0.1, 100.0);
    assert_eq!(splits.len(), CASCADE_COUNT + 1);
    assert!(approx_eq(splits[0], 0.1));
    assert!(approx_eq(splits[1], 5.0));
    assert!(approx_eq(splits[2], 20.0));
    assert!(approx_eq(splits[3], 100.0));
}

#[test]
fn cascade_splits_strictly_increasing() {
    let splits = cascade::cascade_split_distances(0.05, 500.0);
    for pair in splits.windows(2) {
        assert!(pair[0] < pair[1]);
    }
}

#[test]
fn cascade_end_clip_space_is_monotonic() {
    let proj = Mat4::perspective_rh(1.0, 16.0 / 9.0, 0.1, 100.0);
    let splits = cascade::cascade_split_distances(0.1, 100.0);

    let ends: Vec<f32> = splits[1..]
        .iter()
        .map(|far| cascade::cascade_end_clip_space(&proj, *far))
        .collect();
    for pair in ends.windows(2) {
        assert!(pair[0] < pair[1]);
    }
    // The final boundary divides out to the far plane (NDC depth 1).
    let clip = proj * Vec4::new(0.0, 0.0, -100.0, 1.0);
    assert!(approx_eq(ends[CASCADE_COUNT - 1] / clip.w, 1.0));
}

// ============================================================================
// Point light radius
// ============================================================================

#[test]
fn point_radius_matches_attenuation_cutoff() {
    // intensity / r^2 = 5/256 solved for r
    assert!(approx_eq(point_light_radius(1.0), (256.0f32 / 5.0).sqrt()));
    assert!(approx_eq(point_light_radius(4.0), 2.0 * (256.0f32 / 5.0).sqrt()));
}

#[test]
fn point_radius_is_monotonic_in_intensity() {
    let mut last = 0.0;
    for i in 1..50 {
        let radius = point_light_radius(i as f32 * 0.5);
        assert!(radius > last);
        last = radius;
    }
}

#[test]
fn point_radius_never_degenerate() {
    assert!(point_light_radius(0.0) >= RADIUS_EPSILON);
    assert!(point_light_radius(-3.0) >= RADIUS_EPSILON);
}

// ============================================================================
// Slice bounding sphere
// ============================================================================

#[test]
fn slice_sphere_centers_on_corner_extents() {
    let corners = [
        Vec3::new(-1.0, -1.0, -1.0),
        Vec3::new(1.0, -1.0, -1.0),
        Vec3::new(-1.0, 1.0, -1.0),
        Vec3::new(1.0, 1.0, -1.0),
        Vec3::new(-2.0, -2.0, 1.0),
        Vec3::new(2.0, -2.0, 1.0),
        Vec3::new(-2.0, 2.0, 1.0),
        Vec3::new(2.0, 2.0, 1.0),
    ];
    let sphere = cascade::slice_bounding_sphere(&corners);
    assert!(approx_eq(sphere.center.x, 0.0));
    assert!(approx_eq(sphere.center.z, 0.0));
    // Largest per-axis extent is 4 (x and y), so radius is 2.
    assert!(approx_eq(sphere.radius, 2.0));
}

#[test]
fn degenerate_slice_yields_clamped_sphere_and_finite_matrix() {
    let corners = [Vec3::splat(3.0); 8];
    let sphere = cascade::slice_bounding_sphere(&corners);
    assert!(sphere.radius >= RADIUS_EPSILON);

    let matrix = cascade::directional_cascade_matrix(
        Vec3::new(0.0, -1.0, 0.1).normalize(),
        sphere.center,
        sphere.radius,
    );
    assert!(mat4_finite(matrix));
}

// ============================================================================
// Texel snapping
// ============================================================================

#[test]
fn snap_is_stable_within_a_texel() {
    let dir = Vec3::new(0.3, -0.8, 0.2).normalize();
    let radius = 10.0;
    let map_size = 1024;

    let center = Vec3::new(5.123, 2.456, -7.891);
    let texel = radius * 2.0 / map_size as f32;
    let nudged = center + Vec3::new(texel * 0.2, 0.0, 0.0);

    let a = cascade::snap_to_texel_grid(center, dir, radius, map_size);
    // Snapping only ever moves the center by a sub-texel amount laterally.
    assert!((a - center).length() <= texel * std::f32::consts::SQRT_2 + EPSILON);

    // A sub-texel nudge lands on the same grid point or the adjacent one,
    // never somewhere in between.
    let c = cascade::snap_to_texel_grid(nudged, dir, radius, map_size);
    assert!((a - c).length() < texel + EPSILON);
}

#[test]
fn snap_survives_vertical_light_direction() {
    // Straight-down light is parallel to the default up vector.
    let snapped = cascade::snap_to_texel_grid(Vec3::new(1.0, 2.0, 3.0), Vec3::NEG_Y, 5.0, 512);
    assert!(snapped.is_finite());
}

// ============================================================================
// Directional cascade matrix
// ============================================================================

#[test]
fn cascade_matrix_centers_the_volume() {
    let dir = Vec3::new(0.2, -0.9, 0.1).normalize();
    let center = Vec3::new(4.0, 1.0, -2.0);
    let matrix = cascade::directional_cascade_matrix(dir, center, 8.0);

    let clip = matrix * center.extend(1.0);
    let ndc = clip.truncate() / clip.w;
    assert!(approx_eq(ndc.x, 0.0));
    assert!(approx_eq(ndc.y, 0.0));
    assert!(ndc.z > 0.0 && ndc.z < 1.0);

    // Points on the lateral boundary land on the NDC edge.
    let view_dir = cascade::safe_up(dir).cross(dir).normalize();
    let edge = matrix * (center + view_dir * 8.0).extend(1.0);
    assert!(approx_eq(edge.truncate().x.abs().max(edge.truncate().y.abs()) / edge.w, 1.0));
}

// ============================================================================
// Cube faces
// ============================================================================

#[test]
fn point_faces_project_their_axis_to_center() {
    let position = Vec3::new(1.0, 2.0, 3.0);
    let radius = 10.0;
    let faces = cascade::point_light_face_matrices(position, radius);
    assert_eq!(faces.len(), 6);

    let dirs = [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z];
    for (matrix, dir) in faces.iter().zip(dirs.iter()) {
        assert!(mat4_finite(*matrix));
        // A point straight down the face axis projects to the NDC center.
        let clip = *matrix * (position + *dir * 5.0).extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(approx_eq(ndc.x, 0.0));
        assert!(approx_eq(ndc.y, 0.0));
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }
}

#[test]
fn point_faces_handle_tiny_radius() {
    let faces = cascade::point_light_face_matrices(Vec3::ZERO, RADIUS_EPSILON);
    for matrix in faces {
        assert!(mat4_finite(matrix));
    }
}
