//! Frustum and culling tests
//!
//! Tests for:
//! - Sphere and AABB intersection against extracted planes
//! - The shadow-caster variant ignoring the near plane
//! - Visible-set collection excluding out-of-frustum renderables
//! - Non-casting meshes excluded from the caster set

use glam::{Mat4, Vec3};
use lucent::math::{BoundingBox, Frustum};
use lucent::render::visibility::{collect_shadow_casters, collect_visible};
use lucent::render::MeshKey;
use lucent::scene::{EntityStore, MaterialComponent, MeshComponent, Transform};

// ============================================================================
// Helper
// ============================================================================

fn camera_frustum() -> Frustum {
    // Looking down -Z from the origin, far plane at 100
    let proj = Mat4::perspective_rh(1.0, 1.0, 0.1, 100.0);
    let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
    Frustum::from_matrix(proj * view)
}

fn spawn_renderable(store: &mut EntityStore, position: Vec3) -> lucent::Entity {
    let entity = store.spawn();
    store
        .transforms
        .insert(entity, Transform::from_world(Mat4::from_translation(position)));
    store.meshes.insert(
        entity,
        MeshComponent::new(MeshKey::default(), BoundingBox::default()),
    );
    store.materials.insert(entity, MaterialComponent::default());
    entity
}

// ============================================================================
// Sphere tests
// ============================================================================

#[test]
fn sphere_inside_is_visible() {
    let frustum = camera_frustum();
    assert!(frustum.intersects_sphere(Vec3::new(0.0, 0.0, -10.0), 1.0));
}

#[test]
fn sphere_behind_camera_is_culled() {
    let frustum = camera_frustum();
    assert!(!frustum.intersects_sphere(Vec3::new(0.0, 0.0, 10.0), 1.0));
}

#[test]
fn sphere_beyond_far_plane_is_culled() {
    let frustum = camera_frustum();
    assert!(!frustum.intersects_sphere(Vec3::new(0.0, 0.0, -150.0), 1.0));
}

#[test]
fn sphere_straddling_far_plane_is_visible() {
    let frustum = camera_frustum();
    assert!(frustum.intersects_sphere(Vec3::new(0.0, 0.0, -100.0), 2.0));
}

// ============================================================================
// AABB tests
// ============================================================================

#[test]
fn aabb_inside_is_visible() {
    let frustum = camera_frustum();
    let bbox = BoundingBox::new(Vec3::new(-1.0, -1.0, -11.0), Vec3::new(1.0, 1.0, -9.0));
    assert!(frustum.intersects_aabb(&bbox));
}

#[test]
fn aabb_far_off_axis_is_culled() {
    let frustum = camera_frustum();
    let bbox = BoundingBox::new(Vec3::new(500.0, 0.0, -11.0), Vec3::new(502.0, 2.0, -9.0));
    assert!(!frustum.intersects_aabb(&bbox));
}

#[test]
fn aabb_straddling_side_plane_is_visible() {
    let frustum = camera_frustum();
    // Wide box crossing the left plane at depth 10
    let bbox = BoundingBox::new(Vec3::new(-50.0, -1.0, -11.0), Vec3::new(0.0, 1.0, -9.0));
    assert!(frustum.intersects_aabb(&bbox));
}

// ============================================================================
// Shadow caster variant
// ============================================================================

#[test]
fn caster_frustum_keeps_geometry_behind_near_plane() {
    let proj = Mat4::orthographic_rh(-10.0, 10.0, -10.0, 10.0, 0.0, 50.0);
    let view = Mat4::look_at_rh(Vec3::new(0.0, 20.0, 0.0), Vec3::ZERO, Vec3::Z);
    let matrix = proj * view;

    // A caster above the light's near plane: rejected by the strict
    // frustum, kept by the caster variant.
    let above = BoundingBox::new(Vec3::new(-1.0, 24.0, -1.0), Vec3::new(1.0, 26.0, 1.0));
    assert!(!Frustum::from_matrix(matrix).intersects_aabb(&above));
    assert!(Frustum::from_matrix_shadow_caster(matrix).intersects_aabb(&above));

    // The far plane and lateral bounds still cull.
    let below = BoundingBox::new(Vec3::new(-1.0, -40.0, -1.0), Vec3::new(1.0, -35.0, 1.0));
    assert!(!Frustum::from_matrix_shadow_caster(matrix).intersects_aabb(&below));
}

// ============================================================================
// Visible-set collection
// ============================================================================

#[test]
fn culled_renderables_cost_zero_draws() {
    let mut store = EntityStore::new();
    let inside = spawn_renderable(&mut store, Vec3::new(0.0, 0.0, -10.0));
    let behind_far = spawn_renderable(&mut store, Vec3::new(0.0, 0.0, -2000.0));
    let behind_camera = spawn_renderable(&mut store, Vec3::new(0.0, 0.0, 50.0));

    let visible = collect_visible(&store, &camera_frustum());

    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].entity, inside);
    assert!(!visible.iter().any(|v| v.entity == behind_far));
    assert!(!visible.iter().any(|v| v.entity == behind_camera));
}

#[test]
fn non_casting_mesh_is_excluded_from_shadow_casters() {
    let mut store = EntityStore::new();
    let caster = spawn_renderable(&mut store, Vec3::new(0.0, 0.0, -10.0));
    let decal = spawn_renderable(&mut store, Vec3::new(1.0, 0.0, -10.0));
    store.meshes[decal].cast_shadows = false;

    let casters = collect_shadow_casters(&store, &camera_frustum());

    assert_eq!(casters.len(), 1);
    assert_eq!(casters[0].entity, caster);
}

#[test]
fn empty_scene_collects_nothing() {
    let store = EntityStore::new();
    assert!(collect_visible(&store, &camera_frustum()).is_empty());
}

#[test]
fn entity_without_material_is_not_renderable() {
    let mut store = EntityStore::new();
    let entity = store.spawn();
    store
        .transforms
        .insert(entity, Transform::from_world(Mat4::from_translation(Vec3::new(0.0, 0.0, -10.0))));
    store.meshes.insert(
        entity,
        MeshComponent::new(MeshKey::default(), BoundingBox::default()),
    );

    assert!(collect_visible(&store, &camera_frustum()).is_empty());
}
