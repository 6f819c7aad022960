//! Hierarchy resolution tests
//!
//! Tests for:
//! - World matrices after attach and resolve, with or without an explicit
//!   Hierarchy component on the parent
//! - Repeated resolves of a static scene staying bit-identical
//! - Direct world edits interpreted as local deltas
//! - Dangling parent handles treated as roots
//! - Destroy orphaning children to the root with world kept

use glam::{Mat4, Vec3};
use lucent::scene::{DirtyTracker, EntityStore, Hierarchy, HierarchyResolver, Transform};

// ============================================================================
// Helper
// ============================================================================

const EPSILON: f32 = 1e-5;

fn mat4_approx(a: Mat4, b: Mat4) -> bool {
    a.to_cols_array()
        .iter()
        .zip(b.to_cols_array().iter())
        .all(|(x, y)| (x - y).abs() < EPSILON)
}

fn translation(m: Mat4) -> Vec3 {
    m.w_axis.truncate()
}

fn spawn_at(store: &mut EntityStore, world: Mat4) -> lucent::Entity {
    let e = store.spawn();
    store.transforms.insert(e, Transform::from_world(world));
    store.hierarchies.insert(e, Hierarchy::root());
    e
}

// ============================================================================
// Composition
// ============================================================================

#[test]
fn child_inherits_parent_translation() {
    let mut store = EntityStore::new();
    let mut resolver = HierarchyResolver::new();

    let parent = spawn_at(&mut store, Mat4::from_translation(Vec3::new(0.0, 5.0, 0.0)));
    let child = spawn_at(&mut store, Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0)));
    store.attach(child, parent);

    resolver.resolve(&mut store);

    assert!(mat4_approx(
        store.transforms[child].world,
        Mat4::from_translation(Vec3::new(1.0, 5.0, 0.0))
    ));
}

#[test]
fn grandchild_composes_through_two_levels() {
    let mut store = EntityStore::new();
    let mut resolver = HierarchyResolver::new();

    let a = spawn_at(&mut store, Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0)));
    let b = spawn_at(&mut store, Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0)));
    let c = spawn_at(&mut store, Mat4::from_translation(Vec3::new(0.0, 4.0, 0.0)));
    store.attach(b, a);
    store.attach(c, b);

    resolver.resolve(&mut store);

    assert!(mat4_approx(
        store.transforms[b].world,
        Mat4::from_translation(Vec3::new(0.0, 3.0, 0.0))
    ));
    assert!(mat4_approx(
        store.transforms[c].world,
        Mat4::from_translation(Vec3::new(0.0, 7.0, 0.0))
    ));
}

#[test]
fn parent_edit_propagates_to_child() {
    let mut store = EntityStore::new();
    let mut resolver = HierarchyResolver::new();

    let parent = spawn_at(&mut store, Mat4::from_translation(Vec3::new(0.0, 5.0, 0.0)));
    let child = spawn_at(&mut store, Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0)));
    store.attach(child, parent);
    resolver.resolve(&mut store);

    // Move the parent; the child's local offset must carry over.
    store.transforms[parent].world = Mat4::from_translation(Vec3::new(0.0, 9.0, 0.0));
    resolver.resolve(&mut store);

    assert!(mat4_approx(
        store.transforms[child].world,
        Mat4::from_translation(Vec3::new(1.0, 9.0, 0.0))
    ));
}

#[test]
fn child_world_edit_is_interpreted_as_local_delta() {
    let mut store = EntityStore::new();
    let mut resolver = HierarchyResolver::new();

    let parent = spawn_at(&mut store, Mat4::from_translation(Vec3::new(0.0, 5.0, 0.0)));
    let child = spawn_at(&mut store, Mat4::from_translation(Vec3::new(1.0, 5.0, 0.0)));
    store.attach(child, parent);
    resolver.resolve(&mut store);

    // Write the child's world directly; the resolver recovers
    // local = inverse_parent * world and recomposes against the parent.
    store.transforms[child].world = Mat4::from_translation(Vec3::new(2.0, 5.0, 0.0));
    resolver.resolve(&mut store);

    assert!(mat4_approx(
        store.transforms[child].world,
        Mat4::from_translation(Vec3::new(2.0, 5.0, 0.0))
    ));

    // Parent motion now carries the edited local along.
    store.transforms[parent].world = Mat4::from_translation(Vec3::new(0.0, 6.0, 0.0));
    resolver.resolve(&mut store);
    assert!(mat4_approx(
        store.transforms[child].world,
        Mat4::from_translation(Vec3::new(2.0, 6.0, 0.0))
    ));
}

#[test]
fn parent_without_hierarchy_component_propagates() {
    let mut store = EntityStore::new();
    let mut resolver = HierarchyResolver::new();

    // The parent is spawned the minimal way: a transform, no Hierarchy.
    let parent = store.spawn();
    store.transforms.insert(parent, Transform::new());
    let child = spawn_at(&mut store, Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0)));
    store.attach(child, parent);
    resolver.resolve(&mut store);

    assert!(mat4_approx(
        store.transforms[child].world,
        Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0))
    ));

    store.transforms[parent].world = Mat4::from_translation(Vec3::new(0.0, 5.0, 0.0));
    resolver.resolve(&mut store);

    assert!(mat4_approx(
        store.transforms[child].world,
        Mat4::from_translation(Vec3::new(1.0, 5.0, 0.0))
    ));
}

#[test]
fn edited_root_without_hierarchy_is_reported_changed() {
    let mut store = EntityStore::new();
    let mut resolver = HierarchyResolver::new();

    let entity = store.spawn();
    store.transforms.insert(
        entity,
        Transform::from_world(Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0))),
    );

    resolver.resolve(&mut store);
    assert!(resolver.changed_entities().any(|e| e == entity));

    // Settled: an untouched pass reports nothing.
    resolver.resolve(&mut store);
    assert_eq!(resolver.changed_entities().count(), 0);

    store.transforms[entity].world = Mat4::from_translation(Vec3::new(4.0, 5.0, 6.0));
    resolver.resolve(&mut store);
    assert!(resolver.changed_entities().any(|e| e == entity));
}

// ============================================================================
// Idempotence
// ============================================================================

#[test]
fn repeated_resolve_is_bit_identical() {
    let mut store = EntityStore::new();
    let mut resolver = HierarchyResolver::new();

    let parent = spawn_at(
        &mut store,
        Mat4::from_rotation_y(0.37) * Mat4::from_translation(Vec3::new(0.2, 5.1, -3.3)),
    );
    let child = spawn_at(&mut store, Mat4::from_translation(Vec3::new(1.0, 0.0, 0.7)));
    let grandchild = spawn_at(&mut store, Mat4::from_rotation_x(1.1));
    store.attach(child, parent);
    store.attach(grandchild, child);

    resolver.resolve(&mut store);
    let after_first: Vec<Mat4> = [parent, child, grandchild]
        .iter()
        .map(|e| store.transforms[*e].world)
        .collect();

    // Unedited subtrees are skipped outright, so there is no float drift.
    for _ in 0..10 {
        resolver.resolve(&mut store);
    }
    for (entity, expected) in [parent, child, grandchild].iter().zip(after_first.iter()) {
        assert_eq!(store.transforms[*entity].world, *expected);
    }
}

// ============================================================================
// Dangling parents and destruction
// ============================================================================

#[test]
fn dangling_parent_is_treated_as_root() {
    let mut store = EntityStore::new();
    let mut resolver = HierarchyResolver::new();
    let mut dirty = DirtyTracker::new();

    let doomed = spawn_at(&mut store, Mat4::IDENTITY);
    store.despawn(doomed, &mut dirty);

    // A stale handle written directly into the pool must never be
    // dereferenced; the child resolves as a root with its world kept.
    let child = store.spawn();
    let world = Mat4::from_translation(Vec3::new(3.0, 0.0, 0.0));
    store.transforms.insert(child, Transform::from_world(world));
    store.hierarchies.insert(child, Hierarchy::with_parent(doomed));

    resolver.resolve(&mut store);

    assert!(mat4_approx(store.transforms[child].world, world));
}

#[test]
fn destroying_parent_orphans_children_to_root() {
    let mut store = EntityStore::new();
    let mut resolver = HierarchyResolver::new();
    let mut dirty = DirtyTracker::new();

    let parent = spawn_at(&mut store, Mat4::from_translation(Vec3::new(0.0, 5.0, 0.0)));
    let child = spawn_at(&mut store, Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0)));
    store.attach(child, parent);
    resolver.resolve(&mut store);

    let child_world = store.transforms[child].world;
    store.despawn(parent, &mut dirty);

    assert!(store.hierarchies[child].parent.is_none());
    assert!(mat4_approx(store.transforms[child].world, child_world));

    // The orphan keeps behaving as a root across later passes.
    resolver.resolve(&mut store);
    assert!(mat4_approx(store.transforms[child].world, child_world));
}

#[test]
fn despawn_dead_handle_is_noop() {
    let mut store = EntityStore::new();
    let mut dirty = DirtyTracker::new();

    let entity = store.spawn();
    store.despawn(entity, &mut dirty);
    store.despawn(entity, &mut dirty);

    assert!(!store.is_alive(entity));
    assert!(store.is_empty());
}

#[test]
fn detach_preserves_world() {
    let mut store = EntityStore::new();
    let mut resolver = HierarchyResolver::new();

    let parent = spawn_at(&mut store, Mat4::from_translation(Vec3::new(0.0, 5.0, 0.0)));
    let child = spawn_at(&mut store, Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0)));
    store.attach(child, parent);
    resolver.resolve(&mut store);

    let world = store.transforms[child].world;
    store.detach(child);
    resolver.resolve(&mut store);

    assert!(mat4_approx(store.transforms[child].world, world));
    assert_eq!(translation(store.transforms[child].world), Vec3::new(1.0, 5.0, 0.0));
}
