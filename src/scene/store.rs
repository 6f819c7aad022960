//! Entity / Component Storage
//!
//! [`EntityStore`] is the single owner of all scene data: a slotmap arena of
//! entity handles plus one sparse component pool per component type. There is
//! no scheduling layer — systems borrow the pools they need directly, which
//! keeps borrows explicit and avoids a god object with interior mutability.
//!
//! # Destruction order
//!
//! `despawn` runs fix-up hooks *synchronously, before* any component leaves
//! its pool:
//!
//! 1. Hierarchy fix-up — the entity's world transform is rewritten to its
//!    local value (`inverse_parent * world`) so a consumer observing the
//!    transform mid-destroy sees a coherent local matrix, and the entity's
//!    children are re-parented to the root with their world transforms kept.
//! 2. Generic removal — every component pool drops its entry, then the entity
//!    handle is freed.

use slotmap::{SlotMap, SparseSecondaryMap, new_key_type};

use crate::scene::camera::Camera;
use crate::scene::dirty::DirtyTracker;
use crate::scene::light::{DirectionalLight, PointLight};
use crate::scene::mesh::{MaterialComponent, MeshComponent};
use crate::scene::transform::{Hierarchy, Transform};

new_key_type! {
    /// Opaque handle into the [`EntityStore`]. Carries no identity beyond
    /// the handle itself; stale handles fail lookups instead of aliasing.
    pub struct Entity;
}

/// Owner of entities and their attached components.
pub struct EntityStore {
    entities: SlotMap<Entity, ()>,

    // ==== Component pools ====
    pub transforms: SparseSecondaryMap<Entity, Transform>,
    pub hierarchies: SparseSecondaryMap<Entity, Hierarchy>,
    pub meshes: SparseSecondaryMap<Entity, MeshComponent>,
    pub materials: SparseSecondaryMap<Entity, MaterialComponent>,
    pub point_lights: SparseSecondaryMap<Entity, PointLight>,
    pub directional_lights: SparseSecondaryMap<Entity, DirectionalLight>,
    pub cameras: SparseSecondaryMap<Entity, Camera>,
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: SlotMap::with_key(),
            transforms: SparseSecondaryMap::new(),
            hierarchies: SparseSecondaryMap::new(),
            meshes: SparseSecondaryMap::new(),
            materials: SparseSecondaryMap::new(),
            point_lights: SparseSecondaryMap::new(),
            directional_lights: SparseSecondaryMap::new(),
            cameras: SparseSecondaryMap::new(),
        }
    }

    /// Creates a new empty entity.
    pub fn spawn(&mut self) -> Entity {
        self.entities.insert(())
    }

    #[inline]
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.contains_key(entity)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterates all live entity handles.
    pub fn iter_entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.keys()
    }

    /// Destroys an entity and releases all of its components.
    ///
    /// Hook order is fixed: hierarchy fix-up first (restore local transform,
    /// orphan children to root), then generic component removal. Destroying a
    /// dead handle is a no-op.
    pub fn despawn(&mut self, entity: Entity, dirty: &mut DirtyTracker) {
        if !self.entities.contains_key(entity) {
            return;
        }

        // --- Hook 1: hierarchy fix-up (before any component is removed) ---
        if let Some(hierarchy) = self.hierarchies.get(entity) {
            let inverse_parent = hierarchy.inverse_parent;
            if let Some(transform) = self.transforms.get_mut(entity) {
                // Restore the local transform so a consumer reading the
                // matrix mid-destroy sees the correct local value.
                transform.world = inverse_parent * transform.world;
                transform.settle();
            }
        }

        // Orphan policy: children of a destroyed parent become roots,
        // keeping their current world transforms.
        let orphans: Vec<Entity> = self
            .hierarchies
            .iter()
            .filter(|(_, h)| h.parent == Some(entity))
            .map(|(child, _)| child)
            .collect();
        for child in orphans {
            if let Some(h) = self.hierarchies.get_mut(child) {
                h.parent = None;
                h.inverse_parent = glam::Mat4::IDENTITY;
            }
            if let Some(t) = self.transforms.get_mut(child) {
                t.mark_dirty();
            }
        }

        // --- Hook 2: generic removal ---
        self.transforms.remove(entity);
        self.hierarchies.remove(entity);
        self.meshes.remove(entity);
        self.materials.remove(entity);
        self.point_lights.remove(entity);
        self.directional_lights.remove(entity);
        self.cameras.remove(entity);
        dirty.forget(entity);
        self.entities.remove(entity);
    }

    // ========================================================================
    // Structural mutation
    // ========================================================================

    /// Re-parents `child` under `parent`.
    ///
    /// The child's stored `inverse_parent` is left untouched until the next
    /// resolve pass, so the local transform it encodes (relative to the old
    /// parent frame) is what carries over under the new parent.
    pub fn attach(&mut self, child: Entity, parent: Entity) {
        if child == parent {
            log::warn!("Cannot attach an entity to itself");
            return;
        }
        if !self.is_alive(parent) {
            log::warn!("Attach target {parent:?} is not alive; leaving child at root");
            return;
        }
        if let Some(h) = self.hierarchies.get_mut(child) {
            h.parent = Some(parent);
        } else {
            self.hierarchies.insert(child, Hierarchy::with_parent(parent));
        }
        if let Some(t) = self.transforms.get_mut(child) {
            t.mark_dirty();
        }
    }

    /// Detaches `child` from its parent, making it a root. The world
    /// transform is preserved.
    pub fn detach(&mut self, child: Entity) {
        if let Some(h) = self.hierarchies.get_mut(child) {
            h.parent = None;
            h.inverse_parent = glam::Mat4::IDENTITY;
        }
        if let Some(t) = self.transforms.get_mut(child) {
            t.mark_dirty();
        }
    }

    // ========================================================================
    // Component-set iteration
    // ========================================================================

    /// Entities carrying Transform + Mesh + Material (the renderable set).
    pub fn iter_renderables(
        &self,
    ) -> impl Iterator<Item = (Entity, &Transform, &MeshComponent, &MaterialComponent)> {
        self.meshes.iter().filter_map(|(entity, mesh)| {
            let transform = self.transforms.get(entity)?;
            let material = self.materials.get(entity)?;
            Some((entity, transform, mesh, material))
        })
    }

    /// Entities carrying Transform + Mesh (the shadow-caster set).
    pub fn iter_shadow_casters(
        &self,
    ) -> impl Iterator<Item = (Entity, &Transform, &MeshComponent)> {
        self.meshes.iter().filter_map(|(entity, mesh)| {
            let transform = self.transforms.get(entity)?;
            Some((entity, transform, mesh))
        })
    }

    /// World-space bounds of every renderable, unioned. `None` for a scene
    /// with no renderables.
    #[must_use]
    pub fn scene_bounds(&self) -> Option<crate::math::BoundingBox> {
        let mut combined: Option<crate::math::BoundingBox> = None;
        for (_, transform, mesh) in self.iter_shadow_casters() {
            let world_bbox = mesh.bounds.transform(&transform.world);
            combined = Some(match combined {
                Some(existing) => existing.union(&world_bbox),
                None => world_bbox,
            });
        }
        combined
    }
}
