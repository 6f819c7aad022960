//! Dirty Marking
//!
//! Transient per-entity marks signalling that derived data is stale: a dirty
//! light needs its shadow matrices and depth maps recomputed, a dirty camera
//! needs its dependent view data refreshed. Marks are stored as zero-payload
//! entries in sparse secondary maps keyed by entity — O(1) add/remove and no
//! storage slot wasted on a boolean.
//!
//! Marking is idempotent: one mark per logical change, marking an already
//! marked entity is a no-op. The consuming system (the shadow pipeline for
//! lights, the renderer for cameras) clears the mark once recomputation for
//! that entity finishes, so a light is reprocessed at most once per mark —
//! not unconditionally once per frame.

use slotmap::SparseSecondaryMap;

use crate::scene::store::{Entity, EntityStore};

#[derive(Default)]
pub struct DirtyTracker {
    lights: SparseSecondaryMap<Entity, ()>,
    cameras: SparseSecondaryMap<Entity, ()>,
}

impl DirtyTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Lights
    // ========================================================================

    /// Marks an entity's light dirty. Returns `true` if the entity was newly
    /// marked, `false` if it was already dirty (no-op).
    pub fn mark_light(&mut self, entity: Entity) -> bool {
        self.lights.insert(entity, ()).is_none()
    }

    #[must_use]
    pub fn is_light_dirty(&self, entity: Entity) -> bool {
        self.lights.contains_key(entity)
    }

    /// Clears a light mark after the consumer finished recomputing.
    pub fn clear_light(&mut self, entity: Entity) {
        self.lights.remove(entity);
    }

    /// Dirty light entities in deterministic (handle) order.
    #[must_use]
    pub fn dirty_lights(&self) -> Vec<Entity> {
        let mut entities: Vec<Entity> = self.lights.keys().collect();
        entities.sort_unstable();
        entities
    }

    /// Marks every directional light in the store dirty.
    ///
    /// This is the camera-update fan-out rule: *any* camera change dirties
    /// *all* directional lights system-wide, because every directional
    /// cascade is fitted to the camera frustum. Point lights are unaffected
    /// (their shadow volume depends only on the light itself).
    pub fn mark_all_directional_lights(&mut self, store: &EntityStore) {
        for (entity, _) in store.directional_lights.iter() {
            self.lights.insert(entity, ());
        }
    }

    // ========================================================================
    // Cameras
    // ========================================================================

    /// Marks an entity's camera dirty. Idempotent like `mark_light`.
    pub fn mark_camera(&mut self, entity: Entity) -> bool {
        self.cameras.insert(entity, ()).is_none()
    }

    #[must_use]
    pub fn is_camera_dirty(&self, entity: Entity) -> bool {
        self.cameras.contains_key(entity)
    }

    pub fn clear_camera(&mut self, entity: Entity) {
        self.cameras.remove(entity);
    }

    #[must_use]
    pub fn dirty_cameras(&self) -> Vec<Entity> {
        let mut entities: Vec<Entity> = self.cameras.keys().collect();
        entities.sort_unstable();
        entities
    }

    /// Drops all marks held for a destroyed entity.
    pub fn forget(&mut self, entity: Entity) {
        self.lights.remove(entity);
        self.cameras.remove(entity);
    }
}
