//! Hierarchy Resolution
//!
//! Propagates local→world transforms through the parent-child relation each
//! tick. Every [`Transform`]-carrying entity is processed in a stable
//! topological order — a parent's world matrix is always finalized before any
//! of its children are recomposed. A [`Hierarchy`] component is optional;
//! entities without one are roots.
//!
//! Ordering is deterministic: entities sort by hierarchy depth first, entity
//! handle second. Two resolves of the same scene visit the same entities in
//! the same order.
//!
//! # Recovering the local transform
//!
//! The store never holds an explicit local matrix. Instead, each entity's
//! [`Hierarchy::inverse_parent`] is the inverse of its parent's world matrix
//! as of the end of the *previous* pass, so
//!
//! ```text
//! local = inverse_parent_old * world_old
//! ```
//!
//! undoes last pass's composition. If the editor wrote `world` directly this
//! tick, the stored inverse is still consistent with the world matrix it was
//! computed against — the edited delta is exactly what survives in `local`
//! and is what must carry through under the (possibly updated) parent:
//!
//! ```text
//! world_new         = parent_world_new * local
//! inverse_parent    = inverse(parent_world_new)
//! ```
//!
//! Entities whose world matrix was not edited and whose parent did not change
//! this pass are skipped outright, which keeps repeated resolves of a static
//! scene bit-identical (no float drift from redundant recomposition).

use glam::Mat4;
use slotmap::SparseSecondaryMap;

use crate::scene::store::{Entity, EntityStore};

/// Transform propagation system.
///
/// Holds reusable scratch buffers; one instance per scene is enough.
#[derive(Default)]
pub struct HierarchyResolver {
    order: Vec<Entity>,
    depths: SparseSecondaryMap<Entity, u32>,
    changed: SparseSecondaryMap<Entity, ()>,
}

impl HierarchyResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs one resolve pass over the store.
    ///
    /// On return, every transform-carrying entity has a finalized world
    /// matrix and, where a Hierarchy component exists, a fresh
    /// `inverse_parent`. Root entities are never recomposed — their world
    /// matrix is left exactly as authored.
    pub fn resolve(&mut self, store: &mut EntityStore) {
        self.sort_topological(store);
        self.changed.clear();

        // Split borrows: the order list is owned by the resolver, so the
        // per-entity loop can take the pools mutably without conflict.
        for &entity in &self.order {
            // A missing Hierarchy component means root; a parent handle that
            // no longer resolves to a live transform is treated the same way
            // for this tick and never dereferenced.
            let parent = store.hierarchies.get(entity).and_then(|hierarchy| {
                hierarchy.parent.filter(|&p| {
                    let live = store.is_alive(p) && store.transforms.contains_key(p);
                    if !live {
                        log::warn!("Entity {entity:?} references dead parent; treating as root");
                    }
                    live
                })
            });

            let Some(parent) = parent else {
                // Root: identity inverse, authored world kept.
                let edited = match store.transforms.get_mut(entity) {
                    Some(t) => {
                        let edited = t.edited();
                        t.settle();
                        edited
                    }
                    None => false,
                };
                if let Some(h) = store.hierarchies.get_mut(entity) {
                    h.inverse_parent = Mat4::IDENTITY;
                }
                if edited {
                    self.changed.insert(entity, ());
                }
                continue;
            };

            let parent_world = store.transforms[parent].world;
            let parent_changed = self.changed.contains_key(parent);

            let Some(transform) = store.transforms.get_mut(entity) else {
                continue;
            };

            if transform.edited() || parent_changed {
                let inverse_parent_old = store.hierarchies[entity].inverse_parent;
                let local = inverse_parent_old * transform.world;

                let transform = &mut store.transforms[entity];
                transform.world = parent_world * local;
                transform.settle();

                store.hierarchies[entity].inverse_parent = parent_world.inverse();
                self.changed.insert(entity, ());
            }
        }
    }

    /// Entities recomposed by the last `resolve` call, in resolve order.
    pub fn changed_entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.order
            .iter()
            .copied()
            .filter(|e| self.changed.contains_key(*e))
    }

    /// Builds the stable topological order: depth ascending, entity handle
    /// ascending within a depth. Dangling parents count as roots; a cycle
    /// (which `attach` cannot normally produce) is cut off at the entity
    /// count and logged rather than looping forever.
    fn sort_topological(&mut self, store: &EntityStore) {
        self.order.clear();
        self.depths.clear();

        let max_depth = store.len() as u32;

        // Every transform-carrying entity participates; entities without a
        // Hierarchy component are plain roots at depth zero.
        for (entity, _) in store.transforms.iter() {
            let mut depth = 0u32;
            let mut cursor = entity;
            while let Some(h) = store.hierarchies.get(cursor) {
                let Some(parent) = h.parent else { break };
                if !store.is_alive(parent) || !store.transforms.contains_key(parent) {
                    break;
                }
                depth += 1;
                if depth > max_depth {
                    log::error!("Hierarchy cycle detected at {entity:?}; clamping depth");
                    break;
                }
                cursor = parent;
            }
            self.depths.insert(entity, depth);
            self.order.push(entity);
        }

        let depths = &self.depths;
        self.order.sort_unstable_by_key(|e| (depths[*e], *e));
    }
}
