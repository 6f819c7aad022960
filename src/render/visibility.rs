//! Frustum culling as a pure function over the entity store, separated from
//! command encoding so the visible set is testable without a GPU device.

use glam::Mat4;

use crate::math::Frustum;
use crate::scene::{Entity, EntityStore};

/// A renderable that survived culling, with its world-space model matrix.
#[derive(Debug, Clone, Copy)]
pub struct VisibleObject {
    pub entity: Entity,
    pub model: Mat4,
}

/// Collects entities with mesh + material whose world-space AABB intersects
/// the frustum. Ordering follows entity handle order for determinism.
#[must_use]
pub fn collect_visible(store: &EntityStore, frustum: &Frustum) -> Vec<VisibleObject> {
    let mut visible: Vec<VisibleObject> = store
        .iter_renderables()
        .filter(|(_, transform, mesh, _)| {
            let world_bounds = mesh.bounds.transform(&transform.world);
            frustum.intersects_aabb(&world_bounds)
        })
        .map(|(entity, transform, _, _)| VisibleObject {
            entity,
            model: transform.world,
        })
        .collect();
    visible.sort_unstable_by_key(|object| object.entity);
    visible
}

/// Shadow caster variant: ignores materials, honors `cast_shadows`, and
/// culls with a caster frustum whose near plane is disabled so geometry
/// behind the light's near plane still casts.
#[must_use]
pub fn collect_shadow_casters(store: &EntityStore, frustum: &Frustum) -> Vec<VisibleObject> {
    let mut casters: Vec<VisibleObject> = store
        .iter_shadow_casters()
        .filter(|(_, transform, mesh)| {
            if !mesh.cast_shadows {
                return false;
            }
            let world_bounds = mesh.bounds.transform(&transform.world);
            frustum.intersects_aabb(&world_bounds)
        })
        .map(|(entity, transform, _)| VisibleObject {
            entity,
            model: transform.world,
        })
        .collect();
    casters.sort_unstable_by_key(|object| object.entity);
    casters
}
