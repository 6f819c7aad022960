pub mod arcball;

pub use arcball::{ArcballController, MIN_DOLLY_DISTANCE};

use glam::Mat4;

use crate::app::input::Input;
use crate::math::BoundingBox;
use crate::scene::{Entity, EntityStore};

/// Camera controller strategy.
///
/// Closed enum: the set of controllers is small and known, and the renderer
/// matches on it in exactly one place. New strategies add a variant here.
#[derive(Debug, Clone)]
pub enum CameraController {
    Arcball(ArcballController),
}

impl CameraController {
    /// Feeds one frame of input to the controller. Returns `true` if any
    /// state changed — the caller marks the owning camera dirty on `true`.
    ///
    /// The caller is also responsible for gating this on GUI capture /
    /// gizmo-drag state; controllers never check that themselves.
    pub fn update(&mut self, input: &Input, elapsed: f32) -> bool {
        match self {
            Self::Arcball(arcball) => arcball.update(input, elapsed),
        }
    }

    /// Deterministic re-framing on a bounding box, used at creation and on
    /// "reset view" input.
    pub fn frame(&mut self, bounds: &BoundingBox) {
        match self {
            Self::Arcball(arcball) => arcball.frame(bounds),
        }
    }

    /// World transform of the camera entity implied by the controller state.
    #[must_use]
    pub fn world_transform(&self) -> Mat4 {
        match self {
            Self::Arcball(arcball) => arcball.world_transform(),
        }
    }
}

/// Feeds one frame of input to an entity's camera controller and, if the
/// controller moved, writes the implied world matrix back onto the entity's
/// transform. The resolver picks the edit up on the next pass and the camera
/// is marked dirty through the usual change propagation.
///
/// Returns whether the controller changed state. Inactive cameras (GUI has
/// captured the pointer, a gizmo drag is in flight) are skipped.
pub fn drive_camera(
    store: &mut EntityStore,
    entity: Entity,
    input: &Input,
    elapsed: f32,
) -> bool {
    let Some(camera) = store.cameras.get_mut(entity) else {
        return false;
    };
    if !camera.active {
        return false;
    }
    if !camera.controller.update(input, elapsed) {
        return false;
    }
    let world = camera.controller.world_transform();
    if let Some(transform) = store.transforms.get_mut(entity) {
        transform.world = world;
    }
    true
}
