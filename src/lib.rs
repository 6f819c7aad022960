#![warn(clippy::all)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod app;
pub mod controls;
pub mod errors;
pub mod math;
pub mod render;
pub mod scene;

pub use app::input::Input;
pub use controls::{ArcballController, CameraController};
pub use errors::{LucentError, Result};
pub use math::{BoundingBox, BoundingSphere, Frustum};
pub use render::{DeferredRenderer, GpuContext, RenderTargetSet, ResourceStore, ShaderSet};
pub use scene::{
    Camera, DirectionalLight, DirtyTracker, Entity, EntityStore, Hierarchy, HierarchyResolver,
    MaterialComponent, MeshComponent, PointLight, Projection, Transform,
};
