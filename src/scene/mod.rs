pub mod camera;
pub mod dirty;
pub mod hierarchy;
pub mod light;
pub mod mesh;
pub mod store;
pub mod transform;

pub use camera::{Camera, Projection, ProjectionKind};
pub use dirty::DirtyTracker;
pub use hierarchy::HierarchyResolver;
pub use light::{
    ATTENUATION_CUTOFF, CASCADE_COUNT, DirectionalLight, PointLight, ShadowConfig,
    point_light_radius,
};
pub use mesh::{MaterialComponent, MeshComponent};
pub use store::{Entity, EntityStore};
pub use transform::{Hierarchy, Transform};
