use glam::Vec4;

use crate::math::BoundingBox;
use crate::render::resources::{MeshKey, TextureKey};

/// Mesh component: a handle to GPU vertex/index buffers plus the mesh's
/// axis-aligned bounds in local space (used for frustum and cascade culling).
#[derive(Debug, Clone)]
pub struct MeshComponent {
    pub mesh: MeshKey,
    pub bounds: BoundingBox,
    pub cast_shadows: bool,
}

impl MeshComponent {
    #[must_use]
    pub fn new(mesh: MeshKey, bounds: BoundingBox) -> Self {
        Self {
            mesh,
            bounds,
            cast_shadows: true,
        }
    }
}

/// Material component: scalar surface parameters plus an optional albedo
/// texture handle. A missing texture resolves to the store's magenta
/// placeholder — rendering never fails on an absent resource.
#[derive(Debug, Clone)]
pub struct MaterialComponent {
    pub color: Vec4,
    pub roughness: f32,
    pub metalness: f32,
    pub ambient_occlusion: f32,
    pub double_sided: bool,
    pub albedo_texture: Option<TextureKey>,
}

impl Default for MaterialComponent {
    fn default() -> Self {
        Self {
            color: Vec4::ONE,
            roughness: 0.8,
            metalness: 0.0,
            ambient_occlusion: 1.0,
            double_sided: false,
            albedo_texture: None,
        }
    }
}
