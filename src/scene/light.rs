use glam::{Mat4, Vec3};
use smallvec::SmallVec;

use crate::math::frustum::RADIUS_EPSILON;
use crate::render::resources::TextureKey;

/// Visibility threshold used to derive a point light's attenuation cutoff.
/// Inverse-square falloff solved for `intensity / r² = 5/256`.
pub const ATTENUATION_CUTOFF: f32 = 5.0 / 256.0;

/// Number of cascades a directional light renders.
pub const CASCADE_COUNT: usize = 3;

/// Attenuation radius for a point light of the given intensity.
///
/// `radius = sqrt(intensity * 256 / 5)`, clamped so a zero-intensity light
/// still has a valid (tiny) shadow volume. Monotonically increasing in
/// intensity; recomputed every scene update, independent of dirty marks.
#[must_use]
pub fn point_light_radius(intensity: f32) -> f32 {
    (intensity.max(0.0) / ATTENUATION_CUTOFF).sqrt().max(RADIUS_EPSILON)
}

#[derive(Debug, Clone)]
pub struct ShadowConfig {
    pub bias: f32,
    pub normal_bias: f32,
    pub map_size: u32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            bias: 0.005,
            normal_bias: 0.02,
            map_size: 1024,
        }
    }
}

/// Omnidirectional light component.
///
/// Shadowed through a 6-face cube map; one view-projection per face, all
/// sharing a 90° perspective projection with far = `radius`.
#[derive(Debug, Clone)]
pub struct PointLight {
    pub color: Vec3,
    pub intensity: f32,
    pub cast_shadows: bool,
    pub shadow: ShadowConfig,

    /// Attenuation cutoff derived from intensity (see [`point_light_radius`]).
    pub(crate) radius: f32,
    /// Per-face light-space matrices, written by the shadow pipeline.
    pub(crate) face_matrices: SmallVec<[Mat4; 6]>,
    /// Cube shadow map handle, allocated on first shadow render.
    pub(crate) shadow_map: Option<TextureKey>,
}

impl PointLight {
    #[must_use]
    pub fn new(color: Vec3, intensity: f32) -> Self {
        Self {
            color,
            intensity,
            cast_shadows: true,
            shadow: ShadowConfig::default(),
            radius: point_light_radius(intensity),
            face_matrices: SmallVec::new(),
            shadow_map: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Re-derives the attenuation radius from the current intensity.
    pub fn sync_radius(&mut self) {
        self.radius = point_light_radius(self.intensity);
    }
}

/// Sun-style light component, shadowed with cascaded shadow maps.
///
/// The light direction is the entity's world -Z axis; cascade matrices and
/// split depths are written by the shadow pipeline and consumed by the
/// deferred lighting pass.
#[derive(Debug, Clone)]
pub struct DirectionalLight {
    pub color: Vec3,
    pub intensity: f32,
    pub cast_shadows: bool,
    pub shadow: ShadowConfig,

    /// Light-space view-projection matrix per cascade.
    pub(crate) cascade_matrices: [Mat4; CASCADE_COUNT],
    /// Camera-clip-space depth of each cascade's far boundary; the lighting
    /// shader selects a cascade per-pixel by comparing fragment depth.
    pub(crate) cascade_end_clip_space: [f32; CASCADE_COUNT],
    /// Shadow map texture-array handle (one layer per cascade).
    pub(crate) shadow_map: Option<TextureKey>,
}

impl DirectionalLight {
    #[must_use]
    pub fn new(color: Vec3, intensity: f32) -> Self {
        Self {
            color,
            intensity,
            cast_shadows: true,
            shadow: ShadowConfig::default(),
            cascade_matrices: [Mat4::IDENTITY; CASCADE_COUNT],
            cascade_end_clip_space: [0.0; CASCADE_COUNT],
            shadow_map: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn cascade_matrices(&self) -> &[Mat4; CASCADE_COUNT] {
        &self.cascade_matrices
    }

    #[inline]
    #[must_use]
    pub fn cascade_end_clip_space(&self) -> &[f32; CASCADE_COUNT] {
        &self.cascade_end_clip_space
    }
}
