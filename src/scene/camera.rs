use glam::Mat4;

use crate::controls::CameraController;
use crate::math::Frustum;

/// Projection strategy.
///
/// Modeled as a closed enum rather than a trait object — the variant set is
/// small and known, and passes match on the kind in a few places.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective {
        /// Vertical field of view in radians
        fov: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    Orthographic {
        /// Half-height of the view volume
        size: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionKind {
    Perspective,
    Orthographic,
}

impl Projection {
    #[must_use]
    pub fn perspective(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self::Perspective {
            fov: fov_degrees.to_radians(),
            aspect,
            near,
            far,
        }
    }

    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        match *self {
            Self::Perspective {
                fov,
                aspect,
                near,
                far,
            } => Mat4::perspective_rh(fov, aspect, near, far),
            Self::Orthographic {
                size,
                aspect,
                near,
                far,
            } => {
                let w = size * aspect;
                Mat4::orthographic_rh(-w, w, -size, size, near, far)
            }
        }
    }

    /// Projection matrix with the depth range overridden, used when fitting
    /// shadow cascades to a slice of the view frustum.
    #[must_use]
    pub fn matrix_with_range(&self, near: f32, far: f32) -> Mat4 {
        match *self {
            Self::Perspective { fov, aspect, .. } => {
                Mat4::perspective_rh(fov, aspect, near, far)
            }
            Self::Orthographic { size, aspect, .. } => {
                let w = size * aspect;
                Mat4::orthographic_rh(-w, w, -size, size, near, far)
            }
        }
    }

    #[must_use]
    pub fn kind(&self) -> ProjectionKind {
        match self {
            Self::Perspective { .. } => ProjectionKind::Perspective,
            Self::Orthographic { .. } => ProjectionKind::Orthographic,
        }
    }

    #[must_use]
    pub fn near(&self) -> f32 {
        match *self {
            Self::Perspective { near, .. } | Self::Orthographic { near, .. } => near,
        }
    }

    #[must_use]
    pub fn far(&self) -> f32 {
        match *self {
            Self::Perspective { far, .. } | Self::Orthographic { far, .. } => far,
        }
    }

    pub fn set_aspect(&mut self, new_aspect: f32) {
        match self {
            Self::Perspective { aspect, .. } | Self::Orthographic { aspect, .. } => {
                *aspect = new_aspect;
            }
        }
    }
}

/// Camera component.
///
/// The view matrix is always the inverse of the owning entity's world
/// transform; the renderer refreshes it after hierarchy resolution, before
/// any pass consumes it.
#[derive(Debug, Clone)]
pub struct Camera {
    pub projection: Projection,
    pub controller: CameraController,
    /// Whether the controller receives input this frame. The *caller* checks
    /// this (GUI capture, gizmo drag); the controller itself never does.
    pub active: bool,

    pub(crate) view: Mat4,
    pub(crate) view_projection: Mat4,
    pub(crate) frustum: Frustum,
    // Shadow copy for edit detection, like Transform::last_world
    last_projection: Projection,
}

impl Camera {
    #[must_use]
    pub fn new(projection: Projection, controller: CameraController) -> Self {
        let mut camera = Self {
            projection,
            controller,
            active: true,
            view: Mat4::IDENTITY,
            view_projection: Mat4::IDENTITY,
            frustum: Frustum::default(),
            last_projection: projection,
        };
        camera.update_view(&Mat4::IDENTITY);
        camera
    }

    /// Whether `projection` was mutated since the last check (aspect change
    /// on resize, fov or range edits). Clears on read; the renderer turns a
    /// `true` into a camera dirty mark so directional cascades refit.
    pub fn projection_edited(&mut self) -> bool {
        if self.projection == self.last_projection {
            return false;
        }
        self.last_projection = self.projection;
        true
    }

    /// Re-derives view, view-projection and the culling frustum from the
    /// entity's world transform.
    pub fn update_view(&mut self, world: &Mat4) {
        self.view = world.inverse();
        self.view_projection = self.projection.matrix() * self.view;
        self.frustum = Frustum::from_matrix(self.view_projection);
    }

    #[inline]
    #[must_use]
    pub fn view(&self) -> Mat4 {
        self.view
    }

    #[inline]
    #[must_use]
    pub fn view_projection(&self) -> Mat4 {
        self.view_projection
    }

    #[inline]
    #[must_use]
    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }
}
