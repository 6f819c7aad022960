use glam::Mat4;

use crate::scene::Entity;

/// World-space transform component.
///
/// # Invariant
///
/// After a [`HierarchyResolver`](crate::scene::HierarchyResolver) pass
/// completes, `world` always holds the entity's position in world space —
/// never a mid-pass intermediate. The editor (or any caller) may write
/// `world` directly between passes; the resolver interprets that edit as a
/// local-space delta and carries it through recomposition.
///
/// The private `last_world` shadow copy is how the resolver detects direct
/// edits: if `world` differs from what the previous pass produced, the entity
/// (and its subtree) must be recomposed. Unchanged subtrees are skipped
/// entirely, which keeps repeated resolves of a static scene bit-identical.
#[derive(Debug, Clone)]
pub struct Transform {
    pub world: Mat4,

    // Shadow state for edit detection (resolver-owned)
    pub(crate) last_world: Mat4,
    pub(crate) force_update: bool,
}

impl Transform {
    #[must_use]
    pub fn new() -> Self {
        Self::from_world(Mat4::IDENTITY)
    }

    #[must_use]
    pub fn from_world(world: Mat4) -> Self {
        Self {
            world,
            last_world: world,
            force_update: true,
        }
    }

    /// Whether `world` was written since the last resolve pass.
    #[inline]
    #[must_use]
    pub(crate) fn edited(&self) -> bool {
        self.force_update || self.world != self.last_world
    }

    /// Called by the resolver once the entity's world matrix is final for
    /// this pass.
    #[inline]
    pub(crate) fn settle(&mut self) {
        self.last_world = self.world;
        self.force_update = false;
    }

    /// Forces recomposition on the next resolve pass even if `world` is
    /// unchanged (used after attach/detach).
    #[inline]
    pub fn mark_dirty(&mut self) {
        self.force_update = true;
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

/// Parent link component.
///
/// # Invariant
///
/// `inverse_parent == inverse(parent world matrix)` as of the end of the last
/// resolve pass. The resolver uses it to recover the entity's *local*
/// transform (`inverse_parent * world`) before re-deriving the world matrix
/// from a possibly updated parent. Root entities (and entities whose parent
/// handle went stale) hold the identity.
#[derive(Debug, Clone)]
pub struct Hierarchy {
    pub parent: Option<Entity>,
    pub inverse_parent: Mat4,
}

impl Hierarchy {
    #[must_use]
    pub fn root() -> Self {
        Self {
            parent: None,
            inverse_parent: Mat4::IDENTITY,
        }
    }

    #[must_use]
    pub fn with_parent(parent: Entity) -> Self {
        Self {
            parent: Some(parent),
            inverse_parent: Mat4::IDENTITY,
        }
    }
}

impl Default for Hierarchy {
    fn default() -> Self {
        Self::root()
    }
}
