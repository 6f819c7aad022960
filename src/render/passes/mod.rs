pub mod geometry;
pub mod lighting;
pub mod post;
pub mod skybox;

pub use geometry::GeometryPass;
pub use lighting::{AmbientSettings, LightingPass};
pub use post::PostProcessPass;
pub use skybox::SkyboxPass;

bitflags::bitflags! {
    /// Frame attachments a pass reads or writes. The renderer checks the
    /// declared sets against its fixed pass order in debug builds; a pass
    /// reading an attachment nothing wrote yet is a sequencing bug.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Attachments: u32 {
        const SHADOW_MAPS = 1 << 0;
        const GBUFFER     = 1 << 1;
        const SCENE_DEPTH = 1 << 2;
        const LIGHTING    = 1 << 3;
        const BACKBUFFER  = 1 << 4;
    }
}

impl GeometryPass {
    pub const READS: Attachments = Attachments::empty();
    pub const WRITES: Attachments = Attachments::GBUFFER.union(Attachments::SCENE_DEPTH);
}

impl LightingPass {
    pub const READS: Attachments = Attachments::GBUFFER.union(Attachments::SHADOW_MAPS);
    pub const WRITES: Attachments = Attachments::LIGHTING;
}

impl SkyboxPass {
    pub const READS: Attachments = Attachments::SCENE_DEPTH;
    pub const WRITES: Attachments = Attachments::LIGHTING;
}

impl PostProcessPass {
    pub const READS: Attachments = Attachments::LIGHTING;
    pub const WRITES: Attachments = Attachments::BACKBUFFER;
}
