pub mod context;
pub mod passes;
pub mod primitives;
pub mod renderer;
pub mod resources;
pub mod shaders;
pub mod shadow;
pub mod targets;
pub mod uniforms;
pub mod visibility;

pub use context::GpuContext;
pub use renderer::DeferredRenderer;
pub use resources::{GpuMesh, GpuTexture, MeshKey, ResourceStore, TextureKey};
pub use shaders::ShaderSet;
pub use shadow::ShadowPipeline;
pub use targets::{RenderTargetSet, TargetState};
pub use visibility::{VisibleObject, collect_shadow_casters, collect_visible};
