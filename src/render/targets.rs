//! Render Target Set
//!
//! All screen-sized attachments live here, behind an explicit two-state
//! lifecycle: `Uninitialized` until the first resize, then `Sized`. Resizing
//! recreates every attachment synchronously; passes never hold views across a
//! resize.

use crate::render::context::GpuContext;

pub const GBUFFER_POSITION_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const GBUFFER_NORMAL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const GBUFFER_ALBEDO_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
pub const GBUFFER_MATERIAL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
pub const LIGHTING_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    Uninitialized,
    Sized { width: u32, height: u32 },
}

/// Geometry pass outputs consumed by the lighting pass.
pub struct GBufferTargets {
    pub position: wgpu::TextureView,
    pub normal: wgpu::TextureView,
    pub albedo: wgpu::TextureView,
    pub material: wgpu::TextureView,
    /// Scene depth, written by the geometry pass and re-attached with
    /// `LoadOp::Load` by the skybox pass.
    pub depth: wgpu::TextureView,
}

pub struct RenderTargetSet {
    state: TargetState,
    gbuffer: Option<GBufferTargets>,
    /// HDR accumulation target the lighting and skybox passes write to and
    /// the post-process pass reads from.
    lighting: Option<wgpu::TextureView>,
    /// Bumped on every recreation; passes caching bind groups on these views
    /// compare it to know when their cache is stale.
    generation: u64,
}

impl RenderTargetSet {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: TargetState::Uninitialized,
            gbuffer: None,
            lighting: None,
            generation: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> TargetState {
        self.state
    }

    #[must_use]
    pub fn size(&self) -> Option<(u32, u32)> {
        match self.state {
            TargetState::Uninitialized => None,
            TargetState::Sized { width, height } => Some((width, height)),
        }
    }

    #[must_use]
    pub fn gbuffer(&self) -> Option<&GBufferTargets> {
        self.gbuffer.as_ref()
    }

    #[must_use]
    pub fn lighting(&self) -> Option<&wgpu::TextureView> {
        self.lighting.as_ref()
    }

    /// Recreates every attachment at the new size. Zero dimensions are
    /// clamped to 1 so a minimized window cannot produce invalid textures.
    pub fn resize(&mut self, ctx: &GpuContext, width: u32, height: u32) {
        let width = width.max(1);
        let height = height.max(1);
        if self.state == (TargetState::Sized { width, height }) {
            return;
        }

        log::debug!("Recreating render targets at {width}x{height}");

        self.gbuffer = Some(GBufferTargets {
            position: create_target(ctx, "G-Buffer Position", width, height, GBUFFER_POSITION_FORMAT),
            normal: create_target(ctx, "G-Buffer Normal", width, height, GBUFFER_NORMAL_FORMAT),
            albedo: create_target(ctx, "G-Buffer Albedo", width, height, GBUFFER_ALBEDO_FORMAT),
            material: create_target(ctx, "G-Buffer Material", width, height, GBUFFER_MATERIAL_FORMAT),
            depth: create_target(ctx, "Scene Depth", width, height, ctx.depth_format),
        });
        self.lighting = Some(create_target(ctx, "Lighting HDR", width, height, LIGHTING_FORMAT));
        self.state = TargetState::Sized { width, height };
        self.generation += 1;
    }
}

impl Default for RenderTargetSet {
    fn default() -> Self {
        Self::new()
    }
}

fn create_target(
    ctx: &GpuContext,
    label: &str,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
) -> wgpu::TextureView {
    let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
