/// Owned GPU handles plus the formats every pass agrees on.
///
/// Constructed once by the host application and passed by reference into the
/// renderer — no process-wide globals.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    /// Backbuffer format the post-process pass writes to.
    pub surface_format: wgpu::TextureFormat,
    /// Scene depth format shared by the G-buffer and skybox passes.
    pub depth_format: wgpu::TextureFormat,
    /// Shadow map depth format (directional arrays and point cubes).
    pub shadow_format: wgpu::TextureFormat,
}

impl GpuContext {
    #[must_use]
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            device,
            queue,
            surface_format,
            depth_format: wgpu::TextureFormat::Depth32Float,
            shadow_format: wgpu::TextureFormat::Depth32Float,
        }
    }
}
