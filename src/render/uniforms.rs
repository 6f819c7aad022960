//! Uniform block layouts shared by the passes, plus a growable
//! dynamic-offset uniform buffer so per-object and per-light data is one
//! buffer write and one bind group per frame instead of one bind group per
//! draw.

use std::marker::PhantomData;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};

use crate::render::context::GpuContext;
use crate::scene::CASCADE_COUNT;

// ============================================================================
// Uniform block layouts (must match the WGSL structs)
// ============================================================================

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniforms {
    pub view_proj: Mat4,
    /// xyz = world-space camera position
    pub position: Vec4,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ObjectUniforms {
    pub model: Mat4,
    pub color: Vec4,
    /// x = roughness, y = metalness, z = ambient occlusion, w = use albedo
    /// texture (1.0) or flat color (0.0)
    pub params: Vec4,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ShadowObjectUniforms {
    pub model: Mat4,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LightViewProjUniforms {
    pub view_proj: Mat4,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct AmbientUniforms {
    /// rgb = ambient color * intensity
    pub color: Vec4,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct DirectionalUniforms {
    /// World-to-shadow-uv matrix per cascade (bias already applied)
    pub cascade_matrices: [Mat4; CASCADE_COUNT],
    /// xyz = clip-space far boundary per cascade, w = shadows enabled
    pub cascade_ends: Vec4,
    /// xyz = direction the light travels, w = depth bias
    pub direction: Vec4,
    /// rgb = color * intensity, w = normal bias
    pub color: Vec4,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct PointUniforms {
    /// Proxy sphere transform: translation to the light, scale = radius
    pub model: Mat4,
    /// xyz = light position, w = attenuation radius
    pub position_radius: Vec4,
    /// rgb = color * intensity, w = depth bias
    pub color: Vec4,
    /// x = shadows enabled, y = cube near plane, z = cube far plane
    pub params: Vec4,
}

// ============================================================================
// Single-block uniform buffer
// ============================================================================

/// One uniform block of `T` with its own layout and bind group, rewritten
/// each frame.
pub struct SingleUniformBuffer<T> {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    layout: wgpu::BindGroupLayout,
    _marker: PhantomData<T>,
}

impl<T: Pod> SingleUniformBuffer<T> {
    #[must_use]
    pub fn new(ctx: &GpuContext, label: &'static str, visibility: wgpu::ShaderStages) -> Self {
        let size = std::mem::size_of::<T>() as u64;
        let layout = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(size),
                    },
                    count: None,
                }],
            });
        let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Self {
            buffer,
            bind_group,
            layout,
            _marker: PhantomData,
        }
    }

    #[inline]
    #[must_use]
    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    #[inline]
    #[must_use]
    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub fn write(&self, ctx: &GpuContext, value: &T) {
        ctx.queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(value));
    }
}

// ============================================================================
// Growable dynamic-offset uniform buffer
// ============================================================================

/// One uniform buffer holding `capacity` elements of `T` at the device's
/// dynamic-offset alignment, rebound on growth.
pub struct DynamicUniformBuffer<T> {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    layout: wgpu::BindGroupLayout,
    capacity: u32,
    stride: u32,
    label: &'static str,
    _marker: PhantomData<T>,
}

impl<T: Pod> DynamicUniformBuffer<T> {
    #[must_use]
    pub fn new(
        ctx: &GpuContext,
        label: &'static str,
        visibility: wgpu::ShaderStages,
        initial_capacity: u32,
    ) -> Self {
        let alignment = ctx.device.limits().min_uniform_buffer_offset_alignment;
        let size = std::mem::size_of::<T>() as u32;
        let stride = size.div_ceil(alignment) * alignment;

        let layout = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: wgpu::BufferSize::new(u64::from(size)),
                    },
                    count: None,
                }],
            });

        let capacity = initial_capacity.max(1);
        let (buffer, bind_group) = Self::create(ctx, &layout, label, stride, capacity);

        Self {
            buffer,
            bind_group,
            layout,
            capacity,
            stride,
            label,
            _marker: PhantomData,
        }
    }

    fn create(
        ctx: &GpuContext,
        layout: &wgpu::BindGroupLayout,
        label: &str,
        stride: u32,
        capacity: u32,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: u64::from(stride) * u64::from(capacity),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(u64::from(std::mem::size_of::<T>() as u32)),
                }),
            }],
        });
        (buffer, bind_group)
    }

    #[inline]
    #[must_use]
    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    #[inline]
    #[must_use]
    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    /// Dynamic offset of element `index`.
    #[inline]
    #[must_use]
    pub fn offset(&self, index: u32) -> u32 {
        index * self.stride
    }

    /// Grows the buffer (doubling) until `count` elements fit. Must not run
    /// between uniform upload and command submission.
    pub fn ensure_capacity(&mut self, ctx: &GpuContext, count: u32) {
        if count <= self.capacity {
            return;
        }
        let mut capacity = self.capacity.max(1);
        while capacity < count {
            capacity *= 2;
        }
        let (buffer, bind_group) = Self::create(ctx, &self.layout, self.label, self.stride, capacity);
        self.buffer = buffer;
        self.bind_group = bind_group;
        self.capacity = capacity;
    }

    /// Uploads `values` to elements `[0, len)`, growing first if needed.
    pub fn write_all(&mut self, ctx: &GpuContext, values: &[T]) {
        if values.is_empty() {
            return;
        }
        self.ensure_capacity(ctx, values.len() as u32);

        let mut staging = vec![0u8; self.stride as usize * values.len()];
        for (i, value) in values.iter().enumerate() {
            let start = i * self.stride as usize;
            let bytes = bytemuck::bytes_of(value);
            staging[start..start + bytes.len()].copy_from_slice(bytes);
        }
        ctx.queue.write_buffer(&self.buffer, 0, &staging);
    }
}
