//! Skybox pass: draws a unit cube with the camera's translation stripped
//! from the view, depth-tested LessEqual against the scene depth (no depth
//! writes) so it fills exactly the pixels no geometry covered.

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4};

use crate::render::context::GpuContext;
use crate::render::primitives::VERTEX_LAYOUT;
use crate::render::resources::ResourceStore;
use crate::render::shaders::{SKYBOX_SHADER, ShaderSet};
use crate::render::targets::{GBufferTargets, LIGHTING_FORMAT};
use crate::render::uniforms::SingleUniformBuffer;
use crate::scene::Camera;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct SkyboxUniforms {
    /// projection * rotation-only view
    view_proj: Mat4,
}

pub struct SkyboxPass {
    pipeline: Option<wgpu::RenderPipeline>,
    built_version: u64,
    uniforms: SingleUniformBuffer<SkyboxUniforms>,
    sky_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
}

impl SkyboxPass {
    #[must_use]
    pub fn new(ctx: &GpuContext) -> Self {
        let sky_layout = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Skybox"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::Cube,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });
        let sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Skybox Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            pipeline: None,
            built_version: 0,
            uniforms: SingleUniformBuffer::new(ctx, "Skybox", wgpu::ShaderStages::VERTEX),
            sky_layout,
            sampler,
        }
    }

    pub fn run(
        &mut self,
        ctx: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        resources: &ResourceStore,
        shaders: &ShaderSet,
        camera: &Camera,
        gbuffer: &GBufferTargets,
        lighting_view: &wgpu::TextureView,
    ) {
        if !self.ensure_pipeline(ctx, shaders) {
            return;
        }

        // Strip the translation so the box is always centered on the eye
        let rotation_only = Mat4::from_mat3(Mat3::from_mat4(camera.view()));
        self.uniforms.write(
            ctx,
            &SkyboxUniforms {
                view_proj: camera.projection.matrix() * rotation_only,
            },
        );

        let sky_bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Skybox"),
            layout: &self.sky_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&resources.skybox_cubemap().view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        let cube = resources.mesh_or_placeholder(resources.unit_cube());

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Skybox Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: lighting_view,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            // Scene depth from the geometry pass, loaded rather than cleared
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &gbuffer.depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        let Some(pipeline) = self.pipeline.as_ref() else {
            return;
        };
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, self.uniforms.bind_group(), &[]);
        pass.set_bind_group(1, &sky_bind_group, &[]);
        pass.set_vertex_buffer(0, cube.vertex_buffer.slice(..));
        pass.set_index_buffer(cube.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..cube.index_count, 0, 0..1);
    }

    fn ensure_pipeline(&mut self, ctx: &GpuContext, shaders: &ShaderSet) -> bool {
        let version = shaders.version(SKYBOX_SHADER);
        if self.pipeline.is_some() && self.built_version == version {
            return true;
        }
        let module = match shaders.create_module(&ctx.device, SKYBOX_SHADER) {
            Ok(module) => module,
            Err(err) => {
                log::error!("Skybox pipeline unavailable: {err}");
                return self.pipeline.is_some();
            }
        };

        let layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Skybox"),
                bind_group_layouts: &[Some(self.uniforms.layout()), Some(&self.sky_layout)],
                immediate_size: 0,
            });

        self.pipeline = Some(ctx.device.create_render_pipeline(
            &wgpu::RenderPipelineDescriptor {
                label: Some("Skybox"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &module,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[VERTEX_LAYOUT],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &module,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(LIGHTING_FORMAT.into())],
                }),
                primitive: wgpu::PrimitiveState {
                    // Viewed from inside the cube
                    cull_mode: Some(wgpu::Face::Front),
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: ctx.depth_format,
                    depth_write_enabled: Some(false),
                    depth_compare: Some(wgpu::CompareFunction::LessEqual),
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            },
        ));
        self.built_version = version;
        true
    }
}
