//! Post-process pass: resolves the HDR lighting target to the backbuffer
//! with a fullscreen triangle, Reinhard tonemapping on the way through.

use crate::render::context::GpuContext;
use crate::render::shaders::{POST_SHADER, ShaderSet};
use crate::render::uniforms::SingleUniformBuffer;
use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct PostUniforms {
    /// x = exposure, yzw reserved
    params: [f32; 4],
}

pub struct PostProcessPass {
    pipeline: Option<wgpu::RenderPipeline>,
    built_version: u64,
    input_layout: wgpu::BindGroupLayout,
    input_bind_group: Option<wgpu::BindGroup>,
    input_generation: u64,
    sampler: wgpu::Sampler,
    uniforms: SingleUniformBuffer<PostUniforms>,
    pub exposure: f32,
}

impl PostProcessPass {
    #[must_use]
    pub fn new(ctx: &GpuContext) -> Self {
        let input_layout = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Post Input"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
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
            label: Some("Post Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            pipeline: None,
            built_version: 0,
            input_layout,
            input_bind_group: None,
            input_generation: 0,
            sampler,
            uniforms: SingleUniformBuffer::new(ctx, "Post", wgpu::ShaderStages::FRAGMENT),
            exposure: 1.0,
        }
    }

    pub fn run(
        &mut self,
        ctx: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        shaders: &ShaderSet,
        lighting_view: &wgpu::TextureView,
        target_generation: u64,
        surface_view: &wgpu::TextureView,
    ) {
        if !self.ensure_pipeline(ctx, shaders) {
            return;
        }

        if self.input_bind_group.is_none() || self.input_generation != target_generation {
            self.input_bind_group = Some(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Post Input"),
                layout: &self.input_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(lighting_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                ],
            }));
            self.input_generation = target_generation;
        }

        self.uniforms.write(
            ctx,
            &PostUniforms {
                params: [self.exposure, 0.0, 0.0, 0.0],
            },
        );

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Post Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: surface_view,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        let (Some(pipeline), Some(input)) = (self.pipeline.as_ref(), self.input_bind_group.as_ref())
        else {
            return;
        };
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, input, &[]);
        pass.set_bind_group(1, self.uniforms.bind_group(), &[]);
        pass.draw(0..3, 0..1);
    }

    fn ensure_pipeline(&mut self, ctx: &GpuContext, shaders: &ShaderSet) -> bool {
        let version = shaders.version(POST_SHADER);
        if self.pipeline.is_some() && self.built_version == version {
            return true;
        }
        let module = match shaders.create_module(&ctx.device, POST_SHADER) {
            Ok(module) => module,
            Err(err) => {
                log::error!("Post pipeline unavailable: {err}");
                return self.pipeline.is_some();
            }
        };

        let layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Post"),
                bind_group_layouts: &[Some(&self.input_layout), Some(self.uniforms.layout())],
                immediate_size: 0,
            });

        self.pipeline = Some(ctx.device.create_render_pipeline(
            &wgpu::RenderPipelineDescriptor {
                label: Some("Post"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &module,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &module,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(ctx.surface_format.into())],
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            },
        ));
        self.built_version = version;
        true
    }
}
