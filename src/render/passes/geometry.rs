//! G-buffer fill pass: rasterizes the frustum-culled renderable set into
//! world position, normal, albedo and material parameter targets plus scene
//! depth. A fully culled scene encodes a clear and zero draw calls.

use rustc_hash::FxHashMap;

use crate::render::context::GpuContext;
use crate::render::primitives::VERTEX_LAYOUT;
use crate::render::resources::{ResourceStore, TextureKey};
use crate::render::shaders::{GEOMETRY_SHADER, ShaderSet};
use crate::render::targets::{
    GBUFFER_ALBEDO_FORMAT, GBUFFER_MATERIAL_FORMAT, GBUFFER_NORMAL_FORMAT,
    GBUFFER_POSITION_FORMAT, GBufferTargets,
};
use crate::render::uniforms::{DynamicUniformBuffer, ObjectUniforms};
use crate::render::visibility::VisibleObject;
use crate::scene::EntityStore;

pub struct GeometryPass {
    /// (back-culled, double-sided) pipeline pair from the same shader
    pipelines: Option<(wgpu::RenderPipeline, wgpu::RenderPipeline)>,
    built_version: u64,
    objects: DynamicUniformBuffer<ObjectUniforms>,
    material_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    material_bind_groups: FxHashMap<TextureKey, wgpu::BindGroup>,
    draw_count: u32,
}

impl GeometryPass {
    #[must_use]
    pub fn new(ctx: &GpuContext) -> Self {
        let material_layout =
            ctx.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Geometry Material"),
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
            label: Some("Albedo Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Linear,
            ..Default::default()
        });

        Self {
            pipelines: None,
            built_version: 0,
            objects: DynamicUniformBuffer::new(
                ctx,
                "Geometry Objects",
                wgpu::ShaderStages::VERTEX,
                64,
            ),
            material_layout,
            sampler,
            material_bind_groups: FxHashMap::default(),
            draw_count: 0,
        }
    }

    /// Draw calls issued by the most recent `run`.
    #[inline]
    #[must_use]
    pub fn draw_count(&self) -> u32 {
        self.draw_count
    }

    pub fn run(
        &mut self,
        ctx: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        store: &EntityStore,
        resources: &ResourceStore,
        shaders: &ShaderSet,
        camera_layout: &wgpu::BindGroupLayout,
        camera_bind_group: &wgpu::BindGroup,
        gbuffer: &GBufferTargets,
        visible: &[VisibleObject],
    ) {
        self.draw_count = 0;
        if !self.ensure_pipelines(ctx, shaders, camera_layout) {
            return;
        }

        // Uniform upload and bind group creation happen before the pass so
        // the encoder never sees a half-grown buffer.
        let object_uniforms: Vec<ObjectUniforms> = visible
            .iter()
            .map(|object| {
                let material = store
                    .materials
                    .get(object.entity)
                    .cloned()
                    .unwrap_or_default();
                let has_texture = material.albedo_texture.is_some();
                ObjectUniforms {
                    model: object.model,
                    color: material.color,
                    params: glam::Vec4::new(
                        material.roughness,
                        material.metalness,
                        material.ambient_occlusion,
                        if has_texture { 1.0 } else { 0.0 },
                    ),
                }
            })
            .collect();
        self.objects.write_all(ctx, &object_uniforms);

        for object in visible {
            if let Some(material) = store.materials.get(object.entity) {
                self.ensure_material_bind_group(ctx, resources, material.albedo_texture);
            }
        }

        let color_attachment = |view| {
            Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Geometry Pass"),
            color_attachments: &[
                color_attachment(&gbuffer.position),
                color_attachment(&gbuffer.normal),
                color_attachment(&gbuffer.albedo),
                color_attachment(&gbuffer.material),
            ],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &gbuffer.depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        let Some((culled, double_sided)) = self.pipelines.as_ref() else {
            return;
        };
        pass.set_bind_group(0, camera_bind_group, &[]);

        let mut draws = 0u32;
        for (index, object) in visible.iter().enumerate() {
            let Some(mesh_component) = store.meshes.get(object.entity) else {
                continue;
            };
            let material = store
                .materials
                .get(object.entity)
                .cloned()
                .unwrap_or_default();
            let mesh = resources.mesh_or_placeholder(mesh_component.mesh);

            let texture_key = material
                .albedo_texture
                .filter(|key| resources.texture(*key).is_some())
                .unwrap_or_else(|| resources.placeholder_texture_key());
            let Some(material_bind_group) = self.material_bind_groups.get(&texture_key) else {
                continue;
            };

            pass.set_pipeline(if material.double_sided { double_sided } else { culled });
            pass.set_bind_group(1, self.objects.bind_group(), &[self.objects.offset(index as u32)]);
            pass.set_bind_group(2, material_bind_group, &[]);
            pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            draws += 1;
        }
        drop(pass);
        self.draw_count = draws;
    }

    fn ensure_material_bind_group(
        &mut self,
        ctx: &GpuContext,
        resources: &ResourceStore,
        albedo: Option<TextureKey>,
    ) {
        let key = albedo
            .filter(|key| resources.texture(*key).is_some())
            .unwrap_or_else(|| resources.placeholder_texture_key());
        if self.material_bind_groups.contains_key(&key) {
            return;
        }
        let texture = resources.texture_or_placeholder(Some(key));
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Geometry Material"),
            layout: &self.material_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });
        self.material_bind_groups.insert(key, bind_group);
    }

    fn ensure_pipelines(
        &mut self,
        ctx: &GpuContext,
        shaders: &ShaderSet,
        camera_layout: &wgpu::BindGroupLayout,
    ) -> bool {
        let version = shaders.version(GEOMETRY_SHADER);
        if self.pipelines.is_some() && self.built_version == version {
            return true;
        }
        let module = match shaders.create_module(&ctx.device, GEOMETRY_SHADER) {
            Ok(module) => module,
            Err(err) => {
                log::error!("Geometry pipeline unavailable: {err}");
                return self.pipelines.is_some();
            }
        };

        let layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Geometry"),
                bind_group_layouts: &[
                    Some(camera_layout),
                    Some(self.objects.layout()),
                    Some(&self.material_layout),
                ],
                immediate_size: 0,
            });

        let targets = [
            Some(GBUFFER_POSITION_FORMAT.into()),
            Some(GBUFFER_NORMAL_FORMAT.into()),
            Some(GBUFFER_ALBEDO_FORMAT.into()),
            Some(GBUFFER_MATERIAL_FORMAT.into()),
        ];

        let build = |cull_mode: Option<wgpu::Face>| {
            ctx.device
                .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some("Geometry"),
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
                        targets: &targets,
                    }),
                    primitive: wgpu::PrimitiveState {
                        cull_mode,
                        ..Default::default()
                    },
                    depth_stencil: Some(wgpu::DepthStencilState {
                        format: ctx.depth_format,
                        depth_write_enabled: Some(true),
                        depth_compare: Some(wgpu::CompareFunction::Less),
                        stencil: wgpu::StencilState::default(),
                        bias: wgpu::DepthBiasState::default(),
                    }),
                    multisample: wgpu::MultisampleState::default(),
                    multiview_mask: None,
                    cache: None,
                })
        };

        self.pipelines = Some((build(Some(wgpu::Face::Back)), build(None)));
        self.built_version = version;
        true
    }
}
