//! Deferred lighting pass: reads the G-buffer and accumulates light
//! contributions additively into the HDR target. Three sub-draws share the
//! pass: a fullscreen ambient term (sky-tinted), one fullscreen draw per
//! directional light with cascade selection, and one unit-sphere proxy draw
//! per point light that survives a sphere-vs-frustum pre-test.

use glam::{Mat4, Vec3, Vec4};
use rustc_hash::FxHashMap;

use crate::render::context::GpuContext;
use crate::render::primitives::VERTEX_LAYOUT;
use crate::render::resources::{ResourceStore, TextureKey};
use crate::render::shaders::{
    DEFERRED_AMBIENT_SHADER, DEFERRED_DIRECTIONAL_SHADER, DEFERRED_POINT_SHADER, ShaderSet,
};
use crate::render::shadow::cascade::POINT_NEAR;
use crate::render::targets::{GBufferTargets, LIGHTING_FORMAT};
use crate::render::uniforms::{
    AmbientUniforms, DirectionalUniforms, DynamicUniformBuffer, PointUniforms,
    SingleUniformBuffer,
};
use crate::scene::{CASCADE_COUNT, Camera, EntityStore};

/// Ambient term applied to every lit pixel.
#[derive(Debug, Clone, Copy)]
pub struct AmbientSettings {
    pub color: Vec3,
    pub intensity: f32,
}

impl Default for AmbientSettings {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            intensity: 0.03,
        }
    }
}

/// Maps clip space xy in [-1, 1] / z in [0, 1] to shadow uv space.
const SHADOW_UV_BIAS: Mat4 = Mat4::from_cols(
    Vec4::new(0.5, 0.0, 0.0, 0.0),
    Vec4::new(0.0, -0.5, 0.0, 0.0),
    Vec4::new(0.0, 0.0, 1.0, 0.0),
    Vec4::new(0.5, 0.5, 0.0, 1.0),
);

pub struct LightingPass {
    ambient_pipeline: Option<wgpu::RenderPipeline>,
    directional_pipeline: Option<wgpu::RenderPipeline>,
    point_pipeline: Option<wgpu::RenderPipeline>,
    built_versions: [u64; 3],

    gbuffer_layout: wgpu::BindGroupLayout,
    gbuffer_bind_group: Option<wgpu::BindGroup>,
    gbuffer_generation: u64,

    sky_layout: wgpu::BindGroupLayout,
    sky_sampler: wgpu::Sampler,

    shadow_sampler: wgpu::Sampler,
    directional_shadow_layout: wgpu::BindGroupLayout,
    point_shadow_layout: wgpu::BindGroupLayout,
    directional_shadow_groups: FxHashMap<TextureKey, wgpu::BindGroup>,
    point_shadow_groups: FxHashMap<TextureKey, wgpu::BindGroup>,
    fallback_directional_map: wgpu::TextureView,
    fallback_point_map: wgpu::TextureView,
    fallback_directional_group: Option<wgpu::BindGroup>,
    fallback_point_group: Option<wgpu::BindGroup>,

    ambient_uniforms: SingleUniformBuffer<AmbientUniforms>,
    directional_uniforms: DynamicUniformBuffer<DirectionalUniforms>,
    point_uniforms: DynamicUniformBuffer<PointUniforms>,

    pub ambient: AmbientSettings,
}

impl LightingPass {
    #[must_use]
    pub fn new(ctx: &GpuContext) -> Self {
        let gbuffer_layout = create_gbuffer_layout(ctx);

        let sky_layout = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Lighting Sky"),
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
        let sky_sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Sky Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let shadow_sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Sampler"),
            compare: Some(wgpu::CompareFunction::LessEqual),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let directional_shadow_layout =
            create_shadow_layout(ctx, wgpu::TextureViewDimension::D2Array, "Directional Shadow");
        let point_shadow_layout =
            create_shadow_layout(ctx, wgpu::TextureViewDimension::Cube, "Point Shadow");

        let fallback_directional_map = create_fallback_depth(
            ctx,
            CASCADE_COUNT as u32,
            wgpu::TextureViewDimension::D2Array,
        );
        let fallback_point_map = create_fallback_depth(ctx, 6, wgpu::TextureViewDimension::Cube);

        let mut pass = Self {
            ambient_pipeline: None,
            directional_pipeline: None,
            point_pipeline: None,
            built_versions: [0; 3],
            gbuffer_layout,
            gbuffer_bind_group: None,
            gbuffer_generation: 0,
            sky_layout,
            sky_sampler,
            shadow_sampler,
            directional_shadow_layout,
            point_shadow_layout,
            directional_shadow_groups: FxHashMap::default(),
            point_shadow_groups: FxHashMap::default(),
            fallback_directional_map,
            fallback_point_map,
            fallback_directional_group: None,
            fallback_point_group: None,
            ambient_uniforms: SingleUniformBuffer::new(
                ctx,
                "Ambient Light",
                wgpu::ShaderStages::FRAGMENT,
            ),
            directional_uniforms: DynamicUniformBuffer::new(
                ctx,
                "Directional Lights",
                wgpu::ShaderStages::FRAGMENT,
                4,
            ),
            point_uniforms: DynamicUniformBuffer::new(
                ctx,
                "Point Lights",
                wgpu::ShaderStages::VERTEX_FRAGMENT,
                16,
            ),
            ambient: AmbientSettings::default(),
        };
        pass.fallback_directional_group = Some(create_shadow_group(
            ctx,
            &pass.directional_shadow_layout,
            &pass.fallback_directional_map,
            &pass.shadow_sampler,
        ));
        pass.fallback_point_group = Some(create_shadow_group(
            ctx,
            &pass.point_shadow_layout,
            &pass.fallback_point_map,
            &pass.shadow_sampler,
        ));
        pass
    }

    pub fn run(
        &mut self,
        ctx: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        store: &EntityStore,
        resources: &ResourceStore,
        shaders: &ShaderSet,
        camera: &Camera,
        camera_layout: &wgpu::BindGroupLayout,
        camera_bind_group: &wgpu::BindGroup,
        gbuffer: &GBufferTargets,
        target_generation: u64,
        lighting_view: &wgpu::TextureView,
    ) {
        if !self.ensure_pipelines(ctx, shaders, camera_layout) {
            return;
        }
        self.ensure_gbuffer_bind_group(ctx, gbuffer, target_generation);

        // ==== Uniform upload (before the pass begins) ====

        self.ambient_uniforms.write(
            ctx,
            &AmbientUniforms {
                color: (self.ambient.color * self.ambient.intensity).extend(0.0),
            },
        );

        let mut directional_lights: Vec<(DirectionalUniforms, Option<TextureKey>)> = Vec::new();
        for (entity, light) in store.directional_lights.iter() {
            let world = store
                .transforms
                .get(entity)
                .map_or(Mat4::IDENTITY, |t| t.world);
            let direction = (-world.z_axis.truncate()).normalize_or(Vec3::NEG_Y);

            let mut cascade_matrices = [Mat4::IDENTITY; CASCADE_COUNT];
            for (i, matrix) in light.cascade_matrices().iter().enumerate() {
                cascade_matrices[i] = SHADOW_UV_BIAS * *matrix;
            }
            let ends = light.cascade_end_clip_space();
            let shadows = light.cast_shadows && light.shadow_map.is_some();
            directional_lights.push((
                DirectionalUniforms {
                    cascade_matrices,
                    cascade_ends: Vec4::new(
                        ends[0],
                        ends[1],
                        ends[2],
                        if shadows { 1.0 } else { 0.0 },
                    ),
                    direction: direction.extend(light.shadow.bias),
                    color: (light.color * light.intensity).extend(light.shadow.normal_bias),
                },
                light.shadow_map,
            ));
        }
        let directional_blocks: Vec<DirectionalUniforms> =
            directional_lights.iter().map(|(u, _)| *u).collect();
        self.directional_uniforms.write_all(ctx, &directional_blocks);

        let mut point_lights: Vec<(PointUniforms, Option<TextureKey>)> = Vec::new();
        for (entity, light) in store.point_lights.iter() {
            let position = store
                .transforms
                .get(entity)
                .map_or(Vec3::ZERO, |t| t.world.w_axis.truncate());
            let radius = light.radius();
            // Pre-test: a sphere outside the camera frustum lights nothing.
            if !camera.frustum().intersects_sphere(position, radius) {
                continue;
            }
            let shadows = light.cast_shadows && light.shadow_map.is_some();
            point_lights.push((
                PointUniforms {
                    model: Mat4::from_translation(position) * Mat4::from_scale(Vec3::splat(radius)),
                    position_radius: position.extend(radius),
                    color: (light.color * light.intensity).extend(light.shadow.bias),
                    params: Vec4::new(
                        if shadows { 1.0 } else { 0.0 },
                        POINT_NEAR,
                        radius.max(POINT_NEAR * 2.0),
                        0.0,
                    ),
                },
                light.shadow_map,
            ));
        }
        let point_blocks: Vec<PointUniforms> = point_lights.iter().map(|(u, _)| *u).collect();
        self.point_uniforms.write_all(ctx, &point_blocks);

        for (_, map) in directional_lights.iter() {
            self.ensure_shadow_group(ctx, resources, *map, true);
        }
        for (_, map) in point_lights.iter() {
            self.ensure_shadow_group(ctx, resources, *map, false);
        }

        let sky_bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Lighting Sky"),
            layout: &self.sky_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&resources.skybox_cubemap().view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sky_sampler),
                },
            ],
        });

        // ==== Encode ====

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Lighting Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: lighting_view,
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

        let (Some(gbuffer_group), Some(ambient), Some(directional), Some(point)) = (
            self.gbuffer_bind_group.as_ref(),
            self.ambient_pipeline.as_ref(),
            self.directional_pipeline.as_ref(),
            self.point_pipeline.as_ref(),
        ) else {
            return;
        };

        // Ambient: one fullscreen triangle
        pass.set_pipeline(ambient);
        pass.set_bind_group(0, gbuffer_group, &[]);
        pass.set_bind_group(1, self.ambient_uniforms.bind_group(), &[]);
        pass.set_bind_group(2, &sky_bind_group, &[]);
        pass.draw(0..3, 0..1);

        // Directional: one fullscreen triangle per light. The camera block
        // rides along for cascade selection by clip-space depth.
        pass.set_pipeline(directional);
        pass.set_bind_group(3, camera_bind_group, &[]);
        for (index, (_, map)) in directional_lights.iter().enumerate() {
            let shadow_group = map
                .and_then(|key| self.directional_shadow_groups.get(&key))
                .or(self.fallback_directional_group.as_ref());
            let Some(shadow_group) = shadow_group else {
                continue;
            };
            pass.set_bind_group(
                1,
                self.directional_uniforms.bind_group(),
                &[self.directional_uniforms.offset(index as u32)],
            );
            pass.set_bind_group(2, shadow_group, &[]);
            pass.draw(0..3, 0..1);
        }

        // Point: unit-sphere proxy per light, front faces culled so a camera
        // inside the volume still shades
        let sphere = resources.mesh_or_placeholder(resources.unit_sphere());
        pass.set_pipeline(point);
        pass.set_bind_group(3, camera_bind_group, &[]);
        pass.set_vertex_buffer(0, sphere.vertex_buffer.slice(..));
        pass.set_index_buffer(sphere.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        for (index, (_, map)) in point_lights.iter().enumerate() {
            let shadow_group = map
                .and_then(|key| self.point_shadow_groups.get(&key))
                .or(self.fallback_point_group.as_ref());
            let Some(shadow_group) = shadow_group else {
                continue;
            };
            pass.set_bind_group(
                1,
                self.point_uniforms.bind_group(),
                &[self.point_uniforms.offset(index as u32)],
            );
            pass.set_bind_group(2, shadow_group, &[]);
            pass.draw_indexed(0..sphere.index_count, 0, 0..1);
        }
    }

    // ========================================================================
    // Bind group and pipeline caching
    // ========================================================================

    fn ensure_gbuffer_bind_group(
        &mut self,
        ctx: &GpuContext,
        gbuffer: &GBufferTargets,
        generation: u64,
    ) {
        if self.gbuffer_bind_group.is_some() && self.gbuffer_generation == generation {
            return;
        }
        let entry = |binding, view| wgpu::BindGroupEntry {
            binding,
            resource: wgpu::BindingResource::TextureView(view),
        };
        self.gbuffer_bind_group = Some(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Lighting G-Buffer"),
            layout: &self.gbuffer_layout,
            entries: &[
                entry(0, &gbuffer.position),
                entry(1, &gbuffer.normal),
                entry(2, &gbuffer.albedo),
                entry(3, &gbuffer.material),
            ],
        }));
        self.gbuffer_generation = generation;
    }

    fn ensure_shadow_group(
        &mut self,
        ctx: &GpuContext,
        resources: &ResourceStore,
        map: Option<TextureKey>,
        directional: bool,
    ) {
        let Some(key) = map else { return };
        let cache = if directional {
            &mut self.directional_shadow_groups
        } else {
            &mut self.point_shadow_groups
        };
        if cache.contains_key(&key) {
            return;
        }
        let Some(texture) = resources.texture(key) else {
            return;
        };
        let layout = if directional {
            &self.directional_shadow_layout
        } else {
            &self.point_shadow_layout
        };
        let group = create_shadow_group(ctx, layout, &texture.view, &self.shadow_sampler);
        if directional {
            self.directional_shadow_groups.insert(key, group);
        } else {
            self.point_shadow_groups.insert(key, group);
        }
    }

    /// Shadow maps are reallocated in place when a light's map size changes;
    /// the renderer calls this so cached groups pick up the new texture.
    pub fn invalidate_shadow_group(&mut self, key: TextureKey) {
        self.directional_shadow_groups.remove(&key);
        self.point_shadow_groups.remove(&key);
    }

    fn ensure_pipelines(
        &mut self,
        ctx: &GpuContext,
        shaders: &ShaderSet,
        camera_layout: &wgpu::BindGroupLayout,
    ) -> bool {
        let versions = [
            shaders.version(DEFERRED_AMBIENT_SHADER),
            shaders.version(DEFERRED_DIRECTIONAL_SHADER),
            shaders.version(DEFERRED_POINT_SHADER),
        ];
        let built = self.ambient_pipeline.is_some()
            && self.directional_pipeline.is_some()
            && self.point_pipeline.is_some();
        if built && self.built_versions == versions {
            return true;
        }

        let additive = wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
        };
        let target = [Some(wgpu::ColorTargetState {
            format: LIGHTING_FORMAT,
            blend: Some(additive),
            write_mask: wgpu::ColorWrites::ALL,
        })];

        let fullscreen = |name: &str,
                          layouts: &[&wgpu::BindGroupLayout]|
         -> Option<wgpu::RenderPipeline> {
            let module = match shaders.create_module(&ctx.device, name) {
                Ok(module) => module,
                Err(err) => {
                    log::error!("Lighting pipeline '{name}' unavailable: {err}");
                    return None;
                }
            };
            let layouts: Vec<Option<&wgpu::BindGroupLayout>> =
                layouts.iter().map(|l| Some(*l)).collect();
            let layout = ctx
                .device
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some(name),
                    bind_group_layouts: &layouts,
                    immediate_size: 0,
                });
            Some(
                ctx.device
                    .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                        label: Some(name),
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
                            targets: &target,
                        }),
                        primitive: wgpu::PrimitiveState::default(),
                        depth_stencil: None,
                        multisample: wgpu::MultisampleState::default(),
                        multiview_mask: None,
                        cache: None,
                    }),
            )
        };

        let ambient = fullscreen(
            DEFERRED_AMBIENT_SHADER,
            &[
                &self.gbuffer_layout,
                self.ambient_uniforms.layout(),
                &self.sky_layout,
            ],
        );
        let directional = fullscreen(
            DEFERRED_DIRECTIONAL_SHADER,
            &[
                &self.gbuffer_layout,
                self.directional_uniforms.layout(),
                &self.directional_shadow_layout,
                camera_layout,
            ],
        );

        let point = (|| {
            let module = match shaders.create_module(&ctx.device, DEFERRED_POINT_SHADER) {
                Ok(module) => module,
                Err(err) => {
                    log::error!("Lighting pipeline 'deferred_point' unavailable: {err}");
                    return None;
                }
            };
            let layout = ctx
                .device
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some("Deferred Point"),
                    bind_group_layouts: &[
                        Some(&self.gbuffer_layout),
                        Some(self.point_uniforms.layout()),
                        Some(&self.point_shadow_layout),
                        Some(camera_layout),
                    ],
                    immediate_size: 0,
                });
            Some(
                ctx.device
                    .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                        label: Some("Deferred Point"),
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
                            targets: &target,
                        }),
                        primitive: wgpu::PrimitiveState {
                            cull_mode: Some(wgpu::Face::Front),
                            ..Default::default()
                        },
                        depth_stencil: None,
                        multisample: wgpu::MultisampleState::default(),
                        multiview_mask: None,
                        cache: None,
                    }),
            )
        })();

        // Keep any previously working pipelines if a rebuild failed.
        if let Some(p) = ambient {
            self.ambient_pipeline = Some(p);
        }
        if let Some(p) = directional {
            self.directional_pipeline = Some(p);
        }
        if let Some(p) = point {
            self.point_pipeline = Some(p);
        }
        self.built_versions = versions;

        self.ambient_pipeline.is_some()
            && self.directional_pipeline.is_some()
            && self.point_pipeline.is_some()
    }
}

// ============================================================================
// Layout helpers
// ============================================================================

fn create_gbuffer_layout(ctx: &GpuContext) -> wgpu::BindGroupLayout {
    // Fetched with textureLoad, so no sampler and no filterable requirement
    let entry = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    };
    ctx.device
        .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Lighting G-Buffer"),
            entries: &[entry(0), entry(1), entry(2), entry(3)],
        })
}

fn create_shadow_layout(
    ctx: &GpuContext,
    dimension: wgpu::TextureViewDimension,
    label: &str,
) -> wgpu::BindGroupLayout {
    ctx.device
        .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: dimension,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        })
}

fn create_shadow_group(
    ctx: &GpuContext,
    layout: &wgpu::BindGroupLayout,
    view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Shadow Map"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

fn create_fallback_depth(
    ctx: &GpuContext,
    layers: u32,
    dimension: wgpu::TextureViewDimension,
) -> wgpu::TextureView {
    let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Fallback Shadow Map"),
        size: wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: layers,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: ctx.shadow_format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor {
        dimension: Some(dimension),
        ..Default::default()
    })
}
