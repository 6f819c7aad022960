//! Shadow Pipeline
//!
//! Consumes dirty-light marks and refreshes the matching shadow data:
//! cascade matrices plus a depth-array render for directional lights, face
//! matrices plus a cube-map render for point lights. Lights without a mark
//! are skipped entirely, so a static scene re-renders zero shadow maps.
//!
//! Depth maps are allocated lazily through the resource store on a light's
//! first processed frame and reallocated if its configured map size changes.

pub mod cascade;

use glam::{Mat4, Vec3};

use crate::math::Frustum;
use crate::render::context::GpuContext;
use crate::render::primitives::VERTEX_LAYOUT;
use crate::render::resources::{GpuTexture, ResourceStore, TextureKey};
use crate::render::shaders::{SHADOW_DEPTH_SHADER, ShaderSet};
use crate::render::uniforms::{DynamicUniformBuffer, LightViewProjUniforms, ShadowObjectUniforms};
use crate::render::visibility::{self, VisibleObject};
use crate::scene::{CASCADE_COUNT, DirtyTracker, Entity, EntityStore};

/// One depth render: a light-space matrix, a target layer and its casters.
struct ShadowJob {
    view_proj: Mat4,
    target: TextureKey,
    layer: usize,
    casters: Vec<VisibleObject>,
}

pub struct ShadowPipeline {
    pipeline: Option<wgpu::RenderPipeline>,
    built_version: u64,
    light_vp: DynamicUniformBuffer<LightViewProjUniforms>,
    objects: DynamicUniformBuffer<ShadowObjectUniforms>,
}

impl ShadowPipeline {
    #[must_use]
    pub fn new(ctx: &GpuContext) -> Self {
        Self {
            pipeline: None,
            built_version: 0,
            light_vp: DynamicUniformBuffer::new(
                ctx,
                "Shadow Light VP",
                wgpu::ShaderStages::VERTEX,
                8,
            ),
            objects: DynamicUniformBuffer::new(
                ctx,
                "Shadow Objects",
                wgpu::ShaderStages::VERTEX,
                64,
            ),
        }
    }

    /// Processes every dirty light: refits matrices, reallocates maps if
    /// needed, renders depth, then clears the mark.
    pub fn process(
        &mut self,
        ctx: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        store: &mut EntityStore,
        dirty: &mut DirtyTracker,
        resources: &mut ResourceStore,
        shaders: &ShaderSet,
        camera_entity: Entity,
    ) {
        let dirty_lights = dirty.dirty_lights();
        if dirty_lights.is_empty() {
            return;
        }
        if !self.ensure_pipeline(ctx, shaders) {
            // Keep the marks; a later shader reload can fix this.
            return;
        }

        let camera = store.cameras.get(camera_entity).map(|c| (c.projection, c.view()));

        let mut jobs: Vec<ShadowJob> = Vec::new();
        for entity in dirty_lights {
            if store.directional_lights.contains_key(entity) {
                let Some((projection, view)) = camera else {
                    // Mark kept; the light is retried once a camera exists.
                    log::warn!("No camera to fit directional cascades against; deferring {entity:?}");
                    continue;
                };
                self.prepare_directional(ctx, store, resources, &mut jobs, entity, projection, view);
            }
            if store.point_lights.contains_key(entity) {
                self.prepare_point(ctx, store, resources, &mut jobs, entity);
            }
            dirty.clear_light(entity);
        }
        if jobs.is_empty() {
            return;
        }

        // Upload all uniforms before encoding; growth invalidates bind groups.
        let light_vps: Vec<LightViewProjUniforms> = jobs
            .iter()
            .map(|job| LightViewProjUniforms {
                view_proj: job.view_proj,
            })
            .collect();
        self.light_vp.write_all(ctx, &light_vps);

        let object_uniforms: Vec<ShadowObjectUniforms> = jobs
            .iter()
            .flat_map(|job| job.casters.iter())
            .map(|object| ShadowObjectUniforms {
                model: object.model,
            })
            .collect();
        self.objects.write_all(ctx, &object_uniforms);

        let Some(pipeline) = self.pipeline.as_ref() else {
            return;
        };

        let mut object_index = 0u32;
        for (job_index, job) in jobs.iter().enumerate() {
            let Some(target) = resources.texture(job.target) else {
                object_index += job.casters.len() as u32;
                continue;
            };
            let Some(layer_view) = target.layer_views.get(job.layer) else {
                object_index += job.casters.len() as u32;
                continue;
            };

            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Depth Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: layer_view,
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
            pass.set_pipeline(pipeline);
            pass.set_bind_group(
                0,
                self.light_vp.bind_group(),
                &[self.light_vp.offset(job_index as u32)],
            );

            for object in &job.casters {
                let Some(mesh_component) = store.meshes.get(object.entity) else {
                    object_index += 1;
                    continue;
                };
                let mesh = resources.mesh_or_placeholder(mesh_component.mesh);
                pass.set_bind_group(
                    1,
                    self.objects.bind_group(),
                    &[self.objects.offset(object_index)],
                );
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..mesh.index_count, 0, 0..1);
                object_index += 1;
            }
        }
    }

    // ========================================================================
    // Per-light preparation
    // ========================================================================

    fn prepare_directional(
        &self,
        ctx: &GpuContext,
        store: &mut EntityStore,
        resources: &mut ResourceStore,
        jobs: &mut Vec<ShadowJob>,
        entity: Entity,
        projection: crate::scene::Projection,
        view: Mat4,
    ) {
        let world = store
            .transforms
            .get(entity)
            .map_or(Mat4::IDENTITY, |t| t.world);
        // The light travels along the entity's world -Z axis.
        let light_dir = (-world.z_axis.truncate()).normalize_or(Vec3::NEG_Y);

        let (map_size, cast_shadows, existing_map) = {
            let light = &store.directional_lights[entity];
            (light.shadow.map_size, light.cast_shadows, light.shadow_map)
        };

        let splits = cascade::cascade_split_distances(projection.near(), projection.far());
        let camera_proj = projection.matrix();

        let mut matrices = [Mat4::IDENTITY; CASCADE_COUNT];
        let mut ends = [0.0f32; CASCADE_COUNT];
        for i in 0..CASCADE_COUNT {
            let slice_proj = projection.matrix_with_range(splits[i], splits[i + 1]);
            let inv_slice = (slice_proj * view).inverse();
            let corners = cascade::slice_corners_world(&inv_slice);
            let sphere = cascade::slice_bounding_sphere(&corners);
            let center =
                cascade::snap_to_texel_grid(sphere.center, light_dir, sphere.radius, map_size);
            matrices[i] = cascade::directional_cascade_matrix(light_dir, center, sphere.radius);
            ends[i] = cascade::cascade_end_clip_space(&camera_proj, splits[i + 1]);
        }

        let map = ensure_shadow_map(
            ctx,
            resources,
            existing_map,
            map_size,
            CASCADE_COUNT as u32,
            wgpu::TextureViewDimension::D2Array,
            "Directional Shadow Map",
        );

        if let Some(light) = store.directional_lights.get_mut(entity) {
            light.cascade_matrices = matrices;
            light.cascade_end_clip_space = ends;
            light.shadow_map = Some(map);
        }

        if cast_shadows {
            for (i, matrix) in matrices.iter().enumerate() {
                let frustum = Frustum::from_matrix_shadow_caster(*matrix);
                jobs.push(ShadowJob {
                    view_proj: *matrix,
                    target: map,
                    layer: i,
                    casters: visibility::collect_shadow_casters(store, &frustum),
                });
            }
        }
    }

    fn prepare_point(
        &self,
        ctx: &GpuContext,
        store: &mut EntityStore,
        resources: &mut ResourceStore,
        jobs: &mut Vec<ShadowJob>,
        entity: Entity,
    ) {
        let position = store
            .transforms
            .get(entity)
            .map_or(Vec3::ZERO, |t| t.world.w_axis.truncate());

        let (radius, map_size, cast_shadows, existing_map) = {
            let light = &store.point_lights[entity];
            (
                light.radius(),
                light.shadow.map_size,
                light.cast_shadows,
                light.shadow_map,
            )
        };

        let faces = cascade::point_light_face_matrices(position, radius);

        let map = ensure_shadow_map(
            ctx,
            resources,
            existing_map,
            map_size,
            6,
            wgpu::TextureViewDimension::Cube,
            "Point Shadow Map",
        );

        if let Some(light) = store.point_lights.get_mut(entity) {
            light.face_matrices = faces.iter().copied().collect();
            light.shadow_map = Some(map);
        }

        if cast_shadows {
            for (i, matrix) in faces.iter().enumerate() {
                let frustum = Frustum::from_matrix(*matrix);
                jobs.push(ShadowJob {
                    view_proj: *matrix,
                    target: map,
                    layer: i,
                    casters: visibility::collect_shadow_casters(store, &frustum),
                });
            }
        }
    }

    fn ensure_pipeline(&mut self, ctx: &GpuContext, shaders: &ShaderSet) -> bool {
        let version = shaders.version(SHADOW_DEPTH_SHADER);
        if self.pipeline.is_some() && self.built_version == version {
            return true;
        }
        let module = match shaders.create_module(&ctx.device, SHADOW_DEPTH_SHADER) {
            Ok(module) => module,
            Err(err) => {
                log::error!("Shadow depth pipeline unavailable: {err}");
                return self.pipeline.is_some();
            }
        };

        let layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Shadow Depth"),
                bind_group_layouts: &[Some(self.light_vp.layout()), Some(self.objects.layout())],
                immediate_size: 0,
            });

        self.pipeline = Some(ctx.device.create_render_pipeline(
            &wgpu::RenderPipelineDescriptor {
                label: Some("Shadow Depth"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &module,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[VERTEX_LAYOUT],
                },
                fragment: None,
                primitive: wgpu::PrimitiveState {
                    // Front-face culling trades acne for a little peter-panning
                    cull_mode: Some(wgpu::Face::Front),
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: ctx.shadow_format,
                    depth_write_enabled: Some(true),
                    depth_compare: Some(wgpu::CompareFunction::Less),
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState {
                        constant: 2,
                        slope_scale: 2.0,
                        clamp: 0.0,
                    },
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

/// Returns a shadow map of the requested size/layer count, reusing the
/// existing allocation when it still matches.
fn ensure_shadow_map(
    ctx: &GpuContext,
    resources: &mut ResourceStore,
    existing: Option<TextureKey>,
    size: u32,
    layers: u32,
    dimension: wgpu::TextureViewDimension,
    label: &str,
) -> TextureKey {
    if let Some(key) = existing {
        if let Some(texture) = resources.texture(key) {
            if texture.texture.width() == size
                && texture.texture.depth_or_array_layers() == layers
            {
                return key;
            }
            let replacement = create_shadow_map(ctx, size, layers, dimension, label);
            resources.replace_texture(key, replacement);
            return key;
        }
    }
    resources.insert_internal_texture(create_shadow_map(ctx, size, layers, dimension, label))
}

fn create_shadow_map(
    ctx: &GpuContext,
    size: u32,
    layers: u32,
    dimension: wgpu::TextureViewDimension,
    label: &str,
) -> GpuTexture {
    let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size,
            height: size,
            depth_or_array_layers: layers,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: ctx.shadow_format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });

    let view = texture.create_view(&wgpu::TextureViewDescriptor {
        label: Some(label),
        dimension: Some(dimension),
        ..Default::default()
    });
    let layer_views = (0..layers)
        .map(|layer| {
            texture.create_view(&wgpu::TextureViewDescriptor {
                label: Some(label),
                dimension: Some(wgpu::TextureViewDimension::D2),
                base_array_layer: layer,
                array_layer_count: Some(1),
                ..Default::default()
            })
        })
        .collect();

    GpuTexture {
        texture,
        view,
        layer_views,
    }
}
