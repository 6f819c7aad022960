//! Deferred Renderer
//!
//! Owns the passes and enforces the per-frame sequencing every consumer can
//! rely on:
//!
//! 1. hierarchy resolution (parents before children),
//! 2. change propagation into the dirty tracker, point-light radius sync and
//!    camera view refresh,
//! 3. camera fan-out (a dirty camera dirties every directional light),
//! 4. shadow maps for dirty lights only,
//! 5. G-buffer fill over the frustum-culled set,
//! 6. additive lighting, skybox, post-process.
//!
//! Recoverable faults (missing resources, rejected shader reloads, an
//! unsized target set) are logged and degrade the frame; they never cross a
//! pass boundary as a panic.

use crate::render::context::GpuContext;
use crate::render::passes::{GeometryPass, LightingPass, PostProcessPass, SkyboxPass};
use crate::render::resources::ResourceStore;
use crate::render::shaders::ShaderSet;
use crate::render::shadow::ShadowPipeline;
use crate::render::targets::RenderTargetSet;
use crate::render::uniforms::{CameraUniforms, SingleUniformBuffer};
use crate::render::visibility::{self, VisibleObject};
use crate::scene::{DirtyTracker, Entity, EntityStore, HierarchyResolver};

pub struct DeferredRenderer {
    resolver: HierarchyResolver,
    camera_uniforms: SingleUniformBuffer<CameraUniforms>,
    shadow: ShadowPipeline,
    geometry: GeometryPass,
    lighting: LightingPass,
    skybox: SkyboxPass,
    post: PostProcessPass,
}

impl DeferredRenderer {
    #[must_use]
    pub fn new(ctx: &GpuContext) -> Self {
        Self::check_pass_order();
        Self {
            resolver: HierarchyResolver::new(),
            camera_uniforms: SingleUniformBuffer::new(
                ctx,
                "Camera",
                wgpu::ShaderStages::VERTEX_FRAGMENT,
            ),
            shadow: ShadowPipeline::new(ctx),
            geometry: GeometryPass::new(ctx),
            lighting: LightingPass::new(ctx),
            skybox: SkyboxPass::new(ctx),
            post: PostProcessPass::new(ctx),
        }
    }

    /// Verifies the declared read/write attachment sets against the fixed
    /// pass order: nothing may read an attachment no earlier stage wrote.
    fn check_pass_order() {
        use crate::render::passes::Attachments;

        let stages = [
            (GeometryPass::READS, GeometryPass::WRITES),
            (LightingPass::READS, LightingPass::WRITES),
            (SkyboxPass::READS, SkyboxPass::WRITES),
            (PostProcessPass::READS, PostProcessPass::WRITES),
        ];
        // The shadow pipeline runs before every pass
        let mut written = Attachments::SHADOW_MAPS;
        for (reads, writes) in stages {
            debug_assert!(
                written.contains(reads),
                "pass reads {:?} before anything wrote it",
                reads.difference(written)
            );
            written |= writes;
        }
    }

    #[inline]
    #[must_use]
    pub fn lighting_mut(&mut self) -> &mut LightingPass {
        &mut self.lighting
    }

    #[inline]
    #[must_use]
    pub fn post_mut(&mut self) -> &mut PostProcessPass {
        &mut self.post
    }

    /// Draw calls the last geometry pass issued. A fully culled scene
    /// reports zero.
    #[inline]
    #[must_use]
    pub fn last_draw_count(&self) -> u32 {
        self.geometry.draw_count()
    }

    /// Scene update without encoding: resolve transforms, propagate dirty
    /// marks, sync radii and camera views. `render` runs this itself; it is
    /// exposed for hosts that tick simulation faster than they draw.
    pub fn update_scene(
        &mut self,
        store: &mut EntityStore,
        dirty: &mut DirtyTracker,
    ) {
        self.resolver.resolve(store);

        // A recomposed transform dirties whatever derived data hangs off it.
        let changed: Vec<Entity> = self.resolver.changed_entities().collect();
        for entity in changed {
            if store.point_lights.contains_key(entity)
                || store.directional_lights.contains_key(entity)
            {
                dirty.mark_light(entity);
            }
            if store.cameras.contains_key(entity) {
                dirty.mark_camera(entity);
            }
        }

        // Point-light radii track intensity every update, dirty or not.
        let mut radius_changed: Vec<Entity> = Vec::new();
        for (entity, light) in store.point_lights.iter_mut() {
            let before = light.radius();
            light.sync_radius();
            if (light.radius() - before).abs() > f32::EPSILON {
                radius_changed.push(entity);
            }
        }
        for entity in radius_changed {
            dirty.mark_light(entity);
        }

        // Refresh every camera's view data from its resolved world matrix. A
        // projection edit (resize, fov change) dirties the camera the same
        // way a transform edit does.
        let camera_entities: Vec<Entity> = store.cameras.keys().collect();
        for entity in camera_entities {
            let world = store
                .transforms
                .get(entity)
                .map_or(glam::Mat4::IDENTITY, |t| t.world);
            if let Some(camera) = store.cameras.get_mut(entity) {
                if camera.projection_edited() {
                    dirty.mark_camera(entity);
                }
                camera.update_view(&world);
            }
        }

        // Camera fan-out: any dirty camera invalidates all directional
        // cascades, since they are fitted to the camera frustum.
        let dirty_cameras = dirty.dirty_cameras();
        if !dirty_cameras.is_empty() {
            dirty.mark_all_directional_lights(store);
            for entity in dirty_cameras {
                dirty.clear_camera(entity);
            }
        }
    }

    /// Renders one frame into `surface_view`.
    pub fn render(
        &mut self,
        ctx: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        store: &mut EntityStore,
        dirty: &mut DirtyTracker,
        resources: &mut ResourceStore,
        shaders: &ShaderSet,
        targets: &RenderTargetSet,
        camera_entity: Entity,
        surface_view: &wgpu::TextureView,
    ) {
        self.update_scene(store, dirty);

        // Shadows come first so the lighting pass reads settled maps.
        self.shadow.process(
            ctx,
            encoder,
            store,
            dirty,
            resources,
            shaders,
            camera_entity,
        );

        let (Some(gbuffer), Some(lighting_view)) = (targets.gbuffer(), targets.lighting()) else {
            log::error!("Render targets are uninitialized; call resize before render");
            return;
        };
        let Some(camera) = store.cameras.get(camera_entity).cloned() else {
            log::error!("Render camera {camera_entity:?} has no camera component");
            return;
        };

        let camera_position = store
            .transforms
            .get(camera_entity)
            .map_or(glam::Vec3::ZERO, |t| t.world.w_axis.truncate());
        self.camera_uniforms.write(
            ctx,
            &CameraUniforms {
                view_proj: camera.view_projection(),
                position: camera_position.extend(1.0),
            },
        );

        let visible: Vec<VisibleObject> = visibility::collect_visible(store, camera.frustum());

        self.geometry.run(
            ctx,
            encoder,
            store,
            resources,
            shaders,
            self.camera_uniforms.layout(),
            self.camera_uniforms.bind_group(),
            gbuffer,
            &visible,
        );

        self.lighting.run(
            ctx,
            encoder,
            store,
            resources,
            shaders,
            &camera,
            self.camera_uniforms.layout(),
            self.camera_uniforms.bind_group(),
            gbuffer,
            targets.generation(),
            lighting_view,
        );

        self.skybox.run(
            ctx,
            encoder,
            resources,
            shaders,
            &camera,
            gbuffer,
            lighting_view,
        );

        self.post.run(
            ctx,
            encoder,
            shaders,
            lighting_view,
            targets.generation(),
            surface_view,
        );
    }
}
