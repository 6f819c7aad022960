//! Resource Store
//!
//! The persisted store the core *consumes but does not populate*: the asset
//! import pipeline (out of scope here) decodes meshes and textures and
//! inserts already-validated, GPU-ready entries; the core fetches them by
//! logical name or by handle.
//!
//! The store also owns the designated fallbacks: a magenta placeholder
//! texture and unit proxy meshes. A missing resource substitutes one of these
//! and logs — rendering degrades visibly but never fails outright.

use glam::Vec3;
use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};

use crate::math::BoundingBox;
use crate::render::context::GpuContext;
use crate::render::primitives::{self, Vertex};

new_key_type! {
    pub struct MeshKey;
    pub struct TextureKey;
}

/// GPU-ready mesh: interleaved vertex buffer + u32 index buffer.
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
    pub bounds: BoundingBox,
}

/// GPU-ready texture with a default view and (for arrays/cubes) one view per
/// layer, used as depth attachments by the shadow pipeline.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub layer_views: Vec<wgpu::TextureView>,
}

pub struct ResourceStore {
    meshes: SlotMap<MeshKey, GpuMesh>,
    textures: SlotMap<TextureKey, GpuTexture>,
    mesh_names: FxHashMap<String, MeshKey>,
    texture_names: FxHashMap<String, TextureKey>,

    // ==== Designated fallbacks ====
    placeholder_texture: TextureKey,
    skybox_cubemap: TextureKey,
    unit_sphere: MeshKey,
    unit_cube: MeshKey,
}

impl ResourceStore {
    /// Creates the store and uploads the built-in fallback resources.
    #[must_use]
    pub fn new(ctx: &GpuContext) -> Self {
        let mut store = Self {
            meshes: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            mesh_names: FxHashMap::default(),
            texture_names: FxHashMap::default(),
            placeholder_texture: TextureKey::default(),
            skybox_cubemap: TextureKey::default(),
            unit_sphere: MeshKey::default(),
            unit_cube: MeshKey::default(),
        };

        // Magenta 1x1 — visibly wrong but stable
        store.placeholder_texture = store.insert_texture(
            "__placeholder",
            create_solid_texture(ctx, [255, 0, 255, 255], 1, wgpu::TextureViewDimension::D2),
        );
        // Neutral grey cubemap until a real skybox is imported
        store.skybox_cubemap = store.insert_texture(
            "__skybox",
            create_solid_texture(ctx, [90, 100, 120, 255], 6, wgpu::TextureViewDimension::Cube),
        );

        let (sphere_vertices, sphere_indices) = primitives::unit_sphere(24, 16);
        store.unit_sphere = store.insert_mesh(
            "__unit_sphere",
            upload_mesh(
                ctx,
                "Unit Sphere",
                &sphere_vertices,
                &sphere_indices,
                BoundingBox::new(Vec3::splat(-1.0), Vec3::splat(1.0)),
            ),
        );

        let (cube_vertices, cube_indices) = primitives::unit_cube();
        store.unit_cube = store.insert_mesh(
            "__unit_cube",
            upload_mesh(
                ctx,
                "Unit Cube",
                &cube_vertices,
                &cube_indices,
                BoundingBox::new(Vec3::splat(-0.5), Vec3::splat(0.5)),
            ),
        );

        store
    }

    // ========================================================================
    // Name lookup (the `has` / `get` / `load` surface of the store)
    // ========================================================================

    #[must_use]
    pub fn has_mesh(&self, name: &str) -> bool {
        self.mesh_names.contains_key(name)
    }

    #[must_use]
    pub fn has_texture(&self, name: &str) -> bool {
        self.texture_names.contains_key(name)
    }

    #[must_use]
    pub fn mesh_key(&self, name: &str) -> Option<MeshKey> {
        self.mesh_names.get(name).copied()
    }

    #[must_use]
    pub fn texture_key(&self, name: &str) -> Option<TextureKey> {
        self.texture_names.get(name).copied()
    }

    pub fn insert_mesh(&mut self, name: &str, mesh: GpuMesh) -> MeshKey {
        let key = self.meshes.insert(mesh);
        self.mesh_names.insert(name.to_string(), key);
        key
    }

    pub fn insert_texture(&mut self, name: &str, texture: GpuTexture) -> TextureKey {
        let key = self.textures.insert(texture);
        self.texture_names.insert(name.to_string(), key);
        key
    }

    /// Inserts an unnamed texture (shadow maps and other internal targets).
    pub fn insert_internal_texture(&mut self, texture: GpuTexture) -> TextureKey {
        self.textures.insert(texture)
    }

    pub fn replace_texture(&mut self, key: TextureKey, texture: GpuTexture) {
        if let Some(slot) = self.textures.get_mut(key) {
            *slot = texture;
        }
    }

    // ========================================================================
    // Handle access with placeholder fallback
    // ========================================================================

    #[must_use]
    pub fn mesh(&self, key: MeshKey) -> Option<&GpuMesh> {
        self.meshes.get(key)
    }

    /// Resolves a mesh handle, falling back to the unit cube when stale.
    #[must_use]
    pub fn mesh_or_placeholder(&self, key: MeshKey) -> &GpuMesh {
        self.meshes.get(key).unwrap_or_else(|| {
            log::warn!("Stale mesh handle {key:?}; substituting unit cube");
            &self.meshes[self.unit_cube]
        })
    }

    #[must_use]
    pub fn texture(&self, key: TextureKey) -> Option<&GpuTexture> {
        self.textures.get(key)
    }

    /// Resolves an optional texture handle, falling back to magenta.
    #[must_use]
    pub fn texture_or_placeholder(&self, key: Option<TextureKey>) -> &GpuTexture {
        match key.and_then(|k| self.textures.get(k)) {
            Some(texture) => texture,
            None => {
                if key.is_some() {
                    log::warn!("Stale texture handle {key:?}; substituting placeholder");
                }
                &self.textures[self.placeholder_texture]
            }
        }
    }

    #[must_use]
    pub fn placeholder_texture(&self) -> &GpuTexture {
        &self.textures[self.placeholder_texture]
    }

    #[must_use]
    pub fn placeholder_texture_key(&self) -> TextureKey {
        self.placeholder_texture
    }

    #[must_use]
    pub fn skybox_cubemap(&self) -> &GpuTexture {
        &self.textures[self.skybox_cubemap]
    }

    pub fn set_skybox_cubemap(&mut self, key: TextureKey) {
        if self.textures.contains_key(key) {
            self.skybox_cubemap = key;
        } else {
            log::warn!("set_skybox_cubemap: {key:?} is not a live texture");
        }
    }

    #[must_use]
    pub fn unit_sphere(&self) -> MeshKey {
        self.unit_sphere
    }

    #[must_use]
    pub fn unit_cube(&self) -> MeshKey {
        self.unit_cube
    }
}

// ============================================================================
// Upload helpers
// ============================================================================

/// Uploads an interleaved vertex/index mesh.
#[must_use]
pub fn upload_mesh(
    ctx: &GpuContext,
    label: &str,
    vertices: &[Vertex],
    indices: &[u32],
    bounds: BoundingBox,
) -> GpuMesh {
    use wgpu::util::DeviceExt;

    let vertex_buffer = ctx
        .device
        .create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Vertices")),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
    let index_buffer = ctx
        .device
        .create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Indices")),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });

    GpuMesh {
        vertex_buffer,
        index_buffer,
        index_count: indices.len() as u32,
        bounds,
    }
}

fn create_solid_texture(
    ctx: &GpuContext,
    rgba: [u8; 4],
    layers: u32,
    view_dimension: wgpu::TextureViewDimension,
) -> GpuTexture {
    let size = wgpu::Extent3d {
        width: 1,
        height: 1,
        depth_or_array_layers: layers,
    };
    let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Solid Texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    let data: Vec<u8> = (0..layers).flat_map(|_| rgba).collect();
    ctx.queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &data,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4),
            rows_per_image: Some(1),
        },
        size,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor {
        dimension: Some(view_dimension),
        ..Default::default()
    });

    GpuTexture {
        texture,
        view,
        layer_views: Vec::new(),
    }
}
