//! Shader Set
//!
//! Named WGSL sources with hot-reload. A reload is parsed and validated on
//! the CPU with naga *before* any GPU object is touched; a source that fails
//! validation is rejected, the error is logged, and the previous source (and
//! therefore every pipeline built from it) stays live. Passes compare the
//! per-shader version counter to decide when to rebuild their pipelines.

use rustc_hash::FxHashMap;

use crate::errors::{LucentError, Result};

pub const GEOMETRY_SHADER: &str = "geometry";
pub const SHADOW_DEPTH_SHADER: &str = "shadow_depth";
pub const DEFERRED_AMBIENT_SHADER: &str = "deferred_ambient";
pub const DEFERRED_DIRECTIONAL_SHADER: &str = "deferred_directional";
pub const DEFERRED_POINT_SHADER: &str = "deferred_point";
pub const SKYBOX_SHADER: &str = "skybox";
pub const POST_SHADER: &str = "post";

struct ShaderEntry {
    source: String,
    version: u64,
}

pub struct ShaderSet {
    entries: FxHashMap<String, ShaderEntry>,
}

impl ShaderSet {
    /// Creates the set seeded with the built-in pass shaders.
    #[must_use]
    pub fn new() -> Self {
        let mut entries = FxHashMap::default();
        let builtin: [(&str, &str); 7] = [
            (GEOMETRY_SHADER, include_str!("shaders/geometry.wgsl")),
            (SHADOW_DEPTH_SHADER, include_str!("shaders/shadow_depth.wgsl")),
            (DEFERRED_AMBIENT_SHADER, include_str!("shaders/deferred_ambient.wgsl")),
            (
                DEFERRED_DIRECTIONAL_SHADER,
                include_str!("shaders/deferred_directional.wgsl"),
            ),
            (DEFERRED_POINT_SHADER, include_str!("shaders/deferred_point.wgsl")),
            (SKYBOX_SHADER, include_str!("shaders/skybox.wgsl")),
            (POST_SHADER, include_str!("shaders/post.wgsl")),
        ];
        for (name, source) in builtin {
            entries.insert(
                name.to_string(),
                ShaderEntry {
                    source: source.to_string(),
                    version: 1,
                },
            );
        }
        Self { entries }
    }

    /// Validates WGSL without touching the GPU.
    pub fn validate(name: &str, source: &str) -> Result<()> {
        let module = naga::front::wgsl::parse_str(source).map_err(|err| {
            LucentError::ShaderCompileFailure {
                name: name.to_string(),
                message: err.emit_to_string(source),
            }
        })?;

        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .map_err(|err| LucentError::ShaderCompileFailure {
            name: name.to_string(),
            message: format!("{:?}", err.as_inner()),
        })?;

        Ok(())
    }

    /// Replaces a shader's source if the new source validates.
    ///
    /// On failure the error is logged and the previous source stays active;
    /// returns whether the reload was accepted.
    pub fn reload(&mut self, name: &str, source: &str) -> bool {
        match Self::validate(name, source) {
            Ok(()) => match self.entries.get_mut(name) {
                Some(entry) => {
                    entry.source = source.to_string();
                    entry.version += 1;
                    log::info!("Shader '{name}' reloaded (version {})", entry.version);
                    true
                }
                None => {
                    self.entries.insert(
                        name.to_string(),
                        ShaderEntry {
                            source: source.to_string(),
                            version: 1,
                        },
                    );
                    true
                }
            },
            Err(err) => {
                log::error!("Shader '{name}' reload rejected, keeping previous version: {err}");
                false
            }
        }
    }

    #[must_use]
    pub fn source(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(|e| e.source.as_str())
    }

    /// Monotonic per-shader version; 0 for unknown names so passes treat
    /// them as never-built.
    #[must_use]
    pub fn version(&self, name: &str) -> u64 {
        self.entries.get(name).map_or(0, |e| e.version)
    }

    /// Creates a GPU module from the current source of `name`.
    ///
    /// Sources were already naga-validated, but the device may still reject
    /// a module (backend limits), so creation runs inside an error scope and
    /// surfaces the failure as a typed error instead of a global callback.
    pub fn create_module(&self, device: &wgpu::Device, name: &str) -> Result<wgpu::ShaderModule> {
        let source = self
            .source(name)
            .ok_or_else(|| LucentError::MissingResource(format!("shader '{name}'")))?;

        let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(name),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        if let Some(err) = pollster::block_on(scope.pop()) {
            return Err(LucentError::ShaderCompileFailure {
                name: name.to_string(),
                message: err.to_string(),
            });
        }
        Ok(module)
    }
}

impl Default for ShaderSet {
    fn default() -> Self {
        Self::new()
    }
}
