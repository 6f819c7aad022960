//! Error Types
//!
//! The renderer is expected to degrade gracefully: every failure the core can
//! produce is recoverable, handled where it occurs and surfaced through
//! logging. [`LucentError`] exists so that the handling site has a typed value
//! to log and so helpers can use `?` internally — none of these errors are
//! allowed to cross a render-pass boundary.

use thiserror::Error;

/// The main error type for the Lucent engine.
#[derive(Error, Debug)]
pub enum LucentError {
    // ========================================================================
    // GPU & Rendering Errors
    // ========================================================================
    /// A WGSL shader failed to parse or validate. The previous valid shader
    /// stays bound; rendering continues with it.
    #[error("Shader '{name}' failed to compile: {message}")]
    ShaderCompileFailure {
        /// Logical shader name (e.g. "deferred_directional")
        name: String,
        /// Compiler diagnostic
        message: String,
    },

    /// Failed to request a compatible GPU adapter.
    #[error("Failed to request WGPU adapter: {0}")]
    AdapterRequestFailed(String),

    /// Failed to create the GPU device.
    #[error("Failed to create WGPU device: {0}")]
    DeviceCreateFailed(#[from] wgpu::RequestDeviceError),

    // ========================================================================
    // Resource Errors
    // ========================================================================
    /// The requested mesh/texture was not found in the resource store.
    /// Consumers substitute the designated placeholder instead of failing.
    #[error("Resource not found: {0}")]
    MissingResource(String),

    /// Zero-extent bounds or an otherwise degenerate volume was encountered.
    /// Handlers clamp to an epsilon; NaN/Inf must never propagate.
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    // ========================================================================
    // Scene Errors
    // ========================================================================
    /// A hierarchy parent handle no longer resolves to a live entity.
    /// The child is treated as a root for that tick.
    #[error("Invalid hierarchy reference: parent of entity {0:?} is not alive")]
    InvalidHierarchyReference(crate::scene::Entity),
}

/// Alias for `Result<T, LucentError>`.
pub type Result<T> = std::result::Result<T, LucentError>;
