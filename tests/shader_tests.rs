//! Shader set tests
//!
//! Tests for:
//! - Every embedded WGSL source parsing and validating
//! - Rejected reloads retaining the previous source and version
//! - Accepted reloads bumping the version counter

use lucent::render::shaders::{
    DEFERRED_AMBIENT_SHADER, DEFERRED_DIRECTIONAL_SHADER, DEFERRED_POINT_SHADER, GEOMETRY_SHADER,
    POST_SHADER, SHADOW_DEPTH_SHADER, SKYBOX_SHADER,
};
use lucent::ShaderSet;

const ALL_SHADERS: [&str; 7] = [
    GEOMETRY_SHADER,
    SHADOW_DEPTH_SHADER,
    DEFERRED_AMBIENT_SHADER,
    DEFERRED_DIRECTIONAL_SHADER,
    DEFERRED_POINT_SHADER,
    SKYBOX_SHADER,
    POST_SHADER,
];

const TRIVIAL_SHADER: &str = "
@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> @builtin(position) vec4<f32> {
    return vec4<f32>(0.0, 0.0, 0.0, 1.0);
}
";

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Built-in sources
// ============================================================================

#[test]
fn every_builtin_shader_validates() {
    init_logging();
    let set = ShaderSet::new();
    for name in ALL_SHADERS {
        let source = set.source(name).expect("builtin shader missing");
        ShaderSet::validate(name, source).expect("builtin shader failed validation");
    }
}

#[test]
fn builtin_shaders_start_at_version_one() {
    let set = ShaderSet::new();
    for name in ALL_SHADERS {
        assert_eq!(set.version(name), 1);
    }
}

#[test]
fn unknown_shader_has_version_zero() {
    let set = ShaderSet::new();
    assert_eq!(set.version("does_not_exist"), 0);
    assert!(set.source("does_not_exist").is_none());
}

// ============================================================================
// Reload
// ============================================================================

#[test]
fn rejected_reload_keeps_previous_source() {
    init_logging();
    let mut set = ShaderSet::new();
    let original = set.source(GEOMETRY_SHADER).unwrap().to_string();

    assert!(!set.reload(GEOMETRY_SHADER, "fn broken( {"));

    assert_eq!(set.source(GEOMETRY_SHADER).unwrap(), original);
    assert_eq!(set.version(GEOMETRY_SHADER), 1);
}

#[test]
fn reload_rejects_valid_syntax_with_invalid_semantics() {
    let mut set = ShaderSet::new();
    // Parses, but the return type does not match the declared one.
    let bad = "
@vertex
fn vs_main() -> @builtin(position) vec4<f32> {
    return 1.0;
}
";
    assert!(!set.reload(SKYBOX_SHADER, bad));
    assert_eq!(set.version(SKYBOX_SHADER), 1);
}

#[test]
fn accepted_reload_bumps_version() {
    let mut set = ShaderSet::new();

    assert!(set.reload(POST_SHADER, TRIVIAL_SHADER));

    assert_eq!(set.version(POST_SHADER), 2);
    assert_eq!(set.source(POST_SHADER).unwrap(), TRIVIAL_SHADER);
}

#[test]
fn reload_of_unknown_name_registers_it() {
    let mut set = ShaderSet::new();

    assert!(set.reload("custom_effect", TRIVIAL_SHADER));
    assert_eq!(set.version("custom_effect"), 1);
}

#[test]
fn repeated_failed_reloads_never_touch_version() {
    let mut set = ShaderSet::new();
    for _ in 0..3 {
        assert!(!set.reload(GEOMETRY_SHADER, "@@@"));
    }
    assert_eq!(set.version(GEOMETRY_SHADER), 1);
}
