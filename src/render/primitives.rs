//! Built-in proxy geometry: the unit sphere the point-light pass rasterizes
//! and the unit cube the skybox pass (and mesh fallback) use.

use std::f32::consts::PI;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Interleaved vertex format shared by every mesh in the engine.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

pub const VERTEX_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2],
};

/// Lat-long unit sphere of radius 1 centered at the origin.
#[must_use]
pub fn unit_sphere(segments: u32, rings: u32) -> (Vec<Vertex>, Vec<u32>) {
    let mut vertices = Vec::with_capacity(((rings + 1) * (segments + 1)) as usize);
    let mut indices = Vec::with_capacity((rings * segments * 6) as usize);

    for ring in 0..=rings {
        let phi = PI * ring as f32 / rings as f32;
        let (sin_phi, cos_phi) = phi.sin_cos();
        for segment in 0..=segments {
            let theta = 2.0 * PI * segment as f32 / segments as f32;
            let (sin_theta, cos_theta) = theta.sin_cos();

            let position = Vec3::new(sin_phi * cos_theta, cos_phi, sin_phi * sin_theta);
            vertices.push(Vertex {
                position: position.to_array(),
                normal: position.to_array(),
                uv: [
                    segment as f32 / segments as f32,
                    ring as f32 / rings as f32,
                ],
            });
        }
    }

    let stride = segments + 1;
    for ring in 0..rings {
        for segment in 0..segments {
            let a = ring * stride + segment;
            let b = a + stride;
            indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
        }
    }

    (vertices, indices)
}

/// Axis-aligned unit cube spanning [-0.5, 0.5] on each axis, 24 vertices so
/// each face carries a flat normal.
#[must_use]
pub fn unit_cube() -> (Vec<Vertex>, Vec<u32>) {
    // (normal, tangent, bitangent) per face
    const FACES: [(Vec3, Vec3, Vec3); 6] = [
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (i, (normal, tangent, bitangent)) in FACES.iter().enumerate() {
        let base = (i * 4) as u32;
        let corners = [
            (-0.5, -0.5, [0.0, 1.0]),
            (0.5, -0.5, [1.0, 1.0]),
            (0.5, 0.5, [1.0, 0.0]),
            (-0.5, 0.5, [0.0, 0.0]),
        ];
        for (u, v, uv) in corners {
            let position = *normal * 0.5 + *tangent * u + *bitangent * v;
            vertices.push(Vertex {
                position: position.to_array(),
                normal: normal.to_array(),
                uv,
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    (vertices, indices)
}
