use std::f32::consts::TAU;

use glam::Vec3;

use crate::config::KnotParams;

/// Floats per interleaved vertex: position followed by normal.
pub const VERTEX_STRIDE: usize = 6;

/// CPU-side triangle mesh with interleaved `[px, py, pz, nx, ny, nz]` vertices.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshData {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / VERTEX_STRIDE
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    fn push_vertex(&mut self, position: Vec3, normal: Vec3) {
        self.vertices.extend_from_slice(&position.to_array());
        self.vertices.extend_from_slice(&normal.to_array());
    }
}

/// Builds a (p, q) torus knot swept with a circular tube.
///
/// The tube frame at each step is derived from the curve tangent and the
/// direction back to the curve's centre, so normals point radially out of
/// the tube.
pub fn torus_knot(params: &KnotParams) -> MeshData {
    let tubular = params.tubular_segments.max(3);
    let radial = params.radial_segments.max(3);
    let p = params.p.max(1) as f32;
    let q = params.q as f32;

    let mut mesh = MeshData {
        vertices: Vec::with_capacity(((tubular + 1) * (radial + 1)) as usize * VERTEX_STRIDE),
        indices: Vec::with_capacity((tubular * radial * 6) as usize),
    };

    for i in 0..=tubular {
        let u = i as f32 / tubular as f32 * p * TAU;
        let p1 = knot_point(u, p, q, params.radius);
        let p2 = knot_point(u + 0.01, p, q, params.radius);

        let tangent = p2 - p1;
        let mut normal = p2 + p1;
        let binormal = tangent.cross(normal).normalize_or_zero();
        normal = binormal.cross(tangent).normalize_or_zero();

        for j in 0..=radial {
            let v = j as f32 / radial as f32 * TAU;
            let cx = -params.tube * v.cos();
            let cy = params.tube * v.sin();
            let position = p1 + normal * cx + binormal * cy;
            mesh.push_vertex(position, (position - p1).normalize_or_zero());
        }
    }

    let row = radial + 1;
    for j in 1..=tubular {
        for i in 1..=radial {
            let a = row * (j - 1) + (i - 1);
            let b = row * j + (i - 1);
            let c = row * j + i;
            let d = row * (j - 1) + i;
            mesh.indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }

    mesh
}

fn knot_point(u: f32, p: f32, q: f32, radius: f32) -> Vec3 {
    let qu_over_p = q / p * u;
    let cs = qu_over_p.cos();
    Vec3::new(
        radius * (2.0 + cs) * 0.5 * u.cos(),
        radius * (2.0 + cs) * 0.5 * u.sin(),
        radius * qu_over_p.sin() * 0.5,
    )
}
