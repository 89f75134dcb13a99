use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3};
use rand::Rng;
use std::collections::HashMap;
use std::f32::consts::PI;

use crate::math::CatmullRomCurve;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
        ],
    };

    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topology {
    Triangles,
    Lines,
    Points,
}

/// CPU-side geometry handed to the render host for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub topology: Topology,
}

impl MeshData {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>, topology: Topology) -> Self {
        Self {
            vertices,
            indices,
            topology,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Byte size of the vertex and index data.
    pub fn byte_size(&self) -> u64 {
        (self.vertices.len() * std::mem::size_of::<Vertex>()
            + self.indices.len() * std::mem::size_of::<u32>()) as u64
    }

    /// Geodesic sphere: an icosahedron whose faces are split into
    /// `(detail + 1)^2` triangles and projected onto the sphere. Every
    /// triangle owns its three vertices.
    pub fn icosahedron(radius: f32, detail: u32) -> Self {
        let t = (1.0 + 5.0_f32.sqrt()) / 2.0;
        let corners = [
            Vec3::new(-1.0, t, 0.0),
            Vec3::new(1.0, t, 0.0),
            Vec3::new(-1.0, -t, 0.0),
            Vec3::new(1.0, -t, 0.0),
            Vec3::new(0.0, -1.0, t),
            Vec3::new(0.0, 1.0, t),
            Vec3::new(0.0, -1.0, -t),
            Vec3::new(0.0, 1.0, -t),
            Vec3::new(t, 0.0, -1.0),
            Vec3::new(t, 0.0, 1.0),
            Vec3::new(-t, 0.0, -1.0),
            Vec3::new(-t, 0.0, 1.0),
        ];
        const FACES: [[usize; 3]; 20] = [
            [0, 11, 5],
            [0, 5, 1],
            [0, 1, 7],
            [0, 7, 10],
            [0, 10, 11],
            [1, 5, 9],
            [5, 11, 4],
            [11, 10, 2],
            [10, 7, 6],
            [7, 1, 8],
            [3, 9, 4],
            [3, 4, 2],
            [3, 2, 6],
            [3, 6, 8],
            [3, 8, 9],
            [4, 9, 5],
            [2, 4, 11],
            [6, 2, 10],
            [8, 6, 7],
            [9, 8, 1],
        ];

        let cols = detail as usize + 1;
        let mut positions: Vec<Vec3> = Vec::with_capacity(20 * cols * cols * 3);

        for [ia, ib, ic] in FACES {
            let (a, b, c) = (corners[ia], corners[ib], corners[ic]);

            let mut grid: Vec<Vec<Vec3>> = Vec::with_capacity(cols + 1);
            for i in 0..=cols {
                let aj = a.lerp(c, i as f32 / cols as f32);
                let bj = b.lerp(c, i as f32 / cols as f32);
                let rows = cols - i;
                let row = (0..=rows)
                    .map(|j| match j {
                        0 => aj,
                        j if j == rows => bj,
                        _ => aj.lerp(bj, j as f32 / rows as f32),
                    })
                    .collect();
                grid.push(row);
            }

            for i in 0..cols {
                for j in 0..(2 * (cols - i) - 1) {
                    let k = j / 2;
                    if j % 2 == 0 {
                        positions.extend([grid[i][k + 1], grid[i + 1][k], grid[i][k]]);
                    } else {
                        positions.extend([grid[i][k + 1], grid[i + 1][k + 1], grid[i + 1][k]]);
                    }
                }
            }
        }

        let vertices: Vec<Vertex> = positions
            .into_iter()
            .map(|p| {
                let n = p.normalize();
                Vertex::new(n * radius, n)
            })
            .collect();
        let indices = (0..vertices.len() as u32).collect();

        Self::new(vertices, indices, Topology::Triangles)
    }

    pub fn sphere(radius: f32, segments: u32, rings: u32) -> Self {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for ring in 0..=rings {
            let phi = PI * ring as f32 / rings as f32;
            let sin_phi = phi.sin();
            let cos_phi = phi.cos();

            for seg in 0..=segments {
                let theta = 2.0 * PI * seg as f32 / segments as f32;
                let normal = Vec3::new(sin_phi * theta.cos(), cos_phi, sin_phi * theta.sin());
                vertices.push(Vertex::new(normal * radius, normal));
            }
        }

        for ring in 0..rings {
            for seg in 0..segments {
                let curr_ring = ring * (segments + 1);
                let next_ring = (ring + 1) * (segments + 1);

                indices.extend([curr_ring + seg, next_ring + seg, next_ring + seg + 1]);
                indices.extend([curr_ring + seg, next_ring + seg + 1, curr_ring + seg + 1]);
            }
        }

        Self::new(vertices, indices, Topology::Triangles)
    }

    pub fn cylinder(radius: f32, height: f32, segments: u32) -> Self {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        let half_height = height / 2.0;

        for i in 0..=segments {
            let theta = 2.0 * PI * i as f32 / segments as f32;
            let (x, z) = (theta.cos(), theta.sin());
            let normal = Vec3::new(x, 0.0, z);
            vertices.push(Vertex::new(Vec3::new(x * radius, -half_height, z * radius), normal));
            vertices.push(Vertex::new(Vec3::new(x * radius, half_height, z * radius), normal));
        }

        for i in 0..segments {
            let base = i * 2;
            indices.extend([base, base + 1, base + 3]);
            indices.extend([base, base + 3, base + 2]);
        }

        for (y, normal_y) in [(-half_height, -1.0), (half_height, 1.0)] {
            let center_idx = vertices.len() as u32;
            let normal = Vec3::new(0.0, normal_y, 0.0);
            vertices.push(Vertex::new(Vec3::new(0.0, y, 0.0), normal));

            for i in 0..=segments {
                let theta = 2.0 * PI * i as f32 / segments as f32;
                vertices.push(Vertex::new(
                    Vec3::new(theta.cos() * radius, y, theta.sin() * radius),
                    normal,
                ));
            }

            for i in 0..segments {
                if normal_y < 0.0 {
                    indices.extend([center_idx, center_idx + 2 + i, center_idx + 1 + i]);
                } else {
                    indices.extend([center_idx, center_idx + 1 + i, center_idx + 2 + i]);
                }
            }
        }

        Self::new(vertices, indices, Topology::Triangles)
    }

    /// The twelve edges of an axis-aligned box.
    pub fn box_edges(half_extents: Vec3) -> Self {
        let Vec3 { x: hx, y: hy, z: hz } = half_extents;
        let vertices = [
            Vec3::new(-hx, -hy, -hz),
            Vec3::new(hx, -hy, -hz),
            Vec3::new(hx, hy, -hz),
            Vec3::new(-hx, hy, -hz),
            Vec3::new(-hx, -hy, hz),
            Vec3::new(hx, -hy, hz),
            Vec3::new(hx, hy, hz),
            Vec3::new(-hx, hy, hz),
        ]
        .into_iter()
        .map(|p| Vertex::new(p, p.normalize_or_zero()))
        .collect();

        #[rustfmt::skip]
        let indices = vec![
            0, 1, 1, 2, 2, 3, 3, 0,
            4, 5, 5, 6, 6, 7, 7, 4,
            0, 4, 1, 5, 2, 6, 3, 7,
        ];

        Self::new(vertices, indices, Topology::Lines)
    }

    /// Ring and longitudinal edges of a closed tube swept along `curve`.
    pub fn tube_edges(
        curve: &CatmullRomCurve,
        tubular_segments: u32,
        radius: f32,
        radial_segments: u32,
    ) -> Self {
        let frames = parallel_transport_frames(curve, tubular_segments);
        let mut vertices = Vec::with_capacity((tubular_segments * radial_segments) as usize);

        for (i, (normal, binormal)) in frames.iter().enumerate() {
            let center = curve.point_at(i as f32 / tubular_segments as f32);
            for j in 0..radial_segments {
                let v = j as f32 / radial_segments as f32 * 2.0 * PI;
                let offset = (-v.cos() * *normal + v.sin() * *binormal).normalize_or_zero();
                vertices.push(Vertex::new(center + offset * radius, offset));
            }
        }

        let mut indices = Vec::new();
        for i in 0..tubular_segments {
            let next_ring = (i + 1) % tubular_segments;
            for j in 0..radial_segments {
                let current = i * radial_segments + j;
                indices.extend([current, i * radial_segments + (j + 1) % radial_segments]);
                indices.extend([current, next_ring * radial_segments + j]);
            }
        }

        Self::new(vertices, indices, Topology::Lines)
    }

    /// Points scattered over a spherical shell between the two radii.
    pub fn star_shell<R: Rng + ?Sized>(
        count: usize,
        inner_radius: f32,
        outer_radius: f32,
        rng: &mut R,
    ) -> Self {
        let vertices: Vec<Vertex> = (0..count)
            .map(|_| {
                let u: f32 = rng.gen_range(-1.0..1.0);
                let theta = rng.gen_range(0.0..2.0 * PI);
                let ring = (1.0 - u * u).sqrt();
                let direction = Vec3::new(ring * theta.cos(), u, ring * theta.sin());
                let radius = rng.gen_range(inner_radius..outer_radius);
                Vertex::new(direction * radius, direction)
            })
            .collect();
        let indices = (0..vertices.len() as u32).collect();

        Self::new(vertices, indices, Topology::Points)
    }

    /// Replaces vertex normals with face normals.
    ///
    /// Only meaningful for triangle meshes whose triangles do not share
    /// vertices, such as [`MeshData::icosahedron`].
    pub fn flat_shaded(mut self) -> Self {
        if self.topology != Topology::Triangles {
            return self;
        }

        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| Vec3::from(self.vertices[i as usize].position));
            let normal = (b - a).cross(c - a).normalize_or_zero();
            for &i in tri {
                self.vertices[i as usize].normal = normal.to_array();
            }
        }
        self
    }

    /// Line mesh tracing every distinct triangle edge.
    pub fn wireframe(&self) -> Self {
        if self.topology != Topology::Triangles {
            return self.clone();
        }

        // Triangles may duplicate vertices, so edges are keyed by position.
        let key = |i: u32| self.vertices[i as usize].position.map(f32::to_bits);
        let mut seen = HashMap::new();
        let mut indices = Vec::new();

        for tri in self.indices.chunks_exact(3) {
            for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                let (ka, kb) = (key(a), key(b));
                let edge = if ka <= kb { (ka, kb) } else { (kb, ka) };
                if seen.insert(edge, ()).is_none() {
                    indices.extend([a, b]);
                }
            }
        }

        Self::new(self.vertices.clone(), indices, Topology::Lines)
    }
}

/// Transform that stretches a unit cylinder (height 1 along Y) between two
/// points.
pub fn bone_transform(start: Vec3, end: Vec3, thickness: f32) -> Mat4 {
    let direction = end - start;
    let length = direction.length();

    if length < 0.0001 {
        return Mat4::from_translation(start);
    }

    let rotation = Quat::from_rotation_arc(Vec3::Y, direction / length);
    let center = (start + end) / 2.0;

    Mat4::from_scale_rotation_translation(Vec3::new(thickness, length, thickness), rotation, center)
}

fn parallel_transport_frames(curve: &CatmullRomCurve, segments: u32) -> Vec<(Vec3, Vec3)> {
    let tangents: Vec<Vec3> = (0..segments)
        .map(|i| curve.tangent_at(i as f32 / segments as f32))
        .collect();

    let Some(&first) = tangents.first() else {
        return Vec::new();
    };

    let abs = first.abs();
    let axis = if abs.x <= abs.y && abs.x <= abs.z {
        Vec3::X
    } else if abs.y <= abs.z {
        Vec3::Y
    } else {
        Vec3::Z
    };
    let mut normal = first.cross(first.cross(axis)).normalize_or_zero();

    let mut frames = Vec::with_capacity(tangents.len());
    frames.push((normal, first.cross(normal)));

    for pair in tangents.windows(2) {
        let (prev, tangent) = (pair[0], pair[1]);
        let axis = prev.cross(tangent);
        if axis.length() > f32::EPSILON {
            let angle = prev.dot(tangent).clamp(-1.0, 1.0).acos();
            normal = Quat::from_axis_angle(axis.normalize(), angle) * normal;
        }
        frames.push((normal, tangent.cross(normal)));
    }

    frames
}
