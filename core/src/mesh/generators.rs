//! Mesh generators for common shapes.
//!
//! These generators produce a [`GeneratedMesh`]: a [`RawTopology`] plus point
//! positions, ready to be served by a scene delegate in tests and benchmarks.

use std::f32::consts::PI;

use super::topology::{RawTopology, SubdivScheme};

/// Topology and positions of a generated shape.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedMesh {
    pub topology: RawTopology,
    pub points: Vec<[f32; 3]>,
}

impl GeneratedMesh {
    /// Switch the subdivision scheme.
    pub fn with_scheme(mut self, scheme: SubdivScheme) -> Self {
        self.topology.scheme = scheme;
        self
    }

    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    pub fn num_faces(&self) -> usize {
        self.topology.face_vertex_counts.len()
    }
}

/// Generate a grid of quads on the XY plane.
///
/// # Arguments
///
/// * `columns` - Number of quads along X
/// * `rows` - Number of quads along Y
/// * `size` - Edge length of each quad
pub fn generate_grid(columns: u32, rows: u32, size: f32) -> GeneratedMesh {
    let mut points = Vec::with_capacity(((columns + 1) * (rows + 1)) as usize);
    for y in 0..=rows {
        for x in 0..=columns {
            points.push([x as f32 * size, y as f32 * size, 0.0]);
        }
    }

    let mut counts = Vec::with_capacity((columns * rows) as usize);
    let mut indices = Vec::with_capacity((columns * rows * 4) as usize);
    for y in 0..rows {
        for x in 0..columns {
            let current = (y * (columns + 1) + x) as i32;
            let above = current + columns as i32 + 1;
            counts.push(4);
            indices.extend_from_slice(&[current, current + 1, above + 1, above]);
        }
    }

    GeneratedMesh {
        topology: RawTopology::new(SubdivScheme::CatmullClark, counts, indices),
        points,
    }
}

/// Generate an axis-aligned cube of six quads centered at the origin.
pub fn generate_cube(half_extent: f32) -> GeneratedMesh {
    let h = half_extent;
    let points = vec![
        [-h, -h, -h],
        [h, -h, -h],
        [h, h, -h],
        [-h, h, -h],
        [-h, -h, h],
        [h, -h, h],
        [h, h, h],
        [-h, h, h],
    ];
    let indices = vec![
        0, 3, 2, 1, // -z
        4, 5, 6, 7, // +z
        0, 1, 5, 4, // -y
        2, 3, 7, 6, // +y
        0, 4, 7, 3, // -x
        1, 2, 6, 5, // +x
    ];

    GeneratedMesh {
        topology: RawTopology::new(SubdivScheme::CatmullClark, vec![4; 6], indices),
        points,
    }
}

/// Generate a regular tetrahedron: four triangles over four points.
pub fn generate_tetrahedron(scale: f32) -> GeneratedMesh {
    let s = scale;
    let points = vec![[s, s, s], [s, -s, -s], [-s, s, -s], [-s, -s, s]];
    let indices = vec![0, 1, 2, 0, 3, 1, 0, 2, 3, 1, 3, 2];

    GeneratedMesh {
        topology: RawTopology::new(SubdivScheme::Loop, vec![3; 4], indices),
        points,
    }
}

/// Generate a UV sphere.
///
/// Rings of quads between the poles and triangle fans at the poles, so the
/// result mixes faces of three and four vertices.
///
/// # Arguments
///
/// * `radius` - Sphere radius
/// * `segments` - Number of longitudinal segments (around the equator)
/// * `rings` - Number of latitudinal rings (from pole to pole), at least 2
pub fn generate_sphere(radius: f32, segments: u32, rings: u32) -> GeneratedMesh {
    let segments = segments.max(3);
    let rings = rings.max(2);
    let mut points = vec![[0.0, radius, 0.0]];

    for ring in 1..rings {
        let theta = ring as f32 * PI / rings as f32;
        for segment in 0..segments {
            let phi = segment as f32 * 2.0 * PI / segments as f32;
            points.push([
                theta.sin() * phi.cos() * radius,
                theta.cos() * radius,
                theta.sin() * phi.sin() * radius,
            ]);
        }
    }
    let south = points.len() as i32;
    points.push([0.0, -radius, 0.0]);

    let ring_start = |ring: u32| 1 + ((ring - 1) * segments) as i32;
    let mut counts = Vec::new();
    let mut indices = Vec::new();

    for segment in 0..segments {
        let next = (segment + 1) % segments;
        counts.push(3);
        indices.extend_from_slice(&[0, ring_start(1) + next as i32, ring_start(1) + segment as i32]);
    }
    for ring in 1..rings - 1 {
        for segment in 0..segments {
            let next = (segment + 1) % segments;
            let current = ring_start(ring);
            let below = ring_start(ring + 1);
            counts.push(4);
            indices.extend_from_slice(&[
                current + segment as i32,
                current + next as i32,
                below + next as i32,
                below + segment as i32,
            ]);
        }
    }
    let last = ring_start(rings - 1);
    for segment in 0..segments {
        let next = (segment + 1) % segments;
        counts.push(3);
        indices.extend_from_slice(&[south, last + segment as i32, last + next as i32]);
    }

    GeneratedMesh {
        topology: RawTopology::new(SubdivScheme::CatmullClark, counts, indices),
        points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_bound(mesh: &GeneratedMesh) -> i32 {
        mesh.topology.face_vertex_indices.iter().copied().max().unwrap_or(-1) + 1
    }

    #[test]
    fn test_grid_counts() {
        let grid = generate_grid(3, 2, 1.0);
        assert_eq!(grid.num_points(), 12);
        assert_eq!(grid.num_faces(), 6);
        assert_eq!(index_bound(&grid), 12);
    }

    #[test]
    fn test_cube_counts() {
        let cube = generate_cube(1.0);
        assert_eq!(cube.num_points(), 8);
        assert_eq!(cube.num_faces(), 6);
    }

    #[test]
    fn test_tetrahedron_is_four_triangles() {
        let tetrahedron = generate_tetrahedron(1.0);
        assert_eq!(tetrahedron.topology.face_vertex_counts, vec![3; 4]);
        assert_eq!(index_bound(&tetrahedron), 4);
    }

    #[test]
    fn test_sphere_counts() {
        let sphere = generate_sphere(1.0, 8, 4);
        // Two poles plus three inner rings.
        assert_eq!(sphere.num_points(), 2 + 3 * 8);
        // Two fans plus two rings of quads.
        assert_eq!(sphere.num_faces(), 8 * 4);
        assert_eq!(index_bound(&sphere) as usize, sphere.num_points());
    }
}
