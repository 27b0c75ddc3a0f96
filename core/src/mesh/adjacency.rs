//! Vertex adjacency and smooth normals.
//!
//! For every point the adjacency table lists, per incident face, the face's
//! previous and next vertex around that point. The smooth normal of a point
//! is the normalized sum of the cross products of those neighbor pairs, which
//! weights each face by its corner area.
//!
//! # GPU table layout
//!
//! [`VertexAdjacency::table`] flattens the adjacency for upload: one
//! `(offset, count)` header per point, followed by the `(prev, next)` pairs.
//! Offsets are absolute indices into the table.

use super::topology::{MeshTopology, is_drawable_face};

/// Per-point neighbor pairs, built once per topology.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexAdjacency {
    num_points: usize,
    offsets: Vec<u32>,
    pairs: Vec<[u32; 2]>,
}

impl VertexAdjacency {
    /// Build the adjacency of `topology`. Degenerate faces are skipped.
    pub fn build(topology: &MeshTopology) -> Self {
        let num_points = topology.num_points();
        let mut per_point: Vec<Vec<[u32; 2]>> = vec![Vec::new(); num_points];

        for (_, _, vertices) in topology.faces() {
            if !is_drawable_face(vertices) {
                continue;
            }
            let n = vertices.len();
            for i in 0..n {
                let prev = vertices[(i + n - 1) % n] as u32;
                let next = vertices[(i + 1) % n] as u32;
                per_point[vertices[i] as usize].push([prev, next]);
            }
        }

        let mut offsets = Vec::with_capacity(num_points + 1);
        let mut pairs = Vec::new();
        offsets.push(0);
        for neighbors in per_point {
            pairs.extend(neighbors);
            offsets.push(pairs.len() as u32);
        }

        Self {
            num_points,
            offsets,
            pairs,
        }
    }

    pub fn num_points(&self) -> usize {
        self.num_points
    }

    /// `(prev, next)` neighbor pairs of `point`, one per incident face.
    pub fn neighbors(&self, point: usize) -> &[[u32; 2]] {
        match (self.offsets.get(point), self.offsets.get(point + 1)) {
            (Some(&start), Some(&end)) => &self.pairs[start as usize..end as usize],
            _ => &[],
        }
    }

    /// Flattened table for GPU upload.
    pub fn table(&self) -> Vec<i32> {
        let header = self.num_points * 2;
        let mut table = Vec::with_capacity(header + self.pairs.len() * 2);
        for point in 0..self.num_points {
            let start = self.offsets[point] as usize;
            let count = self.offsets[point + 1] as usize - start;
            table.push((header + start * 2) as i32);
            table.push(count as i32);
        }
        for pair in &self.pairs {
            table.push(pair[0] as i32);
            table.push(pair[1] as i32);
        }
        table
    }

    /// Smooth normals of `points` (three components per point).
    ///
    /// Points beyond the adjacency get no contribution; isolated points and
    /// degenerate neighborhoods get a zero normal.
    pub fn smooth_normals(&self, points: &[f64]) -> Vec<[f64; 3]> {
        let num_points = points.len() / 3;
        let point = |index: u32| -> Option<[f64; 3]> {
            let i = index as usize;
            (i < num_points).then(|| [points[i * 3], points[i * 3 + 1], points[i * 3 + 2]])
        };

        (0..num_points)
            .map(|index| {
                let Some(p) = point(index as u32) else {
                    return [0.0; 3];
                };
                let mut sum = [0.0; 3];
                for &[prev, next] in self.neighbors(index) {
                    let (Some(prev), Some(next)) = (point(prev), point(next)) else {
                        continue;
                    };
                    let n = cross(sub(next, p), sub(prev, p));
                    sum = [sum[0] + n[0], sum[1] + n[1], sum[2] + n[2]];
                }
                normalize(sum)
            })
            .collect()
    }
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn normalize(v: [f64; 3]) -> [f64; 3] {
    let length = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if length > 0.0 {
        [v[0] / length, v[1] / length, v[2] / length]
    } else {
        [0.0; 3]
    }
}

/// Pack a unit vector into signed 2_10_10_10 components (x in the low bits).
pub fn pack_normal(normal: [f32; 3]) -> u32 {
    let pack = |v: f32| -> u32 {
        let scaled = (v.clamp(-1.0, 1.0) * 511.0).round() as i32;
        (scaled as u32) & 0x3ff
    };
    pack(normal[0]) | (pack(normal[1]) << 10) | (pack(normal[2]) << 20)
}

/// Inverse of [`pack_normal`].
pub fn unpack_normal(packed: u32) -> [f32; 3] {
    let unpack = |bits: u32| -> f32 {
        // Sign-extend the 10-bit field.
        let value = ((bits << 22) as i32) >> 22;
        (value as f32 / 511.0).max(-1.0)
    };
    [
        unpack(packed & 0x3ff),
        unpack((packed >> 10) & 0x3ff),
        unpack((packed >> 20) & 0x3ff),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{RawTopology, RefineMode, SubdivScheme, SubdivTags};

    fn unit_quad() -> (MeshTopology, Vec<f64>) {
        let raw = RawTopology::new(SubdivScheme::CatmullClark, [4], [0, 1, 2, 3]);
        let topology = MeshTopology::new(raw, 0, RefineMode::Uniform, SubdivTags::default());
        let points = vec![
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            1.0, 1.0, 0.0, //
            0.0, 1.0, 0.0,
        ];
        (topology, points)
    }

    #[test]
    fn test_neighbors() {
        let (topology, _) = unit_quad();
        let adjacency = VertexAdjacency::build(&topology);
        assert_eq!(adjacency.neighbors(0), &[[3, 1]]);
        assert_eq!(adjacency.neighbors(2), &[[1, 3]]);
        assert!(adjacency.neighbors(9).is_empty());
    }

    #[test]
    fn test_flat_quad_normals_point_up() {
        let (topology, points) = unit_quad();
        let normals = VertexAdjacency::build(&topology).smooth_normals(&points);
        assert_eq!(normals.len(), 4);
        for normal in normals {
            assert!((normal[2] - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_table_layout() {
        let (topology, _) = unit_quad();
        let table = VertexAdjacency::build(&topology).table();
        assert_eq!(table.len(), 4 * 2 + 4 * 2);
        // Point 1 pairs start after the header and point 0's pair.
        assert_eq!(&table[2..4], &[10, 1]);
        assert_eq!(&table[10..12], &[0, 2]);
    }

    #[test]
    fn test_missing_points_yield_zero_normals() {
        let (topology, points) = unit_quad();
        let normals = VertexAdjacency::build(&topology).smooth_normals(&points[..6]);
        assert_eq!(normals, vec![[0.0; 3]; 2]);
    }

    #[test]
    fn test_pack_round_trip_is_close() {
        let normal = [0.6, -0.8, 0.0];
        let unpacked = unpack_normal(pack_normal(normal));
        for (a, b) in normal.iter().zip(unpacked) {
            assert!((a - b).abs() < 2.0 / 511.0);
        }
        assert_eq!(unpack_normal(pack_normal([0.0, 0.0, -1.0]))[2], -1.0);
    }
}
