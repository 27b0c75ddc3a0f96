//! Quadrangulation of polygonal meshes.
//!
//! Every face that is not a quad is split around a new center point: a face
//! with `n` vertices gets `n` edge midpoints and one center appended after the
//! coarse points, and becomes `n` quads
//! `(v[i], edge[i], center, edge[i - 1])`. Quads are kept as they are.

use super::topology::{MeshTopology, is_drawable_face};
use super::{PrimitiveIndices, average_into};

/// Per-topology table of the faces that need extra points.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuadInfo {
    /// Index of the first additional point (the number of coarse points).
    pub point_offset: usize,
    /// Number of points appended by quadrangulation.
    pub num_additional_points: usize,
    /// Largest vertex count among non-quad faces.
    pub max_num_vert: usize,
    /// Vertex count of each non-quad face, in face order.
    pub num_verts: Vec<usize>,
    /// Concatenated vertex indices of the non-quad faces.
    pub verts: Vec<u32>,
}

impl QuadInfo {
    /// Scan `topology` for non-quad faces.
    pub fn build(topology: &MeshTopology) -> Self {
        let mut info = QuadInfo {
            point_offset: topology.num_points(),
            ..QuadInfo::default()
        };

        for (_, _, vertices) in topology.faces() {
            if !is_drawable_face(vertices) || vertices.len() == 4 {
                continue;
            }
            info.num_verts.push(vertices.len());
            info.verts.extend(vertices.iter().map(|&v| v as u32));
            info.num_additional_points += vertices.len() + 1;
            info.max_num_vert = info.max_num_vert.max(vertices.len());
        }

        log::trace!(
            "QuadInfo: {} non-quad faces, {} additional points",
            info.num_verts.len(),
            info.num_additional_points
        );
        info
    }

    /// Check if the mesh is made of quads only.
    pub fn is_all_quads(&self) -> bool {
        self.num_verts.is_empty()
    }

    /// Number of points after quadrangulation.
    pub fn num_points(&self) -> usize {
        self.point_offset + self.num_additional_points
    }
}

/// Quad indices and per-quad coarse face index. Holes are skipped.
pub fn quad_indices(topology: &MeshTopology, info: &QuadInfo) -> PrimitiveIndices {
    let mut indices = Vec::new();
    let mut primitive_param = Vec::new();
    let mut next_point = info.point_offset as i32;

    for (face, _, vertices) in topology.faces() {
        if !is_drawable_face(vertices) {
            continue;
        }
        let n = vertices.len();
        if n == 4 {
            if !topology.is_hole(face) {
                indices.extend_from_slice(vertices);
                primitive_param.push(face as i32);
            }
            continue;
        }

        // Extra points of this face: n edge midpoints, then the center.
        let edge_base = next_point;
        let center = edge_base + n as i32;
        next_point += n as i32 + 1;

        if topology.is_hole(face) {
            continue;
        }
        for i in 0..n {
            let prev_edge = edge_base + ((i + n - 1) % n) as i32;
            indices.extend_from_slice(&[vertices[i], edge_base + i as i32, center, prev_edge]);
            primitive_param.push(face as i32);
        }
    }

    PrimitiveIndices {
        indices,
        verts_per_primitive: 4,
        primitive_param,
    }
}

/// Append the quadrangulation points of a vertex or varying primvar.
///
/// `data` holds the coarse values; the result holds the coarse values
/// followed by the edge midpoints and centers of every non-quad face.
pub fn quadrangulate_primvar(info: &QuadInfo, data: &[f64], components: usize) -> Vec<f64> {
    let coarse = info.point_offset * components;
    let mut result = Vec::with_capacity(info.num_points() * components);
    result.extend_from_slice(&data[..coarse.min(data.len())]);
    result.resize(coarse, 0.0);

    let mut cursor = 0usize;
    for &n in &info.num_verts {
        let face: Vec<usize> = info.verts[cursor..cursor + n]
            .iter()
            .map(|&v| v as usize)
            .collect();
        cursor += n;

        for i in 0..n {
            average_into(data, components, &[face[i], face[(i + 1) % n]], &mut result);
        }
        average_into(data, components, &face, &mut result);
    }
    result
}

/// Quadrangulate a face-varying primvar: four values per emitted quad.
///
/// Holes and degenerate faces are skipped, matching [`quad_indices`].
pub fn quadrangulate_face_varying(topology: &MeshTopology, data: &[f64], components: usize) -> Vec<f64> {
    let mut result = Vec::new();

    for (face, offset, vertices) in topology.faces() {
        if !is_drawable_face(vertices) || topology.is_hole(face) {
            continue;
        }
        let n = vertices.len();
        let corners: Vec<usize> = (offset..offset + n).collect();

        if n == 4 {
            for &corner in &corners {
                average_into(data, components, &[corner], &mut result);
            }
            continue;
        }

        for i in 0..n {
            let next = corners[(i + 1) % n];
            let prev = corners[(i + n - 1) % n];
            average_into(data, components, &[corners[i]], &mut result);
            average_into(data, components, &[corners[i], next], &mut result);
            average_into(data, components, &corners, &mut result);
            average_into(data, components, &[prev, corners[i]], &mut result);
        }
    }
    result
}
