//! Fan triangulation.

use super::topology::{MeshTopology, is_drawable_face};
use super::{PrimitiveIndices, average_into};

/// Triangle indices and per-triangle coarse face index. Holes are skipped.
pub fn triangle_indices(topology: &MeshTopology) -> PrimitiveIndices {
    let mut indices = Vec::new();
    let mut primitive_param = Vec::new();

    for (face, _, vertices) in topology.faces() {
        if !is_drawable_face(vertices) || topology.is_hole(face) {
            continue;
        }
        for i in 1..vertices.len() - 1 {
            indices.extend_from_slice(&[vertices[0], vertices[i], vertices[i + 1]]);
            primitive_param.push(face as i32);
        }
    }

    PrimitiveIndices {
        indices,
        verts_per_primitive: 3,
        primitive_param,
    }
}

/// Triangulate a face-varying primvar: three values per emitted triangle.
pub fn triangulate_face_varying(topology: &MeshTopology, data: &[f64], components: usize) -> Vec<f64> {
    let mut result = Vec::new();

    for (face, offset, vertices) in topology.faces() {
        if !is_drawable_face(vertices) || topology.is_hole(face) {
            continue;
        }
        for i in 1..vertices.len() - 1 {
            for corner in [offset, offset + i, offset + i + 1] {
                average_into(data, components, &[corner], &mut result);
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{RawTopology, RefineMode, SubdivScheme, SubdivTags};

    fn pentagon_and_triangle() -> MeshTopology {
        let raw = RawTopology::new(SubdivScheme::None, [5, 3, 2], [0, 1, 2, 3, 4, 4, 3, 5, 0, 1]);
        MeshTopology::new(raw, 0, RefineMode::Uniform, SubdivTags::default())
    }

    #[test]
    fn test_fan_triangulation() {
        let triangles = triangle_indices(&pentagon_and_triangle());
        assert_eq!(triangles.num_primitives(), 4);
        assert_eq!(
            triangles.indices,
            vec![0, 1, 2, 0, 2, 3, 0, 3, 4, 4, 3, 5]
        );
        assert_eq!(triangles.primitive_param, vec![0, 0, 0, 1]);
    }

    #[test]
    fn test_face_varying_follows_triangles() {
        let data: Vec<f64> = (0..20).map(|i| i as f64).collect();
        // Two components per corner.
        let result = triangulate_face_varying(&pentagon_and_triangle(), &data, 2);
        assert_eq!(result.len(), 4 * 3 * 2);
        // Second triangle of the pentagon uses corners 0, 2, 3.
        assert_eq!(&result[6..12], &[0.0, 1.0, 4.0, 5.0, 6.0, 7.0]);
        // The triangle face starts at corner 5.
        assert_eq!(&result[18..24], &[10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
    }
}
