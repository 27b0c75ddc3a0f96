//! CPU-side mesh topology and derived-data kernels.
//!
//! This module provides GPU-agnostic mesh building blocks:
//!
//! - [`RawTopology`] / [`MeshTopology`] - scene topology and its canonical,
//!   hashable form
//! - [`SubdivTags`] - creases, corners, holes and boundary rules
//! - [`QuadInfo`] and quadrangulation of indices and primvars
//! - Fan triangulation of indices and face-varying primvars
//! - [`SubdivisionTables`] - uniform Catmull-Clark, Loop and bilinear refinement
//! - [`VertexAdjacency`] - per-point neighborhoods and smooth normals
//! - Generators for test shapes (grid, cube, tetrahedron, sphere)
//!
//! Kernels operate on components widened to `f64`; [`transform_source`]
//! converts a [`BufferSource`] there and back.

pub mod adjacency;
pub mod generators;
pub mod quadrangulate;
pub mod subdivision;
mod tags;
mod topology;
pub mod triangulate;

pub use adjacency::{VertexAdjacency, pack_normal, unpack_normal};
pub use quadrangulate::QuadInfo;
pub use subdivision::{Interpolation, SubdivisionTables};
pub use tags::{BoundaryInterpolation, SubdivTags, edge_key};
pub use topology::{MeshTopology, RawTopology, RefineMode, SubdivScheme};

use crate::buffer::{BufferData, BufferSource};

/// Index buffer contents produced by an index builder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrimitiveIndices {
    /// Flat vertex indices, `verts_per_primitive` per primitive.
    pub indices: Vec<i32>,
    /// 1 for points, 3 for triangles, 4 for quads.
    pub verts_per_primitive: usize,
    /// Coarse face index of each primitive. Empty for points.
    pub primitive_param: Vec<i32>,
}

impl PrimitiveIndices {
    /// Number of primitives.
    pub fn num_primitives(&self) -> usize {
        if self.verts_per_primitive == 0 {
            0
        } else {
            self.indices.len() / self.verts_per_primitive
        }
    }
}

/// Indices `0..num_points`, one point primitive each.
pub fn points_indices(topology: &MeshTopology) -> PrimitiveIndices {
    PrimitiveIndices {
        indices: (0..topology.num_points() as i32).collect(),
        verts_per_primitive: 1,
        primitive_param: Vec::new(),
    }
}

/// Apply a component kernel to `source`, keeping its name, role and format.
///
/// The kernel receives the components widened to `f64` plus the number of
/// components per element, and returns the new components. Integer data is
/// rounded back. Returns `None` for packed data, which cannot be interpolated.
pub fn transform_source<F>(source: &BufferSource, kernel: F) -> Option<BufferSource>
where
    F: FnOnce(&[f64], usize) -> Vec<f64>,
{
    let components = source.format().components();
    let data = match source.data().as_ref() {
        BufferData::Float(values) => {
            let wide: Vec<f64> = values.iter().map(|&v| v as f64).collect();
            BufferData::Float(kernel(&wide, components).into_iter().map(|v| v as f32).collect())
        }
        BufferData::Double(values) => BufferData::Double(kernel(values, components)),
        BufferData::Int(values) => {
            let wide: Vec<f64> = values.iter().map(|&v| v as f64).collect();
            BufferData::Int(
                kernel(&wide, components)
                    .into_iter()
                    .map(|v| v.round() as i32)
                    .collect(),
            )
        }
        BufferData::Packed(_) => return None,
    };
    Some(BufferSource::new(
        source.name(),
        source.role(),
        source.format(),
        data,
    ))
}

/// Average of the elements at `indices`, accumulated into `out`.
pub(crate) fn average_into(data: &[f64], components: usize, indices: &[usize], out: &mut Vec<f64>) {
    let count = indices.len().max(1) as f64;
    for c in 0..components {
        let sum: f64 = indices
            .iter()
            .map(|&i| data.get(i * components + c).copied().unwrap_or(0.0))
            .sum();
        out.push(sum / count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{BufferRole, ElementFormat};

    #[test]
    fn test_points_indices_cover_all_points() {
        let raw = RawTopology::new(SubdivScheme::None, [3, 3], [0, 1, 2, 2, 1, 3]);
        let topology = MeshTopology::new(raw, 0, RefineMode::Uniform, SubdivTags::default());
        let points = points_indices(&topology);
        assert_eq!(points.indices, vec![0, 1, 2, 3]);
        assert_eq!(points.num_primitives(), 4);
    }

    #[test]
    fn test_transform_keeps_format() {
        let source = BufferSource::from_f32("width", BufferRole::Primvar, vec![1.0, 3.0]);
        let doubled = transform_source(&source, |data, _| data.iter().map(|v| v * 2.0).collect()).unwrap();
        assert_eq!(doubled.format(), ElementFormat::Float);
        assert_eq!(doubled.data().as_f32().unwrap(), &[2.0, 6.0]);
    }

    #[test]
    fn test_transform_rejects_packed() {
        let source = BufferSource::new(
            "normals",
            BufferRole::Normals,
            ElementFormat::PackedNormal,
            BufferData::Packed(vec![0]),
        );
        assert!(transform_source(&source, |data, _| data.to_vec()).is_none());
    }
}
