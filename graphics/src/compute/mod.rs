//! Derived-data computations.
//!
//! Three kinds of work are produced while syncing a drawable:
//!
//! - [`CpuComputation`] - a chain rooted at a buffer source that is resolved
//!   synchronously during sync (refinement, quadrangulation, triangulation,
//!   smooth normals)
//! - [`GpuComputation`] - an opaque token executed against a storage range
//!   at commit, in submission order
//! - [`TopologyComputation`] - one-time per-topology work (preprocessing
//!   tables, index buffers, adjacency) enqueued by the first instance of a
//!   registry entry
//!
//! The [`ComputationScheduler`] keeps a drawable's CPU and GPU work in
//! discovery order.

mod gpu;
mod scheduler;

pub use gpu::GpuComputation;
pub use scheduler::ComputationScheduler;

use std::fmt;
use std::sync::Arc;

use strata_core::buffer::{BufferData, BufferRole, BufferSource, ElementFormat, ScalarType, names};
use strata_core::mesh::quadrangulate::{
    quad_indices, quadrangulate_face_varying, quadrangulate_primvar,
};
use strata_core::mesh::triangulate::{triangle_indices, triangulate_face_varying};
use strata_core::mesh::{
    Interpolation, MeshTopology, PrimitiveIndices, pack_normal, points_indices, transform_source,
};

use crate::error::SyncResult;
use crate::mesh::{IndexKind, SharedAdjacency};
use crate::resources::RangeHandle;

// ============================================================================
// CPU computations
// ============================================================================

/// A CPU computation chain.
///
/// Every variant except [`Source`](Self::Source) transforms the output of its
/// input, so routing a primvar through smooth normals and then refinement is
/// `Refine { input: SmoothNormals { points: Source(..) } }`.
#[derive(Clone)]
pub enum CpuComputation {
    /// Leaf of a chain: a source used as is.
    Source(BufferSource),
    /// Uniform subdivision of a vertex or varying primvar. The output holds
    /// the coarse values followed by the refined ones.
    Refine {
        input: Box<CpuComputation>,
        topology: Arc<MeshTopology>,
        interpolation: Interpolation,
    },
    /// Append edge and center values for every non-quad face.
    Quadrangulate {
        input: Box<CpuComputation>,
        topology: Arc<MeshTopology>,
    },
    /// Expand face-varying values to four per emitted quad.
    QuadrangulateFaceVarying {
        input: Box<CpuComputation>,
        topology: Arc<MeshTopology>,
    },
    /// Expand face-varying values to three per emitted triangle.
    TriangulateFaceVarying {
        input: Box<CpuComputation>,
        topology: Arc<MeshTopology>,
    },
    /// Smooth normals of the coarse points.
    SmoothNormals {
        points: Box<CpuComputation>,
        adjacency: Arc<SharedAdjacency>,
        packed: bool,
    },
}

impl CpuComputation {
    /// Wrap `self` in a refinement step.
    pub fn refined(self, topology: &Arc<MeshTopology>, interpolation: Interpolation) -> Self {
        Self::Refine {
            input: Box::new(self),
            topology: Arc::clone(topology),
            interpolation,
        }
    }

    /// Wrap `self` in a quadrangulation step.
    pub fn quadrangulated(self, topology: &Arc<MeshTopology>) -> Self {
        Self::Quadrangulate {
            input: Box::new(self),
            topology: Arc::clone(topology),
        }
    }

    /// Name of the buffer the chain produces.
    pub fn output_name(&self) -> &str {
        match self {
            Self::Source(source) => source.name(),
            Self::Refine { input, .. }
            | Self::Quadrangulate { input, .. }
            | Self::QuadrangulateFaceVarying { input, .. }
            | Self::TriangulateFaceVarying { input, .. } => input.output_name(),
            Self::SmoothNormals { packed: true, .. } => names::PACKED_SMOOTH_NORMALS,
            Self::SmoothNormals { packed: false, .. } => names::SMOOTH_NORMALS,
        }
    }

    /// Run the chain.
    ///
    /// Returns `None` when a step cannot be applied (packed input to an
    /// interpolating step, non-vector points); the reason is logged.
    pub fn resolve(&self) -> Option<BufferSource> {
        match self {
            Self::Source(source) => Some(source.clone()),
            Self::Refine {
                input,
                topology,
                interpolation,
            } => {
                let source = input.resolve()?;
                let tables = topology.subdivision_tables();
                checked(&source, "refine", |data, components| {
                    tables.refine(data, components, *interpolation)
                })
            }
            Self::Quadrangulate { input, topology } => {
                let source = input.resolve()?;
                let info = topology.quad_info();
                checked(&source, "quadrangulate", |data, components| {
                    quadrangulate_primvar(info, data, components)
                })
            }
            Self::QuadrangulateFaceVarying { input, topology } => {
                let source = input.resolve()?;
                checked(&source, "quadrangulate", |data, components| {
                    quadrangulate_face_varying(topology, data, components)
                })
            }
            Self::TriangulateFaceVarying { input, topology } => {
                let source = input.resolve()?;
                checked(&source, "triangulate", |data, components| {
                    triangulate_face_varying(topology, data, components)
                })
            }
            Self::SmoothNormals {
                points,
                adjacency,
                packed,
            } => {
                let points = points.resolve()?;
                let name = self.output_name().to_string();
                smooth_normals_source(&points, adjacency, name, *packed)
            }
        }
    }
}

impl fmt::Debug for CpuComputation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source(source) => write!(f, "Source({})", source.name()),
            Self::Refine { input, .. } => write!(f, "Refine({:?})", input),
            Self::Quadrangulate { input, .. } => write!(f, "Quadrangulate({:?})", input),
            Self::QuadrangulateFaceVarying { input, .. } => {
                write!(f, "QuadrangulateFaceVarying({:?})", input)
            }
            Self::TriangulateFaceVarying { input, .. } => {
                write!(f, "TriangulateFaceVarying({:?})", input)
            }
            Self::SmoothNormals { points, packed, .. } => {
                write!(f, "SmoothNormals({:?}, packed: {})", points, packed)
            }
        }
    }
}

fn checked<F>(source: &BufferSource, step: &str, kernel: F) -> Option<BufferSource>
where
    F: FnOnce(&[f64], usize) -> Vec<f64>,
{
    let result = transform_source(source, kernel);
    if result.is_none() {
        log::warn!(
            "Cannot {} {} ({:?}); dropping it",
            step,
            source.name(),
            source.format()
        );
    }
    result
}

/// Smooth normals of the first `adjacency.num_points()` points of `points`.
///
/// Double precision points give double precision normals unless `packed`.
pub(crate) fn smooth_normals_source(
    points: &BufferSource,
    adjacency: &SharedAdjacency,
    name: String,
    packed: bool,
) -> Option<BufferSource> {
    if points.format().components() != 3 || points.format().scalar() == ScalarType::Int {
        log::warn!(
            "Smooth normals need 3-component points, got {:?}",
            points.format()
        );
        return None;
    }

    let table = adjacency.table();
    let coarse = points.truncated(table.num_points());
    let normals = table.smooth_normals(&coarse.data().to_f64());

    let (format, data) = if packed {
        let packed = normals
            .iter()
            .map(|n| pack_normal([n[0] as f32, n[1] as f32, n[2] as f32]))
            .collect();
        (ElementFormat::PackedNormal, BufferData::Packed(packed))
    } else if points.format() == ElementFormat::Double3 {
        (
            ElementFormat::Double3,
            BufferData::Double(normals.iter().flatten().copied().collect()),
        )
    } else {
        (
            ElementFormat::Float3,
            BufferData::Float(normals.iter().flatten().map(|&v| v as f32).collect()),
        )
    };
    Some(BufferSource::new(name, BufferRole::Normals, format, data))
}

// ============================================================================
// Topology computations
// ============================================================================

/// One-time work for a registry entry, run first at commit.
#[derive(Clone)]
pub enum TopologyComputation {
    /// Build the subdivision and quadrangulation tables of a topology.
    Preprocess {
        topology: Arc<MeshTopology>,
        subdivision: bool,
        quad_info: bool,
    },
    /// Fill an index range.
    IndexBuilder {
        range: RangeHandle,
        topology: Arc<MeshTopology>,
        kind: IndexKind,
    },
    /// Build the CPU adjacency table.
    AdjacencyBuilder { adjacency: Arc<SharedAdjacency> },
    /// Upload the flattened adjacency table for GPU smooth normals.
    AdjacencyUpload {
        adjacency: Arc<SharedAdjacency>,
        range: RangeHandle,
    },
}

impl TopologyComputation {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Preprocess { .. } => "preprocess",
            Self::IndexBuilder { .. } => "index builder",
            Self::AdjacencyBuilder { .. } => "adjacency builder",
            Self::AdjacencyUpload { .. } => "adjacency upload",
        }
    }

    /// Run the computation.
    pub(crate) fn execute(&self) -> SyncResult<()> {
        crate::profiling::profile_scope!("topology_computation");

        match self {
            Self::Preprocess {
                topology,
                subdivision,
                quad_info,
            } => {
                if *subdivision {
                    let tables = topology.subdivision_tables();
                    log::trace!(
                        "Built subdivision tables: {} levels, {} refined points",
                        tables.num_levels(),
                        tables.num_refined_points()
                    );
                }
                if *quad_info {
                    let info = topology.quad_info();
                    log::trace!(
                        "Built quad info: {} additional points",
                        info.num_additional_points
                    );
                }
                Ok(())
            }
            Self::IndexBuilder {
                range,
                topology,
                kind,
            } => {
                let indices = build_indices(topology, *kind);
                for source in index_sources(indices) {
                    range.write(source)?;
                }
                Ok(())
            }
            Self::AdjacencyBuilder { adjacency } => {
                adjacency.table();
                Ok(())
            }
            Self::AdjacencyUpload { adjacency, range } => {
                let table = adjacency.table().table();
                range.write(BufferSource::from_i32(
                    names::ADJACENCY,
                    BufferRole::Adjacency,
                    table,
                ))
            }
        }
    }
}

impl fmt::Debug for TopologyComputation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexBuilder { range, kind, .. } => f
                .debug_struct("IndexBuilder")
                .field("range", &range.id())
                .field("kind", kind)
                .finish(),
            Self::AdjacencyUpload { range, .. } => f
                .debug_struct("AdjacencyUpload")
                .field("range", &range.id())
                .finish(),
            other => f.write_str(other.label()),
        }
    }
}

/// Run the index builder for `kind`.
pub fn build_indices(topology: &MeshTopology, kind: IndexKind) -> PrimitiveIndices {
    match kind {
        IndexKind::Points => points_indices(topology),
        IndexKind::Triangles => triangle_indices(topology),
        IndexKind::Quads => quad_indices(topology, topology.quad_info()),
        IndexKind::Refined => topology.subdivision_tables().refined_indices(),
    }
}

/// Element format of an index buffer with `verts_per_primitive` vertices.
pub fn index_format(verts_per_primitive: usize) -> ElementFormat {
    match verts_per_primitive {
        3 => ElementFormat::Int3,
        4 => ElementFormat::Int4,
        _ => ElementFormat::Int,
    }
}

fn index_sources(indices: PrimitiveIndices) -> Vec<BufferSource> {
    let mut sources = vec![BufferSource::new(
        names::INDICES,
        BufferRole::Index,
        index_format(indices.verts_per_primitive),
        BufferData::Int(indices.indices),
    )];
    if indices.verts_per_primitive > 1 {
        sources.push(BufferSource::from_i32(
            names::PRIMITIVE_PARAM,
            BufferRole::Index,
            indices.primitive_param,
        ));
    }
    sources
}
