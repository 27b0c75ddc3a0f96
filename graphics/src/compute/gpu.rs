//! GPU computations.
//!
//! There is no explicit dependency graph between GPU computations: they run
//! at commit in the order they were enqueued, each reading and writing
//! buffers of the range it was enqueued against. Refinement and
//! quadrangulation work in place and always start from the coarse prefix of
//! their buffer, so running them again after a partial update is safe.

use std::fmt;
use std::sync::Arc;

use strata_core::buffer::{BufferSpec, ElementFormat};
use strata_core::mesh::quadrangulate::quadrangulate_primvar;
use strata_core::mesh::{Interpolation, MeshTopology, transform_source};

use super::smooth_normals_source;
use crate::error::SyncResult;
use crate::mesh::SharedAdjacency;
use crate::resources::StorageRange;

/// A computation executed against a storage range at commit.
#[derive(Clone)]
pub enum GpuComputation {
    /// Generate normals from the range's points.
    SmoothNormals {
        adjacency: Arc<SharedAdjacency>,
        points: String,
        normals: String,
        points_format: ElementFormat,
        normals_format: ElementFormat,
    },
    /// Refine the buffer `name` in place.
    Refine {
        topology: Arc<MeshTopology>,
        name: String,
        format: ElementFormat,
        interpolation: Interpolation,
    },
    /// Quadrangulate the buffer `name` in place.
    Quadrangulate {
        topology: Arc<MeshTopology>,
        name: String,
        format: ElementFormat,
    },
}

impl GpuComputation {
    pub fn label(&self) -> &'static str {
        match self {
            Self::SmoothNormals { .. } => "smooth normals",
            Self::Refine { .. } => "refine",
            Self::Quadrangulate { .. } => "quadrangulate",
        }
    }

    /// The buffer this computation writes, which the range must have room for.
    pub fn output_spec(&self) -> BufferSpec {
        match self {
            Self::SmoothNormals {
                normals,
                normals_format,
                ..
            } => BufferSpec::new(normals.clone(), *normals_format),
            Self::Refine { name, format, .. } | Self::Quadrangulate { name, format, .. } => {
                BufferSpec::new(name.clone(), *format)
            }
        }
    }

    /// Run against `range`. A missing input buffer is logged and skipped.
    pub(crate) fn execute(&self, range: &StorageRange) -> SyncResult<()> {
        crate::profiling::profile_scope!("gpu_computation");

        match self {
            Self::SmoothNormals {
                adjacency,
                points,
                normals,
                normals_format,
                ..
            } => {
                let Some(source) = range.buffer(points) else {
                    log::warn!(
                        "GPU smooth normals: range {} has no {} buffer",
                        range.id(),
                        points
                    );
                    return Ok(());
                };
                let packed = *normals_format == ElementFormat::PackedNormal;
                match smooth_normals_source(&source, adjacency, normals.clone(), packed) {
                    Some(output) => range.write(output),
                    None => Ok(()),
                }
            }
            Self::Refine {
                topology,
                name,
                interpolation,
                ..
            } => {
                let Some(source) = range.buffer(name) else {
                    log::warn!("GPU refine: range {} has no {} buffer", range.id(), name);
                    return Ok(());
                };
                let coarse = source.truncated(topology.num_points());
                let tables = topology.subdivision_tables();
                match transform_source(&coarse, |data, components| {
                    tables.refine(data, components, *interpolation)
                }) {
                    Some(output) => range.write(output),
                    None => {
                        log::warn!("GPU refine: cannot refine {} ({:?})", name, source.format());
                        Ok(())
                    }
                }
            }
            Self::Quadrangulate { topology, name, .. } => {
                let Some(source) = range.buffer(name) else {
                    log::warn!(
                        "GPU quadrangulate: range {} has no {} buffer",
                        range.id(),
                        name
                    );
                    return Ok(());
                };
                let info = topology.quad_info();
                let coarse = source.truncated(info.point_offset);
                match transform_source(&coarse, |data, components| {
                    quadrangulate_primvar(info, data, components)
                }) {
                    Some(output) => range.write(output),
                    None => {
                        log::warn!(
                            "GPU quadrangulate: cannot quadrangulate {} ({:?})",
                            name,
                            source.format()
                        );
                        Ok(())
                    }
                }
            }
        }
    }
}

impl fmt::Debug for GpuComputation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let spec = self.output_spec();
        f.debug_struct("GpuComputation")
            .field("kind", &self.label())
            .field("output", &spec.name)
            .field("format", &spec.format)
            .finish()
    }
}
