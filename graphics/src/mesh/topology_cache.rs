//! Topology deduplication.

use std::sync::Arc;

use strata_core::hash;
use strata_core::mesh::{MeshTopology, RawTopology, RefineMode, SubdivScheme, SubdivTags};

use super::delegate::{DisplayStyle, MaterialCapabilities};
use crate::compute::TopologyComputation;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::resources::ResourceRegistry;

/// Outcome of a topology lookup.
#[derive(Debug, Clone)]
pub struct ResolvedTopology {
    /// Registry key: topology hash combined with the quad-indices flag.
    pub id: u64,
    pub topology: Arc<MeshTopology>,
    pub use_quad_indices: bool,
    /// Normals come from limit surface evaluation.
    pub limit_normals: bool,
    pub first_instance: bool,
}

/// Check if the material requires limit surface refinement of `scheme`.
pub fn uses_limit_refinement(
    scheme: SubdivScheme,
    refine_level: u32,
    capabilities: MaterialCapabilities,
) -> bool {
    !matches!(scheme, SubdivScheme::None | SubdivScheme::Bilinear)
        && refine_level > 0
        && capabilities.contains(MaterialCapabilities::LIMIT_SURFACE_EVALUATION)
}

/// Check if the topology is drawn with quad indices.
///
/// Triangle schemes never are. Otherwise a ptex material or the
/// force-quadrangulate policy turns them on.
pub fn use_quad_indices(
    topology: &MeshTopology,
    capabilities: MaterialCapabilities,
    config: SyncConfig,
) -> bool {
    if topology.refines_to_triangles() {
        return false;
    }
    capabilities.contains(MaterialCapabilities::PTEX) || config.force_quadrangulate
}

/// Deduplicates topologies across drawables.
pub struct TopologyCache<'a> {
    registry: &'a ResourceRegistry,
    config: SyncConfig,
}

impl<'a> TopologyCache<'a> {
    pub fn new(registry: &'a ResourceRegistry, config: SyncConfig) -> Self {
        Self { registry, config }
    }

    /// Canonicalize `raw` and find or register the shared topology.
    ///
    /// The first drawable to register a topology also enqueues its one-time
    /// preprocessing. In safe mode a cache hit is compared structurally; a
    /// mismatch poisons the entry and fails.
    pub fn resolve(
        &self,
        raw: RawTopology,
        display_style: &DisplayStyle,
        tags: SubdivTags,
        capabilities: MaterialCapabilities,
    ) -> SyncResult<ResolvedTopology> {
        crate::profiling::profile_scope!("resolve_topology");

        let refine_level = if raw.scheme == SubdivScheme::None {
            0
        } else {
            display_style.refine_level
        };
        let limit_normals = uses_limit_refinement(raw.scheme, refine_level, capabilities);
        let refine_mode = if limit_normals {
            RefineMode::Patches
        } else {
            RefineMode::Uniform
        };

        let topology = MeshTopology::new(raw, refine_level, refine_mode, tags);
        let use_quad_indices = use_quad_indices(&topology, capabilities, self.config);
        let id = hash::combine(topology.compute_hash(), &use_quad_indices);

        let registry_name = self.registry.topology_registry().name();
        let mut instance = self.registry.register_mesh_topology(id);
        if instance.is_poisoned() {
            return Err(SyncError::PoisonedEntry {
                registry: registry_name,
                key: id,
            });
        }

        let first_instance = instance.is_first_instance();
        let topology = if first_instance {
            let topology = Arc::new(topology);
            self.registry
                .enqueue_topology_computation(TopologyComputation::Preprocess {
                    topology: Arc::clone(&topology),
                    subdivision: topology.refine_level() > 0,
                    quad_info: use_quad_indices,
                });
            log::debug!(
                "Registered topology {:#x}: {} faces, {} points, level {}",
                id,
                topology.num_faces(),
                topology.num_points(),
                topology.refine_level()
            );
            instance.set_value(Arc::clone(&topology));
            topology
        } else {
            let shared = instance.value().ok_or(SyncError::MissingValue {
                registry: registry_name,
                key: id,
            })?;
            if self.config.safe_mode && *shared != topology {
                log::error!("Topology hash collision on key {:#x}; entry poisoned", id);
                instance.poison();
                return Err(SyncError::HashCollision {
                    registry: registry_name,
                    key: id,
                });
            }
            shared
        };

        Ok(ResolvedTopology {
            id,
            topology,
            use_quad_indices,
            limit_normals,
            first_instance,
        })
    }
}
