//! Shared vertex adjacency.

use std::fmt;
use std::sync::{Arc, OnceLock};

use strata_core::buffer::{BufferSpec, ElementFormat, names};
use strata_core::mesh::{MeshTopology, VertexAdjacency};

use crate::compute::TopologyComputation;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::resources::{Mutability, RangeHandle, RangeRole, ResourceRegistry};

/// Adjacency of one topology, shared by every drawable that uses it.
///
/// The table is built lazily, normally by the adjacency builder at commit.
/// With GPU computations enabled it is also uploaded to an immutable range
/// that GPU smooth normals read from.
pub struct SharedAdjacency {
    topology: Arc<MeshTopology>,
    table: OnceLock<VertexAdjacency>,
    range: Option<RangeHandle>,
}

impl SharedAdjacency {
    pub fn new(topology: Arc<MeshTopology>, range: Option<RangeHandle>) -> Self {
        Self {
            topology,
            table: OnceLock::new(),
            range,
        }
    }

    pub fn topology(&self) -> &Arc<MeshTopology> {
        &self.topology
    }

    /// The adjacency table, built on first use.
    pub fn table(&self) -> &VertexAdjacency {
        self.table.get_or_init(|| {
            crate::profiling::profile_scope!("build_vertex_adjacency");
            VertexAdjacency::build(&self.topology)
        })
    }

    pub fn is_built(&self) -> bool {
        self.table.get().is_some()
    }

    /// Range holding the uploaded table, if GPU computations are enabled.
    pub fn gpu_range(&self) -> Option<&RangeHandle> {
        self.range.as_ref()
    }
}

impl fmt::Debug for SharedAdjacency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedAdjacency")
            .field("num_points", &self.topology.num_points())
            .field("built", &self.is_built())
            .field("range", &self.range.as_ref().map(|range| range.id()))
            .finish()
    }
}

static_assertions::assert_impl_all!(SharedAdjacency: Send, Sync);

/// Resolves shared adjacency through the registry.
pub struct AdjacencyCache<'a> {
    registry: &'a ResourceRegistry,
    config: SyncConfig,
}

impl<'a> AdjacencyCache<'a> {
    pub fn new(registry: &'a ResourceRegistry, config: SyncConfig) -> Self {
        Self { registry, config }
    }

    /// Find or create the adjacency of the topology registered under
    /// `topology_id`.
    pub fn resolve(
        &self,
        topology_id: u64,
        topology: &Arc<MeshTopology>,
    ) -> SyncResult<Arc<SharedAdjacency>> {
        crate::profiling::profile_scope!("resolve_adjacency");

        let registry_name = self.registry.adjacency_registry().name();
        let mut instance = self.registry.register_vertex_adjacency(topology_id);
        if instance.is_poisoned() {
            return Err(SyncError::PoisonedEntry {
                registry: registry_name,
                key: topology_id,
            });
        }

        if !instance.is_first_instance() {
            let shared = instance.value().ok_or(SyncError::MissingValue {
                registry: registry_name,
                key: topology_id,
            })?;
            if self.config.safe_mode && shared.topology().as_ref() != topology.as_ref() {
                log::error!(
                    "Adjacency hash collision on key {:#x}; entry poisoned",
                    topology_id
                );
                instance.poison();
                return Err(SyncError::HashCollision {
                    registry: registry_name,
                    key: topology_id,
                });
            }
            return Ok(shared);
        }

        let range = self.config.gpu_compute.then(|| {
            self.registry.allocate_range(
                RangeRole::Adjacency,
                &[BufferSpec::new(names::ADJACENCY, ElementFormat::Int)],
                Mutability::Immutable,
            )
        });
        let shared = Arc::new(SharedAdjacency::new(Arc::clone(topology), range.clone()));

        self.registry
            .enqueue_topology_computation(TopologyComputation::AdjacencyBuilder {
                adjacency: Arc::clone(&shared),
            });
        if let Some(range) = range {
            self.registry
                .enqueue_topology_computation(TopologyComputation::AdjacencyUpload {
                    adjacency: Arc::clone(&shared),
                    range,
                });
        }

        instance.set_value(Arc::clone(&shared));
        Ok(shared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::mesh::generators::generate_cube;
    use strata_core::mesh::{RefineMode, SubdivTags};

    fn cube() -> Arc<MeshTopology> {
        Arc::new(MeshTopology::new(
            generate_cube(1.0).topology,
            0,
            RefineMode::Uniform,
            SubdivTags::default(),
        ))
    }

    #[test]
    fn test_adjacency_is_shared_and_built_at_commit() {
        let registry = ResourceRegistry::new();
        let cache = AdjacencyCache::new(&registry, SyncConfig::default());
        let topology = cube();

        let a = cache.resolve(1, &topology).unwrap();
        let b = cache.resolve(1, &topology).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!a.is_built());
        assert!(a.gpu_range().is_none());

        registry.commit();
        assert!(a.is_built());
        assert_eq!(a.table().num_points(), 8);
        assert_eq!(registry.stats().adjacency_computations, 1);
    }

    #[test]
    fn test_gpu_adjacency_is_uploaded() {
        let registry = ResourceRegistry::new();
        let cache = AdjacencyCache::new(&registry, SyncConfig::default().with_gpu_compute(true));
        let adjacency = cache.resolve(2, &cube()).unwrap();

        registry.commit();
        let range = adjacency.gpu_range().unwrap();
        assert!(range.is_sealed());
        assert!(range.buffer(names::ADJACENCY).is_some());
    }
}
