//! Index range sharing.
//!
//! Index buffers depend only on the topology and the draw style, so they are
//! shared through the registry under `(topology id, style)`.

use strata_core::buffer::{BufferSpec, ElementFormat, names};
use strata_core::dirty::DirtyBits;
use strata_core::mesh::MeshTopology;

use crate::compute::{TopologyComputation, index_format};
use crate::error::{SyncError, SyncResult};
use crate::resources::{Mutability, RangeHandle, RangeRole, ResourceRegistry};
use std::sync::Arc;

/// Which index buffer a draw item reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexStyle {
    /// One point primitive per mesh point.
    Points,
    /// Coarse faces, never refined.
    Hull,
    /// Surface faces, refined when the topology has a refine level.
    Refined,
}

impl IndexStyle {
    /// The private dirty bit that requests this index buffer.
    pub fn dirty_bit(self) -> DirtyBits {
        match self {
            Self::Points => DirtyBits::POINTS_INDICES,
            Self::Hull => DirtyBits::HULL_INDICES,
            Self::Refined => DirtyBits::INDICES,
        }
    }

    /// Refine level used for this style on `topology`.
    pub fn refine_level(self, topology: &MeshTopology) -> u32 {
        match self {
            Self::Refined => topology.refine_level(),
            Self::Points | Self::Hull => 0,
        }
    }

    /// The index builder needed for this style.
    pub fn kind(self, topology: &MeshTopology, use_quad_indices: bool) -> IndexKind {
        match self {
            Self::Points => IndexKind::Points,
            _ if self.refine_level(topology) > 0 => IndexKind::Refined,
            _ if use_quad_indices => IndexKind::Quads,
            _ => IndexKind::Triangles,
        }
    }
}

/// Index buffer layout produced by an index builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    Points,
    Triangles,
    Quads,
    /// Refined faces: triangles for Loop, quads otherwise.
    Refined,
}

impl IndexKind {
    pub fn verts_per_primitive(self, topology: &MeshTopology) -> usize {
        match self {
            Self::Points => 1,
            Self::Triangles => 3,
            Self::Quads => 4,
            Self::Refined if topology.refines_to_triangles() => 3,
            Self::Refined => 4,
        }
    }

    /// Buffer specs of the index range.
    pub fn specs(self, topology: &MeshTopology) -> Vec<BufferSpec> {
        let mut specs = vec![BufferSpec::new(
            names::INDICES,
            index_format(self.verts_per_primitive(topology)),
        )];
        if self != Self::Points {
            specs.push(BufferSpec::new(names::PRIMITIVE_PARAM, ElementFormat::Int));
        }
        specs
    }
}

/// Resolves shared index ranges.
pub struct IndexRangeResolver<'a> {
    registry: &'a ResourceRegistry,
}

impl<'a> IndexRangeResolver<'a> {
    pub fn new(registry: &'a ResourceRegistry) -> Self {
        Self { registry }
    }

    /// Find or create the index range for `style` of the topology registered
    /// under `topology_id`.
    ///
    /// The first drawable to ask allocates an immutable range and enqueues
    /// its index builder; every other drawable shares the range.
    pub fn resolve(
        &self,
        topology_id: u64,
        style: IndexStyle,
        topology: &Arc<MeshTopology>,
        use_quad_indices: bool,
    ) -> SyncResult<RangeHandle> {
        crate::profiling::profile_scope!("resolve_index_range");

        let mut instance = self.registry.register_index_range(topology_id, style);
        let registry_name = self.registry.index_range_registry().name();
        if instance.is_poisoned() {
            return Err(SyncError::PoisonedEntry {
                registry: registry_name,
                key: topology_id,
            });
        }

        if !instance.is_first_instance() {
            return instance.value().ok_or(SyncError::MissingValue {
                registry: registry_name,
                key: topology_id,
            });
        }

        let kind = style.kind(topology, use_quad_indices);
        let range = self.registry.allocate_range(
            RangeRole::Topology,
            &kind.specs(topology),
            Mutability::Immutable,
        );
        self.registry
            .enqueue_topology_computation(TopologyComputation::IndexBuilder {
                range: Arc::clone(&range),
                topology: Arc::clone(topology),
                kind,
            });
        log::debug!(
            "Index range {} for topology {:#x} ({:?}, {:?})",
            range.id(),
            topology_id,
            style,
            kind
        );
        instance.set_value(Arc::clone(&range));
        Ok(range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::mesh::{RawTopology, RefineMode, SubdivScheme, SubdivTags};

    fn quad_topology(scheme: SubdivScheme, level: u32) -> Arc<MeshTopology> {
        let raw = RawTopology::new(scheme, [4], [0, 1, 2, 3]);
        Arc::new(MeshTopology::new(
            raw,
            level,
            RefineMode::Uniform,
            SubdivTags::default(),
        ))
    }

    #[test]
    fn test_kind_selection() {
        let coarse = quad_topology(SubdivScheme::CatmullClark, 0);
        let refined = quad_topology(SubdivScheme::CatmullClark, 1);

        assert_eq!(IndexStyle::Points.kind(&refined, true), IndexKind::Points);
        assert_eq!(IndexStyle::Hull.kind(&refined, false), IndexKind::Triangles);
        assert_eq!(IndexStyle::Hull.kind(&refined, true), IndexKind::Quads);
        assert_eq!(IndexStyle::Refined.kind(&refined, false), IndexKind::Refined);
        assert_eq!(IndexStyle::Refined.kind(&coarse, true), IndexKind::Quads);
    }

    #[test]
    fn test_index_range_is_shared() {
        let registry = ResourceRegistry::new();
        let topology = quad_topology(SubdivScheme::None, 0);
        let resolver = IndexRangeResolver::new(&registry);

        let a = resolver.resolve(7, IndexStyle::Refined, &topology, false).unwrap();
        let b = resolver.resolve(7, IndexStyle::Refined, &topology, false).unwrap();
        let hull = resolver.resolve(7, IndexStyle::Hull, &topology, false).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &hull));
        assert!(a.is_immutable());
        assert_eq!(registry.stats().index_computations, 2);
    }

    #[test]
    fn test_points_range_has_no_primitive_param() {
        let topology = quad_topology(SubdivScheme::None, 0);
        let specs = IndexKind::Points.specs(&topology);
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].format, ElementFormat::Int);
        let specs = IndexKind::Quads.specs(&topology);
        assert_eq!(specs[0].format, ElementFormat::Int4);
    }
}
