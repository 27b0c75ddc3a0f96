//! Content-addressed vertex primvar ranges.
//!
//! Drawables with identical topology and identical vertex data share one
//! immutable range. The shared id is a chain: a drawable's first range is
//! keyed by its topology id combined with the content, and every later
//! update combines the previous shared id with the new content. Two
//! drawables that go through the same sequence of updates therefore keep
//! sharing.
//!
//! | Existing range | New specs          | Result                              |
//! |----------------|--------------------|-------------------------------------|
//! | none           | any                | shared immutable (or mutable)       |
//! | immutable      | subset             | re-shared immutable under a new id  |
//! | immutable      | structural change  | migrated to a private mutable range |
//! | mutable        | subset             | reused                              |
//! | mutable        | new specs          | grown in place                      |

use std::sync::Arc;

use strata_core::buffer::{BufferSource, BufferSpec};
use strata_core::hash::{self, ContentHasher};

use crate::compute::GpuComputation;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::resources::{Mutability, RangeHandle, RangeRole, ResourceRegistry};

/// What the resolver did with the drawable's range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeAction {
    /// A private mutable range was allocated.
    Allocated,
    /// A shared immutable range was found or created.
    Shared,
    /// The immutable range moved to a new mutable range.
    Migrated,
    /// The mutable range grew in place.
    Grown,
    /// The existing mutable range already has room.
    Reused,
}

/// Outcome of [`SharedRangeResolver::resolve`].
#[derive(Debug, Clone)]
pub struct SharedRange {
    pub range: RangeHandle,
    /// Registry key of the range, 0 when it is not shared.
    pub shared_id: u64,
    /// `false` if another drawable already filled the shared range; the
    /// caller must then drop its sources and computations.
    pub first_instance: bool,
    pub action: RangeAction,
}

/// Hash the content of a pending update into `base`.
///
/// Covers the name, format and data of every source and the output spec of
/// every GPU computation, in order.
pub fn shared_id(base: u64, sources: &[BufferSource], computations: &[GpuComputation]) -> u64 {
    let mut hasher = ContentHasher::with_seed(base);
    for source in sources {
        source.hash_content(&mut hasher);
    }
    for computation in computations {
        let spec = computation.output_spec();
        hasher.write_str(computation.label()).write(&spec);
    }
    hash::combine(base, &hasher.finish())
}

/// Picks the storage range for a drawable's vertex primvars.
pub struct SharedRangeResolver<'a> {
    registry: &'a ResourceRegistry,
    config: SyncConfig,
}

impl<'a> SharedRangeResolver<'a> {
    pub fn new(registry: &'a ResourceRegistry, config: SyncConfig) -> Self {
        Self { registry, config }
    }

    /// Resolve the range for `sources` and `computations`.
    ///
    /// `base_id` is the topology id for a drawable without an immutable
    /// range, and its current shared id otherwise.
    pub fn resolve(
        &self,
        role: RangeRole,
        base_id: u64,
        sources: &[BufferSource],
        computations: &[GpuComputation],
        existing: Option<&RangeHandle>,
    ) -> SyncResult<SharedRange> {
        crate::profiling::profile_scope!("resolve_shared_range");

        let mut specs = BufferSpec::of_sources(sources);
        for computation in computations {
            let spec = computation.output_spec();
            if !specs.contains(&spec) {
                specs.push(spec);
            }
        }

        let Some(existing) = existing else {
            if self.config.shared_vertex_primvar {
                let id = shared_id(base_id, sources, computations);
                return self.share(role, id, &specs, None);
            }
            return Ok(SharedRange {
                range: self.registry.allocate_range(role, &specs, Mutability::Mutable),
                shared_id: 0,
                first_instance: true,
                action: RangeAction::Allocated,
            });
        };

        let compatible = BufferSpec::is_subset(&specs, &existing.specs());

        if existing.is_immutable() {
            if compatible && self.config.shared_vertex_primvar {
                let id = shared_id(base_id, sources, computations);
                return self.share(role, id, &specs, Some(existing));
            }
            log::debug!(
                "Range {} changed structure; migrating to a mutable range",
                existing.id()
            );
            return Ok(SharedRange {
                range: self.registry.migrate_to_mutable(role, &specs, existing),
                shared_id: 0,
                first_instance: true,
                action: RangeAction::Migrated,
            });
        }

        if compatible {
            return Ok(SharedRange {
                range: Arc::clone(existing),
                shared_id: 0,
                first_instance: true,
                action: RangeAction::Reused,
            });
        }
        Ok(SharedRange {
            range: self.registry.merge_range(role, &specs, existing),
            shared_id: 0,
            first_instance: true,
            action: RangeAction::Grown,
        })
    }

    /// Find or create the immutable range under `id`.
    ///
    /// A new range starts from `previous` (copied at commit) so buffers that
    /// are not part of this update carry over.
    fn share(
        &self,
        role: RangeRole,
        id: u64,
        specs: &[BufferSpec],
        previous: Option<&RangeHandle>,
    ) -> SyncResult<SharedRange> {
        let registry_name = self.registry.primvar_range_registry().name();
        let mut instance = self.registry.register_primvar_range(id);
        if instance.is_poisoned() {
            return Err(SyncError::PoisonedEntry {
                registry: registry_name,
                key: id,
            });
        }

        if instance.is_first_instance() {
            let range = match previous {
                Some(previous) => self.registry.merge_range(role, specs, previous),
                None => self.registry.allocate_range(role, specs, Mutability::Immutable),
            };
            log::trace!("Shared range {} registered under {:#x}", range.id(), id);
            instance.set_value(Arc::clone(&range));
            return Ok(SharedRange {
                range,
                shared_id: id,
                first_instance: true,
                action: RangeAction::Shared,
            });
        }

        let range = instance.value().ok_or(SyncError::MissingValue {
            registry: registry_name,
            key: id,
        })?;
        if self.config.safe_mode && !BufferSpec::is_subset(specs, &range.specs()) {
            log::error!("Primvar range hash collision on key {:#x}; entry poisoned", id);
            instance.poison();
            return Err(SyncError::HashCollision {
                registry: registry_name,
                key: id,
            });
        }
        Ok(SharedRange {
            range,
            shared_id: id,
            first_instance: false,
            action: RangeAction::Shared,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::buffer::{BufferRole, names};

    fn points(offset: f32) -> BufferSource {
        BufferSource::from_vec3(
            names::POINTS,
            BufferRole::Points,
            &[[offset, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        )
    }

    #[test]
    fn test_identical_content_shares_one_range() {
        let registry = ResourceRegistry::new();
        let resolver = SharedRangeResolver::new(&registry, SyncConfig::default());

        let a = resolver
            .resolve(RangeRole::VertexPrimvar, 1, &[points(0.0)], &[], None)
            .unwrap();
        let b = resolver
            .resolve(RangeRole::VertexPrimvar, 1, &[points(0.0)], &[], None)
            .unwrap();
        let c = resolver
            .resolve(RangeRole::VertexPrimvar, 1, &[points(5.0)], &[], None)
            .unwrap();

        assert!(Arc::ptr_eq(&a.range, &b.range));
        assert!(a.first_instance);
        assert!(!b.first_instance);
        assert!(!Arc::ptr_eq(&a.range, &c.range));
        assert!(a.range.is_immutable());
    }

    #[test]
    fn test_compatible_update_reshares() {
        let registry = ResourceRegistry::new();
        let resolver = SharedRangeResolver::new(&registry, SyncConfig::default());

        let first = resolver
            .resolve(RangeRole::VertexPrimvar, 1, &[points(0.0)], &[], None)
            .unwrap();
        registry.commit();

        let update = resolver
            .resolve(
                RangeRole::VertexPrimvar,
                first.shared_id,
                &[points(2.0)],
                &[],
                Some(&first.range),
            )
            .unwrap();
        assert_eq!(update.action, RangeAction::Shared);
        assert_ne!(update.shared_id, first.shared_id);
        assert!(update.range.is_immutable());
        assert!(!Arc::ptr_eq(&first.range, &update.range));
    }

    #[test]
    fn test_structural_change_migrates() {
        let registry = ResourceRegistry::new();
        let resolver = SharedRangeResolver::new(&registry, SyncConfig::default());

        let first = resolver
            .resolve(RangeRole::VertexPrimvar, 1, &[points(0.0)], &[], None)
            .unwrap();
        registry.add_sources(&first.range, vec![points(0.0)]);
        registry.commit();
        assert!(first.range.is_sealed());

        let normals = BufferSource::from_vec3(
            names::SMOOTH_NORMALS,
            BufferRole::Normals,
            &[[0.0, 0.0, 1.0]; 3],
        );
        let update = resolver
            .resolve(
                RangeRole::VertexPrimvar,
                first.shared_id,
                std::slice::from_ref(&normals),
                &[],
                Some(&first.range),
            )
            .unwrap();
        registry.add_sources(&update.range, vec![normals.clone()]);

        assert_eq!(update.action, RangeAction::Migrated);
        assert_eq!(update.shared_id, 0);
        assert!(!update.range.is_immutable());
        assert!(update.range.has_buffer_spec(names::POINTS));
        assert_eq!(registry.stats().migrations, 1);

        let summary = registry.commit();
        assert_eq!(summary.refused_writes, 0);
        assert_eq!(update.range.buffer(names::POINTS), Some(points(0.0)));
        assert_eq!(update.range.buffer(names::SMOOTH_NORMALS), Some(normals));
        assert_eq!(first.range.buffer(names::POINTS), Some(points(0.0)));
        assert!(first.range.buffer(names::SMOOTH_NORMALS).is_none());
    }

    #[test]
    fn test_unshared_ranges_are_mutable() {
        let registry = ResourceRegistry::new();
        let config = SyncConfig::default().with_shared_vertex_primvar(false);
        let resolver = SharedRangeResolver::new(&registry, config);

        let first = resolver
            .resolve(RangeRole::VertexPrimvar, 1, &[points(0.0)], &[], None)
            .unwrap();
        assert_eq!(first.action, RangeAction::Allocated);

        let again = resolver
            .resolve(RangeRole::VertexPrimvar, 1, &[points(1.0)], &[], Some(&first.range))
            .unwrap();
        assert_eq!(again.action, RangeAction::Reused);
        assert!(Arc::ptr_eq(&first.range, &again.range));
    }
}
