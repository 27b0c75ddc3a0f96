//! The resource registry.
//!
//! Owns the content-addressed registries shared by every drawable, allocates
//! storage ranges, and queues the writes and computations that the commit
//! phase applies.
//!
//! # Two-phase protocol
//!
//! 1. **Gather** (parallel): drawables resolve registry entries, allocate
//!    ranges and enqueue sources and computations. Only per-entry locks and a
//!    short queue lock are taken.
//! 2. **Commit** (single-threaded): [`ResourceRegistry::commit`] applies the
//!    queued work in submission order and seals immutable ranges.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use strata_core::buffer::{BufferSource, BufferSpec};
use strata_core::mesh::MeshTopology;
use strata_core::registry::{Instance, InstanceRegistry};

use super::range::{Mutability, RangeHandle, RangeRole, StorageRange};
use crate::compute::{GpuComputation, TopologyComputation};
use crate::error::SyncError;
use crate::mesh::{IndexStyle, SharedAdjacency};

// ============================================================================
// Statistics
// ============================================================================

/// Snapshot of the registry counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub ranges_allocated: usize,
    pub range_merges: usize,
    pub migrations: usize,
    /// Topology preprocessing computations enqueued.
    pub topology_computations: usize,
    pub index_computations: usize,
    pub adjacency_computations: usize,
    pub sources_added: usize,
    pub gpu_computations: usize,
    pub commits: usize,
    /// Writes refused because their range was sealed.
    pub refused_writes: usize,
}

#[derive(Debug, Default)]
struct Counters {
    ranges_allocated: AtomicUsize,
    range_merges: AtomicUsize,
    migrations: AtomicUsize,
    topology_computations: AtomicUsize,
    index_computations: AtomicUsize,
    adjacency_computations: AtomicUsize,
    sources_added: AtomicUsize,
    gpu_computations: AtomicUsize,
    commits: AtomicUsize,
    refused_writes: AtomicUsize,
}

impl Counters {
    fn bump(counter: &AtomicUsize, amount: usize) {
        counter.fetch_add(amount, Ordering::Relaxed);
    }

    fn snapshot(&self) -> RegistryStats {
        let get = |counter: &AtomicUsize| counter.load(Ordering::Relaxed);
        RegistryStats {
            ranges_allocated: get(&self.ranges_allocated),
            range_merges: get(&self.range_merges),
            migrations: get(&self.migrations),
            topology_computations: get(&self.topology_computations),
            index_computations: get(&self.index_computations),
            adjacency_computations: get(&self.adjacency_computations),
            sources_added: get(&self.sources_added),
            gpu_computations: get(&self.gpu_computations),
            commits: get(&self.commits),
            refused_writes: get(&self.refused_writes),
        }
    }
}

/// What a call to [`ResourceRegistry::commit`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub copies: usize,
    pub topology_computations: usize,
    pub sources: usize,
    pub gpu_computations: usize,
    pub sealed_ranges: usize,
    pub refused_writes: usize,
}

#[derive(Default)]
struct PendingWork {
    /// `(from, to)` range copies queued by merges and migrations.
    copies: Vec<(RangeHandle, RangeHandle)>,
    topology: Vec<TopologyComputation>,
    sources: Vec<(RangeHandle, BufferSource)>,
    gpu: Vec<(RangeHandle, GpuComputation)>,
}

// ============================================================================
// Registry
// ============================================================================

/// Registries, range allocation and the commit queue.
pub struct ResourceRegistry {
    topologies: InstanceRegistry<u64, Arc<MeshTopology>>,
    index_ranges: InstanceRegistry<(u64, IndexStyle), RangeHandle>,
    adjacencies: InstanceRegistry<u64, Arc<SharedAdjacency>>,
    primvar_ranges: InstanceRegistry<u64, RangeHandle>,
    pending: Mutex<PendingWork>,
    counters: Counters,
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self {
            topologies: InstanceRegistry::new("topology"),
            index_ranges: InstanceRegistry::new("index range"),
            adjacencies: InstanceRegistry::new("adjacency"),
            primvar_ranges: InstanceRegistry::new("primvar range"),
            pending: Mutex::new(PendingWork::default()),
            counters: Counters::default(),
        }
    }

    // ------------------------------------------------------------------------
    // Registries
    // ------------------------------------------------------------------------

    pub fn register_mesh_topology(&self, id: u64) -> Instance<u64, Arc<MeshTopology>> {
        self.topologies.register(id)
    }

    pub fn register_index_range(
        &self,
        topology_id: u64,
        style: IndexStyle,
    ) -> Instance<(u64, IndexStyle), RangeHandle> {
        self.index_ranges.register((topology_id, style))
    }

    pub fn register_vertex_adjacency(&self, topology_id: u64) -> Instance<u64, Arc<SharedAdjacency>> {
        self.adjacencies.register(topology_id)
    }

    pub fn register_primvar_range(&self, shared_id: u64) -> Instance<u64, RangeHandle> {
        self.primvar_ranges.register(shared_id)
    }

    pub fn topology_registry(&self) -> &InstanceRegistry<u64, Arc<MeshTopology>> {
        &self.topologies
    }

    pub fn index_range_registry(&self) -> &InstanceRegistry<(u64, IndexStyle), RangeHandle> {
        &self.index_ranges
    }

    pub fn adjacency_registry(&self) -> &InstanceRegistry<u64, Arc<SharedAdjacency>> {
        &self.adjacencies
    }

    pub fn primvar_range_registry(&self) -> &InstanceRegistry<u64, RangeHandle> {
        &self.primvar_ranges
    }

    // ------------------------------------------------------------------------
    // Allocation
    // ------------------------------------------------------------------------

    /// Allocate a fresh range.
    pub fn allocate_range(
        &self,
        role: RangeRole,
        specs: &[BufferSpec],
        mutability: Mutability,
    ) -> RangeHandle {
        let range = Arc::new(StorageRange::new(role, specs, mutability));
        Counters::bump(&self.counters.ranges_allocated, 1);
        log::debug!(
            "Allocated {:?} {} range {} with {} buffers",
            mutability,
            role,
            range.id(),
            specs.len()
        );
        range
    }

    /// Merge `specs` into `existing`.
    ///
    /// A mutable range grows in place and is returned as is. An immutable
    /// range may be aliased by other drawables and is never modified: a new
    /// immutable range with the union of the specs is allocated, and the old
    /// contents are copied over at commit.
    pub fn merge_range(
        &self,
        role: RangeRole,
        specs: &[BufferSpec],
        existing: &RangeHandle,
    ) -> RangeHandle {
        Counters::bump(&self.counters.range_merges, 1);
        if !existing.is_immutable() {
            existing.add_specs(specs);
            log::trace!("Merged {} specs into mutable range {}", specs.len(), existing.id());
            return Arc::clone(existing);
        }

        let merged = BufferSpec::merged(&existing.specs(), specs);
        let range = self.allocate_range(role, &merged, Mutability::Immutable);
        self.pending
            .lock()
            .copies
            .push((Arc::clone(existing), Arc::clone(&range)));
        range
    }

    /// Move the contents of an immutable range into a new mutable one that
    /// also has room for `specs`.
    pub fn migrate_to_mutable(
        &self,
        role: RangeRole,
        specs: &[BufferSpec],
        existing: &RangeHandle,
    ) -> RangeHandle {
        Counters::bump(&self.counters.migrations, 1);
        let merged = BufferSpec::merged(&existing.specs(), specs);
        let range = self.allocate_range(role, &merged, Mutability::Mutable);
        log::debug!(
            "Migrating {} range {} to mutable range {}",
            role,
            existing.id(),
            range.id()
        );
        crate::profiling::profile_message!("storage migration");
        self.pending
            .lock()
            .copies
            .push((Arc::clone(existing), Arc::clone(&range)));
        range
    }

    // ------------------------------------------------------------------------
    // Queueing
    // ------------------------------------------------------------------------

    pub fn add_source(&self, range: &RangeHandle, source: BufferSource) {
        self.add_sources(range, vec![source]);
    }

    /// Queue `sources` to be written into `range` at commit.
    pub fn add_sources(&self, range: &RangeHandle, sources: Vec<BufferSource>) {
        if sources.is_empty() {
            return;
        }
        Counters::bump(&self.counters.sources_added, sources.len());
        let mut pending = self.pending.lock();
        pending
            .sources
            .extend(sources.into_iter().map(|source| (Arc::clone(range), source)));
    }

    /// Queue one-time topology work.
    pub fn enqueue_topology_computation(&self, computation: TopologyComputation) {
        let counter = match computation {
            TopologyComputation::Preprocess { .. } => Some(&self.counters.topology_computations),
            TopologyComputation::IndexBuilder { .. } => Some(&self.counters.index_computations),
            TopologyComputation::AdjacencyBuilder { .. } => {
                Some(&self.counters.adjacency_computations)
            }
            TopologyComputation::AdjacencyUpload { .. } => None,
        };
        if let Some(counter) = counter {
            Counters::bump(counter, 1);
        }
        log::trace!("Enqueued topology computation {:?}", computation);
        self.pending.lock().topology.push(computation);
    }

    /// Queue GPU computations against `range`, keeping their order.
    pub fn enqueue_gpu_computations(&self, range: &RangeHandle, computations: Vec<GpuComputation>) {
        if computations.is_empty() {
            return;
        }
        Counters::bump(&self.counters.gpu_computations, computations.len());
        let mut pending = self.pending.lock();
        pending.gpu.extend(
            computations
                .into_iter()
                .map(|computation| (Arc::clone(range), computation)),
        );
    }

    /// Number of queued items of every kind.
    pub fn pending_len(&self) -> usize {
        let pending = self.pending.lock();
        pending.copies.len() + pending.topology.len() + pending.sources.len() + pending.gpu.len()
    }

    // ------------------------------------------------------------------------
    // Commit
    // ------------------------------------------------------------------------

    /// Apply all queued work.
    ///
    /// Order: range copies, topology computations, source uploads, GPU
    /// computations, each in submission order. Every immutable range written
    /// during the commit is sealed at the end. Writes to ranges sealed by an
    /// earlier commit are refused and logged.
    pub fn commit(&self) -> CommitSummary {
        crate::profiling::profile_function!();

        let work = std::mem::take(&mut *self.pending.lock());
        let mut summary = CommitSummary::default();
        let mut touched: HashMap<u64, RangeHandle> = HashMap::new();

        for (from, to) in &work.copies {
            record(to.copy_from(from).map(|_| ()), &mut summary);
            touched.insert(to.id(), Arc::clone(to));
            summary.copies += 1;
        }

        for computation in &work.topology {
            record(computation.execute(), &mut summary);
            if let TopologyComputation::IndexBuilder { range, .. }
            | TopologyComputation::AdjacencyUpload { range, .. } = computation
            {
                touched.insert(range.id(), Arc::clone(range));
            }
            summary.topology_computations += 1;
        }

        for (range, source) in work.sources {
            record(range.write(source), &mut summary);
            touched.insert(range.id(), range);
            summary.sources += 1;
        }

        for (range, computation) in &work.gpu {
            log::trace!("Executing {:?} on range {}", computation, range.id());
            record(computation.execute(range), &mut summary);
            touched.insert(range.id(), Arc::clone(range));
            summary.gpu_computations += 1;
        }

        for range in touched.values() {
            if range.is_immutable() && !range.is_sealed() {
                range.seal();
                summary.sealed_ranges += 1;
            }
        }

        Counters::bump(&self.counters.commits, 1);
        Counters::bump(&self.counters.refused_writes, summary.refused_writes);
        crate::profiling::plot_registry_stats(&self.stats());
        log::debug!("Commit: {:?}", summary);
        summary
    }

    // ------------------------------------------------------------------------
    // Maintenance
    // ------------------------------------------------------------------------

    /// Drop registry entries that nothing outside the registry references.
    ///
    /// Never called by sync; the owner of the registry decides when to sweep.
    pub fn garbage_collect(&self) -> usize {
        // Ranges first: they hold no topology, but adjacencies do.
        let removed = self.primvar_ranges.garbage_collect()
            + self.index_ranges.garbage_collect()
            + self.adjacencies.garbage_collect()
            + self.topologies.garbage_collect();
        log::debug!("Garbage collection released {} entries", removed);
        removed
    }

    pub fn stats(&self) -> RegistryStats {
        self.counters.snapshot()
    }
}

fn record(result: Result<(), SyncError>, summary: &mut CommitSummary) {
    if let Err(err) = result {
        log::error!("Commit: {}", err);
        summary.refused_writes += 1;
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("topologies", &self.topologies.len())
            .field("index_ranges", &self.index_ranges.len())
            .field("adjacencies", &self.adjacencies.len())
            .field("primvar_ranges", &self.primvar_ranges.len())
            .field("stats", &self.stats())
            .finish()
    }
}

static_assertions::assert_impl_all!(ResourceRegistry: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::buffer::{BufferRole, ElementFormat, names};

    fn points_spec() -> BufferSpec {
        BufferSpec::new(names::POINTS, ElementFormat::Float3)
    }

    fn points(value: f32) -> BufferSource {
        BufferSource::from_vec3(names::POINTS, BufferRole::Points, &[[value; 3]; 4])
    }

    #[test]
    fn test_commit_seals_immutable_ranges() {
        let registry = ResourceRegistry::new();
        let range = registry.allocate_range(
            RangeRole::VertexPrimvar,
            &[points_spec()],
            Mutability::Immutable,
        );
        registry.add_source(&range, points(1.0));
        let summary = registry.commit();
        assert_eq!(summary.sources, 1);
        assert_eq!(summary.sealed_ranges, 1);
        assert!(range.is_sealed());

        registry.add_source(&range, points(2.0));
        let summary = registry.commit();
        assert_eq!(summary.refused_writes, 1);
        assert_eq!(range.buffer(names::POINTS).unwrap(), points(1.0));
        assert_eq!(registry.stats().refused_writes, 1);
    }

    #[test]
    fn test_merge_mutable_in_place() {
        let registry = ResourceRegistry::new();
        let range = registry.allocate_range(
            RangeRole::VertexPrimvar,
            &[points_spec()],
            Mutability::Mutable,
        );
        let width = BufferSpec::new("width", ElementFormat::Float);
        let merged = registry.merge_range(RangeRole::VertexPrimvar, &[width.clone()], &range);
        assert!(Arc::ptr_eq(&merged, &range));
        assert!(merged.specs().contains(&width));
    }

    #[test]
    fn test_merge_immutable_allocates_and_copies() {
        let registry = ResourceRegistry::new();
        let range = registry.allocate_range(
            RangeRole::VertexPrimvar,
            &[points_spec()],
            Mutability::Immutable,
        );
        registry.add_source(&range, points(1.0));
        registry.commit();

        let width = BufferSpec::new("width", ElementFormat::Float);
        let merged = registry.merge_range(RangeRole::VertexPrimvar, &[width], &range);
        assert!(!Arc::ptr_eq(&merged, &range));
        assert!(merged.is_immutable());

        registry.commit();
        assert_eq!(merged.buffer(names::POINTS).unwrap(), points(1.0));
        assert!(merged.is_sealed());
    }

    #[test]
    fn test_migrate_to_mutable() {
        let registry = ResourceRegistry::new();
        let range = registry.allocate_range(
            RangeRole::VertexPrimvar,
            &[points_spec()],
            Mutability::Immutable,
        );
        registry.add_source(&range, points(1.0));
        registry.commit();

        let migrated = registry.migrate_to_mutable(RangeRole::VertexPrimvar, &[points_spec()], &range);
        registry.add_source(&migrated, points(3.0));
        registry.commit();

        assert!(!migrated.is_immutable());
        assert!(!migrated.is_sealed());
        assert_eq!(migrated.buffer(names::POINTS).unwrap(), points(3.0));
        assert_eq!(range.buffer(names::POINTS).unwrap(), points(1.0));
        assert_eq!(registry.stats().migrations, 1);
    }

    #[test]
    fn test_garbage_collect_drops_unreferenced_ranges() {
        let registry = ResourceRegistry::new();
        let kept = registry.allocate_range(RangeRole::VertexPrimvar, &[], Mutability::Immutable);
        {
            let mut instance = registry.register_primvar_range(1);
            instance.set_value(Arc::clone(&kept));
        }
        {
            let mut instance = registry.register_primvar_range(2);
            instance.set_value(registry.allocate_range(
                RangeRole::VertexPrimvar,
                &[],
                Mutability::Immutable,
            ));
        }
        assert_eq!(registry.garbage_collect(), 1);
        assert_eq!(registry.primvar_range_registry().len(), 1);
        assert!(!registry.register_primvar_range(1).is_first_instance());
    }
}
