//! Storage ranges.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use strata_core::buffer::{BufferSource, BufferSpec};

use crate::error::{SyncError, SyncResult};

/// What a range stores, which decides the pool it is allocated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeRole {
    /// Index buffers and primitive params.
    Topology,
    /// Vertex adjacency tables for GPU smooth normals.
    Adjacency,
    ConstantPrimvar,
    /// Vertex and varying primvars, including points and normals.
    VertexPrimvar,
    /// Uniform (per-face) primvars.
    ElementPrimvar,
    FaceVaryingPrimvar,
}

impl RangeRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Topology => "topology",
            Self::Adjacency => "adjacency",
            Self::ConstantPrimvar => "constantPrimvar",
            Self::VertexPrimvar => "vertexPrimvar",
            Self::ElementPrimvar => "elementPrimvar",
            Self::FaceVaryingPrimvar => "faceVaryingPrimvar",
        }
    }
}

impl fmt::Display for RangeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a range may be written after its first commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutability {
    /// Written in place on every update; owned by one drawable.
    Mutable,
    /// Written once, sealed at commit, then shared read-only.
    Immutable,
}

/// Shared handle to a storage range.
///
/// Identity (`Arc::ptr_eq`) is what draw batches key on.
pub type RangeHandle = Arc<StorageRange>;

static NEXT_RANGE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Default)]
struct RangeState {
    specs: Vec<BufferSpec>,
    buffers: HashMap<String, BufferSource>,
    sealed: bool,
    version: u64,
}

/// A region of backing storage holding one or more named buffers.
///
/// Ranges are created by the [`ResourceRegistry`](super::ResourceRegistry).
/// Buffer contents arrive at commit; until then [`buffer`](Self::buffer)
/// returns what the previous commit left.
pub struct StorageRange {
    id: u64,
    role: RangeRole,
    mutability: Mutability,
    state: RwLock<RangeState>,
}

impl StorageRange {
    pub(crate) fn new(role: RangeRole, specs: &[BufferSpec], mutability: Mutability) -> Self {
        let mut sorted = specs.to_vec();
        sorted.sort();
        sorted.dedup();
        Self {
            id: NEXT_RANGE_ID.fetch_add(1, Ordering::Relaxed),
            role,
            mutability,
            state: RwLock::new(RangeState {
                specs: sorted,
                ..Default::default()
            }),
        }
    }

    /// Process-unique id, stable for the lifetime of the range.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn role(&self) -> RangeRole {
        self.role
    }

    pub fn mutability(&self) -> Mutability {
        self.mutability
    }

    pub fn is_immutable(&self) -> bool {
        self.mutability == Mutability::Immutable
    }

    /// An immutable range that has been committed and can no longer be written.
    pub fn is_sealed(&self) -> bool {
        self.state.read().sealed
    }

    /// Buffer specs this range was allocated (or last merged) with, sorted.
    pub fn specs(&self) -> Vec<BufferSpec> {
        self.state.read().specs.clone()
    }

    pub fn has_buffer_spec(&self, name: &str) -> bool {
        self.state.read().specs.iter().any(|spec| spec.name == name)
    }

    /// Committed contents of the buffer called `name`.
    pub fn buffer(&self, name: &str) -> Option<BufferSource> {
        self.state.read().buffers.get(name).cloned()
    }

    /// Names of every committed buffer, sorted.
    pub fn buffer_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.read().buffers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of committed writes.
    pub fn version(&self) -> u64 {
        self.state.read().version
    }

    pub(crate) fn add_specs(&self, specs: &[BufferSpec]) {
        let mut state = self.state.write();
        state.specs = BufferSpec::merged(&state.specs, specs);
    }

    /// Store `source` under its name.
    ///
    /// A source for a buffer without a spec extends the specs, since computed
    /// outputs can appear after allocation.
    pub(crate) fn write(&self, source: BufferSource) -> SyncResult<()> {
        let mut state = self.state.write();
        if state.sealed {
            return Err(SyncError::SealedRange(self.id));
        }
        let spec = source.spec();
        if !state.specs.contains(&spec) {
            state.specs = BufferSpec::merged(&state.specs, std::slice::from_ref(&spec));
        }
        state.buffers.insert(source.name().to_string(), source);
        state.version += 1;
        Ok(())
    }

    /// Copy every buffer `other` holds that this range has a matching spec for.
    pub(crate) fn copy_from(&self, other: &StorageRange) -> SyncResult<usize> {
        if std::ptr::eq(self, other) {
            return Ok(0);
        }
        let buffers: Vec<BufferSource> = other.state.read().buffers.values().cloned().collect();
        let mut copied = 0;
        for buffer in buffers {
            if self.state.read().specs.contains(&buffer.spec()) {
                self.write(buffer)?;
                copied += 1;
            }
        }
        Ok(copied)
    }

    /// Seal an immutable range. Mutable ranges are never sealed.
    pub(crate) fn seal(&self) {
        if self.is_immutable() {
            self.state.write().sealed = true;
        }
    }
}

impl fmt::Debug for StorageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("StorageRange")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("mutability", &self.mutability)
            .field("specs", &state.specs)
            .field("sealed", &state.sealed)
            .finish()
    }
}

static_assertions::assert_impl_all!(StorageRange: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::buffer::{BufferRole, ElementFormat, names};

    fn points() -> BufferSource {
        BufferSource::from_vec3(names::POINTS, BufferRole::Points, &[[0.0; 3], [1.0; 3]])
    }

    #[test]
    fn test_ids_are_unique() {
        let a = StorageRange::new(RangeRole::Topology, &[], Mutability::Immutable);
        let b = StorageRange::new(RangeRole::Topology, &[], Mutability::Immutable);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_sealed_range_refuses_writes() {
        let range = StorageRange::new(RangeRole::VertexPrimvar, &[], Mutability::Immutable);
        range.write(points()).unwrap();
        range.seal();
        assert_eq!(range.write(points()), Err(SyncError::SealedRange(range.id())));
        assert_eq!(range.version(), 1);
    }

    #[test]
    fn test_mutable_range_never_seals() {
        let range = StorageRange::new(RangeRole::VertexPrimvar, &[], Mutability::Mutable);
        range.seal();
        assert!(!range.is_sealed());
        range.write(points()).unwrap();
        range.write(points()).unwrap();
        assert_eq!(range.version(), 2);
    }

    #[test]
    fn test_write_extends_specs() {
        let range = StorageRange::new(RangeRole::VertexPrimvar, &[], Mutability::Mutable);
        range.write(points()).unwrap();
        assert_eq!(
            range.specs(),
            vec![BufferSpec::new(names::POINTS, ElementFormat::Float3)]
        );
    }

    #[test]
    fn test_copy_from_skips_unknown_specs() {
        let source = StorageRange::new(RangeRole::VertexPrimvar, &[], Mutability::Mutable);
        source.write(points()).unwrap();
        source
            .write(BufferSource::from_f32("width", BufferRole::Primvar, vec![1.0, 2.0]))
            .unwrap();

        let target = StorageRange::new(
            RangeRole::VertexPrimvar,
            &[BufferSpec::new(names::POINTS, ElementFormat::Float3)],
            Mutability::Mutable,
        );
        assert_eq!(target.copy_from(&source).unwrap(), 1);
        assert_eq!(target.buffer_names(), vec![names::POINTS.to_string()]);
    }
}
