//! Canonical mesh topology.
//!
//! [`MeshTopology`] is built from a [`RawTopology`] supplied by the scene plus
//! the refinement policy chosen for the drawable. It is immutable once built,
//! shared between every drawable that resolves to the same content hash, and
//! lazily caches the derived tables (quad info, subdivision stencils) that
//! index builders and primvar transforms need.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::hash::ContentHasher;

use super::quadrangulate::QuadInfo;
use super::subdivision::SubdivisionTables;
use super::tags::SubdivTags;

/// Subdivision scheme of a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SubdivScheme {
    #[default]
    CatmullClark,
    /// Triangle-only scheme; refines to triangles.
    Loop,
    /// Linear subdivision; refines to quads without smoothing.
    Bilinear,
    /// Polygonal mesh that is never refined.
    None,
}

impl SubdivScheme {
    /// Check if refinement under this scheme produces triangles.
    pub fn refines_to_triangles(self) -> bool {
        matches!(self, Self::Loop)
    }

    /// Check if the scheme produces a smooth limit surface.
    pub fn is_smooth(self) -> bool {
        matches!(self, Self::CatmullClark | Self::Loop)
    }
}

/// How a refined mesh is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RefineMode {
    /// Uniform refinement to `refine_level` levels.
    #[default]
    Uniform,
    /// Limit-surface patches; normals come from limit evaluation.
    Patches,
}

/// Mesh connectivity as supplied by the scene.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RawTopology {
    pub scheme: SubdivScheme,
    pub face_vertex_counts: Vec<i32>,
    pub face_vertex_indices: Vec<i32>,
}

impl RawTopology {
    pub fn new(
        scheme: SubdivScheme,
        face_vertex_counts: impl Into<Vec<i32>>,
        face_vertex_indices: impl Into<Vec<i32>>,
    ) -> Self {
        Self {
            scheme,
            face_vertex_counts: face_vertex_counts.into(),
            face_vertex_indices: face_vertex_indices.into(),
        }
    }
}

/// Canonical, hashable topology shared between drawables.
#[derive(Clone)]
pub struct MeshTopology {
    scheme: SubdivScheme,
    face_vertex_counts: Vec<i32>,
    face_vertex_indices: Vec<i32>,
    refine_level: u32,
    refine_mode: RefineMode,
    tags: SubdivTags,
    num_points: usize,
    quad_info: OnceLock<Arc<QuadInfo>>,
    subdivision: OnceLock<Arc<SubdivisionTables>>,
}

impl MeshTopology {
    /// Build the canonical topology.
    ///
    /// The `none` scheme forces refine level 0. At level 0 the refine mode is
    /// uniform and only hole tags are kept, since creases and corners have no
    /// effect without refinement.
    pub fn new(raw: RawTopology, refine_level: u32, refine_mode: RefineMode, tags: SubdivTags) -> Self {
        let refine_level = if raw.scheme == SubdivScheme::None {
            0
        } else {
            refine_level
        };
        let refine_mode = if refine_level == 0 {
            RefineMode::Uniform
        } else {
            refine_mode
        };
        let mut tags = if refine_level == 0 {
            SubdivTags::with_holes(tags.hole_indices)
        } else {
            tags
        };
        tags.canonicalize();

        let num_points = raw
            .face_vertex_indices
            .iter()
            .filter(|&&index| index >= 0)
            .max()
            .map_or(0, |&max| max as usize + 1);

        let topology = Self {
            scheme: raw.scheme,
            face_vertex_counts: raw.face_vertex_counts,
            face_vertex_indices: raw.face_vertex_indices,
            refine_level,
            refine_mode,
            tags,
            num_points,
            quad_info: OnceLock::new(),
            subdivision: OnceLock::new(),
        };

        if !topology.is_valid() {
            log::warn!(
                "MeshTopology: {} face counts do not match {} face indices; extra faces are ignored",
                topology.face_vertex_counts.len(),
                topology.face_vertex_indices.len()
            );
        }
        topology
    }

    /// Content hash over every canonical field.
    pub fn compute_hash(&self) -> u64 {
        let mut hasher = ContentHasher::new();
        hasher
            .write(&self.scheme)
            .write(&self.face_vertex_counts)
            .write(&self.face_vertex_indices)
            .write(&self.refine_level)
            .write(&self.refine_mode)
            .write(&self.tags);
        hasher.finish()
    }

    pub fn scheme(&self) -> SubdivScheme {
        self.scheme
    }

    pub fn refine_level(&self) -> u32 {
        self.refine_level
    }

    pub fn refine_mode(&self) -> RefineMode {
        self.refine_mode
    }

    pub fn tags(&self) -> &SubdivTags {
        &self.tags
    }

    pub fn face_vertex_counts(&self) -> &[i32] {
        &self.face_vertex_counts
    }

    pub fn face_vertex_indices(&self) -> &[i32] {
        &self.face_vertex_indices
    }

    /// Number of points addressed by the face indices (max index + 1).
    pub fn num_points(&self) -> usize {
        self.num_points
    }

    pub fn num_faces(&self) -> usize {
        self.face_vertex_counts.len()
    }

    /// Number of face-varying values, one per face corner.
    pub fn num_face_varyings(&self) -> usize {
        self.face_vertex_indices.len()
    }

    pub fn refines_to_triangles(&self) -> bool {
        self.scheme.refines_to_triangles()
    }

    /// Check if face counts are non-negative and add up to the index count,
    /// and every index is non-negative.
    pub fn is_valid(&self) -> bool {
        let mut total = 0usize;
        for &count in &self.face_vertex_counts {
            if count < 0 {
                return false;
            }
            total += count as usize;
        }
        total == self.face_vertex_indices.len() && self.face_vertex_indices.iter().all(|&i| i >= 0)
    }

    /// Iterate `(face index, face-varying offset, vertex indices)` per face.
    ///
    /// Stops at the first face whose indices run past the index list.
    pub fn faces(&self) -> impl Iterator<Item = (usize, usize, &[i32])> + '_ {
        self.face_vertex_counts
            .iter()
            .enumerate()
            .scan(0usize, move |offset, (face, &count)| {
                let start = *offset;
                let end = start + count.max(0) as usize;
                let vertices = self.face_vertex_indices.get(start..end)?;
                *offset = end;
                Some((face, start, vertices))
            })
    }

    /// Check if `face` is tagged as a hole.
    pub fn is_hole(&self, face: usize) -> bool {
        !self.tags.hole_indices.is_empty()
            && self.tags.hole_indices.binary_search(&(face as i32)).is_ok()
    }

    /// Quadrangulation tables, built on first use.
    pub fn quad_info(&self) -> &Arc<QuadInfo> {
        self.quad_info.get_or_init(|| Arc::new(QuadInfo::build(self)))
    }

    /// Subdivision stencil tables, built on first use.
    pub fn subdivision_tables(&self) -> &Arc<SubdivisionTables> {
        self.subdivision
            .get_or_init(|| Arc::new(SubdivisionTables::build(self)))
    }

    /// Check if derived tables were already built.
    pub fn has_quad_info(&self) -> bool {
        self.quad_info.get().is_some()
    }

    /// Check if subdivision tables were already built.
    pub fn has_subdivision_tables(&self) -> bool {
        self.subdivision.get().is_some()
    }
}

/// A face that can be drawn and refined: at least three vertices, all valid.
pub(crate) fn is_drawable_face(vertices: &[i32]) -> bool {
    vertices.len() >= 3 && vertices.iter().all(|&v| v >= 0)
}

impl PartialEq for MeshTopology {
    fn eq(&self, other: &Self) -> bool {
        self.scheme == other.scheme
            && self.refine_level == other.refine_level
            && self.refine_mode == other.refine_mode
            && self.face_vertex_counts == other.face_vertex_counts
            && self.face_vertex_indices == other.face_vertex_indices
            && self.tags == other.tags
    }
}

impl fmt::Debug for MeshTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeshTopology")
            .field("scheme", &self.scheme)
            .field("refine_level", &self.refine_level)
            .field("refine_mode", &self.refine_mode)
            .field("num_faces", &self.num_faces())
            .field("num_points", &self.num_points)
            .field("holes", &self.tags.hole_indices.len())
            .finish()
    }
}

static_assertions::assert_impl_all!(MeshTopology: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_and_triangle() -> RawTopology {
        RawTopology::new(SubdivScheme::CatmullClark, [4, 3], [0, 1, 2, 3, 3, 2, 4])
    }

    #[test]
    fn test_counts() {
        let topology = MeshTopology::new(quad_and_triangle(), 0, RefineMode::Uniform, SubdivTags::default());
        assert_eq!(topology.num_points(), 5);
        assert_eq!(topology.num_faces(), 2);
        assert_eq!(topology.num_face_varyings(), 7);
        assert!(topology.is_valid());
    }

    #[test]
    fn test_identical_topologies_hash_equal() {
        let a = MeshTopology::new(quad_and_triangle(), 1, RefineMode::Uniform, SubdivTags::default());
        let b = MeshTopology::new(quad_and_triangle(), 1, RefineMode::Uniform, SubdivTags::default());
        assert_eq!(a, b);
        assert_eq!(a.compute_hash(), b.compute_hash());
    }

    #[test]
    fn test_refine_level_participates() {
        let a = MeshTopology::new(quad_and_triangle(), 0, RefineMode::Uniform, SubdivTags::default());
        let b = MeshTopology::new(quad_and_triangle(), 2, RefineMode::Uniform, SubdivTags::default());
        assert_ne!(a.compute_hash(), b.compute_hash());
    }

    #[test]
    fn test_none_scheme_forces_level_zero() {
        let raw = RawTopology::new(SubdivScheme::None, [3], [0, 1, 2]);
        let topology = MeshTopology::new(raw, 3, RefineMode::Patches, SubdivTags::default());
        assert_eq!(topology.refine_level(), 0);
        assert_eq!(topology.refine_mode(), RefineMode::Uniform);
    }

    #[test]
    fn test_creases_ignored_without_refinement() {
        let creased = SubdivTags::default().with_crease(&[0, 1], 2.0);
        let a = MeshTopology::new(quad_and_triangle(), 0, RefineMode::Uniform, creased.clone());
        let b = MeshTopology::new(quad_and_triangle(), 0, RefineMode::Uniform, SubdivTags::default());
        assert_eq!(a.compute_hash(), b.compute_hash());

        let c = MeshTopology::new(quad_and_triangle(), 1, RefineMode::Uniform, creased);
        let d = MeshTopology::new(quad_and_triangle(), 1, RefineMode::Uniform, SubdivTags::default());
        assert_ne!(c.compute_hash(), d.compute_hash());
    }

    #[test]
    fn test_holes_kept_and_sorted() {
        let topology = MeshTopology::new(
            quad_and_triangle(),
            0,
            RefineMode::Uniform,
            SubdivTags::with_holes([1, 1, 0]),
        );
        assert!(topology.is_hole(0));
        assert!(topology.is_hole(1));
        assert_eq!(topology.tags().hole_indices, vec![0, 1]);
    }

    #[test]
    fn test_faces_stop_at_overrun() {
        let raw = RawTopology::new(SubdivScheme::CatmullClark, [3, 4], [0, 1, 2, 3, 4]);
        let topology = MeshTopology::new(raw, 0, RefineMode::Uniform, SubdivTags::default());
        assert!(!topology.is_valid());
        assert_eq!(topology.faces().count(), 1);
    }
}
