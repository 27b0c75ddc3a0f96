//! Typed buffer sources and specs.
//!
//! A [`BufferSource`] is a named, typed array waiting to be stored in a
//! storage range. It is immutable once built; derived data (truncated,
//! refined, quadrangulated) is always a new source. The data itself is shared
//! through an `Arc`, so cloning a source is cheap.
//!
//! A [`BufferSpec`] is the name and element format of a buffer without its
//! data. Storage ranges are allocated and merged from specs.

use std::fmt;
use std::sync::Arc;

use crate::hash::ContentHasher;

/// Well-known buffer names.
pub mod names {
    pub const POINTS: &str = "points";
    pub const NORMALS: &str = "normals";
    pub const SMOOTH_NORMALS: &str = "smoothNormals";
    pub const PACKED_SMOOTH_NORMALS: &str = "packedSmoothNormals";
    pub const POINTS_VISIBILITY: &str = "pointsVisibility";
    pub const INDICES: &str = "indices";
    pub const PRIMITIVE_PARAM: &str = "primitiveParam";
    pub const ADJACENCY: &str = "adjacency";
    pub const QUAD_INFO: &str = "quadInfo";
    pub const SUBDIVISION_STENCILS: &str = "subdivisionStencils";
}

/// Scalar type of a buffer's components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Float,
    Double,
    Int,
    /// One `u32` holding a signed 2_10_10_10 packed vector.
    Packed,
}

/// Element format of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementFormat {
    Float,
    Float2,
    Float3,
    Float4,
    Double3,
    Int,
    Int2,
    Int3,
    Int4,
    /// A normal packed into 2_10_10_10 signed normalized components.
    PackedNormal,
}

impl ElementFormat {
    /// Number of scalar components per element.
    pub fn components(self) -> usize {
        match self {
            Self::Float | Self::Int | Self::PackedNormal => 1,
            Self::Float2 | Self::Int2 => 2,
            Self::Float3 | Self::Double3 | Self::Int3 => 3,
            Self::Float4 | Self::Int4 => 4,
        }
    }

    /// Component scalar type.
    pub fn scalar(self) -> ScalarType {
        match self {
            Self::Float | Self::Float2 | Self::Float3 | Self::Float4 => ScalarType::Float,
            Self::Double3 => ScalarType::Double,
            Self::Int | Self::Int2 | Self::Int3 | Self::Int4 => ScalarType::Int,
            Self::PackedNormal => ScalarType::Packed,
        }
    }

    /// Size of one element in bytes.
    pub fn size_bytes(self) -> usize {
        let scalar = match self.scalar() {
            ScalarType::Double => 8,
            ScalarType::Float | ScalarType::Int | ScalarType::Packed => 4,
        };
        scalar * self.components()
    }

    /// Float format with `components` components, if one exists.
    pub fn float_with_components(components: usize) -> Option<Self> {
        match components {
            1 => Some(Self::Float),
            2 => Some(Self::Float2),
            3 => Some(Self::Float3),
            4 => Some(Self::Float4),
            _ => None,
        }
    }
}

/// How a primvar is interpolated across the mesh, which fixes its expected
/// element count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterpolationClass {
    /// One value for the whole mesh.
    Constant,
    /// One value per face.
    Uniform,
    /// One value per point, refined with the scheme's rules.
    Vertex,
    /// One value per point, refined linearly.
    Varying,
    /// One value per face corner.
    FaceVarying,
}

impl InterpolationClass {
    /// All classes in gather order.
    pub const ALL: [InterpolationClass; 5] = [
        Self::Constant,
        Self::Vertex,
        Self::Varying,
        Self::Uniform,
        Self::FaceVarying,
    ];
}

impl fmt::Display for InterpolationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Constant => "constant",
            Self::Uniform => "uniform",
            Self::Vertex => "vertex",
            Self::Varying => "varying",
            Self::FaceVarying => "faceVarying",
        };
        f.write_str(name)
    }
}

/// What a buffer is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferRole {
    Points,
    Normals,
    Primvar,
    Index,
    Adjacency,
    /// Per-topology tables consumed by derived computations.
    TopologyTable,
}

/// Raw component storage of a buffer.
#[derive(Clone, PartialEq)]
pub enum BufferData {
    Float(Vec<f32>),
    Double(Vec<f64>),
    Int(Vec<i32>),
    Packed(Vec<u32>),
}

impl BufferData {
    /// Number of scalar components stored.
    pub fn len(&self) -> usize {
        match self {
            Self::Float(v) => v.len(),
            Self::Double(v) => v.len(),
            Self::Int(v) => v.len(),
            Self::Packed(v) => v.len(),
        }
    }

    /// Check if no components are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Scalar type of the stored components.
    pub fn scalar(&self) -> ScalarType {
        match self {
            Self::Float(_) => ScalarType::Float,
            Self::Double(_) => ScalarType::Double,
            Self::Int(_) => ScalarType::Int,
            Self::Packed(_) => ScalarType::Packed,
        }
    }

    /// Raw bytes of the stored components.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Float(v) => bytemuck::cast_slice(v),
            Self::Double(v) => bytemuck::cast_slice(v),
            Self::Int(v) => bytemuck::cast_slice(v),
            Self::Packed(v) => bytemuck::cast_slice(v),
        }
    }

    /// Copy of the first `count` components.
    pub fn prefix(&self, count: usize) -> Self {
        match self {
            Self::Float(v) => Self::Float(v[..count.min(v.len())].to_vec()),
            Self::Double(v) => Self::Double(v[..count.min(v.len())].to_vec()),
            Self::Int(v) => Self::Int(v[..count.min(v.len())].to_vec()),
            Self::Packed(v) => Self::Packed(v[..count.min(v.len())].to_vec()),
        }
    }

    /// Components widened to `f64`. Packed data is returned as raw integers.
    pub fn to_f64(&self) -> Vec<f64> {
        match self {
            Self::Float(v) => v.iter().map(|&x| x as f64).collect(),
            Self::Double(v) => v.clone(),
            Self::Int(v) => v.iter().map(|&x| x as f64).collect(),
            Self::Packed(v) => v.iter().map(|&x| x as f64).collect(),
        }
    }

    /// Borrow float components.
    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            Self::Float(v) => Some(v),
            _ => None,
        }
    }

    /// Borrow integer components.
    pub fn as_i32(&self) -> Option<&[i32]> {
        match self {
            Self::Int(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Debug for BufferData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferData")
            .field("scalar", &self.scalar())
            .field("len", &self.len())
            .finish()
    }
}

/// A named, typed, fixed-length array awaiting storage.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferSource {
    name: String,
    role: BufferRole,
    format: ElementFormat,
    data: Arc<BufferData>,
}

impl BufferSource {
    /// Create a source from raw component data.
    ///
    /// The component count must be a multiple of the format's component count.
    pub fn new(
        name: impl Into<String>,
        role: BufferRole,
        format: ElementFormat,
        data: BufferData,
    ) -> Self {
        debug_assert_eq!(data.scalar(), format.scalar(), "data does not match format");
        debug_assert_eq!(
            data.len() % format.components(),
            0,
            "partial element in buffer source"
        );
        Self {
            name: name.into(),
            role,
            format,
            data: Arc::new(data),
        }
    }

    /// Create a `Float3` source.
    pub fn from_vec3(name: impl Into<String>, role: BufferRole, values: &[[f32; 3]]) -> Self {
        let flat: &[f32] = bytemuck::cast_slice(values);
        Self::new(name, role, ElementFormat::Float3, BufferData::Float(flat.to_vec()))
    }

    /// Create a `Float` source.
    pub fn from_f32(name: impl Into<String>, role: BufferRole, values: Vec<f32>) -> Self {
        Self::new(name, role, ElementFormat::Float, BufferData::Float(values))
    }

    /// Create an `Int` source.
    pub fn from_i32(name: impl Into<String>, role: BufferRole, values: Vec<i32>) -> Self {
        Self::new(name, role, ElementFormat::Int, BufferData::Int(values))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> BufferRole {
        self.role
    }

    pub fn format(&self) -> ElementFormat {
        self.format
    }

    pub fn data(&self) -> &Arc<BufferData> {
        &self.data
    }

    /// Number of elements (not components).
    pub fn num_elements(&self) -> usize {
        self.data.len() / self.format.components()
    }

    /// Spec describing this source.
    pub fn spec(&self) -> BufferSpec {
        BufferSpec::new(self.name.clone(), self.format)
    }

    /// A copy holding only the first `count` elements.
    ///
    /// Returns a clone sharing the same data when nothing is cut.
    pub fn truncated(&self, count: usize) -> Self {
        if count >= self.num_elements() {
            return self.clone();
        }
        Self {
            name: self.name.clone(),
            role: self.role,
            format: self.format,
            data: Arc::new(self.data.prefix(count * self.format.components())),
        }
    }

    /// Same data under a different name and role.
    pub fn renamed(&self, name: impl Into<String>, role: BufferRole) -> Self {
        Self {
            name: name.into(),
            role,
            format: self.format,
            data: Arc::clone(&self.data),
        }
    }

    /// Float data copied out as `N`-component elements, if the layout matches.
    pub fn as_elements<const N: usize>(&self) -> Option<Vec<[f32; N]>> {
        if N == 0 || self.format.components() != N {
            return None;
        }
        let values = self.data.as_f32()?;
        values
            .chunks_exact(N)
            .map(|chunk| <[f32; N]>::try_from(chunk).ok())
            .collect()
    }

    /// Mix name, format and content into `hasher`.
    pub fn hash_content(&self, hasher: &mut ContentHasher) {
        hasher.write_str(&self.name);
        hasher.write(&self.format);
        hasher.write_bytes(self.data.as_bytes());
    }
}

/// Name and element format of a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferSpec {
    pub name: String,
    pub format: ElementFormat,
}

impl BufferSpec {
    pub fn new(name: impl Into<String>, format: ElementFormat) -> Self {
        Self {
            name: name.into(),
            format,
        }
    }

    /// Specs of every source, in order.
    pub fn of_sources(sources: &[BufferSource]) -> Vec<BufferSpec> {
        sources.iter().map(BufferSource::spec).collect()
    }

    /// Check if every spec in `new` exists in `existing` with the same format.
    pub fn is_subset(new: &[BufferSpec], existing: &[BufferSpec]) -> bool {
        new.iter().all(|spec| existing.contains(spec))
    }

    /// Check if any spec in `new` names a buffer of `existing` with a
    /// different format.
    pub fn conflicts(new: &[BufferSpec], existing: &[BufferSpec]) -> bool {
        new.iter().any(|spec| {
            existing
                .iter()
                .any(|other| other.name == spec.name && other.format != spec.format)
        })
    }

    /// Union of `existing` and `new`; a spec in `new` replaces one with the
    /// same name.
    pub fn merged(existing: &[BufferSpec], new: &[BufferSpec]) -> Vec<BufferSpec> {
        let mut result: Vec<BufferSpec> = existing
            .iter()
            .filter(|spec| !new.iter().any(|n| n.name == spec.name))
            .cloned()
            .collect();
        result.extend(new.iter().cloned());
        result.sort();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(count: usize) -> BufferSource {
        let values: Vec<[f32; 3]> = (0..count).map(|i| [i as f32, 0.0, 0.0]).collect();
        BufferSource::from_vec3(names::POINTS, BufferRole::Points, &values)
    }

    #[test]
    fn test_num_elements_counts_vectors() {
        assert_eq!(points(12).num_elements(), 12);
        assert_eq!(points(12).data().len(), 36);
    }

    #[test]
    fn test_truncated_keeps_prefix() {
        let source = points(120);
        let cut = source.truncated(100);
        assert_eq!(cut.num_elements(), 100);
        let elements = cut.as_elements::<3>().unwrap();
        assert_eq!(elements[99], [99.0, 0.0, 0.0]);
        assert_eq!(&source.as_elements::<3>().unwrap()[..100], elements.as_slice());
    }

    #[test]
    fn test_as_elements_checks_layout() {
        let source = points(2);
        assert_eq!(
            source.as_elements::<3>(),
            Some(vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]])
        );
        assert_eq!(source.as_elements::<2>(), None);

        let ints = BufferSource::from_i32("ids", BufferRole::Primvar, vec![1, 2, 3]);
        assert_eq!(ints.as_elements::<1>(), None);
    }

    #[test]
    fn test_truncated_noop_shares_data() {
        let source = points(4);
        let same = source.truncated(10);
        assert!(Arc::ptr_eq(source.data(), same.data()));
    }

    #[test]
    fn test_format_sizes() {
        assert_eq!(ElementFormat::Float3.size_bytes(), 12);
        assert_eq!(ElementFormat::Double3.size_bytes(), 24);
        assert_eq!(ElementFormat::PackedNormal.size_bytes(), 4);
        assert_eq!(ElementFormat::Int4.components(), 4);
    }

    #[test]
    fn test_spec_subset_and_conflict() {
        let existing = vec![
            BufferSpec::new("points", ElementFormat::Float3),
            BufferSpec::new("normals", ElementFormat::PackedNormal),
        ];
        let same = vec![BufferSpec::new("points", ElementFormat::Float3)];
        let unpacked = vec![BufferSpec::new("normals", ElementFormat::Float3)];
        let extra = vec![BufferSpec::new("displayColor", ElementFormat::Float3)];

        assert!(BufferSpec::is_subset(&same, &existing));
        assert!(!BufferSpec::is_subset(&unpacked, &existing));
        assert!(BufferSpec::conflicts(&unpacked, &existing));
        assert!(!BufferSpec::conflicts(&extra, &existing));

        let merged = BufferSpec::merged(&existing, &unpacked);
        assert_eq!(merged.len(), 2);
        assert!(merged.contains(&BufferSpec::new("normals", ElementFormat::Float3)));
    }

    #[test]
    fn test_content_hash_distinguishes_values() {
        let mut a = ContentHasher::new();
        points(3).hash_content(&mut a);
        let mut b = ContentHasher::new();
        points(4).truncated(3).hash_content(&mut b);
        assert_eq!(a.finish(), b.finish());

        let mut c = ContentHasher::new();
        points(3).renamed("other", BufferRole::Primvar).hash_content(&mut c);
        assert_ne!(a.finish(), c.finish());
    }
}
