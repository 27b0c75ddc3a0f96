//! Scene delegate interface.
//!
//! The scene delegate is the external collaborator that supplies raw
//! attribute values. Mesh sync only pulls what the dirty bits ask for.

use bitflags::bitflags;
use strata_core::buffer::{BufferData, BufferRole, ElementFormat, InterpolationClass};
use strata_core::mesh::{RawTopology, SubdivTags};

/// Refinement and shading flags of a mesh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DisplayStyle {
    pub refine_level: u32,
    pub flat_shading: bool,
    pub displacement: bool,
}

impl DisplayStyle {
    pub fn with_refine_level(mut self, refine_level: u32) -> Self {
        self.refine_level = refine_level;
        self
    }

    pub fn with_flat_shading(mut self, flat_shading: bool) -> Self {
        self.flat_shading = flat_shading;
        self
    }
}

/// Name and role of an authored primvar.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrimvarDescriptor {
    pub name: String,
    pub role: BufferRole,
}

impl PrimvarDescriptor {
    pub fn new(name: impl Into<String>, role: BufferRole) -> Self {
        Self {
            name: name.into(),
            role,
        }
    }
}

/// A typed array returned by the delegate.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimvarValue {
    format: ElementFormat,
    data: BufferData,
}

impl PrimvarValue {
    /// Wrap raw components. Returns `None` if the data does not match the
    /// format (scalar type or a partial trailing element).
    pub fn new(format: ElementFormat, data: BufferData) -> Option<Self> {
        (data.scalar() == format.scalar() && data.len() % format.components() == 0)
            .then_some(Self { format, data })
    }

    pub fn vec3(values: &[[f32; 3]]) -> Self {
        let flat: &[f32] = bytemuck::cast_slice(values);
        Self {
            format: ElementFormat::Float3,
            data: BufferData::Float(flat.to_vec()),
        }
    }

    pub fn dvec3(values: &[[f64; 3]]) -> Self {
        let flat: &[f64] = bytemuck::cast_slice(values);
        Self {
            format: ElementFormat::Double3,
            data: BufferData::Double(flat.to_vec()),
        }
    }

    pub fn floats(values: Vec<f32>) -> Self {
        Self {
            format: ElementFormat::Float,
            data: BufferData::Float(values),
        }
    }

    pub fn ints(values: Vec<i32>) -> Self {
        Self {
            format: ElementFormat::Int,
            data: BufferData::Int(values),
        }
    }

    pub fn format(&self) -> ElementFormat {
        self.format
    }

    pub fn data(&self) -> &BufferData {
        &self.data
    }

    pub fn into_parts(self) -> (ElementFormat, BufferData) {
        (self.format, self.data)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

bitflags! {
    /// What the bound material can do, as far as mesh sync cares.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MaterialCapabilities: u8 {
        /// Per-face textures; requires quad indices.
        const PTEX = 1 << 0;
        /// Limit surface evaluation; refinement switches to patches and
        /// normals come from the limit surface.
        const LIMIT_SURFACE_EVALUATION = 1 << 1;
    }
}

/// Face culling preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CullStyle {
    /// No opinion; defer to the next level.
    #[default]
    DontCare,
    Nothing,
    Back,
    Front,
    BackUnlessDoubleSided,
    FrontUnlessDoubleSided,
}

/// Source of scene data for mesh sync.
///
/// Drawables are synced in parallel, so implementations must be `Sync`.
/// Methods with defaults describe optional scene data.
pub trait SceneDelegate: Send + Sync {
    fn topology(&self, id: &str) -> RawTopology;

    fn display_style(&self, _id: &str) -> DisplayStyle {
        DisplayStyle::default()
    }

    fn subdiv_tags(&self, _id: &str) -> SubdivTags {
        SubdivTags::default()
    }

    fn primvar_descriptors(&self, id: &str, class: InterpolationClass) -> Vec<PrimvarDescriptor>;

    fn primvar(&self, id: &str, name: &str) -> Option<PrimvarValue>;

    fn material_id(&self, _id: &str) -> Option<String> {
        None
    }

    /// Capabilities of `material`, or of the fallback material for `None`.
    fn material_capabilities(&self, _material: Option<&str>) -> MaterialCapabilities {
        MaterialCapabilities::empty()
    }

    fn double_sided(&self, _id: &str) -> bool {
        false
    }

    fn cull_style(&self, _id: &str) -> CullStyle {
        CullStyle::DontCare
    }
}
