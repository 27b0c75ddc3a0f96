//! Representations, draw items and their storage slots.

use strata_core::buffer::InterpolationClass;

use super::delegate::CullStyle;
use super::index_range::IndexStyle;
use crate::resources::RangeHandle;

/// How a representation draws the mesh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum GeomStyle {
    #[default]
    Surface,
    /// The coarse control cage.
    Hull,
    Points,
}

impl GeomStyle {
    pub fn index_style(self) -> IndexStyle {
        match self {
            Self::Surface => IndexStyle::Refined,
            Self::Hull => IndexStyle::Hull,
            Self::Points => IndexStyle::Points,
        }
    }
}

/// Description of one representation of a mesh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ReprDesc {
    pub geom_style: GeomStyle,
    pub flat_shading: bool,
    /// Overrides the scene's cull style unless `DontCare`.
    pub cull_style: CullStyle,
}

impl ReprDesc {
    pub fn new(geom_style: GeomStyle) -> Self {
        Self {
            geom_style,
            ..Default::default()
        }
    }

    pub fn with_flat_shading(mut self, flat_shading: bool) -> Self {
        self.flat_shading = flat_shading;
        self
    }

    pub fn with_cull_style(mut self, cull_style: CullStyle) -> Self {
        self.cull_style = cull_style;
        self
    }

    /// Check if the representation needs generated smooth normals.
    pub fn wants_smooth_normals(&self) -> bool {
        !self.flat_shading && self.geom_style != GeomStyle::Points
    }
}

/// Where a draw item's normals come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum NormalSource {
    /// Authored normals.
    Scene,
    /// Generated smooth normals.
    Smooth,
    /// Limit surface normals of patch evaluation.
    Limit,
    /// Per-face normals derived in the shader.
    #[default]
    Flat,
}

/// Primitive type a draw item is submitted as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Points,
    #[default]
    CoarseTriangles,
    CoarseQuads,
    RefinedTriangles,
    RefinedQuads,
    Patches,
}

/// Storage slots shared by every draw item of a mesh.
///
/// Primvar slots are shared; the index slot depends on the draw item's style.
#[derive(Debug, Clone, Default)]
pub struct DrawableCoord {
    pub constant: Option<RangeHandle>,
    pub vertex: Option<RangeHandle>,
    pub element: Option<RangeHandle>,
    pub face_varying: Option<RangeHandle>,
    surface_indices: Option<RangeHandle>,
    hull_indices: Option<RangeHandle>,
    points_indices: Option<RangeHandle>,
}

impl DrawableCoord {
    /// Index range for `style`.
    pub fn topology(&self, style: IndexStyle) -> Option<&RangeHandle> {
        match style {
            IndexStyle::Refined => self.surface_indices.as_ref(),
            IndexStyle::Hull => self.hull_indices.as_ref(),
            IndexStyle::Points => self.points_indices.as_ref(),
        }
    }

    pub(crate) fn set_topology(&mut self, style: IndexStyle, range: RangeHandle) -> Option<RangeHandle> {
        let slot = match style {
            IndexStyle::Refined => &mut self.surface_indices,
            IndexStyle::Hull => &mut self.hull_indices,
            IndexStyle::Points => &mut self.points_indices,
        };
        slot.replace(range)
    }

    /// Range holding primvars of `class`.
    pub fn primvar(&self, class: InterpolationClass) -> Option<&RangeHandle> {
        match class {
            InterpolationClass::Constant => self.constant.as_ref(),
            InterpolationClass::Vertex | InterpolationClass::Varying => self.vertex.as_ref(),
            InterpolationClass::Uniform => self.element.as_ref(),
            InterpolationClass::FaceVarying => self.face_varying.as_ref(),
        }
    }
}

/// One draw item of a mesh representation.
///
/// The shader-facing state is refreshed whenever display style, cull style,
/// double-sidedness, material or representations change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawItem {
    pub desc: ReprDesc,
    pub primitive_type: PrimitiveType,
    pub normal_source: NormalSource,
    /// Interpolation of scene normals when `normal_source` is `Scene`.
    pub normals_interpolation: Option<InterpolationClass>,
    pub cull_style: CullStyle,
    pub double_sided: bool,
}

impl DrawItem {
    pub fn new(desc: ReprDesc) -> Self {
        Self {
            desc,
            primitive_type: PrimitiveType::default(),
            normal_source: NormalSource::default(),
            normals_interpolation: None,
            cull_style: desc.cull_style,
            double_sided: false,
        }
    }

    pub fn index_style(&self) -> IndexStyle {
        self.desc.geom_style.index_style()
    }
}
