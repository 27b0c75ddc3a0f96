//! Per-drawable mesh sync.
//!
//! [`Mesh::sync`] is the gather phase for one drawable: it pulls whatever the
//! dirty bits ask for from the scene delegate, resolves shared topology,
//! index, adjacency and primvar ranges through the registry, and queues the
//! writes and computations that [`ResourceRegistry::commit`] applies later.
//!
//! Distinct meshes may be synced on different threads at the same time. All
//! cross-drawable sharing goes through the registry's single-flight entries.

use std::fmt;
use std::sync::Arc;

use strata_core::buffer::{BufferSource, BufferSpec, ElementFormat, InterpolationClass, names};
use strata_core::diagnostics::Diagnostics;
use strata_core::dirty::{DirtyBits, DirtyPropagator};
use strata_core::mesh::{Interpolation, MeshTopology, RefineMode, SubdivScheme};

use super::adjacency::{AdjacencyCache, SharedAdjacency};
use super::delegate::{CullStyle, DisplayStyle, MaterialCapabilities, SceneDelegate};
use super::drawable::{DrawItem, DrawableCoord, GeomStyle, NormalSource, PrimitiveType, ReprDesc};
use super::index_range::{IndexRangeResolver, IndexStyle};
use super::primvar::{Fetch, PointsVisibility, PrimvarPipeline};
use super::shared_range::SharedRangeResolver;
use super::topology_cache::TopologyCache;
use crate::change_tracker::ChangeTracker;
use crate::compute::{ComputationScheduler, CpuComputation, GpuComputation};
use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::resources::{Mutability, RangeHandle, RangeRole, ResourceRegistry};

/// Shared state every drawable syncs against.
#[derive(Clone, Copy)]
pub struct SyncContext<'a> {
    pub registry: &'a ResourceRegistry,
    pub change_tracker: &'a ChangeTracker,
    pub config: SyncConfig,
    pub diagnostics: &'a dyn Diagnostics,
}

impl<'a> SyncContext<'a> {
    /// Create a context with the default [`SyncConfig`].
    pub fn new(
        registry: &'a ResourceRegistry,
        change_tracker: &'a ChangeTracker,
        diagnostics: &'a dyn Diagnostics,
    ) -> Self {
        Self {
            registry,
            change_tracker,
            config: SyncConfig::default(),
            diagnostics,
        }
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }
}

impl fmt::Debug for SyncContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncContext")
            .field("registry", self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Bits that change the draw items' shader-facing state.
const SHADER_BITS: DirtyBits = DirtyBits::DISPLAY_STYLE
    .union(DirtyBits::CULL_STYLE)
    .union(DirtyBits::DOUBLE_SIDED)
    .union(DirtyBits::MATERIAL_ID)
    .union(DirtyBits::NEW_REPR);

/// Bits that require the topology to be resolved again.
const TOPOLOGY_BITS: DirtyBits = DirtyBits::TOPOLOGY
    .union(DirtyBits::DISPLAY_STYLE)
    .union(DirtyBits::SUBDIV_TAGS);

/// A mesh drawable.
///
/// Holds the drawable's representations, the storage slots they draw from,
/// and the state mesh sync needs from one frame to the next.
pub struct Mesh {
    id: Arc<str>,
    draw_items: Vec<DrawItem>,
    coord: DrawableCoord,
    tracked: DirtyBits,
    pending: DirtyBits,

    topology: Option<Arc<MeshTopology>>,
    topology_id: u64,
    use_quad_indices: bool,
    limit_normals: bool,
    adjacency: Option<Arc<SharedAdjacency>>,
    vertex_primvar_id: u64,

    display_style: DisplayStyle,
    material_id: Option<String>,
    capabilities: MaterialCapabilities,
    double_sided: bool,
    cull_style: CullStyle,

    smooth_normals: bool,
    packed_smooth_normals: bool,
    scene_normals: Option<InterpolationClass>,
    points_visibility: PointsVisibility,
}

impl Mesh {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self {
            id: id.into(),
            draw_items: Vec::new(),
            coord: DrawableCoord::default(),
            tracked: DirtyBits::empty(),
            pending: DirtyBits::empty(),
            topology: None,
            topology_id: 0,
            use_quad_indices: false,
            limit_normals: false,
            adjacency: None,
            vertex_primvar_id: 0,
            display_style: DisplayStyle::default(),
            material_id: None,
            capabilities: MaterialCapabilities::empty(),
            double_sided: false,
            cull_style: CullStyle::DontCare,
            smooth_normals: false,
            packed_smooth_normals: false,
            scene_normals: None,
            points_visibility: PointsVisibility::default(),
        }
    }

    /// Add a representation.
    ///
    /// A new representation tracks the private bits it needs and marks them
    /// dirty together with `NEW_REPR`; they are applied by the next
    /// [`sync`](Self::sync). Returns the bits that were marked, empty if the
    /// representation already exists.
    pub fn add_repr(&mut self, desc: ReprDesc) -> DirtyBits {
        if self.draw_items.iter().any(|item| item.desc == desc) {
            return DirtyBits::empty();
        }

        let mut bits = DirtyBits::NEW_REPR | desc.geom_style.index_style().dirty_bit();
        if desc.wants_smooth_normals() {
            bits |= DirtyBits::SMOOTH_NORMALS;
        }

        log::debug!("{}: new repr {:?}", self.id, desc);
        self.tracked |= bits & DirtyBits::PRIVATE;
        self.pending |= bits;
        self.draw_items.push(DrawItem::new(desc));
        bits
    }

    /// Expand `bits` with everything they imply for this drawable.
    pub fn propagate_dirty_bits(&self, bits: DirtyBits, config: &SyncConfig) -> DirtyBits {
        DirtyPropagator::new(self.tracked, !config.gpu_compute).propagate(bits)
    }

    /// Bring the drawable up to date with the scene.
    ///
    /// Returns the dirty bits that mesh sync does not own (visibility,
    /// transform); every owned bit is consumed. On error the caller keeps its
    /// dirty bits and may retry.
    pub fn sync(
        &mut self,
        ctx: &SyncContext<'_>,
        delegate: &dyn SceneDelegate,
        dirty_bits: DirtyBits,
    ) -> SyncResult<DirtyBits> {
        crate::profiling::profile_scope!("mesh_sync");

        let mut bits = self.propagate_dirty_bits(dirty_bits | self.pending, &ctx.config);
        let passthrough = bits - DirtyBits::OWNED;
        let shader_dirty = bits.intersects(SHADER_BITS);

        if bits.intersects(DirtyBits::MATERIAL_ID | DirtyBits::TOPOLOGY) {
            self.material_id = delegate.material_id(&self.id);
            self.capabilities = delegate.material_capabilities(self.material_id.as_deref());
        }
        if bits.contains(DirtyBits::DOUBLE_SIDED) {
            self.double_sided = delegate.double_sided(&self.id);
        }
        if bits.contains(DirtyBits::CULL_STYLE) {
            self.cull_style = delegate.cull_style(&self.id);
        }

        let require_smooth_normals = self
            .draw_items
            .iter()
            .any(|item| item.desc.wants_smooth_normals());

        for index in 0..self.draw_items.len() {
            let desc = self.draw_items[index].desc;
            self.update_draw_item(ctx, delegate, &mut bits, desc, require_smooth_normals)?;
        }

        if shader_dirty {
            self.update_shader_state();
            ctx.change_tracker.mark_shader_bindings_dirty();
        }

        self.pending = DirtyBits::empty();
        log::trace!("{}: synced, passing through {:?}", self.id, passthrough);
        Ok(passthrough)
    }

    /// Release every range this drawable holds.
    pub fn release(&mut self, change_tracker: &ChangeTracker) {
        self.coord = DrawableCoord::default();
        self.topology = None;
        self.topology_id = 0;
        self.adjacency = None;
        self.vertex_primvar_id = 0;
        change_tracker.mark_garbage_collection_needed();
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn draw_items(&self) -> &[DrawItem] {
        &self.draw_items
    }

    pub fn coord(&self) -> &DrawableCoord {
        &self.coord
    }

    /// Private bits tracked by the drawable's representations.
    pub fn tracked_bits(&self) -> DirtyBits {
        self.tracked
    }

    pub fn topology(&self) -> Option<&Arc<MeshTopology>> {
        self.topology.as_ref()
    }

    pub fn topology_id(&self) -> u64 {
        self.topology_id
    }

    /// Shared id of the vertex range, 0 when the range is private.
    pub fn vertex_primvar_id(&self) -> u64 {
        self.vertex_primvar_id
    }

    pub fn use_quad_indices(&self) -> bool {
        self.use_quad_indices
    }

    pub fn material_id(&self) -> Option<&str> {
        self.material_id.as_deref()
    }

    /// Check if smooth normals were generated by the last sync.
    pub fn uses_smooth_normals(&self) -> bool {
        self.smooth_normals
    }

    pub fn uses_packed_smooth_normals(&self) -> bool {
        self.packed_smooth_normals
    }

    /// Interpolation of authored normals, if any were seen.
    pub fn scene_normals_interpolation(&self) -> Option<InterpolationClass> {
        self.scene_normals
    }

    pub fn is_points_visibility_authored(&self) -> bool {
        self.points_visibility.is_authored()
    }

    /// Check if the current topology gets generated smooth normals.
    pub fn has_smooth_normals(&self) -> bool {
        let Some(topology) = &self.topology else {
            return false;
        };
        !self.display_style.flat_shading
            && !self.limit_normals
            && !matches!(topology.scheme(), SubdivScheme::None | SubdivScheme::Bilinear)
    }

    /// Primitive type of a draw item with `desc`.
    pub fn primitive_type(&self, desc: &ReprDesc) -> PrimitiveType {
        if desc.geom_style == GeomStyle::Points {
            return PrimitiveType::Points;
        }
        let Some(topology) = &self.topology else {
            return PrimitiveType::CoarseTriangles;
        };

        if desc.geom_style.index_style().refine_level(topology) > 0 {
            if topology.refines_to_triangles() {
                PrimitiveType::RefinedTriangles
            } else if topology.refine_mode() == RefineMode::Patches {
                PrimitiveType::Patches
            } else {
                PrimitiveType::RefinedQuads
            }
        } else if self.use_quad_indices {
            PrimitiveType::CoarseQuads
        } else {
            PrimitiveType::CoarseTriangles
        }
    }

    /// Normal source of a draw item with `desc`.
    ///
    /// Flat shading wins, then limit normals, then generated smooth normals,
    /// then authored normals. Without any of those the item is flat.
    pub fn normal_source(&self, desc: &ReprDesc) -> NormalSource {
        if self.display_style.flat_shading || desc.flat_shading {
            NormalSource::Flat
        } else if self.limit_normals {
            NormalSource::Limit
        } else if self.has_smooth_normals() {
            NormalSource::Smooth
        } else if self.scene_normals.is_some() {
            NormalSource::Scene
        } else {
            NormalSource::Flat
        }
    }

    // ------------------------------------------------------------------------
    // Gather
    // ------------------------------------------------------------------------

    fn update_draw_item(
        &mut self,
        ctx: &SyncContext<'_>,
        delegate: &dyn SceneDelegate,
        bits: &mut DirtyBits,
        desc: ReprDesc,
        require_smooth_normals: bool,
    ) -> SyncResult<()> {
        if bits.intersects(TOPOLOGY_BITS) {
            self.populate_topology(ctx, delegate, bits)?;
            bits.remove(TOPOLOGY_BITS);
        }

        let style = desc.geom_style.index_style();
        self.populate_indices(ctx, bits, style)?;

        let require_smooth_normals = require_smooth_normals && self.has_smooth_normals();
        if !require_smooth_normals {
            bits.remove(DirtyBits::SMOOTH_NORMALS);
        }

        let Some(topology) = self.topology.clone() else {
            bits.remove(DirtyBits::SCENE | DirtyBits::NEW_REPR);
            return Ok(());
        };

        if bits.intersects(DirtyBits::ANY_PRIMVAR | DirtyBits::NEW_REPR | DirtyBits::SMOOTH_NORMALS) {
            let id = Arc::clone(&self.id);
            let pipeline = PrimvarPipeline::new(
                &id,
                &topology,
                ctx.config,
                self.use_quad_indices,
                ctx.diagnostics,
            );

            self.populate_constant(ctx, delegate, *bits, &pipeline);
            if self.populate_vertex(ctx, delegate, bits, &pipeline, require_smooth_normals)? {
                self.populate_element(ctx, delegate, *bits, &pipeline);
                let refine_level = self.face_varying_refine_level(&topology);
                self.populate_face_varying(ctx, delegate, *bits, &pipeline, refine_level);
            }
        }

        bits.remove(DirtyBits::SCENE | DirtyBits::NEW_REPR | DirtyBits::SMOOTH_NORMALS);
        Ok(())
    }

    fn populate_topology(
        &mut self,
        ctx: &SyncContext<'_>,
        delegate: &dyn SceneDelegate,
        bits: &mut DirtyBits,
    ) -> SyncResult<()> {
        crate::profiling::profile_scope!("populate_topology");

        let display_style = delegate.display_style(&self.id);
        let raw = delegate.topology(&self.id);
        let tags = delegate.subdiv_tags(&self.id);

        let resolved = TopologyCache::new(ctx.registry, ctx.config).resolve(
            raw,
            &display_style,
            tags,
            self.capabilities,
        )?;
        self.display_style = display_style;

        if resolved.id != self.topology_id {
            log::debug!(
                "{}: topology {:#x} -> {:#x} (first instance: {})",
                self.id,
                self.topology_id,
                resolved.id,
                resolved.first_instance
            );
            *bits |= (self.tracked & (DirtyBits::ANY_INDICES | DirtyBits::SMOOTH_NORMALS))
                | DirtyBits::ANY_PRIMVAR;
            self.adjacency = None;
        }

        self.topology = Some(resolved.topology);
        self.topology_id = resolved.id;
        self.use_quad_indices = resolved.use_quad_indices;
        self.limit_normals = resolved.limit_normals;
        Ok(())
    }

    fn populate_indices(
        &mut self,
        ctx: &SyncContext<'_>,
        bits: &mut DirtyBits,
        style: IndexStyle,
    ) -> SyncResult<()> {
        let bit = style.dirty_bit();
        if !bits.contains(bit) {
            return Ok(());
        }
        let Some(topology) = self.topology.clone() else {
            return Ok(());
        };
        bits.remove(bit);

        let range = IndexRangeResolver::new(ctx.registry).resolve(
            self.topology_id,
            style,
            &topology,
            self.use_quad_indices,
        )?;

        match self.coord.set_topology(style, Arc::clone(&range)) {
            Some(previous) if Arc::ptr_eq(&previous, &range) => {}
            Some(_) => {
                ctx.change_tracker.mark_garbage_collection_needed();
                ctx.change_tracker.mark_batches_dirty();
            }
            None => ctx.change_tracker.mark_batches_dirty(),
        }
        Ok(())
    }

    fn populate_constant(
        &mut self,
        ctx: &SyncContext<'_>,
        delegate: &dyn SceneDelegate,
        bits: DirtyBits,
        pipeline: &PrimvarPipeline<'_>,
    ) {
        let sources = match pipeline.fetch(
            delegate,
            InterpolationClass::Constant,
            bits,
            &mut self.points_visibility,
        ) {
            Fetch::Primvars(sources) => sources,
            Fetch::PointsRejected => return,
        };
        if sources.iter().any(|source| source.name() == names::NORMALS) {
            self.scene_normals = Some(InterpolationClass::Constant);
        }
        if sources.is_empty() {
            return;
        }

        let range = self.private_range(ctx, RangeRole::ConstantPrimvar, &sources);
        ctx.registry.add_sources(&range, sources);
    }

    /// Gather vertex and varying primvars and smooth normals.
    ///
    /// Returns `false` if the points were rejected, in which case the drawable
    /// has no vertex range and the rest of the gather is skipped.
    fn populate_vertex(
        &mut self,
        ctx: &SyncContext<'_>,
        delegate: &dyn SceneDelegate,
        bits: &mut DirtyBits,
        pipeline: &PrimvarPipeline<'_>,
        require_smooth_normals: bool,
    ) -> SyncResult<bool> {
        crate::profiling::profile_scope!("populate_vertex_primvars");

        let mut scheduler = ComputationScheduler::new();
        let mut points = None;

        for class in [InterpolationClass::Vertex, InterpolationClass::Varying] {
            let sources = match pipeline.fetch(delegate, class, *bits, &mut self.points_visibility) {
                Fetch::Primvars(sources) => sources,
                Fetch::PointsRejected => {
                    log::debug!("{}: points rejected, dropping vertex data", self.id);
                    if self.coord.vertex.take().is_some() {
                        ctx.change_tracker.mark_garbage_collection_needed();
                        ctx.change_tracker.mark_shader_bindings_dirty();
                    }
                    self.vertex_primvar_id = 0;
                    return Ok(false);
                }
            };

            for source in sources {
                match source.name() {
                    names::NORMALS => self.scene_normals = Some(class),
                    names::POINTS => points = Some(source.clone()),
                    _ => {}
                }
                pipeline.route_vertex(source, class, &mut scheduler);
            }
        }

        let mut smooth_normals = self.smooth_normals;
        let mut packed = self.packed_smooth_normals;
        if require_smooth_normals && bits.contains(DirtyBits::SMOOTH_NORMALS) {
            let topology = pipeline.topology();
            let adjacency = match &self.adjacency {
                Some(adjacency) => Arc::clone(adjacency),
                None => {
                    let adjacency = AdjacencyCache::new(ctx.registry, ctx.config)
                        .resolve(self.topology_id, topology)?;
                    self.adjacency = Some(Arc::clone(&adjacency));
                    adjacency
                }
            };

            smooth_normals = true;
            packed = ctx.config.packed_normals
                && !(topology.refine_level() > 0 || self.use_quad_indices);

            if ctx.config.gpu_compute {
                self.push_gpu_smooth_normals(&mut scheduler, pipeline, adjacency, points.as_ref(), packed);
            } else if let Some(points) = points.as_ref() {
                let normals = CpuComputation::SmoothNormals {
                    points: Box::new(CpuComputation::Source(points.clone())),
                    adjacency,
                    packed,
                };
                scheduler.push_cpu(pipeline.vertex_chain(normals, Interpolation::Vertex));
            } else {
                log::trace!("{}: no points this frame, keeping smooth normals", self.id);
            }
        }
        bits.remove(DirtyBits::SMOOTH_NORMALS);

        let sources = scheduler.run_cpu();
        let computations = scheduler.take_gpu();
        self.smooth_normals = smooth_normals;
        self.packed_smooth_normals = packed;
        if sources.is_empty() && computations.is_empty() {
            return Ok(true);
        }

        let existing = self.coord.vertex.clone();
        let base_id = match &existing {
            Some(range) if range.is_immutable() => self.vertex_primvar_id,
            _ => self.topology_id,
        };
        let shared = SharedRangeResolver::new(ctx.registry, ctx.config).resolve(
            RangeRole::VertexPrimvar,
            base_id,
            &sources,
            &computations,
            existing.as_ref(),
        )?;

        match &existing {
            Some(previous) if Arc::ptr_eq(previous, &shared.range) => {}
            Some(_) => {
                ctx.change_tracker.mark_garbage_collection_needed();
                ctx.change_tracker.mark_shader_bindings_dirty();
            }
            None => ctx.change_tracker.mark_shader_bindings_dirty(),
        }
        log::trace!(
            "{}: vertex range {} ({:?}, shared id {:#x})",
            self.id,
            shared.range.id(),
            shared.action,
            shared.shared_id
        );

        if shared.first_instance {
            ctx.registry.add_sources(&shared.range, sources);
            ctx.registry.enqueue_gpu_computations(&shared.range, computations);
        }
        self.vertex_primvar_id = shared.shared_id;
        self.coord.vertex = Some(shared.range);
        Ok(true)
    }

    fn push_gpu_smooth_normals(
        &self,
        scheduler: &mut ComputationScheduler,
        pipeline: &PrimvarPipeline<'_>,
        adjacency: Arc<SharedAdjacency>,
        points: Option<&BufferSource>,
        packed: bool,
    ) {
        let points_format = points.map(BufferSource::format).or_else(|| {
            self.coord.vertex.as_ref().and_then(|range| {
                range
                    .specs()
                    .into_iter()
                    .find(|spec| spec.name == names::POINTS)
                    .map(|spec| spec.format)
            })
        });
        let Some(points_format) = points_format else {
            log::trace!("{}: no points to generate smooth normals from", self.id);
            return;
        };

        let (name, normals_format) = if packed {
            (names::PACKED_SMOOTH_NORMALS, ElementFormat::PackedNormal)
        } else {
            (names::SMOOTH_NORMALS, points_format)
        };
        scheduler.push_gpu(GpuComputation::SmoothNormals {
            adjacency,
            points: names::POINTS.to_string(),
            normals: name.to_string(),
            points_format,
            normals_format,
        });
        if let Some(step) = pipeline.gpu_vertex_step(name, normals_format, Interpolation::Vertex) {
            scheduler.push_gpu(step);
        }
    }

    fn populate_element(
        &mut self,
        ctx: &SyncContext<'_>,
        delegate: &dyn SceneDelegate,
        bits: DirtyBits,
        pipeline: &PrimvarPipeline<'_>,
    ) {
        let sources = match pipeline.fetch(
            delegate,
            InterpolationClass::Uniform,
            bits,
            &mut self.points_visibility,
        ) {
            Fetch::Primvars(sources) => sources,
            Fetch::PointsRejected => return,
        };
        if sources.iter().any(|source| source.name() == names::NORMALS) {
            self.scene_normals = Some(InterpolationClass::Uniform);
        }
        if sources.is_empty() {
            return;
        }

        let range = self.private_range(ctx, RangeRole::ElementPrimvar, &sources);
        ctx.registry.add_sources(&range, sources);
    }

    fn populate_face_varying(
        &mut self,
        ctx: &SyncContext<'_>,
        delegate: &dyn SceneDelegate,
        bits: DirtyBits,
        pipeline: &PrimvarPipeline<'_>,
        refine_level: u32,
    ) {
        let sources = match pipeline.fetch(
            delegate,
            InterpolationClass::FaceVarying,
            bits,
            &mut self.points_visibility,
        ) {
            Fetch::Primvars(sources) => sources,
            Fetch::PointsRejected => return,
        };
        if sources.is_empty() {
            return;
        }

        let mut scheduler = ComputationScheduler::new();
        for source in sources {
            pipeline.route_face_varying(source, refine_level, &mut scheduler);
        }
        let sources = scheduler.run_cpu();
        if sources.is_empty() {
            return;
        }

        let range = self.private_range(ctx, RangeRole::FaceVaryingPrimvar, &sources);
        ctx.registry.add_sources(&range, sources);
    }

    /// Face-varying data is gathered once per sync for every draw item, so it
    /// follows the most refined item.
    fn face_varying_refine_level(&self, topology: &MeshTopology) -> u32 {
        self.draw_items
            .iter()
            .map(|item| item.desc.geom_style.index_style().refine_level(topology))
            .max()
            .unwrap_or(0)
    }

    /// Find or grow this drawable's private range for `role`.
    fn private_range(
        &mut self,
        ctx: &SyncContext<'_>,
        role: RangeRole,
        sources: &[BufferSource],
    ) -> RangeHandle {
        let specs = BufferSpec::of_sources(sources);
        let slot = match role {
            RangeRole::ConstantPrimvar => &mut self.coord.constant,
            RangeRole::ElementPrimvar => &mut self.coord.element,
            _ => &mut self.coord.face_varying,
        };

        let range = match slot.as_ref() {
            Some(existing) if BufferSpec::is_subset(&specs, &existing.specs()) => {
                return Arc::clone(existing);
            }
            Some(existing) => ctx.registry.merge_range(role, &specs, existing),
            None => ctx.registry.allocate_range(role, &specs, Mutability::Mutable),
        };
        ctx.change_tracker.mark_shader_bindings_dirty();
        *slot = Some(Arc::clone(&range));
        range
    }

    // ------------------------------------------------------------------------
    // Draw items
    // ------------------------------------------------------------------------

    fn update_shader_state(&mut self) {
        for index in 0..self.draw_items.len() {
            let desc = self.draw_items[index].desc;
            let normal_source = self.normal_source(&desc);
            let item = DrawItem {
                desc,
                primitive_type: self.primitive_type(&desc),
                normal_source,
                normals_interpolation: match normal_source {
                    NormalSource::Scene => self.scene_normals,
                    _ => None,
                },
                cull_style: match desc.cull_style {
                    CullStyle::DontCare => self.cull_style,
                    style => style,
                },
                double_sided: self.double_sided,
            };
            log::trace!("{}: draw item {:?}", self.id, item);
            self.draw_items[index] = item;
        }
    }
}

impl fmt::Debug for Mesh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mesh")
            .field("id", &self.id)
            .field("draw_items", &self.draw_items.len())
            .field("topology_id", &format_args!("{:#x}", self.topology_id))
            .field("vertex_primvar_id", &format_args!("{:#x}", self.vertex_primvar_id))
            .field("tracked", &self.tracked)
            .finish()
    }
}

static_assertions::assert_impl_all!(Mesh: Send, Sync);
