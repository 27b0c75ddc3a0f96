//! Common utilities for mesh sync integration tests.
//!
//! This module provides an in-memory scene delegate and a harness that owns
//! the registry, change tracker and diagnostics sink a sync needs.

use std::collections::HashMap;

use parking_lot::RwLock;
use strata_core::buffer::{BufferRole, InterpolationClass, names};
use strata_core::diagnostics::CollectingDiagnostics;
use strata_core::dirty::DirtyBits;
use strata_core::mesh::generators::GeneratedMesh;
use strata_core::mesh::{RawTopology, SubdivTags};
use strata_graphics::mesh::{
    DisplayStyle, MaterialCapabilities, PrimvarDescriptor, PrimvarValue, SceneDelegate,
};
use strata_graphics::{
    ChangeTracker, GeomStyle, Mesh, ReprDesc, ResourceRegistry, SyncConfig, SyncContext,
};

/// Every scene bit a first sync needs.
pub const ALL_DIRTY: DirtyBits = DirtyBits::TOPOLOGY
    .union(DirtyBits::DISPLAY_STYLE)
    .union(DirtyBits::POINTS)
    .union(DirtyBits::NORMALS)
    .union(DirtyBits::PRIMVAR);

/// Initialize logging for tests. Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Sync Configurations
// ============================================================================

/// Where derived data is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComputeMode {
    Cpu,
    Gpu,
}

impl ComputeMode {
    pub fn config(self) -> SyncConfig {
        SyncConfig::default().with_gpu_compute(self == Self::Gpu)
    }
}

// ============================================================================
// Scene Delegate
// ============================================================================

/// Scene data of one mesh.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub topology: RawTopology,
    pub display_style: DisplayStyle,
    pub tags: SubdivTags,
    pub capabilities: MaterialCapabilities,
    pub primvars: Vec<(PrimvarDescriptor, InterpolationClass, PrimvarValue)>,
}

/// In-memory scene delegate.
#[derive(Debug, Default)]
pub struct TestDelegate {
    meshes: RwLock<HashMap<String, MeshData>>,
}

#[allow(dead_code)]
impl TestDelegate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a generated shape with its positions as the `points` primvar.
    pub fn insert_generated(&self, id: &str, generated: &GeneratedMesh) {
        let data = MeshData {
            topology: generated.topology.clone(),
            ..Default::default()
        };
        self.meshes.write().insert(id.to_string(), data);
        self.set_points(id, &generated.points);
    }

    pub fn set_points(&self, id: &str, points: &[[f32; 3]]) {
        self.set_primvar(
            id,
            PrimvarDescriptor::new(names::POINTS, BufferRole::Points),
            InterpolationClass::Vertex,
            PrimvarValue::vec3(points),
        );
    }

    /// Add or replace a primvar.
    pub fn set_primvar(
        &self,
        id: &str,
        descriptor: PrimvarDescriptor,
        class: InterpolationClass,
        value: PrimvarValue,
    ) {
        let mut meshes = self.meshes.write();
        let data = meshes.entry(id.to_string()).or_default();
        data.primvars.retain(|(d, _, _)| d.name != descriptor.name);
        data.primvars.push((descriptor, class, value));
    }

    pub fn set_display_style(&self, id: &str, display_style: DisplayStyle) {
        self.meshes.write().entry(id.to_string()).or_default().display_style = display_style;
    }

    pub fn set_capabilities(&self, id: &str, capabilities: MaterialCapabilities) {
        self.meshes.write().entry(id.to_string()).or_default().capabilities = capabilities;
    }

    pub fn set_topology(&self, id: &str, topology: RawTopology) {
        self.meshes.write().entry(id.to_string()).or_default().topology = topology;
    }
}

impl SceneDelegate for TestDelegate {
    fn topology(&self, id: &str) -> RawTopology {
        self.meshes
            .read()
            .get(id)
            .map(|data| data.topology.clone())
            .unwrap_or_default()
    }

    fn display_style(&self, id: &str) -> DisplayStyle {
        self.meshes
            .read()
            .get(id)
            .map(|data| data.display_style)
            .unwrap_or_default()
    }

    fn subdiv_tags(&self, id: &str) -> SubdivTags {
        self.meshes
            .read()
            .get(id)
            .map(|data| data.tags.clone())
            .unwrap_or_default()
    }

    fn primvar_descriptors(&self, id: &str, class: InterpolationClass) -> Vec<PrimvarDescriptor> {
        self.meshes
            .read()
            .get(id)
            .map(|data| {
                data.primvars
                    .iter()
                    .filter(|(_, c, _)| *c == class)
                    .map(|(descriptor, _, _)| descriptor.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn primvar(&self, id: &str, name: &str) -> Option<PrimvarValue> {
        self.meshes.read().get(id).and_then(|data| {
            data.primvars
                .iter()
                .find(|(descriptor, _, _)| descriptor.name == name)
                .map(|(_, _, value)| value.clone())
        })
    }

    /// Meshes with a material use their own id as the material id.
    fn material_id(&self, id: &str) -> Option<String> {
        self.meshes
            .read()
            .get(id)
            .filter(|data| !data.capabilities.is_empty())
            .map(|_| id.to_string())
    }

    fn material_capabilities(&self, material: Option<&str>) -> MaterialCapabilities {
        material
            .and_then(|id| self.meshes.read().get(id).map(|data| data.capabilities))
            .unwrap_or_default()
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Registry, change tracker and diagnostics for one test.
pub struct Harness {
    pub registry: ResourceRegistry,
    pub tracker: ChangeTracker,
    pub diagnostics: CollectingDiagnostics,
    pub config: SyncConfig,
}

#[allow(dead_code)]
impl Harness {
    pub fn new(config: SyncConfig) -> Self {
        init_logging();
        Self {
            registry: ResourceRegistry::new(),
            tracker: ChangeTracker::new(),
            diagnostics: CollectingDiagnostics::new(),
            config,
        }
    }

    pub fn ctx(&self) -> SyncContext<'_> {
        SyncContext::new(&self.registry, &self.tracker, &self.diagnostics).with_config(self.config)
    }
}

/// A mesh with one surface representation.
#[allow(dead_code)]
pub fn surface_mesh(id: &str) -> Mesh {
    let mut mesh = Mesh::new(id);
    mesh.add_repr(ReprDesc::new(GeomStyle::Surface));
    mesh
}
