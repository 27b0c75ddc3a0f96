use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

use strata_core::buffer::{BufferRole, InterpolationClass, names};
use strata_core::diagnostics::LogDiagnostics;
use strata_core::dirty::DirtyBits;
use strata_core::mesh::RawTopology;
use strata_core::mesh::generators::{GeneratedMesh, generate_sphere};
use strata_graphics::mesh::{DisplayStyle, PrimvarDescriptor, PrimvarValue, SceneDelegate};
use strata_graphics::{
    ChangeTracker, GeomStyle, Mesh, ReprDesc, ResourceRegistry, SyncConfig, SyncContext,
};

const FIRST_SYNC: DirtyBits = DirtyBits::TOPOLOGY
    .union(DirtyBits::DISPLAY_STYLE)
    .union(DirtyBits::POINTS)
    .union(DirtyBits::PRIMVAR);

/// Every drawable is the same sphere.
struct SphereDelegate {
    sphere: GeneratedMesh,
    display_style: DisplayStyle,
}

impl SceneDelegate for SphereDelegate {
    fn topology(&self, _id: &str) -> RawTopology {
        self.sphere.topology.clone()
    }

    fn display_style(&self, _id: &str) -> DisplayStyle {
        self.display_style
    }

    fn primvar_descriptors(&self, _id: &str, class: InterpolationClass) -> Vec<PrimvarDescriptor> {
        match class {
            InterpolationClass::Vertex => {
                vec![PrimvarDescriptor::new(names::POINTS, BufferRole::Points)]
            }
            _ => Vec::new(),
        }
    }

    fn primvar(&self, _id: &str, name: &str) -> Option<PrimvarValue> {
        (name == names::POINTS).then(|| PrimvarValue::vec3(&self.sphere.points))
    }
}

fn sphere_delegate(refine_level: u32) -> SphereDelegate {
    SphereDelegate {
        sphere: generate_sphere(1.0, 64, 32),
        display_style: DisplayStyle::default().with_refine_level(refine_level),
    }
}

fn surface_meshes(count: usize) -> Vec<Mesh> {
    (0..count)
        .map(|i| {
            let mut mesh = Mesh::new(format!("/sphere_{i}"));
            mesh.add_repr(ReprDesc::new(GeomStyle::Surface));
            mesh
        })
        .collect()
}

fn sync_and_commit(meshes: &mut [Mesh], delegate: &SphereDelegate, config: SyncConfig) {
    let registry = ResourceRegistry::new();
    let tracker = ChangeTracker::new();
    let ctx = SyncContext::new(&registry, &tracker, &LogDiagnostics).with_config(config);
    for mesh in meshes.iter_mut() {
        black_box(mesh.sync(&ctx, delegate, FIRST_SYNC).ok());
    }
    black_box(registry.commit());
}

// ---------------------------------------------------------------------------
// First sync
// ---------------------------------------------------------------------------

fn bench_first_sync(c: &mut Criterion) {
    let delegate = sphere_delegate(0);
    c.bench_function("first_sync_64_shared_spheres_cpu", |b| {
        b.iter_batched(
            || surface_meshes(64),
            |mut meshes| sync_and_commit(&mut meshes, &delegate, SyncConfig::default()),
            BatchSize::SmallInput,
        );
    });
}

fn bench_first_sync_refined(c: &mut Criterion) {
    let delegate = sphere_delegate(1);
    for (name, config) in [
        ("first_sync_refined_sphere_cpu", SyncConfig::default()),
        (
            "first_sync_refined_sphere_gpu",
            SyncConfig::default().with_gpu_compute(true),
        ),
    ] {
        c.bench_function(name, |b| {
            b.iter_batched(
                || surface_meshes(1),
                |mut meshes| sync_and_commit(&mut meshes, &delegate, config),
                BatchSize::SmallInput,
            );
        });
    }
}

// ---------------------------------------------------------------------------
// Incremental sync
// ---------------------------------------------------------------------------

fn bench_points_update(c: &mut Criterion) {
    let delegate = sphere_delegate(0);
    let registry = ResourceRegistry::new();
    let tracker = ChangeTracker::new();
    let ctx = SyncContext::new(&registry, &tracker, &LogDiagnostics);
    let mut meshes = surface_meshes(1);
    meshes[0].sync(&ctx, &delegate, FIRST_SYNC).ok();
    registry.commit();

    c.bench_function("points_update_sphere", |b| {
        b.iter(|| {
            black_box(meshes[0].sync(&ctx, &delegate, DirtyBits::POINTS).ok());
            black_box(registry.commit());
        });
    });
}

criterion_group!(
    benches,
    bench_first_sync,
    bench_first_sync_refined,
    bench_points_update
);
criterion_main!(benches);
