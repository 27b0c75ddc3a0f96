//! # Strata Graphics
//!
//! Incremental, content-addressed mesh sync for a retained-mode renderer.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`Mesh`] - Per-drawable sync from a [`SceneDelegate`] into storage ranges
//! - [`ResourceRegistry`] - Shared registries, range allocation and the commit queue
//! - [`compute`] - CPU and GPU computations (refinement, quadrangulation, smooth normals)
//! - [`ChangeTracker`] - Garbage collection, batch and shader binding notifications
//!
//! Sync runs in two phases. Drawables gather in parallel: each one resolves
//! shared topology, index, adjacency and primvar ranges and queues its
//! writes. A single-threaded [`ResourceRegistry::commit`] then applies the
//! queued work in order.
//!
//! ## Example
//!
//! ```ignore
//! use strata_graphics::{ChangeTracker, GeomStyle, Mesh, ReprDesc, ResourceRegistry, SyncContext};
//! use strata_core::diagnostics::LogDiagnostics;
//! use strata_core::dirty::DirtyBits;
//!
//! let registry = ResourceRegistry::new();
//! let tracker = ChangeTracker::new();
//! let ctx = SyncContext::new(&registry, &tracker, &LogDiagnostics);
//!
//! let mut mesh = Mesh::new("/world/cube");
//! mesh.add_repr(ReprDesc::new(GeomStyle::Surface));
//! mesh.sync(&ctx, &delegate, DirtyBits::TOPOLOGY | DirtyBits::POINTS)?;
//! registry.commit();
//! ```

pub mod change_tracker;
pub mod compute;
pub mod config;
pub mod error;
pub mod mesh;
pub mod profiling;
pub mod resources;

// Re-export main types for convenience
pub use change_tracker::ChangeTracker;
pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use mesh::{
    DrawItem, DrawableCoord, GeomStyle, Mesh, NormalSource, PrimitiveType, ReprDesc,
    SceneDelegate, SyncContext,
};
pub use resources::{
    CommitSummary, Mutability, RangeHandle, RangeRole, RegistryStats, ResourceRegistry,
    StorageRange,
};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the graphics subsystem.
///
/// Logs the version and the sync policy taken from the environment.
pub fn init() -> SyncConfig {
    let config = SyncConfig::from_env();
    log::info!("Strata Graphics v{} initialized ({:?})", VERSION, config);
    config
}
