//! Mesh drawables.
//!
//! This module turns scene data into shared storage ranges:
//!
//! - [`Mesh`] - a drawable with its representations and storage slots
//! - [`SceneDelegate`] - where raw topology and primvars come from
//! - [`TopologyCache`], [`IndexRangeResolver`], [`AdjacencyCache`] - one shared
//!   entry per distinct topology, index style and adjacency
//! - [`SharedRangeResolver`] - content-addressed vertex primvar ranges
//!
//! # Efficient Sharing via Arc
//!
//! Topologies, adjacency tables and storage ranges are wrapped in `Arc` and
//! registered under content hashes, so identical meshes resolve to the same
//! allocations and pointer comparison is enough to tell whether a slot
//! changed.

mod adjacency;
mod delegate;
mod drawable;
mod index_range;
mod primvar;
mod shared_range;
mod sync;
mod topology_cache;

pub use adjacency::{AdjacencyCache, SharedAdjacency};
pub use delegate::{
    CullStyle, DisplayStyle, MaterialCapabilities, PrimvarDescriptor, PrimvarValue, SceneDelegate,
};
pub use drawable::{DrawItem, DrawableCoord, GeomStyle, NormalSource, PrimitiveType, ReprDesc};
pub use index_range::{IndexKind, IndexRangeResolver, IndexStyle};
pub use primvar::{Fetch, PointsVisibility, PrimvarPipeline, Validation};
pub use shared_range::{RangeAction, SharedRange, SharedRangeResolver, shared_id};
pub use sync::{Mesh, SyncContext};
pub use topology_cache::{ResolvedTopology, TopologyCache, use_quad_indices, uses_limit_refinement};
