//! Storage resources.
//!
//! This module contains the in-process resource registry that sync writes
//! into:
//! - [`StorageRange`] - a possibly-shared region holding named buffers
//! - [`ResourceRegistry`] - content-addressed registries, range allocation,
//!   merging and migration, and the commit queue
//!
//! Ranges are reference-counted with [`Arc`] and can be shared across threads
//! and drawables. Immutable ranges are sealed at their first commit and never
//! written again.
//!
//! [`Arc`]: std::sync::Arc

mod range;
mod registry;

pub use range::{Mutability, RangeHandle, RangeRole, StorageRange};
pub use registry::{CommitSummary, RegistryStats, ResourceRegistry};
