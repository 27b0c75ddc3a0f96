//! Render index change tracking.
//!
//! Drawables are synced in parallel, so the state they report back is kept in
//! atomics. Consumers (batch builders, shader binding caches) compare the
//! version counters against the values they last saw.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Change-tracking state shared by all drawables of a render index.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    garbage_collection_needed: AtomicBool,
    batch_version: AtomicU64,
    shader_bindings_version: AtomicU64,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A storage range lost its last drawable reference.
    pub fn mark_garbage_collection_needed(&self) {
        self.garbage_collection_needed.store(true, Ordering::Release);
    }

    pub fn is_garbage_collection_needed(&self) -> bool {
        self.garbage_collection_needed.load(Ordering::Acquire)
    }

    /// Clear the flag, returning whether it was set.
    pub fn take_garbage_collection_needed(&self) -> bool {
        self.garbage_collection_needed.swap(false, Ordering::AcqRel)
    }

    /// Aggregated draw batches have to be rebuilt.
    pub fn mark_batches_dirty(&self) {
        self.batch_version.fetch_add(1, Ordering::AcqRel);
    }

    pub fn batch_version(&self) -> u64 {
        self.batch_version.load(Ordering::Acquire)
    }

    /// Storage identity changed; shader bindings and batches are stale.
    pub fn mark_shader_bindings_dirty(&self) {
        self.shader_bindings_version.fetch_add(1, Ordering::AcqRel);
        self.mark_batches_dirty();
    }

    pub fn shader_bindings_version(&self) -> u64 {
        self.shader_bindings_version.load(Ordering::Acquire)
    }
}

static_assertions::assert_impl_all!(ChangeTracker: Send, Sync);
