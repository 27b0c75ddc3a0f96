//! Content-addressed instance registries with single-flight fill.
//!
//! An [`InstanceRegistry`] maps a key (usually a 64-bit content hash) to a
//! lazily computed, shared value. Registering a key returns an [`Instance`]
//! that holds the lock of that one entry until it is dropped:
//!
//! - the first caller to observe an empty entry gets
//!   [`is_first_instance`](Instance::is_first_instance) `== true` and is
//!   responsible for calling [`set_value`](Instance::set_value) before the
//!   instance goes out of scope;
//! - every other caller of the same key blocks inside
//!   [`register`](InstanceRegistry::register) until that happens, then
//!   observes the stored value.
//!
//! Only the entry being resolved is locked. The map itself is locked just long
//! enough to find or insert the entry, so unrelated keys resolve in parallel.
//!
//! If a first instance is dropped without a value (early return, error, panic),
//! the entry stays empty and the next caller becomes the first instance.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use strata_core::registry::InstanceRegistry;
//!
//! let registry: InstanceRegistry<u64, Arc<String>> = InstanceRegistry::new("names");
//!
//! {
//!     let mut instance = registry.register(42);
//!     assert!(instance.is_first_instance());
//!     instance.set_value(Arc::new("shared".to_string()));
//! }
//!
//! let instance = registry.register(42);
//! assert!(!instance.is_first_instance());
//! assert_eq!(instance.value().unwrap().as_str(), "shared");
//! ```

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::{ArcMutexGuard, Mutex, RawMutex};

/// Per-entry storage guarded by its own lock.
#[derive(Debug)]
struct Slot<V> {
    value: Option<V>,
    poisoned: bool,
}

impl<V> Default for Slot<V> {
    fn default() -> Self {
        Self {
            value: None,
            poisoned: false,
        }
    }
}

/// A concurrency-safe map from content key to shared value.
pub struct InstanceRegistry<K, V> {
    name: &'static str,
    entries: Mutex<HashMap<K, Arc<Mutex<Slot<V>>>>>,
}

impl<K, V> InstanceRegistry<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    /// Create an empty registry. The name is only used in log output.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Registry name used in diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Look up or insert `key` and lock its entry.
    ///
    /// Blocks while another thread holds the instance for the same key.
    /// Registering a key again on the same thread while still holding its
    /// instance deadlocks.
    pub fn register(&self, key: K) -> Instance<K, V> {
        let slot = {
            let mut entries = self.entries.lock();
            Arc::clone(entries.entry(key.clone()).or_default())
        };

        let guard = slot.lock_arc();
        let first_instance = guard.value.is_none() && !guard.poisoned;

        log::trace!(
            "InstanceRegistry '{}': register {:?} (first instance: {})",
            self.name,
            key,
            first_instance
        );

        Instance {
            key,
            guard,
            first_instance,
        }
    }

    /// Number of entries, including entries still being filled.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if the registry has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Remove entries for which `keep` returns `false`.
    ///
    /// Entries that are currently locked by an [`Instance`] are always kept.
    /// Empty entries that nobody holds are dropped. Returns the number of
    /// entries removed.
    pub fn retain<F>(&self, mut keep: F) -> usize
    where
        F: FnMut(&K, &V) -> bool,
    {
        let mut entries = self.entries.lock();
        let before = entries.len();

        entries.retain(|key, slot| match slot.try_lock() {
            Some(guard) => match guard.value.as_ref() {
                Some(value) => keep(key, value),
                None => guard.poisoned,
            },
            None => true,
        });

        let removed = before - entries.len();
        if removed > 0 {
            log::debug!(
                "InstanceRegistry '{}': released {} entries",
                self.name,
                removed
            );
        }
        removed
    }
}

impl<K, V> InstanceRegistry<K, Arc<V>>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    /// Drop every entry whose value is referenced only by this registry.
    pub fn garbage_collect(&self) -> usize {
        self.retain(|_, value| Arc::strong_count(value) > 1)
    }
}

impl<K, V> fmt::Debug for InstanceRegistry<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceRegistry")
            .field("name", &self.name)
            .field("entries", &self.entries.lock().len())
            .finish()
    }
}

/// A locked registry entry.
///
/// Holds the entry's lock for as long as it lives. Drop it as soon as the
/// value has been observed or set.
pub struct Instance<K, V> {
    key: K,
    guard: ArcMutexGuard<RawMutex, Slot<V>>,
    first_instance: bool,
}

impl<K, V> Instance<K, V> {
    /// The key this instance was registered with.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// `true` for exactly one caller per key: the one that must fill it.
    pub fn is_first_instance(&self) -> bool {
        self.first_instance
    }

    /// Store the value for this entry.
    ///
    /// Overwrites any previous value. Only the first instance is expected to
    /// call this.
    pub fn set_value(&mut self, value: V) {
        debug_assert!(
            self.first_instance,
            "set_value() called on a non-first instance"
        );
        self.guard.value = Some(value);
    }

    /// Borrow the stored value, if any.
    pub fn get(&self) -> Option<&V> {
        self.guard.value.as_ref()
    }

    /// Mark the entry as unusable. Later registrations see it as poisoned
    /// and never as a first instance.
    pub fn poison(&mut self) {
        self.guard.poisoned = true;
    }

    /// Check if the entry was poisoned by a consistency failure.
    pub fn is_poisoned(&self) -> bool {
        self.guard.poisoned
    }
}

impl<K, V: Clone> Instance<K, V> {
    /// Clone the stored value out of the entry.
    pub fn value(&self) -> Option<V> {
        self.guard.value.clone()
    }
}

impl<K, V> Drop for Instance<K, V> {
    fn drop(&mut self) {
        if self.first_instance && self.guard.value.is_none() && !self.guard.poisoned {
            log::warn!("InstanceRegistry: first instance released without a value");
        }
    }
}

impl<K: fmt::Debug, V> fmt::Debug for Instance<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("key", &self.key)
            .field("first_instance", &self.first_instance)
            .field("has_value", &self.guard.value.is_some())
            .finish()
    }
}

static_assertions::assert_impl_all!(InstanceRegistry<u64, Arc<Vec<u8>>>: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::time::Duration;

    #[test]
    fn test_first_instance_then_shared() {
        let registry: InstanceRegistry<u64, Arc<u32>> = InstanceRegistry::new("test");

        let mut first = registry.register(7);
        assert!(first.is_first_instance());
        assert!(first.value().is_none());
        first.set_value(Arc::new(99));
        drop(first);

        let second = registry.register(7);
        assert!(!second.is_first_instance());
        assert_eq!(*second.value().unwrap(), 99);
    }

    #[test]
    fn test_distinct_keys_are_independent() {
        let registry: InstanceRegistry<u64, u32> = InstanceRegistry::new("test");
        let a = registry.register(1);
        // A held entry must not block other keys.
        let b = registry.register(2);
        assert!(a.is_first_instance());
        assert!(b.is_first_instance());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_abandoned_first_instance_is_retried() {
        let registry: InstanceRegistry<u64, u32> = InstanceRegistry::new("test");
        {
            let instance = registry.register(3);
            assert!(instance.is_first_instance());
        }
        let mut retry = registry.register(3);
        assert!(retry.is_first_instance());
        retry.set_value(5);
    }

    #[test]
    fn test_single_flight_under_contention() {
        const THREADS: usize = 16;
        let registry: InstanceRegistry<u64, Arc<usize>> = InstanceRegistry::new("test");
        let computations = AtomicUsize::new(0);
        let barrier = Barrier::new(THREADS);

        let results: Vec<Arc<usize>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        let mut instance = registry.register(11);
                        if instance.is_first_instance() {
                            computations.fetch_add(1, Ordering::SeqCst);
                            // Hold the entry long enough for the others to pile up.
                            std::thread::sleep(Duration::from_millis(10));
                            instance.set_value(Arc::new(1234));
                        }
                        instance.value().unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(computations.load(Ordering::SeqCst), 1);
        for value in &results {
            assert!(Arc::ptr_eq(value, &results[0]));
        }
    }

    #[test]
    fn test_poisoned_entry_is_never_first() {
        let registry: InstanceRegistry<u64, u32> = InstanceRegistry::new("test");
        {
            let mut instance = registry.register(1);
            instance.set_value(1);
        }
        {
            let mut instance = registry.register(1);
            instance.poison();
        }
        let instance = registry.register(1);
        assert!(instance.is_poisoned());
        assert!(!instance.is_first_instance());
    }

    #[test]
    fn test_garbage_collect_drops_unreferenced() {
        let registry: InstanceRegistry<u64, Arc<u32>> = InstanceRegistry::new("test");
        let kept = {
            let mut instance = registry.register(1);
            instance.set_value(Arc::new(1));
            instance.value().unwrap()
        };
        {
            let mut instance = registry.register(2);
            instance.set_value(Arc::new(2));
        }

        assert_eq!(registry.garbage_collect(), 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(*kept, 1);
    }

    #[test]
    fn test_retain_keeps_locked_entries() {
        let registry: InstanceRegistry<u64, u32> = InstanceRegistry::new("test");
        let held = registry.register(1);
        assert_eq!(registry.retain(|_, _| false), 0);
        drop(held);
        assert_eq!(registry.retain(|_, _| false), 1);
        assert!(registry.is_empty());
    }
}
