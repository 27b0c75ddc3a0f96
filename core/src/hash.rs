//! 64-bit content hashing.
//!
//! Every content-addressed cache in Strata keys its entries with a `u64`
//! produced here. The hasher is std's SipHash with fixed keys, so the same
//! content yields the same id for the lifetime of the process (and across
//! runs of the same build), and ids are well mixed over the whole 64-bit range.
//!
//! # Example
//!
//! ```
//! use strata_core::hash::{combine, hash64};
//!
//! let id = hash64(&[0u32, 1, 2]);
//! let salted = combine(id, &true);
//! assert_ne!(id, salted);
//! assert_eq!(salted, combine(hash64(&[0u32, 1, 2]), &true));
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Incremental hasher for composing content ids out of heterogeneous parts.
///
/// Floating point data is hashed by bit pattern, so `-0.0` and `0.0` produce
/// different ids and `NaN` payloads are distinguished.
#[derive(Debug, Clone)]
pub struct ContentHasher {
    inner: DefaultHasher,
}

impl ContentHasher {
    /// Create a hasher with no seed.
    pub fn new() -> Self {
        Self {
            inner: DefaultHasher::new(),
        }
    }

    /// Create a hasher that continues from a previous id.
    pub fn with_seed(seed: u64) -> Self {
        let mut hasher = Self::new();
        hasher.write_u64(seed);
        hasher
    }

    /// Mix any hashable value into the id.
    pub fn write<T: Hash + ?Sized>(&mut self, value: &T) -> &mut Self {
        value.hash(&mut self.inner);
        self
    }

    /// Mix a raw `u64` into the id.
    pub fn write_u64(&mut self, value: u64) -> &mut Self {
        self.inner.write_u64(value);
        self
    }

    /// Mix a string into the id.
    pub fn write_str(&mut self, value: &str) -> &mut Self {
        value.hash(&mut self.inner);
        self
    }

    /// Mix raw bytes (including their length) into the id.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.inner.write_usize(bytes.len());
        self.inner.write(bytes);
        self
    }

    /// Mix a float slice into the id by bit pattern.
    pub fn write_f32s(&mut self, values: &[f32]) -> &mut Self {
        self.write_bytes(bytemuck::cast_slice(values))
    }

    /// Finish and return the 64-bit id.
    pub fn finish(&self) -> u64 {
        self.inner.finish()
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash a single value to a 64-bit id.
pub fn hash64<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = ContentHasher::new();
    hasher.write(value);
    hasher.finish()
}

/// Salt an existing id with another value.
///
/// `combine(id, x)` is the secondary mix step used when a policy flag changes
/// derived data without changing the content that produced `id`.
pub fn combine<T: Hash + ?Sized>(seed: u64, value: &T) -> u64 {
    let mut hasher = ContentHasher::with_seed(seed);
    hasher.write(value);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        let a = hash64(&vec![1i32, 2, 3]);
        let b = hash64(&vec![1i32, 2, 3]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_hash_distinguishes_content() {
        assert_ne!(hash64(&[1i32, 2, 3]), hash64(&[1i32, 2, 4]));
    }

    #[test]
    fn test_combine_salts_id() {
        let id = hash64("topology");
        assert_ne!(combine(id, &false), combine(id, &true));
        assert_ne!(combine(id, &false), id);
    }

    #[test]
    fn test_float_bits_participate() {
        let mut a = ContentHasher::new();
        a.write_f32s(&[0.0, 1.0]);
        let mut b = ContentHasher::new();
        b.write_f32s(&[-0.0, 1.0]);
        assert_ne!(a.finish(), b.finish());
    }

    #[test]
    fn test_byte_length_participates() {
        let mut a = ContentHasher::new();
        a.write_bytes(&[1, 2]).write_bytes(&[3]);
        let mut b = ContentHasher::new();
        b.write_bytes(&[1]).write_bytes(&[2, 3]);
        assert_ne!(a.finish(), b.finish());
    }
}
