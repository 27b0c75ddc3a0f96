//! # Strata Core
//!
//! GPU-agnostic building blocks of the Strata mesh sync engine:
//!
//! - [`hash`] - 64-bit content ids
//! - [`registry`] - content-addressed registries with single-flight fill
//! - [`dirty`] - dirty bits and their propagation rules
//! - [`buffer`] - typed buffer sources and specs
//! - [`mesh`] - canonical topology and the derived-data kernels
//! - [`diagnostics`] - validation warnings
//! - [`profiling`] - optional Tracy instrumentation

pub mod buffer;
pub mod diagnostics;
pub mod dirty;
pub mod hash;
pub mod mesh;
pub mod profiling;
pub mod registry;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
