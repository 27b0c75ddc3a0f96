//! Profiling support via Tracy.
//!
//! This module re-exports CPU profiling from [`strata_core::profiling`] and adds
//! plots of the resource registry counters.
//!
//! # Enabling Profiling
//!
//! Add the `profiling` feature to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! strata-graphics = { version = "0.1", features = ["profiling"] }
//! ```
//!
//! # Registry plots
//!
//! Every [`ResourceRegistry::commit`](crate::ResourceRegistry::commit) plots
//! the registry counters, so range churn and migrations show up on the Tracy
//! timeline next to the sync spans.
//!
//! When profiling is disabled (the default), all of this compiles to no-ops.

// Re-export everything from core profiling module
pub use strata_core::profiling::*;

use crate::resources::RegistryStats;

/// Plot the registry counters.
pub fn plot_registry_stats(stats: &RegistryStats) {
    profile_plot!("ranges_allocated", stats.ranges_allocated);
    profile_plot!("range_merges", stats.range_merges);
    profile_plot!("range_migrations", stats.migrations);
    profile_plot!("sources_added", stats.sources_added);
    profile_plot!("gpu_computations", stats.gpu_computations);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plot_registry_stats() {
        plot_registry_stats(&RegistryStats::default());
    }
}
