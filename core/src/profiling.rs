//! Profiling support via Tracy.
//!
//! Optional instrumentation of the sync pipeline using the
//! [Tracy profiler](https://github.com/wolfpld/tracy), enabled with the
//! `profiling` Cargo feature:
//!
//! ```toml
//! [dependencies]
//! strata-core = { version = "0.1", features = ["profiling"] }
//! ```
//!
//! # Spans
//!
//! ```ignore
//! use strata_core::profiling::{profile_function, profile_scope};
//!
//! fn refine(level: u32) {
//!     profile_function!();
//!
//!     for _ in 0..level {
//!         profile_scope!("refine_level");
//!         // ...
//!     }
//! }
//! ```
//!
//! # Plots
//!
//! Counters such as the number of pending computations can be plotted per
//! commit:
//!
//! ```ignore
//! profile_plot!("pending_gpu_computations", pending.len());
//! ```
//!
//! When profiling is disabled (the default), all macros compile to no-ops.

#[cfg(feature = "profiling")]
pub use tracy_client::{self, Client, Span, plot as tracy_plot, span};

/// Create a profiling span for the current scope.
///
/// The span ends when the scope exits.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_scope {
    ($name:expr) => {
        let _profile_span = $crate::profiling::span!($name);
    };
}

/// Create a profiling span (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_scope {
    ($name:expr) => {};
}

/// Create a profiling span covering the enclosing function.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_function {
    () => {
        let _profile_span = $crate::profiling::span!();
    };
}

/// Create a profiling span for function (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_function {
    () => {};
}

/// Plot a value over time in Tracy.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_plot {
    ($name:literal, $value:expr) => {
        $crate::profiling::tracy_plot!($name, $value as f64)
    };
}

/// Plot a value (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_plot {
    ($name:literal, $value:expr) => {
        let _ = $value;
    };
}

/// Send a message to Tracy's message log.
///
/// Used for rare, notable events such as storage migrations.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_message {
    ($msg:expr) => {
        if let Some(client) = $crate::profiling::Client::running() {
            client.message($msg, 0);
        }
    };
}

/// Send a message (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_message {
    ($msg:expr) => {};
}

/// Set the name of the current thread for Tracy.
///
/// Sync workers call this so parallel drawables show up per thread.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! set_thread_name {
    ($name:literal) => {
        $crate::profiling::tracy_client::set_thread_name!($name)
    };
}

/// Set thread name (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! set_thread_name {
    ($name:literal) => {};
}

pub use profile_function;
pub use profile_message;
pub use profile_plot;
pub use profile_scope;
pub use set_thread_name;

#[cfg(test)]
mod tests {
    #[test]
    fn test_macros_compile() {
        profile_scope!("test_scope");
        profile_function!();
        profile_plot!("test_value", 42.0);
        set_thread_name!("test_thread");
        profile_message!("test message");
    }
}
