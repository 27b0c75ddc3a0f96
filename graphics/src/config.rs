//! Sync policy.
//!
//! [`SyncConfig`] is a plain value threaded into every resolve and gather
//! call. Nothing inside the pipeline reads process state; the environment is
//! consulted only by [`SyncConfig::from_env`], once.

use std::sync::OnceLock;

/// Environment variable for [`SyncConfig::force_quadrangulate`].
pub const ENV_FORCE_QUADRANGULATE: &str = "STRATA_FORCE_QUADRANGULATE";
/// Environment variable for [`SyncConfig::packed_normals`].
pub const ENV_PACKED_NORMALS: &str = "STRATA_PACKED_NORMALS";
/// Environment variable for [`SyncConfig::gpu_compute`].
pub const ENV_GPU_COMPUTE: &str = "STRATA_GPU_COMPUTE";
/// Environment variable for [`SyncConfig::shared_vertex_primvar`].
pub const ENV_SHARED_VERTEX_PRIMVAR: &str = "STRATA_SHARED_VERTEX_PRIMVAR";
/// Environment variable for [`SyncConfig::safe_mode`].
pub const ENV_SAFE_MODE: &str = "STRATA_SAFE_MODE";

/// Policy flags for mesh sync.
///
/// # Example
///
/// ```
/// use strata_graphics::SyncConfig;
///
/// let config = SyncConfig::default()
///     .with_gpu_compute(true)
///     .with_safe_mode(true);
/// assert!(config.gpu_compute);
/// assert!(config.packed_normals);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SyncConfig {
    /// Quadrangulate every non-triangle scheme even without a ptex material.
    pub force_quadrangulate: bool,
    /// Store smooth normals in the packed 2_10_10_10 format when legal.
    pub packed_normals: bool,
    /// Run refinement, quadrangulation and smooth normals as GPU
    /// computations at commit instead of on the CPU during sync.
    pub gpu_compute: bool,
    /// Share vertex primvar ranges between drawables with identical content.
    pub shared_vertex_primvar: bool,
    /// Structurally verify cache hits and fail on hash collisions.
    pub safe_mode: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            force_quadrangulate: false,
            packed_normals: true,
            gpu_compute: false,
            shared_vertex_primvar: true,
            safe_mode: false,
        }
    }
}

impl SyncConfig {
    /// Create a config with default policy.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_force_quadrangulate(mut self, enabled: bool) -> Self {
        self.force_quadrangulate = enabled;
        self
    }

    pub fn with_packed_normals(mut self, enabled: bool) -> Self {
        self.packed_normals = enabled;
        self
    }

    pub fn with_gpu_compute(mut self, enabled: bool) -> Self {
        self.gpu_compute = enabled;
        self
    }

    pub fn with_shared_vertex_primvar(mut self, enabled: bool) -> Self {
        self.shared_vertex_primvar = enabled;
        self
    }

    pub fn with_safe_mode(mut self, enabled: bool) -> Self {
        self.safe_mode = enabled;
        self
    }

    /// Config read from the `STRATA_*` environment variables.
    ///
    /// The environment is read on the first call only; later calls return
    /// the same value. Unset variables keep their defaults.
    pub fn from_env() -> Self {
        static FROM_ENV: OnceLock<SyncConfig> = OnceLock::new();
        *FROM_ENV.get_or_init(|| {
            let config = Self::from_lookup(|name| std::env::var(name).ok());
            log::debug!("Sync config from environment: {:?}", config);
            config
        })
    }

    /// Config built from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let flag = |name: &str, default: bool| match lookup(name) {
            None => default,
            Some(value) => parse_flag(&value).unwrap_or_else(|| {
                log::warn!("Ignoring {}={:?}: expected 0/1/true/false", name, value);
                default
            }),
        };

        Self {
            force_quadrangulate: flag(ENV_FORCE_QUADRANGULATE, defaults.force_quadrangulate),
            packed_normals: flag(ENV_PACKED_NORMALS, defaults.packed_normals),
            gpu_compute: flag(ENV_GPU_COMPUTE, defaults.gpu_compute),
            shared_vertex_primvar: flag(ENV_SHARED_VERTEX_PRIMVAR, defaults.shared_vertex_primvar),
            safe_mode: flag(ENV_SAFE_MODE, defaults.safe_mode),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert!(!config.force_quadrangulate);
        assert!(config.packed_normals);
        assert!(!config.gpu_compute);
        assert!(config.shared_vertex_primvar);
        assert!(!config.safe_mode);
    }

    #[test]
    fn test_builders() {
        let config = SyncConfig::new()
            .with_force_quadrangulate(true)
            .with_packed_normals(false)
            .with_shared_vertex_primvar(false);
        assert!(config.force_quadrangulate);
        assert!(!config.packed_normals);
        assert!(!config.shared_vertex_primvar);
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (ENV_GPU_COMPUTE, "1"),
            (ENV_PACKED_NORMALS, "false"),
            (ENV_SAFE_MODE, "maybe"),
        ]
        .into_iter()
        .collect();
        let config = SyncConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()));

        assert!(config.gpu_compute);
        assert!(!config.packed_normals);
        // Unparseable values keep the default.
        assert!(!config.safe_mode);
        assert!(config.shared_vertex_primvar);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag(" TRUE "), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("2"), None);
    }
}
