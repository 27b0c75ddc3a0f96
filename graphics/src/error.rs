//! Sync error types.
//!
//! Only consistency failures are errors. Validation problems are reported
//! through [`Diagnostics`](strata_core::diagnostics::Diagnostics) and the sync
//! carries on.

use thiserror::Error;

/// Errors that can occur while syncing a drawable or committing storage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Two structurally different values produced the same content id.
    #[error("hash collision in {registry} registry for key {key:#018x}")]
    HashCollision { registry: &'static str, key: u64 },

    /// The entry was poisoned by an earlier consistency failure.
    #[error("{registry} registry entry {key:#018x} is poisoned")]
    PoisonedEntry { registry: &'static str, key: u64 },

    /// A write targeted an immutable range that was already committed.
    #[error("storage range {0} is sealed")]
    SealedRange(u64),

    /// A first-instance registry entry was left without a value.
    #[error("{registry} registry entry {key:#018x} has no value")]
    MissingValue { registry: &'static str, key: u64 },
}

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SyncError::SealedRange(7);
        assert_eq!(err.to_string(), "storage range 7 is sealed");

        let err = SyncError::HashCollision {
            registry: "topology",
            key: 0xff,
        };
        assert_eq!(
            err.to_string(),
            "hash collision in topology registry for key 0x00000000000000ff"
        );
    }
}
