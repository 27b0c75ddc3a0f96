//! Validation warnings and the sink they are reported to.
//!
//! Validation problems found during sync (primvar length mismatches, empty
//! primvars) never fail the sync. They are repaired or skipped locally and
//! reported to a [`Diagnostics`] implementation supplied by the caller.
//!
//! - [`LogDiagnostics`] forwards every warning to `log::warn!`
//! - [`CollectingDiagnostics`] keeps them in memory for inspection

use std::fmt;

use parking_lot::Mutex;

use crate::buffer::InterpolationClass;

/// A recoverable validation problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationWarning {
    /// A primvar has fewer elements than its interpolation class requires
    /// and was skipped.
    PrimvarTooShort {
        drawable: String,
        primvar: String,
        class: InterpolationClass,
        actual: usize,
        expected: usize,
    },
    /// A primvar has more elements than required and was truncated.
    PrimvarTruncated {
        drawable: String,
        primvar: String,
        class: InterpolationClass,
        actual: usize,
        expected: usize,
    },
    /// The points primvar is too short; the drawable has no vertex data this
    /// frame.
    PointsRejected {
        drawable: String,
        actual: usize,
        expected: usize,
    },
    /// A described primvar had no value.
    EmptyPrimvar { drawable: String, primvar: String },
}

impl ValidationWarning {
    /// Id of the drawable the warning belongs to.
    pub fn drawable(&self) -> &str {
        match self {
            Self::PrimvarTooShort { drawable, .. }
            | Self::PrimvarTruncated { drawable, .. }
            | Self::PointsRejected { drawable, .. }
            | Self::EmptyPrimvar { drawable, .. } => drawable,
        }
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrimvarTooShort {
                drawable,
                primvar,
                class,
                actual,
                expected,
            } => write!(
                f,
                "{drawable}: # of {class} values mismatch ({actual} < {expected}) for primvar {primvar}; skipped"
            ),
            Self::PrimvarTruncated {
                drawable,
                primvar,
                class,
                actual,
                expected,
            } => write!(
                f,
                "{drawable}: # of {class} values mismatch ({actual} > {expected}) for primvar {primvar}; truncated"
            ),
            Self::PointsRejected {
                drawable,
                actual,
                expected,
            } => write!(
                f,
                "{drawable}: # of points mismatch ({actual} < {expected}); vertex data dropped"
            ),
            Self::EmptyPrimvar { drawable, primvar } => {
                write!(f, "{drawable}: primvar {primvar} has no value")
            }
        }
    }
}

/// Receiver of validation warnings.
pub trait Diagnostics: Send + Sync {
    fn report(&self, warning: ValidationWarning);
}

/// Forwards warnings to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn report(&self, warning: ValidationWarning) {
        log::warn!("{}", warning);
    }
}

/// Keeps every warning in memory. Also logs them at debug level.
#[derive(Debug, Default)]
pub struct CollectingDiagnostics {
    warnings: Mutex<Vec<ValidationWarning>>,
}

impl CollectingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the warnings reported so far.
    pub fn warnings(&self) -> Vec<ValidationWarning> {
        self.warnings.lock().clone()
    }

    /// Remove and return every warning.
    pub fn take(&self) -> Vec<ValidationWarning> {
        std::mem::take(&mut *self.warnings.lock())
    }

    pub fn len(&self) -> usize {
        self.warnings.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.lock().is_empty()
    }
}

impl Diagnostics for CollectingDiagnostics {
    fn report(&self, warning: ValidationWarning) {
        log::debug!("{}", warning);
        self.warnings.lock().push(warning);
    }
}

static_assertions::assert_impl_all!(CollectingDiagnostics: Send, Sync);
