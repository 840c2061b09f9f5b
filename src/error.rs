//! Error types for stratigraph.
//!
//! All errors are strongly typed using thiserror. Structural violations on
//! identity columns (labels, matrix shapes, row counts) are returned as
//! errors; soft inconsistencies are reported as [`crate::ModelWarning`]s
//! instead.

use thiserror::Error;

/// Violations of a [`crate::CategoricalIndex`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("Duplicate label: '{label}' already exists")]
    DuplicateLabel {
        label: String,
    },

    #[error("Unknown label: '{label}'")]
    UnknownLabel {
        label: String,
    },

    #[error("Invalid permutation: expected {expected} labels, got {actual} ({reason})")]
    InvalidPermutation {
        expected: usize,
        actual: usize,
        reason: String,
    },
}

/// Validation errors on shapes and values of caller input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("Value count mismatch for {what}: expected {expected} rows, got {actual}")]
    ValueCountMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid color '{value}': expected #rrggbb")]
    InvalidColor {
        value: String,
    },

    #[error("Invalid extent on axis {axis}: min ({min}) must be below max ({max})")]
    InvalidExtent {
        axis: char,
        min: f64,
        max: f64,
    },

    #[error("Invalid resolution on axis {axis}: must be > 0")]
    InvalidResolution {
        axis: char,
    },

    #[error("Degenerate orientation at row {row}: pole vector has zero length")]
    DegenerateOrientation {
        row: usize,
    },

    #[error("Degenerate extent: all coordinates coincide, cannot rescale")]
    DegenerateExtent,

    #[error("Invalid option '{field}': {reason}")]
    InvalidOption {
        field: String,
        reason: String,
    },

    #[error("Name for {what} cannot be empty")]
    EmptyName {
        what: String,
    },
}

/// Cross-table consistency errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("Referential integrity violated: {reason}")]
    ReferentialIntegrity {
        reason: String,
    },

    #[error("Ambiguous basement: {count} surfaces are flagged as basement")]
    AmbiguousBasement {
        count: usize,
    },

    #[error("Model is not ready for interpolation: {table}.{column} has {nulls} unset values")]
    NotReady {
        table: String,
        column: String,
        nulls: usize,
    },
}

impl IntegrityError {
    /// Creates a referential integrity error.
    #[must_use]
    pub fn referential(reason: impl Into<String>) -> Self {
        Self::ReferentialIntegrity {
            reason: reason.into(),
        }
    }
}

/// Top-level error type for stratigraph.
#[derive(Debug, Error)]
pub enum GeoError {
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Integrity error: {0}")]
    Integrity(#[from] IntegrityError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl GeoError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a categorical index error.
    #[must_use]
    pub const fn is_index(&self) -> bool {
        matches!(self, Self::Index(_))
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an integrity error.
    #[must_use]
    pub const fn is_integrity(&self) -> bool {
        matches!(self, Self::Integrity(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Returns true if the model can still be fixed by the caller and retried.
    ///
    /// `NotReady` is the only such case: the tables are structurally sound and
    /// the caller only has to fill the remaining nulls.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Integrity(IntegrityError::NotReady { .. }))
    }
}

/// Result type alias for stratigraph operations.
pub type GeoResult<T> = Result<T, GeoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_error_duplicate() {
        let err = IndexError::DuplicateLabel {
            label: "foo".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("Duplicate label"));
        assert!(msg.contains("foo"));
    }

    #[test]
    fn test_validation_error_dimension() {
        let err = ValidationError::DimensionMismatch {
            what: "fault relation".to_string(),
            expected: 4,
            actual: 5,
        };
        let msg = format!("{err}");
        assert!(msg.contains("fault relation"));
        assert!(msg.contains('4'));
        assert!(msg.contains('5'));
    }

    #[test]
    fn test_validation_error_extent() {
        let err = ValidationError::InvalidExtent {
            axis: 'y',
            min: 10.0,
            max: 0.0,
        };
        assert!(format!("{err}").contains("axis y"));
    }

    #[test]
    fn test_integrity_error_not_ready() {
        let err = IntegrityError::NotReady {
            table: "surfaces".to_string(),
            column: "series".to_string(),
            nulls: 2,
        };
        let msg = format!("{err}");
        assert!(msg.contains("surfaces.series"));
        assert!(msg.contains("2 unset"));
    }

    #[test]
    fn test_geo_error_from_index() {
        let err: GeoError = IndexError::UnknownLabel {
            label: "x".to_string(),
        }
        .into();
        assert!(err.is_index());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_geo_error_from_validation() {
        let err: GeoError = ValidationError::DegenerateExtent.into();
        assert!(err.is_validation());
    }

    #[test]
    fn test_geo_error_recoverable() {
        let err: GeoError = IntegrityError::NotReady {
            table: "surface_points".to_string(),
            column: "id".to_string(),
            nulls: 1,
        }
        .into();
        assert!(err.is_integrity());
        assert!(err.is_recoverable());

        let err: GeoError = IntegrityError::AmbiguousBasement { count: 2 }.into();
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_geo_error_internal() {
        let err = GeoError::internal("unexpected state");
        assert!(err.is_internal());
        assert!(format!("{err}").contains("unexpected state"));
    }
}
