//! Non-fatal warnings.
//!
//! Soft inconsistencies (a surface mapped to a series that does not exist, an
//! observation tagged with an unknown surface) leave a null in the affected
//! column and are reported here rather than failing the call. Every warning is
//! also emitted as a `tracing` event at WARN level.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A non-fatal inconsistency produced by a mutating call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelWarning {
    /// A mapping named a series that is not in the series index; the listed
    /// surfaces had their series unset.
    UnknownSeries { series: String, surfaces: Vec<String> },

    /// A mapping named a surface that does not exist; it was ignored.
    UnknownSurface { surface: String },

    /// Observation rows were tagged with a surface that does not exist and
    /// were flagged invalid.
    UnmatchedObservations { table: String, surface: String, rows: Vec<usize> },

    /// Surfaces were created while the series index was empty and have no series.
    NoSeriesAvailable { surfaces: Vec<String> },
}

impl ModelWarning {
    /// Emits the warning as a tracing event and returns it.
    pub(crate) fn emit(self) -> Self {
        tracing::warn!(warning = %self, "model inconsistency");
        self
    }
}

impl fmt::Display for ModelWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSeries { series, surfaces } => write!(
                f,
                "series '{series}' does not exist; series unset for surfaces [{}]",
                surfaces.join(", ")
            ),
            Self::UnknownSurface { surface } => {
                write!(f, "surface '{surface}' does not exist; ignored")
            }
            Self::UnmatchedObservations { table, surface, rows } => write!(
                f,
                "{table}: {} rows reference unknown surface '{surface}'",
                rows.len()
            ),
            Self::NoSeriesAvailable { surfaces } => write!(
                f,
                "no series defined; surfaces [{}] have no series",
                surfaces.join(", ")
            ),
        }
    }
}
