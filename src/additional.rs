//! Additional data handed to the interpolation engine.
//!
//! [`AdditionalData`] is a read-only snapshot recomputed from the current
//! tables: structure counts, kriging parameters, solver options and the
//! rescaling parameters. It is never patched in place; recompute it after the
//! tables change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::{Orientations, SurfacePoints};
use crate::error::{GeoResult, ValidationError};
use crate::grid::Grid;
use crate::rescaling::RescaledData;
use crate::serialization::to_json_bytes;
use crate::series::Series;
use crate::surfaces::Surfaces;

/// Counts describing the structure of the model, in series order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureData {
    pub n_series: usize,
    pub n_surfaces: usize,
    pub n_faults: usize,
    pub n_surface_points: usize,
    pub n_orientations: usize,
    /// Series names in computation order.
    pub series: Vec<String>,
    pub is_fault: Vec<bool>,
    pub is_finite: Vec<bool>,
    pub surfaces_per_series: Vec<usize>,
    pub surface_points_per_series: Vec<usize>,
    pub orientations_per_series: Vec<usize>,
    /// Surface points per surface, in surface order.
    pub surface_points_per_surface: Vec<usize>,
}

impl StructureData {
    /// Counts valid rows. Observation counts use the mapped `series` column, so
    /// tables should be remapped first.
    #[must_use]
    pub fn new(
        surface_points: &SurfacePoints,
        orientations: &Orientations,
        series: &Series,
        surfaces: &Surfaces,
    ) -> Self {
        let rows: Vec<_> = series.rows().collect();
        Self {
            n_series: series.len(),
            n_surfaces: surfaces.len(),
            n_faults: series.faults().n_faults(),
            n_surface_points: surface_points.rows().iter().filter(|r| r.keys.valid).count(),
            n_orientations: orientations.rows().iter().filter(|r| r.keys.valid).count(),
            series: series.names().to_vec(),
            is_fault: rows.iter().map(|r| r.is_fault).collect(),
            is_finite: rows.iter().map(|r| r.is_finite).collect(),
            surfaces_per_series: series
                .names()
                .iter()
                .map(|name| surfaces.surfaces_in_series(name).len())
                .collect(),
            surface_points_per_series: surface_points.count_by_series(series),
            orientations_per_series: orientations.count_by_series(series),
            surface_points_per_surface: surface_points.count_by_surface(surfaces),
        }
    }
}

/// Covariance and drift parameters of the kriging system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KrigingParameters {
    /// Maximum correlation distance.
    pub range: f64,
    /// Covariance at lag zero.
    pub c_o: f64,
    /// Polynomial drift degree per series (0, 1 or 2).
    pub drift_degree: Vec<u8>,
    /// Nugget added to the gradient covariance diagonal.
    pub nugget_effect_gradient: f64,
    /// Nugget added to the interface covariance diagonal.
    pub nugget_effect_scalar: f64,
}

impl KrigingParameters {
    /// Default nugget on gradients.
    pub const DEFAULT_NUGGET_GRADIENT: f64 = 0.01;
    /// Default nugget on the scalar field.
    pub const DEFAULT_NUGGET_SCALAR: f64 = 1e-6;

    /// Defaults derived from the grid: the range is the extent diagonal and
    /// `c_o = range^2 / 14 / 3`; every series gets a linear drift.
    #[must_use]
    pub fn from_grid(grid: &Grid, n_series: usize) -> Self {
        let range = grid.diagonal();
        Self {
            range,
            c_o: range.powi(2) / 14.0 / 3.0,
            drift_degree: vec![1; n_series],
            nugget_effect_gradient: Self::DEFAULT_NUGGET_GRADIENT,
            nugget_effect_scalar: Self::DEFAULT_NUGGET_SCALAR,
        }
    }

    /// Number of drift equations per series.
    #[must_use]
    pub fn drift_equations(&self) -> Vec<usize> {
        self.drift_degree
            .iter()
            .map(|degree| match degree {
                0 => 0,
                1 => 3,
                _ => 9,
            })
            .collect()
    }

    /// Validate parameters.
    ///
    /// # Errors
    /// `InvalidOption` for a non-positive or non-finite `range` or `c_o`, a
    /// drift degree above 2, or a negative nugget effect.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(self.range.is_finite() && self.range > 0.0) {
            return Err(invalid("range", "must be finite and > 0"));
        }
        if !(self.c_o.is_finite() && self.c_o > 0.0) {
            return Err(invalid("c_o", "must be finite and > 0"));
        }
        if self.drift_degree.iter().any(|&d| d > 2) {
            return Err(invalid("drift_degree", "must be 0, 1 or 2"));
        }
        if !(self.nugget_effect_gradient >= 0.0 && self.nugget_effect_scalar >= 0.0) {
            return Err(invalid("nugget_effect", "must be >= 0"));
        }
        Ok(())
    }
}

/// Floating point precision of the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dtype {
    /// Single precision.
    Float32,
    /// Double precision.
    #[default]
    Float64,
}

/// Quantity the engine computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputTarget {
    /// Lithology block and scalar fields.
    Geology,
    /// Forward gravity response.
    Gravity,
}

/// Compilation mode of the engine's graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompileOptimizer {
    #[default]
    FastCompile,
    FastRun,
}

/// Where the engine runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    #[default]
    Cpu,
    Cuda,
}

/// Solver options for the interpolation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterpolatorOptions {
    pub dtype: Dtype,
    /// Quantities to compute; at least one, no repeats.
    pub output: Vec<OutputTarget>,
    pub compile_optimizer: CompileOptimizer,
    pub device: Device,
    /// Names of intermediate quantities the engine should print.
    pub verbosity: Vec<String>,
}

impl Default for InterpolatorOptions {
    fn default() -> Self {
        Self {
            dtype: Dtype::default(),
            output: vec![OutputTarget::Geology],
            compile_optimizer: CompileOptimizer::default(),
            device: Device::default(),
            verbosity: Vec::new(),
        }
    }
}

impl InterpolatorOptions {
    /// Validate options.
    ///
    /// # Errors
    /// `InvalidOption` if `output` is empty or repeats a target, or a
    /// verbosity entry is blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.output.is_empty() {
            return Err(invalid("output", "at least one output target is required"));
        }
        for (i, target) in self.output.iter().enumerate() {
            if self.output[..i].contains(target) {
                return Err(invalid("output", "targets must be unique"));
            }
        }
        if self.verbosity.iter().any(|v| v.trim().is_empty()) {
            return Err(invalid("verbosity", "entries cannot be empty"));
        }
        Ok(())
    }
}

/// Rescaling parameters recorded in the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RescalingSnapshot {
    pub centers: [f64; 3],
    pub rescaling_factor: f64,
}

impl From<&RescaledData> for RescalingSnapshot {
    fn from(rescaled: &RescaledData) -> Self {
        Self {
            centers: rescaled.centers,
            rescaling_factor: rescaled.rescaling_factor,
        }
    }
}

/// Snapshot of everything the engine needs besides the coordinate tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdditionalData {
    pub structure: StructureData,
    pub kriging: KrigingParameters,
    pub options: InterpolatorOptions,
    pub rescaling: RescalingSnapshot,
    /// When the snapshot was taken.
    pub computed_at: DateTime<Utc>,
    /// Hex blake3 digest of the snapshot contents, excluding `computed_at`.
    pub fingerprint: String,
}

#[derive(Serialize)]
struct FingerprintInput<'a> {
    structure: &'a StructureData,
    kriging: &'a KrigingParameters,
    options: &'a InterpolatorOptions,
    rescaling: &'a RescalingSnapshot,
}

impl AdditionalData {
    /// Computes the snapshot from the current tables.
    ///
    /// # Errors
    /// `InvalidOption` if `options` or the kriging defaults do not validate
    /// (an empty grid yields a zero range).
    pub fn new(
        surface_points: &SurfacePoints,
        orientations: &Orientations,
        grid: &Grid,
        series: &Series,
        surfaces: &Surfaces,
        rescaled: &RescaledData,
        options: InterpolatorOptions,
    ) -> GeoResult<Self> {
        options.validate()?;
        let kriging = KrigingParameters::from_grid(grid, series.len());
        kriging.validate()?;

        let mut data = Self {
            structure: StructureData::new(surface_points, orientations, series, surfaces),
            kriging,
            options,
            rescaling: RescalingSnapshot::from(rescaled),
            computed_at: Utc::now(),
            fingerprint: String::new(),
        };
        data.fingerprint = data.compute_fingerprint()?;
        debug!(
            series = data.structure.n_series,
            surfaces = data.structure.n_surfaces,
            fingerprint = %data.fingerprint,
            "computed additional data"
        );
        Ok(data)
    }

    /// Replaces the kriging parameters.
    ///
    /// # Errors
    /// - `InvalidOption` if `kriging` does not validate.
    /// - `DimensionMismatch` if it has a drift degree count other than the
    ///   series count.
    pub fn set_kriging(&mut self, kriging: KrigingParameters) -> GeoResult<()> {
        kriging.validate()?;
        if kriging.drift_degree.len() != self.structure.n_series {
            return Err(ValidationError::DimensionMismatch {
                what: "drift degree".to_string(),
                expected: self.structure.n_series,
                actual: kriging.drift_degree.len(),
            }
            .into());
        }
        self.kriging = kriging;
        self.fingerprint = self.compute_fingerprint()?;
        Ok(())
    }

    /// Replaces the solver options.
    ///
    /// # Errors
    /// `InvalidOption` if `options` do not validate.
    pub fn set_options(&mut self, options: InterpolatorOptions) -> GeoResult<()> {
        options.validate()?;
        self.options = options;
        self.fingerprint = self.compute_fingerprint()?;
        Ok(())
    }

    fn compute_fingerprint(&self) -> GeoResult<String> {
        let bytes = to_json_bytes(&FingerprintInput {
            structure: &self.structure,
            kriging: &self.kriging,
            options: &self.options,
            rescaling: &self.rescaling,
        })?;
        Ok(blake3::hash(&bytes).to_hex().to_string())
    }
}

fn invalid(field: &str, reason: &str) -> ValidationError {
    ValidationError::InvalidOption {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
