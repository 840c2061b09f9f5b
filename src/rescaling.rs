//! Rescaling of observation and grid coordinates into a normalized frame.
//!
//! The transform is `(c - center) / factor + offset`, with one center per axis
//! and a single isotropic factor so relative geometry is preserved. It is
//! recomputed from scratch on every call; nothing is patched incrementally.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::{Observation, ObservationTable, Orientations, SurfacePoints};
use crate::error::{GeoResult, ValidationError};
use crate::grid::Grid;

/// Parameters of the rescaling transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RescalingOptions {
    /// Added after scaling so the data sit around the middle of the unit cube.
    pub offset: f64,
    /// Multiplies the largest axis span to obtain the scaling factor.
    pub factor_multiplier: f64,
}

impl Default for RescalingOptions {
    fn default() -> Self {
        Self {
            offset: 0.5001,
            factor_multiplier: 2.0,
        }
    }
}

impl RescalingOptions {
    /// Validate options.
    ///
    /// # Errors
    /// `InvalidOption` if `offset` is not finite or `factor_multiplier` is not
    /// finite and positive.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.offset.is_finite() {
            return Err(ValidationError::InvalidOption {
                field: "offset".to_string(),
                reason: "must be finite".to_string(),
            });
        }
        if !(self.factor_multiplier.is_finite() && self.factor_multiplier > 0.0) {
            return Err(ValidationError::InvalidOption {
                field: "factor_multiplier".to_string(),
                reason: "must be finite and > 0".to_string(),
            });
        }
        Ok(())
    }
}

/// Transform parameters of the last rescaling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RescaledData {
    /// Per-axis center of the data bounding box.
    pub centers: [f64; 3],
    pub rescaling_factor: f64,
    pub options: RescalingOptions,
}

impl RescaledData {
    /// Computes the transform from the current coordinates and writes the
    /// rescaled coordinates into every row and into the grid.
    ///
    /// The bounding box covers all surface points and orientations and, when
    /// the grid has cells, the grid extent.
    ///
    /// # Errors
    /// - `InvalidOption` if `options` do not validate.
    /// - `DegenerateExtent` if there are no coordinates or they all coincide.
    pub fn compute(
        surface_points: &mut SurfacePoints,
        orientations: &mut Orientations,
        grid: &mut Grid,
        options: RescalingOptions,
    ) -> GeoResult<Self> {
        options.validate()?;

        let mut bounds = Bounds::default();
        bounds.include_table(surface_points);
        bounds.include_table(orientations);
        if !grid.is_empty() {
            let e = grid.extent();
            bounds.include([e[0], e[2], e[4]]);
            bounds.include([e[1], e[3], e[5]]);
        }
        let (min, max) = bounds.range().ok_or(ValidationError::DegenerateExtent)?;

        let span = (0..3).map(|a| max[a] - min[a]).fold(0.0_f64, f64::max);
        let rescaling_factor = options.factor_multiplier * span;
        if !(rescaling_factor.is_finite() && rescaling_factor > 0.0) {
            return Err(ValidationError::DegenerateExtent.into());
        }

        let rescaled = Self {
            centers: [0, 1, 2].map(|a| (max[a] + min[a]) / 2.0),
            rescaling_factor,
            options,
        };
        rescaled.apply_table(surface_points);
        rescaled.apply_table(orientations);
        grid.set_values_rescaled(grid.values().iter().map(|&c| rescaled.rescale(c)).collect());

        debug!(
            centers = ?rescaled.centers,
            factor = rescaled.rescaling_factor,
            points = surface_points.len(),
            orientations = orientations.len(),
            grid = grid.len(),
            "rescaled coordinates"
        );
        Ok(rescaled)
    }

    /// Maps a raw coordinate into the rescaled frame.
    #[must_use]
    pub fn rescale(&self, coords: [f64; 3]) -> [f64; 3] {
        [0, 1, 2].map(|a| (coords[a] - self.centers[a]) / self.rescaling_factor + self.options.offset)
    }

    /// Maps a rescaled coordinate back to the raw frame.
    #[must_use]
    pub fn restore(&self, rescaled: [f64; 3]) -> [f64; 3] {
        [0, 1, 2].map(|a| (rescaled[a] - self.options.offset) * self.rescaling_factor + self.centers[a])
    }

    fn apply_table<T: Observation>(&self, table: &mut ObservationTable<T>) {
        for row in table.rows_mut() {
            let rescaled = self.rescale(row.coords());
            row.set_rescaled(Some(rescaled));
        }
    }
}

#[derive(Default)]
struct Bounds {
    range: Option<([f64; 3], [f64; 3])>,
}

impl Bounds {
    fn include(&mut self, c: [f64; 3]) {
        self.range = Some(match self.range {
            None => (c, c),
            Some((min, max)) => ([0, 1, 2].map(|a| min[a].min(c[a])), [0, 1, 2].map(|a| max[a].max(c[a]))),
        });
    }

    fn include_table<T: Observation>(&mut self, table: &ObservationTable<T>) {
        for row in table.rows() {
            self.include(row.coords());
        }
    }

    fn range(&self) -> Option<([f64; 3], [f64; 3])> {
        self.range
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::OrientationInput;
    use crate::faults::Faults;
    use crate::series::Series;
    use crate::surfaces::Surfaces;

    fn tables() -> (SurfacePoints, Orientations) {
        let mut series = Series::new(Faults::new());
        series.set_series_index(["s"], &Surfaces::new()).unwrap();
        let mut surfaces = Surfaces::new();
        surfaces.set_surfaces_names(&series, ["a"]).unwrap();

        let mut points = SurfacePoints::new();
        points
            .set_surface_points(&surfaces, &[[0.0, 0.0, 0.0], [100.0, 50.0, 20.0]], &["a", "a"])
            .unwrap();
        let mut orientations = Orientations::new();
        orientations
            .set_orientations(
                &surfaces,
                &[[50.0, 25.0, 10.0]],
                &OrientationInput::Angles(vec![[0.0, 0.0, 1.0]]),
                &["a"],
            )
            .unwrap();
        (points, orientations)
    }

    #[test]
    fn rescales_into_unit_frame() {
        let (mut points, mut orientations) = tables();
        let mut grid = Grid::new();
        let r = RescaledData::compute(&mut points, &mut orientations, &mut grid, RescalingOptions::default()).unwrap();

        assert_eq!(r.centers, [50.0, 25.0, 10.0]);
        assert!((r.rescaling_factor - 200.0).abs() < 1e-12);

        let first = points.rows()[0].rescaled.unwrap();
        assert!((first[0] - (0.5001 - 0.25)).abs() < 1e-12);
        let centre = orientations.rows()[0].rescaled.unwrap();
        assert!(centre.iter().all(|c| (c - 0.5001).abs() < 1e-12));
        assert!(grid.values_rescaled().unwrap().is_empty());
    }

    #[test]
    fn grid_extent_widens_bounds() {
        let (mut points, mut orientations) = tables();
        let mut grid = Grid::new();
        grid.create_regular_grid([0.0, 1000.0, 0.0, 1000.0, 0.0, 1000.0], [2, 2, 2]).unwrap();
        let r = RescaledData::compute(&mut points, &mut orientations, &mut grid, RescalingOptions::default()).unwrap();
        assert!((r.rescaling_factor - 2000.0).abs() < 1e-9);
        assert_eq!(grid.values_rescaled().unwrap().len(), 8);

        let raw = grid.values()[3];
        let back = r.restore(r.rescale(raw));
        assert!(raw.iter().zip(back).all(|(a, b)| (a - b).abs() < 1e-9));
    }

    #[test]
    fn coincident_points_are_degenerate() {
        let mut points = SurfacePoints::new();
        let mut orientations = Orientations::new();
        let mut grid = Grid::new();
        let err = RescaledData::compute(&mut points, &mut orientations, &mut grid, RescalingOptions::default())
            .unwrap_err();
        assert!(matches!(err, crate::GeoError::Validation(ValidationError::DegenerateExtent)));
    }

    #[test]
    fn options_reject_non_positive_multiplier() {
        let options = RescalingOptions {
            factor_multiplier: 0.0,
            ..RescalingOptions::default()
        };
        assert!(options.validate().is_err());
        RescalingOptions::default().validate().unwrap();
    }
}
