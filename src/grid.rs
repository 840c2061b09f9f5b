//! Regular evaluation grid.
//!
//! Cell-centred lattice over an extent `[x_min, x_max, y_min, y_max, z_min, z_max]`
//! with `[nx, ny, nz]` cells. Values are ordered x-major, then y, then z.

use serde::{Deserialize, Serialize};

use crate::error::{GeoResult, ValidationError};

const AXES: [char; 3] = ['x', 'y', 'z'];

/// A regular grid and, once rescaled, its coordinates in the normalized frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    extent: [f64; 6],
    resolution: [usize; 3],
    values: Vec<[f64; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    values_rescaled: Option<Vec<[f64; 3]>>,
}

impl Grid {
    /// Creates an empty grid with no cells.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a regular grid, replacing any previous values.
    ///
    /// # Errors
    /// `InvalidExtent` unless `min < max` on every axis, `InvalidResolution`
    /// for a zero count.
    ///
    /// # Examples
    ///
    /// ```
    /// use stratigraph::Grid;
    ///
    /// let mut grid = Grid::new();
    /// grid.create_regular_grid([0.0, 10.0, 0.0, 10.0, 0.0, 10.0], [2, 2, 2]).unwrap();
    /// assert_eq!(grid.len(), 8);
    /// assert_eq!(grid.values()[0], [2.5, 2.5, 2.5]);
    /// ```
    #[allow(clippy::cast_precision_loss)]
    pub fn create_regular_grid(&mut self, extent: [f64; 6], resolution: [usize; 3]) -> GeoResult<()> {
        for axis in 0..3 {
            let (min, max) = (extent[2 * axis], extent[2 * axis + 1]);
            let ordered = min.is_finite() && max.is_finite() && min < max;
            if !ordered {
                return Err(ValidationError::InvalidExtent {
                    axis: AXES[axis],
                    min,
                    max,
                }
                .into());
            }
            if resolution[axis] == 0 {
                return Err(ValidationError::InvalidResolution { axis: AXES[axis] }.into());
            }
        }

        let centers: Vec<Vec<f64>> = (0..3)
            .map(|axis| {
                let min = extent[2 * axis];
                let n = resolution[axis];
                let step = (extent[2 * axis + 1] - min) / n as f64;
                (0..n).map(|i| min + step * (i as f64 + 0.5)).collect()
            })
            .collect();

        let mut values = Vec::with_capacity(resolution.iter().product());
        for &x in &centers[0] {
            for &y in &centers[1] {
                for &z in &centers[2] {
                    values.push([x, y, z]);
                }
            }
        }

        self.extent = extent;
        self.resolution = resolution;
        self.values = values;
        self.values_rescaled = None;
        Ok(())
    }

    /// `[x_min, x_max, y_min, y_max, z_min, z_max]`.
    #[must_use]
    pub const fn extent(&self) -> [f64; 6] {
        self.extent
    }

    /// Cell counts along x, y and z.
    #[must_use]
    pub const fn resolution(&self) -> [usize; 3] {
        self.resolution
    }

    /// Cell size along x, y, z.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn spacing(&self) -> [f64; 3] {
        let mut spacing = [0.0; 3];
        for (axis, s) in spacing.iter_mut().enumerate() {
            if self.resolution[axis] > 0 {
                let n = self.resolution[axis] as f64;
                *s = (self.extent[2 * axis + 1] - self.extent[2 * axis]) / n;
            }
        }
        spacing
    }

    /// Cell centres, x outermost.
    #[must_use]
    pub fn values(&self) -> &[[f64; 3]] {
        &self.values
    }

    /// Grid coordinates in the rescaled frame, if computed.
    #[must_use]
    pub fn values_rescaled(&self) -> Option<&[[f64; 3]]> {
        self.values_rescaled.as_deref()
    }

    pub(crate) fn set_values_rescaled(&mut self, values: Vec<[f64; 3]>) {
        self.values_rescaled = Some(values);
    }

    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True before a grid is created.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Length of the extent diagonal.
    #[must_use]
    pub fn diagonal(&self) -> f64 {
        (0..3)
            .map(|axis| (self.extent[2 * axis + 1] - self.extent[2 * axis]).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}
