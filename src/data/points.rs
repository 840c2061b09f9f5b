//! Surface points: 3-D positions on a surface.

use serde::{Deserialize, Serialize};

use crate::data::{ensure_row_count, DataKeys, Observation, ObservationTable};
use crate::error::GeoResult;
use crate::surfaces::Surfaces;
use crate::warning::ModelWarning;

/// Default nugget of a surface point.
pub const DEFAULT_POINT_SMOOTH: f64 = 1e-6;

/// One interface observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfacePoint {
    pub coords: [f64; 3],
    #[serde(flatten)]
    pub keys: DataKeys,
    pub smooth: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rescaled: Option<[f64; 3]>,
}

impl Observation for SurfacePoint {
    const TABLE: &'static str = "surface_points";

    fn keys(&self) -> &DataKeys {
        &self.keys
    }

    fn keys_mut(&mut self) -> &mut DataKeys {
        &mut self.keys
    }

    fn coords(&self) -> [f64; 3] {
        self.coords
    }

    fn set_coords(&mut self, coords: [f64; 3]) {
        self.coords = coords;
    }

    fn smooth(&self) -> f64 {
        self.smooth
    }

    fn rescaled(&self) -> Option<[f64; 3]> {
        self.rescaled
    }

    fn set_rescaled(&mut self, rescaled: Option<[f64; 3]>) {
        self.rescaled = rescaled;
    }
}

/// The surface points table.
pub type SurfacePoints = ObservationTable<SurfacePoint>;

impl ObservationTable<SurfacePoint> {
    /// Replaces all rows. Rows naming an unknown surface are kept but flagged
    /// invalid, and reported as warnings.
    ///
    /// # Errors
    /// `ValueCountMismatch` if `coords` and `surfaces_names` differ in length.
    pub fn set_surface_points<S: AsRef<str>>(
        &mut self,
        surfaces: &Surfaces,
        coords: &[[f64; 3]],
        surface_names: &[S],
    ) -> GeoResult<Vec<ModelWarning>> {
        ensure_row_count("surface points", coords.len(), surface_names.len())?;
        self.clear();
        self.add_surface_points(surfaces, coords, surface_names)
    }

    /// Appends rows.
    ///
    /// # Errors
    /// `ValueCountMismatch` if `coords` and `surfaces_names` differ in length.
    pub fn add_surface_points<S: AsRef<str>>(
        &mut self,
        surfaces: &Surfaces,
        coords: &[[f64; 3]],
        surface_names: &[S],
    ) -> GeoResult<Vec<ModelWarning>> {
        ensure_row_count("surface points", coords.len(), surface_names.len())?;
        let names = surface_names.iter().map(|s| s.as_ref().to_string()).collect();
        Ok(self.extend_rows(surfaces, names, |i, keys| SurfacePoint {
            coords: coords[i],
            keys,
            smooth: DEFAULT_POINT_SMOOTH,
            rescaled: None,
        }))
    }
}
