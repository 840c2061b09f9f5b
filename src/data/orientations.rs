//! Orientations: 3-D positions carrying a unit pole vector.
//!
//! Input is either explicit pole vectors or (azimuth, dip, polarity) triples
//! in degrees; [`OrientationInput`] makes supplying both impossible. Both
//! representations are stored.

use serde::{Deserialize, Serialize};

use crate::data::{ensure_row_count, DataKeys, Observation, ObservationTable};
use crate::error::{GeoResult, ValidationError};
use crate::surfaces::Surfaces;
use crate::warning::ModelWarning;

/// Default nugget of an orientation.
pub const DEFAULT_ORIENTATION_SMOOTH: f64 = 0.01;

/// Orientation measurements for a batch of rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "rows", rename_all = "snake_case")]
pub enum OrientationInput {
    /// Pole (gradient) vectors; normalized on insert.
    Poles(Vec<[f64; 3]>),
    /// `[azimuth, dip, polarity]` in degrees. Only the sign of polarity is
    /// used, and zero counts as positive.
    Angles(Vec<[f64; 3]>),
}

impl OrientationInput {
    fn len(&self) -> usize {
        match self {
            Self::Poles(rows) | Self::Angles(rows) => rows.len(),
        }
    }
}

/// One orientation observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    pub coords: [f64; 3],
    /// Unit pole vector (G_x, G_y, G_z).
    pub pole: [f64; 3],
    pub azimuth: f64,
    pub dip: f64,
    pub polarity: f64,
    #[serde(flatten)]
    pub keys: DataKeys,
    pub smooth: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rescaled: Option<[f64; 3]>,
}

impl Observation for Orientation {
    const TABLE: &'static str = "orientations";

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

/// Unit pole from azimuth and dip (degrees) and polarity.
#[must_use]
pub fn angles_to_pole(azimuth: f64, dip: f64, polarity: f64) -> [f64; 3] {
    let sign = if polarity < 0.0 { -1.0 } else { 1.0 };
    let (az, dip) = (azimuth.to_radians(), dip.to_radians());
    [
        dip.sin() * az.sin() * sign,
        dip.sin() * az.cos() * sign,
        dip.cos() * sign,
    ]
}

/// Azimuth, dip (degrees) and polarity of a pole, or `None` for a zero vector.
///
/// Polarity is always reported as 1; an overturned pole shows as dip > 90.
#[must_use]
pub fn pole_to_angles(pole: [f64; 3]) -> Option<[f64; 3]> {
    let [gx, gy, gz] = normalize(pole)?;
    let dip = gz.clamp(-1.0, 1.0).acos().to_degrees();
    let azimuth = gx.atan2(gy).to_degrees().rem_euclid(360.0);
    Some([azimuth, dip, 1.0])
}

fn normalize(v: [f64; 3]) -> Option<[f64; 3]> {
    let norm = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if norm > f64::EPSILON && norm.is_finite() {
        Some([v[0] / norm, v[1] / norm, v[2] / norm])
    } else {
        None
    }
}

/// The orientations table.
pub type Orientations = ObservationTable<Orientation>;

#[derive(Clone, Copy)]
struct Measured {
    pole: [f64; 3],
    angles: [f64; 3],
}

fn measure(input: &OrientationInput) -> GeoResult<Vec<Measured>> {
    match input {
        OrientationInput::Poles(rows) => rows
            .iter()
            .enumerate()
            .map(|(row, &pole)| -> GeoResult<Measured> {
                let unit = normalize(pole).ok_or(ValidationError::DegenerateOrientation { row })?;
                let angles = pole_to_angles(unit).ok_or(ValidationError::DegenerateOrientation { row })?;
                Ok(Measured { pole: unit, angles })
            })
            .collect(),
        OrientationInput::Angles(rows) => Ok(rows
            .iter()
            .map(|&[azimuth, dip, polarity]| Measured {
                pole: angles_to_pole(azimuth, dip, polarity),
                angles: [azimuth, dip, if polarity < 0.0 { -1.0 } else { 1.0 }],
            })
            .collect()),
    }
}

impl ObservationTable<Orientation> {
    /// Replaces all rows.
    ///
    /// # Errors
    /// - `ValueCountMismatch` if `coords`, `input` and `surface_names` differ
    ///   in length.
    /// - `DegenerateOrientation` for a zero-length pole.
    pub fn set_orientations<S: AsRef<str>>(
        &mut self,
        surfaces: &Surfaces,
        coords: &[[f64; 3]],
        input: &OrientationInput,
        surface_names: &[S],
    ) -> GeoResult<Vec<ModelWarning>> {
        let measured = validate(coords, input, surface_names.len())?;
        self.clear();
        Ok(self.push_measured(surfaces, coords, measured, surface_names))
    }

    /// Appends rows. See [`ObservationTable::set_orientations`].
    ///
    /// # Errors
    /// As `set_orientations`.
    pub fn add_orientations<S: AsRef<str>>(
        &mut self,
        surfaces: &Surfaces,
        coords: &[[f64; 3]],
        input: &OrientationInput,
        surface_names: &[S],
    ) -> GeoResult<Vec<ModelWarning>> {
        let measured = validate(coords, input, surface_names.len())?;
        Ok(self.push_measured(surfaces, coords, measured, surface_names))
    }

    fn push_measured<S: AsRef<str>>(
        &mut self,
        surfaces: &Surfaces,
        coords: &[[f64; 3]],
        measured: Vec<Measured>,
        surface_names: &[S],
    ) -> Vec<ModelWarning> {
        let names = surface_names.iter().map(|s| s.as_ref().to_string()).collect();
        self.extend_rows(surfaces, names, |i, keys| {
            let Measured { pole, angles } = measured[i];
            Orientation {
                coords: coords[i],
                pole,
                azimuth: angles[0],
                dip: angles[1],
                polarity: angles[2],
                keys,
                smooth: DEFAULT_ORIENTATION_SMOOTH,
                rescaled: None,
            }
        })
    }
}

fn validate(coords: &[[f64; 3]], input: &OrientationInput, names: usize) -> GeoResult<Vec<Measured>> {
    ensure_row_count("orientations", coords.len(), names)?;
    if input.len() != coords.len() {
        return Err(ValidationError::ValueCountMismatch {
            what: "orientation measurements".to_string(),
            expected: coords.len(),
            actual: input.len(),
        }
        .into());
    }
    measure(input)
}
