//! Observation tables: surface points and orientations.
//!
//! Both tables store surface membership as a value (the `surface` column) and
//! carry derived `series`, `id` and `order_series` columns. The derived columns
//! are pulled from [`Surfaces`] and [`Series`] only when the caller asks
//! (`map_data_from_*`); they go stale in between.

mod orientations;
mod points;

pub use orientations::{
    angles_to_pole, pole_to_angles, Orientation, OrientationInput, Orientations,
};
pub use points::{SurfacePoint, SurfacePoints};

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GeoResult, IndexError, ValidationError};
use crate::series::Series;
use crate::surfaces::Surfaces;
use crate::warning::ModelWarning;

/// Key columns shared by every observation row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataKeys {
    /// Surface the observation belongs to.
    pub surface: String,
    /// Derived from the surface. Stale until remapped.
    pub series: Option<String>,
    /// Derived from the surface. Stale until remapped.
    pub id: Option<usize>,
    /// Derived from the series. Stale until remapped.
    pub order_series: Option<usize>,
    /// False when `surface` did not exist at insertion or last revalidation.
    pub valid: bool,
    /// Insertion sequence number; final tie-break of `sort_table`.
    pub seq: u64,
}

/// Column pulled by [`ObservationTable::map_data_from_surfaces`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceColumn {
    Series,
    Id,
}

/// Column pulled by [`ObservationTable::map_data_from_series`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesColumn {
    OrderSeries,
}

/// A row of an observation table.
pub trait Observation: Clone {
    /// Table name used in warnings and readiness errors.
    const TABLE: &'static str;

    fn keys(&self) -> &DataKeys;

    fn keys_mut(&mut self) -> &mut DataKeys;

    /// Raw X, Y, Z.
    fn coords(&self) -> [f64; 3];

    fn set_coords(&mut self, coords: [f64; 3]);

    /// Nugget applied to this observation by the kriging system.
    fn smooth(&self) -> f64;

    /// Coordinates in the rescaled frame, once computed.
    fn rescaled(&self) -> Option<[f64; 3]>;

    fn set_rescaled(&mut self, rescaled: Option<[f64; 3]>);
}

/// Rows of one observation kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationTable<T> {
    rows: Vec<T>,
    next_seq: u64,
}

impl<T> Default for ObservationTable<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            next_seq: 0,
        }
    }
}

impl<T: Observation> ObservationTable<T> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows in table order.
    #[must_use]
    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row at `row`.
    #[must_use]
    pub fn get(&self, row: usize) -> Option<&T> {
        self.rows.get(row)
    }

    fn next_keys(&mut self, surface: String, valid: bool) -> DataKeys {
        let seq = self.next_seq;
        self.next_seq += 1;
        DataKeys {
            surface,
            series: None,
            id: None,
            order_series: None,
            valid,
            seq,
        }
    }

    /// Appends rows built by `make` from fresh keys; rows whose surface is not
    /// in `surfaces` are flagged invalid and reported.
    pub(crate) fn extend_rows<F>(&mut self, surfaces: &Surfaces, names: Vec<String>, mut make: F) -> Vec<ModelWarning>
    where
        F: FnMut(usize, DataKeys) -> T,
    {
        let first = self.rows.len();
        let mut unmatched: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (i, name) in names.into_iter().enumerate() {
            let valid = surfaces.contains(&name);
            if !valid {
                unmatched.entry(name.clone()).or_default().push(first + i);
            }
            let keys = self.next_keys(name, valid);
            self.rows.push(make(i, keys));
        }
        unmatched_warnings::<T>(unmatched)
    }

    pub(crate) fn clear(&mut self) {
        self.rows.clear();
    }

    /// Pulls `column` from `surfaces`, joined on `surface`. Rows whose surface
    /// is unknown get `None`.
    pub fn map_data_from_surfaces(&mut self, surfaces: &Surfaces, column: SurfaceColumn) {
        for row in &mut self.rows {
            let keys = row.keys_mut();
            let surface = surfaces.get(&keys.surface);
            match column {
                SurfaceColumn::Series => keys.series = surface.and_then(|s| s.series.clone()),
                SurfaceColumn::Id => keys.id = surface.map(|s| s.id),
            }
        }
        debug!(table = T::TABLE, ?column, rows = self.rows.len(), "mapped from surfaces");
    }

    /// Pulls `column` from `series`, joined on the row's `series`.
    pub fn map_data_from_series(&mut self, series: &Series, column: SeriesColumn) {
        for row in &mut self.rows {
            let keys = row.keys_mut();
            match column {
                SeriesColumn::OrderSeries => {
                    keys.order_series = keys.series.as_deref().and_then(|s| series.order_series(s));
                }
            }
        }
        debug!(table = T::TABLE, ?column, rows = self.rows.len(), "mapped from series");
    }

    /// Stable sort by (`order_series`, `id`), unset values last, ties broken by
    /// insertion order.
    pub fn sort_table(&mut self) {
        self.rows.sort_by_key(|row| {
            let keys = row.keys();
            (
                keys.order_series.unwrap_or(usize::MAX),
                keys.id.unwrap_or(usize::MAX),
                keys.seq,
            )
        });
    }

    /// Re-checks every row's surface against `surfaces`.
    pub fn update_validity(&mut self, surfaces: &Surfaces) -> Vec<ModelWarning> {
        let mut unmatched: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (i, row) in self.rows.iter_mut().enumerate() {
            let keys = row.keys_mut();
            keys.valid = surfaces.contains(&keys.surface);
            if !keys.valid {
                unmatched.entry(keys.surface.clone()).or_default().push(i);
            }
        }
        unmatched_warnings::<T>(unmatched)
    }

    /// Deletes rows by position.
    ///
    /// # Errors
    /// `UnknownLabel` if a position is out of range; nothing is deleted then.
    pub fn delete_rows(&mut self, positions: &[usize]) -> GeoResult<()> {
        if let Some(bad) = positions.iter().find(|&&p| p >= self.rows.len()) {
            return Err(IndexError::UnknownLabel {
                label: format!("{} row {bad}", T::TABLE),
            }
            .into());
        }
        let mut i = 0;
        self.rows.retain(|_| {
            let keep = !positions.contains(&i);
            i += 1;
            keep
        });
        Ok(())
    }

    /// Moves one row to new coordinates. Any rescaled coordinates go stale and
    /// are cleared.
    ///
    /// # Errors
    /// `UnknownLabel` if `row` is out of range.
    pub fn modify_coordinates(&mut self, row: usize, coords: [f64; 3]) -> GeoResult<()> {
        let len = self.rows.len();
        let target = self.rows.get_mut(row).ok_or_else(|| IndexError::UnknownLabel {
            label: format!("{} row {row} of {len}", T::TABLE),
        })?;
        target.set_coords(coords);
        target.set_rescaled(None);
        Ok(())
    }

    /// Number of rows with an unset `series`, `id` or `order_series`, or an
    /// invalid surface. Keyed by column name.
    #[must_use]
    pub fn null_counts(&self) -> Vec<(&'static str, usize)> {
        let count = |f: fn(&DataKeys) -> bool| self.rows.iter().filter(|r| f(r.keys())).count();
        vec![
            ("surface", count(|k| !k.valid)),
            ("series", count(|k| k.series.is_none())),
            ("id", count(|k| k.id.is_none())),
            ("order_series", count(|k| k.order_series.is_none())),
        ]
    }

    /// Valid rows per series name, in `series` order.
    #[must_use]
    pub fn count_by_series(&self, series: &Series) -> Vec<usize> {
        let mut counts = vec![0; series.len()];
        for row in &self.rows {
            let keys = row.keys();
            if let Some(pos) = keys.series.as_deref().and_then(|s| series.index().position(s)) {
                if keys.valid {
                    counts[pos] += 1;
                }
            }
        }
        counts
    }

    /// Valid rows per surface, in `surfaces` order.
    #[must_use]
    pub fn count_by_surface(&self, surfaces: &Surfaces) -> Vec<usize> {
        let positions: HashMap<&str, usize> = surfaces
            .rows()
            .iter()
            .enumerate()
            .map(|(i, r)| (r.name.as_str(), i))
            .collect();
        let mut counts = vec![0; surfaces.len()];
        for row in &self.rows {
            if let Some(&pos) = positions.get(row.keys().surface.as_str()) {
                counts[pos] += 1;
            }
        }
        counts
    }

    pub(crate) fn rename_surfaces(&mut self, renames: &HashMap<String, String>) {
        for row in &mut self.rows {
            let keys = row.keys_mut();
            if let Some(new) = renames.get(&keys.surface) {
                keys.surface.clone_from(new);
            }
        }
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [T] {
        &mut self.rows
    }
}

/// Checks that `coords` and `names` have the same length.
pub(crate) fn ensure_row_count(what: &str, coords: usize, names: usize) -> GeoResult<()> {
    if coords == names {
        Ok(())
    } else {
        Err(ValidationError::ValueCountMismatch {
            what: format!("{what} surface names"),
            expected: coords,
            actual: names,
        }
        .into())
    }
}

fn unmatched_warnings<T: Observation>(unmatched: BTreeMap<String, Vec<usize>>) -> Vec<ModelWarning> {
    unmatched
        .into_iter()
        .map(|(surface, rows)| {
            ModelWarning::UnmatchedObservations {
                table: T::TABLE.to_string(),
                surface,
                rows,
            }
            .emit()
        })
        .collect()
}
