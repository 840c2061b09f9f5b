//! Surfaces: named rock-unit boundaries, each belonging to one series.
//!
//! The table owns the surface order (and with it the dense `id` sequence),
//! the basement flag, display colors and arbitrary numeric value columns.
//! Series membership is a categorical foreign key into [`Series`], validated
//! on every write; a reference to a series that does not exist degrades to
//! `None` plus a [`ModelWarning`].

mod colors;
mod values;

pub use colors::{normalize_color, DEFAULT_PALETTE};
pub use values::{SurfaceValues, ValueColumn};

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::{ObservationTable, Orientation, SurfacePoint};
use crate::error::{GeoResult, IndexError, IntegrityError, ValidationError};
use crate::index::CategoricalIndex;
use crate::series::Series;
use crate::warning::ModelWarning;

/// One surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceRow {
    pub name: String,
    /// Owning series; `None` when mapped to a series that does not exist.
    pub series: Option<String>,
    /// One-based computation order, dense in table order.
    pub id: usize,
    pub basement: bool,
    /// `#rrggbb`.
    pub color: String,
}

/// Series -> surfaces assignment used by [`Surfaces::map_series`].
///
/// # Examples
///
/// ```
/// use stratigraph::SeriesMapping;
///
/// let mapping = SeriesMapping::new()
///     .map("foo7", ["foo"])
///     .map("boo", ["foo2", "foo5"]);
/// assert_eq!(mapping.entries().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesMapping {
    entries: Vec<(String, Vec<String>)>,
}

impl SeriesMapping {
    /// Creates an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns `surfaces` to `series`.
    #[must_use]
    pub fn map<I, S>(mut self, series: impl Into<String>, surfaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries
            .push((series.into(), surfaces.into_iter().map(Into::into).collect()));
        self
    }

    /// Series -> surfaces pairs in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[(String, Vec<String>)] {
        &self.entries
    }
}

/// The surfaces table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Surfaces {
    rows: Vec<SurfaceRow>,
    values: SurfaceValues,
    /// Set by [`Surfaces::set_basement_to`]; an unpinned basement follows the
    /// last surface through sorts.
    #[serde(default)]
    basement_pinned: bool,
}

impl Surfaces {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows in table order.
    #[must_use]
    pub fn rows(&self) -> &[SurfaceRow] {
        &self.rows
    }

    /// Number of surfaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has no surfaces.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Surface names in table (computation) order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.name.as_str()).collect()
    }

    /// Row of surface `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SurfaceRow> {
        self.rows.iter().find(|r| r.name == name)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.rows.iter().position(|r| r.name == name)
    }

    /// True if `name` is a surface.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Names of surfaces whose series is `series`.
    #[must_use]
    pub fn surfaces_in_series(&self, series: &str) -> Vec<&str> {
        self.rows
            .iter()
            .filter(|r| r.series.as_deref() == Some(series))
            .map(|r| r.name.as_str())
            .collect()
    }

    /// The current basement surface.
    #[must_use]
    pub fn basement(&self) -> Option<&str> {
        self.rows.iter().find(|r| r.basement).map(|r| r.name.as_str())
    }

    /// Numeric value columns, aligned with the rows.
    #[must_use]
    pub const fn values(&self) -> &SurfaceValues {
        &self.values
    }

    /// Value of `column` for `surface`, if set.
    #[must_use]
    pub fn value(&self, surface: &str, column: &str) -> Option<f64> {
        self.position(surface).and_then(|row| self.values.cell(row, column))
    }

    /// Replaces the whole surface set. Every surface starts in the first
    /// series; ids follow input order and the last surface becomes basement.
    /// Value columns are dropped.
    ///
    /// # Errors
    /// `DuplicateLabel` on repeated names, `EmptyName` on blank ones.
    pub fn set_surfaces_names<I, S>(&mut self, series: &Series, names: I) -> GeoResult<Vec<ModelWarning>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = validate_new_names(names, &HashSet::new())?;
        self.rows.clear();
        self.values.clear();
        self.basement_pinned = false;
        let warnings = self.append(series, names);
        self.set_basement()?;
        debug!(surfaces = self.rows.len(), "surface set replaced");
        Ok(warnings)
    }

    /// Appends surfaces in the first series.
    ///
    /// # Errors
    /// `DuplicateLabel` if a name exists or repeats, `EmptyName` on blank ones.
    pub fn add_surface<I, S>(&mut self, series: &Series, names: I) -> GeoResult<Vec<ModelWarning>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let existing: HashSet<&str> = self.rows.iter().map(|r| r.name.as_str()).collect();
        let names = validate_new_names(names, &existing)?;
        let warnings = self.append(series, names);
        self.set_basement()?;
        Ok(warnings)
    }

    fn append(&mut self, series: &Series, names: Vec<String>) -> Vec<ModelWarning> {
        let default_series = series.first().map(str::to_string);
        let mut used: HashSet<String> = self.rows.iter().map(|r| r.color.clone()).collect();
        for name in &names {
            let color = colors::next_color(name, &used);
            used.insert(color.clone());
            self.rows.push(SurfaceRow {
                name: name.clone(),
                series: default_series.clone(),
                id: 0,
                basement: false,
                color,
            });
            self.values.push_row();
        }
        self.update_ids();

        if default_series.is_none() && !names.is_empty() {
            vec![ModelWarning::NoSeriesAvailable { surfaces: names }.emit()]
        } else {
            Vec::new()
        }
    }

    /// Deletes surfaces. Deleting the basement unpins it and moves the flag to
    /// the last remaining surface.
    ///
    /// # Errors
    /// `UnknownLabel` if any name does not exist; nothing is deleted then.
    pub fn delete_surface<S: AsRef<str>>(&mut self, names: &[S]) -> GeoResult<()> {
        for name in names {
            if !self.contains(name.as_ref()) {
                return Err(IndexError::UnknownLabel {
                    label: name.as_ref().to_string(),
                }
                .into());
            }
        }
        let keep: Vec<bool> = self
            .rows
            .iter()
            .map(|r| !names.iter().any(|n| n.as_ref() == r.name))
            .collect();
        if self.rows.iter().zip(&keep).any(|(r, &kept)| r.basement && !kept) {
            self.basement_pinned = false;
        }
        let mut flags = keep.iter();
        self.rows.retain(|_| flags.next().copied().unwrap_or(false));
        self.values.retain_rows(&keep);
        self.update_ids();
        self.set_basement()?;
        debug!(deleted = names.len(), remaining = self.rows.len(), "surfaces deleted");
        Ok(())
    }

    /// Drops named value columns.
    ///
    /// # Errors
    /// `UnknownLabel` if any column does not exist.
    pub fn delete_surface_values<S: AsRef<str>>(&mut self, columns: &[S]) -> GeoResult<()> {
        self.values.delete(columns)
    }

    /// Replaces all value columns. Each inner vector is one column with one
    /// value per surface.
    ///
    /// # Errors
    /// `ValueCountMismatch` if a column length differs from the surface count,
    /// `DimensionMismatch` if `names` and `columns` differ in length.
    pub fn set_surfaces_values(&mut self, columns: Vec<Vec<f64>>, names: Option<Vec<String>>) -> GeoResult<()> {
        self.values.set(self.rows.len(), columns, names)
    }

    /// Appends value columns. See [`Surfaces::set_surfaces_values`].
    ///
    /// # Errors
    /// As `set_surfaces_values`, plus `DuplicateLabel` for an existing column name.
    pub fn add_surfaces_values(&mut self, columns: Vec<Vec<f64>>, names: Option<Vec<String>>) -> GeoResult<()> {
        self.values.add(self.rows.len(), columns, names)
    }

    /// Sets a single value cell.
    ///
    /// # Errors
    /// `ReferentialIntegrity` for an unknown surface, `UnknownLabel` for an
    /// unknown column.
    pub fn modify_surface_value(&mut self, surface: &str, column: &str, value: f64) -> GeoResult<()> {
        let row = self
            .position(surface)
            .ok_or_else(|| IntegrityError::referential(format!("surface '{surface}' does not exist")))?;
        self.values.set_cell(row, column, value)
    }

    /// Assigns surfaces to series, then sorts the table by series order.
    ///
    /// Unknown surface names are ignored; surfaces assigned to a series that
    /// does not exist get `None`. Both cases return a warning.
    pub fn map_series(&mut self, series: &Series, mapping: &SeriesMapping) -> Vec<ModelWarning> {
        let mut warnings = Vec::new();
        for (series_name, surfaces) in mapping.entries() {
            let known_series = series.contains(series_name);
            let mut orphaned = Vec::new();
            for surface in surfaces {
                let Some(row) = self.rows.iter_mut().find(|r| &r.name == surface) else {
                    warnings.push(ModelWarning::UnknownSurface { surface: surface.clone() }.emit());
                    continue;
                };
                if known_series {
                    row.series = Some(series_name.clone());
                } else {
                    row.series = None;
                    orphaned.push(surface.clone());
                }
            }
            if !known_series {
                warnings.push(
                    ModelWarning::UnknownSeries {
                        series: series_name.clone(),
                        surfaces: orphaned,
                    }
                    .emit(),
                );
            }
        }
        self.sort_by_series(series);
        warnings
    }

    /// Stable sort by series computation order (surfaces without a series
    /// last), then reassigns ids. Unless pinned with
    /// [`Surfaces::set_basement_to`], the basement moves to the new last
    /// surface.
    pub fn sort_by_series(&mut self, series: &Series) {
        let mut permutation: Vec<usize> = (0..self.rows.len()).collect();
        permutation.sort_by_key(|&i| {
            self.rows[i]
                .series
                .as_deref()
                .and_then(|s| series.order_series(s))
                .unwrap_or(usize::MAX)
        });
        self.rows = permutation.iter().map(|&old| self.rows[old].clone()).collect();
        self.values.permute_rows(&permutation);
        self.update_ids();
        if !self.basement_pinned {
            let last = self.rows.len().saturating_sub(1);
            for (i, row) in self.rows.iter_mut().enumerate() {
                row.basement = i == last;
            }
        }
    }

    /// Ensures a basement exists: if none is flagged, the last surface
    /// becomes basement. A no-op when one is already set.
    ///
    /// # Errors
    /// `AmbiguousBasement` if more than one surface is flagged.
    pub fn set_basement(&mut self) -> GeoResult<()> {
        let count = self.rows.iter().filter(|r| r.basement).count();
        match count {
            0 => {
                if let Some(last) = self.rows.last_mut() {
                    last.basement = true;
                }
                Ok(())
            }
            1 => Ok(()),
            count => Err(IntegrityError::AmbiguousBasement { count }.into()),
        }
    }

    /// Moves the basement flag to `name` and pins it there, so later sorts
    /// leave it in place.
    ///
    /// # Errors
    /// `ReferentialIntegrity` if the surface does not exist.
    pub fn set_basement_to(&mut self, name: &str) -> GeoResult<()> {
        if !self.contains(name) {
            return Err(IntegrityError::referential(format!("surface '{name}' does not exist")).into());
        }
        for row in &mut self.rows {
            row.basement = row.name == name;
        }
        self.basement_pinned = true;
        Ok(())
    }

    /// Renames surfaces (old -> new) and pushes the new names into the
    /// `surface` column of both observation tables.
    ///
    /// # Errors
    /// `UnknownLabel` or `DuplicateLabel` as for a categorical rename; nothing
    /// changes on error.
    pub fn rename_surfaces<K, V>(
        &mut self,
        mapping: &[(K, V)],
        surface_points: &mut ObservationTable<SurfacePoint>,
        orientations: &mut ObservationTable<Orientation>,
    ) -> GeoResult<()>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut index = CategoricalIndex::from_labels(self.rows.iter().map(|r| r.name.clone()))?;
        index.rename(mapping)?;
        if let Some(name) = index.iter().find(|n| n.trim().is_empty()) {
            return Err(ValidationError::EmptyName {
                what: format!("surface '{name}'"),
            }
            .into());
        }

        let renames: HashMap<String, String> = mapping
            .iter()
            .map(|(old, new)| (old.as_ref().to_string(), new.as_ref().to_string()))
            .collect();
        for (row, name) in self.rows.iter_mut().zip(index.labels()) {
            row.name.clone_from(name);
        }
        surface_points.rename_surfaces(&renames);
        orientations.rename_surfaces(&renames);
        debug!(renamed = renames.len(), "surfaces renamed");
        Ok(())
    }

    /// Overrides colors with an explicit surface -> `#rrggbb` mapping.
    ///
    /// # Errors
    /// `ReferentialIntegrity` for an unknown surface, `InvalidColor` for a
    /// malformed color; nothing changes on error.
    pub fn change_colors<K, V>(&mut self, mapping: &[(K, V)]) -> GeoResult<()>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut resolved = Vec::with_capacity(mapping.len());
        for (surface, color) in mapping {
            let surface = surface.as_ref();
            let row = self
                .position(surface)
                .ok_or_else(|| IntegrityError::referential(format!("surface '{surface}' does not exist")))?;
            resolved.push((row, normalize_color(color.as_ref())?));
        }
        for (row, color) in resolved {
            self.rows[row].color = color;
        }
        Ok(())
    }

    /// Number of surfaces with no series.
    #[must_use]
    pub fn unset_series_count(&self) -> usize {
        self.rows.iter().filter(|r| r.series.is_none()).count()
    }

    /// Checks a deserialized table against `series`: unique names, every
    /// series reference known, dense ids, one basement and value columns of
    /// the right length.
    pub(crate) fn check_consistency(&self, series: &Series) -> GeoResult<()> {
        let mut seen = HashSet::with_capacity(self.rows.len());
        for (i, row) in self.rows.iter().enumerate() {
            if !seen.insert(row.name.as_str()) {
                return Err(IndexError::DuplicateLabel { label: row.name.clone() }.into());
            }
            if let Some(name) = row.series.as_deref().filter(|s| !series.contains(s)) {
                return Err(IntegrityError::referential(format!(
                    "surface '{}' references unknown series '{name}'",
                    row.name
                ))
                .into());
            }
            if row.id != i + 1 {
                return Err(IntegrityError::referential(format!(
                    "surface '{}' has id {} at position {}",
                    row.name,
                    row.id,
                    i + 1
                ))
                .into());
            }
        }
        match self.rows.iter().filter(|r| r.basement).count() {
            0 if !self.rows.is_empty() => {
                return Err(IntegrityError::referential("no surface is flagged as basement").into());
            }
            0 | 1 => {}
            count => return Err(IntegrityError::AmbiguousBasement { count }.into()),
        }
        if let Some(column) = self.values.columns().iter().find(|c| c.values.len() != self.rows.len()) {
            return Err(ValidationError::ValueCountMismatch {
                what: format!("value column '{}'", column.name),
                expected: self.rows.len(),
                actual: column.values.len(),
            }
            .into());
        }
        Ok(())
    }

    /// Surfaces whose series is set but missing from `series`.
    #[must_use]
    pub fn dangling_series(&self, series: &Series) -> Vec<&str> {
        self.rows
            .iter()
            .filter(|r| r.series.as_deref().is_some_and(|s| !series.contains(s)))
            .map(|r| r.name.as_str())
            .collect()
    }

    pub(crate) fn rename_series_references(&mut self, renames: &HashMap<String, String>) {
        for row in &mut self.rows {
            if let Some(new) = row.series.as_ref().and_then(|s| renames.get(s)) {
                row.series = Some(new.clone());
            }
        }
    }

    fn update_ids(&mut self) {
        for (i, row) in self.rows.iter_mut().enumerate() {
            row.id = i + 1;
        }
    }
}

fn validate_new_names<I, S>(names: I, existing: &HashSet<&str>) -> GeoResult<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let names: Vec<String> = names.into_iter().map(Into::into).collect();
    let mut seen = HashSet::with_capacity(names.len());
    for name in &names {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName {
                what: "surface".to_string(),
            }
            .into());
        }
        if existing.contains(name.as_str()) || !seen.insert(name.as_str()) {
            return Err(IndexError::DuplicateLabel { label: name.clone() }.into());
        }
    }
    Ok(names)
}
