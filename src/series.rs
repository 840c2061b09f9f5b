//! Series: ordered stratigraphic groups sharing one scalar field.
//!
//! The order of the series index is the computation order of the whole model.
//! `Series` owns its [`Faults`] collaborator and updates it inside every call
//! that changes the series set, so both always observe the same series count.
//! Calls that could orphan or rename a surface's series reference take the
//! [`Surfaces`] table explicitly.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GeoResult, IntegrityError, ValidationError};
use crate::faults::Faults;
use crate::index::CategoricalIndex;
use crate::surfaces::Surfaces;

/// How a series' base relates to the series below it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BottomRelation {
    /// The series cuts the older ones.
    #[default]
    Erosion,
    /// The series lies on top of the older ones.
    Onlap,
    /// The series is a fault.
    Fault,
}

/// Read-only view of one series with its fault flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesRow<'a> {
    pub name: &'a str,
    /// One-based position in computation order.
    pub order_series: usize,
    pub bottom_relation: BottomRelation,
    pub is_fault: bool,
    pub is_finite: bool,
}

/// The series table.
///
/// # Examples
///
/// ```
/// use stratigraph::{Faults, Series, Surfaces};
///
/// let mut series = Series::new(Faults::new());
/// series.set_series_index(["foo", "foo2", "foo5", "foo7"], &Surfaces::new()).unwrap();
/// series.add_series("foo3").unwrap();
/// assert_eq!(series.faults().fault_relation().dim(), 5);
///
/// series.delete_series("foo3", &Surfaces::new()).unwrap();
/// assert_eq!(series.order_series("foo7"), Some(4));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Series {
    index: CategoricalIndex,
    relations: Vec<BottomRelation>,
    faults: Faults,
}

impl Series {
    /// Creates an empty series table linked to `faults`.
    ///
    /// Any rows already in `faults` are dropped, since no series exist yet.
    #[must_use]
    pub fn new(mut faults: Faults) -> Self {
        faults.reset_series(&[]);
        Self {
            index: CategoricalIndex::new(),
            relations: Vec::new(),
            faults,
        }
    }

    /// The ordered series names.
    #[must_use]
    pub const fn index(&self) -> &CategoricalIndex {
        &self.index
    }

    /// Number of series.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True when no series exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// True if `name` is a series.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains(name)
    }

    /// Series names in computation order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        self.index.labels()
    }

    /// First series in computation order; the default for new surfaces.
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        self.index.get(0)
    }

    /// One-based computation order of `name`.
    #[must_use]
    pub fn order_series(&self, name: &str) -> Option<usize> {
        self.index.position(name).map(|p| p + 1)
    }

    /// Fault flags and the fault relation, aligned with the series order.
    #[must_use]
    pub const fn faults(&self) -> &Faults {
        &self.faults
    }

    /// Mutable access to fault flags and the relation matrix.
    ///
    /// The series set itself can only change through `Series`.
    pub fn faults_mut(&mut self) -> &mut Faults {
        &mut self.faults
    }

    /// Bottom relation of `name`. Fault series always report `Fault`.
    #[must_use]
    pub fn bottom_relation(&self, name: &str) -> Option<BottomRelation> {
        let position = self.index.position(name)?;
        if self.faults.rows()[position].is_fault {
            Some(BottomRelation::Fault)
        } else {
            Some(self.relations[position])
        }
    }

    /// Sets the bottom relation of a non-fault series.
    ///
    /// # Errors
    /// Returns `ReferentialIntegrity` if the series does not exist.
    pub fn set_bottom_relation(&mut self, name: &str, relation: BottomRelation) -> GeoResult<()> {
        let position = self
            .index
            .position(name)
            .ok_or_else(|| IntegrityError::referential(format!("series '{name}' does not exist")))?;
        self.relations[position] = relation;
        Ok(())
    }

    /// Rows in computation order, with the fault flags supplied by [`Faults`].
    pub fn rows(&self) -> impl Iterator<Item = SeriesRow<'_>> {
        self.index.iter().enumerate().map(move |(i, name)| {
            let flags = &self.faults.rows()[i];
            SeriesRow {
                name,
                order_series: i + 1,
                bottom_relation: if flags.is_fault {
                    BottomRelation::Fault
                } else {
                    self.relations[i]
                },
                is_fault: flags.is_fault,
                is_finite: flags.is_finite,
            }
        })
    }

    /// Replaces the whole series set.
    ///
    /// Series that survive by name keep their bottom relation, fault flags and
    /// fault relation cells; new series start with defaults. Series that would
    /// disappear must not be referenced by any row of `surfaces`.
    ///
    /// # Errors
    /// - `DuplicateLabel` if `names` repeats a name.
    /// - `EmptyName` if a name is blank.
    /// - `ReferentialIntegrity` if a series that would disappear is still
    ///   referenced by a surface.
    pub fn set_series_index<I, S>(&mut self, names: I, surfaces: &Surfaces) -> GeoResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let index = CategoricalIndex::from_labels(names)?;
        if let Some(name) = index.iter().find(|name| name.trim().is_empty()) {
            return Err(ValidationError::EmptyName {
                what: format!("series '{name}'"),
            }
            .into());
        }
        for dropped in self.index.iter().filter(|name| !index.contains(name)) {
            ensure_unreferenced(dropped, surfaces)?;
        }

        self.relations = index
            .iter()
            .map(|name| self.index.position(name).map_or_else(BottomRelation::default, |i| self.relations[i]))
            .collect();
        self.faults.reset_series(index.labels());
        self.index = index;
        debug!(series = %self.index, "series index replaced");
        Ok(())
    }

    /// Appends a series. Faults gains a false row and column in the same call.
    ///
    /// # Errors
    /// Returns `DuplicateLabel` if the name exists, `EmptyName` if blank.
    pub fn add_series(&mut self, name: impl Into<String>) -> GeoResult<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName {
                what: "series".to_string(),
            }
            .into());
        }
        self.index.insert(name.clone())?;
        self.relations.push(BottomRelation::default());
        self.faults.push_series(&name);
        debug!(series = %name, count = self.index.len(), "series added");
        Ok(())
    }

    /// Deletes a series.
    ///
    /// Deletion is blocked while any surface still belongs to the series;
    /// remap those surfaces first.
    ///
    /// # Errors
    /// - `UnknownLabel` if the series does not exist.
    /// - `ReferentialIntegrity` if a surface references it.
    pub fn delete_series(&mut self, name: &str, surfaces: &Surfaces) -> GeoResult<()> {
        if !self.index.contains(name) {
            return Err(crate::error::IndexError::UnknownLabel {
                label: name.to_string(),
            }
            .into());
        }
        ensure_unreferenced(name, surfaces)?;
        let position = self.index.delete(name)?;
        self.relations.remove(position);
        self.faults.remove_series(position);
        debug!(series = %name, count = self.index.len(), "series deleted");
        Ok(())
    }

    /// Renames series (old -> new) and pushes the new names into every
    /// surface that referenced an old one.
    ///
    /// # Errors
    /// Any `CategoricalIndex::rename` error; nothing changes on error.
    pub fn rename_series<K, V>(&mut self, mapping: &[(K, V)], surfaces: &mut Surfaces) -> GeoResult<()>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.index.rename(mapping)?;
        let renames: HashMap<String, String> = mapping
            .iter()
            .map(|(old, new)| (old.as_ref().to_string(), new.as_ref().to_string()))
            .collect();
        self.faults.rename_series(&renames);
        surfaces.rename_series_references(&renames);
        debug!(renamed = renames.len(), "series renamed");
        Ok(())
    }

    /// Reorders series to `new_order`, a full permutation of the current names.
    /// Fault rows and the relation matrix are permuted identically.
    ///
    /// # Errors
    /// Returns `InvalidPermutation` if `new_order` is not a permutation.
    pub fn reorder_series<S: AsRef<str>>(&mut self, new_order: &[S]) -> GeoResult<()> {
        let permutation = self.index.reorder(new_order)?;
        self.relations = permutation.iter().map(|&old| self.relations[old]).collect();
        self.faults.permute_series(&permutation);
        debug!(series = %self.index, "series reordered");
        Ok(())
    }

    /// Checks that bottom relations and fault rows line up with the index.
    /// Only deserialized tables can fail this.
    pub(crate) fn check_alignment(&self) -> GeoResult<()> {
        if self.relations.len() != self.index.len() {
            return Err(IntegrityError::referential(format!(
                "{} bottom relations for {} series",
                self.relations.len(),
                self.index.len()
            ))
            .into());
        }
        let faults = &self.faults;
        let aligned = faults.len() == self.index.len()
            && faults.fault_relation().dim() == self.index.len()
            && faults
                .rows()
                .iter()
                .zip(self.index.iter())
                .all(|(row, name)| &row.series == name);
        if aligned {
            Ok(())
        } else {
            Err(IntegrityError::referential("fault table does not match the series index").into())
        }
    }
}

fn ensure_unreferenced(series: &str, surfaces: &Surfaces) -> GeoResult<()> {
    let referencing = surfaces.surfaces_in_series(series);
    if referencing.is_empty() {
        Ok(())
    } else {
        Err(IntegrityError::referential(format!(
            "series '{series}' is still referenced by surfaces [{}]",
            referencing.join(", ")
        ))
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::faults::FaultRelation;

    fn series_abcd() -> Series {
        let mut series = Series::new(Faults::new());
        series.set_series_index(["a", "b", "c", "d"], &Surfaces::new()).unwrap();
        series
    }

    #[test]
    fn add_series_grows_fault_matrix() {
        let mut series = series_abcd();
        let rows = vec![
            vec![false, true, false, false],
            vec![false, false, true, false],
            vec![false; 4],
            vec![true, false, false, false],
        ];
        series
            .faults_mut()
            .set_fault_relation(Some(FaultRelation::from_rows(&rows).unwrap()))
            .unwrap();

        series.add_series("e").unwrap();
        assert_eq!(series.names(), ["a", "b", "c", "d", "e"]);
        let rel = series.faults().fault_relation();
        assert_eq!(rel.dim(), 5);
        for (r, row) in rows.iter().enumerate() {
            for (c, &cell) in row.iter().enumerate() {
                assert_eq!(rel.get(r, c), cell);
            }
        }
        assert!((0..5).all(|i| !rel.get(4, i) && !rel.get(i, 4)));
        assert_eq!(series.faults().is_fault("e"), Some(false));
    }

    #[test]
    fn add_series_rejects_duplicates_and_blank() {
        let mut series = series_abcd();
        assert!(series.add_series("a").unwrap_err().is_index());
        assert!(series.add_series("  ").unwrap_err().is_validation());
        assert_eq!(series.faults().len(), 4);
    }

    #[test]
    fn delete_series_keeps_matrix_aligned() {
        let mut series = series_abcd();
        series.faults_mut().set_is_fault(Some(["c"])).unwrap();
        series.delete_series("b", &Surfaces::new()).unwrap();
        assert_eq!(series.names(), ["a", "c", "d"]);
        assert_eq!(series.faults().fault_relation().dim(), 3);
        assert_eq!(series.faults().rows()[1].series, "c");
        assert_eq!(series.faults().is_fault("c"), Some(true));
    }

    #[test]
    fn delete_unknown_series_fails() {
        let mut series = series_abcd();
        assert!(series.delete_series("zz", &Surfaces::new()).unwrap_err().is_index());
    }

    #[test]
    fn reorder_round_trip_restores_matrix() {
        let mut series = series_abcd();
        let rows = vec![
            vec![true, true, false, false],
            vec![false, false, false, true],
            vec![false, true, false, false],
            vec![false, false, true, true],
        ];
        series
            .faults_mut()
            .set_fault_relation(Some(FaultRelation::from_rows(&rows).unwrap()))
            .unwrap();
        series.set_bottom_relation("b", BottomRelation::Onlap).unwrap();
        let before = series.clone();

        series.reorder_series(&["c", "a", "d", "b"]).unwrap();
        assert_eq!(series.order_series("c"), Some(1));
        assert_eq!(series.bottom_relation("b"), Some(BottomRelation::Onlap));
        series.reorder_series(&["a", "b", "c", "d"]).unwrap();
        assert_eq!(series, before);
    }

    #[test]
    fn reorder_requires_full_permutation() {
        let mut series = series_abcd();
        let err = series.reorder_series(&["b", "a"]).unwrap_err();
        assert!(err.is_index());
        assert_eq!(series.names(), ["a", "b", "c", "d"]);
    }

    #[test]
    fn set_series_index_preserves_surviving_flags() {
        let mut series = series_abcd();
        series.faults_mut().set_is_fault(Some(["d"])).unwrap();
        series.set_series_index(["d", "x"], &Surfaces::new()).unwrap();
        assert_eq!(series.faults().is_fault("d"), Some(true));
        assert_eq!(series.faults().is_fault("x"), Some(false));
        assert_eq!(series.faults().fault_relation().dim(), 2);
    }

    #[test]
    fn set_series_index_refuses_to_drop_referenced_series() {
        let mut series = series_abcd();
        let mut surfaces = Surfaces::new();
        surfaces.set_surfaces_names(&series, ["s1", "s2"]).unwrap();
        surfaces.map_series(&series, &crate::surfaces::SeriesMapping::new().map("b", ["s2"]));

        let err = series.set_series_index(["a"], &surfaces).unwrap_err();
        assert!(matches!(err, crate::GeoError::Integrity(IntegrityError::ReferentialIntegrity { .. })));
        assert_eq!(series.names(), ["a", "b", "c", "d"]);
        assert!(surfaces
            .rows()
            .iter()
            .all(|r| r.series.as_deref().is_some_and(|s| series.contains(s))));

        series.set_series_index(["a", "b"], &surfaces).unwrap();
        assert_eq!(series.faults().fault_relation().dim(), 2);
    }

    #[test]
    fn check_alignment_rejects_truncated_relations() {
        let series = series_abcd();
        series.check_alignment().unwrap();

        let mut value = serde_json::to_value(&series).unwrap();
        value["relations"] = serde_json::Value::Array(Vec::new());
        let tampered: Series = serde_json::from_value(value).unwrap();
        assert!(tampered.check_alignment().unwrap_err().is_integrity());
    }

    #[test]
    fn rows_expose_fault_view() {
        let mut series = series_abcd();
        series.faults_mut().set_is_fault(Some(["a"])).unwrap();
        series.faults_mut().set_is_finite(Some(["a"])).unwrap();
        let rows: Vec<_> = series.rows().collect();
        assert_eq!(rows[0].bottom_relation, BottomRelation::Fault);
        assert!(rows[0].is_finite);
        assert_eq!(rows[3].order_series, 4);
        assert!(!rows[3].is_fault);
    }
}
