//! Fault flags and the fault relation matrix.
//!
//! `Faults` is keyed by series name and is owned by [`crate::Series`]. Only the
//! series table can add, remove, rename or reorder its rows, so the row count
//! and the relation matrix dimension always follow the series count.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GeoResult, IntegrityError, ValidationError};

/// Per-series fault flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultRow {
    /// Series this row describes.
    pub series: String,
    /// Whether the series behaves as a fault.
    pub is_fault: bool,
    /// Whether the fault is finite (only meaningful when `is_fault`).
    pub is_finite: bool,
}

impl FaultRow {
    fn new(series: impl Into<String>) -> Self {
        Self {
            series: series.into(),
            is_fault: false,
            is_finite: false,
        }
    }
}

/// Square boolean matrix: cell `(row, col)` is true when the fault series
/// `row` offsets the series `col`.
///
/// Rows and columns are positional and follow series order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<bool>>", into = "Vec<Vec<bool>>")]
pub struct FaultRelation {
    dim: usize,
    cells: Vec<bool>,
}

impl FaultRelation {
    /// All-false matrix of size `dim` x `dim`.
    #[must_use]
    pub fn zeros(dim: usize) -> Self {
        Self {
            dim,
            cells: vec![false; dim * dim],
        }
    }

    /// Builds a matrix from rows.
    ///
    /// # Errors
    /// Returns `DimensionMismatch` if any row length differs from the row count.
    pub fn from_rows(rows: &[Vec<bool>]) -> Result<Self, ValidationError> {
        let dim = rows.len();
        let mut cells = Vec::with_capacity(dim * dim);
        for row in rows {
            if row.len() != dim {
                return Err(ValidationError::DimensionMismatch {
                    what: "fault relation row".to_string(),
                    expected: dim,
                    actual: row.len(),
                });
            }
            cells.extend_from_slice(row);
        }
        Ok(Self { dim, cells })
    }

    /// Side length of the square matrix.
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.dim
    }

    /// Cell value; out-of-range cells read as false.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> bool {
        row < self.dim && col < self.dim && self.cells[row * self.dim + col]
    }

    /// Rows as nested vectors.
    #[must_use]
    pub fn to_rows(&self) -> Vec<Vec<bool>> {
        self.cells.chunks(self.dim.max(1)).take(self.dim).map(<[bool]>::to_vec).collect()
    }

    fn set(&mut self, row: usize, col: usize, value: bool) {
        self.cells[row * self.dim + col] = value;
    }

    /// Appends a false row and column, keeping the existing block intact.
    fn grow(&mut self) {
        let old = self.dim;
        let mut next = Self::zeros(old + 1);
        for r in 0..old {
            for c in 0..old {
                next.set(r, c, self.get(r, c));
            }
        }
        *self = next;
    }

    fn remove(&mut self, position: usize) {
        let keep: Vec<usize> = (0..self.dim).filter(|&i| i != position).collect();
        self.select(&keep);
    }

    /// Rebuilds the matrix so that new position `i` holds old position `order[i]`.
    /// `None` entries become false rows/columns.
    fn select_optional(&mut self, order: &[Option<usize>]) {
        let mut next = Self::zeros(order.len());
        for (r, old_r) in order.iter().enumerate() {
            for (c, old_c) in order.iter().enumerate() {
                if let (Some(old_r), Some(old_c)) = (old_r, old_c) {
                    next.set(r, c, self.get(*old_r, *old_c));
                }
            }
        }
        *self = next;
    }

    fn select(&mut self, order: &[usize]) {
        let order: Vec<Option<usize>> = order.iter().copied().map(Some).collect();
        self.select_optional(&order);
    }
}

impl TryFrom<Vec<Vec<bool>>> for FaultRelation {
    type Error = ValidationError;

    fn try_from(rows: Vec<Vec<bool>>) -> Result<Self, Self::Error> {
        Self::from_rows(&rows)
    }
}

impl From<FaultRelation> for Vec<Vec<bool>> {
    fn from(relation: FaultRelation) -> Self {
        relation.to_rows()
    }
}

/// Fault table keyed by series name, plus the fault relation matrix.
///
/// # Examples
///
/// ```
/// use stratigraph::{Faults, Series, Surfaces};
///
/// let mut series = Series::new(Faults::new());
/// series.set_series_index(["fault", "cover"], &Surfaces::new()).unwrap();
/// series.faults_mut().set_is_fault(Some(["fault"])).unwrap();
/// assert_eq!(series.faults().n_faults(), 1);
/// assert_eq!(series.faults().fault_relation().dim(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faults {
    rows: Vec<FaultRow>,
    relation: FaultRelation,
}

impl Faults {
    /// Creates an empty fault table. Rows appear as series are added.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows in series order.
    #[must_use]
    pub fn rows(&self) -> &[FaultRow] {
        &self.rows
    }

    /// Number of rows, equal to the series count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when there are no series.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn position(&self, series: &str) -> Option<usize> {
        self.rows.iter().position(|row| row.series == series)
    }

    /// Row for `series`.
    #[must_use]
    pub fn get(&self, series: &str) -> Option<&FaultRow> {
        self.rows.iter().find(|row| row.series == series)
    }

    /// Fault flag of `series`, or `None` if it is not a series.
    #[must_use]
    pub fn is_fault(&self, series: &str) -> Option<bool> {
        self.get(series).map(|row| row.is_fault)
    }

    /// Finite-fault flag of `series`, or `None` if it is not a series.
    #[must_use]
    pub fn is_finite(&self, series: &str) -> Option<bool> {
        self.get(series).map(|row| row.is_finite)
    }

    /// Number of series flagged as faults.
    #[must_use]
    pub fn n_faults(&self) -> usize {
        self.rows.iter().filter(|row| row.is_fault).count()
    }

    /// Names of fault series, in series order.
    #[must_use]
    pub fn fault_names(&self) -> Vec<&str> {
        self.rows
            .iter()
            .filter(|row| row.is_fault)
            .map(|row| row.series.as_str())
            .collect()
    }

    /// The stored relation matrix, unmasked.
    #[must_use]
    pub const fn fault_relation(&self) -> &FaultRelation {
        &self.relation
    }

    /// Marks the named series as faults and every other series as not a fault.
    /// `None` marks every series as a fault.
    ///
    /// # Errors
    /// Returns `ReferentialIntegrity` if a name is not a known series; the
    /// table is unchanged in that case.
    pub fn set_is_fault<I, S>(&mut self, series: Option<I>) -> GeoResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let selected = self.select_flags(series)?;
        for (row, flag) in self.rows.iter_mut().zip(selected) {
            row.is_fault = flag;
        }
        debug!(n_faults = self.n_faults(), "fault flags updated");
        Ok(())
    }

    /// Marks the named series as finite faults and every other series as infinite.
    /// `None` marks every series as finite.
    ///
    /// # Errors
    /// Returns `ReferentialIntegrity` if a name is not a known series.
    pub fn set_is_finite<I, S>(&mut self, series: Option<I>) -> GeoResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let selected = self.select_flags(series)?;
        for (row, flag) in self.rows.iter_mut().zip(selected) {
            row.is_finite = flag;
        }
        Ok(())
    }

    fn select_flags<I, S>(&self, series: Option<I>) -> GeoResult<Vec<bool>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let Some(names) = series else {
            return Ok(vec![true; self.rows.len()]);
        };
        let mut flags = vec![false; self.rows.len()];
        for name in names {
            let name = name.as_ref();
            let position = self.position(name).ok_or_else(|| {
                IntegrityError::referential(format!("series '{name}' does not exist"))
            })?;
            flags[position] = true;
        }
        Ok(flags)
    }

    /// Replaces the fault relation matrix. `None` resets it to all-false.
    ///
    /// Only cells whose row and column series are both faults are meaningful;
    /// other cells are kept as given and masked by [`Faults::effective_relation`].
    ///
    /// # Errors
    /// Returns `DimensionMismatch` if the matrix is not `n x n` for the current
    /// series count `n`.
    pub fn set_fault_relation(&mut self, matrix: Option<FaultRelation>) -> GeoResult<()> {
        let matrix = matrix.unwrap_or_else(|| FaultRelation::zeros(self.rows.len()));
        if matrix.dim() != self.rows.len() {
            return Err(ValidationError::DimensionMismatch {
                what: "fault relation".to_string(),
                expected: self.rows.len(),
                actual: matrix.dim(),
            }
            .into());
        }
        self.relation = matrix;
        Ok(())
    }

    /// True if `fault` offsets `series` and both are faults.
    #[must_use]
    pub fn offsets(&self, fault: &str, series: &str) -> bool {
        match (self.position(fault), self.position(series)) {
            (Some(r), Some(c)) => {
                self.rows[r].is_fault && self.rows[c].is_fault && self.relation.get(r, c)
            }
            _ => false,
        }
    }

    /// Relation matrix with every cell masked to false unless both its row and
    /// column series are faults. This is what the interpolation engine reads.
    #[must_use]
    pub fn effective_relation(&self) -> FaultRelation {
        let mut masked = self.relation.clone();
        for r in 0..masked.dim() {
            for c in 0..masked.dim() {
                if !(self.rows[r].is_fault && self.rows[c].is_fault) {
                    masked.set(r, c, false);
                }
            }
        }
        masked
    }

    // Series -> Faults synchronization. Only `Series` calls these.

    pub(crate) fn push_series(&mut self, name: &str) {
        self.rows.push(FaultRow::new(name));
        self.relation.grow();
    }

    pub(crate) fn remove_series(&mut self, position: usize) {
        self.rows.remove(position);
        self.relation.remove(position);
    }

    pub(crate) fn rename_series(&mut self, renames: &HashMap<String, String>) {
        for row in &mut self.rows {
            if let Some(new) = renames.get(&row.series) {
                row.series.clone_from(new);
            }
        }
    }

    pub(crate) fn permute_series(&mut self, permutation: &[usize]) {
        self.rows = permutation.iter().map(|&old| self.rows[old].clone()).collect();
        self.relation.select(permutation);
    }

    /// Rebuilds the table for a new series set, keeping rows and relation
    /// cells of series that survive by name.
    pub(crate) fn reset_series(&mut self, names: &[String]) {
        let order: Vec<Option<usize>> = names.iter().map(|name| self.position(name)).collect();
        self.rows = names
            .iter()
            .zip(&order)
            .map(|(name, old)| old.map_or_else(|| FaultRow::new(name.as_str()), |i| self.rows[i].clone()))
            .collect();
        self.relation.select_optional(&order);
    }
}
