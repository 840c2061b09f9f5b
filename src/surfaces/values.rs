//! Named numeric value columns attached to surfaces.
//!
//! Each column holds one optional value per surface, aligned positionally with
//! the surface table. Cells are `None` for surfaces added after the column was
//! set.

use serde::{Deserialize, Serialize};

use crate::error::{GeoResult, IndexError, ValidationError};

/// One named property column (e.g. density).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueColumn {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// Value columns, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurfaceValues {
    columns: Vec<ValueColumn>,
}

impl SurfaceValues {
    /// All columns in insertion order.
    #[must_use]
    pub fn columns(&self) -> &[ValueColumn] {
        &self.columns
    }

    /// Column names in insertion order.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Column called `name`.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ValueColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Validates and appends `data` as new columns for `n_rows` surfaces.
    ///
    /// Unnamed columns are called `value_<k>`, with `k` counting existing columns.
    pub(crate) fn add(&mut self, n_rows: usize, data: Vec<Vec<f64>>, names: Option<Vec<String>>) -> GeoResult<()> {
        let names = match names {
            Some(names) => {
                if names.len() != data.len() {
                    return Err(ValidationError::DimensionMismatch {
                        what: "value column names".to_string(),
                        expected: data.len(),
                        actual: names.len(),
                    }
                    .into());
                }
                names
            }
            None => (0..data.len()).map(|k| self.unused_name(k)).collect(),
        };

        for (name, column) in names.iter().zip(&data) {
            if column.len() != n_rows {
                return Err(ValidationError::ValueCountMismatch {
                    what: format!("value column '{name}'"),
                    expected: n_rows,
                    actual: column.len(),
                }
                .into());
            }
            let repeated = names.iter().filter(|n| *n == name).count() > 1;
            if repeated || self.column_position(name).is_some() {
                return Err(IndexError::DuplicateLabel { label: name.clone() }.into());
            }
        }

        self.columns.extend(names.into_iter().zip(data).map(|(name, values)| ValueColumn {
            name,
            values: values.into_iter().map(Some).collect(),
        }));
        Ok(())
    }

    fn unused_name(&self, offset: usize) -> String {
        let mut k = self.columns.len() + offset;
        loop {
            let name = format!("value_{k}");
            if self.column_position(&name).is_none() {
                return name;
            }
            k += 1;
        }
    }

    /// Replaces every column with `data`.
    pub(crate) fn set(&mut self, n_rows: usize, data: Vec<Vec<f64>>, names: Option<Vec<String>>) -> GeoResult<()> {
        let mut next = Self::default();
        next.add(n_rows, data, names)?;
        *self = next;
        Ok(())
    }

    /// Drops named columns; all names must exist.
    pub(crate) fn delete<S: AsRef<str>>(&mut self, names: &[S]) -> GeoResult<()> {
        for name in names {
            if self.column_position(name.as_ref()).is_none() {
                return Err(IndexError::UnknownLabel {
                    label: name.as_ref().to_string(),
                }
                .into());
            }
        }
        self.columns
            .retain(|c| !names.iter().any(|n| n.as_ref() == c.name));
        Ok(())
    }

    pub(crate) fn set_cell(&mut self, row: usize, column: &str, value: f64) -> GeoResult<()> {
        let position = self.column_position(column).ok_or_else(|| IndexError::UnknownLabel {
            label: column.to_string(),
        })?;
        self.columns[position].values[row] = Some(value);
        Ok(())
    }

    /// Value of `column` at surface position `row`, if set.
    #[must_use]
    pub fn cell(&self, row: usize, column: &str) -> Option<f64> {
        self.column(column).and_then(|c| c.values.get(row).copied().flatten())
    }

    // Row alignment with the surface table.

    pub(crate) fn push_row(&mut self) {
        for column in &mut self.columns {
            column.values.push(None);
        }
    }

    pub(crate) fn retain_rows(&mut self, keep: &[bool]) {
        for column in &mut self.columns {
            let mut flags = keep.iter();
            column.values.retain(|_| flags.next().copied().unwrap_or(false));
        }
    }

    pub(crate) fn permute_rows(&mut self, permutation: &[usize]) {
        for column in &mut self.columns {
            column.values = permutation.iter().map(|&old| column.values[old]).collect();
        }
    }

    pub(crate) fn clear(&mut self) {
        self.columns.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_names_default_columns() {
        let mut values = SurfaceValues::default();
        values.add(4, vec![vec![2.0, 2.0, 2.0, 5.0]], None).unwrap();
        assert_eq!(values.column_names(), vec!["value_0"]);
        values
            .add(
                4,
                vec![vec![2.0, 2.0, 2.0, 6.0], vec![2.0, 2.0, 1.0, 8.0]],
                Some(vec!["val_foo".to_string(), "val2_foo".to_string()]),
            )
            .unwrap();
        assert_eq!(values.column_names(), vec!["value_0", "val_foo", "val2_foo"]);
        assert_eq!(values.cell(3, "val2_foo"), Some(8.0));
    }

    #[test]
    fn add_rejects_wrong_row_count() {
        let mut values = SurfaceValues::default();
        let err = values.add(4, vec![vec![1.0, 2.0]], None).unwrap_err();
        assert!(err.is_validation());
        assert!(values.columns().is_empty());
    }

    #[test]
    fn add_rejects_duplicate_names() {
        let mut values = SurfaceValues::default();
        values.add(1, vec![vec![1.0]], Some(vec!["rho".to_string()])).unwrap();
        assert!(values.add(1, vec![vec![1.0]], Some(vec!["rho".to_string()])).is_err());
        assert!(values
            .add(1, vec![vec![1.0], vec![2.0]], Some(vec!["a".to_string(), "a".to_string()]))
            .is_err());
    }

    #[test]
    fn rows_follow_surface_edits() {
        let mut values = SurfaceValues::default();
        values.add(3, vec![vec![1.0, 2.0, 3.0]], None).unwrap();
        values.push_row();
        values.permute_rows(&[3, 2, 1, 0]);
        assert_eq!(values.column("value_0").unwrap().values, vec![None, Some(3.0), Some(2.0), Some(1.0)]);
        values.retain_rows(&[false, true, true, false]);
        assert_eq!(values.column("value_0").unwrap().values, vec![Some(3.0), Some(2.0)]);
    }

    #[test]
    fn delete_is_all_or_nothing() {
        let mut values = SurfaceValues::default();
        values.add(1, vec![vec![1.0], vec![2.0]], None).unwrap();
        assert!(values.delete(&["value_0", "nope"]).is_err());
        assert_eq!(values.columns().len(), 2);
        values.delete(&["value_0"]).unwrap();
        assert_eq!(values.column_names(), vec!["value_1"]);
    }
}
