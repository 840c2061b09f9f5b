//! Ordered, unique label index.
//!
//! `CategoricalIndex` is the foreign-key target used across the model: series
//! names are one, surface names another. Order is significant and defines
//! iteration and computation order.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::IndexError;

/// An ordered sequence of unique string labels.
///
/// # Examples
///
/// ```
/// use stratigraph::CategoricalIndex;
///
/// let mut index = CategoricalIndex::from_labels(["a", "b"]).unwrap();
/// index.insert("c").unwrap();
/// assert_eq!(index.labels(), ["a", "b", "c"]);
/// assert_eq!(index.position("b"), Some(1));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct CategoricalIndex {
    labels: Vec<String>,
    #[serde(skip)]
    positions: HashMap<String, usize>,
}

impl CategoricalIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an index from an initial label set.
    ///
    /// # Errors
    /// Returns `DuplicateLabel` if a label occurs twice.
    pub fn from_labels<I, S>(labels: I) -> Result<Self, IndexError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut index = Self::new();
        for label in labels {
            index.insert(label)?;
        }
        Ok(index)
    }

    /// Number of labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns true if the index holds no labels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels in order.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Iterates labels in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    /// Zero-based position of `label`.
    #[must_use]
    pub fn position(&self, label: &str) -> Option<usize> {
        self.positions.get(label).copied()
    }

    /// True if `label` is in the index.
    #[must_use]
    pub fn contains(&self, label: &str) -> bool {
        self.positions.contains_key(label)
    }

    /// Label at `position`.
    #[must_use]
    pub fn get(&self, position: usize) -> Option<&str> {
        self.labels.get(position).map(String::as_str)
    }

    /// Appends `label` at the end.
    ///
    /// # Errors
    /// Returns `DuplicateLabel` if the label already exists.
    pub fn insert(&mut self, label: impl Into<String>) -> Result<usize, IndexError> {
        let label = label.into();
        if self.positions.contains_key(&label) {
            return Err(IndexError::DuplicateLabel { label });
        }
        let position = self.labels.len();
        self.positions.insert(label.clone(), position);
        self.labels.push(label);
        Ok(position)
    }

    /// Removes `label`, shifting subsequent labels down by one.
    ///
    /// Returns the position the label occupied.
    ///
    /// # Errors
    /// Returns `UnknownLabel` if the label is absent.
    pub fn delete(&mut self, label: &str) -> Result<usize, IndexError> {
        let position = self.position(label).ok_or_else(|| IndexError::UnknownLabel {
            label: label.to_string(),
        })?;
        self.labels.remove(position);
        self.rebuild_positions();
        Ok(position)
    }

    /// Renames labels in place according to `mapping` (old -> new).
    ///
    /// The rename is all-or-nothing: on error the index is unchanged. Labels
    /// may swap names (`a -> b`, `b -> a`) since the collision check only
    /// considers labels that are not themselves renamed.
    ///
    /// # Errors
    /// - `UnknownLabel` if an old label is missing.
    /// - `DuplicateLabel` if a new label collides with a label that is kept,
    ///   or two old labels map to the same new label.
    pub fn rename<K, V>(&mut self, mapping: &[(K, V)]) -> Result<(), IndexError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut renames: HashMap<&str, &str> = HashMap::with_capacity(mapping.len());
        for (old, new) in mapping {
            let (old, new) = (old.as_ref(), new.as_ref());
            if !self.contains(old) {
                return Err(IndexError::UnknownLabel {
                    label: old.to_string(),
                });
            }
            if renames.insert(old, new).is_some_and(|prev| prev != new) {
                return Err(IndexError::DuplicateLabel {
                    label: old.to_string(),
                });
            }
        }

        let mut seen: HashSet<&str> = HashSet::with_capacity(self.labels.len());
        for label in &self.labels {
            let target = renames.get(label.as_str()).copied().unwrap_or(label.as_str());
            if !seen.insert(target) {
                return Err(IndexError::DuplicateLabel {
                    label: target.to_string(),
                });
            }
        }

        let renamed: Vec<String> = self
            .labels
            .iter()
            .map(|label| {
                renames
                    .get(label.as_str())
                    .map_or_else(|| label.clone(), |new| (*new).to_string())
            })
            .collect();
        self.labels = renamed;
        self.rebuild_positions();
        Ok(())
    }

    /// Reorders the index to `new_order`, which must be a permutation of the
    /// current label set.
    ///
    /// Returns the permutation as old positions listed in new order, so that
    /// positional collaborators can be permuted identically.
    ///
    /// # Errors
    /// Returns `InvalidPermutation` on a label set mismatch.
    pub fn reorder<S: AsRef<str>>(&mut self, new_order: &[S]) -> Result<Vec<usize>, IndexError> {
        let permutation = self.permutation_for(new_order)?;
        self.labels = new_order.iter().map(|s| s.as_ref().to_string()).collect();
        self.rebuild_positions();
        Ok(permutation)
    }

    /// Computes the permutation `reorder` would apply, without applying it.
    ///
    /// # Errors
    /// Returns `InvalidPermutation` on a label set mismatch.
    pub fn permutation_for<S: AsRef<str>>(&self, new_order: &[S]) -> Result<Vec<usize>, IndexError> {
        let invalid = |reason: String| IndexError::InvalidPermutation {
            expected: self.labels.len(),
            actual: new_order.len(),
            reason,
        };
        if new_order.len() != self.labels.len() {
            return Err(invalid("label count differs".to_string()));
        }

        let mut seen = vec![false; self.labels.len()];
        let mut permutation = Vec::with_capacity(new_order.len());
        for label in new_order {
            let label = label.as_ref();
            let Some(old) = self.position(label) else {
                return Err(invalid(format!("unknown label '{label}'")));
            };
            if std::mem::replace(&mut seen[old], true) {
                return Err(invalid(format!("label '{label}' repeated")));
            }
            permutation.push(old);
        }
        Ok(permutation)
    }

    fn rebuild_positions(&mut self) {
        self.positions = self
            .labels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.clone(), i))
            .collect();
    }
}

impl TryFrom<Vec<String>> for CategoricalIndex {
    type Error = IndexError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::from_labels(value)
    }
}

impl From<CategoricalIndex> for Vec<String> {
    fn from(value: CategoricalIndex) -> Self {
        value.labels
    }
}

impl fmt::Display for CategoricalIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.labels.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abcd() -> CategoricalIndex {
        CategoricalIndex::from_labels(["a", "b", "c", "d"]).unwrap()
    }

    #[test]
    fn insert_appends_and_rejects_duplicates() {
        let mut index = abcd();
        assert_eq!(index.insert("e").unwrap(), 4);
        assert_eq!(
            index.insert("a"),
            Err(IndexError::DuplicateLabel {
                label: "a".to_string()
            })
        );
        assert_eq!(index.len(), 5);
    }

    #[test]
    fn delete_shifts_positions() {
        let mut index = abcd();
        assert_eq!(index.delete("b").unwrap(), 1);
        assert_eq!(index.labels(), ["a", "c", "d"]);
        assert_eq!(index.position("d"), Some(2));
        assert!(matches!(index.delete("b"), Err(IndexError::UnknownLabel { .. })));
    }

    #[test]
    fn rename_is_atomic() {
        let mut index = abcd();
        let before = index.clone();
        let err = index.rename(&[("a", "z"), ("missing", "y")]).unwrap_err();
        assert!(matches!(err, IndexError::UnknownLabel { .. }));
        assert_eq!(index, before);

        let err = index.rename(&[("a", "b")]).unwrap_err();
        assert!(matches!(err, IndexError::DuplicateLabel { .. }));
        assert_eq!(index, before);
    }

    #[test]
    fn rename_allows_swaps() {
        let mut index = abcd();
        index.rename(&[("a", "b"), ("b", "a")]).unwrap();
        assert_eq!(index.labels(), ["b", "a", "c", "d"]);
        assert_eq!(index.position("a"), Some(1));
    }

    #[test]
    fn rename_rejects_two_labels_collapsing() {
        let mut index = abcd();
        let err = index.rename(&[("a", "x"), ("b", "x")]).unwrap_err();
        assert!(matches!(err, IndexError::DuplicateLabel { label } if label == "x"));
    }

    #[test]
    fn reorder_returns_permutation() {
        let mut index = abcd();
        let perm = index.reorder(&["c", "a", "d", "b"]).unwrap();
        assert_eq!(perm, vec![2, 0, 3, 1]);
        assert_eq!(index.position("b"), Some(3));
    }

    #[test]
    fn reorder_rejects_mismatched_sets() {
        let mut index = abcd();
        assert!(index.reorder(&["a", "b", "c"]).is_err());
        assert!(index.reorder(&["a", "b", "c", "c"]).is_err());
        assert!(index.reorder(&["a", "b", "c", "x"]).is_err());
        assert_eq!(index, abcd());
    }

    #[test]
    fn serde_roundtrip_rebuilds_positions() {
        let index = abcd();
        let json = serde_json::to_string(&index).unwrap();
        assert_eq!(json, r#"["a","b","c","d"]"#);
        let decoded: CategoricalIndex = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.position("c"), Some(2));
        assert!(serde_json::from_str::<CategoricalIndex>(r#"["a","a"]"#).is_err());
    }
}
