//! The annotation record persisted by the store.
//!
//! `image_name`, `attr_name` and `label` are parallel collections: row `i`
//! of `label` belongs to `image_name[i]` and column `j` to `attr_name[j]`.
//! The structural edit methods here always change a name list and the
//! matching matrix axis together.

use std::path::PathBuf;

use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use super::label_group::LabelGroups;
use super::partition::{Partition, Partitions};
use crate::error::StoreError;

/// Description used for datasets created without one.
pub const DEFAULT_DESCRIPTION: &str = "New Dataset";

/// Snapshot of a multi-label attribute dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Free-text dataset label.
    pub description: String,

    /// Ordering hint carried through to the training pipeline.
    #[serde(default)]
    pub reorder: String,

    /// Directory image names are resolved against.
    pub root: PathBuf,

    /// Image names (relative to `root`), one per matrix row.
    pub image_name: Vec<String>,

    /// Attribute names, one per matrix column.
    pub attr_name: Vec<String>,

    /// Binary ground truth, shape `[image_name.len(), attr_name.len()]`.
    pub label: Array2<u8>,

    /// Attribute groupings (column indices).
    #[serde(default)]
    pub label_idx: LabelGroups,

    /// Split membership (row indices).
    #[serde(default)]
    pub partition: Partitions,

    /// Per-attribute positive ratio over the train partition (empty if unset).
    #[serde(default)]
    pub weight_train: Vec<f64>,

    /// Per-attribute positive ratio over the trainval partition (empty if unset).
    #[serde(default)]
    pub weight_trainval: Vec<f64>,
}

impl Annotation {
    /// Create an empty annotation.
    pub fn new(description: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            description: description.into(),
            reorder: String::new(),
            root: root.into(),
            image_name: Vec::new(),
            attr_name: Vec::new(),
            label: Array2::zeros((0, 0)),
            label_idx: LabelGroups::default(),
            partition: Partitions::new(),
            weight_train: Vec::new(),
            weight_trainval: Vec::new(),
        }
    }

    /// Number of images (matrix rows).
    pub fn num_images(&self) -> usize {
        self.image_name.len()
    }

    /// Number of attributes (matrix columns).
    pub fn num_attributes(&self) -> usize {
        self.attr_name.len()
    }

    /// Row index of an image by its normalized name.
    pub fn image_position(&self, name: &str) -> Option<usize> {
        self.image_name.iter().position(|n| n == name)
    }

    /// Column index of an attribute by name.
    pub fn attribute_position(&self, name: &str) -> Option<usize> {
        self.attr_name.iter().position(|n| n == name)
    }

    /// Labels of one image as a vector.
    pub fn row(&self, index: usize) -> Option<Vec<u8>> {
        (index < self.label.nrows()).then(|| self.label.row(index).to_vec())
    }

    /// Check every data-model invariant.
    pub fn validate(&self) -> Result<(), StoreError> {
        let (rows, cols) = self.label.dim();
        if rows != self.image_name.len() {
            return Err(StoreError::dimension_mismatch(format!(
                "label matrix has {} rows but there are {} images",
                rows,
                self.image_name.len()
            )));
        }
        if cols != self.attr_name.len() {
            return Err(StoreError::dimension_mismatch(format!(
                "label matrix has {} columns but there are {} attributes",
                cols,
                self.attr_name.len()
            )));
        }

        if let Some(name) = first_duplicate(&self.image_name) {
            return Err(StoreError::validation(format!(
                "image '{}' is listed more than once",
                name
            )));
        }
        if let Some(name) = first_duplicate(&self.attr_name) {
            return Err(StoreError::validation(format!(
                "attribute '{}' is listed more than once",
                name
            )));
        }

        if let Some(value) = self.label.iter().find(|&&v| v > 1) {
            return Err(StoreError::validation(format!(
                "label matrix contains non-binary value {}",
                value
            )));
        }

        if let Some((partition, index)) = self.partition.first_out_of_bounds(rows) {
            return Err(StoreError::validation(format!(
                "partition '{}' references image {} but there are {} images",
                partition, index, rows
            )));
        }
        if let Some((group, index)) = self.label_idx.first_out_of_bounds(cols) {
            return Err(StoreError::validation(format!(
                "label group '{}' references attribute {} but there are {} attributes",
                group, index, cols
            )));
        }

        for (name, weights) in [
            ("weight_train", &self.weight_train),
            ("weight_trainval", &self.weight_trainval),
        ] {
            if !weights.is_empty() && weights.len() != cols {
                return Err(StoreError::dimension_mismatch(format!(
                    "{} has {} entries but there are {} attributes",
                    name,
                    weights.len(),
                    cols
                )));
            }
        }

        Ok(())
    }

    /// Append an attribute column filled with `default_value`.
    pub(crate) fn push_attribute(&mut self, name: String, default_value: u8) -> usize {
        let (rows, cols) = self.label.dim();
        let old = &self.label;
        self.label = Array2::from_shape_fn((rows, cols + 1), |(r, c)| {
            if c < cols { old[[r, c]] } else { default_value }
        });
        self.attr_name.push(name);

        let column = cols;
        if !self.weight_train.is_empty() {
            let ratio = self.column_ratio(column, Partition::Train);
            self.weight_train.push(ratio);
        }
        if !self.weight_trainval.is_empty() {
            let ratio = self.column_ratio(column, Partition::Trainval);
            self.weight_trainval.push(ratio);
        }
        column
    }

    /// Remove an attribute and its column. `index` must be in range.
    pub(crate) fn remove_attribute(&mut self, index: usize) {
        let keep: Vec<usize> = (0..self.label.ncols()).filter(|&c| c != index).collect();
        self.label = self.label.select(Axis(1), &keep);
        self.attr_name.remove(index);
        self.label_idx.remove_and_shift(index);
        if index < self.weight_train.len() {
            self.weight_train.remove(index);
        }
        if index < self.weight_trainval.len() {
            self.weight_trainval.remove(index);
        }
    }

    /// Append an image row. `row` must have one value per attribute.
    pub(crate) fn push_image(&mut self, name: String, row: &[u8]) -> usize {
        let (rows, cols) = self.label.dim();
        let old = &self.label;
        self.label = Array2::from_shape_fn((rows + 1, cols), |(r, c)| {
            if r < rows { old[[r, c]] } else { row[c] }
        });
        self.image_name.push(name);
        rows
    }

    /// Remove an image row and renumber the partitions. `index` must be in range.
    pub(crate) fn remove_image(&mut self, index: usize) {
        let keep: Vec<usize> = (0..self.label.nrows()).filter(|&r| r != index).collect();
        self.label = self.label.select(Axis(0), &keep);
        self.image_name.remove(index);
        self.partition.remove_and_shift(index);
    }

    /// Replace the labels of one image. `row` must have one value per attribute.
    pub(crate) fn set_row(&mut self, index: usize, row: &[u8]) {
        self.label.row_mut(index).assign(&ArrayView1::from(row));
    }

    /// Reset the labels of one image to zero.
    pub(crate) fn clear_row(&mut self, index: usize) {
        self.label.row_mut(index).fill(0);
    }

    /// Number of positive labels per attribute.
    pub fn label_counts(&self) -> Vec<usize> {
        self.label
            .columns()
            .into_iter()
            .map(|column| column.iter().filter(|&&v| v != 0).count())
            .collect()
    }

    /// Fraction of rows in `partition` that carry each attribute.
    ///
    /// An empty partition yields all zeros.
    pub fn positive_ratios(&self, partition: Partition) -> Vec<f64> {
        (0..self.num_attributes())
            .map(|column| self.column_ratio(column, partition))
            .collect()
    }

    /// Recompute both weight vectors from the current labels and partitions.
    pub(crate) fn recompute_weights(&mut self) {
        self.weight_train = self.positive_ratios(Partition::Train);
        self.weight_trainval = self.positive_ratios(Partition::Trainval);
    }

    fn column_ratio(&self, column: usize, partition: Partition) -> f64 {
        let rows = self.partition.get(partition);
        if rows.is_empty() {
            return 0.0;
        }
        let positives = rows
            .iter()
            .filter(|&&r| self.label[[r, column]] != 0)
            .count();
        positives as f64 / rows.len() as f64
    }
}

impl Default for Annotation {
    fn default() -> Self {
        Self::new(DEFAULT_DESCRIPTION, PathBuf::new())
    }
}

/// Reject label vectors containing anything other than 0 or 1.
pub fn check_binary(values: &[u8]) -> Result<(), StoreError> {
    match values.iter().position(|&v| v > 1) {
        Some(pos) => Err(StoreError::validation(format!(
            "label value {} at position {} is not binary",
            values[pos], pos
        ))),
        None => Ok(()),
    }
}

fn first_duplicate(names: &[String]) -> Option<&str> {
    let mut seen = std::collections::HashSet::with_capacity(names.len());
    names
        .iter()
        .find(|name| !seen.insert(name.as_str()))
        .map(String::as_str)
}
