//! Dataset split membership.
//!
//! A partition is a named list of row indices into `image_name`. The four
//! partitions used by the training pipeline are fixed, so they are modelled
//! as named fields rather than a string-keyed map.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::indices;

/// A dataset split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    /// Training split
    Train,
    /// Validation split
    Val,
    /// Test split
    Test,
    /// Union of training and validation used for final training runs
    Trainval,
}

impl Partition {
    /// Get the serialized name of this partition.
    pub fn name(&self) -> &'static str {
        match self {
            Partition::Train => "train",
            Partition::Val => "val",
            Partition::Test => "test",
            Partition::Trainval => "trainval",
        }
    }

    /// Get all partitions in snapshot order.
    pub fn all() -> &'static [Partition] {
        &[
            Partition::Train,
            Partition::Val,
            Partition::Test,
            Partition::Trainval,
        ]
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Partition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Partition::all()
            .iter()
            .copied()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown partition '{}'", s))
    }
}

/// Row-index lists for every partition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partitions {
    #[serde(default)]
    pub train: Vec<usize>,
    #[serde(default)]
    pub val: Vec<usize>,
    #[serde(default)]
    pub test: Vec<usize>,
    #[serde(default)]
    pub trainval: Vec<usize>,
}

impl Partitions {
    /// Create empty partitions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Contiguous split of `total` rows: the first `train` rows, then `val`
    /// rows, the rest in test. Trainval is train followed by val.
    pub fn contiguous(total: usize, train: usize, val: usize) -> Self {
        let train_end = train.min(total);
        let val_end = (train_end + val).min(total);
        Self {
            train: (0..train_end).collect(),
            val: (train_end..val_end).collect(),
            test: (val_end..total).collect(),
            trainval: (0..val_end).collect(),
        }
    }

    /// Get the row indices of one partition.
    pub fn get(&self, partition: Partition) -> &[usize] {
        match partition {
            Partition::Train => &self.train,
            Partition::Val => &self.val,
            Partition::Test => &self.test,
            Partition::Trainval => &self.trainval,
        }
    }

    fn get_mut(&mut self, partition: Partition) -> &mut Vec<usize> {
        match partition {
            Partition::Train => &mut self.train,
            Partition::Val => &mut self.val,
            Partition::Test => &mut self.test,
            Partition::Trainval => &mut self.trainval,
        }
    }

    /// Add a row to a partition. Returns `false` if it was already a member.
    pub fn insert(&mut self, partition: Partition, row: usize) -> bool {
        indices::insert_sorted(self.get_mut(partition), row)
    }

    /// Remove a row from a partition without renumbering the others.
    pub fn remove(&mut self, partition: Partition, row: usize) -> bool {
        indices::remove_value(self.get_mut(partition), row)
    }

    /// Check whether a row belongs to a partition.
    pub fn contains(&self, partition: Partition, row: usize) -> bool {
        self.get(partition).contains(&row)
    }

    /// All partitions the given row belongs to.
    pub fn memberships(&self, row: usize) -> Vec<Partition> {
        Partition::all()
            .iter()
            .copied()
            .filter(|&p| self.contains(p, row))
            .collect()
    }

    /// Drop a deleted row from every partition and shift higher rows down.
    ///
    /// This is the only place partitions are renumbered; it runs after the
    /// row has been removed from `image_name` and the label matrix.
    pub fn remove_and_shift(&mut self, removed: usize) {
        for &partition in Partition::all() {
            indices::remove_and_shift(self.get_mut(partition), removed);
        }
    }

    /// First partition holding an index not below `rows`, with that index.
    pub fn first_out_of_bounds(&self, rows: usize) -> Option<(Partition, usize)> {
        Partition::all().iter().find_map(|&p| {
            indices::first_out_of_bounds(self.get(p), rows).map(|index| (p, index))
        })
    }
}
