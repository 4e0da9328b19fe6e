//! Attribute groupings consumed by the training pipeline.
//!
//! Groups hold column indices into `attr_name`: `eval` lists the attributes
//! scored during evaluation, `color` the colour attributes and `extra` the
//! remaining auxiliary ones.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::indices;

/// A named attribute group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelGroup {
    Eval,
    Color,
    Extra,
}

impl LabelGroup {
    /// Get the serialized name of this group.
    pub fn name(&self) -> &'static str {
        match self {
            LabelGroup::Eval => "eval",
            LabelGroup::Color => "color",
            LabelGroup::Extra => "extra",
        }
    }

    /// Get all groups.
    pub fn all() -> &'static [LabelGroup] {
        &[LabelGroup::Eval, LabelGroup::Color, LabelGroup::Extra]
    }
}

impl fmt::Display for LabelGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LabelGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LabelGroup::all()
            .iter()
            .copied()
            .find(|g| g.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown label group '{}'", s))
    }
}

/// Column-index lists for every label group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelGroups {
    #[serde(default)]
    pub eval: Vec<usize>,
    #[serde(default)]
    pub color: Vec<usize>,
    #[serde(default)]
    pub extra: Vec<usize>,
}

impl LabelGroups {
    /// Get the column indices of one group.
    pub fn get(&self, group: LabelGroup) -> &[usize] {
        match group {
            LabelGroup::Eval => &self.eval,
            LabelGroup::Color => &self.color,
            LabelGroup::Extra => &self.extra,
        }
    }

    /// Replace the column indices of one group.
    pub fn set(&mut self, group: LabelGroup, mut columns: Vec<usize>) {
        columns.sort_unstable();
        columns.dedup();
        match group {
            LabelGroup::Eval => self.eval = columns,
            LabelGroup::Color => self.color = columns,
            LabelGroup::Extra => self.extra = columns,
        }
    }

    /// Drop a deleted column from every group and shift higher columns down.
    pub fn remove_and_shift(&mut self, removed: usize) {
        indices::remove_and_shift(&mut self.eval, removed);
        indices::remove_and_shift(&mut self.color, removed);
        indices::remove_and_shift(&mut self.extra, removed);
    }

    /// First group holding an index not below `columns`, with that index.
    pub fn first_out_of_bounds(&self, columns: usize) -> Option<(LabelGroup, usize)> {
        LabelGroup::all().iter().find_map(|&g| {
            indices::first_out_of_bounds(self.get(g), columns).map(|index| (g, index))
        })
    }
}
