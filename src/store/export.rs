//! Training-pipeline exports.
//!
//! The label matrix is written as a NumPy `.npy` array of `u8` so training
//! code can load it directly, and the partition lists as a small JSON file.

use std::fs;
use std::path::Path;

use ndarray_npy::WriteNpyExt;
use serde::Serialize;

use crate::error::StoreError;
use crate::model::{Annotation, Partitions};

#[derive(Serialize)]
struct PartitionExport<'a> {
    image_name: &'a [String],
    attr_name: &'a [String],
    partition: &'a Partitions,
}

fn create_parent(path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Write the label matrix to a `.npy` file.
pub fn write_labels_npy(annotation: &Annotation, path: &Path) -> Result<(), StoreError> {
    create_parent(path)?;
    let file = fs::File::create(path)?;
    annotation.label.write_npy(file)?;
    Ok(())
}

/// Write image names, attribute names and partitions to a JSON file.
pub fn write_partitions_json(annotation: &Annotation, path: &Path) -> Result<(), StoreError> {
    create_parent(path)?;
    let export = PartitionExport {
        image_name: &annotation.image_name,
        attr_name: &annotation.attr_name,
        partition: &annotation.partition,
    };
    fs::write(path, serde_json::to_string_pretty(&export)?)?;
    Ok(())
}
