//! Persisted annotation store.
//!
//! [`AnnotationStore`] is the only component that mutates an [`Annotation`].
//! It validates every request, keeps the image/attribute name lists aligned
//! with the label matrix, and writes a snapshot after each successful
//! mutation.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use attrstore::{AnnotationStore, StoreConfig};
//!
//! let mut store = AnnotationStore::open("dataset.json", StoreConfig::new().with_root("images"))?;
//! let hat = store.add_label("Hat")?;
//! let row = store.add_image("person_001.png")?;
//! store.set_image_label(row, hat, 1)?;
//! ```
//!
//! [`Annotation`]: crate::model::Annotation

mod batch;
mod dataset;
mod export;
mod logger;
mod paths;
pub mod snapshot;

#[cfg(test)]
mod tests;

pub use batch::{BatchCursor, BatchSize, ImageBatch};
pub use dataset::{AnnotationStore, corrupt_path_for};
pub use logger::StoreLogger;
pub use paths::normalize_image_name;
