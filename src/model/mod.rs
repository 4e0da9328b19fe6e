//! Data model for the attribute annotation dataset.

mod annotation;
pub mod indices;
mod label_group;
mod partition;

pub use annotation::{Annotation, DEFAULT_DESCRIPTION, check_binary};
pub use label_group::{LabelGroup, LabelGroups};
pub use partition::{Partition, Partitions};
