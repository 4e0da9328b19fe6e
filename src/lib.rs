//! attrstore - Attribute Annotation Dataset Store
//!
//! Persisted store for multi-label binary attribute datasets: image names,
//! attribute names, the binary label matrix relating them, and the
//! train/val/test/trainval partitions used for model training.

pub mod config;
mod error;
pub mod image_io;
pub mod model;
pub mod store;

pub use config::{ConfigError, LogLevel, SplitRatios, StoreConfig};
pub use error::StoreError;
pub use image_io::{FsImageSource, ImageSource, ImageSourceError};
pub use model::{Annotation, LabelGroup, Partition};
pub use store::{AnnotationStore, BatchCursor, BatchSize, ImageBatch};
