//! Error types for annotation store operations.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;
use crate::image_io::ImageSourceError;

/// Errors that can occur while opening, querying or mutating a store.
///
/// Every fallible store operation returns this type. Validation errors are
/// always reported before any state is touched.
#[derive(Error, Debug)]
pub enum StoreError {
    /// An image or attribute index does not exist
    #[error("{kind} index {index} out of range (len {len})")]
    IndexOutOfRange {
        /// What the index refers to ("image" or "label")
        kind: &'static str,
        /// The offending index
        index: usize,
        /// Length of the indexed collection
        len: usize,
    },

    /// A referenced image or file does not exist
    #[error("Not found: {what}")]
    NotFound {
        /// Description of what was looked up
        what: String,
    },

    /// An attribute with this name already exists
    #[error("Label '{name}' already exists in the dataset")]
    DuplicateLabel {
        /// The duplicated attribute name
        name: String,
    },

    /// An image with this normalized name already exists
    #[error("Image '{name}' is already in the dataset")]
    DuplicateImage {
        /// The normalized image name
        name: String,
    },

    /// A label vector does not have one entry per attribute
    #[error("Label vector has {found} entries but the dataset has {expected} attributes")]
    LabelCountMismatch {
        /// Number of attributes in the dataset
        expected: usize,
        /// Length of the supplied vector
        found: usize,
    },

    /// Input rejected by a format, extension, dimension or value check
    #[error("Validation failed: {message}")]
    Validation {
        /// Description of the failed check
        message: String,
    },

    /// The label matrix and the name lists disagree
    #[error("Dimension mismatch: {message}")]
    DimensionMismatch {
        /// Description of the mismatch
        message: String,
    },

    /// The snapshot file could not be decoded or violates the data model
    #[error("Corrupt snapshot {path:?}: {message}")]
    CorruptSnapshot {
        /// Snapshot location
        path: PathBuf,
        /// Decoder or validation message
        message: String,
    },

    /// An import failed after its file was moved into the root, and the file
    /// could not be moved back
    #[error("Import failed ({cause}) and {path:?} could not be moved back: {undo}")]
    ImportRollback {
        /// Where the file was left
        path: PathBuf,
        /// Why the import failed
        cause: Box<StoreError>,
        /// Why the file could not be moved back
        undo: std::io::Error,
    },

    /// Filesystem failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot serialization failure
    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid store configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Image collaborator failure
    #[error("Image error: {0}")]
    Image(#[from] ImageSourceError),

    /// NumPy export failure
    #[error("NPY export error: {0}")]
    Npy(#[from] ndarray_npy::WriteNpyError),
}

impl StoreError {
    /// Create an image index error.
    pub fn image_index(index: usize, len: usize) -> Self {
        Self::IndexOutOfRange {
            kind: "image",
            index,
            len,
        }
    }

    /// Create an attribute index error.
    pub fn label_index(index: usize, len: usize) -> Self {
        Self::IndexOutOfRange {
            kind: "label",
            index,
            len,
        }
    }

    /// Create a not-found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a dimension mismatch error.
    pub fn dimension_mismatch(message: impl Into<String>) -> Self {
        Self::DimensionMismatch {
            message: message.into(),
        }
    }

    /// Create a corrupt snapshot error.
    pub fn corrupt(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::CorruptSnapshot {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
