//! Image I/O used by the store.
//!
//! The store only needs three things from image files: whether they exist,
//! their pixel dimensions, and their raw bytes. These are behind the
//! `ImageSource` trait so hosts can supply their own implementation (an
//! in-memory cache, a remote bucket, a test double).
//!
//! ## Usage
//!
//! ```rust,ignore
//! use attrstore::image_io::{FsImageSource, ImageSource};
//!
//! let source = FsImageSource;
//! let (width, height) = source.dimensions(path)?;
//! ```

use std::path::{Path, PathBuf};

/// Error type for image source operations.
#[derive(Debug)]
pub struct ImageSourceError {
    /// Human-readable error message.
    pub message: String,
    /// The file that produced this error (if known).
    pub path: Option<PathBuf>,
}

impl ImageSourceError {
    /// Create a new image source error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
        }
    }

    /// Attach the offending path.
    pub fn with_path(mut self, path: &Path) -> Self {
        self.path = Some(path.to_path_buf());
        self
    }
}

impl std::fmt::Display for ImageSourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "[{}] {}", path.display(), self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ImageSourceError {}

/// Access to image files referenced by a dataset.
pub trait ImageSource: Send + Sync {
    /// Check if an image exists at the resolved path.
    fn exists(&self, path: &Path) -> bool;

    /// Read the pixel dimensions as `(width, height)`.
    ///
    /// Only called when the store is configured to check image size.
    fn dimensions(&self, path: &Path) -> Result<(u32, u32), ImageSourceError>;

    /// Read the raw encoded bytes of an image.
    fn read(&self, path: &Path) -> Result<Vec<u8>, ImageSourceError>;
}

/// Image source backed by the local filesystem.
///
/// Dimensions are read from the image header via the `image` crate without
/// decoding pixel data.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsImageSource;

impl ImageSource for FsImageSource {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn dimensions(&self, path: &Path) -> Result<(u32, u32), ImageSourceError> {
        image::image_dimensions(path).map_err(|e| {
            ImageSourceError::new(format!("Failed to read image header: {}", e)).with_path(path)
        })
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, ImageSourceError> {
        std::fs::read(path).map_err(|e| {
            ImageSourceError::new(format!("Failed to read image: {}", e)).with_path(path)
        })
    }
}
