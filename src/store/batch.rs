//! Paginated access to image names.
//!
//! Pagination state lives with the caller: each call takes a [`BatchCursor`]
//! and returns the cursor for the next page, so the store itself stays
//! read-only and repeated or interleaved paging is safe.

use crate::error::StoreError;

/// Position of the next page within `image_name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchCursor(usize);

impl BatchCursor {
    /// Cursor at the first image.
    pub fn start() -> Self {
        Self(0)
    }

    /// Cursor at an arbitrary offset.
    pub fn at(offset: usize) -> Self {
        Self(offset)
    }

    /// Offset of the first image of the page.
    pub fn offset(&self) -> usize {
        self.0
    }
}

/// Number of names returned per page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchSize {
    /// Everything from the cursor to the end
    All,
    /// At most this many names (must be positive)
    Limit(usize),
}

impl BatchSize {
    /// Convert the signed convention where `-1` means "all".
    pub fn from_signed(size: i64) -> Result<Self, StoreError> {
        match size {
            -1 => Ok(BatchSize::All),
            n if n > 0 => Ok(BatchSize::Limit(n as usize)),
            n => Err(StoreError::validation(format!(
                "batch size must be positive or -1, got {}",
                n
            ))),
        }
    }
}

/// One page of image names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBatch<'a> {
    /// Image names in dataset order.
    pub names: &'a [String],
    /// Cursor for the following page, `None` when this page reached the end.
    pub next: Option<BatchCursor>,
}

/// Slice one page out of `names`.
pub fn page(
    names: &[String],
    cursor: BatchCursor,
    size: BatchSize,
) -> Result<ImageBatch<'_>, StoreError> {
    let start = cursor.offset().min(names.len());
    let end = match size {
        BatchSize::All => names.len(),
        BatchSize::Limit(0) => {
            return Err(StoreError::validation("batch size must be positive"));
        }
        BatchSize::Limit(n) => start.saturating_add(n).min(names.len()),
    };

    let next = (end < names.len()).then_some(BatchCursor(end));
    Ok(ImageBatch {
        names: &names[start..end],
        next,
    })
}
