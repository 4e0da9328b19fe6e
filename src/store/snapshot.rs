//! Snapshot persistence.
//!
//! A snapshot is a JSON document wrapping the [`Annotation`] with a format
//! version:
//!
//! ```json
//! {
//!   "version": "0.1.0",
//!   "annotation": {
//!     "description": "New Dataset",
//!     "root": "images",
//!     "image_name": ["a.png"],
//!     "attr_name": ["Hat"],
//!     "label": { "v": 1, "dim": [1, 1], "data": [0] },
//!     "partition": { "train": [0], "val": [], "test": [], "trainval": [0] },
//!     ...
//!   }
//! }
//! ```
//!
//! # Versioning
//!
//! Version 0.x.x is unstable: files are readable across any 0.x version but a
//! minor-version difference is reported as a warning.
//!
//! # Atomic writes
//!
//! Writes go to `<snapshot>.tmp`, are synced, then renamed over the snapshot,
//! so an interrupted save never leaves a truncated snapshot behind.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::model::Annotation;

/// Current snapshot format version.
pub const CURRENT_VERSION: &str = "0.1.0";

/// Major version number for compatibility checking.
const VERSION_MAJOR: u32 = 0;

/// Minor version number.
const VERSION_MINOR: u32 = 1;

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: &'a str,
    annotation: &'a Annotation,
}

#[derive(Deserialize)]
struct SnapshotOwned {
    version: String,
    annotation: Annotation,
}

/// Parse a version string into (major, minor, patch) components.
///
/// Returns None if the version string is invalid.
pub fn parse_version(version: &str) -> Option<(u32, u32, u32)> {
    let parts: Vec<&str> = version.split('.').collect();
    if parts.len() != 3 {
        return None;
    }
    let major = parts[0].parse().ok()?;
    let minor = parts[1].parse().ok()?;
    let patch = parts[2].parse().ok()?;
    Some((major, minor, patch))
}

/// Check if a snapshot version can be read at all.
pub fn is_version_readable(version: &str) -> bool {
    matches!(parse_version(version), Some((major, _, _)) if major == VERSION_MAJOR)
}

/// Check if a snapshot version matches the current format exactly enough to
/// load without warnings.
pub fn is_version_compatible(version: &str) -> bool {
    matches!(
        parse_version(version),
        Some((major, minor, _)) if major == VERSION_MAJOR && minor == VERSION_MINOR
    )
}

/// Path of the temporary file used while writing `path`.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut tmp = OsString::from(path.as_os_str());
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Encode an annotation into snapshot bytes.
pub fn to_bytes(annotation: &Annotation) -> Result<Vec<u8>, StoreError> {
    let doc = SnapshotRef {
        version: CURRENT_VERSION,
        annotation,
    };
    Ok(serde_json::to_vec_pretty(&doc)?)
}

/// Decode snapshot bytes.
///
/// Decoding failures, unreadable versions and invariant violations are all
/// reported as [`StoreError::CorruptSnapshot`]. Returns the annotation and
/// the version string found in the file.
pub fn from_bytes(path: &Path, bytes: &[u8]) -> Result<(Annotation, String), StoreError> {
    let doc: SnapshotOwned =
        serde_json::from_slice(bytes).map_err(|e| StoreError::corrupt(path, e))?;

    if !is_version_readable(&doc.version) {
        return Err(StoreError::corrupt(
            path,
            format!(
                "unsupported snapshot version {} (expected {})",
                doc.version, CURRENT_VERSION
            ),
        ));
    }

    doc.annotation
        .validate()
        .map_err(|e| StoreError::corrupt(path, e))?;

    Ok((doc.annotation, doc.version))
}

/// Read and decode the snapshot at `path`.
pub fn read(path: &Path) -> Result<(Annotation, String), StoreError> {
    let bytes = fs::read(path)?;
    from_bytes(path, &bytes)
}

/// Write the snapshot atomically, creating parent directories if necessary.
pub fn write(path: &Path, annotation: &Annotation) -> Result<(), StoreError> {
    let bytes = to_bytes(annotation)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = temp_path_for(path);
    let written = File::create(&tmp_path).and_then(|mut file| {
        file.write_all(&bytes)?;
        file.sync_all()
    });
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    Ok(())
}
