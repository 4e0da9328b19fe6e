//! Image name normalization.
//!
//! Image names are stored relative to the dataset root with `/` separators.
//! Inputs that point at the same file under the root (`./a/x.png`,
//! `a/../a/x.png`, `<root>/a/x.png`, `<root>/../<root>/a/x.png`) normalize to
//! the same name, which is what duplicate detection and lookups compare.
//! Normalization is lexical: `..` cancels the preceding component and
//! symlinks are not followed.

use std::path::{Component, Path, PathBuf};

/// Collapse `.` and `..` components without touching the filesystem.
///
/// A `..` cancels the preceding normal component. Leading `..` of a
/// relative path are kept; `..` directly after the root is dropped.
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }
    parts.iter().collect()
}

/// Join the components of a normalized relative path with `/`.
fn to_name(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Normalize a caller-supplied path or file name against `root`.
///
/// Paths that lie under `root` (given relative to it, or spelled with the
/// root prefix) become root-relative names with `/` separators. Paths that
/// leave the root are kept: absolute ones as given after collapsing, relative
/// ones with their leading `..`.
pub fn normalize_image_name(root: &Path, input: &str) -> String {
    let path = lexical_normalize(Path::new(input));
    let root = lexical_normalize(root);

    if !root.as_os_str().is_empty() {
        if let Ok(relative) = path.strip_prefix(&root) {
            return to_name(relative);
        }
        if path.is_relative() {
            let joined = lexical_normalize(&root.join(&path));
            if let Ok(relative) = joined.strip_prefix(&root) {
                return to_name(relative);
            }
        }
    }

    if path.has_root() {
        return path.to_string_lossy().into_owned();
    }
    to_name(&path)
}

/// Resolve a stored image name to a filesystem path.
pub fn resolve(root: &Path, name: &str) -> PathBuf {
    root.join(name)
}

/// Lowercase extension of an image name, if any.
pub fn extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}
