//! Tests for the annotation store.
//!
//! Each test opens a store inside its own temporary directory with the image
//! root at `<tmp>/images` and the snapshot at `<tmp>/snapshot.json`.

mod label_tests;
mod partition_tests;

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::config::StoreConfig;
use crate::store::AnnotationStore;

struct Fixture {
    dir: TempDir,
    store: AnnotationStore,
}

impl Fixture {
    fn root(&self) -> PathBuf {
        self.dir.path().join("images")
    }

    fn snapshot(&self) -> PathBuf {
        self.dir.path().join("snapshot.json")
    }

    fn config(&self) -> StoreConfig {
        StoreConfig::new().with_root(self.root())
    }

    /// Create an empty file under the image root.
    fn touch(&self, name: &str) {
        touch(&self.root(), name);
    }

    /// Open a second store on the same snapshot.
    fn reopen(&self) -> AnnotationStore {
        AnnotationStore::open(self.snapshot(), self.config()).expect("reopen failed")
    }
}

fn fixture() -> Fixture {
    fixture_with(StoreConfig::new())
}

fn fixture_with(config: StoreConfig) -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config.with_root(dir.path().join("images"));
    let store = AnnotationStore::open(dir.path().join("snapshot.json"), config).expect("open failed");
    Fixture { dir, store }
}

fn touch(root: &Path, name: &str) {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, b"").unwrap();
}

/// Assert the parallel collections line up.
fn assert_aligned(store: &AnnotationStore) {
    let ann = store.annotation();
    assert_eq!(ann.label.nrows(), ann.image_name.len());
    assert_eq!(ann.label.ncols(), ann.attr_name.len());
    assert!(ann.validate().is_ok());
}
