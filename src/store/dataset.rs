//! The annotation store: validated mutations over a persisted [`Annotation`].

use std::fs;
use std::path::{Path, PathBuf};

use ndarray::ArrayView2;

use super::batch::{self, BatchCursor, BatchSize, ImageBatch};
use super::logger::StoreLogger;
use super::{export, paths, snapshot};
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::image_io::{FsImageSource, ImageSource};
use crate::model::{
    Annotation, DEFAULT_DESCRIPTION, LabelGroup, Partition, Partitions, check_binary,
};

/// Owner of one dataset snapshot.
///
/// Every mutation is validated before anything changes, applied to a working
/// copy, checked against the data-model invariants and written to disk. Only
/// after the write succeeds does the working copy replace the in-memory
/// record, so a failed save leaves both memory and disk at the previous
/// state.
///
/// The store is meant for one writer at a time. Mutating methods take
/// `&mut self`; two stores opened on the same snapshot path overwrite each
/// other's changes.
pub struct AnnotationStore {
    snapshot_path: PathBuf,
    config: StoreConfig,
    annotation: Annotation,
    images: Box<dyn ImageSource>,
    logger: StoreLogger,
}

impl std::fmt::Debug for AnnotationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnnotationStore")
            .field("snapshot_path", &self.snapshot_path)
            .field("images", &self.annotation.num_images())
            .field("attributes", &self.annotation.num_attributes())
            .finish()
    }
}

impl AnnotationStore {
    /// Open the snapshot at `snapshot_path`, creating an empty dataset if it
    /// does not exist yet.
    pub fn open(snapshot_path: impl Into<PathBuf>, config: StoreConfig) -> Result<Self, StoreError> {
        Self::open_with_source(snapshot_path, config, Box::new(FsImageSource))
    }

    /// Open a snapshot using a custom image source.
    pub fn open_with_source(
        snapshot_path: impl Into<PathBuf>,
        config: StoreConfig,
        images: Box<dyn ImageSource>,
    ) -> Result<Self, StoreError> {
        config.validate()?;
        let snapshot_path = snapshot_path.into();
        let logger = StoreLogger::new(
            config.log_target.clone(),
            config.log_level.to_level_filter(),
        );

        if let Some(parent) = snapshot_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let (annotation, mut needs_save) = if snapshot_path.exists() {
            match snapshot::read(&snapshot_path) {
                Ok((annotation, version)) => {
                    if !snapshot::is_version_compatible(&version) {
                        logger.warn(format_args!(
                            "Snapshot version {} may not be fully compatible with {}",
                            version,
                            snapshot::CURRENT_VERSION
                        ));
                    }
                    logger.info(format_args!(
                        "Loaded dataset from {:?} ({} images, {} attributes)",
                        snapshot_path,
                        annotation.num_images(),
                        annotation.num_attributes()
                    ));
                    (annotation, false)
                }
                Err(StoreError::CorruptSnapshot { message, .. }) if config.recover_corrupt => {
                    let aside = corrupt_path_for(&snapshot_path);
                    logger.warn(format_args!(
                        "Snapshot {:?} is corrupt ({}); moved to {:?} and starting a new dataset",
                        snapshot_path, message, aside
                    ));
                    fs::rename(&snapshot_path, &aside)?;
                    (fresh_annotation(&config), true)
                }
                Err(e) => return Err(e),
            }
        } else {
            logger.info(format_args!(
                "No snapshot at {:?}, creating a new dataset",
                snapshot_path
            ));
            (fresh_annotation(&config), true)
        };

        let mut store = Self {
            snapshot_path,
            config,
            annotation,
            images,
            logger,
        };

        needs_save |= store.apply_overrides();

        let root = &store.annotation.root;
        if !root.as_os_str().is_empty() {
            fs::create_dir_all(root)?;
        }

        if needs_save {
            store.save()?;
        }
        Ok(store)
    }

    /// Replace stored description, ordering hint and root with configured
    /// values. Returns whether anything changed.
    fn apply_overrides(&mut self) -> bool {
        let mut modified = false;
        if let Some(description) = &self.config.description {
            if *description != self.annotation.description {
                self.annotation.description = description.clone();
                modified = true;
            }
        }
        if let Some(reorder) = &self.config.reorder {
            if *reorder != self.annotation.reorder {
                self.annotation.reorder = reorder.clone();
                modified = true;
            }
        }
        if let Some(root) = &self.config.root {
            if *root != self.annotation.root {
                self.logger.info(format_args!(
                    "Dataset root changed from {:?} to {:?}",
                    self.annotation.root, root
                ));
                self.annotation.root = root.clone();
                modified = true;
            }
        }
        modified
    }

    /// Write the current record to the snapshot path.
    pub fn save(&self) -> Result<(), StoreError> {
        snapshot::write(&self.snapshot_path, &self.annotation)?;
        self.logger.trace(format_args!(
            "Saved snapshot to {:?}",
            self.snapshot_path
        ));
        Ok(())
    }

    /// Apply a mutation to a copy, validate and persist it, then swap it in.
    fn commit<T>(&mut self, mutate: impl FnOnce(&mut Annotation) -> T) -> Result<T, StoreError> {
        let mut next = self.annotation.clone();
        let out = mutate(&mut next);
        next.validate()?;
        snapshot::write(&self.snapshot_path, &next)?;
        self.annotation = next;
        self.logger.trace(format_args!(
            "Saved snapshot to {:?}",
            self.snapshot_path
        ));
        Ok(out)
    }

    fn check_image_index(&self, index: usize) -> Result<(), StoreError> {
        let len = self.annotation.num_images();
        if index < len {
            Ok(())
        } else {
            Err(StoreError::image_index(index, len))
        }
    }

    fn check_label_index(&self, index: usize) -> Result<(), StoreError> {
        let len = self.annotation.num_attributes();
        if index < len {
            Ok(())
        } else {
            Err(StoreError::label_index(index, len))
        }
    }

    fn check_label_vector(&self, labels: &[u8]) -> Result<(), StoreError> {
        let expected = self.annotation.num_attributes();
        if labels.len() != expected {
            return Err(StoreError::LabelCountMismatch {
                expected,
                found: labels.len(),
            });
        }
        check_binary(labels)
    }

    fn check_label_name(&self, name: &str, renaming: Option<usize>) -> Result<(), StoreError> {
        if name.trim().is_empty() {
            return Err(StoreError::validation("label name must not be empty"));
        }
        match self.annotation.attribute_position(name) {
            Some(existing) if Some(existing) != renaming => Err(StoreError::DuplicateLabel {
                name: name.to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn check_extension(&self, name: &str) -> Result<(), StoreError> {
        match paths::extension(name) {
            Some(ext) if self.config.is_extension_allowed(&ext) => Ok(()),
            ext => Err(StoreError::validation(format!(
                "'{}' has extension {:?}; allowed: {}",
                name,
                ext.unwrap_or_default(),
                self.config.allowed_extensions.join(", ")
            ))),
        }
    }

    /// Checks that need only the name and labels: name, duplicate, label
    /// vector and extension. Returns the normalized name and the row to add.
    fn check_new_image(
        &self,
        path_or_name: &str,
        labels: Option<&[u8]>,
    ) -> Result<(String, Vec<u8>), StoreError> {
        let name = paths::normalize_image_name(&self.annotation.root, path_or_name);
        if name.is_empty() {
            return Err(StoreError::validation("image name must not be empty"));
        }
        if self.annotation.image_position(&name).is_some() {
            return Err(StoreError::DuplicateImage { name });
        }

        let row = match labels {
            Some(labels) => {
                self.check_label_vector(labels)?;
                labels.to_vec()
            }
            None => vec![0; self.annotation.num_attributes()],
        };
        self.check_extension(&name)?;
        Ok((name, row))
    }

    /// Existence and size checks for an image about to be added.
    fn check_image_file(&self, name: &str) -> Result<(), StoreError> {

        let path = paths::resolve(&self.annotation.root, name);
        if !self.images.exists(&path) {
            return Err(StoreError::not_found(format!("image file {}", path.display())));
        }

        let (expected_width, expected_height) = (self.config.image_width, self.config.image_height);
        if expected_width.is_none() && expected_height.is_none() {
            return Ok(());
        }

        let (width, height) = self
            .images
            .dimensions(&path)
            .map_err(|e| StoreError::validation(e.to_string()))?;
        if expected_width.is_some_and(|w| w != width) || expected_height.is_some_and(|h| h != height)
        {
            return Err(StoreError::validation(format!(
                "'{}' is {}x{}, expected {}x{}",
                name,
                width,
                height,
                expected_width.map_or("*".to_string(), |w| w.to_string()),
                expected_height.map_or("*".to_string(), |h| h.to_string()),
            )));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Attribute mutations
    // ------------------------------------------------------------------

    /// Add an attribute whose value is 0 for every existing image.
    pub fn add_label(&mut self, name: &str) -> Result<usize, StoreError> {
        self.add_label_with_default(name, 0)
    }

    /// Add an attribute, filling its column with `default_value`.
    ///
    /// Returns the column index of the new attribute.
    pub fn add_label_with_default(
        &mut self,
        name: &str,
        default_value: u8,
    ) -> Result<usize, StoreError> {
        self.check_label_name(name, None)?;
        check_binary(&[default_value])?;

        let owned = name.to_string();
        let index = self.commit(|a| a.push_attribute(owned, default_value))?;
        self.logger.debug(format_args!(
            "Added label '{}' at column {}",
            name, index
        ));
        Ok(index)
    }

    /// Rename an attribute. The matrix is unchanged.
    pub fn edit_label(&mut self, index: usize, new_name: &str) -> Result<(), StoreError> {
        self.check_label_index(index)?;
        self.check_label_name(new_name, Some(index))?;

        let owned = new_name.to_string();
        let old = self.commit(|a| std::mem::replace(&mut a.attr_name[index], owned))?;
        self.logger.debug(format_args!(
            "Renamed label {} from '{}' to '{}'",
            index, old, new_name
        ));
        Ok(())
    }

    /// Remove an attribute and its column.
    pub fn remove_label(&mut self, index: usize) -> Result<(), StoreError> {
        self.check_label_index(index)?;
        let cols = self.annotation.label.ncols();
        if cols != self.annotation.num_attributes() {
            return Err(StoreError::dimension_mismatch(format!(
                "label matrix has {} columns but there are {} attributes",
                cols,
                self.annotation.num_attributes()
            )));
        }

        let name = self.annotation.attr_name[index].clone();
        self.commit(|a| a.remove_attribute(index))?;
        self.logger.debug(format_args!(
            "Removed label '{}' (column {})",
            name, index
        ));
        Ok(())
    }

    /// Replace the attribute indices of a label group.
    pub fn set_label_group(
        &mut self,
        group: LabelGroup,
        columns: Vec<usize>,
    ) -> Result<(), StoreError> {
        for &column in &columns {
            self.check_label_index(column)?;
        }
        self.commit(|a| a.label_idx.set(group, columns))?;
        self.logger.debug(format_args!("Updated label group '{}'", group));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Image mutations
    // ------------------------------------------------------------------

    /// Add an image with an all-zero label row.
    pub fn add_image(&mut self, path_or_name: &str) -> Result<usize, StoreError> {
        self.add_image_with_labels(path_or_name, None)
    }

    /// Add an image, optionally with its labels.
    ///
    /// The name is normalized against the dataset root. The new row joins
    /// every partition in the configured `default_partitions`. Returns the
    /// row index of the new image.
    pub fn add_image_with_labels(
        &mut self,
        path_or_name: &str,
        labels: Option<&[u8]>,
    ) -> Result<usize, StoreError> {
        let (name, row) = self.check_new_image(path_or_name, labels)?;
        self.check_image_file(&name)?;

        let partitions = self.config.default_partitions.clone();
        let owned = name.clone();
        let index = self.commit(move |a| {
            let index = a.push_image(owned, &row);
            for partition in partitions {
                a.partition.insert(partition, index);
            }
            index
        })?;
        self.logger.debug(format_args!(
            "Added image '{}' at row {}",
            name, index
        ));
        Ok(index)
    }

    /// Move an image file into the dataset root and add it.
    ///
    /// Name, label and extension checks run before the file is touched. If
    /// adding fails after the move (missing file, wrong size, failed save)
    /// the file is moved back to `source`; a failed move back is reported as
    /// [`StoreError::ImportRollback`].
    pub fn import_image(
        &mut self,
        source: &Path,
        labels: Option<&[u8]>,
    ) -> Result<usize, StoreError> {
        let file_name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                StoreError::validation(format!("{} has no file name", source.display()))
            })?
            .to_string();

        self.check_new_image(&file_name, labels)?;
        if !self.images.exists(source) {
            return Err(StoreError::not_found(format!(
                "image file {}",
                source.display()
            )));
        }

        let destination = paths::resolve(&self.annotation.root, &file_name);
        if destination.exists() {
            return Err(StoreError::validation(format!(
                "{} already exists in the dataset root",
                file_name
            )));
        }

        move_file(source, &destination)?;
        match self.add_image_with_labels(&file_name, labels) {
            Ok(index) => {
                self.logger.info(format_args!(
                    "Imported {:?} as '{}'",
                    source, file_name
                ));
                Ok(index)
            }
            Err(cause) => match move_file(&destination, source) {
                Ok(()) => Err(cause),
                Err(undo) => {
                    self.logger.warn(format_args!(
                        "Could not move {:?} back to {:?}: {}",
                        destination, source, undo
                    ));
                    Err(StoreError::ImportRollback {
                        path: destination,
                        cause: Box::new(cause),
                        undo,
                    })
                }
            },
        }
    }

    /// Remove an image and its row, renumbering every partition.
    pub fn remove_image(&mut self, index: usize) -> Result<(), StoreError> {
        self.check_image_index(index)?;

        let name = self.annotation.image_name[index].clone();
        self.commit(|a| a.remove_image(index))?;
        self.logger.debug(format_args!(
            "Removed image '{}' (row {})",
            name, index
        ));
        Ok(())
    }

    /// Replace the labels of one image.
    pub fn edit_label_for_image(
        &mut self,
        image_index: usize,
        labels: &[u8],
    ) -> Result<(), StoreError> {
        self.check_image_index(image_index)?;
        self.check_label_vector(labels)?;

        self.commit(|a| a.set_row(image_index, labels))?;
        self.logger.debug(format_args!(
            "Set labels of image {} to {:?}",
            image_index, labels
        ));
        Ok(())
    }

    /// Set a single attribute of one image.
    pub fn set_image_label(
        &mut self,
        image_index: usize,
        label_index: usize,
        value: u8,
    ) -> Result<(), StoreError> {
        self.check_image_index(image_index)?;
        self.check_label_index(label_index)?;
        check_binary(&[value])?;

        self.commit(|a| a.label[[image_index, label_index]] = value)?;
        self.logger.debug(format_args!(
            "Set label {} of image {} to {}",
            label_index, image_index, value
        ));
        Ok(())
    }

    /// Reset every attribute of one image to 0. The image stays in the dataset.
    pub fn remove_label_from_image(&mut self, image_index: usize) -> Result<(), StoreError> {
        self.check_image_index(image_index)?;

        self.commit(|a| a.clear_row(image_index))?;
        self.logger.debug(format_args!(
            "Cleared labels of image {}",
            image_index
        ));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Partitions, weights, metadata
    // ------------------------------------------------------------------

    /// Add an image to a partition. Returns `false` if it already belonged.
    pub fn assign_partition(
        &mut self,
        image_index: usize,
        partition: Partition,
    ) -> Result<bool, StoreError> {
        self.check_image_index(image_index)?;
        if self.annotation.partition.contains(partition, image_index) {
            return Ok(false);
        }

        self.commit(|a| a.partition.insert(partition, image_index))?;
        self.logger.debug(format_args!(
            "Assigned image {} to '{}'",
            image_index, partition
        ));
        Ok(true)
    }

    /// Remove an image from a partition. Returns `false` if it was not a member.
    pub fn unassign_partition(
        &mut self,
        image_index: usize,
        partition: Partition,
    ) -> Result<bool, StoreError> {
        self.check_image_index(image_index)?;
        if !self.annotation.partition.contains(partition, image_index) {
            return Ok(false);
        }

        self.commit(|a| a.partition.remove(partition, image_index))?;
        self.logger.debug(format_args!(
            "Removed image {} from '{}'",
            image_index, partition
        ));
        Ok(true)
    }

    /// Reassign every image to train/val/test by the configured split ratios.
    ///
    /// Rows are taken in dataset order. Trainval becomes train plus val.
    pub fn apply_split(&mut self) -> Result<(), StoreError> {
        let total = self.annotation.num_images();
        let (train, val) = self.config.split.counts(total);
        self.commit(|a| a.partition = Partitions::contiguous(total, train, val))?;
        self.logger.info(format_args!(
            "Split {} images into {} train, {} val, {} test",
            total,
            train,
            val,
            total - train - val
        ));
        Ok(())
    }

    /// Recompute `weight_train` and `weight_trainval` from the labels.
    pub fn update_class_weights(&mut self) -> Result<(), StoreError> {
        self.commit(|a| a.recompute_weights())?;
        self.logger.debug(format_args!(
            "Updated class weights for {} attributes",
            self.annotation.num_attributes()
        ));
        Ok(())
    }

    /// Replace the dataset description.
    pub fn set_description(&mut self, description: &str) -> Result<(), StoreError> {
        let owned = description.to_string();
        self.commit(|a| a.description = owned)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// The full in-memory record.
    pub fn annotation(&self) -> &Annotation {
        &self.annotation
    }

    /// Location of the snapshot file.
    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Configuration the store was opened with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Dataset root directory.
    pub fn root(&self) -> &Path {
        &self.annotation.root
    }

    /// Number of images.
    pub fn num_images(&self) -> usize {
        self.annotation.num_images()
    }

    /// Number of attributes.
    pub fn num_labels(&self) -> usize {
        self.annotation.num_attributes()
    }

    /// The whole label matrix.
    pub fn all_labels(&self) -> ArrayView2<'_, u8> {
        self.annotation.label.view()
    }

    /// Labels of one image.
    pub fn labels_for_image(&self, image_index: usize) -> Result<Vec<u8>, StoreError> {
        self.check_image_index(image_index)?;
        self.annotation
            .row(image_index)
            .ok_or_else(|| StoreError::image_index(image_index, self.annotation.num_images()))
    }

    /// Attribute names in column order.
    pub fn dataset_labels(&self) -> &[String] {
        &self.annotation.attr_name
    }

    /// Check whether an image (by path or name) is in the dataset.
    pub fn is_image_in_dataset(&self, path_or_name: &str) -> bool {
        let name = paths::normalize_image_name(&self.annotation.root, path_or_name);
        self.annotation.image_position(&name).is_some()
    }

    /// Row index of an image by path or name.
    pub fn image_index(&self, path_or_name: &str) -> Result<usize, StoreError> {
        let name = paths::normalize_image_name(&self.annotation.root, path_or_name);
        self.annotation
            .image_position(&name)
            .ok_or_else(|| StoreError::not_found(format!("image '{}' in dataset", name)))
    }

    /// Stored name of an image, or its resolved path when `include_root` is set.
    ///
    /// Resolving fails with `NotFound` if the file no longer exists.
    pub fn image_path(&self, image_index: usize, include_root: bool) -> Result<PathBuf, StoreError> {
        self.check_image_index(image_index)?;
        let name = &self.annotation.image_name[image_index];
        if !include_root {
            return Ok(PathBuf::from(name));
        }

        let path = paths::resolve(&self.annotation.root, name);
        if !self.images.exists(&path) {
            return Err(StoreError::not_found(format!(
                "image file {}",
                path.display()
            )));
        }
        Ok(path)
    }

    /// Raw bytes of an image, read through the image source.
    pub fn fetch_image(&self, image_index: usize) -> Result<Vec<u8>, StoreError> {
        let path = self.image_path(image_index, true)?;
        Ok(self.images.read(&path)?)
    }

    /// Pixel size of an image as `(width, height)`.
    pub fn image_dimensions(&self, image_index: usize) -> Result<(u32, u32), StoreError> {
        let path = self.image_path(image_index, true)?;
        Ok(self.images.dimensions(&path)?)
    }

    /// Names of every image, optionally joined with the root.
    pub fn fetch_all_images(&self, include_root: bool) -> Vec<PathBuf> {
        self.annotation
            .image_name
            .iter()
            .map(|name| {
                if include_root {
                    paths::resolve(&self.annotation.root, name)
                } else {
                    PathBuf::from(name)
                }
            })
            .collect()
    }

    /// One page of image names starting at `cursor`.
    pub fn fetch_batch_of_image_paths(
        &self,
        cursor: BatchCursor,
        size: BatchSize,
    ) -> Result<ImageBatch<'_>, StoreError> {
        batch::page(&self.annotation.image_name, cursor, size)
    }

    /// Row indices of one partition.
    pub fn partition(&self, partition: Partition) -> &[usize] {
        self.annotation.partition.get(partition)
    }

    /// Number of positive labels per attribute.
    pub fn label_counts(&self) -> Vec<usize> {
        self.annotation.label_counts()
    }

    // ------------------------------------------------------------------
    // Exports
    // ------------------------------------------------------------------

    /// Write the label matrix to a NumPy `.npy` file.
    pub fn export_labels_npy(&self, path: &Path) -> Result<(), StoreError> {
        export::write_labels_npy(&self.annotation, path)?;
        self.logger.info(format_args!("Exported label matrix to {:?}", path));
        Ok(())
    }

    /// Write names and partitions to a JSON file.
    pub fn export_partitions(&self, path: &Path) -> Result<(), StoreError> {
        export::write_partitions_json(&self.annotation, path)?;
        self.logger.info(format_args!("Exported partitions to {:?}", path));
        Ok(())
    }
}

fn fresh_annotation(config: &StoreConfig) -> Annotation {
    let mut annotation = Annotation::new(
        config
            .description
            .clone()
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
        config.root.clone().unwrap_or_default(),
    );
    if let Some(reorder) = &config.reorder {
        annotation.reorder = reorder.clone();
    }
    annotation
}

/// Path a corrupt snapshot is moved to before recovery.
pub fn corrupt_path_for(path: &Path) -> PathBuf {
    let mut aside = path.as_os_str().to_os_string();
    aside.push(".corrupt");
    PathBuf::from(aside)
}

/// Rename, falling back to copy and delete across filesystems.
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if let Some(parent) = to.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}
