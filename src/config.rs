//! Configuration file support for the annotation store.
//!
//! The configuration is read once when a store is opened and never modified
//! by the store afterwards. It can be exported and imported as JSON.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::Partition;

/// Log level setting for the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Turn store logging off
    Off,
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Get the display name for this log level.
    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Off => "Off",
            LogLevel::Error => "Error",
            LogLevel::Warn => "Warn",
            LogLevel::Info => "Info",
            LogLevel::Debug => "Debug",
            LogLevel::Trace => "Trace",
        }
    }

    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Train/validation split ratios.
///
/// Used by `AnnotationStore::apply_split` to reassign every image; adding
/// images never consults them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitRatios {
    pub train: f64,
    pub val: f64,
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self {
            train: 0.8,
            val: 0.1,
        }
    }
}

impl SplitRatios {
    /// Remaining fraction left for the test split.
    pub fn test(&self) -> f64 {
        (1.0 - self.train - self.val).max(0.0)
    }

    /// Number of train and val rows for a dataset of `total` images.
    ///
    /// Counts are rounded down; leftover rows go to test. A product just
    /// below an integer through float error counts as that integer, so
    /// `0.29 * 100` gives 29.
    pub fn counts(&self, total: usize) -> (usize, usize) {
        let share = |ratio: f64| ((total as f64) * ratio + SPLIT_TOLERANCE).floor() as usize;
        let train = share(self.train);
        let val = share(self.val);
        let train = train.min(total);
        (train, val.min(total - train))
    }
}

/// Slack applied to split products before rounding down.
const SPLIT_TOLERANCE: f64 = 1e-9;

/// Store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Base directory images are resolved against. When set it replaces the
    /// root stored in an existing snapshot.
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Dataset description override
    #[serde(default)]
    pub description: Option<String>,

    /// Ordering hint override
    #[serde(default)]
    pub reorder: Option<String>,

    /// Allowed image extensions (lowercase, without dots)
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,

    /// Expected image height in pixels, checked on insert when set
    #[serde(default)]
    pub image_height: Option<u32>,

    /// Expected image width in pixels, checked on insert when set
    #[serde(default)]
    pub image_width: Option<u32>,

    /// Intended split ratios
    #[serde(default)]
    pub split: SplitRatios,

    /// Partitions every newly added image joins
    #[serde(default = "default_partitions")]
    pub default_partitions: Vec<Partition>,

    /// Replace an unreadable snapshot with an empty dataset instead of
    /// failing to open
    #[serde(default)]
    pub recover_corrupt: bool,

    /// Log verbosity of the store
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log target used for store messages
    #[serde(default = "default_log_target")]
    pub log_target: String,
}

fn default_allowed_extensions() -> Vec<String> {
    vec!["png".to_string(), "jpg".to_string(), "jpeg".to_string()]
}

fn default_partitions() -> Vec<Partition> {
    vec![Partition::Train, Partition::Trainval]
}

fn default_log_target() -> String {
    "attrstore::store".to_string()
}

impl StoreConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            root: None,
            description: None,
            reorder: None,
            allowed_extensions: default_allowed_extensions(),
            image_height: None,
            image_width: None,
            split: SplitRatios::default(),
            default_partitions: default_partitions(),
            recover_corrupt: false,
            log_level: LogLevel::default(),
            log_target: default_log_target(),
        }
    }

    /// Set the image root directory.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Set the dataset description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Require inserted images to have the given size.
    pub fn with_image_size(mut self, width: u32, height: u32) -> Self {
        self.image_width = Some(width);
        self.image_height = Some(height);
        self
    }

    /// Set the partitions new images join.
    pub fn with_default_partitions(mut self, partitions: Vec<Partition>) -> Self {
        self.default_partitions = partitions;
        self
    }

    /// Recreate the dataset when the snapshot cannot be decoded.
    pub fn with_recover_corrupt(mut self, recover: bool) -> Self {
        self.recover_corrupt = recover;
        self
    }

    /// Set the store log level.
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Check whether a file extension is allowed (case-insensitive).
    pub fn is_extension_allowed(&self, extension: &str) -> bool {
        let extension = extension.trim_start_matches('.');
        self.allowed_extensions
            .iter()
            .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(extension))
    }

    /// Check values serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.allowed_extensions.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one image extension must be allowed".to_string(),
            ));
        }

        let SplitRatios { train, val } = self.split;
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !in_unit(train) || !in_unit(val) || train + val > 1.0 + f64::EPSILON {
            return Err(ConfigError::Invalid(format!(
                "split ratios train={} val={} must lie in [0, 1] and sum to at most 1",
                train, val
            )));
        }

        if matches!(self.image_height, Some(0)) || matches!(self.image_width, Some(0)) {
            return Err(ConfigError::Invalid(
                "expected image dimensions must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        // Validate version compatibility
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to a file, creating parent directories if needed.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = self.to_json()?;
        std::fs::write(path, json)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get the default filename for the configuration.
    pub fn default_filename() -> &'static str {
        "attrstore-config.json"
    }

    /// Get the default config file path.
    pub fn default_path() -> Option<PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("attrstore").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("attrstore")
                    .join(Self::default_filename())
            })
        }
    }

    /// Try to load configuration from the default path.
    /// Returns None if the file doesn't exist or can't be read.
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }

        match Self::load(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                None
            }
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// Configuration values are out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
