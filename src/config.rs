//! `zarrs_merge` global configuration options.
//!
//! Per merge options are set with [`MergeOptions`](crate::merge::MergeOptions).

use std::sync::OnceLock;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Global configuration options for `zarrs_merge`.
///
/// Retrieve the global [`Config`] with [`global_config`] and modify it with [`global_config_mut`].
///
/// ## Configuration Options
///
/// ### File Identifier Path
/// > default: `base_sample_id`
///
/// The name of the array holding the integer identifier of each merged input.
/// The identifier is parsed from the base name of the input location, without its extension.
/// It is also the default sort key of a merge.
///
/// ### File Label Path
/// > default: `base_sample_name`
///
/// The name of the array holding the label of each merged input.
///
/// ### Label Attribute
/// > default: `name`
///
/// The root attribute of each input which supplies its label.
#[derive(Debug, Clone)]
pub struct Config {
    file_id_path: String,
    file_label_path: String,
    label_attribute: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            file_id_path: "base_sample_id".to_string(),
            file_label_path: "base_sample_name".to_string(),
            label_attribute: "name".to_string(),
        }
    }
}

impl Config {
    /// Get the [file identifier path](#file-identifier-path) configuration.
    #[must_use]
    pub fn file_id_path(&self) -> &str {
        &self.file_id_path
    }

    /// Set the [file identifier path](#file-identifier-path) configuration.
    pub fn set_file_id_path(&mut self, file_id_path: impl Into<String>) {
        self.file_id_path = file_id_path.into();
    }

    /// Get the [file label path](#file-label-path) configuration.
    #[must_use]
    pub fn file_label_path(&self) -> &str {
        &self.file_label_path
    }

    /// Set the [file label path](#file-label-path) configuration.
    pub fn set_file_label_path(&mut self, file_label_path: impl Into<String>) {
        self.file_label_path = file_label_path.into();
    }

    /// Get the [label attribute](#label-attribute) configuration.
    #[must_use]
    pub fn label_attribute(&self) -> &str {
        &self.label_attribute
    }

    /// Set the [label attribute](#label-attribute) configuration.
    pub fn set_label_attribute(&mut self, label_attribute: impl Into<String>) {
        self.label_attribute = label_attribute.into();
    }
}

static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

/// Returns a reference to the global `zarrs_merge` configuration.
#[must_use]
pub fn global_config() -> RwLockReadGuard<'static, Config> {
    CONFIG.get_or_init(|| RwLock::new(Config::default())).read()
}

/// Returns a mutable reference to the global `zarrs_merge` configuration.
#[must_use]
pub fn global_config_mut() -> RwLockWriteGuard<'static, Config> {
    CONFIG.get_or_init(|| RwLock::new(Config::default())).write()
}
