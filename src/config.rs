//! Store configuration.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_UNDO_LIMIT: usize = 100;
pub const DEFAULT_MAX_LABEL_LENGTH: usize = 255;
pub const DEFAULT_MAX_DEV_NAME_LENGTH: usize = 80;
pub const DEFAULT_COPY_LABEL_TEMPLATE: &str = "{label} {n} copy";

/// How pasted and duplicated elements are renamed.
///
/// `copy_label_template` supports the `{label}` and `{n}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NamingConfig {
    pub max_label_length: usize,
    pub max_dev_name_length: usize,
    pub copy_label_template: String,
}

impl NamingConfig {
    /// The copy label template must carry the `{n}` counter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.copy_label_template.contains("{n}") {
            Ok(())
        } else {
            Err(ConfigError::CopyLabelTemplate {
                template: self.copy_label_template.clone(),
            })
        }
    }
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            max_label_length: DEFAULT_MAX_LABEL_LENGTH,
            max_dev_name_length: DEFAULT_MAX_DEV_NAME_LENGTH,
            copy_label_template: DEFAULT_COPY_LABEL_TEMPLATE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreConfig {
    /// Run the auto-layout invariant checks after every reduction.
    pub assert_invariants: bool,
    /// Maximum number of undo snapshots kept.
    pub undo_limit: usize,
    pub naming: NamingConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            assert_invariants: cfg!(debug_assertions),
            undo_limit: DEFAULT_UNDO_LIMIT,
            naming: NamingConfig::default(),
        }
    }
}

impl StoreConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.naming.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn with_assertions(mut self, enabled: bool) -> Self {
        self.assert_invariants = enabled;
        self
    }
}
