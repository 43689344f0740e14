#![forbid(unsafe_code)]

//! Editor configuration.
//!
//! [`EditorConfig`] groups the tunables of the editing core. With the
//! `config-file` feature it can be loaded from TOML or JSON:
//!
//! ```toml
//! # nbted.toml
//! expand_roots = false
//!
//! [history]
//! max_depth = 200
//! max_bytes = 16777216
//! ```
//!
//! ```rust,ignore
//! let config = EditorConfig::from_toml_file("nbted.toml")?;
//! let model = UndoableTreeModel::with_config(roots, config);
//! ```
//!
//! Missing fields take their defaults, so an empty file is a valid config.

#[cfg(feature = "config-file")]
use std::path::Path;

#[cfg(feature = "config-file")]
use serde::{Deserialize, Serialize};

use crate::undo::HistoryConfig;

/// Top-level configuration for [`UndoableTreeModel`](crate::UndoableTreeModel).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config-file", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-file", serde(default))]
pub struct EditorConfig {
    /// Undo history limits.
    pub history: HistoryConfig,
    /// Materialize the children of every root on construction. Default: true.
    pub expand_roots: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history: HistoryConfig::default(),
            expand_roots: true,
        }
    }
}

impl EditorConfig {
    #[must_use]
    pub fn with_history(mut self, history: HistoryConfig) -> Self {
        self.history = history;
        self
    }

    #[must_use]
    pub fn with_expand_roots(mut self, expand_roots: bool) -> Self {
        self.expand_roots = expand_roots;
        self
    }

    /// Load from a TOML string.
    ///
    /// # Errors
    ///
    /// Parse failures and invalid values.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(ConfigError::Toml)?;
        config.checked()
    }

    /// Load from a TOML file on disk.
    ///
    /// # Errors
    ///
    /// I/O failures, parse failures and invalid values.
    #[cfg(feature = "config-file")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    ///
    /// # Errors
    ///
    /// Parse failures and invalid values.
    #[cfg(feature = "config-file")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s).map_err(ConfigError::Json)?;
        config.checked()
    }

    /// Load from a JSON file on disk.
    ///
    /// # Errors
    ///
    /// I/O failures, parse failures and invalid values.
    #[cfg(feature = "config-file")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)
    }

    #[cfg(feature = "config-file")]
    fn checked(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Check values for consistency. Returns one message per problem.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.history.max_depth == 0 {
            errors.push("history.max_depth must be at least 1".to_owned());
        }
        errors
    }
}

/// Errors that can occur when loading an [`EditorConfig`].
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "config-file")]
    Toml(toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "config-file")]
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "config-file")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "config-file")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "config-file")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "config-file")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}
