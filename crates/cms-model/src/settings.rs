//! Engine settings
//!
//! Feature flags injected at construction time. Nothing in the engine reads
//! process-wide configuration on its own; callers build an [`EngineSettings`]
//! (from defaults, JSON, or the environment) and hand it in.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Settings controlling the access engine.
///
/// # Examples
///
/// ```
/// use cms_model::EngineSettings;
///
/// let settings = EngineSettings::default();
/// assert!(settings.lock_to_web_mounts);
/// assert!(settings.is_table_versioned("pages"));
/// assert!(!settings.is_table_versioned("be_users"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Restrict non-admin principals to their web-mount subtrees
    #[serde(default = "default_true")]
    pub lock_to_web_mounts: bool,

    /// Look up move placeholders for live rows during overlay
    #[serde(default = "default_true")]
    pub preview_move_placeholders: bool,

    /// Tables carrying versioning columns
    #[serde(default = "default_versioned_tables")]
    pub versioned_tables: BTreeSet<String>,

    /// The hierarchical page table
    #[serde(default = "default_page_table")]
    pub page_table: String,
}

fn default_true() -> bool {
    true
}

fn default_versioned_tables() -> BTreeSet<String> {
    ["pages", "tt_content"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_page_table() -> String {
    "pages".to_string()
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            lock_to_web_mounts: true,
            preview_move_placeholders: true,
            versioned_tables: default_versioned_tables(),
            page_table: default_page_table(),
        }
    }
}

impl EngineSettings {
    /// Parse settings from a JSON document. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::InvalidValue {
            key: "settings".to_string(),
            message: e.to_string(),
        })
    }

    /// Load settings from environment variables.
    ///
    /// Environment variables:
    /// - `CMS_LOCK_TO_WEB_MOUNTS`: enforce web mounts (default: true)
    /// - `CMS_PREVIEW_MOVE_PLACEHOLDERS`: preview relocations (default: true)
    /// - `CMS_VERSIONED_TABLES`: comma-separated table list (default: pages,tt_content)
    /// - `CMS_PAGE_TABLE`: hierarchical table name (default: pages)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(value) = lookup("CMS_LOCK_TO_WEB_MOUNTS") {
            settings.lock_to_web_mounts = parse_bool("CMS_LOCK_TO_WEB_MOUNTS", &value)?;
        }
        if let Some(value) = lookup("CMS_PREVIEW_MOVE_PLACEHOLDERS") {
            settings.preview_move_placeholders =
                parse_bool("CMS_PREVIEW_MOVE_PLACEHOLDERS", &value)?;
        }
        if let Some(value) = lookup("CMS_VERSIONED_TABLES") {
            settings.versioned_tables = value
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(value) = lookup("CMS_PAGE_TABLE") {
            let value = value.trim();
            if value.is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "CMS_PAGE_TABLE".to_string(),
                    message: "must not be empty".to_string(),
                });
            }
            settings.page_table = value.to_string();
        }

        Ok(settings)
    }

    /// Check whether a table carries versioning columns.
    pub fn is_table_versioned(&self, table: &str) -> bool {
        self.versioned_tables.contains(table)
    }

    /// Check whether a table is the hierarchical page table.
    pub fn is_page_table(&self, table: &str) -> bool {
        self.page_table == table
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a boolean, got '{}'", other),
        }),
    }
}
