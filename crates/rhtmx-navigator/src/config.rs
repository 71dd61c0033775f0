// File: src/config.rs
// Purpose: Navigator configuration parsed from the [navigation] table of a TOML file

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Navigator settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// Redirect budget shared by the whole attempt (default: 10)
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Save scroll positions on leave and restore them on back/forward
    #[serde(default = "default_true")]
    pub scroll_restoration: bool,

    /// Scroll to the top after push/replace when nothing else applies
    #[serde(default = "default_true")]
    pub scroll_to_top: bool,

    /// Remember the requested path when falling back to a state's default path
    #[serde(default = "default_true")]
    pub save_intended_path: bool,

    /// Message shown by the confirmation blocker
    #[serde(default = "default_confirm_message")]
    pub confirm_message: String,
}

/// File layout: everything lives under `[navigation]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    navigation: NavigationConfig,
}

// Default values
fn default_max_redirects() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_confirm_message() -> String {
    "You have unsaved changes. Leave this page?".to_string()
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            max_redirects: default_max_redirects(),
            scroll_restoration: true,
            scroll_to_top: true,
            save_intended_path: true,
            confirm_message: default_confirm_message(),
        }
    }
}

impl NavigationConfig {
    /// Load configuration from a TOML file
    ///
    /// A missing or empty file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let file: ConfigFile = toml::from_str(content)?;
        Ok(file.navigation)
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    pub fn with_scroll_restoration(mut self, enabled: bool) -> Self {
        self.scroll_restoration = enabled;
        self
    }

    pub fn with_scroll_to_top(mut self, enabled: bool) -> Self {
        self.scroll_to_top = enabled;
        self
    }

    pub fn with_save_intended_path(mut self, enabled: bool) -> Self {
        self.save_intended_path = enabled;
        self
    }

    pub fn with_confirm_message(mut self, message: impl Into<String>) -> Self {
        self.confirm_message = message.into();
        self
    }
}
