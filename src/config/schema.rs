//! Config schema and deserialization

use crate::MessageLevel;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Extra tag statistic computed from a tag query
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CombinedTag {
    /// Tag query, e.g. `smoke AND NOT slow`
    pub pattern: String,
    /// Label shown instead of the query
    #[serde(default)]
    pub name: Option<String>,
}

/// Root config structure for .logviewrc.json
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Extend another config file (path relative to this config)
    #[serde(default)]
    pub extends: Option<String>,

    /// Lowest message level printed. Default: INFO
    #[serde(default)]
    pub min_level: Option<MessageLevel>,

    /// Colored console output. Default: true
    #[serde(default)]
    pub colors: Option<bool>,

    /// Directory holding split keyword files, relative to the config file's directory
    #[serde(default)]
    pub split_dir: Option<String>,

    /// Tag queries reported as additional tag statistics
    #[serde(default)]
    pub combined_tags: Vec<CombinedTag>,

    /// Directory of the file this config was read from
    #[serde(skip)]
    pub(crate) base_dir: Option<PathBuf>,
}

impl Config {
    /// Merge CLI overrides into config. CLI values take precedence.
    pub fn merge_with_cli(mut self, no_color: bool, min_level: Option<MessageLevel>) -> Self {
        if no_color {
            self.colors = Some(false);
        }
        if min_level.is_some() {
            self.min_level = min_level;
        }
        self
    }

    pub fn min_level(&self) -> MessageLevel {
        self.min_level.unwrap_or(MessageLevel::Info)
    }

    pub fn colors(&self) -> bool {
        self.colors.unwrap_or(true)
    }

    /// Where split files are read from; the report's own directory by default
    pub fn split_dir(&self, report_dir: &Path) -> PathBuf {
        match (&self.split_dir, &self.base_dir) {
            (Some(dir), Some(base)) => base.join(dir),
            (Some(dir), None) => report_dir.join(dir),
            (None, _) => report_dir.to_path_buf(),
        }
    }

    /// Merge another config into this one (for extends)
    pub fn merge_from(&mut self, base: Config) {
        // Base values are overridden by this config's values
        if self.min_level.is_none() {
            self.min_level = base.min_level;
        }
        if self.colors.is_none() {
            self.colors = base.colors;
        }
        if self.split_dir.is_none() {
            self.split_dir = base.split_dir;
            self.base_dir = base.base_dir;
        }
        if self.extends.is_none() {
            self.extends = base.extends;
        }

        // Base combined tags come first; a pattern defined twice keeps this config's name
        let mut combined = base.combined_tags;
        combined.retain(|tag| !self.combined_tags.iter().any(|own| own.pattern == tag.pattern));
        combined.append(&mut self.combined_tags);
        self.combined_tags = combined;
    }
}
