use anyhow::{Context, Result, anyhow};
use log::{LevelFilter, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::layout::anchoring::{DEFAULT_TOLERANCE_PCT, DEFAULT_TOLERANCE_PT};
use crate::layout::columns::{DEFAULT_EPSILON, DEFAULT_MIN_POINTS};

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Source language code (ISO)
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language code (ISO)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Column detection settings
    #[serde(default)]
    pub columns: ColumnConfig,

    /// Asset anchoring settings
    #[serde(default)]
    pub anchoring: AnchorConfig,

    /// Segmentation settings
    #[serde(default)]
    pub segmentation: SegmentationConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ColumnConfig {
    /// Maximum gap in points between left edges of one column
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,

    /// Minimum block count for a column to stand on its own
    #[serde(default = "default_min_points")]
    pub min_points: usize,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            epsilon: default_epsilon(),
            min_points: default_min_points(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AnchorConfig {
    /// Absolute geometry tolerance in points
    #[serde(default = "default_tolerance_pt")]
    pub tolerance_pt: f64,

    /// Relative geometry tolerance as a fraction of asset width
    #[serde(default = "default_tolerance_pct")]
    pub tolerance_pct: f64,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            tolerance_pt: default_tolerance_pt(),
            tolerance_pct: default_tolerance_pct(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SegmentationConfig {
    /// Restore protected literals right after merge
    #[serde(default = "default_true")]
    pub decode_after_merge: bool,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            decode_after_merge: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn default_source_language() -> String {
    "en".to_string()
}

fn default_target_language() -> String {
    "fr".to_string()
}

fn default_epsilon() -> f64 {
    DEFAULT_EPSILON
}

fn default_min_points() -> usize {
    DEFAULT_MIN_POINTS
}

fn default_tolerance_pt() -> f64 {
    DEFAULT_TOLERANCE_PT
}

fn default_tolerance_pct() -> f64 {
    DEFAULT_TOLERANCE_PCT
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        // Validate languages
        let _source_name = crate::language_utils::get_language_name(&self.source_language)?;
        let _target_name = crate::language_utils::get_language_name(&self.target_language)?;

        if !self.columns.epsilon.is_finite() || self.columns.epsilon <= 0.0 {
            return Err(anyhow!(
                "Column epsilon must be a positive number, got {}",
                self.columns.epsilon
            ));
        }
        if self.columns.min_points == 0 {
            return Err(anyhow!("Column min_points must be at least 1"));
        }

        for (name, value) in [
            ("tolerance_pt", self.anchoring.tolerance_pt),
            ("tolerance_pct", self.anchoring.tolerance_pct),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(anyhow!("Anchoring {} must be a non-negative number, got {}", name, value));
            }
        }

        Ok(())
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .context(format!("Failed to open config file: {}", path.display()))?;
        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .context(format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, config_json)
            .context(format!("Failed to write config to file: {}", path.display()))?;
        Ok(())
    }

    /// Load the configuration, writing a default file first if none exists
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: default_target_language(),
            columns: ColumnConfig::default(),
            anchoring: AnchorConfig::default(),
            segmentation: SegmentationConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
