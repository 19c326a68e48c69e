//! Evaluation configuration management.
//!
//! A single serializable struct describes one result-collection pass, so an
//! evaluation can be reproduced from a version-controlled file.
//!
//! # Example
//!
//! ```ignore
//! use mitigation_eval::config::EvalConfig;
//!
//! let config = EvalConfig::default();
//! config.save_toml("eval.toml")?;
//!
//! let loaded = EvalConfig::load_toml("eval.toml")?;
//! let catalog = loaded.load_catalog()?;
//! ```
//!
//! # TOML Layout
//!
//! ```toml
//! catalog_path = "configs/catalog.toml"   # optional, built-in catalog otherwise
//!
//! [collect]
//! core_count = 16
//! aggressor_cores = 4
//! sim_type = "benign"
//! layout = "per_core"
//! fault_marker = "C: Tool (or Pin) caused signal 11"
//!
//! [batch]
//! threads = 8
//! report_progress = false
//! ```

use crate::catalog::{CoreLayout, RunCatalog};
use crate::extractor::DEFAULT_FAULT_MARKER;
use crate::run_id::SimType;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Unified evaluation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Catalog file; the built-in catalog is used when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,

    /// Log collection settings
    pub collect: CollectConfig,

    /// Parallel processing settings
    #[serde(default)]
    pub batch: BatchConfig,

    /// Experiment metadata (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ExperimentMetadata>,
}

/// Column layout of the result table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableLayout {
    /// One `coreN` column per core
    #[default]
    PerCore,
    /// A single `sum` column
    Sum,
}

/// Settings for turning logs into result rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectConfig {
    /// Cores of the simulated machine
    pub core_count: usize,

    /// Cores running the attack program in malicious simulations
    pub aggressor_cores: usize,

    /// Simulation type to collect
    pub sim_type: SimType,

    /// Result table layout
    #[serde(default)]
    pub layout: TableLayout,

    /// Line marking an instrumentation crash in a log
    #[serde(default = "default_fault_marker")]
    pub fault_marker: String,
}

fn default_fault_marker() -> String {
    DEFAULT_FAULT_MARKER.to_string()
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Worker threads; `None` uses the Rayon default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,

    /// Print per-file progress to the console
    #[serde(default)]
    pub report_progress: bool,
}

/// Experiment metadata for tracking and reproducibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentMetadata {
    /// Experiment name
    pub name: String,

    /// Description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Custom tags
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            core_count: 16,
            aggressor_cores: 4,
            sim_type: SimType::Benign,
            layout: TableLayout::PerCore,
            fault_marker: default_fault_marker(),
        }
    }
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            catalog_path: None,
            collect: CollectConfig::default(),
            batch: BatchConfig::default(),
            metadata: None,
        }
    }
}

impl CollectConfig {
    /// Machine shape derived from the core settings.
    pub fn core_layout(&self) -> CoreLayout {
        CoreLayout::new(self.core_count, self.aggressor_cores)
    }

    /// Validate collection settings.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.core_count == 0 {
            return Err("core_count must be > 0".to_string());
        }
        if self.aggressor_cores >= self.core_count {
            return Err(format!(
                "aggressor_cores ({}) must be smaller than core_count ({})",
                self.aggressor_cores, self.core_count
            ));
        }
        if self.fault_marker.trim().is_empty() {
            return Err("fault_marker must not be empty".to_string());
        }
        Ok(())
    }
}

impl EvalConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the simulation type to collect.
    pub fn with_sim_type(mut self, sim_type: SimType) -> Self {
        self.collect.sim_type = sim_type;
        self
    }

    /// Set the machine shape.
    pub fn with_cores(mut self, core_count: usize, aggressor_cores: usize) -> Self {
        self.collect.core_count = core_count;
        self.collect.aggressor_cores = aggressor_cores;
        self
    }

    /// Set the result table layout.
    pub fn with_layout(mut self, layout: TableLayout) -> Self {
        self.collect.layout = layout;
        self
    }

    /// Set the worker thread count.
    ///
    /// # Panics
    ///
    /// Panics if threads is 0.
    pub fn with_threads(mut self, threads: usize) -> Self {
        assert!(threads > 0, "Thread count must be > 0");
        self.batch.threads = Some(threads);
        self
    }

    /// Use a catalog file instead of the built-in catalog.
    pub fn with_catalog_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.catalog_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set experiment metadata.
    pub fn with_metadata(mut self, metadata: ExperimentMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Validate the configuration.
    ///
    /// Returns Ok(()) if valid, Err(msg) otherwise.
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.collect.validate()?;
        if self.batch.threads == Some(0) {
            return Err("threads must be > 0 when set".to_string());
        }
        Ok(())
    }

    /// Load the configured catalog, or the built-in one.
    pub fn load_catalog(&self) -> Result<RunCatalog> {
        match &self.catalog_path {
            Some(path) => {
                log::info!("Loading run catalog from {}", path.display());
                RunCatalog::load_toml(path)
            }
            None => Ok(RunCatalog::builtin()),
        }
    }

    /// Save configuration to TOML file.
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        fs::write(path, toml_string)?;
        Ok(())
    }

    /// Load configuration from TOML file.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: EvalConfig = toml::from_str(&contents)?;
        config.validate().map_err(Error::config)?;
        Ok(config)
    }

    /// Save configuration to JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json_string = serde_json::to_string_pretty(self)?;
        fs::write(path, json_string)?;
        Ok(())
    }

    /// Load configuration from JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: EvalConfig = serde_json::from_str(&contents)?;
        config.validate().map_err(Error::config)?;
        Ok(config)
    }
}
