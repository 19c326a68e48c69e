//! Prelude module for convenient imports.
//!
//! # Usage
//!
//! ```ignore
//! use mitigation_eval::prelude::*;
//!
//! let config = EvalConfig::default();
//! let collector = ResultCollector::new(&config, RunCatalog::builtin());
//! let output = collector.collect("results/")?;
//! ```
//!
//! # What's Included
//!
//! ## Configuration
//! - [`EvalConfig`] - Evaluation configuration
//! - [`TableLayout`] - Result table column layout
//!
//! ## Collection
//! - [`ResultCollector`] - Parallel log collection
//! - [`RunCatalog`] - Solo IPCs and mix assignments
//! - [`RunId`], [`SimType`], [`RunMode`] - Run identity
//!
//! ## Normalization
//! - [`CrossConfigNormalizer`] - Baseline normalization and geomean groups
//!
//! ## Export
//! - CSV writers/readers and [`RunReport`]

// ============================================================================
// Configuration
// ============================================================================

pub use crate::config::{BatchConfig, CollectConfig, EvalConfig, ExperimentMetadata, TableLayout};
pub use crate::error::{Error, Result};

// ============================================================================
// Collection
// ============================================================================

pub use crate::catalog::{CoreLayout, RunCatalog};
pub use crate::collector::{
    CollectionOutput, CollectionSummary, ConsoleProgress, ProgressCallback, ResultCollector,
    ResultRow,
};
pub use crate::extractor::LogFieldExtractor;
pub use crate::run_id::{RunId, RunMode, SimType};
pub use crate::speedup::{RunStatus, WeightedSpeedup};

// ============================================================================
// Normalization & Calibration
// ============================================================================

pub use crate::calibrate::Calibration;
pub use crate::normalize::{CrossConfigNormalizer, ModeClass, Normalized, NormalizedRow, TableRow};

// ============================================================================
// Export
// ============================================================================

pub use crate::export::{
    read_result_table_file, write_normalized_table_file, write_result_table_file, RunReport,
};
