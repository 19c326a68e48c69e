//! Mitigation Eval
//!
//! Weighted-speedup evaluation of RowHammer-mitigation simulation results.
//!
//! # Overview
//!
//! A simulation campaign leaves one text log per (mitigation method, config,
//! workload) under a result tree. This library turns those logs into tables
//! that compare mitigations against an unmitigated baseline:
//!
//! - **Weighted speedup** per core: achieved IPC over solo IPC
//! - **Result table**: one row per run, per-core or summed
//! - **Normalized table**: geometric mean over workloads of each run's
//!   speedup relative to the baseline run of the same workload
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Mitigation Eval                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  run_id/     - File name → typed run identity                   │
//! │  extractor/  - Log scan for per-core, total and IPC fields      │
//! │  catalog/    - Solo IPCs and mix workload assignments           │
//! │  speedup/    - Weighted-speedup computation                     │
//! │  collector/  - Parallel directory walk into result rows         │
//! │  normalize/  - Baseline normalization and geomean groups        │
//! │  calibrate/  - Solo IPCs measured from single-core runs         │
//! │  export/     - CSV tables and JSON run report                   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use mitigation_eval::prelude::*;
//!
//! let config = EvalConfig::default().with_sim_type(SimType::Malicious);
//! let collector = ResultCollector::new(&config, config.load_catalog()?);
//! let output = collector.collect("results/")?;
//!
//! let normalized = CrossConfigNormalizer::new().normalize_results(&output.rows);
//! write_normalized_table_file("plot.csv", &normalized.rows)?;
//! ```

pub mod calibrate;
pub mod catalog;
pub mod collector;
pub mod config;
pub mod error;
pub mod export;
pub mod extractor;
pub mod normalize;
pub mod prelude;
pub mod run_id;
pub mod speedup;

// Re-exports - Errors
pub use error::{Error, Result};

// Re-exports - Config
pub use config::{BatchConfig, CollectConfig, EvalConfig, ExperimentMetadata, TableLayout};

// Re-exports - Run identity and catalog
pub use catalog::{CoreLayout, RunCatalog, Unresolved};
pub use run_id::{compare_configs, RunId, RunIdError, RunMode, SimType};

// Re-exports - Extraction and speedup
pub use extractor::{LogFieldExtractor, ParsedLog};
pub use speedup::{RunStatus, WeightedSpeedup};

// Re-exports - Collection and normalization
pub use calibrate::Calibration;
pub use collector::{
    CollectionOutput, CollectionSummary, ConsoleProgress, ProgressCallback, ProgressInfo,
    ResultCollector, ResultRow, SkipReason, SkippedFile,
};
pub use normalize::{
    geometric_mean, CrossConfigNormalizer, ModeClass, NormalizationSummary, Normalized,
    NormalizedRow, TableRow,
};

// Re-exports - Export
pub use export::{
    read_result_table, read_result_table_file, write_normalized_table,
    write_normalized_table_file, write_result_table, write_result_table_file, RunReport,
};
