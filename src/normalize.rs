//! Cross-configuration normalization of weighted speedups.
//!
//! Every non-baseline row is divided by the baseline row of the same workload,
//! then rows are grouped by (method, mode class, config) and summarized with a
//! geometric mean:
//!
//! ```text
//! normalized = sum / baseline_sum[run_base]
//! geomean    = exp(mean(ln(normalized)))
//! ```
//!
//! # Mode Classes
//!
//! The `high` mix groups the most memory-intensive traces and is reported on
//! its own:
//!
//! | Run mode | Run base | Mode class |
//! |----------|----------|------------|
//! | `rate` | any | `rate` |
//! | `mix` | `mix.high` | `mix_high` |
//! | `mix` | other | `mix` |
//! | `single` | any | `single` |
//!
//! # Undefined Values
//!
//! - A row with no baseline for its run base is dropped and counted.
//! - A zero baseline sum makes the normalized value undefined (`None`).
//! - A group whose values are all undefined has an undefined geomean.
//!
//! None of these are errors; they are tallied in [`NormalizationSummary`].

use crate::collector::ResultRow;
use crate::run_id::{compare_configs, RunMode, BASELINE_METHOD};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Run base of the memory-intensive mix reported separately.
pub const HIGH_MIX_RUN_BASE: &str = "mix.high";

/// Reporting class of a run, derived from its mode and run base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeClass {
    Mix,
    MixHigh,
    Rate,
    Single,
}

impl ModeClass {
    pub fn classify(mode: RunMode, run_base: &str) -> Self {
        match mode {
            RunMode::Rate => Self::Rate,
            RunMode::Single => Self::Single,
            RunMode::Mix if run_base == HIGH_MIX_RUN_BASE => Self::MixHigh,
            RunMode::Mix => Self::Mix,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Rate => "rate",
            Self::Mix => "mix",
            Self::MixHigh => "mix_high",
        }
    }
}

impl fmt::Display for ModeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a result table reduced to its aggregate speedup.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub method: String,
    pub mode: RunMode,
    pub config: String,
    pub run_base: String,
    pub sum: f64,
}

impl TableRow {
    pub fn is_baseline(&self) -> bool {
        self.method == BASELINE_METHOD
    }
}

impl From<&ResultRow> for TableRow {
    fn from(row: &ResultRow) -> Self {
        Self {
            method: row.run.method.clone(),
            mode: row.run.mode,
            config: row.run.config.clone(),
            run_base: row.run.run_base.clone(),
            sum: row.sum(),
        }
    }
}

/// Geometric mean of one (method, mode class, config) group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRow {
    pub method: String,
    pub mode_class: ModeClass,
    pub config: String,
    /// `None` when no value in the group was defined
    pub geomean: Option<f64>,
}

/// Counts describing one normalization pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizationSummary {
    /// Non-baseline rows with a baseline for their run base
    pub rows_normalized: usize,
    /// Non-baseline rows dropped for lack of a baseline
    pub rows_without_baseline: usize,
    /// Normalized values undefined because the baseline sum was zero
    pub undefined_values: usize,
    /// Output groups
    pub groups: usize,
    /// Groups with an undefined geomean
    pub undefined_groups: usize,
}

/// Normalized groups and their summary.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub rows: Vec<NormalizedRow>,
    pub summary: NormalizationSummary,
}

/// Geometric mean of `values`.
///
/// `None` for an empty slice; `Some(0.0)` if any value is zero.
pub fn geometric_mean(values: &[f64]) -> Option<f64> {
    match values {
        [] => None,
        [only] => Some(*only),
        _ if values.iter().any(|v| *v == 0.0) => Some(0.0),
        _ => {
            let log_sum: f64 = values.iter().map(|v| v.ln()).sum();
            Some((log_sum / values.len() as f64).exp())
        }
    }
}

/// Divides rows by their baseline and summarizes each group.
#[derive(Debug, Clone, Default)]
pub struct CrossConfigNormalizer;

impl CrossConfigNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize collector rows.
    pub fn normalize_results(&self, rows: &[ResultRow]) -> Normalized {
        let table: Vec<TableRow> = rows.iter().map(TableRow::from).collect();
        self.normalize(&table)
    }

    /// Normalize a result table.
    pub fn normalize(&self, rows: &[TableRow]) -> Normalized {
        let mut baselines: BTreeMap<&str, f64> = BTreeMap::new();
        for row in rows.iter().filter(|r| r.is_baseline()) {
            if baselines.insert(row.run_base.as_str(), row.sum).is_some() {
                log::warn!("Multiple baseline rows for {}, using the last", row.run_base);
            }
        }

        let mut summary = NormalizationSummary::default();
        let mut groups: BTreeMap<(&str, ModeClass, &str), Vec<f64>> = BTreeMap::new();

        for row in rows.iter().filter(|r| !r.is_baseline()) {
            let Some(&base) = baselines.get(row.run_base.as_str()) else {
                log::debug!(
                    "No baseline for {}.{}.{}, dropping row",
                    row.method,
                    row.config,
                    row.run_base
                );
                summary.rows_without_baseline += 1;
                continue;
            };
            summary.rows_normalized += 1;

            let values = groups
                .entry((
                    row.method.as_str(),
                    ModeClass::classify(row.mode, &row.run_base),
                    row.config.as_str(),
                ))
                .or_default();
            if base == 0.0 {
                summary.undefined_values += 1;
            } else {
                values.push(row.sum / base);
            }
        }

        let mut out: Vec<NormalizedRow> = groups
            .into_iter()
            .map(|((method, mode_class, config), values)| NormalizedRow {
                method: method.to_string(),
                mode_class,
                config: config.to_string(),
                geomean: geometric_mean(&values),
            })
            .collect();
        out.sort_by(compare_normalized);

        summary.groups = out.len();
        summary.undefined_groups = out.iter().filter(|r| r.geomean.is_none()).count();

        if summary.rows_without_baseline > 0 || summary.undefined_values > 0 {
            log::warn!(
                "{} rows without baseline, {} undefined values",
                summary.rows_without_baseline,
                summary.undefined_values
            );
        }
        log::info!(
            "Normalized {} rows into {} groups",
            summary.rows_normalized,
            summary.groups
        );

        Normalized { rows: out, summary }
    }
}

fn compare_normalized(a: &NormalizedRow, b: &NormalizedRow) -> Ordering {
    a.method
        .cmp(&b.method)
        .then_with(|| a.mode_class.as_str().cmp(b.mode_class.as_str()))
        .then_with(|| compare_configs(&a.config, &b.config))
}
