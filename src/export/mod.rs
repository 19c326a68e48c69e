//! Table Export Module
//!
//! CSV tables and JSON reports consumed by the plotting scripts.
//!
//! # Formats
//!
//! - Result table: `method,run_mode,config,run_base` followed by either one
//!   `coreN` column per core or a single `sum` column
//! - Normalized table: `method,mode3,config,geomean_normalized_sum`, with
//!   undefined geomeans written as `NaN`
//! - Run report: JSON with the collection and normalization summaries
//!
//! The result table reader accepts both layouts, so a table written by an
//! earlier pass can be normalized again without re-reading the logs.
//!
//! # Example
//!
//! ```ignore
//! use mitigation_eval::export::{write_result_table_file, write_normalized_table_file};
//!
//! write_result_table_file("per_core_simulation_results.csv", &output, TableLayout::PerCore)?;
//! let normalized = CrossConfigNormalizer::new().normalize_results(&output.rows);
//! write_normalized_table_file("plot.csv", &normalized.rows)?;
//! ```

use crate::collector::{CollectionOutput, CollectionSummary};
use crate::config::{EvalConfig, TableLayout};
use crate::normalize::{NormalizationSummary, NormalizedRow, TableRow};
use crate::run_id::RunMode;
use crate::{Error, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;

/// Default result table file name.
pub const RESULT_TABLE_FILE: &str = "per_core_simulation_results.csv";

/// Default normalized table file name.
pub const NORMALIZED_TABLE_FILE: &str = "plot.csv";

const KEY_COLUMNS: [&str; 4] = ["method", "run_mode", "config", "run_base"];
const SUM_COLUMN: &str = "sum";
const CORE_COLUMN_PREFIX: &str = "core";
const NORMALIZED_COLUMNS: [&str; 4] = ["method", "mode3", "config", "geomean_normalized_sum"];

fn create_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(File::create(path)?)
}

// ============================================================================
// Result table
// ============================================================================

/// Write the collector's rows as a CSV result table.
pub fn write_result_table<W: Write>(
    writer: W,
    output: &CollectionOutput,
    layout: TableLayout,
) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);

    let mut header: Vec<String> = KEY_COLUMNS.iter().map(|c| c.to_string()).collect();
    match layout {
        TableLayout::PerCore => {
            header.extend((0..output.core_count).map(|i| format!("{CORE_COLUMN_PREFIX}{i}")))
        }
        TableLayout::Sum => header.push(SUM_COLUMN.to_string()),
    }
    csv.write_record(&header)?;

    for row in &output.rows {
        let mut record = vec![
            row.run.method.clone(),
            row.run.mode.to_string(),
            row.run.config.clone(),
            row.run.run_base.clone(),
        ];
        match layout {
            TableLayout::PerCore => record.extend(row.speedup.per_core.iter().map(f64::to_string)),
            TableLayout::Sum => record.push(row.sum().to_string()),
        }
        csv.write_record(&record)?;
    }

    csv.flush()?;
    Ok(())
}

/// Write the result table to `path`, creating parent directories.
pub fn write_result_table_file<P: AsRef<Path>>(
    path: P,
    output: &CollectionOutput,
    layout: TableLayout,
) -> Result<()> {
    let path = path.as_ref();
    write_result_table(create_file(path)?, output, layout)?;
    log::info!("Wrote {} rows to {}", output.rows.len(), path.display());
    Ok(())
}

/// Read a result table in either layout, summing per-core columns.
pub fn read_result_table<R: Read>(reader: R) -> Result<Vec<TableRow>> {
    let mut csv = csv::Reader::from_reader(reader);
    let headers = csv.headers()?.clone();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| Error::invalid_input(format!("result table has no '{name}' column")))
    };
    let method_col = column(KEY_COLUMNS[0])?;
    let mode_col = column(KEY_COLUMNS[1])?;
    let config_col = column(KEY_COLUMNS[2])?;
    let run_base_col = column(KEY_COLUMNS[3])?;

    let value_cols: Vec<usize> = match headers.iter().position(|h| h == SUM_COLUMN) {
        Some(idx) => vec![idx],
        None => headers
            .iter()
            .enumerate()
            .filter(|(_, h)| h.starts_with(CORE_COLUMN_PREFIX))
            .map(|(i, _)| i)
            .collect(),
    };
    if value_cols.is_empty() {
        return Err(Error::invalid_input(
            "result table has neither a 'sum' nor any 'core' columns",
        ));
    }

    let mut rows = Vec::new();
    for (line, record) in csv.records().enumerate() {
        let record = record?;
        let line = line + 2;
        let field = |idx: usize| record.get(idx).unwrap_or("");

        let mode = RunMode::from_token(field(mode_col)).ok_or_else(|| {
            Error::invalid_input(format!("line {line}: unknown run mode '{}'", field(mode_col)))
        })?;

        let mut sum = 0.0;
        for &idx in &value_cols {
            let value: f64 = field(idx).trim().parse().map_err(|_| {
                Error::invalid_input(format!("line {line}: invalid value '{}'", field(idx)))
            })?;
            sum += value;
        }

        rows.push(TableRow {
            method: field(method_col).to_string(),
            mode,
            config: field(config_col).to_string(),
            run_base: field(run_base_col).to_string(),
            sum,
        });
    }

    Ok(rows)
}

/// Read a result table from `path`.
pub fn read_result_table_file<P: AsRef<Path>>(path: P) -> Result<Vec<TableRow>> {
    let rows = read_result_table(File::open(path.as_ref())?)?;
    log::info!("Read {} rows from {}", rows.len(), path.as_ref().display());
    Ok(rows)
}

// ============================================================================
// Normalized table
// ============================================================================

/// Write normalized groups as CSV.
pub fn write_normalized_table<W: Write>(writer: W, rows: &[NormalizedRow]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(NORMALIZED_COLUMNS)?;
    for row in rows {
        let geomean = row.geomean.unwrap_or(f64::NAN);
        csv.write_record([
            row.method.as_str(),
            row.mode_class.as_str(),
            row.config.as_str(),
            geomean.to_string().as_str(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// Write the normalized table to `path`, creating parent directories.
pub fn write_normalized_table_file<P: AsRef<Path>>(path: P, rows: &[NormalizedRow]) -> Result<()> {
    let path = path.as_ref();
    write_normalized_table(create_file(path)?, rows)?;
    log::info!("Wrote {} groups to {}", rows.len(), path.display());
    Ok(())
}

// ============================================================================
// Run report
// ============================================================================

/// JSON report of one evaluation pass.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub collection: CollectionSummary,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalization: Option<NormalizationSummary>,

    /// Configuration the pass ran with
    pub config: EvalConfig,
}

impl RunReport {
    pub fn new(config: &EvalConfig, collection: CollectionSummary) -> Self {
        Self {
            collection,
            normalization: None,
            config: config.clone(),
        }
    }

    pub fn with_normalization(mut self, summary: NormalizationSummary) -> Self {
        self.normalization = Some(summary);
        self
    }

    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Save as pretty-printed JSON, creating parent directories.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut file = io::BufWriter::new(create_file(path)?);
        self.write_json(&mut file)?;
        file.flush()?;
        log::info!("Wrote run report to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::ResultRow;
    use crate::normalize::ModeClass;
    use crate::run_id::RunId;
    use crate::speedup::{RunStatus, WeightedSpeedup};
    use std::path::PathBuf;

    fn output() -> CollectionOutput {
        let rows = [
            ("baseline.rate.a.out", vec![0.5, 0.5]),
            ("benign.para.512.rate.a.out", vec![0.25, 0.5]),
        ]
        .into_iter()
        .map(|(name, per_core)| ResultRow {
            run: RunId::parse_file_name(name).unwrap(),
            speedup: WeightedSpeedup {
                per_core,
                status: RunStatus::Valid,
            },
            source: PathBuf::from(name),
        })
        .collect();

        CollectionOutput {
            rows,
            skipped: Vec::new(),
            summary: CollectionSummary::default(),
            core_count: 2,
        }
    }

    fn written(layout: TableLayout) -> String {
        let mut buf = Vec::new();
        write_result_table(&mut buf, &output(), layout).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_per_core_layout() {
        let text = written(TableLayout::PerCore);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "method,run_mode,config,run_base,core0,core1");
        assert_eq!(lines[1], "baseline,rate,none,rate.a,0.5,0.5");
        assert_eq!(lines[2], "para,rate,512,rate.a,0.25,0.5");
    }

    #[test]
    fn test_sum_layout() {
        let text = written(TableLayout::Sum);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "method,run_mode,config,run_base,sum");
        assert_eq!(lines[1], "baseline,rate,none,rate.a,1");
        assert_eq!(lines[2], "para,rate,512,rate.a,0.75");
    }

    #[test]
    fn test_reader_accepts_both_layouts() {
        for layout in [TableLayout::PerCore, TableLayout::Sum] {
            let rows = read_result_table(written(layout).as_bytes()).unwrap();
            assert_eq!(rows.len(), 2);
            assert!(rows[0].is_baseline());
            assert_eq!(rows[0].sum, 1.0);
            assert_eq!(rows[1].mode, RunMode::Rate);
            assert_eq!(rows[1].sum, 0.75);
        }
    }

    #[test]
    fn test_reader_rejects_bad_tables() {
        let missing = "method,run_mode,config,core0\npara,rate,512,1\n";
        assert!(matches!(read_result_table(missing.as_bytes()), Err(Error::InvalidInput(_))));

        let no_values = "method,run_mode,config,run_base\npara,rate,512,rate.a\n";
        assert!(read_result_table(no_values.as_bytes()).is_err());

        let bad_mode = "method,run_mode,config,run_base,sum\npara,stream,512,x,1\n";
        let err = read_result_table(bad_mode.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_normalized_table_writes_nan() {
        let rows = vec![
            NormalizedRow {
                method: "para".to_string(),
                mode_class: ModeClass::MixHigh,
                config: "512".to_string(),
                geomean: Some(0.85),
            },
            NormalizedRow {
                method: "para".to_string(),
                mode_class: ModeClass::Rate,
                config: "64".to_string(),
                geomean: None,
            },
        ];
        let mut buf = Vec::new();
        write_normalized_table(&mut buf, &rows).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "method,mode3,config,geomean_normalized_sum");
        assert_eq!(lines[1], "para,mix_high,512,0.85");
        assert_eq!(lines[2], "para,rate,64,NaN");
    }

    #[test]
    fn test_run_report_json() {
        let report = RunReport::new(&EvalConfig::default(), CollectionSummary::default())
            .with_normalization(NormalizationSummary {
                groups: 3,
                ..Default::default()
            });
        let mut buf = Vec::new();
        report.write_json(&mut buf).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["normalization"]["groups"], 3);
        assert_eq!(value["collection"]["sim_type"], "benign");
        assert_eq!(value["config"]["collect"]["core_count"], 16);
    }
}
