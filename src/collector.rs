//! Parallel result collection over a directory of simulator logs.
//!
//! The collector walks a result tree, turns every `*.out` file of the requested
//! simulation type into one [`ResultRow`], and tallies everything it had to
//! leave out. Logs are independent and read-only, so each file is parsed on
//! Rayon's work-stealing pool with no shared mutable state beyond progress
//! counters; the final sort makes the output independent of scheduling.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                       ResultCollector                          │
//! │                                                                │
//! │  discover(root) ──► [a.out, b.out, ...]                        │
//! │                            │                                   │
//! │             ┌──────────────┼──────────────┐   Rayon pool       │
//! │             ▼              ▼              ▼                    │
//! │        RunId::parse   RunId::parse   RunId::parse              │
//! │        type filter    type filter    type filter               │
//! │        catalog        catalog        catalog                   │
//! │        extract        extract        extract                   │
//! │        speedup        speedup        speedup                   │
//! │             │              │              │                    │
//! │             └──────────────┼──────────────┘                    │
//! │                            ▼                                   │
//! │        sort + dedup ──► CollectionOutput { rows, skipped,      │
//! │                                            summary }           │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Failure Policy
//!
//! Nothing about an individual file aborts the pass. Unparseable names,
//! runs missing from the catalog, unreadable files and duplicate run ids are
//! recorded as [`SkippedFile`]s and counted in the [`CollectionSummary`].
//! Crashed runs are kept as all-zero rows and counted separately.
//!
//! # Example
//!
//! ```ignore
//! use mitigation_eval::prelude::*;
//!
//! let config = EvalConfig::default().with_threads(8);
//! let collector = ResultCollector::new(&config, RunCatalog::builtin());
//! let output = collector.collect("results/")?;
//!
//! println!("{} rows, {} skipped", output.rows.len(), output.summary.files_skipped);
//! ```

use crate::catalog::{CoreLayout, RunCatalog, Unresolved};
use crate::config::EvalConfig;
use crate::extractor::LogFieldExtractor;
use crate::run_id::{RunId, RunIdError, RunMode, SimType, LOG_EXTENSION};
use crate::speedup::{RunStatus, WeightedSpeedup};
use crate::{Error, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

// ============================================================================
// Results
// ============================================================================

/// One parsed and resolved run.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub run: RunId,
    pub speedup: WeightedSpeedup,

    /// Log file the row was computed from
    pub source: PathBuf,
}

impl ResultRow {
    /// Weighted speedup summed over cores.
    pub fn sum(&self) -> f64 {
        self.speedup.sum()
    }
}

/// Why a file produced no row.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SkipReason {
    #[error("unparseable file name: {0}")]
    UnparseableName(#[from] RunIdError),

    #[error("unresolved run: {0}")]
    Unresolved(#[from] Unresolved),

    #[error("unreadable log: {0}")]
    Unreadable(String),

    #[error("duplicate of an earlier log for the same run")]
    Duplicate,
}

/// A file that was discovered but produced no row.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// Counts describing one collection pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CollectionSummary {
    /// Simulation type collected
    pub sim_type: SimType,

    /// `*.out` files found under the root
    pub files_discovered: usize,

    /// Files belonging to another simulation type
    pub filtered_out: usize,

    /// Files parsed into rows
    pub files_processed: usize,

    /// Files skipped for any reason
    pub files_skipped: usize,

    pub skipped_unparseable_name: usize,
    pub skipped_unresolved: usize,
    pub skipped_unreadable: usize,
    pub skipped_duplicate: usize,

    /// Rows in the output table
    pub rows_produced: usize,

    /// Rows with no IPC or no fetched instructions and no fault marker
    pub crashed_runs: usize,

    /// Rows whose log carried the instrumentation fault marker,
    /// whether or not it also reported throughput
    pub faulted_runs: usize,

    pub threads_used: usize,
    pub elapsed_ms: u64,

    /// RFC 3339 completion timestamp
    pub generated_at: String,
}

impl CollectionSummary {
    /// Whether every matching file produced a row.
    pub fn all_processed(&self) -> bool {
        self.files_skipped == 0
    }
}

/// Rows, skipped files and summary of one pass.
#[derive(Debug, Clone)]
pub struct CollectionOutput {
    /// Rows sorted by (method, mode, config, run base)
    pub rows: Vec<ResultRow>,

    /// Skipped files sorted by path
    pub skipped: Vec<SkippedFile>,

    pub summary: CollectionSummary,

    /// Machine shape the rows were computed for
    pub core_count: usize,
}

impl CollectionOutput {
    /// Rows of one method.
    pub fn rows_for_method<'a>(&'a self, method: &'a str) -> impl Iterator<Item = &'a ResultRow> {
        self.rows.iter().filter(move |r| r.run.method == method)
    }

    /// Rows of one run mode.
    pub fn rows_for_mode(&self, mode: RunMode) -> impl Iterator<Item = &ResultRow> {
        self.rows.iter().filter(move |r| r.run.mode == mode)
    }

    /// Rows that did not complete successfully.
    pub fn invalid_rows(&self) -> impl Iterator<Item = &ResultRow> {
        self.rows.iter().filter(|r| !r.speedup.status.is_valid())
    }
}

// ============================================================================
// Progress Reporting
// ============================================================================

/// Progress information for callbacks.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Current file being processed
    pub current_file: String,

    /// Total number of files to process
    pub total_files: usize,

    /// Files finished so far (rows, filtered or skipped)
    pub completed: usize,

    /// Elapsed time since start
    pub elapsed: Duration,
}

impl ProgressInfo {
    /// Get completion percentage (0.0 to 100.0).
    pub fn percent_complete(&self) -> f64 {
        if self.total_files == 0 {
            100.0
        } else {
            self.completed as f64 / self.total_files as f64 * 100.0
        }
    }
}

/// Trait for progress reporting callbacks.
pub trait ProgressCallback: Send + Sync {
    /// Called when starting to process a file.
    fn on_progress(&self, info: &ProgressInfo);

    /// Called when the pass completes.
    fn on_complete(&self, summary: &CollectionSummary);
}

/// Simple console progress reporter.
#[derive(Debug, Default)]
pub struct ConsoleProgress;

impl ConsoleProgress {
    pub fn new() -> Self {
        Self
    }
}

impl ProgressCallback for ConsoleProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        println!(
            "[{:4}/{:4}] {} ({:.1}%)",
            info.completed + 1,
            info.total_files,
            info.current_file,
            info.percent_complete()
        );
    }

    fn on_complete(&self, summary: &CollectionSummary) {
        println!(
            "Collected {} rows from {} files in {} ms",
            summary.rows_produced, summary.files_discovered, summary.elapsed_ms
        );
    }
}

// ============================================================================
// Collector
// ============================================================================

enum FileOutcome {
    Row(Box<ResultRow>),
    Filtered,
    Skipped(SkippedFile),
}

/// Parallel collector turning simulator logs into result rows.
pub struct ResultCollector {
    catalog: Arc<RunCatalog>,
    extractor: LogFieldExtractor,
    layout: CoreLayout,
    sim_type: SimType,
    threads: Option<usize>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl ResultCollector {
    /// Create a collector for the given configuration and catalog.
    pub fn new(config: &EvalConfig, catalog: RunCatalog) -> Self {
        Self::with_shared_catalog(config, Arc::new(catalog))
    }

    /// Create a collector sharing an already loaded catalog.
    pub fn with_shared_catalog(config: &EvalConfig, catalog: Arc<RunCatalog>) -> Self {
        let collect = &config.collect;
        let extractor =
            LogFieldExtractor::new(collect.core_count).with_fault_marker(collect.fault_marker.clone());

        let mut collector = Self {
            catalog,
            extractor,
            layout: collect.core_layout(),
            sim_type: collect.sim_type,
            threads: config.batch.threads,
            progress_callback: None,
        };
        if config.batch.report_progress {
            collector = collector.with_progress_callback(Box::new(ConsoleProgress::new()));
        }
        collector
    }

    /// Set a progress callback.
    pub fn with_progress_callback(mut self, callback: Box<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(Arc::from(callback));
        self
    }

    pub fn catalog(&self) -> &RunCatalog {
        &self.catalog
    }

    pub fn sim_type(&self) -> SimType {
        self.sim_type
    }

    /// Recursively list `*.out` files under `root`, sorted by path.
    pub fn discover<P: AsRef<Path>>(root: P) -> Result<Vec<PathBuf>> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(Error::invalid_input(format!(
                "result root {} is not a directory",
                root.display()
            )));
        }

        let mut files = Vec::new();
        let mut pending = vec![root.to_path_buf()];
        while let Some(dir) = pending.pop() {
            for entry in fs::read_dir(&dir)? {
                let entry = entry?;
                let path = entry.path();
                let file_type = entry.file_type()?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if path.extension().map_or(false, |e| e == LOG_EXTENSION) {
                    files.push(path);
                }
            }
        }

        files.sort();
        Ok(files)
    }

    /// Discover and process every log under `root`.
    pub fn collect<P: AsRef<Path>>(&self, root: P) -> Result<CollectionOutput> {
        let files = Self::discover(&root)?;
        log::info!(
            "Discovered {} log files under {}",
            files.len(),
            root.as_ref().display()
        );
        self.collect_files(&files)
    }

    /// Process an explicit list of log files.
    pub fn collect_files<P: AsRef<Path> + Sync>(&self, files: &[P]) -> Result<CollectionOutput> {
        let start = Instant::now();
        let total_files = files.len();
        let threads_used = self.threads.unwrap_or_else(rayon::current_num_threads);
        let completed = AtomicUsize::new(0);

        // Local pool so collectors with different thread counts can coexist.
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads_used)
            .build()?;

        let outcomes: Vec<FileOutcome> = pool.install(|| {
            files
                .par_iter()
                .map(|file| {
                    let path = file.as_ref();
                    if let Some(ref callback) = self.progress_callback {
                        callback.on_progress(&ProgressInfo {
                            current_file: path.display().to_string(),
                            total_files,
                            completed: completed.load(Ordering::Relaxed),
                            elapsed: start.elapsed(),
                        });
                    }
                    let outcome = self.process_file(path);
                    completed.fetch_add(1, Ordering::Relaxed);
                    outcome
                })
                .collect()
        });

        let mut rows = Vec::new();
        let mut skipped = Vec::new();
        let mut filtered_out = 0usize;
        for outcome in outcomes {
            match outcome {
                FileOutcome::Row(row) => rows.push(*row),
                FileOutcome::Filtered => filtered_out += 1,
                FileOutcome::Skipped(file) => skipped.push(file),
            }
        }

        // Rows arrive in path order; the stable sort keeps the first path
        // for each run id, later ones are duplicates.
        rows.sort_by(|a, b| a.run.cmp(&b.run));
        let mut unique: Vec<ResultRow> = Vec::with_capacity(rows.len());
        for row in rows {
            let duplicate = unique.last().map_or(false, |prev: &ResultRow| {
                prev.run.method == row.run.method
                    && prev.run.mode == row.run.mode
                    && prev.run.config == row.run.config
                    && prev.run.run_base == row.run.run_base
            });
            if duplicate {
                log::warn!("Skipping {}: duplicate of run {}", row.source.display(), row.run);
                skipped.push(SkippedFile {
                    path: row.source,
                    reason: SkipReason::Duplicate,
                });
            } else {
                unique.push(row);
            }
        }
        skipped.sort_by(|a, b| a.path.cmp(&b.path));

        let summary = self.summarize(
            total_files,
            filtered_out,
            &unique,
            &skipped,
            threads_used,
            start.elapsed(),
        );
        log::info!(
            "Collected {} rows ({} skipped, {} other type, {} crashed, {} faulted) in {:?}",
            summary.rows_produced,
            summary.files_skipped,
            summary.filtered_out,
            summary.crashed_runs,
            summary.faulted_runs,
            start.elapsed()
        );

        if let Some(ref callback) = self.progress_callback {
            callback.on_complete(&summary);
        }

        Ok(CollectionOutput {
            rows: unique,
            skipped,
            summary,
            core_count: self.layout.core_count,
        })
    }

    /// Parse, filter, resolve and score one log file.
    fn process_file(&self, path: &Path) -> FileOutcome {
        let skip = |reason: SkipReason| {
            log::warn!("Skipping {}: {}", path.display(), reason);
            FileOutcome::Skipped(SkippedFile {
                path: path.to_path_buf(),
                reason,
            })
        };

        let run = match RunId::from_path(path) {
            Ok(run) => run,
            Err(e) => return skip(e.into()),
        };
        if !run.matches_type(self.sim_type) {
            return FileOutcome::Filtered;
        }

        let solo_ipcs = match self.catalog.solo_ipcs(&run, self.layout) {
            Ok(ipcs) => ipcs,
            Err(e) => return skip(e.into()),
        };

        let parsed = match self.extractor.extract_file(path) {
            Ok(parsed) => parsed,
            Err(e) => return skip(SkipReason::Unreadable(e.to_string())),
        };

        let speedup = WeightedSpeedup::compute(&parsed, &solo_ipcs);
        match speedup.status {
            RunStatus::Valid => log::debug!("{}: weighted speedup {:.4}", run, speedup.sum()),
            RunStatus::Crashed => log::warn!("{}: simulation reported no throughput", run),
            RunStatus::Faulted => log::warn!(
                "{}: instrumentation fault in log (weighted speedup {:.4})",
                run,
                speedup.sum()
            ),
        }

        FileOutcome::Row(Box::new(ResultRow {
            run,
            speedup,
            source: path.to_path_buf(),
        }))
    }

    fn summarize(
        &self,
        files_discovered: usize,
        filtered_out: usize,
        rows: &[ResultRow],
        skipped: &[SkippedFile],
        threads_used: usize,
        elapsed: Duration,
    ) -> CollectionSummary {
        let count_skips = |f: fn(&SkipReason) -> bool| skipped.iter().filter(|s| f(&s.reason)).count();
        let count_status = |status: RunStatus| rows.iter().filter(|r| r.speedup.status == status).count();

        CollectionSummary {
            sim_type: self.sim_type,
            files_discovered,
            filtered_out,
            files_processed: rows.len(),
            files_skipped: skipped.len(),
            skipped_unparseable_name: count_skips(|r| matches!(r, SkipReason::UnparseableName(_))),
            skipped_unresolved: count_skips(|r| matches!(r, SkipReason::Unresolved(_))),
            skipped_unreadable: count_skips(|r| matches!(r, SkipReason::Unreadable(_))),
            skipped_duplicate: count_skips(|r| matches!(r, SkipReason::Duplicate)),
            rows_produced: rows.len(),
            crashed_runs: count_status(RunStatus::Crashed),
            faulted_runs: count_status(RunStatus::Faulted),
            threads_used,
            elapsed_ms: elapsed.as_millis() as u64,
            generated_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_log(dir: &Path, name: &str, cores: &[u64], total: u64, ipc: &str) {
        let mut log = String::new();
        for (i, n) in cores.iter().enumerate() {
            log.push_str(&format!("  -- th[{i}] : retired {n} instrs\n"));
        }
        log.push_str(&format!(
            "  -- total number of fetched instructions : {total} (IPC = {ipc})\n"
        ));
        fs::write(dir.join(name), log).unwrap();
    }

    fn small_catalog() -> RunCatalog {
        RunCatalog::empty()
            .with_trace("a", 0.8)
            .with_trace("b", 0.4)
            .with_mix("ab", vec!["a", "b"])
    }

    fn config() -> EvalConfig {
        EvalConfig::new().with_cores(2, 1).with_threads(2)
    }

    #[test]
    fn test_discover_recurses_and_sorts() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("para").join("benign");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("z.out"), "").unwrap();
        fs::write(dir.path().join("a.out"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let files = ResultCollector::discover(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_discover_missing_root() {
        let result = ResultCollector::discover("/definitely/not/a/result/root");
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_collect_counts_and_rows() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write_log(root, "benign.para.512.rate.a.out", &[100, 100], 200, "1.0");
        write_log(root, "benign.para.512.mix.ab.out", &[100, 100], 200, "1.0");
        write_log(root, "baseline.rate.a.out", &[200, 200], 400, "1.0");
        write_log(root, "malicious.para.512.rate.a.out", &[100, 100], 200, "1.0");
        write_log(root, "benign.para.512.rate.unknown.out", &[1, 1], 2, "1.0");
        write_log(root, "junk.out", &[1], 1, "1.0");
        write_log(root, "benign.para.64.rate.a.out", &[1, 1], 2, "0");

        let collector = ResultCollector::new(&config(), small_catalog());
        let output = collector.collect(root).unwrap();
        let s = &output.summary;

        assert_eq!(s.files_discovered, 7);
        assert_eq!(s.filtered_out, 1);
        assert_eq!(s.rows_produced, 4);
        assert_eq!(s.files_skipped, 2);
        assert_eq!(s.skipped_unresolved, 1);
        assert_eq!(s.skipped_unparseable_name, 1);
        assert_eq!(s.crashed_runs, 1);
        assert!(!s.all_processed());

        let names: Vec<String> = output.rows.iter().map(|r| r.run.run_base.clone()).collect();
        assert_eq!(names, vec!["rate.a", "mix.ab", "rate.a", "rate.a"]);

        // mix: 100/200/0.8 + 100/200/0.4
        let mix = output.rows.iter().find(|r| r.run.mode == RunMode::Mix).unwrap();
        assert!((mix.sum() - (0.625 + 1.25)).abs() < 1e-12);

        assert_eq!(output.invalid_rows().count(), 1);
        assert_eq!(output.rows_for_method("baseline").count(), 1);
    }

    #[test]
    fn test_row_order_numeric_configs_first() {
        let dir = TempDir::new().unwrap();
        for config in ["ooc", "1024", "128", "none"] {
            write_log(
                dir.path(),
                &format!("benign.rowarmor.{config}.rate.a.out"),
                &[1, 1],
                2,
                "1.0",
            );
        }
        let collector = ResultCollector::new(&config(), small_catalog());
        let output = collector.collect(dir.path()).unwrap();
        let configs: Vec<&str> = output.rows.iter().map(|r| r.run.config.as_str()).collect();
        assert_eq!(configs, vec!["128", "1024", "none", "ooc"]);
    }

    #[test]
    fn test_duplicate_runs_are_skipped() {
        let dir = TempDir::new().unwrap();
        let other = dir.path().join("copy");
        fs::create_dir_all(&other).unwrap();
        write_log(dir.path(), "benign.para.512.rate.a.out", &[1, 1], 2, "1.0");
        write_log(&other, "benign.para.512.rate.a.out", &[1, 1], 2, "1.0");

        let collector = ResultCollector::new(&config(), small_catalog());
        let output = collector.collect(dir.path()).unwrap();
        assert_eq!(output.summary.rows_produced, 1);
        assert_eq!(output.summary.skipped_duplicate, 1);
        assert_eq!(output.skipped[0].path, other.join("benign.para.512.rate.a.out"));
    }

    #[test]
    fn test_progress_info_percent() {
        let info = ProgressInfo {
            current_file: "x.out".to_string(),
            total_files: 4,
            completed: 1,
            elapsed: Duration::from_secs(1),
        };
        assert_eq!(info.percent_complete(), 25.0);
    }
}
