//! Solo-IPC calibration from single-core baseline runs.
//!
//! A trace's solo IPC is the IPC it reaches running alone on an unmitigated
//! machine, i.e. the `IPC = ` value of its `baseline.single.<trace>.out` log
//! (or the typed `benign.baseline.none.single.<trace>.out` form). Calibration
//! measures these values so catalogs need not be maintained by hand.
//!
//! Malicious baselines share the machine with aggressors and are ignored. When
//! one trace has several solo logs, the first in path order wins and the rest
//! are recorded in [`Calibration::duplicates`].

use crate::catalog::RunCatalog;
use crate::collector::ResultCollector;
use crate::extractor::LogFieldExtractor;
use crate::run_id::{RunId, RunMode, SimType};
use crate::Result;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Solo IPCs measured under one result root.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Calibration {
    /// Trace name → measured IPC, only for runs that reported throughput
    pub ipcs: BTreeMap<String, f64>,

    /// Traces whose single run reported no IPC
    pub crashed: Vec<String>,

    /// Single-mode baseline logs that could not be read
    pub unreadable: Vec<PathBuf>,

    /// Logs for a trace that an earlier log already calibrated
    pub duplicates: Vec<PathBuf>,
}

impl Calibration {
    /// Scan `root` for single-mode baseline logs and read their IPC.
    pub fn measure<P: AsRef<Path>>(root: P, extractor: &LogFieldExtractor) -> Result<Self> {
        let mut calibration = Self::default();
        let mut seen = BTreeSet::new();

        for path in ResultCollector::discover(root)? {
            let run = match RunId::from_path(&path) {
                Ok(run)
                    if run.is_baseline()
                        && run.mode == RunMode::Single
                        && run.matches_type(SimType::Benign) =>
                {
                    run
                }
                _ => continue,
            };
            let trace = run.workload().to_string();
            if seen.contains(&trace) {
                log::warn!("{trace}: ignoring duplicate solo log {}", path.display());
                calibration.duplicates.push(path);
                continue;
            }

            let parsed = match extractor.extract_file(&path) {
                Ok(parsed) => parsed,
                Err(e) => {
                    log::warn!("Skipping {}: {}", path.display(), e);
                    calibration.unreadable.push(path);
                    continue;
                }
            };

            seen.insert(trace.clone());
            if parsed.ipc > 0.0 {
                log::debug!("{trace}: solo IPC {}", parsed.ipc);
                calibration.ipcs.insert(trace, parsed.ipc);
            } else {
                log::warn!("{trace}: single run reported no IPC");
                calibration.crashed.push(trace);
            }
        }

        log::info!(
            "Measured {} solo IPCs ({} crashed, {} unreadable, {} duplicate)",
            calibration.ipcs.len(),
            calibration.crashed.len(),
            calibration.unreadable.len(),
            calibration.duplicates.len()
        );
        Ok(calibration)
    }

    /// Catalog with the measured IPCs replacing or extending `base`.
    pub fn apply(&self, base: RunCatalog) -> RunCatalog {
        base.with_trace_ipcs(&self.ipcs)
    }

    pub fn is_empty(&self) -> bool {
        self.ipcs.is_empty()
    }
}
