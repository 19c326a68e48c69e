//! Run catalog: solo-execution IPCs and mix workload assignments.
//!
//! The catalog answers one question for the speedup calculator: for a given run,
//! what is the solo IPC of the program on each benign core?
//!
//! - `single.<trace>`: the trace's IPC on core 0
//! - `rate.<trace>`: the trace's IPC replicated on every benign core
//! - `mix.<name>`: per-core lookup through the mix assignment table
//!
//! In malicious simulations the first `aggressor_cores` cores run the attack
//! program, so rate runs cover the remaining cores and mix runs skip the first
//! `aggressor_cores` entries of their assignment.
//!
//! Everything is keyed by name. The built-in catalog holds the SPEC CPU2017
//! SimPoint traces and mix workloads of the study; a TOML file can replace it:
//!
//! ```toml
//! [traces]
//! "500_old.6468" = 0.803
//! "505_old.3185" = 0.93
//!
//! [mixes]
//! high = ["505_old.3185", "500_old.6468"]
//! ```

use crate::run_id::{RunId, RunMode, SimType};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Solo IPC of every trace, measured from baseline single-core runs.
const DEFAULT_TRACE_IPCS: [(&str, f64); 28] = [
    ("500_old.6468", 0.803),
    ("505_old.3185", 0.93),
    ("505_old.3581", 0.81),
    ("505_old.5653", 1.027),
    ("505_old.6834", 0.834),
    ("507_old.6835", 1.221),
    ("510_old.17633", 1.394),
    ("511_old.7030", 1.007),
    ("519_old.228", 0.69),
    ("519_old.5059", 0.607),
    ("519_old.7103", 0.655),
    ("519_old.13461", 0.606),
    ("520_old.3162", 0.539),
    ("520_old.6293", 0.557),
    ("523_old.1214", 0.419),
    ("523_old.9188", 1.008),
    ("525_old.5092", 2.436),
    ("526_old.6508", 1.691),
    ("527_old.25724", 1.428),
    ("531_old.3142", 1.199),
    ("541_old.12100", 1.234),
    ("548_old.22002", 1.736),
    ("549_old.9406", 0.43),
    ("549_old.8717", 0.354),
    ("549_old.15239", 1.367),
    ("549_old.18663", 0.704),
    ("554_old.1975", 0.89),
    ("554_old.21190", 0.904),
];

/// Mix workloads as indices into `DEFAULT_TRACE_IPCS`, one per core slot.
/// `high` groups the most memory-intensive traces.
const DEFAULT_MIXES: [(&str, [usize; 16]); 34] = [
    ("high", [1, 5, 10, 23, 2, 11, 12, 22, 3, 8, 24, 26, 4, 9, 25, 27]),
    ("blend", [0, 12, 16, 20, 6, 13, 17, 21, 7, 14, 18, 25, 10, 15, 19, 27]),
    ("0", [19, 17, 22, 11, 18, 18, 23, 5, 24, 26, 10, 12, 20, 25, 11, 9]),
    ("1", [12, 22, 6, 24, 21, 27, 11, 3, 13, 26, 20, 12, 2, 16, 22, 21]),
    ("2", [11, 12, 12, 25, 23, 25, 9, 21, 0, 26, 11, 19, 3, 14, 7, 5]),
    ("3", [25, 27, 10, 21, 22, 19, 14, 19, 8, 25, 6, 17, 2, 20, 16, 19]),
    ("4", [18, 24, 1, 2, 13, 20, 19, 1, 21, 0, 20, 6, 6, 3, 9, 6]),
    ("5", [14, 23, 25, 18, 10, 0, 25, 19, 10, 13, 18, 25, 7, 17, 1, 24]),
    ("6", [17, 23, 20, 9, 27, 6, 19, 5, 16, 16, 16, 5, 24, 21, 1, 23]),
    ("7", [15, 22, 23, 18, 14, 0, 25, 16, 15, 17, 24, 20, 23, 11, 23, 17]),
    ("8", [25, 18, 20, 8, 8, 2, 22, 4, 1, 5, 10, 26, 2, 6, 14, 17]),
    ("9", [26, 8, 1, 17, 4, 13, 11, 19, 22, 1, 13, 9, 23, 4, 1, 20]),
    ("10", [14, 11, 12, 2, 6, 11, 21, 21, 20, 19, 8, 22, 6, 6, 4, 15]),
    ("11", [12, 19, 13, 17, 8, 5, 7, 22, 26, 10, 12, 19, 6, 25, 24, 19]),
    ("12", [13, 5, 22, 15, 19, 22, 20, 10, 1, 0, 17, 19, 6, 20, 13, 9]),
    ("13", [24, 17, 10, 24, 12, 27, 11, 7, 9, 14, 18, 12, 20, 12, 4, 19]),
    ("14", [26, 8, 24, 23, 7, 12, 26, 22, 2, 14, 22, 0, 10, 2, 26, 8]),
    ("15", [15, 16, 26, 19, 12, 4, 1, 27, 16, 18, 12, 6, 20, 14, 3, 21]),
    ("16", [7, 9, 1, 15, 25, 22, 6, 11, 17, 10, 8, 18, 3, 21, 27, 21]),
    ("17", [4, 16, 24, 18, 21, 20, 1, 20, 17, 15, 9, 0, 4, 4, 14, 2]),
    ("18", [27, 20, 23, 19, 15, 14, 23, 23, 0, 5, 25, 6, 5, 7, 24, 7]),
    ("19", [20, 1, 22, 20, 25, 14, 14, 22, 25, 12, 21, 9, 24, 10, 0, 22]),
    ("20", [13, 11, 25, 20, 3, 25, 5, 2, 22, 0, 9, 20, 21, 27, 6, 5]),
    ("21", [21, 6, 3, 2, 5, 17, 20, 12, 18, 19, 7, 1, 13, 7, 21, 25]),
    ("22", [13, 10, 27, 17, 14, 15, 23, 6, 2, 2, 2, 27, 20, 21, 4, 11]),
    ("23", [8, 18, 12, 0, 0, 25, 21, 7, 1, 17, 17, 3, 27, 20, 12, 8]),
    ("24", [16, 17, 9, 4, 22, 0, 27, 27, 13, 9, 15, 11, 1, 24, 21, 10]),
    ("25", [0, 24, 19, 1, 2, 24, 25, 1, 26, 24, 11, 25, 13, 19, 13, 12]),
    ("26", [15, 5, 0, 15, 21, 27, 5, 6, 2, 13, 6, 2, 17, 20, 16, 25]),
    ("27", [25, 5, 13, 7, 19, 26, 2, 7, 16, 5, 13, 0, 13, 16, 17, 24]),
    ("28", [9, 3, 22, 20, 10, 9, 1, 22, 15, 11, 26, 10, 0, 24, 11, 18]),
    ("29", [18, 10, 22, 6, 3, 17, 0, 22, 1, 12, 22, 16, 12, 1, 25, 12]),
    ("30", [0, 20, 1, 21, 19, 13, 23, 14, 2, 10, 19, 16, 19, 14, 17, 16]),
    ("31", [6, 2, 14, 18, 21, 27, 24, 11, 23, 11, 1, 4, 4, 3, 7, 25]),
];

/// Machine shape a run was simulated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreLayout {
    /// Cores of the simulated machine
    pub core_count: usize,
    /// Cores running the attack program in malicious simulations
    pub aggressor_cores: usize,
}

impl CoreLayout {
    pub fn new(core_count: usize, aggressor_cores: usize) -> Self {
        Self {
            core_count,
            aggressor_cores,
        }
    }

    /// Leading cores not running a workload program for this simulation type.
    fn reserved_cores(&self, sim_type: SimType) -> usize {
        match sim_type {
            SimType::Malicious => self.aggressor_cores.min(self.core_count),
            SimType::Benign => 0,
        }
    }
}

/// Why a run could not be resolved against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Unresolved {
    #[error("trace '{0}' has no solo IPC in the catalog")]
    UnknownTrace(String),

    #[error("mix workload '{0}' is not in the catalog")]
    UnknownMix(String),

    #[error("mix workload '{name}' assigns {available} cores, run needs {needed}")]
    MixTooShort {
        name: String,
        needed: usize,
        available: usize,
    },
}

/// Immutable registry of solo IPCs and mix assignments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunCatalog {
    /// Trace name → solo IPC
    pub traces: BTreeMap<String, f64>,

    /// Mix workload name (without the `mix.` prefix) → trace on each core slot
    #[serde(default)]
    pub mixes: BTreeMap<String, Vec<String>>,
}

impl Default for RunCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RunCatalog {
    /// Catalog of the SPEC CPU2017 traces and mixes used in the study.
    pub fn builtin() -> Self {
        let traces = DEFAULT_TRACE_IPCS
            .iter()
            .map(|(name, ipc)| (name.to_string(), *ipc))
            .collect();
        let mixes = DEFAULT_MIXES
            .iter()
            .map(|(name, slots)| {
                let assignment = slots
                    .iter()
                    .map(|&idx| DEFAULT_TRACE_IPCS[idx].0.to_string())
                    .collect();
                (name.to_string(), assignment)
            })
            .collect();
        Self { traces, mixes }
    }

    /// Empty catalog, to be filled programmatically.
    pub fn empty() -> Self {
        Self {
            traces: BTreeMap::new(),
            mixes: BTreeMap::new(),
        }
    }

    /// Add or replace a trace's solo IPC.
    pub fn with_trace(mut self, name: impl Into<String>, ipc: f64) -> Self {
        self.traces.insert(name.into(), ipc);
        self
    }

    /// Add or replace a mix assignment.
    pub fn with_mix<S: Into<String>>(mut self, name: impl Into<String>, traces: Vec<S>) -> Self {
        self.mixes
            .insert(name.into(), traces.into_iter().map(Into::into).collect());
        self
    }

    /// Replace solo IPCs with measured values; unknown traces are added.
    pub fn with_trace_ipcs(mut self, ipcs: &BTreeMap<String, f64>) -> Self {
        for (name, ipc) in ipcs {
            self.traces.insert(name.clone(), *ipc);
        }
        self
    }

    pub fn trace_ipc(&self, trace: &str) -> Option<f64> {
        self.traces.get(trace).copied()
    }

    pub fn mix(&self, name: &str) -> Option<&[String]> {
        self.mixes.get(name).map(Vec::as_slice)
    }

    /// Solo IPC of the program on each benign core of `run`.
    ///
    /// The returned vector covers cores from the first benign core onward, so
    /// index `i` matches the `i`-th per-core line of the run's log.
    pub fn solo_ipcs(&self, run: &RunId, layout: CoreLayout) -> std::result::Result<Vec<f64>, Unresolved> {
        let reserved = layout.reserved_cores(run.effective_sim_type());
        let benign_cores = layout.core_count - reserved;
        let workload = run.workload();

        match run.mode {
            RunMode::Single => {
                let ipc = self.lookup(workload)?;
                Ok(vec![ipc; layout.core_count.min(1)])
            }
            RunMode::Rate => {
                let ipc = self.lookup(workload)?;
                Ok(vec![ipc; benign_cores])
            }
            RunMode::Mix => {
                let assignment = self
                    .mixes
                    .get(workload)
                    .ok_or_else(|| Unresolved::UnknownMix(workload.to_string()))?;
                if assignment.len() < layout.core_count {
                    return Err(Unresolved::MixTooShort {
                        name: workload.to_string(),
                        needed: layout.core_count,
                        available: assignment.len(),
                    });
                }
                assignment[reserved..layout.core_count]
                    .iter()
                    .map(|trace| self.lookup(trace))
                    .collect()
            }
        }
    }

    fn lookup(&self, trace: &str) -> std::result::Result<f64, Unresolved> {
        self.trace_ipc(trace)
            .ok_or_else(|| Unresolved::UnknownTrace(trace.to_string()))
    }

    /// Validate the catalog.
    ///
    /// Returns Ok(()) if valid, Err(msg) otherwise.
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (name, ipc) in &self.traces {
            if name.is_empty() {
                return Err("trace names must be non-empty".to_string());
            }
            if !ipc.is_finite() || *ipc <= 0.0 {
                return Err(format!("trace '{name}' has invalid solo IPC {ipc}"));
            }
        }
        for (name, assignment) in &self.mixes {
            if assignment.is_empty() {
                return Err(format!("mix '{name}' assigns no traces"));
            }
            if let Some(unknown) = assignment.iter().find(|t| !self.traces.contains_key(*t)) {
                return Err(format!("mix '{name}' references unknown trace '{unknown}'"));
            }
        }
        Ok(())
    }

    /// Save the catalog to a TOML file.
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        fs::write(path, toml_string)?;
        Ok(())
    }

    /// Load and validate a catalog from a TOML file.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let catalog: RunCatalog = toml::from_str(&contents)?;
        catalog.validate().map_err(Error::catalog)?;
        Ok(catalog)
    }
}
