//! Typed run identifiers parsed from simulator output file names.
//!
//! The simulation scripts name every output log after the run that produced it:
//!
//! ```text
//! {type}.{method...}.{config}.{mode}.{workload...}.out
//! benign.para.cube.512.rate.505_old.3185.out
//! malicious.rowarmor.ooc.mix.high.out
//! ```
//!
//! The mode token (`single`, `rate` or `mix`) is the anchor: everything before it
//! is the simulation type, the mitigation method (which may itself contain dots)
//! and the mitigation parameter; everything from it onward is the run base.
//! Baseline runs were historically written without type and config:
//!
//! ```text
//! baseline.rate.505_old.3185.out   →   method "baseline", config "none", benign
//! ```
//!
//! The legacy form only ever described benign machines; malicious baselines are
//! always written as `malicious.baseline.none.{mode}.{workload}.out`.
//!
//! A name is parsed exactly once into a [`RunId`]; rejected names carry a
//! [`RunIdError`] describing why.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::Path;

/// Output log extension.
pub const LOG_EXTENSION: &str = "out";

/// Method name of the unmitigated reference configuration.
pub const BASELINE_METHOD: &str = "baseline";

/// Config value used by baseline runs.
pub const BASELINE_CONFIG: &str = "none";

/// Co-scheduling pattern of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// One program on one core (solo IPC calibration runs)
    Single,
    /// N copies of the same trace, one per core
    Rate,
    /// A fixed heterogeneous assignment of traces to cores
    Mix,
}

impl RunMode {
    /// Parse a file-name token.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "single" => Some(Self::Single),
            "rate" => Some(Self::Rate),
            "mix" => Some(Self::Mix),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Rate => "rate",
            Self::Mix => "mix",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Simulation type: benign runs use every core for workload programs,
/// malicious runs reserve the first cores for RowHammer aggressors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimType {
    #[default]
    Benign,
    Malicious,
}

impl SimType {
    /// Parse a file-name token.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "benign" => Some(Self::Benign),
            "malicious" => Some(Self::Malicious),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Benign => "benign",
            Self::Malicious => "malicious",
        }
    }
}

impl fmt::Display for SimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SimType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_token(s).ok_or_else(|| format!("unsupported simulation type '{s}'"))
    }
}

/// Why a file name could not be turned into a [`RunId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunIdError {
    #[error("file name does not end in .out")]
    NotAnOutputFile,

    #[error("file name contains an empty token")]
    EmptyToken,

    #[error("no mode token (single/rate/mix) followed by a workload")]
    MissingModeAnchor,

    #[error("expected type.method.config before the mode token")]
    TooFewTokens,

    #[error("unknown simulation type '{0}'")]
    UnknownSimType(String),
}

/// Identity of one simulated workload instance.
///
/// Ordering is the deterministic output order of result tables:
/// method, mode, config (see [`compare_configs`]), then run base.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RunId {
    /// `None` for legacy baseline logs that carry no type token
    pub sim_type: Option<SimType>,
    pub method: String,
    pub config: String,
    pub mode: RunMode,
    /// Workload name including its mode prefix, e.g. `rate.500_old.6468` or `mix.high`
    pub run_base: String,
}

impl RunId {
    /// Parse an output log file name such as `benign.para.512.rate.500_old.6468.out`.
    pub fn parse_file_name(name: &str) -> Result<Self, RunIdError> {
        let stem = name
            .strip_suffix(LOG_EXTENSION)
            .and_then(|s| s.strip_suffix('.'))
            .ok_or(RunIdError::NotAnOutputFile)?;

        let tokens: Vec<&str> = stem.split('.').collect();
        if tokens.iter().any(|t| t.is_empty()) {
            return Err(RunIdError::EmptyToken);
        }

        // First mode token that still has a workload after it.
        let anchor = (1..tokens.len().saturating_sub(1))
            .find(|&i| RunMode::from_token(tokens[i]).is_some())
            .ok_or(RunIdError::MissingModeAnchor)?;
        let mode = RunMode::from_token(tokens[anchor]).ok_or(RunIdError::MissingModeAnchor)?;
        let run_base = tokens[anchor..].join(".");

        if anchor == 1 && tokens[0] == BASELINE_METHOD {
            return Ok(Self {
                sim_type: None,
                method: BASELINE_METHOD.to_string(),
                config: BASELINE_CONFIG.to_string(),
                mode,
                run_base,
            });
        }

        if anchor < 3 {
            return Err(RunIdError::TooFewTokens);
        }

        let sim_type = SimType::from_token(tokens[0])
            .ok_or_else(|| RunIdError::UnknownSimType(tokens[0].to_string()))?;

        Ok(Self {
            sim_type: Some(sim_type),
            method: tokens[1..anchor - 1].join("."),
            config: tokens[anchor - 1].to_string(),
            mode,
            run_base,
        })
    }

    /// Parse the file-name component of a path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, RunIdError> {
        let name = path
            .as_ref()
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or(RunIdError::NotAnOutputFile)?;
        Self::parse_file_name(name)
    }

    /// Simulation type the run was simulated as; untyped logs are benign.
    pub fn effective_sim_type(&self) -> SimType {
        self.sim_type.unwrap_or(SimType::Benign)
    }

    /// Whether this run belongs to the given simulation type.
    pub fn matches_type(&self, sim_type: SimType) -> bool {
        self.effective_sim_type() == sim_type
    }

    pub fn is_baseline(&self) -> bool {
        self.method == BASELINE_METHOD
    }

    /// Run base without its mode prefix: `500_old.6468` for `rate.500_old.6468`.
    pub fn workload(&self) -> &str {
        self.run_base
            .strip_prefix(self.mode.as_str())
            .and_then(|s| s.strip_prefix('.'))
            .unwrap_or(&self.run_base)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(t) = self.sim_type {
            write!(f, "{t}.")?;
        }
        write!(f, "{}.{}.{}", self.method, self.config, self.run_base)
    }
}

impl Ord for RunId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.method
            .cmp(&other.method)
            .then_with(|| self.mode.as_str().cmp(other.mode.as_str()))
            .then_with(|| compare_configs(&self.config, &other.config))
            .then_with(|| self.run_base.cmp(&other.run_base))
            .then_with(|| self.sim_type.map(|t| t.as_str()).cmp(&other.sim_type.map(|t| t.as_str())))
    }
}

impl PartialOrd for RunId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Order mitigation configs: numeric thresholds first, ascending, then
/// non-numeric sentinels (`none`, `ooc`, ...) alphabetically.
pub fn compare_configs(a: &str, b: &str) -> Ordering {
    let parse = |s: &str| s.parse::<f64>().ok().filter(|v| v.is_finite());
    match (parse(a), parse(b)) {
        (Some(x), Some(y)) => x.total_cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}
