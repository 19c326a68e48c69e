//! Field extraction from simulator output logs.
//!
//! A simulator log is scanned once, line by line, for three line shapes:
//!
//! | Marker | Field | Position |
//! |--------|-------|----------|
//! | `-- th[` | retired instructions of one core | 5th whitespace token |
//! | `total number of fetched instructions` | total fetched instructions | 10th token of a split on `' '` |
//! | `IPC = ` | overall IPC | text between `IPC = ` and the next `)` |
//!
//! Logs of crashed simulations are routinely truncated or garbled, so malformed
//! numbers degrade to `0` and the per-core vector is always padded or truncated
//! to the configured core count. The only failure is an unreadable stream.
//!
//! # Example
//!
//! ```ignore
//! use mitigation_eval::extractor::LogFieldExtractor;
//!
//! let extractor = LogFieldExtractor::new(16);
//! let parsed = extractor.extract_file("benign.para.512.rate.500_old.6468.out")?;
//! println!("IPC = {}", parsed.ipc);
//! ```

use crate::Result;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Marker of a per-core statistics line.
pub const CORE_LINE_MARKER: &str = "-- th[";

/// Marker of the total fetched-instruction line.
pub const TOTAL_INSTRUCTIONS_MARKER: &str = "total number of fetched instructions";

/// Marker preceding the overall IPC value.
pub const IPC_MARKER: &str = "IPC = ";

/// Line printed by the instrumentation front-end when a traced program segfaults.
pub const DEFAULT_FAULT_MARKER: &str = "C: Tool (or Pin) caused signal 11";

const CORE_INSTRUCTIONS_TOKEN: usize = 4;
const TOTAL_INSTRUCTIONS_TOKEN: usize = 9;

/// Fields extracted from one simulator log.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLog {
    /// Retired instructions per core, exactly `core_count` entries
    pub per_core_instructions: Vec<u64>,

    /// Total fetched instructions across all cores
    pub total_fetched_instructions: u64,

    /// Overall IPC; `0.0` means the run crashed or never reported it
    pub ipc: f64,

    /// The instrumentation fault marker appeared in the log
    pub fault_detected: bool,

    /// Number of per-core lines seen before padding/truncation
    pub core_lines_seen: usize,
}

impl ParsedLog {
    /// Whether the log describes a run that completed and reported throughput.
    pub fn is_valid_run(&self) -> bool {
        self.ipc > 0.0 && self.total_fetched_instructions > 0
    }

    /// Simulated cycles implied by the totals, `None` for invalid runs.
    pub fn cycles(&self) -> Option<f64> {
        if self.is_valid_run() {
            Some(self.total_fetched_instructions as f64 / self.ipc)
        } else {
            None
        }
    }
}

/// Extracts [`ParsedLog`] values from simulator output.
#[derive(Debug, Clone)]
pub struct LogFieldExtractor {
    core_count: usize,
    fault_marker: String,
}

impl LogFieldExtractor {
    /// Create an extractor normalizing per-core data to `core_count` entries.
    pub fn new(core_count: usize) -> Self {
        Self {
            core_count,
            fault_marker: DEFAULT_FAULT_MARKER.to_string(),
        }
    }

    /// Use a different fault marker line.
    pub fn with_fault_marker(mut self, marker: impl Into<String>) -> Self {
        self.fault_marker = marker.into();
        self
    }

    pub fn core_count(&self) -> usize {
        self.core_count
    }

    /// Open and scan a log file.
    pub fn extract_file<P: AsRef<Path>>(&self, path: P) -> Result<ParsedLog> {
        let file = File::open(path)?;
        self.extract(BufReader::new(file))
    }

    /// Scan a log stream.
    ///
    /// Lines are decoded lossily so Latin-1 output never aborts the scan.
    pub fn extract<R: BufRead>(&self, mut reader: R) -> Result<ParsedLog> {
        let mut per_core_instructions = Vec::with_capacity(self.core_count);
        let mut total_fetched_instructions = 0u64;
        let mut ipc = 0.0f64;
        let mut fault_detected = false;

        let mut buf = Vec::with_capacity(256);
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);

            if line.contains(CORE_LINE_MARKER) {
                per_core_instructions.push(parse_core_instructions(&line));
            }
            if line.contains(TOTAL_INSTRUCTIONS_MARKER) {
                total_fetched_instructions = parse_total_instructions(&line);
            }
            if line.contains(IPC_MARKER) {
                ipc = parse_ipc(&line);
            }
            if !fault_detected && !self.fault_marker.is_empty() && line.contains(&self.fault_marker)
            {
                fault_detected = true;
            }
        }

        let core_lines_seen = per_core_instructions.len();
        if core_lines_seen != self.core_count {
            log::debug!(
                "Normalizing {} per-core lines to {} cores",
                core_lines_seen,
                self.core_count
            );
        }
        per_core_instructions.resize(self.core_count, 0);

        Ok(ParsedLog {
            per_core_instructions,
            total_fetched_instructions,
            ipc,
            fault_detected,
            core_lines_seen,
        })
    }
}

/// 5th whitespace-delimited token of a `-- th[` line, `0` when absent or garbled.
fn parse_core_instructions(line: &str) -> u64 {
    line.split_whitespace()
        .nth(CORE_INSTRUCTIONS_TOKEN)
        .and_then(|tok| tok.parse().ok())
        .unwrap_or(0)
}

/// 10th single-space-delimited token of the total line, `0` when absent or garbled.
fn parse_total_instructions(line: &str) -> u64 {
    line.split(' ')
        .nth(TOTAL_INSTRUCTIONS_TOKEN)
        .and_then(|tok| tok.trim().parse().ok())
        .unwrap_or(0)
}

/// Value between `IPC = ` and the next `)`; negative or non-finite values read as `0`.
fn parse_ipc(line: &str) -> f64 {
    line.split_once(IPC_MARKER)
        .map(|(_, rest)| rest.split(')').next().unwrap_or(rest))
        .and_then(|tok| tok.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or(0.0)
}
