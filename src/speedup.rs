//! Weighted-speedup computation for one simulated run.
//!
//! For a run that completed, with `cycles = total_fetched / ipc`:
//!
//! ```text
//! speedup[i] = (instructions[i] / cycles) / solo_ipc[i]
//! ```
//!
//! i.e. each core's achieved IPC relative to the IPC its program reaches when
//! running alone. The weighted speedup of the run is the sum over cores.
//!
//! Runs that crashed (`ipc == 0` or no fetched instructions) yield an all-zero
//! vector, which is what downstream tables expect; the [`RunStatus`] keeps the
//! distinction between a crash and a legitimately small speedup.
//!
//! A log carrying the instrumentation fault marker is always [`RunStatus::Faulted`].
//! If it still reported throughput its speedup is kept as computed, so tables
//! match a plain field scan; the status lets callers flag or rerun it.

use crate::extractor::ParsedLog;
use serde::{Deserialize, Serialize};

/// Outcome of a simulated run as seen from its log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Run completed and reported throughput
    Valid,
    /// Run reported no IPC or no fetched instructions
    Crashed,
    /// Instrumentation fault marker present, with or without throughput
    Faulted,
}

impl RunStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Per-core weighted speedup of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedSpeedup {
    /// One entry per configured core; cores without a workload program are `0`
    pub per_core: Vec<f64>,
    pub status: RunStatus,
}

impl WeightedSpeedup {
    /// All-zero speedup for a run that produced no usable throughput.
    pub fn zeroed(core_count: usize, status: RunStatus) -> Self {
        Self {
            per_core: vec![0.0; core_count],
            status,
        }
    }

    /// Compute the speedup of a parsed log against per-core solo IPCs.
    ///
    /// `solo_ipcs[i]` is the reference IPC of the program on core `i`. It may be
    /// shorter than the core count (e.g. when aggressor cores are excluded);
    /// cores past its end contribute `0`.
    pub fn compute(parsed: &ParsedLog, solo_ipcs: &[f64]) -> Self {
        let core_count = parsed.per_core_instructions.len();

        let cycles = match parsed.cycles() {
            Some(c) => c,
            None => {
                let status = if parsed.fault_detected {
                    RunStatus::Faulted
                } else {
                    RunStatus::Crashed
                };
                return Self::zeroed(core_count, status);
            }
        };

        let per_core = parsed
            .per_core_instructions
            .iter()
            .enumerate()
            .map(|(core, &instrs)| match solo_ipcs.get(core) {
                Some(&solo) if solo > 0.0 => (instrs as f64 / cycles) / solo,
                _ => 0.0,
            })
            .collect();

        let status = if parsed.fault_detected {
            RunStatus::Faulted
        } else {
            RunStatus::Valid
        };
        Self { per_core, status }
    }

    /// Weighted speedup of the whole run.
    pub fn sum(&self) -> f64 {
        self.per_core.iter().sum()
    }

    pub fn core_count(&self) -> usize {
        self.per_core.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(instrs: Vec<u64>, total: u64, ipc: f64) -> ParsedLog {
        ParsedLog {
            core_lines_seen: instrs.len(),
            per_core_instructions: instrs,
            total_fetched_instructions: total,
            ipc,
            fault_detected: false,
        }
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-12, "{a} != {b}");
    }

    #[test]
    fn test_rate_mode_example() {
        let log = parsed(vec![300000, 250000, 200000, 150000], 1200000, 1.2);
        let ws = WeightedSpeedup::compute(&log, &[0.8; 4]);

        assert_eq!(ws.status, RunStatus::Valid);
        let expected = [0.375, 0.3125, 0.25, 0.1875];
        for (got, want) in ws.per_core.iter().zip(expected) {
            assert_close(*got, want);
        }
        assert_close(ws.sum(), 1.125);
    }

    #[test]
    fn test_zero_ipc_is_all_zero() {
        let log = parsed(vec![5, 6, 7], 18, 0.0);
        let ws = WeightedSpeedup::compute(&log, &[1.0; 3]);
        assert_eq!(ws.per_core, vec![0.0; 3]);
        assert_eq!(ws.status, RunStatus::Crashed);
        assert!(!ws.status.is_valid());
    }

    #[test]
    fn test_zero_total_is_all_zero() {
        let log = parsed(vec![5, 6], 0, 1.5);
        let ws = WeightedSpeedup::compute(&log, &[1.0; 2]);
        assert_eq!(ws.per_core, vec![0.0; 2]);
        assert_eq!(ws.status, RunStatus::Crashed);
    }

    #[test]
    fn test_fault_marker_sets_faulted() {
        let mut log = parsed(vec![5, 6], 11, 0.0);
        log.fault_detected = true;
        let ws = WeightedSpeedup::compute(&log, &[1.0; 2]);
        assert_eq!(ws.status, RunStatus::Faulted);
        assert_eq!(ws.sum(), 0.0);
    }

    #[test]
    fn test_fault_marker_with_throughput_keeps_speedup() {
        let mut log = parsed(vec![100, 100], 200, 1.0);
        log.fault_detected = true;
        let ws = WeightedSpeedup::compute(&log, &[0.5; 2]);
        assert_eq!(ws.status, RunStatus::Faulted);
        assert!(!ws.status.is_valid());
        assert_close(ws.sum(), 2.0);
    }

    #[test]
    fn test_short_baseline_leaves_remaining_cores_zero() {
        let log = parsed(vec![100, 100, 100, 100], 400, 1.0);
        let ws = WeightedSpeedup::compute(&log, &[0.5, 0.5]);
        assert_eq!(ws.core_count(), 4);
        assert_close(ws.per_core[0], 0.5);
        assert_close(ws.per_core[1], 0.5);
        assert_eq!(ws.per_core[2], 0.0);
        assert_eq!(ws.per_core[3], 0.0);
    }

    #[test]
    fn test_per_core_values_non_negative() {
        let log = parsed(vec![0, 1, u32::MAX as u64, 42], 10_000, 0.37);
        let ws = WeightedSpeedup::compute(&log, &[0.3, 1.1, 2.4, 0.9]);
        assert!(ws.per_core.iter().all(|v| *v >= 0.0));
        assert_eq!(ws, WeightedSpeedup::compute(&log, &[0.3, 1.1, 2.4, 0.9]));
    }
}
