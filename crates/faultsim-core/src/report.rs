//! Persisted result of a coverage run.
//!
//! The layout doubles as a vector-set input: `inputs` plus
//! `coverage_list[].vector` is all `TestVectorSet::from_json` reads back.

use std::collections::BTreeSet;

use faultsim_netlist::Port;
use faultsim_stimulus::TestVector;
use serde::{Deserialize, Serialize};

use crate::coverage::Detections;

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Coverage reached the configured minimum.
    CoverageMet,
    /// The attempt ceiling was hit, the supplied vectors ran out, or a
    /// sample run finished its single vector.
    CeilingReached,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorCoverage {
    pub vector: TestVector,
    pub coverage: Detections,
}

/// Statistics for one generate/simulate/merge round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundStats {
    /// 1-based round number.
    pub round: usize,
    /// Vectors drawn from the source, duplicates included.
    pub attempted: usize,
    /// Vectors simulated.
    pub accepted: usize,
    pub duplicates: usize,
    pub tasks: usize,
    /// Tasks whose I/O failed and counted as detecting nothing.
    pub failed_tasks: usize,
    /// Cumulative coverage after the round's merge.
    pub coverage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub inputs: Vec<Port>,
    pub fault_sites: usize,
    pub coverage_list: Vec<VectorCoverage>,
    pub coverage: f64,
    pub stop_reason: StopReason,
    #[serde(default)]
    pub rounds: Vec<RoundStats>,
}

impl CoverageReport {
    /// Coverage implied by `coverage_list` alone, without re-simulating.
    pub fn recompute_coverage(&self) -> f64 {
        if self.fault_sites == 0 {
            return 0.0;
        }
        let mut sa0 = BTreeSet::new();
        let mut sa1 = BTreeSet::new();
        for entry in &self.coverage_list {
            sa0.extend(entry.coverage.sa0.iter());
            sa1.extend(entry.coverage.sa1.iter());
        }
        (sa0.len() + sa1.len()) as f64 / (2 * self.fault_sites) as f64
    }

    /// Vectors in the order they were simulated.
    pub fn vectors(&self) -> impl Iterator<Item = &TestVector> {
        self.coverage_list.iter().map(|entry| &entry.vector)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
