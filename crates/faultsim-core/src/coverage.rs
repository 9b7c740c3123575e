use std::collections::BTreeSet;

use faultsim_netlist::{FaultSites, StuckAt};
use serde::{Deserialize, Serialize};

/// Sites one vector detected, per stuck-at value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detections {
    pub sa0: Vec<String>,
    pub sa1: Vec<String>,
}

impl Detections {
    pub fn for_value(&self, stuck_at: StuckAt) -> &[String] {
        match stuck_at {
            StuckAt::Zero => &self.sa0,
            StuckAt::One => &self.sa1,
        }
    }

    /// Keep the lines that name a known site, in their printed order.
    ///
    /// Simulators interleave their own chatter with `$display` output.
    pub fn record(&mut self, stuck_at: StuckAt, lines: Vec<String>, sites: &FaultSites) {
        let target = match stuck_at {
            StuckAt::Zero => &mut self.sa0,
            StuckAt::One => &mut self.sa1,
        };
        target.extend(lines.into_iter().filter(|line| sites.contains(line)));
    }
}

/// Grow-only union of every detection in a run.
#[derive(Debug, Clone, Default)]
pub struct CoverageAccumulator {
    sa0: BTreeSet<String>,
    sa1: BTreeSet<String>,
}

impl CoverageAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in one vector's detections, returning how many were new.
    pub fn merge(&mut self, detections: &Detections) -> usize {
        let before = self.detected();
        self.sa0.extend(detections.sa0.iter().cloned());
        self.sa1.extend(detections.sa1.iter().cloned());
        self.detected() - before
    }

    pub fn covered(&self, stuck_at: StuckAt) -> &BTreeSet<String> {
        match stuck_at {
            StuckAt::Zero => &self.sa0,
            StuckAt::One => &self.sa1,
        }
    }

    /// Site/value pairs covered so far.
    pub fn detected(&self) -> usize {
        self.sa0.len() + self.sa1.len()
    }

    /// `(|sa0| + |sa1|) / (2 * site_count)`; zero sites give zero coverage.
    pub fn coverage(&self, site_count: usize) -> f64 {
        if site_count == 0 {
            return 0.0;
        }
        self.detected() as f64 / (2 * site_count) as f64
    }
}
