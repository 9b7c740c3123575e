//! Per-run settings of the coverage loop.

use std::collections::BTreeMap;

use faultsim_netlist::{Netlist, Port};
use faultsim_stimulus::{GeneratorKind, TestVectorSet};
use serde::{Deserialize, Serialize};

pub use faultsim_testbench::Hold;

/// Attempt ceiling used when neither a ceiling nor a vector set is given.
pub const DEFAULT_CEILING: usize = 1000;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Minimum coverage {0} is outside [0, 1]")]
    MinimumCoverage(f64),

    #[error("Initial vector count must be at least 1")]
    ZeroInitialCount,

    #[error("Vector increment must be at least 1")]
    ZeroIncrement,

    #[error("Vector ceiling must be at least 1")]
    ZeroCeiling,

    #[error("Generator '{0}' produces a vector set up front; supply one")]
    MissingVectorSet(GeneratorKind),

    #[error("Input '{0}' is both the clock and a held input")]
    ClockHeld(String),
}

/// Settings for one coverage run. Read-only once the run starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Vectors tried in the first round.
    pub initial_vectors: usize,
    /// Vectors added by every later round.
    pub increment: usize,
    /// Target coverage in `[0, 1]`.
    pub minimum_coverage: f64,
    /// Cap on vectors attempted over the whole run, duplicates included.
    pub ceiling: Option<usize>,
    pub generator: GeneratorKind,
    /// Inputs tied to a constant instead of being stimulated.
    pub held_inputs: BTreeMap<String, Hold>,
    /// Replayed in order instead of generating vectors.
    pub vector_set: Option<TestVectorSet>,
    /// Simulate a single vector, keep its work dirs and stop.
    pub sample_run: bool,
    pub seed: u64,
    /// Clock input of a partial-scan design, toggled by the testbench.
    pub clock: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            initial_vectors: 100,
            increment: 50,
            minimum_coverage: 0.8,
            ceiling: None,
            generator: GeneratorKind::default(),
            held_inputs: BTreeMap::new(),
            vector_set: None,
            sample_run: false,
            seed: 42,
            clock: None,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.minimum_coverage) {
            return Err(ConfigError::MinimumCoverage(self.minimum_coverage));
        }
        if self.initial_vectors == 0 {
            return Err(ConfigError::ZeroInitialCount);
        }
        if self.increment == 0 {
            return Err(ConfigError::ZeroIncrement);
        }
        if self.ceiling == Some(0) {
            return Err(ConfigError::ZeroCeiling);
        }
        if self.generator.is_external() && self.vector_set.is_none() {
            return Err(ConfigError::MissingVectorSet(self.generator));
        }
        if let Some(clock) = &self.clock {
            if self.held_inputs.contains_key(clock) {
                return Err(ConfigError::ClockHeld(clock.clone()));
            }
        }
        Ok(())
    }

    /// The configured ceiling, else the vector-set size, else [`DEFAULT_CEILING`].
    pub fn resolved_ceiling(&self) -> usize {
        match (self.ceiling, &self.vector_set) {
            (Some(ceiling), _) => ceiling,
            (None, Some(set)) if !set.is_empty() => set.len(),
            _ => DEFAULT_CEILING,
        }
    }

    /// Inputs a vector assigns, in column order.
    ///
    /// A supplied set fixes its own columns. Otherwise every netlist input
    /// that is neither held nor the clock, in declaration order.
    pub fn driven_inputs(&self, netlist: &Netlist) -> Vec<Port> {
        if let Some(set) = &self.vector_set {
            return set.inputs.clone();
        }
        netlist
            .inputs
            .iter()
            .filter(|p| !self.is_excluded(&p.name))
            .cloned()
            .collect()
    }

    /// True for inputs the stimulus never touches.
    pub fn is_excluded(&self, name: &str) -> bool {
        self.held_inputs.contains_key(name) || self.clock.as_deref() == Some(name)
    }
}
