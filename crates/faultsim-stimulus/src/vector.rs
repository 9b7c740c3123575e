use std::collections::HashSet;
use std::fmt;

use faultsim_netlist::Port;
use serde::{Deserialize, Serialize};

/// One stimulus: a value per non-ignored input, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestVector(pub Vec<u64>);

impl TestVector {
    pub fn values(&self) -> &[u64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u64>> for TestVector {
    fn from(values: Vec<u64>) -> Self {
        TestVector(values)
    }
}

impl fmt::Display for TestVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u64::to_string).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StimulusError {
    #[error("Port '{name}' is {width} bits wide; at most 64 bits are supported")]
    PortTooWide { name: String, width: u64 },

    #[error("Value {value} does not fit the {width}-bit input '{name}'")]
    ValueOutOfRange { name: String, width: u64, value: u64 },

    #[error("Malformed vector set at line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("Vector set JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Vector set I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Largest value a `width`-bit input can take.
pub fn max_value(width: u64) -> Option<u64> {
    match width {
        0 => None,
        64 => Some(u64::MAX),
        w if w < 64 => Some((1u64 << w) - 1),
        _ => None,
    }
}

/// Per-input maxima, rejecting ports the vector representation cannot hold.
pub fn input_maxima(inputs: &[Port]) -> Result<Vec<u64>, StimulusError> {
    inputs
        .iter()
        .map(|port| {
            max_value(port.width()).ok_or_else(|| StimulusError::PortTooWide {
                name: port.name.clone(),
                width: port.width(),
            })
        })
        .collect()
}

/// An externally supplied (or ATPG-computed) batch of vectors together with
/// the input ordering its columns assume.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestVectorSet {
    pub inputs: Vec<Port>,
    pub vectors: Vec<TestVector>,
}

impl TestVectorSet {
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Check every column against its input width.
    pub fn validate(&self) -> Result<(), StimulusError> {
        let maxima = input_maxima(&self.inputs)?;
        for (row, vector) in self.vectors.iter().enumerate() {
            if vector.len() != self.inputs.len() {
                return Err(StimulusError::Malformed {
                    line: row + 1,
                    reason: format!("expected {} values, got {}", self.inputs.len(), vector.len()),
                });
            }
            for ((port, max), value) in self.inputs.iter().zip(&maxima).zip(vector.values()) {
                if value > max {
                    return Err(StimulusError::ValueOutOfRange {
                        name: port.name.clone(),
                        width: port.width(),
                        value: *value,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Every vector accepted so far in a run; duplicates are refused.
#[derive(Debug, Default)]
pub struct VectorLedger {
    seen: HashSet<TestVector>,
}

impl VectorLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `vector`, returning false if an equal vector was already seen.
    pub fn admit(&mut self, vector: &TestVector) -> bool {
        if self.seen.contains(vector) {
            return false;
        }
        self.seen.insert(vector.clone())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
