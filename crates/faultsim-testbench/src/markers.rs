use std::fmt;

use serde::{Deserialize, Serialize};

/// Printed by a protocol testbench that completed every stage.
pub const SUCCESS_MARKER: &str = "SUCCESS_STRING";

/// The stage a protocol testbench reported as failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolFailure {
    BoundaryChain,
    InternalChain,
    Sample,
    Preload,
    ScanIn,
    Bypass,
}

impl ProtocolFailure {
    pub const ALL: [ProtocolFailure; 6] = [
        ProtocolFailure::BoundaryChain,
        ProtocolFailure::InternalChain,
        ProtocolFailure::Sample,
        ProtocolFailure::Preload,
        ProtocolFailure::ScanIn,
        ProtocolFailure::Bypass,
    ];

    /// The literal line the testbench prints.
    pub fn marker(self) -> &'static str {
        match self {
            ProtocolFailure::BoundaryChain => "FAILED_SERIALIZING_THROUGH_BOUNDARY_CHAIN",
            ProtocolFailure::InternalChain => "FAILED_SERIALIZING_THROUGH_INTERNAL_CHAIN",
            ProtocolFailure::Sample => "EXECUTING_SAMPLE_INST_FAILED",
            ProtocolFailure::Preload => "EXECUTING_PRELOAD_INST_FAILED",
            ProtocolFailure::ScanIn => "EXECUTING_SCANIN_INST_FAILED",
            ProtocolFailure::Bypass => "ERROR_EXECUTING_BYPASS_INST",
        }
    }

    /// First failure marker appearing in simulator output.
    pub fn detect(output: &str) -> Option<ProtocolFailure> {
        output
            .lines()
            .find_map(|line| Self::ALL.into_iter().find(|f| line.contains(f.marker())))
    }
}

impl fmt::Display for ProtocolFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}
