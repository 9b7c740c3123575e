pub mod fault;
pub mod jtag;
pub mod markers;
pub mod scan;
pub mod verilog;
pub mod workdir;

pub use fault::{parse_detections, FaultBench, Hold};
pub use jtag::{JtagBench, JtagPatterns, JtagPins};
pub use markers::{ProtocolFailure, SUCCESS_MARKER};
pub use scan::{ResetActive, ScanChainBench, ScanPins};
pub use verilog::DesignSources;
pub use workdir::WorkDir;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BenchError {
    #[error("'{name}' is not a port of module '{module}'")]
    UnknownPort { module: String, name: String },

    #[error("Vector carries {got} values but {expected} inputs are driven")]
    VectorLength { expected: usize, got: usize },

    #[error("The {chain} pattern has {got} bits but the chain is {expected} long")]
    PatternLength {
        chain: &'static str,
        expected: usize,
        got: usize,
    },
}

/// Resolve pin names against the module's ports.
pub(crate) fn require_port<'a>(
    netlist: &'a faultsim_netlist::Netlist,
    name: &str,
) -> Result<&'a faultsim_netlist::Port, BenchError> {
    netlist.port(name).ok_or_else(|| BenchError::UnknownPort {
        module: netlist.module.clone(),
        name: name.to_string(),
    })
}
