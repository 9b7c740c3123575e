//! Scan-chain and JTAG verification.
//!
//! Each check renders one protocol testbench with seeded random patterns,
//! simulates it once and reads the verdict off the printed markers.

use std::fs;
use std::path::{Path, PathBuf};

use faultsim_netlist::Netlist;
use faultsim_sim::{CompileRequest, SimError, Simulator};
use faultsim_stimulus::rng::stream_rng;
use faultsim_testbench::{
    BenchError, DesignSources, JtagBench, JtagPatterns, ProtocolFailure, ScanChainBench, WorkDir, SUCCESS_MARKER,
};
use rand::Rng;
use serde::{Deserialize, Serialize};

pub use faultsim_testbench::{JtagPins, ResetActive, ScanPins};

/// Pattern streams drawn from the check seed.
const BOUNDARY_STREAM: u64 = 0;
const INTERNAL_STREAM: u64 = 1;
const SAMPLE_STREAM: u64 = 2;
const PRELOAD_STREAM: u64 = 3;
const SCAN_IN_STREAM: u64 = 4;

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("Nothing to verify: {0}")]
    EmptyChain(&'static str),

    #[error("Testbench error: {0}")]
    Bench(#[from] BenchError),

    #[error("Verification I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Tool(#[from] SimError),
}

impl VerifyError {
    pub fn exit_code(&self) -> i32 {
        match self {
            VerifyError::Tool(e) => e.exit_code(),
            _ => 1,
        }
    }
}

/// Outcome of one protocol simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolVerdict {
    /// The first failure marker printed, if any.
    pub failure: Option<ProtocolFailure>,
    pub success_seen: bool,
    /// Everything the simulation printed.
    pub output: String,
}

impl ProtocolVerdict {
    pub fn from_output(output: String) -> Self {
        Self {
            failure: ProtocolFailure::detect(&output),
            success_seen: output.lines().any(|line| line.trim() == SUCCESS_MARKER),
            output,
        }
    }

    pub fn passed(&self) -> bool {
        self.success_seen && self.failure.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanChainCheck {
    pub pins: ScanPins,
    #[serde(default)]
    pub reset_active: ResetActive,
    pub boundary_length: usize,
    pub internal_length: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JtagCheck {
    pub pins: JtagPins,
    #[serde(default)]
    pub reset_active: ResetActive,
    pub boundary_length: usize,
    pub internal_length: usize,
    pub seed: u64,
}

/// `len` seeded bits from one pattern stream.
pub fn pattern(seed: u64, stream: u64, len: usize) -> Vec<bool> {
    let mut rng = stream_rng(seed, stream);
    (0..len).map(|_| rng.gen::<bool>()).collect()
}

/// Shift a random pattern through each scan chain and compare what comes out.
pub fn verify_scan_chain<S: Simulator + ?Sized>(
    simulator: &S,
    work_root: &Path,
    netlist: &Netlist,
    sources: DesignSources,
    check: &ScanChainCheck,
) -> Result<ProtocolVerdict, VerifyError> {
    if check.boundary_length == 0 && check.internal_length == 0 {
        return Err(VerifyError::EmptyChain("both scan chains have length 0"));
    }
    let includes = sources.include_dirs();
    let bench = ScanChainBench::new(
        netlist,
        sources,
        check.pins.clone(),
        check.reset_active,
        check.boundary_length,
        check.internal_length,
    )?;
    let boundary = pattern(check.seed, BOUNDARY_STREAM, check.boundary_length);
    let internal = pattern(check.seed, INTERNAL_STREAM, check.internal_length);
    let testbench = bench.render(&boundary, &internal)?;

    tracing::info!(
        module = %netlist.module,
        boundary = check.boundary_length,
        internal = check.internal_length,
        "Verifying scan chains"
    );
    let verdict = simulate_once(simulator, work_root, &testbench, includes)?;
    log_verdict(&netlist.module, &verdict);
    Ok(verdict)
}

/// Drive SAMPLE/PRELOAD, SCAN-IN and BYPASS through the TAP controller.
pub fn verify_jtag<S: Simulator + ?Sized>(
    simulator: &S,
    work_root: &Path,
    netlist: &Netlist,
    sources: DesignSources,
    check: &JtagCheck,
) -> Result<ProtocolVerdict, VerifyError> {
    if check.boundary_length == 0 {
        return Err(VerifyError::EmptyChain("the boundary register has length 0"));
    }
    let includes = sources.include_dirs();
    let bench = JtagBench::new(
        netlist,
        sources,
        check.pins.clone(),
        check.reset_active,
        check.boundary_length,
        check.internal_length,
    )?;
    if bench.implied_boundary_length() != check.boundary_length {
        tracing::warn!(
            module = %netlist.module,
            configured = check.boundary_length,
            implied = bench.implied_boundary_length(),
            "Boundary length does not match the netlist's boundary cells"
        );
    }

    let patterns = JtagPatterns {
        sample: pattern(check.seed, SAMPLE_STREAM, bench.input_cells()),
        preload: pattern(check.seed, PRELOAD_STREAM, check.boundary_length),
        scan_in: pattern(check.seed, SCAN_IN_STREAM, check.internal_length),
    };
    let testbench = bench.render(&patterns)?;

    tracing::info!(
        module = %netlist.module,
        boundary = check.boundary_length,
        internal = check.internal_length,
        "Verifying JTAG interface"
    );
    let verdict = simulate_once(simulator, work_root, &testbench, includes)?;
    log_verdict(&netlist.module, &verdict);
    Ok(verdict)
}

fn simulate_once<S: Simulator + ?Sized>(
    simulator: &S,
    work_root: &Path,
    testbench: &str,
    includes: Vec<PathBuf>,
) -> Result<ProtocolVerdict, VerifyError> {
    // The work dir is dropped, and so removed, on every path out of here.
    let dir = WorkDir::create(work_root, crate::next_run_id(), 0)?;
    fs::write(dir.testbench(), testbench)?;
    let request = CompileRequest {
        testbench: dir.testbench(),
        output: dir.image(),
        includes,
    };
    let output = simulator.simulate(&request, None)?;
    Ok(ProtocolVerdict::from_output(output.text().to_string()))
}

fn log_verdict(module: &str, verdict: &ProtocolVerdict) {
    match verdict.failure {
        Some(failure) => tracing::warn!(module, %failure, "Protocol check failed"),
        None if verdict.passed() => tracing::info!(module, "Protocol check passed"),
        None => tracing::warn!(module, "Protocol check printed no success marker"),
    }
}
