pub mod campaign;
pub mod config;
pub mod coverage;
pub mod report;
pub mod task;
pub mod verify;

use std::sync::atomic::{AtomicU64, Ordering};

pub use campaign::{run_campaign, simulate_coverage, CampaignError, CampaignOutcome};
pub use config::{ConfigError, Hold, RunConfig};
pub use coverage::{CoverageAccumulator, Detections};
pub use report::{CoverageReport, RoundStats, StopReason, VectorCoverage};
pub use task::{FaultTask, SimulatorTaskRunner, TaskError, TaskRunner};
pub use verify::{verify_jtag, verify_scan_chain, JtagCheck, ProtocolVerdict, ScanChainCheck, VerifyError};

static RUN_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Process-unique id for a campaign or verification, used in work dir names.
pub(crate) fn next_run_id() -> u64 {
    RUN_COUNTER.fetch_add(1, Ordering::Relaxed) + 1
}
