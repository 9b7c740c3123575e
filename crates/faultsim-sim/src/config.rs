//! Simulator configuration: tool locations, scratch space, parallelism.
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const IVERILOG_ENV: &str = "FAULT_IVERILOG";
pub const VVP_ENV: &str = "FAULT_VVP";
pub const IVL_BASE_ENV: &str = "FAULT_IVL_BASE";

/// Where the external simulator lives and how hard to drive it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Compiler executable (default: `iverilog` on `PATH`).
    pub iverilog: PathBuf,
    /// Runtime executable (default: `vvp` on `PATH`).
    pub vvp: PathBuf,
    /// Icarus base directory passed as `-B`. None = the compiler's built-in.
    pub ivl_base: Option<PathBuf>,
    /// Parent of every per-task working directory.
    pub work_root: PathBuf,
    /// Upper bound on simulator processes alive at once. 0 = one per CPU.
    pub max_parallel_tasks: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            iverilog: PathBuf::from("iverilog"),
            vvp: PathBuf::from("vvp"),
            ivl_base: None,
            work_root: std::env::temp_dir(),
            max_parallel_tasks: 0,
        }
    }
}

impl SimulatorConfig {
    /// Defaults, overridden by `FAULT_IVERILOG`, `FAULT_VVP` and `FAULT_IVL_BASE`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`SimulatorConfig::from_env`] with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let set = |key: &str| lookup(key).filter(|v| !v.is_empty()).map(PathBuf::from);
        if let Some(path) = set(IVERILOG_ENV) {
            config.iverilog = path;
        }
        if let Some(path) = set(VVP_ENV) {
            config.vvp = path;
        }
        config.ivl_base = set(IVL_BASE_ENV);
        config
    }

    pub fn with_work_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.work_root = root.into();
        self
    }
}
