pub mod config;
pub mod icarus;
pub mod simulator;

pub use config::SimulatorConfig;
pub use icarus::Icarus;
pub use simulator::{CompileRequest, RunRequest, SimError, Simulator, ToolOutput, ToolStage};
