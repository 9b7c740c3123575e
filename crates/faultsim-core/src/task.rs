//! One simulator invocation: a vector applied with every site stuck at one value.

use std::fs;
use std::path::PathBuf;

use faultsim_netlist::StuckAt;
use faultsim_sim::{CompileRequest, SimError, Simulator};
use faultsim_stimulus::TestVector;
use faultsim_testbench::{parse_detections, BenchError, DesignSources, FaultBench, WorkDir};

#[derive(Debug, Clone)]
pub struct FaultTask<'a> {
    /// Run id, unique within the process.
    pub run: u64,
    /// Task id, unique within the run.
    pub id: u64,
    pub vector: &'a TestVector,
    pub stuck_at: StuckAt,
    /// Leave the work dir behind for inspection.
    pub keep_work_dir: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// Testbench or result file trouble; the task counts as detecting nothing.
    #[error("Task I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Bench(#[from] BenchError),

    #[error(transparent)]
    Tool(SimError),
}

impl TaskError {
    /// Whether the run can carry on without this task's result.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TaskError::Io(_))
    }
}

impl From<SimError> for TaskError {
    fn from(e: SimError) -> Self {
        match e {
            SimError::Io(io) => TaskError::Io(io),
            other => TaskError::Tool(other),
        }
    }
}

/// Evaluates one fault task. Called concurrently from the round's pool.
pub trait TaskRunner: Sync {
    /// Output lines naming detected sites, in printed order.
    fn run(&self, task: &FaultTask<'_>) -> Result<Vec<String>, TaskError>;
}

/// Renders the fault testbench and runs it through a [`Simulator`].
pub struct SimulatorTaskRunner<S: Simulator> {
    simulator: S,
    bench: FaultBench,
    includes: Vec<PathBuf>,
    work_root: PathBuf,
}

impl<S: Simulator> SimulatorTaskRunner<S> {
    pub fn new(simulator: S, bench: FaultBench, sources: &DesignSources, work_root: impl Into<PathBuf>) -> Self {
        Self {
            simulator,
            bench,
            includes: sources.include_dirs(),
            work_root: work_root.into(),
        }
    }
}

impl<S: Simulator> TaskRunner for SimulatorTaskRunner<S> {
    fn run(&self, task: &FaultTask<'_>) -> Result<Vec<String>, TaskError> {
        let testbench = self.bench.render(task.vector, task.stuck_at)?;

        let mut dir = WorkDir::create(&self.work_root, task.run, task.id)?;
        if task.keep_work_dir {
            dir.keep();
        }
        fs::write(dir.testbench(), testbench)?;

        let request = CompileRequest {
            testbench: dir.testbench(),
            output: dir.image(),
            includes: self.includes.clone(),
        };
        tracing::debug!(
            task = task.id,
            stuck_at = task.stuck_at.value(),
            simulator = self.simulator.name(),
            "Simulating fault task"
        );
        let output = self.simulator.simulate(&request, Some(dir.capture()))?;
        Ok(parse_detections(output.text()))
    }
}
