//! The generate / simulate / merge / decide loop.
//!
//! Each round draws a budget of vectors, fans two tasks per vector (stuck-at
//! 0 and 1) out on a bounded rayon pool, joins them, then merges detections
//! on the calling thread. The loop stops once coverage reaches the minimum
//! or the attempt ceiling is spent.

use std::path::PathBuf;

use faultsim_netlist::{FaultSites, Netlist, StuckAt};
use faultsim_sim::{SimError, Simulator, SimulatorConfig};
use faultsim_stimulus::{FixedVectorSource, StimulusError, TestVector, VectorLedger, VectorSource};
use faultsim_testbench::{BenchError, DesignSources, FaultBench};
use rayon::prelude::*;

use crate::config::{ConfigError, RunConfig};
use crate::coverage::{CoverageAccumulator, Detections};
use crate::report::{CoverageReport, RoundStats, StopReason, VectorCoverage};
use crate::task::{FaultTask, SimulatorTaskRunner, TaskError, TaskRunner};

#[derive(Debug, thiserror::Error)]
pub enum CampaignError {
    #[error("Invalid run configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Stimulus error: {0}")]
    Stimulus(#[from] StimulusError),

    #[error("Testbench error: {0}")]
    Bench(#[from] BenchError),

    #[error("No fault sites to simulate in module '{0}'")]
    NoFaultSites(String),

    #[error("Module '{0}' has no inputs")]
    NoInputs(String),

    #[error("Module '{0}' has no outputs")]
    NoOutputs(String),

    #[error("Failed to build the task pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Tool(SimError),
}

impl CampaignError {
    /// Process exit status for a front end; the simulator's own for tool failures.
    pub fn exit_code(&self) -> i32 {
        match self {
            CampaignError::Tool(e) => e.exit_code(),
            _ => 1,
        }
    }
}

impl From<TaskError> for CampaignError {
    fn from(e: TaskError) -> Self {
        match e {
            TaskError::Bench(e) => CampaignError::Bench(e),
            TaskError::Tool(e) => CampaignError::Tool(e),
            TaskError::Io(e) => CampaignError::Tool(SimError::Io(e)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CampaignOutcome {
    pub report: CoverageReport,
    pub stop_reason: StopReason,
}

/// What one round produced before merging.
struct RoundDraw {
    vectors: Vec<TestVector>,
    attempted: usize,
    duplicates: usize,
    exhausted: bool,
}

/// Run the coverage loop with `runner` evaluating each task.
///
/// `max_parallel_tasks` bounds concurrent tasks; 0 means one per CPU.
pub fn run_campaign<R: TaskRunner>(
    config: &RunConfig,
    netlist: &Netlist,
    sites: &FaultSites,
    runner: &R,
    max_parallel_tasks: usize,
) -> Result<CampaignOutcome, CampaignError> {
    config.validate()?;
    if sites.is_empty() {
        return Err(CampaignError::NoFaultSites(netlist.module.clone()));
    }
    if netlist.inputs.is_empty() {
        return Err(CampaignError::NoInputs(netlist.module.clone()));
    }
    if netlist.outputs.is_empty() {
        return Err(CampaignError::NoOutputs(netlist.module.clone()));
    }

    let driven = config.driven_inputs(netlist);
    let mut source: Box<dyn VectorSource> = match &config.vector_set {
        Some(set) => Box::new(FixedVectorSource::new(set.clone())),
        None => config
            .generator
            .random_source(config.seed, &driven)?
            .ok_or(ConfigError::MissingVectorSet(config.generator))?,
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(max_parallel_tasks)
        .build()?;
    let run = crate::next_run_id();
    let ceiling = config.resolved_ceiling();

    tracing::info!(
        module = %netlist.module,
        run,
        sites = sites.len(),
        source = source.name(),
        ceiling,
        "Starting fault simulation"
    );

    let mut ledger = VectorLedger::new();
    let mut accumulator = CoverageAccumulator::new();
    let mut coverage_list = Vec::new();
    let mut rounds = Vec::new();
    let mut attempted_total = 0usize;
    let mut next_task = 0u64;

    let stop_reason = loop {
        let round = rounds.len() + 1;
        let budget = if round == 1 { config.initial_vectors } else { config.increment };
        let budget = budget.min(ceiling.saturating_sub(attempted_total));

        let mut draw = draw_vectors(source.as_mut(), &mut ledger, budget);
        attempted_total += draw.attempted;
        if draw.duplicates > 0 {
            tracing::warn!(round, duplicates = draw.duplicates, "Skipped duplicate test vectors");
        }
        if config.sample_run {
            draw.vectors.truncate(1);
        }

        let tasks: Vec<FaultTask<'_>> = draw
            .vectors
            .iter()
            .flat_map(|vector| StuckAt::ALL.map(|stuck_at| (vector, stuck_at)))
            .map(|(vector, stuck_at)| {
                next_task += 1;
                FaultTask {
                    run,
                    id: next_task,
                    vector,
                    stuck_at,
                    keep_work_dir: config.sample_run,
                }
            })
            .collect();

        let results: Vec<Result<Vec<String>, TaskError>> =
            pool.install(|| tasks.par_iter().map(|task| runner.run(task)).collect());

        // Tasks come in (sa0, sa1) pairs per vector.
        let mut failed_tasks = 0;
        let mut per_vector = vec![Detections::default(); draw.vectors.len()];
        for (index, (task, result)) in tasks.iter().zip(results).enumerate() {
            let lines = match result {
                Ok(lines) => lines,
                Err(e) if e.is_recoverable() => {
                    tracing::warn!(task = task.id, error = %e, "Fault task failed, counting no detections");
                    failed_tasks += 1;
                    Vec::new()
                }
                Err(e) => return Err(e.into()),
            };
            per_vector[index / StuckAt::ALL.len()].record(task.stuck_at, lines, sites);
        }

        let task_count = tasks.len();
        drop(tasks);

        let accepted = draw.vectors.len();
        for (vector, detections) in draw.vectors.into_iter().zip(per_vector) {
            accumulator.merge(&detections);
            coverage_list.push(VectorCoverage {
                vector,
                coverage: detections,
            });
        }

        let coverage = accumulator.coverage(sites.len());
        rounds.push(RoundStats {
            round,
            attempted: draw.attempted,
            accepted,
            duplicates: draw.duplicates,
            tasks: task_count,
            failed_tasks,
            coverage,
        });
        tracing::info!(
            round,
            vectors = coverage_list.len(),
            coverage = %format!("{:.2}%", coverage * 100.0),
            "Round complete"
        );

        if coverage >= config.minimum_coverage {
            break StopReason::CoverageMet;
        }
        if config.sample_run || attempted_total >= ceiling || draw.exhausted {
            tracing::warn!(
                attempted = attempted_total,
                ceiling,
                "ceiling reached, settling for current coverage"
            );
            break StopReason::CeilingReached;
        }
        tracing::info!(
            minimum = %format!("{:.2}%", config.minimum_coverage * 100.0),
            increment = config.increment,
            "Minimum coverage not met, adding vectors"
        );
    };

    let coverage = accumulator.coverage(sites.len());
    tracing::info!(
        module = %netlist.module,
        coverage = %format!("{:.2}%", coverage * 100.0),
        vectors = coverage_list.len(),
        ?stop_reason,
        "Fault simulation finished"
    );

    Ok(CampaignOutcome {
        report: CoverageReport {
            inputs: driven,
            fault_sites: sites.len(),
            coverage_list,
            coverage,
            stop_reason,
            rounds,
        },
        stop_reason,
    })
}

/// Pull up to `budget` vectors, dropping any the run has already seen.
fn draw_vectors(source: &mut dyn VectorSource, ledger: &mut VectorLedger, budget: usize) -> RoundDraw {
    let mut draw = RoundDraw {
        vectors: Vec::with_capacity(budget),
        attempted: 0,
        duplicates: 0,
        exhausted: false,
    };
    while draw.attempted < budget {
        let Some(vector) = source.next_vector() else {
            draw.exhausted = true;
            break;
        };
        draw.attempted += 1;
        if ledger.admit(&vector) {
            draw.vectors.push(vector);
        } else {
            draw.duplicates += 1;
        }
    }
    draw
}

/// Run the coverage loop against a real simulator.
///
/// Builds the fault testbench from `config` and `sources` and evaluates
/// each task in its own work dir under `sim_config.work_root`.
pub fn simulate_coverage<S: Simulator>(
    config: &RunConfig,
    netlist: &Netlist,
    sites: &FaultSites,
    sources: DesignSources,
    simulator: S,
    sim_config: &SimulatorConfig,
) -> Result<CampaignOutcome, CampaignError> {
    let driven = config.driven_inputs(netlist);
    let bench = FaultBench::new(
        netlist,
        sources.clone(),
        &driven,
        &config.held_inputs,
        config.clock.as_deref(),
        sites,
    )?;
    let work_root: PathBuf = sim_config.work_root.clone();
    let runner = SimulatorTaskRunner::new(simulator, bench, &sources, work_root);
    run_campaign(config, netlist, sites, &runner, sim_config.max_parallel_tasks)
}
