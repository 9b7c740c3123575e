use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use faultsim_core::{
    run_campaign, simulate_coverage, CampaignError, ConfigError, CoverageReport, FaultTask, RunConfig, StopReason,
    TaskError, TaskRunner,
};
use faultsim_netlist::{enumerate_fault_sites, FaultSites, Netlist, StuckAt};
use faultsim_sim::{CompileRequest, RunRequest, SimError, Simulator, SimulatorConfig, ToolOutput};
use faultsim_stimulus::{GeneratorKind, TestVector, TestVectorSet};
use faultsim_testbench::DesignSources;

/// `module and2(a, b, y)` built from one `AND2X1` cell named `_0_`.
fn and2() -> (Netlist, FaultSites) {
    let json = serde_json::json!({
        "kind": "ModuleDef",
        "name": "and2",
        "ports": [
            { "name": "a", "direction": "input" },
            { "name": "b", "direction": "input" },
            { "name": "y", "direction": "output" }
        ],
        "items": [{
            "kind": "InstanceList",
            "module": "AND2X1",
            "instances": [{
                "name": "_0_",
                "ports": [
                    { "portname": "A", "argname": { "kind": "Identifier", "name": "a" } },
                    { "portname": "B", "argname": { "kind": "Identifier", "name": "b" } },
                    { "portname": "Y", "argname": { "kind": "Identifier", "name": "y" } }
                ]
            }]
        }]
    })
    .to_string();
    let (module, netlist) = faultsim_netlist::load(&json).unwrap();
    let sites = enumerate_fault_sites(&module, &netlist, |_| false);
    (netlist, sites)
}

fn with_site(sites: &FaultSites, extra: &str) -> FaultSites {
    FaultSites::from_sites(sites.iter().chain([extra]))
}

fn exhaustive_set(netlist: &Netlist) -> TestVectorSet {
    TestVectorSet {
        inputs: netlist.inputs.clone(),
        vectors: [[0, 0], [0, 1], [1, 0], [1, 1]]
            .into_iter()
            .map(|v| TestVector(v.to_vec()))
            .collect(),
    }
}

/// Evaluates the AND gate in Rust instead of launching a simulator.
struct AndGateModel;

impl AndGateModel {
    fn detects(site: &str, forced: bool, a: bool, b: bool) -> bool {
        let pin_a = if matches!(site, "a" | "_0_.A") { forced } else { a };
        let pin_b = if matches!(site, "b" | "_0_.B") { forced } else { b };
        let y = if matches!(site, "y" | "_0_.Y") {
            forced
        } else {
            pin_a && pin_b
        };
        y != (a && b)
    }
}

impl TaskRunner for AndGateModel {
    fn run(&self, task: &FaultTask<'_>) -> Result<Vec<String>, TaskError> {
        let a = task.vector.values()[0] == 1;
        let b = task.vector.values()[1] == 1;
        let forced = task.stuck_at == StuckAt::One;
        let mut lines: Vec<String> = ["a", "b", "y", "_0_.A", "_0_.B", "_0_.Y"]
            .into_iter()
            .filter(|site| Self::detects(site, forced, a, b))
            .map(str::to_string)
            .collect();
        lines.push("tb.sv:31: $finish called at 8 (1s)".into());
        Ok(lines)
    }
}

/// Loses every stuck-at-1 result to an I/O error.
struct FlakyStorage;

impl TaskRunner for FlakyStorage {
    fn run(&self, task: &FaultTask<'_>) -> Result<Vec<String>, TaskError> {
        if task.stuck_at == StuckAt::One {
            return Err(std::io::Error::other("result file vanished").into());
        }
        AndGateModel.run(task)
    }
}

#[test]
fn test_and_gate_exhaustive_in_one_round() {
    let (netlist, sites) = and2();
    assert_eq!(sites.len(), 6);
    let config = RunConfig {
        initial_vectors: 4,
        minimum_coverage: 1.0,
        vector_set: Some(exhaustive_set(&netlist)),
        ..Default::default()
    };

    let outcome = run_campaign(&config, &netlist, &sites, &AndGateModel, 2).unwrap();
    assert_eq!(outcome.stop_reason, StopReason::CoverageMet);
    assert_eq!(outcome.report.coverage, 1.0);
    assert_eq!(outcome.report.rounds.len(), 1);
    assert_eq!(outcome.report.coverage_list.len(), 4);
    assert_eq!(outcome.report.rounds[0].tasks, 8);

    // 11 is the only vector exposing a stuck-at-0 on the inputs.
    let last = &outcome.report.coverage_list[3];
    assert_eq!(last.vector, TestVector(vec![1, 1]));
    assert_eq!(last.coverage.sa0, vec!["a", "b", "y", "_0_.A", "_0_.B", "_0_.Y"]);
    assert!(last.coverage.sa1.is_empty());
}

#[test]
fn test_unreachable_site_settles_at_ceiling() {
    let (netlist, sites) = and2();
    let sites = with_site(&sites, "dangling");
    let config = RunConfig {
        initial_vectors: 4,
        minimum_coverage: 1.0,
        vector_set: Some(exhaustive_set(&netlist)),
        ..Default::default()
    };

    let outcome = run_campaign(&config, &netlist, &sites, &AndGateModel, 0).unwrap();
    assert_eq!(outcome.stop_reason, StopReason::CeilingReached);
    assert!((outcome.report.coverage - 12.0 / 14.0).abs() < 1e-12);
    assert!(outcome.report.coverage < 1.0);
}

#[test]
fn test_exhausted_set_stops_below_ceiling() {
    let (netlist, sites) = and2();
    let sites = with_site(&sites, "dangling");
    let config = RunConfig {
        initial_vectors: 2,
        increment: 1,
        ceiling: Some(100),
        minimum_coverage: 1.0,
        vector_set: Some(exhaustive_set(&netlist)),
        ..Default::default()
    };

    let outcome = run_campaign(&config, &netlist, &sites, &AndGateModel, 1).unwrap();
    assert_eq!(outcome.stop_reason, StopReason::CeilingReached);
    assert_eq!(outcome.report.coverage_list.len(), 4);
    let attempted: usize = outcome.report.rounds.iter().map(|r| r.attempted).sum();
    assert_eq!(attempted, 4);
}

#[test]
fn test_random_run_respects_ceiling_and_dedups() {
    let (netlist, sites) = and2();
    let sites = with_site(&sites, "dangling");
    let config = RunConfig {
        initial_vectors: 3,
        increment: 2,
        ceiling: Some(9),
        minimum_coverage: 1.0,
        generator: GeneratorKind::Uniform,
        seed: 7,
        ..Default::default()
    };

    let outcome = run_campaign(&config, &netlist, &sites, &AndGateModel, 2).unwrap();
    let report = &outcome.report;
    assert_eq!(outcome.stop_reason, StopReason::CeilingReached);

    let attempted: usize = report.rounds.iter().map(|r| r.attempted).sum();
    assert_eq!(attempted, 9);
    assert_eq!(report.rounds.iter().map(|r| r.attempted).collect::<Vec<_>>(), vec![3, 2, 2, 2]);

    // Only four distinct 2-bit vectors exist.
    let distinct: HashSet<&TestVector> = report.vectors().collect();
    assert_eq!(distinct.len(), report.coverage_list.len());
    assert!(report.coverage_list.len() <= 4);
    let duplicates: usize = report.rounds.iter().map(|r| r.duplicates).sum();
    assert_eq!(duplicates + report.coverage_list.len(), 9);

    let curve: Vec<f64> = report.rounds.iter().map(|r| r.coverage).collect();
    assert!(curve.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(report.recompute_coverage(), report.coverage);
}

#[test]
fn test_io_failures_count_as_no_detections() {
    let (netlist, sites) = and2();
    let config = RunConfig {
        initial_vectors: 4,
        minimum_coverage: 1.0,
        vector_set: Some(exhaustive_set(&netlist)),
        ..Default::default()
    };

    let outcome = run_campaign(&config, &netlist, &sites, &FlakyStorage, 2).unwrap();
    assert_eq!(outcome.stop_reason, StopReason::CeilingReached);
    assert_eq!(outcome.report.coverage, 0.5);
    assert_eq!(outcome.report.rounds[0].failed_tasks, 4);
    assert!(outcome.report.coverage_list.iter().all(|e| e.coverage.sa1.is_empty()));
}

#[test]
fn test_invalid_config_is_rejected() {
    let (netlist, sites) = and2();
    let config = RunConfig {
        minimum_coverage: -0.1,
        ..Default::default()
    };
    let err = run_campaign(&config, &netlist, &sites, &AndGateModel, 1).unwrap_err();
    assert!(matches!(err, CampaignError::Config(ConfigError::MinimumCoverage(_))));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn test_no_fault_sites() {
    let (netlist, _) = and2();
    let err = run_campaign(&RunConfig::default(), &netlist, &FaultSites::default(), &AndGateModel, 1).unwrap_err();
    assert!(matches!(err, CampaignError::NoFaultSites(ref m) if m == "and2"));
}

#[test]
fn test_report_round_trips() {
    let (netlist, sites) = and2();
    let config = RunConfig {
        initial_vectors: 4,
        minimum_coverage: 1.0,
        vector_set: Some(exhaustive_set(&netlist)),
        ..Default::default()
    };
    let report = run_campaign(&config, &netlist, &sites, &AndGateModel, 1).unwrap().report;
    let json = report.to_json().unwrap();
    assert_eq!(CoverageReport::from_json(&json).unwrap(), report);
    assert_eq!(TestVectorSet::from_json(&json).unwrap(), exhaustive_set(&netlist));
}

/// Stands in for iverilog/vvp: records each testbench and prints fixed lines.
struct ScriptedSimulator {
    compile_status: i32,
    printed: &'static str,
    testbenches: Mutex<Vec<String>>,
}

impl ScriptedSimulator {
    fn new(compile_status: i32, printed: &'static str) -> Self {
        Self {
            compile_status,
            printed,
            testbenches: Mutex::new(Vec::new()),
        }
    }
}

impl Simulator for &ScriptedSimulator {
    fn name(&self) -> &str {
        "scripted"
    }

    fn compile(&self, request: &CompileRequest) -> Result<ToolOutput, SimError> {
        let text = fs::read_to_string(&request.testbench)?;
        self.testbenches.lock().unwrap().push(text);
        Ok(ToolOutput {
            status: Some(self.compile_status),
            stderr: "tb.sv:1: syntax error".into(),
            ..ToolOutput::default()
        })
    }

    fn run(&self, request: &RunRequest) -> Result<ToolOutput, SimError> {
        if let Some(capture) = &request.capture {
            fs::write(capture, self.printed)?;
        }
        Ok(ToolOutput {
            status: Some(0),
            file_text: Some(self.printed.to_string()),
            ..ToolOutput::default()
        })
    }
}

fn entries(root: &Path) -> usize {
    fs::read_dir(root).unwrap().count()
}

#[test]
fn test_tool_failure_is_fatal() {
    let (netlist, sites) = and2();
    let root = tempfile::tempdir().unwrap();
    let sim_config = SimulatorConfig::default().with_work_root(root.path());
    let simulator = ScriptedSimulator::new(3, "");

    let err = simulate_coverage(
        &RunConfig::default(),
        &netlist,
        &sites,
        DesignSources::new("/designs/and2.v", "/pdk/cells.v"),
        &simulator,
        &sim_config,
    )
    .unwrap_err();
    assert!(matches!(err, CampaignError::Tool(SimError::ToolFailed { status: Some(3), .. })));
    assert_eq!(err.exit_code(), 3);
    assert_eq!(entries(root.path()), 0);
}

#[test]
fn test_simulated_tasks_merge_printed_sites() {
    let (netlist, sites) = and2();
    let root = tempfile::tempdir().unwrap();
    let sim_config = SimulatorConfig {
        max_parallel_tasks: 2,
        ..SimulatorConfig::default()
    }
    .with_work_root(root.path());
    let simulator = ScriptedSimulator::new(0, "a\n_0_.A\nVCD info: nothing\n");
    let config = RunConfig {
        initial_vectors: 4,
        vector_set: Some(exhaustive_set(&netlist)),
        ..Default::default()
    };

    let outcome = simulate_coverage(
        &config,
        &netlist,
        &sites,
        DesignSources::new("/designs/and2.v", "/pdk/cells.v"),
        &simulator,
        &sim_config,
    )
    .unwrap();
    assert!((outcome.report.coverage - 4.0 / 12.0).abs() < 1e-12);
    assert_eq!(outcome.stop_reason, StopReason::CeilingReached);

    let benches = simulator.testbenches.lock().unwrap();
    assert_eq!(benches.len(), 8);
    assert!(benches.iter().all(|tb| tb.contains("force uut._0_.Y")));
    assert_eq!(entries(root.path()), 0);
}

#[test]
fn test_sample_run_keeps_one_vector_of_work_dirs() {
    let (netlist, sites) = and2();
    let root = tempfile::tempdir().unwrap();
    let sim_config = SimulatorConfig::default().with_work_root(root.path());
    let simulator = ScriptedSimulator::new(0, "y\n");
    let config = RunConfig {
        sample_run: true,
        ..Default::default()
    };

    let outcome = simulate_coverage(
        &config,
        &netlist,
        &sites,
        DesignSources::new("/designs/and2.v", "/pdk/cells.v"),
        &simulator,
        &sim_config,
    )
    .unwrap();
    assert_eq!(outcome.stop_reason, StopReason::CeilingReached);
    assert_eq!(outcome.report.rounds.len(), 1);
    assert_eq!(outcome.report.coverage_list.len(), 1);
    assert_eq!(simulator.testbenches.lock().unwrap().len(), 2);
    assert_eq!(entries(root.path()), 2);
}

#[test]
fn test_sample_run_ends_in_a_regular_state() {
    let (netlist, sites) = and2();
    let short = RunConfig {
        sample_run: true,
        minimum_coverage: 1.0,
        vector_set: Some(exhaustive_set(&netlist)),
        ..Default::default()
    };
    let outcome = run_campaign(&short, &netlist, &sites, &AndGateModel, 1).unwrap();
    assert_eq!(outcome.stop_reason, StopReason::CeilingReached);
    assert_eq!(outcome.report.rounds.len(), 1);
    assert_eq!(outcome.report.coverage_list.len(), 1);

    let met = RunConfig {
        minimum_coverage: 0.0,
        ..short
    };
    let outcome = run_campaign(&met, &netlist, &sites, &AndGateModel, 1).unwrap();
    assert_eq!(outcome.stop_reason, StopReason::CoverageMet);
    assert_eq!(outcome.report.coverage_list.len(), 1);
}
