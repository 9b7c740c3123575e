use std::collections::BTreeMap;

use faultsim_netlist::{enumerate_fault_sites, StuckAt};
use faultsim_stimulus::TestVector;
use faultsim_testbench::{DesignSources, FaultBench, Hold, WorkDir};

/// `module mux(input [1:0] d, input s, input en, output y);` with one gate.
fn mux_json() -> String {
    serde_json::json!({
        "kind": "ModuleDef",
        "name": "mux",
        "ports": [
            { "name": "d", "direction": "input",
              "width": { "msb": { "kind": "IntConst", "value": "1" },
                         "lsb": { "kind": "IntConst", "value": "0" } } },
            { "name": "s", "direction": "input" },
            { "name": "en", "direction": "input" },
            { "name": "y", "direction": "output" }
        ],
        "items": [{
            "kind": "InstanceList",
            "module": "MUX2X1",
            "instances": [{
                "name": "_0_",
                "ports": [{ "portname": "A" }, { "portname": "B" }, { "portname": "S" }, { "portname": "Y" }]
            }]
        }]
    })
    .to_string()
}

#[test]
fn test_bench_for_parsed_netlist() {
    let (module, netlist) = faultsim_netlist::load(&mux_json()).unwrap();
    let held: BTreeMap<String, Hold> = [("en".to_string(), Hold::High)].into_iter().collect();
    let sites = enumerate_fault_sites(&module, &netlist, |name| held.contains_key(name));
    let driven: Vec<_> = netlist
        .inputs
        .iter()
        .filter(|p| !held.contains_key(&p.name))
        .cloned()
        .collect();

    let bench = FaultBench::new(
        &netlist,
        DesignSources::new("/designs/mux.v", "/pdk/cells.v"),
        &driven,
        &held,
        None,
        &sites,
    )
    .unwrap();
    let tb = bench.render(&TestVector(vec![2, 1]), StuckAt::Zero).unwrap();

    assert!(tb.contains("reg[1:0] \\d ;"));
    assert!(tb.contains("reg[1:0] \\d.gm ;"));
    assert!(tb.contains("wire[0:0] \\y.gm ;"));
    assert!(tb.contains("\\d = 2'd2 ;"));
    assert!(tb.contains("\\s = 1'd1 ;"));
    assert!(tb.contains("\\en = 1 ;"));
    assert!(tb.contains("force uut.d[1] = 1'b0 ;"));
    assert!(tb.contains("force uut._0_.S = 1'b0 ;"));
    assert!(!tb.contains("force uut.en "));
    assert_eq!(tb.matches("release uut.").count(), sites.len());
}

#[test]
fn test_work_dirs_are_unique_per_task() {
    let root = tempfile::tempdir().unwrap();
    let a = WorkDir::create(root.path(), 7, 0).unwrap();
    let b = WorkDir::create(root.path(), 7, 1).unwrap();
    assert_ne!(a.path(), b.path());
    assert!(a.path().starts_with(root.path()));
    assert_eq!(a.image().parent(), Some(a.path()));
}
