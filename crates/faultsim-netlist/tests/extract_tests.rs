use faultsim_netlist::expr::EvalError;
use faultsim_netlist::parse::ParseError;
use faultsim_netlist::port::ExtractError;
use faultsim_netlist::{enumerate_fault_sites, extract, parse_module, Direction};

fn int(value: i64) -> serde_json::Value {
    serde_json::json!({ "kind": "IntConst", "value": value.to_string() })
}

fn ident(name: &str) -> serde_json::Value {
    serde_json::json!({ "kind": "Identifier", "name": name })
}

/// `module and2(a, b, y); input a, b; output y; AND2X1 _0_(.A(a), .B(b), .Y(y));`
fn and_gate_json() -> String {
    serde_json::json!({
        "description": {
            "definitions": [
                {
                    "kind": "ModuleDef",
                    "name": "and2",
                    "ports": [{ "name": "a" }, { "name": "b" }, { "name": "y" }],
                    "items": [
                        { "kind": "Decl", "list": [{ "kind": "Input", "name": "a" }] },
                        { "kind": "Decl", "list": [{ "kind": "Input", "name": "b" }] },
                        { "kind": "Decl", "list": [{ "kind": "Output", "name": "y" }] },
                        { "kind": "Decl", "list": [{ "kind": "Wire", "name": "n1" }] },
                        {
                            "kind": "InstanceList",
                            "module": "AND2X1",
                            "instances": [{
                                "name": "_0_",
                                "ports": [
                                    { "portname": "A" },
                                    { "portname": "B" },
                                    { "portname": "Y" }
                                ]
                            }]
                        },
                        { "kind": "Assign" }
                    ]
                }
            ]
        }
    })
    .to_string()
}

#[test]
fn test_and_gate_ports_and_sites() {
    let module = parse_module(&and_gate_json()).unwrap();
    let netlist = extract(&module).unwrap();

    assert_eq!(netlist.module, "and2");
    assert_eq!(netlist.inputs.len(), 2);
    assert_eq!(netlist.outputs.len(), 1);
    assert_eq!(netlist.inputs[0].name, "a");
    assert_eq!(netlist.inputs[1].name, "b");
    assert!(netlist.ports.values().all(|p| p.width() == 1));

    let sites = enumerate_fault_sites(&module, &netlist, |_| false);
    let names: Vec<_> = sites.iter().collect();
    assert_eq!(names, vec!["_0_.A", "_0_.B", "_0_.Y", "a", "b", "y"]);
    assert_eq!(sites.gate_count, 1);
    assert!(!sites.has_flip_flops);
}

#[test]
fn test_ignored_ports_have_no_sites() {
    let module = parse_module(&and_gate_json()).unwrap();
    let netlist = extract(&module).unwrap();
    let sites = enumerate_fault_sites(&module, &netlist, |name| name == "b");
    assert!(!sites.contains("b"));
    assert!(sites.contains("a"));
    assert!(sites.contains("_0_.B"));
}

#[test]
fn test_parameterized_ranges() {
    // parameter W = 4; parameter D = 1 << 2; input [W-1:0] data; output [0:D+1] q;
    let json = serde_json::json!({
        "kind": "ModuleDef",
        "name": "bus",
        "ports": [{ "name": "data" }, { "name": "q" }],
        "items": [
            { "kind": "Decl", "list": [{ "kind": "Parameter", "name": "W", "value": int(4) }] },
            { "kind": "Decl", "list": [{
                "kind": "Localparam",
                "name": "D",
                "value": { "kind": "Sll", "left": int(1), "right": int(2) }
            }] },
            { "kind": "Decl", "list": [{
                "kind": "Input",
                "name": "data",
                "width": {
                    "msb": { "kind": "Minus", "left": ident("W"), "right": int(1) },
                    "lsb": int(0)
                }
            }] },
            { "kind": "Decl", "list": [{
                "kind": "Output",
                "name": "q",
                "width": {
                    "msb": int(0),
                    "lsb": { "kind": "Plus", "left": ident("D"), "right": int(1) }
                }
            }] }
        ]
    })
    .to_string();

    let module = parse_module(&json).unwrap();
    let netlist = extract(&module).unwrap();

    let data = netlist.port("data").unwrap();
    assert_eq!((data.from, data.to), (3, 0));
    assert_eq!(data.width(), 4);

    let q = netlist.port("q").unwrap();
    assert_eq!((q.from, q.to), (0, 5));
    assert_eq!(q.width(), 6);

    let sites = enumerate_fault_sites(&module, &netlist, |_| false);
    assert_eq!(sites.len(), 10);
    assert!(sites.contains("data[0]"));
    assert!(sites.contains("q[5]"));
    assert!(!sites.contains("data"));
}

#[test]
fn test_ansi_ports() {
    let json = serde_json::json!({
        "kind": "ModuleDef",
        "name": "ansi",
        "ports": [
            { "name": "x", "direction": "input", "width": { "msb": int(1), "lsb": int(0) } },
            { "name": "z", "direction": "output" },
            { "name": "io", "direction": "inout" }
        ],
        "items": []
    })
    .to_string();

    let netlist = extract(&parse_module(&json).unwrap()).unwrap();
    assert_eq!(netlist.inputs.len(), 1);
    assert_eq!(netlist.inputs[0].width(), 2);
    assert_eq!(netlist.outputs[0].name, "z");
    assert_eq!(netlist.port("io").unwrap().direction, Direction::Unknown);
}

#[test]
fn test_unknown_port_is_data_error() {
    let json = serde_json::json!({
        "kind": "ModuleDef",
        "name": "bad",
        "ports": [{ "name": "a" }],
        "items": [{ "kind": "Decl", "list": [{ "kind": "Input", "name": "ghost" }] }]
    })
    .to_string();

    let err = extract(&parse_module(&json).unwrap()).unwrap_err();
    assert_eq!(err, ExtractError::UnknownPort { name: "ghost".into() });
}

#[test]
fn test_unrecognized_expression_kind() {
    let json = serde_json::json!({
        "kind": "ModuleDef",
        "name": "bad",
        "ports": [{ "name": "a" }],
        "items": [{ "kind": "Decl", "list": [{
            "kind": "Input",
            "name": "a",
            "width": {
                "msb": { "kind": "Times", "left": int(2), "right": int(4) },
                "lsb": int(0)
            }
        }] }]
    })
    .to_string();

    let err = extract(&parse_module(&json).unwrap()).unwrap_err();
    match err {
        ExtractError::Expression { name, source } => {
            assert_eq!(name, "a");
            assert_eq!(source, EvalError::UnrecognizedKind { kind: "Times".into() });
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_unknown_parameter() {
    let json = serde_json::json!({
        "kind": "ModuleDef",
        "name": "bad",
        "ports": [{ "name": "a" }],
        "items": [{ "kind": "Decl", "list": [{
            "kind": "Input",
            "name": "a",
            "width": { "msb": ident("N"), "lsb": int(0) }
        }] }]
    })
    .to_string();

    assert!(matches!(
        extract(&parse_module(&json).unwrap()),
        Err(ExtractError::Expression {
            source: EvalError::UnknownParameter { .. },
            ..
        })
    ));
}

#[test]
fn test_no_module_found() {
    let json = serde_json::json!({
        "description": { "definitions": [{ "kind": "Pragma" }] }
    })
    .to_string();
    assert!(matches!(parse_module(&json), Err(ParseError::NoModule)));
}

#[test]
fn test_flip_flop_advisory() {
    let json = serde_json::json!({
        "kind": "ModuleDef",
        "name": "seq",
        "ports": [{ "name": "d" }, { "name": "q" }],
        "items": [
            { "kind": "Decl", "list": [{ "kind": "Input", "name": "d" }] },
            { "kind": "Decl", "list": [{ "kind": "Output", "name": "q" }] },
            {
                "kind": "InstanceList",
                "module": "DFFPOSX1",
                "instances": [
                    { "name": "_1_", "ports": [{ "portname": "D" }, { "portname": "Q" }] },
                    { "name": "_2_", "module": "INVX1", "ports": [{ "portname": "A" }] }
                ]
            }
        ]
    })
    .to_string();

    let module = parse_module(&json).unwrap();
    let netlist = extract(&module).unwrap();
    let sites = enumerate_fault_sites(&module, &netlist, |_| false);
    assert!(sites.has_flip_flops);
    assert_eq!(sites.gate_count, 2);
    assert!(sites.contains("_2_.A"));
}

#[test]
fn test_load_wraps_both_stages() {
    let (module, netlist) = faultsim_netlist::load(&and_gate_json()).unwrap();
    assert_eq!(module.name, netlist.module);
    assert!(matches!(
        faultsim_netlist::load("not json"),
        Err(faultsim_netlist::NetlistError::Parse(ParseError::Json(_)))
    ));
}
