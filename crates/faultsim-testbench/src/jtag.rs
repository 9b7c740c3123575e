//! JTAG boundary-scan test.
//!
//! Walks the TAP controller through SAMPLE/PRELOAD, SCAN-IN and BYPASS.
//! TMS changes on every other time unit against a TCK that toggles every
//! unit, so each `#2` below is one TCK cycle.

use faultsim_netlist::{Netlist, Port};
use serde::{Deserialize, Serialize};

use crate::markers::{ProtocolFailure, SUCCESS_MARKER};
use crate::scan::{check_length, ResetActive};
use crate::verilog::{self, DesignSources};
use crate::{require_port, BenchError};

/// Instruction register width.
const IR_LENGTH: usize = 4;

/// Shifted through BYPASS; every bit must come back as `1`.
const BYPASS_BITS: usize = 10;

const OPCODES: [(&str, &str); 4] = [
    ("extest", "4'b0000"),
    ("samplePreload", "4'b0001"),
    ("scanIn", "4'b0100"),
    ("bypass", "4'b1111"),
];

/// Port names of the test-access port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JtagPins {
    pub clock: Option<String>,
    pub reset: Option<String>,
    pub tms: String,
    pub tdi: String,
    pub tck: String,
    pub tdo: String,
    pub trst: String,
}

impl JtagPins {
    fn names(&self) -> impl Iterator<Item = &str> {
        [&self.tms, &self.tdi, &self.tck, &self.tdo, &self.trst]
            .into_iter()
            .map(String::as_str)
            .chain(self.clock.as_deref())
            .chain(self.reset.as_deref())
    }

    /// True for TAP, clock and reset pins, which carry no boundary cell.
    fn is_control(&self, name: &str) -> bool {
        self.names().any(|pin| pin == name)
    }
}

/// Bit patterns driven by one JTAG run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JtagPatterns {
    /// One value per input boundary cell, applied before SAMPLE captures.
    pub sample: Vec<bool>,
    /// Shifted into the boundary register by PRELOAD.
    pub preload: Vec<bool>,
    /// Shifted through the internal chain by SCAN-IN.
    pub scan_in: Vec<bool>,
}

#[derive(Debug, Clone)]
pub struct JtagBench {
    module: String,
    sources: DesignSources,
    ports: Vec<Port>,
    inputs: Vec<Port>,
    input_cells: Vec<Port>,
    output_cells: Vec<Port>,
    pins: JtagPins,
    reset_active: ResetActive,
    boundary_length: usize,
    internal_length: usize,
}

impl JtagBench {
    pub fn new(
        netlist: &Netlist,
        sources: DesignSources,
        pins: JtagPins,
        reset_active: ResetActive,
        boundary_length: usize,
        internal_length: usize,
    ) -> Result<Self, BenchError> {
        for name in pins.names() {
            require_port(netlist, name)?;
        }
        let input_cells = netlist
            .inputs
            .iter()
            .filter(|p| !pins.is_control(&p.name))
            .cloned()
            .collect();
        let output_cells = netlist
            .outputs
            .iter()
            .filter(|p| p.name != pins.tdo)
            .cloned()
            .collect();

        Ok(Self {
            module: netlist.module.clone(),
            sources,
            ports: netlist.ports.values().cloned().collect(),
            inputs: netlist.inputs.clone(),
            input_cells,
            output_cells,
            pins,
            reset_active,
            boundary_length,
            internal_length,
        })
    }

    /// Data inputs that sit behind a boundary cell.
    pub fn input_cells(&self) -> usize {
        self.input_cells.len()
    }

    /// Boundary cells the netlist implies (data inputs plus outputs other than TDO).
    pub fn implied_boundary_length(&self) -> usize {
        self.input_cells.len() + self.output_cells.len()
    }

    pub fn render(&self, patterns: &JtagPatterns) -> Result<String, BenchError> {
        check_length("sample", self.input_cells.len(), &patterns.sample)?;
        check_length("boundary", self.boundary_length, &patterns.preload)?;
        check_length("internal", self.internal_length, &patterns.scan_in)?;

        let n = self.boundary_length;
        let m = self.internal_length;
        let pins = &self.pins;
        let tms = verilog::escape(&pins.tms);
        let tdi = verilog::escape(&pins.tdi);
        let tdo = verilog::escape(&pins.tdo);

        // Cell k maps to bit n-1-k of the captured word.
        let mut expected = vec![false; n];
        for (k, bit) in patterns.sample.iter().enumerate().filter(|(k, _)| *k < n) {
            expected[n - 1 - k] = *bit;
        }

        let mut tb = String::new();
        tb.push_str("// JTAG boundary-scan testbench\n");
        tb.push_str(&self.sources.include_lines());
        tb.push_str("\nmodule testbench;\n\n");
        for port in &self.ports {
            tb.push_str(&verilog::declaration(port, ""));
        }
        tb.push('\n');
        if let Some(clock) = &pins.clock {
            let net = verilog::escape(clock);
            tb.push_str(&format!("    always #1 {net}= ~{net};\n"));
        }
        let tck = verilog::escape(&pins.tck);
        tb.push_str(&format!("    always #1 {tck}= ~{tck};\n\n"));

        let hooks = verilog::hooks(&self.ports, |p| verilog::escape(&p.name));
        tb.push_str(&format!("    {} uut(\n        {}\n    );\n\n", self.module, hooks));

        tb.push_str("    integer i;\n");
        for (name, code) in OPCODES {
            tb.push_str(&format!("    wire[{}:0] {name} = {code};\n", IR_LENGTH - 1));
        }
        if n > 0 {
            tb.push_str(&format!("    reg[{}:0] stores;\n", n - 1));
            tb.push_str(&format!(
                "    reg[{}:0] serializable = {};\n",
                n - 1,
                verilog::binary_literal(&expected)
            ));
            tb.push_str(&format!("    reg[{}:0] serial;\n", n - 1));
            tb.push_str(&format!(
                "    wire[{}:0] boundarySerial = {};\n",
                n - 1,
                verilog::binary_literal(&patterns.preload)
            ));
        }
        if m > 0 {
            tb.push_str(&format!(
                "    wire[{}:0] scanInSerializable = {};\n",
                m - 1,
                verilog::binary_literal(&patterns.scan_in)
            ));
            tb.push_str(&format!("    reg[{}:0] scanInSerial;\n", m - 1));
        }

        tb.push_str("\n    initial begin\n");
        for input in &self.inputs {
            let value = if Some(&input.name) == pins.reset.as_ref() {
                self.reset_active.active()
            } else if input.name == pins.tms {
                1
            } else {
                0
            };
            tb.push_str(&format!("        {}= {value} ;\n", verilog::escape(&input.name)));
        }
        tb.push_str("        #10;\n");
        if let Some(reset) = &pins.reset {
            tb.push_str(&format!(
                "        {}= {} ;\n",
                verilog::escape(reset),
                self.reset_active.inactive()
            ));
        }
        tb.push_str(&format!("        {}= 1 ;\n        #2;\n", verilog::escape(&pins.trst)));

        // SAMPLE/PRELOAD
        tb.push_str(&tms_step(&tms, 1, "test-logic-reset", 10));
        tb.push_str(&tms_step(&tms, 0, "run-test/idle", 2));
        tb.push_str(&load_instruction(&tms, &tdi, "samplePreload"));

        // SAMPLE: drive fresh data inputs during capture, then shift out.
        tb.push_str(&tms_step(&tms, 1, "select-DR", 2));
        tb.push_str(&tms_step(&tms, 0, "capture-DR", 0));
        for (port, bit) in self.input_cells.iter().zip(&patterns.sample) {
            tb.push_str(&format!("        {}= {} ;\n", verilog::escape(&port.name), u8::from(*bit)));
        }
        tb.push_str("        #2;\n");
        tb.push_str(&tms_step(&tms, 0, "shift-DR", 2));
        let first_output = self.input_cells.len();
        for (offset, port) in self.output_cells.iter().enumerate() {
            let k = first_output + offset;
            if k < n {
                tb.push_str(&format!(
                    "        serializable[{}] = {};\n",
                    n - 1 - k,
                    verilog::escape(&port.name)
                ));
            }
        }
        tb.push_str("        #2;\n");
        tb.push_str(&format!("        for (i = 0; i < {n}; i = i + 1) begin\n"));
        tb.push_str(&format!("            {tms}= 0;\n            serial[i] = {tdo};\n            #2;\n        end\n"));
        tb.push_str(&fail_if("serial != serializable", ProtocolFailure::Sample));
        tb.push_str("        #100;\n");
        tb.push_str(&tms_step(&tms, 1, "exit-DR", 2));
        tb.push_str(&tms_step(&tms, 1, "update-DR", 2));
        tb.push_str(&tms_step(&tms, 0, "run-test/idle", 2));

        // PRELOAD: shift a new pattern and check the shadow registers.
        tb.push_str(&enter_shift_dr(&tms));
        tb.push_str(&format!("        for (i = 0; i < {n}; i = i + 1) begin\n"));
        tb.push_str(&format!("            {tdi}= boundarySerial[i];\n"));
        tb.push_str(&format!("            if (i == {})\n                {tms}= 1;     // exit-DR\n", n.saturating_sub(1)));
        tb.push_str("            #2;\n        end\n");
        tb.push_str(&tms_step(&tms, 1, "update-DR", 2));
        tb.push_str(&tms_step(&tms, 0, "run-test/idle", 2));
        let cells = self.input_cells.iter().map(|_| "input").chain(self.output_cells.iter().map(|_| "output"));
        for (k, kind) in cells.enumerate().take(n) {
            tb.push_str(&format!(
                "        stores[{k}] = uut.__dut__.\\__BoundaryScanRegister_{kind}_{k}__.store ;\n"
            ));
        }
        tb.push_str(&format!("        for (i = 0; i < {n}; i = i + 1) begin\n"));
        tb.push_str(&format!(
            "            if (stores[i] != boundarySerial[{} - i]) begin\n",
            n.saturating_sub(1)
        ));
        tb.push_str(&format!(
            "                $display(\"{}\");\n                $finish;\n            end\n        end\n",
            ProtocolFailure::Preload.marker()
        ));

        // SCAN-IN
        if m > 0 {
            tb.push_str(&load_instruction(&tms, &tdi, "scanIn"));
            tb.push_str(&enter_shift_dr(&tms));
            tb.push_str(&format!("        for (i = 0; i < {m}; i = i + 1) begin\n"));
            tb.push_str(&format!("            {tdi}= scanInSerializable[i];\n            #2;\n        end\n"));
            tb.push_str(&format!("        for (i = 0; i < {m}; i = i + 1) begin\n"));
            tb.push_str(&format!("            scanInSerial[i] = {tdo};\n"));
            tb.push_str(&format!("            if (i == {})\n                {tms}= 1;     // exit-DR\n", m - 1));
            tb.push_str("            #2;\n        end\n");
            tb.push_str(&fail_if("scanInSerial != scanInSerializable", ProtocolFailure::ScanIn));
            tb.push_str(&tms_step(&tms, 1, "update-DR", 2));
            tb.push_str(&tms_step(&tms, 0, "run-test/idle", 2));
        }

        // BYPASS
        tb.push_str(&load_instruction(&tms, &tdi, "bypass"));
        tb.push_str(&enter_shift_dr(&tms));
        tb.push_str(&format!("        for (i = 0; i < {BYPASS_BITS}; i = i + 1) begin\n"));
        tb.push_str(&format!("            {tdi}= 1;\n            #2;\n"));
        tb.push_str(&format!(
            "            if ({tdo}!= 1) begin\n                $display(\"{}\");\n                $finish;\n            end\n",
            ProtocolFailure::Bypass.marker()
        ));
        tb.push_str(&format!(
            "            if (i == {})\n                {tms}= 1;     // exit-DR\n        end\n",
            BYPASS_BITS - 1
        ));
        tb.push_str(&tms_step(&tms, 1, "update-DR", 2));
        tb.push_str(&tms_step(&tms, 0, "run-test/idle", 2));

        tb.push_str(&format!("        $display(\"{SUCCESS_MARKER}\");\n"));
        tb.push_str("        $finish;\n    end\nendmodule\n");
        Ok(tb)
    }
}

/// Set TMS, note the state it leads to, then wait `delay` units.
fn tms_step(tms: &str, value: u8, state: &str, delay: u32) -> String {
    let mut step = format!("        {tms}= {value};     // {state}\n");
    if delay > 0 {
        step.push_str(&format!("        #{delay};\n"));
    }
    step
}

/// From run-test/idle: select-DR, capture-DR, shift-DR.
fn enter_shift_dr(tms: &str) -> String {
    [
        tms_step(tms, 1, "select-DR", 2),
        tms_step(tms, 0, "capture-DR", 2),
        tms_step(tms, 0, "shift-DR", 2),
    ]
    .concat()
}

/// From run-test/idle: shift `opcode` into the instruction register and
/// return to run-test/idle.
fn load_instruction(tms: &str, tdi: &str, opcode: &str) -> String {
    let mut walk = [
        tms_step(tms, 1, "select-DR", 2),
        tms_step(tms, 1, "select-IR", 2),
        tms_step(tms, 0, "capture-IR", 2),
        tms_step(tms, 0, "shift-IR", 2),
    ]
    .concat();
    walk.push_str(&format!("        for (i = 0; i < {IR_LENGTH}; i = i + 1) begin\n"));
    walk.push_str(&format!("            {tdi}= {opcode}[i];\n"));
    walk.push_str(&format!(
        "            if (i == {})\n                {tms}= 1;     // exit-IR\n",
        IR_LENGTH - 1
    ));
    walk.push_str("            #2;\n        end\n");
    walk.push_str(&tms_step(tms, 1, "update-IR", 2));
    walk.push_str(&tms_step(tms, 0, "run-test/idle", 6));
    walk
}

fn fail_if(condition: &str, failure: ProtocolFailure) -> String {
    format!(
        "        if ({condition}) begin\n            $display(\"{}\");\n            $finish;\n        end\n",
        failure.marker()
    )
}
