//! Scan-chain shift test.
//!
//! Holds reset, releases it, raises the shift enable and pushes a known
//! pattern through each chain, comparing what comes out the other end.

use faultsim_netlist::{Netlist, Port};
use serde::{Deserialize, Serialize};

use crate::markers::{ProtocolFailure, SUCCESS_MARKER};
use crate::verilog::{self, DesignSources};
use crate::{require_port, BenchError};

/// Reset polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetActive {
    #[default]
    Low,
    High,
}

impl ResetActive {
    pub fn active(self) -> u8 {
        match self {
            ResetActive::Low => 0,
            ResetActive::High => 1,
        }
    }

    pub fn inactive(self) -> u8 {
        1 - self.active()
    }
}

/// Port names of a scan-inserted design.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanPins {
    /// Functional clock, toggled alongside the test clock when present.
    pub clock: Option<String>,
    pub reset: String,
    pub tck: String,
    /// Test / shift enable.
    pub shift_enable: String,
    pub boundary_in: String,
    pub boundary_out: String,
    pub internal_in: String,
    pub internal_out: String,
}

impl ScanPins {
    fn names(&self) -> impl Iterator<Item = &str> {
        [
            &self.reset,
            &self.tck,
            &self.shift_enable,
            &self.boundary_in,
            &self.boundary_out,
            &self.internal_in,
            &self.internal_out,
        ]
        .into_iter()
        .map(String::as_str)
        .chain(self.clock.as_deref())
    }
}

/// One chain segment of the shift test.
struct Segment<'a> {
    label: &'a str,
    scan_in: &'a str,
    scan_out: &'a str,
    pattern: &'a [bool],
    failure: ProtocolFailure,
    /// Idle time between shifting in and capturing out.
    gap: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ScanChainBench {
    module: String,
    sources: DesignSources,
    ports: Vec<Port>,
    inputs: Vec<Port>,
    pins: ScanPins,
    reset_active: ResetActive,
    boundary_length: usize,
    internal_length: usize,
}

impl ScanChainBench {
    pub fn new(
        netlist: &Netlist,
        sources: DesignSources,
        pins: ScanPins,
        reset_active: ResetActive,
        boundary_length: usize,
        internal_length: usize,
    ) -> Result<Self, BenchError> {
        for name in pins.names() {
            require_port(netlist, name)?;
        }
        Ok(Self {
            module: netlist.module.clone(),
            sources,
            ports: netlist.ports.values().cloned().collect(),
            inputs: netlist.inputs.clone(),
            pins,
            reset_active,
            boundary_length,
            internal_length,
        })
    }

    /// Render with the given shift-in patterns; bit `i` enters on cycle `i`.
    /// A chain of length zero is not exercised.
    pub fn render(&self, boundary: &[bool], internal: &[bool]) -> Result<String, BenchError> {
        check_length("boundary", self.boundary_length, boundary)?;
        check_length("internal", self.internal_length, internal)?;
        let pins = &self.pins;

        let mut tb = String::new();
        tb.push_str("// Scan-chain testbench\n");
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

        let segments = [
            Segment {
                label: "boundary",
                scan_in: &pins.boundary_in,
                scan_out: &pins.boundary_out,
                pattern: boundary,
                failure: ProtocolFailure::BoundaryChain,
                gap: Some(4),
            },
            Segment {
                label: "internal",
                scan_in: &pins.internal_in,
                scan_out: &pins.internal_out,
                pattern: internal,
                failure: ProtocolFailure::InternalChain,
                gap: None,
            },
        ];
        let segments: Vec<_> = segments.into_iter().filter(|s| !s.pattern.is_empty()).collect();

        for segment in &segments {
            let n = segment.pattern.len();
            tb.push_str(&format!(
                "    wire[{}:0] {}Serializable = {};\n",
                n - 1,
                segment.label,
                verilog::binary_literal(segment.pattern)
            ));
            tb.push_str(&format!("    reg[{}:0] {}Serial;\n", n - 1, segment.label));
        }
        tb.push_str("\n    integer i;\n\n    initial begin\n");

        for input in &self.inputs {
            let value = if input.name == pins.reset {
                self.reset_active.active()
            } else {
                0
            };
            tb.push_str(&format!("        {}= {value} ;\n", verilog::escape(&input.name)));
        }
        tb.push_str("        #10;\n");
        tb.push_str(&format!(
            "        {}= {} ;\n",
            verilog::escape(&pins.reset),
            self.reset_active.inactive()
        ));
        tb.push_str(&format!("        {}= 1 ;\n", verilog::escape(&pins.shift_enable)));

        for segment in &segments {
            let n = segment.pattern.len();
            let label = segment.label;
            tb.push_str(&format!("\n        for (i = 0; i < {n}; i = i + 1) begin\n"));
            tb.push_str(&format!(
                "            {}= {label}Serializable[i];\n",
                verilog::escape(segment.scan_in)
            ));
            tb.push_str("            #2;\n        end\n");
            if let Some(gap) = segment.gap {
                tb.push_str(&format!("        #{gap};\n"));
            }
            tb.push_str(&format!("        for (i = 0; i < {n}; i = i + 1) begin\n"));
            tb.push_str(&format!(
                "            {label}Serial[i] = {};\n",
                verilog::escape(segment.scan_out)
            ));
            tb.push_str("            #2;\n        end\n");
            tb.push_str(&format!(
                "        if ({label}Serial != {label}Serializable) begin\n"
            ));
            tb.push_str(&format!(
                "            $display(\"{}\");\n            $finish;\n        end\n",
                segment.failure.marker()
            ));
        }

        tb.push_str(&format!("\n        $display(\"{SUCCESS_MARKER}\");\n"));
        tb.push_str("        $finish;\n    end\nendmodule\n");
        Ok(tb)
    }
}

pub(crate) fn check_length(chain: &'static str, expected: usize, pattern: &[bool]) -> Result<(), BenchError> {
    if pattern.len() == expected {
        Ok(())
    } else {
        Err(BenchError::PatternLength {
            chain,
            expected,
            got: pattern.len(),
        })
    }
}
