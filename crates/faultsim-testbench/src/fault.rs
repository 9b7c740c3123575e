//! Fault-injection testbench.
//!
//! The design is instantiated twice with identical stimulus: `uut` takes
//! the injected faults, `gm` stays golden. A continuous `difference` wire
//! ORs every output mismatch. Each fault site is then forced to the
//! stuck-at value for one time unit and printed if `difference` rose, so
//! the simulator output is exactly the list of detected sites.

use std::collections::BTreeMap;

use faultsim_netlist::{FaultSites, Netlist, Port, StuckAt};
use faultsim_stimulus::TestVector;
use serde::{Deserialize, Serialize};

use crate::verilog::{self, DesignSources};
use crate::BenchError;

const GOLDEN: &str = ".gm";

/// Constant level for an input excluded from stimulus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hold {
    High,
    Low,
}

impl Hold {
    pub fn value(self) -> u8 {
        match self {
            Hold::High => 1,
            Hold::Low => 0,
        }
    }
}

/// Everything about a fault testbench that stays fixed for a run.
#[derive(Debug, Clone)]
pub struct FaultBench {
    module: String,
    sources: DesignSources,
    ports: Vec<Port>,
    driven: Vec<Port>,
    outputs: Vec<Port>,
    held: Vec<(Port, Hold)>,
    clock: Option<Port>,
    sites: Vec<String>,
}

impl FaultBench {
    /// `driven` lists the stimulated inputs in vector order; `held` inputs
    /// are tied to a constant and `clock`, if any, toggles every time unit.
    pub fn new(
        netlist: &Netlist,
        sources: DesignSources,
        driven: &[Port],
        held: &BTreeMap<String, Hold>,
        clock: Option<&str>,
        sites: &FaultSites,
    ) -> Result<Self, BenchError> {
        let lookup = |name: &str| crate::require_port(netlist, name).cloned();

        for port in driven {
            lookup(&port.name)?;
        }
        let held = held
            .iter()
            .map(|(name, hold)| Ok((lookup(name)?, *hold)))
            .collect::<Result<Vec<_>, BenchError>>()?;
        let clock = clock.map(lookup).transpose()?;

        Ok(Self {
            module: netlist.module.clone(),
            sources,
            ports: netlist.ports.values().cloned().collect(),
            driven: driven.to_vec(),
            outputs: netlist.outputs.clone(),
            held,
            clock,
            sites: sites.iter().map(str::to_string).collect(),
        })
    }

    pub fn driven(&self) -> &[Port] {
        &self.driven
    }

    /// Render the testbench applying `vector` with every site stuck at `stuck_at`.
    pub fn render(&self, vector: &TestVector, stuck_at: StuckAt) -> Result<String, BenchError> {
        if vector.len() != self.driven.len() {
            return Err(BenchError::VectorLength {
                expected: self.driven.len(),
                got: vector.len(),
            });
        }

        let mut tb = String::new();
        tb.push_str("// Fault-injection testbench\n");
        tb.push_str(&self.sources.include_lines());
        tb.push_str("\nmodule FaultTestbench;\n\n");

        for port in &self.ports {
            tb.push_str(&verilog::declaration(port, ""));
            tb.push_str(&verilog::declaration(port, GOLDEN));
        }
        tb.push('\n');

        let clock_name = self.clock.as_ref().map(|c| c.name.as_str());
        if let Some(clock) = clock_name {
            let net = verilog::escape(clock);
            tb.push_str(&format!("    always #1 {net}= ~{net};\n\n"));
        }

        // The golden copy shares the clock net so both instances stay in phase.
        let uut_hooks = verilog::hooks(&self.ports, |p| verilog::escape(&p.name));
        let gm_hooks = verilog::hooks(&self.ports, |p| {
            if Some(p.name.as_str()) == clock_name {
                verilog::escape(&p.name)
            } else {
                verilog::escape_suffixed(&p.name, GOLDEN)
            }
        });
        tb.push_str(&format!("    {} uut(\n        {}\n    );\n", self.module, uut_hooks));
        tb.push_str(&format!("    {} gm(\n        {}\n    );\n\n", self.module, gm_hooks));

        let comparison = if self.outputs.is_empty() {
            "1'b0".to_string()
        } else {
            self.outputs
                .iter()
                .map(|o| {
                    format!(
                        "( {}!= {})",
                        verilog::escape(&o.name),
                        verilog::escape_suffixed(&o.name, GOLDEN)
                    )
                })
                .collect::<Vec<_>>()
                .join(" || ")
        };
        tb.push_str("    wire difference ;\n");
        tb.push_str(&format!("    assign difference = ({comparison});\n\n"));

        tb.push_str("    initial begin\n");
        if let Some(clock) = clock_name {
            tb.push_str(&format!("        {}= 0 ;\n", verilog::escape(clock)));
        }
        for (port, value) in self.driven.iter().zip(vector.values()) {
            let net = verilog::escape(&port.name);
            tb.push_str(&format!(
                "        {net}= {} ;\n",
                verilog::decimal_literal(port.width(), *value)
            ));
            tb.push_str(&format!(
                "        {}= {net};\n",
                verilog::escape_suffixed(&port.name, GOLDEN)
            ));
        }
        for (port, hold) in &self.held {
            tb.push_str(&format!("        {}= {} ;\n", verilog::escape(&port.name), hold.value()));
            tb.push_str(&format!(
                "        {}= {} ;\n",
                verilog::escape_suffixed(&port.name, GOLDEN),
                hold.value()
            ));
        }
        tb.push_str("        #1 ;\n");

        for site in &self.sites {
            tb.push_str(&format!("        force uut.{site} = 1'b{} ;\n", stuck_at.value()));
            tb.push_str("        #1 ;\n");
            tb.push_str(&format!(
                "        if (difference) $display(\"{}\") ;\n",
                site.replace('\\', "\\\\")
            ));
            tb.push_str(&format!("        release uut.{site} ;\n"));
        }
        tb.push_str("        $finish;\n");
        tb.push_str("    end\n\nendmodule\n");

        Ok(tb)
    }
}

/// Detected site names from simulator output: every non-blank line, trimmed.
pub fn parse_detections(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
