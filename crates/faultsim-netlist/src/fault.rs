//! Fault-site discovery.
//!
//! A fault site is a string addressing a single-bit port (`a`), one bit of
//! a bus (`a[3]`) or a gate pin (`_12_.Y`). The same strings are used to
//! force nets inside the unit under test and to report detections.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ast::{Item, ModuleDef};
use crate::port::Netlist;

/// Cell-name prefix of sequential cells.
const FLIP_FLOP_PREFIX: &str = "DFF";

/// The value a faulty net is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StuckAt {
    Zero,
    One,
}

impl StuckAt {
    pub const ALL: [StuckAt; 2] = [StuckAt::Zero, StuckAt::One];

    pub fn value(self) -> u8 {
        match self {
            StuckAt::Zero => 0,
            StuckAt::One => 1,
        }
    }
}

impl fmt::Display for StuckAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s-a-{}", self.value())
    }
}

/// The immutable fault list of one run.
#[derive(Debug, Clone, Default)]
pub struct FaultSites {
    sites: BTreeSet<String>,
    /// Number of gate instances walked.
    pub gate_count: usize,
    /// Set when a sequential cell was seen; the stuck-at engine assumes a
    /// combinational (already scan-cut) netlist.
    pub has_flip_flops: bool,
}

impl FaultSites {
    pub fn from_sites<I, S>(sites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sites: sites.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn contains(&self, site: &str) -> bool {
        self.sites.contains(site)
    }

    /// Sites in lexical order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.sites.iter().map(String::as_str)
    }
}

/// Enumerate port-bit and gate-pin fault sites.
///
/// Ports for which `is_ignored` returns true contribute no sites.
pub fn enumerate_fault_sites(
    module: &ModuleDef,
    netlist: &Netlist,
    is_ignored: impl Fn(&str) -> bool,
) -> FaultSites {
    let mut sites = BTreeSet::new();

    for port in netlist.ports.values() {
        if is_ignored(&port.name) {
            continue;
        }
        if port.width() == 1 {
            sites.insert(port.name.clone());
        } else {
            for bit in port.bits() {
                sites.insert(format!("{}[{}]", port.name, bit));
            }
        }
    }

    let mut gate_count = 0;
    let mut has_flip_flops = false;
    for item in &module.items {
        let Item::InstanceList { module: cell, instances } = item else {
            continue;
        };
        for instance in instances {
            gate_count += 1;
            let cell = instance.module.as_deref().unwrap_or(cell);
            if cell.starts_with(FLIP_FLOP_PREFIX) {
                has_flip_flops = true;
            }
            for hook in &instance.ports {
                sites.insert(format!("{}.{}", instance.name, hook.portname));
            }
        }
    }

    if has_flip_flops {
        tracing::warn!(
            module = %netlist.module,
            "flip-flops found in the netlist; the stuck-at engine expects a scan-cut combinational design"
        );
    }
    tracing::info!(
        module = %netlist.module,
        sites = sites.len(),
        gates = gate_count,
        ports = netlist.ports.len(),
        "enumerated fault sites"
    );

    FaultSites {
        sites,
        gate_count,
        has_flip_flops,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stuck_at_display() {
        assert_eq!(StuckAt::Zero.to_string(), "s-a-0");
        assert_eq!(StuckAt::One.to_string(), "s-a-1");
        assert_eq!(StuckAt::ALL.map(StuckAt::value), [0, 1]);
    }

    #[test]
    fn test_from_sites_is_sorted_and_unique() {
        let sites = FaultSites::from_sites(["y", "a", "b", "a"]);
        assert_eq!(sites.len(), 3);
        assert_eq!(sites.iter().collect::<Vec<_>>(), vec!["a", "b", "y"]);
    }
}
