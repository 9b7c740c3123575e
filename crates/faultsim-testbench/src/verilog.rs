//! Small Verilog text helpers shared by every testbench form.

use std::path::PathBuf;

use faultsim_netlist::{Direction, Port};
use serde::{Deserialize, Serialize};

/// The files a testbench pulls in with `` `include ``.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignSources {
    /// The gate-level netlist under test.
    pub netlist: PathBuf,
    /// Cell library models.
    pub cells: PathBuf,
}

impl DesignSources {
    pub fn new(netlist: impl Into<PathBuf>, cells: impl Into<PathBuf>) -> Self {
        Self {
            netlist: netlist.into(),
            cells: cells.into(),
        }
    }

    /// Directories the compiler should search.
    pub fn include_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        for file in [&self.cells, &self.netlist] {
            if let Some(parent) = file.parent().filter(|p| !p.as_os_str().is_empty()) {
                let parent = parent.to_path_buf();
                if !dirs.contains(&parent) {
                    dirs.push(parent);
                }
            }
        }
        dirs
    }

    pub(crate) fn include_lines(&self) -> String {
        format!(
            "`include \"{}\"\n`include \"{}\"\n",
            self.cells.display(),
            self.netlist.display()
        )
    }
}

/// Escaped identifier for `name`, terminated by the mandatory space.
///
/// Names that already carry a leading backslash are kept as they are.
pub fn escape(name: &str) -> String {
    escape_suffixed(name, "")
}

/// Escaped identifier for `name` with `suffix` appended inside the escape,
/// e.g. the golden-model net `\a.gm `.
pub fn escape_suffixed(name: &str, suffix: &str) -> String {
    let name = name.trim_end();
    if name.starts_with('\\') {
        format!("{name}{suffix} ")
    } else {
        format!("\\{name}{suffix} ")
    }
}

/// `reg` for inputs, `wire` for everything else.
pub fn declaration(port: &Port, suffix: &str) -> String {
    let kind = if port.direction == Direction::Input { "reg" } else { "wire" };
    format!(
        "    {kind}[{}:{}] {};\n",
        port.from,
        port.to,
        escape_suffixed(&port.name, suffix)
    )
}

/// `.\port ( \net )` connections joined for an instance port list.
pub fn hooks<'a>(ports: impl IntoIterator<Item = &'a Port>, net: impl Fn(&Port) -> String) -> String {
    ports
        .into_iter()
        .map(|port| format!(".{}( {})", escape(&port.name), net(port)))
        .collect::<Vec<_>>()
        .join(" ,\n        ")
}

/// Sized binary literal whose bit `i` is `bits[i]`.
pub fn binary_literal(bits: &[bool]) -> String {
    let digits: String = bits.iter().rev().map(|b| if *b { '1' } else { '0' }).collect();
    format!("{}'b{}", bits.len(), digits)
}

/// Sized decimal literal; unsized constants would be truncated to 32 bits.
pub fn decimal_literal(width: u64, value: u64) -> String {
    format!("{width}'d{value}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape("a"), "\\a ");
        assert_eq!(escape("\\bus[3] "), "\\bus[3] ");
        assert_eq!(escape_suffixed("y", ".gm"), "\\y.gm ");
        assert_eq!(escape_suffixed("\\y", ".gm"), "\\y.gm ");
    }

    #[test]
    fn test_declaration_kind() {
        let input = Port::new("a", 0).with_range(Direction::Input, 3, 0);
        let output = Port::new("y", 1).with_range(Direction::Output, 0, 0);
        assert_eq!(declaration(&input, ".gm"), "    reg[3:0] \\a.gm ;\n");
        assert_eq!(declaration(&output, ""), "    wire[0:0] \\y ;\n");
    }

    #[test]
    fn test_binary_literal_is_lsb_first() {
        assert_eq!(binary_literal(&[true, false, false]), "3'b001");
        assert_eq!(decimal_literal(64, u64::MAX), "64'd18446744073709551615");
    }

    #[test]
    fn test_include_dirs_deduplicated() {
        let sources = DesignSources::new("/w/net.v", "/w/cells.v");
        assert_eq!(sources.include_dirs(), vec![PathBuf::from("/w")]);
        assert!(DesignSources::new("net.v", "cells.v").include_dirs().is_empty());
    }
}
