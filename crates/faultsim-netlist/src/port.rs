use std::collections::{HashMap, HashSet};
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ast::{Declaration, DirectionKeyword, Item, ModuleDef, Width};
use crate::expr::EvalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Input,
    Output,
    Unknown,
}

/// A module port with its resolved range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    pub direction: Direction,
    /// Declared left bound (the msb expression).
    pub from: i64,
    /// Declared right bound (the lsb expression).
    pub to: i64,
    /// Position in the module port list.
    pub ordinal: usize,
}

impl Port {
    pub fn new(name: impl Into<String>, ordinal: usize) -> Self {
        Self {
            name: name.into(),
            direction: Direction::Unknown,
            from: 0,
            to: 0,
            ordinal,
        }
    }

    /// Builder shorthand used by callers that already know the range.
    pub fn with_range(mut self, direction: Direction, from: i64, to: i64) -> Self {
        self.direction = direction;
        self.from = from;
        self.to = to;
        self
    }

    /// Bit count; at least 1 whichever way the range is declared.
    pub fn width(&self) -> u64 {
        self.from.abs_diff(self.to) + 1
    }

    /// Bit indices from the lower bound to the upper bound.
    pub fn bits(&self) -> std::ops::RangeInclusive<i64> {
        self.from.min(self.to)..=self.from.max(self.to)
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = match self.direction {
            Direction::Input => "input",
            Direction::Output => "output",
            Direction::Unknown => "unknown",
        };
        write!(f, "Port({}: {}[{}..{}])", self.name, direction, self.from, self.to)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExtractError {
    #[error("Unknown port '{name}'")]
    UnknownPort { name: String },

    #[error("In declaration of '{name}': {source}")]
    Expression {
        name: String,
        #[source]
        source: EvalError,
    },
}

/// Ports of one module, resolved from its AST.
#[derive(Debug, Clone)]
pub struct Netlist {
    pub module: String,
    /// Every port keyed by name, in declaration order.
    pub ports: IndexMap<String, Port>,
    /// Input ports sorted by ordinal.
    pub inputs: Vec<Port>,
    /// Output ports sorted by ordinal.
    pub outputs: Vec<Port>,
}

impl Netlist {
    pub fn port(&self, name: &str) -> Option<&Port> {
        self.ports.get(name)
    }
}

/// Resolve port directions and ranges for a module definition.
pub fn extract(module: &ModuleDef) -> Result<Netlist, ExtractError> {
    let mut ports: IndexMap<String, Port> = module
        .ports
        .iter()
        .enumerate()
        .map(|(i, decl)| (decl.name.clone(), Port::new(decl.name.clone(), i)))
        .collect();
    let mut params: HashMap<String, i64> = HashMap::new();
    let mut declared = HashSet::new();

    for item in &module.items {
        let Item::Decl { list } = item else { continue };
        for declaration in list {
            match declaration {
                Declaration::Parameter { name, value } => {
                    let resolved = value.evaluate(&params).map_err(|source| ExtractError::Expression {
                        name: name.clone(),
                        source,
                    })?;
                    params.insert(name.clone(), resolved);
                }
                Declaration::Input { name, width } | Declaration::Output { name, width } => {
                    let direction = match declaration {
                        Declaration::Input { .. } => Direction::Input,
                        _ => Direction::Output,
                    };
                    let port = ports
                        .get_mut(name)
                        .ok_or_else(|| ExtractError::UnknownPort { name: name.clone() })?;
                    apply_declaration(port, direction, width.as_ref(), &params)?;
                    declared.insert(name.clone());
                }
                Declaration::Other => {}
            }
        }
    }

    // ANSI headers: only fill in what no item declaration already resolved.
    for decl in &module.ports {
        if declared.contains(decl.name.as_str()) {
            continue;
        }
        let Some(keyword) = decl.direction else { continue };
        let direction = match keyword {
            DirectionKeyword::Input => Direction::Input,
            DirectionKeyword::Output => Direction::Output,
            DirectionKeyword::Inout => Direction::Unknown,
        };
        if let Some(port) = ports.get_mut(&decl.name) {
            apply_declaration(port, direction, decl.width.as_ref(), &params)?;
        }
    }

    let by_direction = |direction: Direction| {
        let mut list: Vec<Port> = ports
            .values()
            .filter(|p| p.direction == direction)
            .cloned()
            .collect();
        list.sort_by_key(|p| p.ordinal);
        list
    };
    let inputs = by_direction(Direction::Input);
    let outputs = by_direction(Direction::Output);

    Ok(Netlist {
        module: module.name.clone(),
        ports,
        inputs,
        outputs,
    })
}

fn apply_declaration(
    port: &mut Port,
    direction: Direction,
    width: Option<&Width>,
    params: &HashMap<String, i64>,
) -> Result<(), ExtractError> {
    if let Some(width) = width {
        let eval = |expr: &crate::expr::Expr| {
            expr.evaluate(params).map_err(|source| ExtractError::Expression {
                name: port.name.clone(),
                source,
            })
        };
        let msb = eval(&width.msb)?;
        let lsb = eval(&width.lsb)?;
        port.from = msb;
        port.to = lsb;
    }
    port.direction = direction;
    Ok(())
}
