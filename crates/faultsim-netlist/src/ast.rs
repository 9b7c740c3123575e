//! Module definitions as delivered by the external Verilog AST service.
//!
//! Only the subset consumed by port extraction and fault-site discovery is
//! modeled. Unknown item and declaration kinds decode to `Other` so that a
//! netlist full of assigns and wires still loads.

use serde::Deserialize;

use crate::expr::Expr;

/// A single parsed module.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleDef {
    pub name: String,
    #[serde(default)]
    pub ports: Vec<PortDecl>,
    #[serde(default)]
    pub items: Vec<Item>,
}

/// An entry of the module port list, in declaration order.
///
/// ANSI-style headers carry the direction and range inline; classic headers
/// only name the port and declare it later as an item.
#[derive(Debug, Clone, Deserialize)]
pub struct PortDecl {
    pub name: String,
    #[serde(default)]
    pub direction: Option<DirectionKeyword>,
    #[serde(default)]
    pub width: Option<Width>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectionKeyword {
    Input,
    Output,
    Inout,
}

/// A `[msb:lsb]` range.
#[derive(Debug, Clone, Deserialize)]
pub struct Width {
    pub msb: Expr,
    pub lsb: Expr,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind")]
pub enum Item {
    Decl {
        list: Vec<Declaration>,
    },
    InstanceList {
        module: String,
        instances: Vec<Instance>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind")]
pub enum Declaration {
    #[serde(alias = "Localparam")]
    Parameter { name: String, value: Expr },
    Input {
        name: String,
        #[serde(default)]
        width: Option<Width>,
    },
    Output {
        name: String,
        #[serde(default)]
        width: Option<Width>,
    },
    #[serde(other)]
    Other,
}

/// A gate (cell) instance.
#[derive(Debug, Clone, Deserialize)]
pub struct Instance {
    pub name: String,
    /// Cell type; falls back to the enclosing list's module when absent.
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub ports: Vec<PinHook>,
}

/// A named pin connection (`.A(net)`).
#[derive(Debug, Clone, Deserialize)]
pub struct PinHook {
    pub portname: String,
}

/// Top-level parser output: a source description holding definitions.
#[derive(Debug, Clone, Deserialize)]
pub struct Source {
    pub description: Description,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Description {
    pub definitions: Vec<Definition>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind")]
pub enum Definition {
    ModuleDef(ModuleDef),
    #[serde(other)]
    Other,
}
