pub mod ast;
pub mod expr;
pub mod fault;
pub mod parse;
pub mod port;

pub use fault::{enumerate_fault_sites, FaultSites, StuckAt};
pub use parse::parse_module;
pub use port::{extract, Direction, Netlist, Port};

/// Any failure turning AST JSON into a port map.
#[derive(Debug, thiserror::Error)]
pub enum NetlistError {
    #[error(transparent)]
    Parse(#[from] parse::ParseError),

    #[error(transparent)]
    Extract(#[from] port::ExtractError),
}

/// Parse the first module of `json` and resolve its ports.
pub fn load(json: &str) -> Result<(ast::ModuleDef, Netlist), NetlistError> {
    let module = parse_module(json)?;
    let netlist = extract(&module)?;
    Ok((module, netlist))
}
