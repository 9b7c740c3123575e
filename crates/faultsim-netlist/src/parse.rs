use crate::ast::{Definition, ModuleDef, Source};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("AST JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No module found")]
    NoModule,
}

/// Decode the AST service output and return its first module definition.
///
/// Accepts either a full source description or a bare module object.
pub fn parse_module(json: &str) -> Result<ModuleDef, ParseError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    if value.get("description").is_none() {
        return Ok(serde_json::from_value(value)?);
    }

    let source: Source = serde_json::from_value(value)?;
    source
        .description
        .definitions
        .into_iter()
        .find_map(|definition| match definition {
            Definition::ModuleDef(module) => Some(module),
            Definition::Other => None,
        })
        .ok_or(ParseError::NoModule)
}
