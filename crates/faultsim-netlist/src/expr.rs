use std::collections::HashMap;

use serde::Deserialize;

/// A constant expression as emitted by the Verilog AST service.
///
/// Only the node kinds that appear in parameter values and port ranges are
/// modeled. Anything else decodes to `Unrecognized` and fails on evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    IntConst(String),
    Identifier(String),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unrecognized {
        kind: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Plus,
    Minus,
    Sll,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Sll => "<<",
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("Unrecognized expression kind '{kind}'")]
    UnrecognizedKind { kind: String },

    #[error("Unknown parameter '{name}'")]
    UnknownParameter { name: String },

    #[error("Malformed integer literal '{literal}'")]
    BadLiteral { literal: String },

    #[error("Overflow evaluating {left} {op} {right}")]
    Overflow {
        op: &'static str,
        left: i64,
        right: i64,
    },
}

impl Expr {
    /// Evaluate against already-resolved parameter values.
    pub fn evaluate(&self, params: &HashMap<String, i64>) -> Result<i64, EvalError> {
        match self {
            Expr::IntConst(literal) => parse_int_literal(literal),
            Expr::Identifier(name) => {
                params
                    .get(name)
                    .copied()
                    .ok_or_else(|| EvalError::UnknownParameter { name: name.clone() })
            }
            Expr::Binary { op, left, right } => {
                let l = left.evaluate(params)?;
                let r = right.evaluate(params)?;
                let value = match op {
                    BinaryOp::Plus => l.checked_add(r),
                    BinaryOp::Minus => l.checked_sub(r),
                    BinaryOp::Sll => u32::try_from(r).ok().and_then(|s| l.checked_shl(s)),
                };
                value.ok_or(EvalError::Overflow {
                    op: op.symbol(),
                    left: l,
                    right: r,
                })
            }
            Expr::Unrecognized { kind } => Err(EvalError::UnrecognizedKind { kind: kind.clone() }),
        }
    }
}

/// Parse a decimal or sized Verilog literal (`12`, `8'hff`, `4'b1010`, `'d7`).
pub fn parse_int_literal(literal: &str) -> Result<i64, EvalError> {
    let bad = || EvalError::BadLiteral {
        literal: literal.to_string(),
    };
    let cleaned: String = literal.chars().filter(|c| *c != '_' && !c.is_whitespace()).collect();

    let Some((_, based)) = cleaned.split_once('\'') else {
        return cleaned.parse::<i64>().map_err(|_| bad());
    };

    let based = based.strip_prefix(|c: char| c == 's' || c == 'S').unwrap_or(based);
    let mut chars = based.chars();
    let radix = match chars.next().ok_or_else(bad)? {
        'b' | 'B' => 2,
        'o' | 'O' => 8,
        'd' | 'D' => 10,
        'h' | 'H' => 16,
        _ => return Err(bad()),
    };
    i64::from_str_radix(chars.as_str(), radix).map_err(|_| bad())
}

impl<'de> Deserialize<'de> for Expr {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        parse_expr(&value).map_err(serde::de::Error::custom)
    }
}

fn parse_expr(value: &serde_json::Value) -> Result<Expr, String> {
    let obj = value
        .as_object()
        .ok_or_else(|| format!("expression node must be an object, got: {value}"))?;
    let kind = obj
        .get("kind")
        .and_then(|k| k.as_str())
        .ok_or("expression node is missing its 'kind' tag")?;

    match kind {
        "IntConst" => {
            let literal = match obj.get("value") {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(serde_json::Value::Number(n)) => n.to_string(),
                other => return Err(format!("IntConst value must be a string or number, got: {other:?}")),
            };
            Ok(Expr::IntConst(literal))
        }

        "Identifier" => {
            let name = obj
                .get("name")
                .and_then(|n| n.as_str())
                .ok_or("Identifier requires a string 'name'")?;
            Ok(Expr::Identifier(name.to_string()))
        }

        "Plus" | "Minus" | "Sll" => {
            let op = match kind {
                "Plus" => BinaryOp::Plus,
                "Minus" => BinaryOp::Minus,
                _ => BinaryOp::Sll,
            };
            let left = obj.get("left").ok_or_else(|| format!("{kind} requires 'left'"))?;
            let right = obj.get("right").ok_or_else(|| format!("{kind} requires 'right'"))?;
            Ok(Expr::Binary {
                op,
                left: Box::new(parse_expr(left)?),
                right: Box::new(parse_expr(right)?),
            })
        }

        other => Ok(Expr::Unrecognized {
            kind: other.to_string(),
        }),
    }
}
