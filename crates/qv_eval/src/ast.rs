//! The arithmetic AST as it arrives from the query layer.
//!
//! Nodes are `@type`-tagged JSON objects. `Minus` doubles as binary
//! subtraction (`left`/`right`) and unary negation (`argument`); the
//! evaluator enforces that exactly one of the two shapes is present.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum ArithmeticExpr {
    Plus {
        left: Box<ArithmeticExpr>,
        right: Box<ArithmeticExpr>,
    },
    Minus {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        left: Option<Box<ArithmeticExpr>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        right: Option<Box<ArithmeticExpr>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        argument: Option<Box<ArithmeticExpr>>,
    },
    Times {
        left: Box<ArithmeticExpr>,
        right: Box<ArithmeticExpr>,
    },
    Divide {
        left: Box<ArithmeticExpr>,
        right: Box<ArithmeticExpr>,
    },
    Div {
        left: Box<ArithmeticExpr>,
        right: Box<ArithmeticExpr>,
    },
    Exp {
        left: Box<ArithmeticExpr>,
        right: Box<ArithmeticExpr>,
    },
    Floor {
        argument: Box<ArithmeticExpr>,
    },
    /// A literal leaf: `data` holds either a bare JSON number or a
    /// typed-literal dict.
    ArithmeticValue {
        data: Value,
    },
    /// A reference into the caller's binding environment.
    Variable {
        name: String,
    },
}

/// Infix rendering for logs and error context.
impl fmt::Display for ArithmeticExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArithmeticExpr::Plus { left, right } => write!(f, "({left} + {right})"),
            ArithmeticExpr::Minus {
                left: Some(left),
                right: Some(right),
                ..
            } => write!(f, "({left} - {right})"),
            ArithmeticExpr::Minus {
                argument: Some(argument),
                ..
            } => write!(f, "(-{argument})"),
            ArithmeticExpr::Minus { .. } => f.write_str("(-?)"),
            ArithmeticExpr::Times { left, right } => write!(f, "({left} * {right})"),
            ArithmeticExpr::Divide { left, right } => write!(f, "({left} / {right})"),
            ArithmeticExpr::Div { left, right } => write!(f, "({left} div {right})"),
            ArithmeticExpr::Exp { left, right } => write!(f, "({left} ** {right})"),
            ArithmeticExpr::Floor { argument } => write!(f, "floor({argument})"),
            ArithmeticExpr::ArithmeticValue { data } => match data.get("@value") {
                Some(v) => write!(f, "{v}"),
                None => write!(f, "{data}"),
            },
            ArithmeticExpr::Variable { name } => write!(f, "?{name}"),
        }
    }
}
