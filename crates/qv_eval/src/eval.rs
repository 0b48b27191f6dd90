//! Strict reduction of the arithmetic AST.
//!
//! Subexpressions evaluate left operand first, right second, recursively;
//! the first error encountered is the surfaced error. `Divide` over exact
//! operands always yields a rational (tagged `xsd:decimal`), integer ops
//! tag `xsd:integer`, and a `Double` anywhere makes the result
//! `xsd:double`.

use crate::ast::ArithmeticExpr;
use qv_num::{self as num, NumberValue, NumericError, XsdType};
use serde_json::Value;

/// The caller's binding environment, supplied as an opaque lookup. Bound
/// values are literals in the same shapes the AST's leaves use.
pub trait BindingLookup {
    fn resolve(&self, name: &str) -> Option<Value>;
}

impl<F> BindingLookup for F
where
    F: Fn(&str) -> Option<Value>,
{
    fn resolve(&self, name: &str) -> Option<Value> {
        self(name)
    }
}

/// Lookup for ASTs that carry no variables.
pub struct NoBindings;

impl BindingLookup for NoBindings {
    fn resolve(&self, _name: &str) -> Option<Value> {
        None
    }
}

/// Reduce an arithmetic tree to its value and result tag.
pub fn eval(
    expr: &ArithmeticExpr,
    bindings: &dyn BindingLookup,
) -> Result<(NumberValue, XsdType), NumericError> {
    let nv = eval_value(expr, bindings)?;
    let tag = nv.result_tag();
    Ok((nv, tag))
}

fn eval_value(
    expr: &ArithmeticExpr,
    bindings: &dyn BindingLookup,
) -> Result<NumberValue, NumericError> {
    match expr {
        ArithmeticExpr::Plus { left, right } => {
            let a = eval_value(left, bindings)?;
            let b = eval_value(right, bindings)?;
            Ok(num::add(&a, &b))
        }
        ArithmeticExpr::Minus {
            left: Some(left),
            right: Some(right),
            argument: None,
        } => {
            let a = eval_value(left, bindings)?;
            let b = eval_value(right, bindings)?;
            Ok(num::sub(&a, &b))
        }
        ArithmeticExpr::Minus {
            left: None,
            right: None,
            argument: Some(argument),
        } => {
            let a = eval_value(argument, bindings)?;
            Ok(num::neg(&a))
        }
        ArithmeticExpr::Minus { .. } => Err(NumericError::TypeError {
            op: "minus",
            expected: "left/right pair or a single argument",
            got: "mixed operand shape".into(),
        }),
        ArithmeticExpr::Times { left, right } => {
            let a = eval_value(left, bindings)?;
            let b = eval_value(right, bindings)?;
            Ok(num::mul(&a, &b))
        }
        ArithmeticExpr::Divide { left, right } => {
            let a = eval_value(left, bindings)?;
            let b = eval_value(right, bindings)?;
            num::divide(&a, &b)
        }
        ArithmeticExpr::Div { left, right } => {
            let a = eval_value(left, bindings)?;
            let b = eval_value(right, bindings)?;
            num::int_div(&a, &b)
        }
        ArithmeticExpr::Exp { left, right } => {
            let a = eval_value(left, bindings)?;
            let b = eval_value(right, bindings)?;
            num::pow(&a, &b)
        }
        ArithmeticExpr::Floor { argument } => {
            let a = eval_value(argument, bindings)?;
            num::floor(&a)
        }
        ArithmeticExpr::ArithmeticValue { data } => Ok(qv_lexical::parse_literal(data)?.0),
        ArithmeticExpr::Variable { name } => {
            let bound = bindings.resolve(name).ok_or_else(|| NumericError::TypeMismatch {
                expected: "bound variable".into(),
                got: name.clone(),
            })?;
            Ok(qv_lexical::parse_literal(&bound)?.0)
        }
    }
}

/// Compute-path boundary: deserialize the AST JSON, reduce it, and return
/// the typed-literal result form with a digit-faithful `@value`.
pub fn evaluate_arithmetic(
    ast: &Value,
    bindings: &dyn BindingLookup,
) -> Result<Value, NumericError> {
    // `from_value` loses arbitrary-precision digits for big integers when
    // deserializing into an internally-tagged enum (serde buffers tagged
    // content through a fixed-width numeric representation); round-trip
    // through text instead so digit-faithful literals survive.
    let text = serde_json::to_string(ast)
        .map_err(|e| NumericError::MalformedNumeric(e.to_string()))?;
    let expr: ArithmeticExpr = serde_json::from_str(&text)
        .map_err(|e| NumericError::MalformedNumeric(e.to_string()))?;
    tracing::debug!(expr = %expr, "evaluating arithmetic expression");
    let (nv, tag) = eval(&expr, bindings)?;
    let result = qv_wire::typed_literal(&nv, tag)?;
    tracing::debug!(result_type = %tag, "arithmetic evaluation complete");
    Ok(result)
}
