//! Arithmetic evaluation for Quiver queries.
//!
//! An `Eval` request carries a tree of arithmetic nodes whose leaves are
//! literals or variable bindings. Evaluation is a single strict pass over
//! that tree: exact in, exact out, with the result tagged by the XSD type
//! its representation implies. The surrounding query engine owns
//! scheduling and transport; nothing here suspends or holds state.

pub mod ast;
pub mod eval;

pub use ast::ArithmeticExpr;
pub use eval::{eval, evaluate_arithmetic, BindingLookup, NoBindings};
