//! Tabula expression language - parser and evaluator
//!
//! A restricted expression language for row-level predicates and formulas:
//! literals, column identifiers, arithmetic, comparisons, boolean
//! connectives, parentheses. Nothing else parses, which is what makes
//! evaluating translator-generated formulas safe.

mod ast;
mod eval;
mod parser;

pub use ast::{BinOp, Expr, UnOp};
pub use eval::{Bindings, CompiledExpr, EvalError};
pub use parser::ParseError;

/// Compile an expression string. Call once per distinct expression and reuse
/// the result across rows.
pub fn compile(source: &str) -> Result<CompiledExpr, ParseError> {
    Ok(CompiledExpr {
        root: parser::parse(source)?,
    })
}
