//! Pest-based parser for the expression language

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

use tabula_ir::Value;

use crate::ast::{BinOp, Expr, UnOp};

#[derive(Parser)]
#[grammar = "expr.pest"]
struct ExprParser;

/// Syntax error with the byte offset of the failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error at offset {position}: {message}")]
pub struct ParseError {
    pub position: usize,
    pub message: String,
}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(e: pest::error::Error<Rule>) -> Self {
        let position = match e.location {
            pest::error::InputLocation::Pos(pos) => pos,
            pest::error::InputLocation::Span((start, _)) => start,
        };
        ParseError {
            position,
            message: e.variant.message().into_owned(),
        }
    }
}

/// Parse an expression string into an AST.
pub(crate) fn parse(source: &str) -> Result<Expr, ParseError> {
    let mut pairs = ExprParser::parse(Rule::expression, source)?;
    let expression = pairs.next().expect("grammar yields exactly one expression");
    let expr = expression
        .into_inner()
        .next()
        .expect("expression wraps an expr");
    build_expr(expr)
}

fn build_expr(pair: Pair<Rule>) -> Result<Expr, ParseError> {
    match pair.as_rule() {
        Rule::expr | Rule::primary => build_expr(pair.into_inner().next().unwrap()),
        Rule::or_expr => fold_logical(pair, BinOp::Or),
        Rule::and_expr => fold_logical(pair, BinOp::And),
        Rule::not_expr => build_unary(pair, UnOp::Not),
        Rule::unary_expr => build_unary(pair, UnOp::Neg),
        Rule::cmp_expr => {
            let mut inner = pair.into_inner();
            let left = build_expr(inner.next().unwrap())?;
            match inner.next() {
                None => Ok(left),
                Some(op_pair) => {
                    let op = match op_pair.as_str() {
                        ">=" => BinOp::Ge,
                        "<=" => BinOp::Le,
                        "==" => BinOp::Eq,
                        "!=" => BinOp::Ne,
                        ">" => BinOp::Gt,
                        "<" => BinOp::Lt,
                        other => unreachable!("unknown comparison operator: {other}"),
                    };
                    let right = build_expr(inner.next().unwrap())?;
                    Ok(binary(op, left, right))
                }
            }
        }
        Rule::add_expr | Rule::mul_expr => {
            let mut inner = pair.into_inner();
            let mut left = build_expr(inner.next().unwrap())?;
            while let Some(op_pair) = inner.next() {
                let op = match op_pair.as_str() {
                    "+" => BinOp::Add,
                    "-" => BinOp::Sub,
                    "*" => BinOp::Mul,
                    "/" => BinOp::Div,
                    other => unreachable!("unknown arithmetic operator: {other}"),
                };
                let right = build_expr(inner.next().unwrap())?;
                left = binary(op, left, right);
            }
            Ok(left)
        }
        Rule::literal => build_literal(pair),
        Rule::ident => Ok(Expr::Column(pair.as_str().to_string())),
        rule => unreachable!("unexpected rule: {rule:?}"),
    }
}

// not_expr and unary_expr share their shape: an optional prefix token
// followed by the operand, or a bare fall-through to the next level.
fn build_unary(pair: Pair<Rule>, op: UnOp) -> Result<Expr, ParseError> {
    let mut inner = pair.into_inner();
    let first = inner.next().unwrap();
    match first.as_rule() {
        Rule::not_kw | Rule::neg_op => {
            let operand = build_expr(inner.next().unwrap())?;
            Ok(Expr::UnaryOp {
                op,
                expr: Box::new(operand),
            })
        }
        _ => build_expr(first),
    }
}

fn fold_logical(pair: Pair<Rule>, op: BinOp) -> Result<Expr, ParseError> {
    let mut inner = pair.into_inner();
    let mut left = build_expr(inner.next().unwrap())?;
    while let Some(kw) = inner.next() {
        debug_assert!(matches!(kw.as_rule(), Rule::or_kw | Rule::and_kw));
        let right = build_expr(inner.next().unwrap())?;
        left = binary(op, left, right);
    }
    Ok(left)
}

fn build_literal(pair: Pair<Rule>) -> Result<Expr, ParseError> {
    let inner = pair.into_inner().next().unwrap();
    let value = match inner.as_rule() {
        Rule::decimal => {
            let text = inner.as_str();
            Value::Float(text.parse().map_err(|_| ParseError {
                position: inner.as_span().start(),
                message: format!("invalid float literal: {text}"),
            })?)
        }
        Rule::int => {
            let text = inner.as_str();
            Value::Int(text.parse().map_err(|_| ParseError {
                position: inner.as_span().start(),
                message: format!("integer literal out of range: {text}"),
            })?)
        }
        Rule::string => {
            let quoted = inner.as_str();
            Value::Str(quoted[1..quoted.len() - 1].to_string())
        }
        Rule::boolean => Value::Bool(inner.as_str() == "true"),
        rule => unreachable!("unexpected literal rule: {rule:?}"),
    };
    Ok(Expr::Literal(value))
}

fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
    Expr::BinaryOp {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}
