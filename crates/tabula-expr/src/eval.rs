//! Tree-walking evaluator
//!
//! Evaluates a compiled expression against one row's column bindings. There
//! is no host-language execution anywhere on this path: the operator set is
//! closed, and column resolution happens here, at evaluation time, so an
//! expression compiled before a `select` or `add_column` still sees the
//! schema current at the step that runs it.

use std::collections::HashMap;

use thiserror::Error;

use tabula_ir::Value;

use crate::ast::{BinOp, Expr, UnOp};

/// Row-level column lookup.
pub trait Bindings {
    fn get(&self, name: &str) -> Option<&Value>;
}

impl Bindings for HashMap<String, Value> {
    fn get(&self, name: &str) -> Option<&Value> {
        HashMap::get(self, name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("undefined column: {0}")]
    UndefinedColumn(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow")]
    Overflow,
}

/// A parsed expression, ready to evaluate against row bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpr {
    pub(crate) root: Expr,
}

impl CompiledExpr {
    /// Evaluate as a boolean predicate.
    pub fn eval_predicate<B: Bindings>(&self, bindings: &B) -> Result<bool, EvalError> {
        match eval(&self.root, bindings)? {
            Value::Bool(b) => Ok(b),
            other => Err(EvalError::TypeMismatch(format!(
                "predicate evaluated to {}, expected bool",
                other.type_name()
            ))),
        }
    }

    /// Evaluate as a scalar formula.
    pub fn eval_scalar<B: Bindings>(&self, bindings: &B) -> Result<Value, EvalError> {
        eval(&self.root, bindings)
    }
}

fn eval<B: Bindings>(expr: &Expr, bindings: &B) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Column(name) => bindings
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UndefinedColumn(name.clone())),
        Expr::UnaryOp { op, expr } => {
            let value = eval(expr, bindings)?;
            match (op, value) {
                (UnOp::Neg, Value::Int(i)) => {
                    i.checked_neg().map(Value::Int).ok_or(EvalError::Overflow)
                }
                (UnOp::Neg, Value::Float(x)) => Ok(Value::Float(-x)),
                (UnOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                (UnOp::Neg, v) => Err(EvalError::TypeMismatch(format!(
                    "cannot negate {}",
                    v.type_name()
                ))),
                (UnOp::Not, v) => Err(EvalError::TypeMismatch(format!(
                    "cannot apply `not` to {}",
                    v.type_name()
                ))),
            }
        }
        Expr::BinaryOp { op, left, right } => match op {
            // `and`/`or` short-circuit left to right
            BinOp::And => match eval(left, bindings)? {
                Value::Bool(false) => Ok(Value::Bool(false)),
                Value::Bool(true) => expect_bool(eval(right, bindings)?, "and"),
                v => Err(connective_mismatch("and", &v)),
            },
            BinOp::Or => match eval(left, bindings)? {
                Value::Bool(true) => Ok(Value::Bool(true)),
                Value::Bool(false) => expect_bool(eval(right, bindings)?, "or"),
                v => Err(connective_mismatch("or", &v)),
            },
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => {
                let l = eval(left, bindings)?;
                let r = eval(right, bindings)?;
                arithmetic(*op, l, r)
            }
            BinOp::Eq | BinOp::Ne => {
                let l = eval(left, bindings)?;
                let r = eval(right, bindings)?;
                let eq = equals(*op, &l, &r)?;
                Ok(Value::Bool(if *op == BinOp::Eq { eq } else { !eq }))
            }
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                let l = eval(left, bindings)?;
                let r = eval(right, bindings)?;
                let ord = ordering(*op, &l, &r)?;
                Ok(Value::Bool(match op {
                    BinOp::Lt => ord.is_lt(),
                    BinOp::Le => ord.is_le(),
                    BinOp::Gt => ord.is_gt(),
                    BinOp::Ge => ord.is_ge(),
                    _ => unreachable!(),
                }))
            }
        },
    }
}

fn expect_bool(value: Value, op: &str) -> Result<Value, EvalError> {
    match value {
        Value::Bool(_) => Ok(value),
        v => Err(connective_mismatch(op, &v)),
    }
}

fn connective_mismatch(op: &str, value: &Value) -> EvalError {
    EvalError::TypeMismatch(format!(
        "`{op}` requires bool operands, got {}",
        value.type_name()
    ))
}

/// Integer arithmetic stays integer, mixed operands promote to float.
/// Division of two ints is int only when it is exact, float otherwise;
/// a zero divisor is always an error, never an IEEE infinity.
fn arithmetic(op: BinOp, l: Value, r: Value) -> Result<Value, EvalError> {
    match (op, &l, &r) {
        (BinOp::Add, Value::Str(a), Value::Str(b)) => {
            let mut out = a.clone();
            out.push_str(b);
            Ok(Value::Str(out))
        }
        (BinOp::Div, _, _) => divide(&l, &r),
        (_, Value::Int(a), Value::Int(b)) => {
            let result = match op {
                BinOp::Add => a.checked_add(*b),
                BinOp::Sub => a.checked_sub(*b),
                BinOp::Mul => a.checked_mul(*b),
                _ => unreachable!(),
            };
            result.map(Value::Int).ok_or(EvalError::Overflow)
        }
        _ => {
            let (a, b) = as_floats(&l, &r).ok_or_else(|| operand_mismatch(op, &l, &r))?;
            Ok(Value::Float(match op {
                BinOp::Add => a + b,
                BinOp::Sub => a - b,
                BinOp::Mul => a * b,
                _ => unreachable!(),
            }))
        }
    }
}

fn divide(l: &Value, r: &Value) -> Result<Value, EvalError> {
    if let (Value::Int(a), Value::Int(b)) = (l, r) {
        if *b == 0 {
            return Err(EvalError::DivisionByZero);
        }
        return match a.checked_rem(*b) {
            None => Err(EvalError::Overflow), // i64::MIN / -1
            Some(0) => a.checked_div(*b).map(Value::Int).ok_or(EvalError::Overflow),
            Some(_) => Ok(Value::Float(*a as f64 / *b as f64)),
        };
    }
    let (a, b) = as_floats(l, r).ok_or_else(|| operand_mismatch(BinOp::Div, l, r))?;
    if b == 0.0 {
        return Err(EvalError::DivisionByZero);
    }
    Ok(Value::Float(a / b))
}

fn equals(op: BinOp, l: &Value, r: &Value) -> Result<bool, EvalError> {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => Ok(a == b),
        (Value::Str(a), Value::Str(b)) => Ok(a == b),
        (Value::Bool(a), Value::Bool(b)) => Ok(a == b),
        _ => {
            let (a, b) = as_floats(l, r).ok_or_else(|| operand_mismatch(op, l, r))?;
            Ok(a == b)
        }
    }
}

fn ordering(op: BinOp, l: &Value, r: &Value) -> Result<std::cmp::Ordering, EvalError> {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        _ => {
            let (a, b) = as_floats(l, r).ok_or_else(|| operand_mismatch(op, l, r))?;
            a.partial_cmp(&b)
                .ok_or_else(|| EvalError::TypeMismatch("unordered float comparison".to_string()))
        }
    }
}

fn as_floats(l: &Value, r: &Value) -> Option<(f64, f64)> {
    let promote = |v: &Value| match v {
        Value::Int(i) => Some(*i as f64),
        Value::Float(x) => Some(*x),
        _ => None,
    };
    Some((promote(l)?, promote(r)?))
}

fn operand_mismatch(op: BinOp, l: &Value, r: &Value) -> EvalError {
    EvalError::TypeMismatch(format!(
        "cannot apply `{}` to {} and {}",
        op.symbol(),
        l.type_name(),
        r.type_name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile;

    fn bindings(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn scalar(source: &str, b: &HashMap<String, Value>) -> Result<Value, EvalError> {
        compile(source).unwrap().eval_scalar(b)
    }

    fn predicate(source: &str, b: &HashMap<String, Value>) -> Result<bool, EvalError> {
        compile(source).unwrap().eval_predicate(b)
    }

    #[test]
    fn test_integer_arithmetic_stays_integer() {
        let b = bindings(&[]);
        assert_eq!(scalar("2 + 3 * 4", &b).unwrap(), Value::Int(14));
        assert_eq!(scalar("10 - 7", &b).unwrap(), Value::Int(3));
    }

    #[test]
    fn test_mixed_arithmetic_promotes_to_float() {
        let b = bindings(&[]);
        assert_eq!(scalar("2 + 0.5", &b).unwrap(), Value::Float(2.5));
        assert_eq!(scalar("2.0 * 3", &b).unwrap(), Value::Float(6.0));
    }

    #[test]
    fn test_exact_integer_division_stays_integer() {
        let b = bindings(&[]);
        assert_eq!(scalar("10 / 2", &b).unwrap(), Value::Int(5));
        assert_eq!(scalar("10 / 4", &b).unwrap(), Value::Float(2.5));
        assert_eq!(scalar("10 / 4.0", &b).unwrap(), Value::Float(2.5));
    }

    #[test]
    fn test_division_by_zero() {
        let b = bindings(&[("age", Value::Int(0))]);
        assert_eq!(scalar("1 / 0", &b), Err(EvalError::DivisionByZero));
        assert_eq!(scalar("1 / 0.0", &b), Err(EvalError::DivisionByZero));
        assert_eq!(scalar("1 / age", &b), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn test_column_lookup() {
        let b = bindings(&[("age", Value::Int(40))]);
        assert_eq!(scalar("age * 2", &b).unwrap(), Value::Int(80));
        assert_eq!(
            scalar("height * 2", &b),
            Err(EvalError::UndefinedColumn("height".to_string()))
        );
    }

    #[test]
    fn test_string_concatenation_and_comparison() {
        let b = bindings(&[("name", Value::Str("Bob".to_string()))]);
        assert_eq!(
            scalar("name + '!'", &b).unwrap(),
            Value::Str("Bob!".to_string())
        );
        assert!(predicate("name == 'Bob'", &b).unwrap());
        assert!(predicate("name < 'Carl'", &b).unwrap());
    }

    #[test]
    fn test_comparisons_promote_numeric_operands() {
        let b = bindings(&[]);
        assert!(predicate("1 == 1.0", &b).unwrap());
        assert!(predicate("3 > 2.5", &b).unwrap());
    }

    #[test]
    fn test_connectives_short_circuit() {
        let b = bindings(&[]);
        // The right operand would fail on its own; short-circuit skips it.
        assert!(!predicate("false and 1 / 0 > 1", &b).unwrap());
        assert!(predicate("true or 1 / 0 > 1", &b).unwrap());
        assert_eq!(
            predicate("true and 1 / 0 > 1", &b),
            Err(EvalError::DivisionByZero)
        );
    }

    #[test]
    fn test_connectives_require_bools() {
        let b = bindings(&[]);
        assert!(matches!(
            predicate("1 and true", &b),
            Err(EvalError::TypeMismatch(_))
        ));
        assert!(matches!(
            predicate("true and 1", &b),
            Err(EvalError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_not_and_negation() {
        let b = bindings(&[("age", Value::Int(20))]);
        assert!(predicate("not age > 30", &b).unwrap());
        assert_eq!(scalar("-age", &b).unwrap(), Value::Int(-20));
        assert!(matches!(
            scalar("-'x'", &b),
            Err(EvalError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_predicate_must_be_boolean() {
        let b = bindings(&[("age", Value::Int(20))]);
        assert!(matches!(
            predicate("age + 1", &b),
            Err(EvalError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_mismatched_operand_types() {
        let b = bindings(&[("name", Value::Str("A".to_string()))]);
        assert!(matches!(
            scalar("name + 1", &b),
            Err(EvalError::TypeMismatch(_))
        ));
        assert!(matches!(
            predicate("name > 1", &b),
            Err(EvalError::TypeMismatch(_))
        ));
        assert!(matches!(
            predicate("true == 1", &b),
            Err(EvalError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_null_is_a_type_error() {
        let b = bindings(&[("age", Value::Null)]);
        assert!(matches!(
            scalar("age + 1", &b),
            Err(EvalError::TypeMismatch(_))
        ));
        assert!(matches!(
            predicate("age == 1", &b),
            Err(EvalError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_integer_overflow_is_an_error() {
        let b = bindings(&[("big", Value::Int(i64::MAX))]);
        assert_eq!(scalar("big + 1", &b), Err(EvalError::Overflow));
        assert_eq!(scalar("big * 2", &b), Err(EvalError::Overflow));
    }
}
