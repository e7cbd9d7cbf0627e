//! Sandboxed expression evaluation.
//!
//! Conditions run against a closed scope: indicator values plus `price`.
//! Every node visit charges one step against a fixed budget, so no
//! condition can run unbounded. Errors here never abort a backtest; the
//! caller treats a failed condition as "not met" and counts it.

use std::collections::HashMap;

use crate::domain::expr::{BinaryOp, Expr, UnaryOp};

/// Maximum expression nodes visited per condition evaluation.
pub const EVAL_BUDGET: u32 = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Num(f64),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("unknown identifier '{0}'")]
    UnknownIdent(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("non-finite arithmetic result")]
    NonFinite,

    #[error("evaluation budget exhausted")]
    BudgetExhausted,
}

/// Variable bindings for one evaluation. Indicator names resolve with or
/// without the `indicators.` prefix; lookup is case-insensitive on the
/// variable name.
pub struct Scope<'a> {
    vars: &'a HashMap<String, f64>,
    price: f64,
}

impl<'a> Scope<'a> {
    pub fn new(vars: &'a HashMap<String, f64>, price: f64) -> Self {
        Scope { vars, price }
    }

    fn resolve(&self, ident: &str) -> Option<f64> {
        if ident.eq_ignore_ascii_case("price") {
            return Some(self.price);
        }
        let name = ident.strip_prefix("indicators.").unwrap_or(ident);
        if let Some(v) = self.vars.get(name) {
            return Some(*v);
        }
        self.vars.get(&name.to_uppercase()).copied()
    }
}

/// Evaluate a condition to a boolean. A numeric top-level result is a
/// type error; conditions must compare or combine, never just name a
/// value.
pub fn eval_condition(expr: &Expr, scope: &Scope<'_>) -> Result<bool, EvalError> {
    let mut steps = 0u32;
    match eval(expr, scope, &mut steps)? {
        Value::Bool(b) => Ok(b),
        Value::Num(_) => Err(EvalError::TypeMismatch(
            "condition must evaluate to a boolean".into(),
        )),
    }
}

fn eval(expr: &Expr, scope: &Scope<'_>, steps: &mut u32) -> Result<Value, EvalError> {
    if *steps >= EVAL_BUDGET {
        return Err(EvalError::BudgetExhausted);
    }
    *steps += 1;

    match expr {
        Expr::Number(n) => Ok(Value::Num(*n)),
        Expr::Ident(name) => scope
            .resolve(name)
            .map(Value::Num)
            .ok_or_else(|| EvalError::UnknownIdent(name.clone())),
        Expr::Unary { op, operand } => {
            let value = eval(operand, scope, steps)?;
            match (op, value) {
                (UnaryOp::Neg, Value::Num(n)) => Ok(Value::Num(-n)),
                (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                (UnaryOp::Neg, Value::Bool(_)) => {
                    Err(EvalError::TypeMismatch("cannot negate a boolean".into()))
                }
                (UnaryOp::Not, Value::Num(_)) => {
                    Err(EvalError::TypeMismatch("'!' requires a boolean".into()))
                }
            }
        }
        Expr::Binary { op, left, right } => {
            // && and || short-circuit; everything else is strict.
            match op {
                BinaryOp::And => {
                    if !expect_bool(eval(left, scope, steps)?, op)? {
                        return Ok(Value::Bool(false));
                    }
                    Ok(Value::Bool(expect_bool(eval(right, scope, steps)?, op)?))
                }
                BinaryOp::Or => {
                    if expect_bool(eval(left, scope, steps)?, op)? {
                        return Ok(Value::Bool(true));
                    }
                    Ok(Value::Bool(expect_bool(eval(right, scope, steps)?, op)?))
                }
                _ => {
                    let l = expect_num(eval(left, scope, steps)?, op)?;
                    let r = expect_num(eval(right, scope, steps)?, op)?;
                    apply_numeric(*op, l, r)
                }
            }
        }
    }
}

fn apply_numeric(op: BinaryOp, l: f64, r: f64) -> Result<Value, EvalError> {
    let num = |n: f64| {
        if n.is_finite() {
            Ok(Value::Num(n))
        } else {
            Err(EvalError::NonFinite)
        }
    };
    match op {
        BinaryOp::Add => num(l + r),
        BinaryOp::Sub => num(l - r),
        BinaryOp::Mul => num(l * r),
        BinaryOp::Div => {
            if r == 0.0 {
                Err(EvalError::DivisionByZero)
            } else {
                num(l / r)
            }
        }
        BinaryOp::Lt => Ok(Value::Bool(l < r)),
        BinaryOp::Le => Ok(Value::Bool(l <= r)),
        BinaryOp::Gt => Ok(Value::Bool(l > r)),
        BinaryOp::Ge => Ok(Value::Bool(l >= r)),
        BinaryOp::Eq => Ok(Value::Bool(l == r)),
        BinaryOp::Ne => Ok(Value::Bool(l != r)),
        BinaryOp::And | BinaryOp::Or => unreachable!("handled by the caller"),
    }
}

fn expect_num(value: Value, op: &BinaryOp) -> Result<f64, EvalError> {
    match value {
        Value::Num(n) => Ok(n),
        Value::Bool(_) => Err(EvalError::TypeMismatch(format!(
            "'{}' requires numeric operands",
            op.symbol()
        ))),
    }
}

fn expect_bool(value: Value, op: &BinaryOp) -> Result<bool, EvalError> {
    match value {
        Value::Bool(b) => Ok(b),
        Value::Num(_) => Err(EvalError::TypeMismatch(format!(
            "'{}' requires boolean operands",
            op.symbol()
        ))),
    }
}
