//! Operator semantics.

use crate::ast::{BinaryOp, UnaryOp};
use crate::error::{RuntimeError, RuntimeResult};
use crate::value::Value;

/// Longest string or list that `*` or `+` may produce.
const MAX_SEQUENCE_LEN: usize = 10_000_000;

pub fn binary(op: BinaryOp, left: &Value, right: &Value) -> RuntimeResult<Value> {
    match op {
        BinaryOp::Add => add(left, right),
        BinaryOp::Sub => arithmetic(op, left, right, i64::checked_sub, |a, b| a - b),
        BinaryOp::Mul => multiply(left, right),
        BinaryOp::Div => divide(left, right),
        BinaryOp::Rem => remainder(left, right),
        BinaryOp::Eq => Ok(Value::Bool(left.equals(right))),
        BinaryOp::NotEq => Ok(Value::Bool(!left.equals(right))),
        BinaryOp::Less => Ok(Value::Bool(left.compare(right)?.is_lt())),
        BinaryOp::LessEq => Ok(Value::Bool(left.compare(right)?.is_le())),
        BinaryOp::Greater => Ok(Value::Bool(left.compare(right)?.is_gt())),
        BinaryOp::GreaterEq => Ok(Value::Bool(left.compare(right)?.is_ge())),
    }
}

pub fn unary(op: UnaryOp, operand: &Value) -> RuntimeResult<Value> {
    match (op, operand) {
        (UnaryOp::Not, value) => Ok(Value::Bool(!value.is_truthy())),
        (UnaryOp::Neg, Value::Int(i)) => i.checked_neg().map(Value::Int).ok_or(RuntimeError::Overflow("-")),
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Neg, other) => Err(RuntimeError::type_error(format!(
            "cannot negate {}",
            other.type_name()
        ))),
    }
}

fn mismatch(op: BinaryOp, left: &Value, right: &Value) -> RuntimeError {
    RuntimeError::type_error(format!(
        "unsupported operand types for {}: {} and {}",
        op.symbol(),
        left.type_name(),
        right.type_name()
    ))
}

fn arithmetic(
    op: BinaryOp,
    left: &Value,
    right: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> RuntimeResult<Value> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => int_op(*a, *b)
            .map(Value::Int)
            .ok_or(RuntimeError::Overflow(op.symbol())),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            let (a, b) = (left.as_float().unwrap_or_default(), right.as_float().unwrap_or_default());
            Ok(Value::Float(float_op(a, b)))
        }
        _ => Err(mismatch(op, left, right)),
    }
}

fn add(left: &Value, right: &Value) -> RuntimeResult<Value> {
    match (left, right) {
        (Value::Str(a), b) => concat(a, &b.to_string()),
        (a, Value::Str(b)) => concat(&a.to_string(), b),
        (Value::List(_), Value::List(_)) => {
            let mut items = left.list_snapshot().unwrap_or_default();
            let tail = right.list_snapshot().unwrap_or_default();
            check_len(items.len().saturating_add(tail.len()), "concatenation")?;
            items.extend(tail);
            Ok(Value::list(items))
        }
        _ => arithmetic(BinaryOp::Add, left, right, i64::checked_add, |a, b| a + b),
    }
}

fn concat(a: &str, b: &str) -> RuntimeResult<Value> {
    check_len(a.chars().count().saturating_add(b.chars().count()), "concatenation")?;
    Ok(Value::Str(format!("{a}{b}")))
}

fn multiply(left: &Value, right: &Value) -> RuntimeResult<Value> {
    match (left, right) {
        (Value::Str(s), Value::Int(n)) | (Value::Int(n), Value::Str(s)) => {
            let n = repeat_count(*n, s.chars().count())?;
            Ok(Value::Str(s.repeat(n)))
        }
        (Value::List(_), Value::Int(n)) | (Value::Int(n), Value::List(_)) => {
            let items = left
                .list_snapshot()
                .or_else(|| right.list_snapshot())
                .unwrap_or_default();
            let n = repeat_count(*n, items.len())?;
            let mut out = Vec::with_capacity(items.len() * n);
            for _ in 0..n {
                out.extend(items.iter().cloned());
            }
            Ok(Value::list(out))
        }
        _ => arithmetic(BinaryOp::Mul, left, right, i64::checked_mul, |a, b| a * b),
    }
}

fn repeat_count(n: i64, unit: usize) -> RuntimeResult<usize> {
    let n = usize::try_from(n.max(0)).unwrap_or(usize::MAX);
    check_len(unit.saturating_mul(n), "repetition")?;
    Ok(n)
}

fn check_len(len: usize, what: &str) -> RuntimeResult<()> {
    if len > MAX_SEQUENCE_LEN {
        return Err(RuntimeError::Value(format!(
            "{what} would exceed {MAX_SEQUENCE_LEN} elements"
        )));
    }
    Ok(())
}

/// Integer division floors.
fn divide(left: &Value, right: &Value) -> RuntimeResult<Value> {
    match (left, right) {
        (Value::Int(_), Value::Int(0)) => Err(RuntimeError::DivisionByZero),
        (Value::Int(a), Value::Int(b)) => {
            let quotient = a.checked_div(*b).ok_or(RuntimeError::Overflow("/"))?;
            let adjust = (a % b != 0) && ((*a < 0) != (*b < 0));
            Ok(Value::Int(if adjust { quotient - 1 } else { quotient }))
        }
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            let b = right.as_float().unwrap_or_default();
            if b == 0.0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Ok(Value::Float(left.as_float().unwrap_or_default() / b))
        }
        _ => Err(mismatch(BinaryOp::Div, left, right)),
    }
}

/// Remainder takes the sign of the divisor.
fn remainder(left: &Value, right: &Value) -> RuntimeResult<Value> {
    match (left, right) {
        (Value::Int(_), Value::Int(0)) => Err(RuntimeError::DivisionByZero),
        (Value::Int(a), Value::Int(b)) => {
            let r = a.checked_rem(*b).ok_or(RuntimeError::Overflow("%"))?;
            Ok(Value::Int(if r != 0 && ((r < 0) != (*b < 0)) { r + b } else { r }))
        }
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            let (a, b) = (left.as_float().unwrap_or_default(), right.as_float().unwrap_or_default());
            if b == 0.0 {
                return Err(RuntimeError::DivisionByZero);
            }
            let r = a % b;
            Ok(Value::Float(if r != 0.0 && ((r < 0.0) != (b < 0.0)) { r + b } else { r }))
        }
        _ => Err(mismatch(BinaryOp::Rem, left, right)),
    }
}
