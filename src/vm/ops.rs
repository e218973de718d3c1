//! Runtime operator semantics.
//!
//! One implementation serves both the VM dispatch loop and compile-time
//! constant folding, so an optimised program cannot observe different
//! arithmetic than an unoptimised one.
//!
//! Rules: mixed int/float arithmetic promotes to float; i64 arithmetic
//! wraps; `+` concatenates two strings and is otherwise a type error;
//! division and modulo by zero (int or float) are runtime errors; value
//! equality compares across numeric types while strict equality requires
//! the same type tag.

use std::rc::Rc;

use crate::hir::{BinaryOp, CompareOp, UnaryOp};
use crate::vm::error::VmError;
use crate::vm::value::Value;

/// Applies a unary operator.
pub fn unary(op: UnaryOp, operand: &Value) -> Result<Value, VmError> {
    match op {
        UnaryOp::Neg => match operand {
            Value::Int(value) => Ok(Value::Int(value.wrapping_neg())),
            Value::Float(value) => Ok(Value::Float(-value)),
            other => Err(VmError::type_mismatch(format!(
                "cannot negate a value of type {}",
                other.type_name()
            ))),
        },
        UnaryOp::Not => Ok(Value::Bool(!operand.is_truthy())),
    }
}

/// Applies a binary arithmetic operator.
pub fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, VmError> {
    match op {
        BinaryOp::Add => match (left, right) {
            (Value::Int(l), Value::Int(r)) => Ok(Value::Int(l.wrapping_add(*r))),
            (Value::Str(l), Value::Str(r)) => {
                let mut combined = String::with_capacity(l.len() + r.len());
                combined.push_str(l);
                combined.push_str(r);
                Ok(Value::Str(Rc::from(combined)))
            }
            _ => match float_pair(left, right) {
                Some((l, r)) => Ok(Value::Float(l + r)),
                None => Err(type_error("add", left, right)),
            },
        },
        BinaryOp::Sub => match (left, right) {
            (Value::Int(l), Value::Int(r)) => Ok(Value::Int(l.wrapping_sub(*r))),
            _ => match float_pair(left, right) {
                Some((l, r)) => Ok(Value::Float(l - r)),
                None => Err(type_error("subtract", left, right)),
            },
        },
        BinaryOp::Mul => match (left, right) {
            (Value::Int(l), Value::Int(r)) => Ok(Value::Int(l.wrapping_mul(*r))),
            _ => match float_pair(left, right) {
                Some((l, r)) => Ok(Value::Float(l * r)),
                None => Err(type_error("multiply", left, right)),
            },
        },
        BinaryOp::Div => match (left, right) {
            (Value::Int(l), Value::Int(r)) => {
                if *r == 0 {
                    Err(VmError::division_by_zero())
                } else {
                    Ok(Value::Int(l.wrapping_div(*r)))
                }
            }
            _ => match float_pair(left, right) {
                Some((l, r)) => {
                    if r == 0.0 {
                        Err(VmError::division_by_zero())
                    } else {
                        Ok(Value::Float(l / r))
                    }
                }
                None => Err(type_error("divide", left, right)),
            },
        },
        BinaryOp::Mod => match (left, right) {
            (Value::Int(l), Value::Int(r)) => {
                if *r == 0 {
                    Err(VmError::division_by_zero())
                } else {
                    Ok(Value::Int(l.wrapping_rem(*r)))
                }
            }
            _ => match float_pair(left, right) {
                Some((l, r)) => {
                    if r == 0.0 {
                        Err(VmError::division_by_zero())
                    } else {
                        Ok(Value::Float(l % r))
                    }
                }
                None => Err(type_error("take the remainder of", left, right)),
            },
        },
        BinaryOp::Pow => match (left, right) {
            (Value::Int(base), Value::Int(exp)) => {
                if *exp >= 0 {
                    Ok(Value::Int(pow_wrapping(*base, *exp as u64)))
                } else {
                    // A negative exponent leaves the integers.
                    Ok(Value::Float((*base as f64).powf(*exp as f64)))
                }
            }
            _ => match float_pair(left, right) {
                Some((l, r)) => Ok(Value::Float(l.powf(r))),
                None => Err(type_error("raise", left, right)),
            },
        },
    }
}

/// Applies a comparison operator, yielding a boolean.
pub fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<Value, VmError> {
    let result = match op {
        CompareOp::Eq => value_eq(left, right),
        CompareOp::NotEq => !value_eq(left, right),
        CompareOp::StrictEq => strict_eq(left, right),
        CompareOp::StrictNotEq => !strict_eq(left, right),
        CompareOp::Lt => order(left, right)?.is_lt(),
        CompareOp::Gt => order(left, right)?.is_gt(),
        CompareOp::Lte => order(left, right)?.is_le(),
        CompareOp::Gte => order(left, right)?.is_ge(),
    };
    Ok(Value::Bool(result))
}

/// Value equality with cross-numeric coercion (`5 == 5.0`).
pub fn value_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Empty, Value::Empty) => true,
        (Value::Bool(l), Value::Bool(r)) => l == r,
        (Value::Int(l), Value::Int(r)) => l == r,
        (Value::Float(l), Value::Float(r)) => l == r,
        (Value::Int(l), Value::Float(r)) | (Value::Float(r), Value::Int(l)) => *l as f64 == *r,
        (Value::Str(l), Value::Str(r)) => l == r,
        (Value::Url(l), Value::Url(r)) => l == r,
        (Value::Function(l), Value::Function(r)) => l == r,
        (Value::Builtin(l), Value::Builtin(r)) => l == r,
        _ => false,
    }
}

/// Strict equality: identical type tags, no numeric coercion.
pub fn strict_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(l), Value::Int(r)) => l == r,
        (Value::Float(l), Value::Float(r)) => l == r,
        (Value::Int(_), Value::Float(_)) | (Value::Float(_), Value::Int(_)) => false,
        _ => value_eq(left, right),
    }
}

/// Non-short-circuit `AND`: yields the deciding operand.
pub fn logical_and(left: Value, right: Value) -> Value {
    if left.is_truthy() {
        right
    } else {
        left
    }
}

/// Non-short-circuit `OR`: yields the deciding operand.
pub fn logical_or(left: Value, right: Value) -> Value {
    if left.is_truthy() {
        left
    } else {
        right
    }
}

fn order(left: &Value, right: &Value) -> Result<std::cmp::Ordering, VmError> {
    use std::cmp::Ordering;
    match (left, right) {
        (Value::Int(l), Value::Int(r)) => Ok(l.cmp(r)),
        (Value::Str(l), Value::Str(r)) => Ok(l.cmp(r)),
        _ => match float_pair(left, right) {
            Some((l, r)) => Ok(l.partial_cmp(&r).unwrap_or(Ordering::Equal)),
            None => Err(type_error("order", left, right)),
        },
    }
}

fn float_pair(left: &Value, right: &Value) -> Option<(f64, f64)> {
    let l = match left {
        Value::Int(value) => *value as f64,
        Value::Float(value) => *value,
        _ => return None,
    };
    let r = match right {
        Value::Int(value) => *value as f64,
        Value::Float(value) => *value,
        _ => return None,
    };
    Some((l, r))
}

fn type_error(verb: &str, left: &Value, right: &Value) -> VmError {
    VmError::type_mismatch(format!(
        "cannot {verb} {} and {}",
        left.type_name(),
        right.type_name()
    ))
}

/// Exponentiation by squaring with wrapping multiplication.
fn pow_wrapping(base: i64, mut exp: u64) -> i64 {
    let mut result: i64 = 1;
    let mut factor = base;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result.wrapping_mul(factor);
        }
        factor = factor.wrapping_mul(factor);
        exp >>= 1;
    }
    result
}
