//! Operator semantics for non-short-circuit operators.

use crate::ast::{BinaryOp, UnaryOp};
use crate::error::RuntimeError;
use crate::value::Value;
use std::cmp::Ordering;

pub fn unary(op: UnaryOp, operand: Value) -> Result<Value, RuntimeError> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!operand.is_truthy())),
        UnaryOp::Neg => match operand {
            Value::Number(n) => Ok(Value::Number(-n)),
            other => Err(RuntimeError::Type(format!(
                "cannot negate {}",
                other.type_name()
            ))),
        },
    }
}

pub fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, RuntimeError> {
    match op {
        BinaryOp::Add => add(left, right),
        BinaryOp::Sub => arithmetic(op, &left, &right, |a, b| a - b),
        BinaryOp::Mul => arithmetic(op, &left, &right, |a, b| a * b),
        BinaryOp::Div | BinaryOp::Mod => {
            if right.as_number().is_ok_and(|b| b == 0.0) && matches!(left, Value::Number(_)) {
                return Err(RuntimeError::DivisionByZero);
            }
            if op == BinaryOp::Div {
                arithmetic(op, &left, &right, |a, b| a / b)
            } else {
                arithmetic(op, &left, &right, |a, b| a % b)
            }
        }
        BinaryOp::Eq => Ok(Value::Bool(left == right)),
        BinaryOp::NotEq => Ok(Value::Bool(left != right)),
        BinaryOp::Lt => compare(op, &left, &right).map(|o| Value::Bool(o == Ordering::Less)),
        BinaryOp::Le => compare(op, &left, &right).map(|o| Value::Bool(o != Ordering::Greater)),
        BinaryOp::Gt => compare(op, &left, &right).map(|o| Value::Bool(o == Ordering::Greater)),
        BinaryOp::Ge => compare(op, &left, &right).map(|o| Value::Bool(o != Ordering::Less)),
        BinaryOp::And => Ok(if left.is_truthy() { right } else { left }),
        BinaryOp::Or => Ok(if left.is_truthy() { left } else { right }),
    }
}

fn add(left: Value, right: Value) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
        (Value::String(mut a), Value::String(b)) => {
            a.push_str(&b);
            Ok(Value::String(a))
        }
        (Value::Array(mut a), Value::Array(b)) => {
            a.extend(b);
            Ok(Value::Array(a))
        }
        (left, right) => Err(mismatch(BinaryOp::Add, &left, &right)),
    }
}

fn arithmetic(
    op: BinaryOp,
    left: &Value,
    right: &Value,
    f: impl Fn(f64, f64) -> f64,
) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(f(*a, *b))),
        _ => Err(mismatch(op, left, right)),
    }
}

/// Numbers compare numerically, strings lexicographically.
pub fn compare(op: BinaryOp, left: &Value, right: &Value) -> Result<Ordering, RuntimeError> {
    let ordering = match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    };
    ordering.ok_or_else(|| mismatch(op, left, right))
}

/// Validate `n` as a position in a sequence of length `len`.
pub fn array_index(n: f64, len: usize) -> Result<usize, RuntimeError> {
    if n.fract() != 0.0 || !n.is_finite() {
        return Err(RuntimeError::Type(format!("index must be an integer, got {n}")));
    }
    let index = n as i64;
    if index < 0 || index as usize >= len {
        return Err(RuntimeError::IndexOutOfBounds { index, len });
    }
    Ok(index as usize)
}

/// `object[key]`
pub fn index(object: &Value, key: &Value) -> Result<Value, RuntimeError> {
    match (object, key) {
        (Value::Array(items), Value::Number(n)) => Ok(items[array_index(*n, items.len())?].clone()),
        (Value::String(s), Value::Number(n)) => {
            let i = array_index(*n, s.chars().count())?;
            Ok(s
                .chars()
                .nth(i)
                .map(|c| Value::String(c.to_string()))
                .unwrap_or(Value::Null))
        }
        (Value::Dict(map), Value::String(k)) => map
            .get(k)
            .cloned()
            .ok_or_else(|| RuntimeError::KeyNotFound(k.clone())),
        (object, key) => Err(RuntimeError::Type(format!(
            "cannot index {} with {}",
            object.type_name(),
            key.type_name()
        ))),
    }
}

/// `container[k1][k2]... = value`
pub fn assign_path(container: &mut Value, keys: &[Value], value: Value) -> Result<(), RuntimeError> {
    let Some((key, rest)) = keys.split_first() else {
        *container = value;
        return Ok(());
    };
    let slot = match (container, key) {
        (Value::Array(items), Value::Number(n)) => {
            let i = array_index(*n, items.len())?;
            &mut items[i]
        }
        (Value::Dict(map), Value::String(k)) if rest.is_empty() => {
            map.insert(k.clone(), value);
            return Ok(());
        }
        (Value::Dict(map), Value::String(k)) => map
            .get_mut(k)
            .ok_or_else(|| RuntimeError::KeyNotFound(k.clone()))?,
        (container, key) => {
            return Err(RuntimeError::Type(format!(
                "cannot index {} with {}",
                container.type_name(),
                key.type_name()
            )));
        }
    };
    assign_path(slot, rest, value)
}

fn mismatch(op: BinaryOp, left: &Value, right: &Value) -> RuntimeError {
    RuntimeError::Type(format!(
        "unsupported operand types for {}: {} and {}",
        op.symbol(),
        left.type_name(),
        right.type_name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(binary(BinaryOp::Add, num(2.0), num(3.0)).unwrap(), num(5.0));
        assert_eq!(binary(BinaryOp::Mod, num(7.0), num(4.0)).unwrap(), num(3.0));
        assert_eq!(
            binary(BinaryOp::Add, Value::from("a"), Value::from("b")).unwrap(),
            Value::from("ab")
        );
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(
            binary(BinaryOp::Div, num(1.0), num(0.0)),
            Err(RuntimeError::DivisionByZero)
        );
        assert_eq!(
            binary(BinaryOp::Mod, num(1.0), num(0.0)),
            Err(RuntimeError::DivisionByZero)
        );
    }

    #[test]
    fn test_mixed_types_are_type_errors() {
        assert!(matches!(
            binary(BinaryOp::Add, num(1.0), Value::from("x")),
            Err(RuntimeError::Type(_))
        ));
        assert!(matches!(
            binary(BinaryOp::Lt, num(1.0), Value::Null),
            Err(RuntimeError::Type(_))
        ));
    }

    #[test]
    fn test_logical_operators_return_operands() {
        assert_eq!(binary(BinaryOp::Or, Value::Null, num(2.0)).unwrap(), num(2.0));
        assert_eq!(binary(BinaryOp::And, num(0.0), num(2.0)).unwrap(), num(0.0));
    }

    #[test]
    fn test_index_bounds() {
        let items = Value::Array(vec![num(1.0), num(2.0)]);
        assert_eq!(index(&items, &num(1.0)).unwrap(), num(2.0));
        assert_eq!(
            index(&items, &num(2.0)),
            Err(RuntimeError::IndexOutOfBounds { index: 2, len: 2 })
        );
        assert!(matches!(
            index(&items, &num(0.5)),
            Err(RuntimeError::Type(_))
        ));
        assert_eq!(index(&Value::from("héllo"), &num(1.0)).unwrap(), Value::from("é"));
    }

    #[test]
    fn test_assign_nested_path() {
        let mut grid = Value::Array(vec![Value::Array(vec![num(0.0), num(0.0)])]);
        assign_path(&mut grid, &[num(0.0), num(1.0)], num(9.0)).unwrap();
        assert_eq!(grid, Value::Array(vec![Value::Array(vec![num(0.0), num(9.0)])]));

        let mut dict = Value::Dict(Default::default());
        assign_path(&mut dict, &[Value::from("k")], num(1.0)).unwrap();
        assert_eq!(index(&dict, &Value::from("k")).unwrap(), num(1.0));
    }

    #[test]
    fn test_equality_across_types_is_false() {
        assert_eq!(
            binary(BinaryOp::Eq, num(1.0), Value::from("1")).unwrap(),
            Value::Bool(false)
        );
    }
}
