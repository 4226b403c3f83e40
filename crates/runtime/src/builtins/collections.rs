//! Array, dictionary and JSON builtins.
//!
//! Collections are values, so these return new collections rather than
//! modifying their arguments: `xs = PUSH(xs, 4)`.

use crate::ast::BinaryOp;
use crate::error::{Result, RuntimeError};
use crate::interpreter::Interpreter;
use crate::limits::check_value_depth;
use crate::ops;
use crate::value::Value;
use std::cmp::Ordering;

/// Largest array `RANGE` will build.
const MAX_RANGE_LEN: usize = 10_000_000;

pub fn push(_: &mut Interpreter<'_>, mut args: Vec<Value>) -> Result<Value> {
    let item = args.pop().unwrap_or(Value::Null);
    let mut items = args.pop().unwrap_or(Value::Null).into_array()?;
    check_value_depth(1 + item.depth())?;
    items.push(item);
    Ok(Value::Array(items))
}

/// Returns the array without its last element.
pub fn pop(_: &mut Interpreter<'_>, mut args: Vec<Value>) -> Result<Value> {
    let mut items = args.pop().unwrap_or(Value::Null).into_array()?;
    if items.pop().is_none() {
        return Err(RuntimeError::InvalidArgument("POP of an empty array".into()).into());
    }
    Ok(Value::Array(items))
}

pub fn keys(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    let map = args[0].as_dict()?;
    Ok(Value::Array(map.keys().map(|k| Value::from(k.as_str())).collect()))
}

pub fn values(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    let map = args[0].as_dict()?;
    Ok(Value::Array(map.values().cloned().collect()))
}

pub fn has(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    let map = args[0].as_dict()?;
    Ok(Value::Bool(map.contains_key(args[1].as_str()?)))
}

/// `RANGE(end)`, `RANGE(start, end)` or `RANGE(start, end, step)`.
pub fn range(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    let numbers = args
        .iter()
        .map(Value::as_number)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let (start, end, step) = match numbers.as_slice() {
        [end] => (0.0, *end, 1.0),
        [start, end] => (*start, *end, 1.0),
        [start, end, step] => (*start, *end, *step),
        _ => (0.0, 0.0, 1.0),
    };
    if step == 0.0 || !step.is_finite() {
        return Err(RuntimeError::InvalidArgument("RANGE step must be a non-zero number".into()).into());
    }

    let len = ((end - start) / step).ceil();
    if len > MAX_RANGE_LEN as f64 {
        return Err(RuntimeError::InvalidArgument(format!(
            "RANGE would produce more than {MAX_RANGE_LEN} items"
        ))
        .into());
    }
    let len = if len > 0.0 { len as usize } else { 0 };
    Ok(Value::Array(
        (0..len)
            .map(|i| Value::Number(start + step * i as f64))
            .collect(),
    ))
}

/// Sorts numbers or strings. Mixed arrays are rejected.
pub fn sort(_: &mut Interpreter<'_>, mut args: Vec<Value>) -> Result<Value> {
    let mut items = args.pop().unwrap_or(Value::Null).into_array()?;
    let homogeneous = items.iter().all(|v| matches!(v, Value::Number(_)))
        || items.iter().all(|v| matches!(v, Value::String(_)));
    if !homogeneous {
        return Err(RuntimeError::Type("SORT needs all numbers or all strings".into()).into());
    }
    items.sort_by(|a, b| ops::compare(BinaryOp::Lt, a, b).unwrap_or(Ordering::Equal));
    Ok(Value::Array(items))
}

pub fn reverse(_: &mut Interpreter<'_>, mut args: Vec<Value>) -> Result<Value> {
    match args.pop().unwrap_or(Value::Null) {
        Value::Array(mut items) => {
            items.reverse();
            Ok(Value::Array(items))
        }
        Value::String(s) => Ok(Value::String(s.chars().rev().collect())),
        other => Err(RuntimeError::type_mismatch("array or string", other.type_name()).into()),
    }
}

pub fn map(interp: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    let [items, func] = pair(args);
    let mut out = Vec::new();
    for item in items.into_array()? {
        let mapped = interp.call(&func, vec![item])?;
        check_value_depth(1 + mapped.depth())?;
        out.push(mapped);
    }
    Ok(Value::Array(out))
}

pub fn filter(interp: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    let [items, func] = pair(args);
    let mut out = Vec::new();
    for item in items.into_array()? {
        if interp.call(&func, vec![item.clone()])?.is_truthy() {
            out.push(item);
        }
    }
    Ok(Value::Array(out))
}

/// `REDUCE(items, f, initial)` calls `f(acc, item)` left to right.
pub fn reduce(interp: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    let mut args = args.into_iter();
    let items = args.next().unwrap_or(Value::Null).into_array()?;
    let func = args.next().unwrap_or(Value::Null);
    let mut acc = args.next().unwrap_or(Value::Null);
    for item in items {
        acc = interp.call(&func, vec![acc, item])?;
    }
    Ok(acc)
}

pub fn json_parse(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    let json: serde_json::Value = serde_json::from_str(args[0].as_str()?)
        .map_err(|e| RuntimeError::InvalidArgument(format!("invalid JSON: {e}")))?;
    Ok(Value::from_json(json))
}

/// `JSON_STRINGIFY(value)` or `JSON_STRINGIFY(value, pretty)`.
pub fn json_stringify(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    let json = args[0].to_json()?;
    let pretty = args.get(1).is_some_and(Value::is_truthy);
    let text = if pretty {
        serde_json::to_string_pretty(&json)
    } else {
        serde_json::to_string(&json)
    }
    .map_err(|e| RuntimeError::InvalidArgument(e.to_string()))?;
    Ok(Value::String(text))
}

fn pair(args: Vec<Value>) -> [Value; 2] {
    let mut args = args.into_iter();
    [
        args.next().unwrap_or(Value::Null),
        args.next().unwrap_or(Value::Null),
    ]
}
