//! Type inspection and conversion.

use crate::error::{Result, RuntimeError};
use crate::interpreter::Interpreter;
use crate::value::Value;

pub fn len(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    let n = match &args[0] {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Dict(map) => map.len(),
        other => {
            return Err(
                RuntimeError::type_mismatch("string, array or dict", other.type_name()).into(),
            );
        }
    };
    Ok(Value::Number(n as f64))
}

pub fn type_of(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    Ok(Value::from(args[0].type_name()))
}

pub fn to_string(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    Ok(Value::String(args[0].to_string()))
}

pub fn to_number(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    match &args[0] {
        Value::Number(n) => Ok(Value::Number(*n)),
        Value::Bool(b) => Ok(Value::Number(if *b { 1.0 } else { 0.0 })),
        Value::String(s) => s.trim().parse::<f64>().map(Value::Number).map_err(|_| {
            RuntimeError::InvalidArgument(format!("cannot convert \"{s}\" to a number")).into()
        }),
        other => Err(RuntimeError::type_mismatch("string or number", other.type_name()).into()),
    }
}
