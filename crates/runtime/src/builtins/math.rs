//! Numeric builtins.

use super::integer;
use crate::error::{Result, RuntimeError};
use crate::interpreter::Interpreter;
use crate::value::Value;

fn unary(args: &[Value], f: impl Fn(f64) -> f64) -> Result<Value> {
    Ok(Value::Number(f(args[0].as_number()?)))
}

pub fn abs(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    unary(&args, f64::abs)
}

pub fn floor(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    unary(&args, f64::floor)
}

pub fn ceil(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    unary(&args, f64::ceil)
}

/// `ROUND(x)` or `ROUND(x, digits)`.
pub fn round(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    let x = args[0].as_number()?;
    let digits = match args.get(1) {
        Some(d) => integer(d, "digits")?,
        None => 0,
    };
    let factor = 10f64.powi(digits.clamp(-15, 15) as i32);
    Ok(Value::Number((x * factor).round() / factor))
}

pub fn sqrt(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    let x = args[0].as_number()?;
    if x < 0.0 {
        return Err(RuntimeError::InvalidArgument(format!(
            "cannot take the square root of {x}"
        ))
        .into());
    }
    Ok(Value::Number(x.sqrt()))
}

pub fn pow(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    Ok(Value::Number(args[0].as_number()?.powf(args[1].as_number()?)))
}

/// Numbers from either a single array argument or the argument list.
fn numbers(name: &str, args: &[Value]) -> Result<Vec<f64>> {
    let values = match args {
        [Value::Array(items)] => items.as_slice(),
        _ => args,
    };
    if values.is_empty() {
        return Err(RuntimeError::InvalidArgument(format!("{name} of an empty array")).into());
    }
    Ok(values
        .iter()
        .map(Value::as_number)
        .collect::<std::result::Result<_, _>>()?)
}

pub fn min(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    let values = numbers("MIN", &args)?;
    Ok(Value::Number(values.into_iter().fold(f64::INFINITY, f64::min)))
}

pub fn max(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    let values = numbers("MAX", &args)?;
    Ok(Value::Number(
        values.into_iter().fold(f64::NEG_INFINITY, f64::max),
    ))
}

pub fn sum(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    let total = args[0]
        .as_array()?
        .iter()
        .map(Value::as_number)
        .sum::<std::result::Result<f64, _>>()?;
    Ok(Value::Number(total))
}
