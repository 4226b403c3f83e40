//! Console, trace and clock builtins.

use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::value::Value;

fn joined(args: &[Value]) -> String {
    args.iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Records a line in the engine's trace buffer instead of printing it.
pub fn trace(interp: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    interp.record_trace(joined(&args));
    Ok(Value::Null)
}

pub fn print(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    print!("{}", joined(&args));
    Ok(Value::Null)
}

pub fn println(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    println!("{}", joined(&args));
    Ok(Value::Null)
}

/// Current UTC time as an RFC 3339 string.
pub fn now(_: &mut Interpreter<'_>, _: Vec<Value>) -> Result<Value> {
    Ok(Value::String(chrono::Utc::now().to_rfc3339()))
}
