//! Process spawning. Needs `ProcessSpawn`.

use crate::error::{Result, RuntimeError};
use crate::interpreter::Interpreter;
use crate::value::Value;
use std::collections::BTreeMap;
use std::process::Command;

/// `EXEC(program)` or `EXEC(program, [args...])`.
///
/// Runs to completion without a shell and returns
/// `{status, stdout, stderr}`. `status` is null if the process was killed
/// by a signal.
pub fn exec(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    let program = args[0].as_str()?;
    let argv: Vec<String> = match args.get(1) {
        None => Vec::new(),
        Some(list) => list.as_array()?.iter().map(Value::to_string).collect(),
    };

    tracing::debug!(program, ?argv, "spawning process");
    let output = Command::new(program)
        .args(&argv)
        .output()
        .map_err(|e| RuntimeError::io("EXEC", format!("{program}: {e}")))?;

    let status = output
        .status
        .code()
        .map(|code| Value::Number(f64::from(code)))
        .unwrap_or(Value::Null);
    Ok(Value::Dict(BTreeMap::from([
        ("status".to_string(), status),
        (
            "stdout".to_string(),
            Value::String(String::from_utf8_lossy(&output.stdout).into_owned()),
        ),
        (
            "stderr".to_string(),
            Value::String(String::from_utf8_lossy(&output.stderr).into_owned()),
        ),
    ])))
}
