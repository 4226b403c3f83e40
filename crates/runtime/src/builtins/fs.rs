//! Filesystem builtins. Reads need `FileRead`, mutations need `FileWrite`.

use crate::error::{Result, RuntimeError};
use crate::interpreter::Interpreter;
use crate::value::Value;
use std::fs;
use std::io::Write;
use std::path::Path;

fn io_error(op: &'static str, path: &str, err: std::io::Error) -> RuntimeError {
    RuntimeError::io(op, format!("{path}: {err}"))
}

pub fn read_file(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    let path = args[0].as_str()?;
    tracing::debug!(path, "reading file");
    let content = fs::read_to_string(path).map_err(|e| io_error("READ_FILE", path, e))?;
    Ok(Value::String(content))
}

pub fn file_exists(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    let path = args[0].as_str()?;
    Ok(Value::Bool(Path::new(path).exists()))
}

/// Entry names in a directory, sorted.
pub fn list_dir(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    let path = args[0].as_str()?;
    let mut names = Vec::new();
    for entry in fs::read_dir(path).map_err(|e| io_error("LIST_DIR", path, e))? {
        let entry = entry.map_err(|e| io_error("LIST_DIR", path, e))?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(Value::Array(names.into_iter().map(Value::String).collect()))
}

/// Non-string content is written in its display form.
fn content(value: &Value) -> String {
    value.to_string()
}

pub fn write_file(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    let path = args[0].as_str()?;
    tracing::debug!(path, "writing file");
    fs::write(path, content(&args[1])).map_err(|e| io_error("WRITE_FILE", path, e))?;
    Ok(Value::Null)
}

pub fn append_file(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    let path = args[0].as_str()?;
    tracing::debug!(path, "appending to file");
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| io_error("APPEND_FILE", path, e))?;
    file.write_all(content(&args[1]).as_bytes())
        .map_err(|e| io_error("APPEND_FILE", path, e))?;
    Ok(Value::Null)
}

pub fn delete_file(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    let path = args[0].as_str()?;
    tracing::debug!(path, "deleting file");
    fs::remove_file(path).map_err(|e| io_error("DELETE_FILE", path, e))?;
    Ok(Value::Null)
}
