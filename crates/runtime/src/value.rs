//! Script values.

use crate::ast::Body;
use crate::error::RuntimeError;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// A dynamically typed script value.
///
/// Arrays and dictionaries have value semantics: assigning or passing one
/// copies it, and mutation through one name is never visible through
/// another.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Dict(BTreeMap<String, Value>),
    Function(Arc<Function>),
    Builtin(&'static str),
}

/// A user-defined function or closure.
#[derive(Debug)]
pub struct Function {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Body,
    /// Locals of the defining frame, copied when the function was created.
    pub captured: HashMap<String, Value>,
    /// Module the function was defined in, if any.
    pub module: Option<Arc<PathBuf>>,
    depth: usize,
}

impl Function {
    pub fn new(
        name: Option<String>,
        params: Vec<String>,
        body: Body,
        captured: HashMap<String, Value>,
    ) -> Self {
        let depth = 1 + captured.values().map(Value::depth).max().unwrap_or(0);
        Self {
            name,
            params,
            body,
            captured,
            module: None,
            depth,
        }
    }

    pub(crate) fn in_module(mut self, module: Option<Arc<PathBuf>>) -> Self {
        self.module = module;
        self
    }

    /// One more than the deepest captured value.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Dict(_) => "dict",
            Value::Function(_) | Value::Builtin(_) => "function",
        }
    }

    /// `Null`, `False`, `0`, `""`, `[]` and `{}` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Dict(map) => !map.is_empty(),
            Value::Function(_) | Value::Builtin(_) => true,
        }
    }

    /// Nesting depth. Scalars are 0; a container is one more than its
    /// deepest member.
    pub fn depth(&self) -> usize {
        match self {
            Value::Array(items) => 1 + items.iter().map(Value::depth).max().unwrap_or(0),
            Value::Dict(map) => 1 + map.values().map(Value::depth).max().unwrap_or(0),
            Value::Function(func) => func.depth(),
            _ => 0,
        }
    }

    pub fn as_number(&self) -> Result<f64, RuntimeError> {
        match self {
            Value::Number(n) => Ok(*n),
            other => Err(RuntimeError::type_mismatch("number", other.type_name())),
        }
    }

    pub fn as_str(&self) -> Result<&str, RuntimeError> {
        match self {
            Value::String(s) => Ok(s),
            other => Err(RuntimeError::type_mismatch("string", other.type_name())),
        }
    }

    pub fn as_array(&self) -> Result<&[Value], RuntimeError> {
        match self {
            Value::Array(items) => Ok(items),
            other => Err(RuntimeError::type_mismatch("array", other.type_name())),
        }
    }

    pub fn into_array(self) -> Result<Vec<Value>, RuntimeError> {
        match self {
            Value::Array(items) => Ok(items),
            other => Err(RuntimeError::type_mismatch("array", other.type_name())),
        }
    }

    pub fn as_dict(&self) -> Result<&BTreeMap<String, Value>, RuntimeError> {
        match self {
            Value::Dict(map) => Ok(map),
            other => Err(RuntimeError::type_mismatch("dict", other.type_name())),
        }
    }

    /// Rendering used inside arrays and dictionaries: strings are quoted.
    pub fn render_nested(&self) -> String {
        match self {
            Value::String(s) => quote(s),
            other => other.to_string(),
        }
    }

    /// Convert to JSON. Functions have no JSON form.
    pub fn to_json(&self) -> Result<serde_json::Value, RuntimeError> {
        Ok(match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(Value::to_json)
                    .collect::<Result<_, _>>()?,
            ),
            Value::Dict(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| Ok((k.clone(), v.to_json()?)))
                    .collect::<Result<_, RuntimeError>>()?,
            ),
            Value::Function(_) | Value::Builtin(_) => {
                return Err(RuntimeError::Type(
                    "functions cannot be converted to JSON".into(),
                ));
            }
        })
    }

    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Dict(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

/// Integral values print without a fractional part.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1.0e16 {
        format!("{}", n as i64)
    } else if n.is_nan() {
        "NaN".to_string()
    } else if n == f64::INFINITY {
        "Infinity".to_string()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else {
        format!("{n}")
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Top-level rendering: strings appear raw.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => f.write_str(s),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(&item.render_nested())?;
                }
                f.write_str("]")
            }
            Value::Dict(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", quote(key), value.render_nested())?;
                }
                f.write_str("}")
            }
            Value::Function(func) => write!(f, "<function {}>", func.display_name()),
            Value::Builtin(name) => write!(f, "<builtin {name}>"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Dict(a), Value::Dict(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            _ => false,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_formatting() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
        assert_eq!(format_number(f64::NAN), "NaN");
    }

    #[test]
    fn test_top_level_strings_are_raw_nested_are_quoted() {
        let value = Value::Array(vec![
            Value::from("a"),
            Value::from(1.0),
            Value::Dict(BTreeMap::from([("k".to_string(), Value::from("v\"w"))])),
        ]);
        assert_eq!(Value::from("hi").to_string(), "hi");
        assert_eq!(value.to_string(), r#"["a", 1, {"k": "v\"w"}]"#);
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::from(0.0).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::Array(vec![]).is_truthy());
        assert!(Value::from("0").is_truthy());
        assert!(Value::Builtin("LEN").is_truthy());
    }

    #[test]
    fn test_json_conversion() {
        let json = serde_json::json!({"a": [1, 2.5, null], "b": true});
        let value = Value::from_json(json.clone());
        assert_eq!(value.to_json().unwrap(), json);
    }

    #[test]
    fn test_depth() {
        assert_eq!(Value::from(1.0).depth(), 0);
        assert_eq!(Value::Array(vec![]).depth(), 1);
        let nested = Value::Array(vec![
            Value::from(1.0),
            Value::Dict(BTreeMap::from([("k".to_string(), Value::Array(vec![]))])),
        ]);
        assert_eq!(nested.depth(), 3);

        let closure = Function::new(
            None,
            vec![],
            Vec::<crate::ast::Stmt>::new().into(),
            HashMap::from([("xs".to_string(), nested)]),
        );
        assert_eq!(closure.depth(), 4);
        assert_eq!(Value::Function(Arc::new(closure)).depth(), 4);
    }

    #[test]
    fn test_functions_have_no_json_form() {
        assert!(Value::Builtin("LEN").to_json().is_err());
    }
}
