//! String builtins.

use crate::error::{Result, RuntimeError};
use crate::interpreter::Interpreter;
use crate::value::Value;

pub fn upper(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    Ok(Value::String(args[0].as_str()?.to_uppercase()))
}

pub fn lower(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    Ok(Value::String(args[0].as_str()?.to_lowercase()))
}

pub fn trim(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    Ok(Value::from(args[0].as_str()?.trim()))
}

/// `SPLIT(s, sep)`. An empty separator splits into characters.
pub fn split(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    let s = args[0].as_str()?;
    let sep = args[1].as_str()?;
    let parts = if sep.is_empty() {
        s.chars().map(|c| Value::String(c.to_string())).collect()
    } else {
        s.split(sep).map(Value::from).collect()
    };
    Ok(Value::Array(parts))
}

/// `JOIN(items)` or `JOIN(items, sep)`.
pub fn join(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    let items = args[0].as_array()?;
    let sep = match args.get(1) {
        Some(sep) => sep.as_str()?,
        None => "",
    };
    let joined = items
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(sep);
    Ok(Value::String(joined))
}

pub fn replace(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    let s = args[0].as_str()?;
    let from = args[1].as_str()?;
    if from.is_empty() {
        return Err(RuntimeError::InvalidArgument("REPLACE pattern must not be empty".into()).into());
    }
    Ok(Value::String(s.replace(from, args[2].as_str()?)))
}

/// Substring for strings, membership for arrays, key presence for dicts.
pub fn contains(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    let found = match (&args[0], &args[1]) {
        (Value::String(s), needle) => s.contains(needle.as_str()?),
        (Value::Array(items), needle) => items.contains(needle),
        (Value::Dict(map), key) => map.contains_key(key.as_str()?),
        (other, _) => {
            return Err(
                RuntimeError::type_mismatch("string, array or dict", other.type_name()).into(),
            );
        }
    };
    Ok(Value::Bool(found))
}

#[cfg(test)]
mod tests {
    use crate::Engine;

    fn eval(source: &str) -> String {
        Engine::new().eval(source).unwrap().to_string()
    }

    #[test]
    fn test_case_and_trim() {
        assert_eq!(eval(r#"UPPER("abc")"#), "ABC");
        assert_eq!(eval(r#"LOWER("ÀB")"#), "àb");
        assert_eq!(eval(r#"TRIM("  x \n")"#), "x");
    }

    #[test]
    fn test_split_and_join() {
        assert_eq!(eval(r#"SPLIT("a,b,,c", ",")"#), r#"["a", "b", "", "c"]"#);
        assert_eq!(eval(r#"SPLIT("ab", "")"#), r#"["a", "b"]"#);
        assert_eq!(eval(r#"JOIN([1, "b", True], "-")"#), "1-b-true");
        assert_eq!(eval(r#"JOIN(["x", "y"])"#), "xy");
    }

    #[test]
    fn test_replace_and_contains() {
        assert_eq!(eval(r#"REPLACE("a-b-c", "-", "+")"#), "a+b+c");
        assert_eq!(eval(r#"CONTAINS("haystack", "st")"#), "true");
        assert_eq!(eval("CONTAINS([1, 2], 3)"), "false");
        assert_eq!(eval(r#"CONTAINS({k: 1}, "k")"#), "true");
        assert!(Engine::new().eval(r#"REPLACE("a", "", "b")"#).is_err());
    }

    #[test]
    fn test_string_builtins_reject_other_types() {
        let err = Engine::new().eval("UPPER(1)").unwrap_err();
        assert_eq!(err.to_string(), "type error: expected string, got number");
    }
}
