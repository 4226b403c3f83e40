//! Native primitives callable from scripts.
//!
//! Pure builtins compute from their arguments alone. Privileged builtins
//! declare the capability they need; the interpreter checks it against
//! the engine's profile before arity or arguments are even looked at.

mod collections;
mod convert;
mod fs;
mod host;
mod math;
mod net;
mod process;
mod text;

use crate::error::{Result, RuntimeError};
use crate::interpreter::Interpreter;
use crate::value::Value;
use policy::Capability;
use std::fmt;

pub type BuiltinFn = fn(&mut Interpreter<'_>, Vec<Value>) -> Result<Value>;

/// Accepted argument counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Between(usize, usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exact(n) => count == n,
            Arity::Between(min, max) => (min..=max).contains(&count),
            Arity::AtLeast(min) => count >= min,
        }
    }

    pub fn check(&self, name: &str, count: usize) -> std::result::Result<(), RuntimeError> {
        if self.accepts(count) {
            return Ok(());
        }
        Err(RuntimeError::Arity {
            name: name.to_string(),
            expected: self.to_string(),
            got: count,
        })
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{n}"),
            Arity::Between(min, max) => write!(f, "{min} to {max}"),
            Arity::AtLeast(min) => write!(f, "at least {min}"),
        }
    }
}

/// A registered primitive.
#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub arity: Arity,
    pub capability: Option<Capability>,
    pub func: BuiltinFn,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("capability", &self.capability)
            .finish()
    }
}

const fn pure(name: &'static str, arity: Arity, func: BuiltinFn) -> Builtin {
    Builtin {
        name,
        arity,
        capability: None,
        func,
    }
}

const fn privileged(
    name: &'static str,
    arity: Arity,
    capability: Capability,
    func: BuiltinFn,
) -> Builtin {
    Builtin {
        name,
        arity,
        capability: Some(capability),
        func,
    }
}

use Arity::{AtLeast, Between, Exact};

static REGISTRY: &[Builtin] = &[
    // Types and conversion
    pure("LEN", Exact(1), convert::len),
    pure("TYPE", Exact(1), convert::type_of),
    pure("TO_STRING", Exact(1), convert::to_string),
    pure("TO_NUMBER", Exact(1), convert::to_number),
    // Math
    pure("ABS", Exact(1), math::abs),
    pure("FLOOR", Exact(1), math::floor),
    pure("CEIL", Exact(1), math::ceil),
    pure("ROUND", Between(1, 2), math::round),
    pure("SQRT", Exact(1), math::sqrt),
    pure("POW", Exact(2), math::pow),
    pure("MIN", AtLeast(1), math::min),
    pure("MAX", AtLeast(1), math::max),
    pure("SUM", Exact(1), math::sum),
    // Strings
    pure("UPPER", Exact(1), text::upper),
    pure("LOWER", Exact(1), text::lower),
    pure("TRIM", Exact(1), text::trim),
    pure("SPLIT", Exact(2), text::split),
    pure("JOIN", Between(1, 2), text::join),
    pure("REPLACE", Exact(3), text::replace),
    pure("CONTAINS", Exact(2), text::contains),
    // Collections
    pure("PUSH", Exact(2), collections::push),
    pure("POP", Exact(1), collections::pop),
    pure("KEYS", Exact(1), collections::keys),
    pure("VALUES", Exact(1), collections::values),
    pure("HAS", Exact(2), collections::has),
    pure("RANGE", Between(1, 3), collections::range),
    pure("SORT", Exact(1), collections::sort),
    pure("REVERSE", Exact(1), collections::reverse),
    pure("MAP", Exact(2), collections::map),
    pure("FILTER", Exact(2), collections::filter),
    pure("REDUCE", Exact(3), collections::reduce),
    pure("JSON_PARSE", Exact(1), collections::json_parse),
    pure("JSON_STRINGIFY", Between(1, 2), collections::json_stringify),
    // Host
    pure("TRACE", AtLeast(1), host::trace),
    pure("PRINT", AtLeast(0), host::print),
    pure("PRINTLN", AtLeast(0), host::println),
    pure("NOW", Exact(0), host::now),
    // Filesystem
    privileged("READ_FILE", Exact(1), Capability::FileRead, fs::read_file),
    privileged("FILE_EXISTS", Exact(1), Capability::FileRead, fs::file_exists),
    privileged("LIST_DIR", Exact(1), Capability::FileRead, fs::list_dir),
    privileged("WRITE_FILE", Exact(2), Capability::FileWrite, fs::write_file),
    privileged("APPEND_FILE", Exact(2), Capability::FileWrite, fs::append_file),
    privileged("DELETE_FILE", Exact(1), Capability::FileWrite, fs::delete_file),
    // Network
    privileged("HTTP_GET", Exact(1), Capability::NetworkConnect, net::http_get),
    privileged("HTTP_POST", Between(2, 3), Capability::NetworkConnect, net::http_post),
    // Processes
    privileged("EXEC", Between(1, 2), Capability::ProcessSpawn, process::exec),
];

/// Find a builtin by its script name.
pub fn lookup(name: &str) -> Option<&'static Builtin> {
    REGISTRY.iter().find(|b| b.name == name)
}

/// Every registered builtin.
pub fn all() -> &'static [Builtin] {
    REGISTRY
}

/// Require an integral number argument.
fn integer(value: &Value, what: &str) -> std::result::Result<i64, RuntimeError> {
    let n = value.as_number()?;
    if n.fract() != 0.0 || !n.is_finite() {
        return Err(RuntimeError::InvalidArgument(format!(
            "{what} must be an integer, got {n}"
        )));
    }
    Ok(n as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique() {
        let names: HashSet<_> = all().iter().map(|b| b.name).collect();
        assert_eq!(names.len(), all().len());
    }

    #[test]
    fn test_privileged_builtins_declare_capabilities() {
        let privileged: Vec<_> = all()
            .iter()
            .filter_map(|b| b.capability.map(|c| (b.name, c)))
            .collect();
        assert!(privileged.contains(&("WRITE_FILE", Capability::FileWrite)));
        assert!(privileged.contains(&("EXEC", Capability::ProcessSpawn)));
        assert_eq!(lookup("LEN").unwrap().capability, None);
    }

    #[test]
    fn test_arity_messages() {
        assert_eq!(Arity::Between(1, 3).to_string(), "1 to 3");
        let err = Arity::Exact(2).check("POW", 1).unwrap_err();
        assert_eq!(err.to_string(), "POW expects 2 argument(s), got 1");
    }
}
