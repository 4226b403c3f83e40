//! Aether runtime: an embeddable, capability-gated scripting engine.
//!
//! Scripts are parsed into a syntax tree and evaluated by a tree-walking
//! interpreter against an [`Engine`]'s globals. Pure computation is always
//! available. Anything that touches the host (files, network, processes)
//! goes through a privileged builtin that is checked against the engine's
//! [`CapabilityProfile`] first.
//!
//! # Overview
//!
//! - **Engine**: owns bindings, a trace buffer and a parse cache.
//! - **CapabilityProfile**: fixed at construction; restricted by default.
//! - **Limits**: step and call-depth budgets, counted deterministically.
//!   Expression and value nesting have fixed ceilings on top of these.
//! - **EnginePool**: reusable engines handed out one caller at a time.
//! - **Modules**: `Import name From "path"` loads another script file,
//!   which needs the `FileRead` capability.
//!
//! # Example
//!
//! ```
//! use runtime::{Engine, ErrorKind};
//!
//! let mut engine = Engine::new();
//! let value = engine.eval("Func sq(x) { x * x }\nsq(7)").unwrap();
//! assert_eq!(value.to_string(), "49");
//!
//! let err = engine.eval(r#"WRITE_FILE("out.txt", "hi")"#).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::PermissionDenied);
//! ```

pub mod ast;
pub mod builtins;
mod cache;
mod context;
mod engine;
mod error;
mod interpreter;
mod lexer;
mod limits;
mod ops;
mod optimizer;
mod outcome;
mod parser;
mod pool;
pub mod token;
mod value;

pub use cache::{CacheStats, DEFAULT_CACHE_CAPACITY};
pub use context::TRACE_CAPACITY;
pub use engine::{
    BindingPolicy, EVAL_STACK_SIZE, Engine, EngineBuilder, EngineOptions, VERSION, version,
};
pub use error::{Error, ErrorKind, ParseError, Result, RuntimeError};
pub use interpreter::{Interpreter, MODULE_EXTENSION};
pub use lexer::tokenize;
pub use limits::{LimitError, Limits, MAX_EVAL_DEPTH, MAX_VALUE_DEPTH};
pub use outcome::EvalOutcome;
pub use optimizer::optimize;
pub use parser::{MAX_NESTING, parse};
pub use pool::{EnginePool, PooledEngine};
pub use value::{Function, Value, format_number};

pub use policy::{Capability, CapabilityProfile};
