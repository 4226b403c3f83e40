//! Tree-walking evaluator.

use crate::ast::{BinaryOp, Body, Expr, ImportName, Program, Stmt, Target};
use crate::builtins::{self, Builtin};
use crate::cache;
use crate::context::ExecutionContext;
use crate::error::{Error, Result, RuntimeError};
use crate::limits::{LimitError, Limits, MAX_EVAL_DEPTH, check_value_depth};
use crate::ops;
use crate::value::{Function, Value};
use policy::{Capability, CapabilityProfile, CapabilityRequest, Decision};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

/// Extension added to module paths that have none.
pub const MODULE_EXTENSION: &str = "aether";

/// Non-local exits. Errors travel the same path as control flow.
enum Unwind {
    Error(Error),
    Return(Value),
    Break,
    Continue,
}

impl From<Error> for Unwind {
    fn from(err: Error) -> Self {
        Unwind::Error(err)
    }
}

impl From<RuntimeError> for Unwind {
    fn from(err: RuntimeError) -> Self {
        Unwind::Error(err.into())
    }
}

impl From<LimitError> for Unwind {
    fn from(err: LimitError) -> Self {
        Unwind::Error(err.into())
    }
}

type Exec<T> = std::result::Result<T, Unwind>;

/// A module whose top level is still running.
struct Loading {
    path: Arc<PathBuf>,
    exports: BTreeMap<String, Value>,
}

/// Executes programs against an engine's context and capability profile.
///
/// An interpreter lives for a single evaluation. Everything that must
/// outlast it belongs to the engine's execution context.
pub struct Interpreter<'a> {
    ctx: &'a mut ExecutionContext,
    profile: &'a CapabilityProfile,
    limits: &'a Limits,
    optimize: bool,
    nesting: usize,
    loading: Vec<Loading>,
}

impl<'a> Interpreter<'a> {
    pub(crate) fn new(
        ctx: &'a mut ExecutionContext,
        profile: &'a CapabilityProfile,
        limits: &'a Limits,
    ) -> Self {
        Self {
            ctx,
            profile,
            limits,
            optimize: true,
            nesting: 0,
            loading: Vec::new(),
        }
    }

    /// Whether imported modules are constant-folded like the main program.
    pub(crate) fn optimizing(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }

    /// Run a program. Its value is the value of its last statement.
    pub fn run(&mut self, program: &Program) -> Result<Value> {
        self.ctx.begin();
        match self.exec_block(&program.statements) {
            Ok(value) | Err(Unwind::Return(value)) => Ok(value),
            Err(Unwind::Error(err)) => Err(err),
            Err(Unwind::Break) => Err(RuntimeError::StrayControl("Break").into()),
            Err(Unwind::Continue) => Err(RuntimeError::StrayControl("Continue").into()),
        }
    }

    /// Call a function or builtin value with already evaluated arguments.
    pub fn call(&mut self, callee: &Value, args: Vec<Value>) -> Result<Value> {
        match callee {
            Value::Function(function) => self.call_function(Arc::clone(function), args),
            Value::Builtin(name) => {
                let builtin = builtins::lookup(name)
                    .ok_or_else(|| RuntimeError::UndefinedVariable(name.to_string()))?;
                self.call_builtin(builtin, args)
            }
            other => Err(RuntimeError::NotCallable(other.type_name()).into()),
        }
    }

    /// Append a line to the engine's trace buffer.
    pub fn record_trace(&mut self, line: String) {
        tracing::debug!(target: "aether::trace", "{line}");
        self.ctx.record_trace(line);
    }

    fn call_builtin(&mut self, builtin: &'static Builtin, args: Vec<Value>) -> Result<Value> {
        // Capability first: a denied primitive must not even validate its input.
        if let Some(capability) = builtin.capability {
            let scope = match args.first() {
                Some(Value::String(s)) => Some(s.clone()),
                _ => None,
            };
            self.require(capability, scope, builtin.name)?;
        }
        builtin.arity.check(builtin.name, args.len())?;
        (builtin.func)(self, args)
    }

    fn require(&self, capability: Capability, scope: Option<String>, primitive: &str) -> Result<()> {
        let request = match scope {
            Some(scope) => CapabilityRequest::with_scope(capability, scope),
            None => CapabilityRequest::new(capability),
        };
        match self.profile.check(&request) {
            Decision::Allow => Ok(()),
            Decision::Deny { reason } => {
                tracing::warn!(primitive, %reason, "capability denied");
                Err(Error::PermissionDenied {
                    capability,
                    primitive: primitive.to_string(),
                    scope: request.scope,
                })
            }
        }
    }

    fn call_function(&mut self, function: Arc<Function>, args: Vec<Value>) -> Result<Value> {
        if args.len() != function.params.len() {
            return Err(RuntimeError::Arity {
                name: function.display_name().to_string(),
                expected: function.params.len().to_string(),
                got: args.len(),
            }
            .into());
        }
        if let Some(limit) = self.limits.max_call_depth {
            if self.ctx.depth() >= limit {
                return Err(LimitError::CallDepth { limit }.into());
            }
        }

        let mut locals: HashMap<String, Value> =
            function.params.iter().cloned().zip(args).collect();
        if let Some(name) = &function.name {
            locals
                .entry(name.clone())
                .or_insert_with(|| Value::Function(Arc::clone(&function)));
        }

        self.ctx.push_frame(Arc::clone(&function), locals);
        let result = self.exec_block(&function.body);
        self.ctx.pop_frame();

        match result {
            Ok(value) | Err(Unwind::Return(value)) => Ok(value),
            Err(Unwind::Error(err)) => Err(err),
            Err(Unwind::Break) => Err(RuntimeError::StrayControl("Break").into()),
            Err(Unwind::Continue) => Err(RuntimeError::StrayControl("Continue").into()),
        }
    }

    /// Run `f` one level deeper, failing once [`MAX_EVAL_DEPTH`] is reached.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Exec<T>) -> Exec<T> {
        if self.nesting >= MAX_EVAL_DEPTH {
            return Err(LimitError::EvalDepth {
                limit: MAX_EVAL_DEPTH,
            }
            .into());
        }
        self.nesting += 1;
        let result = f(self);
        self.nesting -= 1;
        result
    }

    fn tick(&mut self) -> Exec<()> {
        let steps = self.ctx.tick();
        match self.limits.max_steps {
            Some(limit) if steps > limit => Err(LimitError::Steps { limit }.into()),
            _ => Ok(()),
        }
    }

    fn exec_block(&mut self, statements: &[Stmt]) -> Exec<Value> {
        let mut last = Value::Null;
        for statement in statements {
            last = self.exec(statement)?;
        }
        Ok(last)
    }

    fn exec(&mut self, statement: &Stmt) -> Exec<Value> {
        self.tick()?;
        match statement {
            Stmt::Expr(expr) => self.eval(expr),
            Stmt::Assign { target, value } => {
                let value = self.eval(value)?;
                self.assign(target, value.clone())?;
                Ok(value)
            }
            Stmt::FuncDef { name, params, body } => {
                let function = self.make_function(Some(name.clone()), params, body)?;
                self.ctx.assign(name.clone(), function);
                Ok(Value::Null)
            }
            Stmt::While { condition, body } => {
                while self.eval(condition)?.is_truthy() {
                    self.tick()?;
                    match self.exec_block(body) {
                        Ok(_) | Err(Unwind::Continue) => {}
                        Err(Unwind::Break) => break,
                        Err(other) => return Err(other),
                    }
                }
                Ok(Value::Null)
            }
            Stmt::For {
                index,
                item,
                iterable,
                body,
            } => {
                let iterable = self.eval(iterable)?;
                self.exec_for(index.as_deref(), item, iterable, body)
            }
            Stmt::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Null,
                };
                Err(Unwind::Return(value))
            }
            Stmt::Break => Err(Unwind::Break),
            Stmt::Continue => Err(Unwind::Continue),
            Stmt::Throw(expr) => {
                let value = self.eval(expr)?;
                Err(RuntimeError::Thrown(value.to_string()).into())
            }
            Stmt::Import { names, path } => {
                self.import(names, path)?;
                Ok(Value::Null)
            }
            Stmt::Export(name) => {
                if self.loading.is_empty() {
                    return Err(RuntimeError::Import("Export outside of a module".into()).into());
                }
                let value = self.lookup(name)?;
                if let Some(module) = self.loading.last_mut() {
                    module.exports.insert(name.clone(), value);
                }
                Ok(Value::Null)
            }
        }
    }

    /// Bind names exported by the module at `spec`, loading it on first use.
    fn import(&mut self, names: &[ImportName], spec: &str) -> Exec<()> {
        let path = self.resolve_module(spec)?;
        self.require(Capability::FileRead, Some(path.display().to_string()), "Import")?;
        let path = std::fs::canonicalize(&path).map_err(|err| {
            RuntimeError::Import(format!("cannot open module '{}': {err}", path.display()))
        })?;

        if self.ctx.module_exports(&path).is_none() {
            self.nested(|this| this.load_module(path.clone()))?;
        }
        let exports = self.ctx.module_exports(&path).ok_or_else(|| {
            RuntimeError::Import(format!("module '{}' did not load", path.display()))
        })?;

        let mut bindings = Vec::with_capacity(names.len());
        for item in names {
            let value = exports.get(&item.name).ok_or_else(|| {
                RuntimeError::Import(format!("'{}' is not exported by '{spec}'", item.name))
            })?;
            bindings.push((item.binding().to_string(), value.clone()));
        }
        for (name, value) in bindings {
            self.ctx.assign(name, value);
        }
        Ok(())
    }

    /// Module paths are relative to the importing module's directory, or
    /// to the working directory at the top level.
    fn resolve_module(&self, spec: &str) -> Exec<PathBuf> {
        if spec.is_empty() || spec.contains("://") {
            return Err(RuntimeError::Import(format!("invalid module path '{spec}'")).into());
        }
        let mut path = match self.loading.last().and_then(|module| module.path.parent()) {
            Some(dir) => dir.join(spec),
            None => PathBuf::from(spec),
        };
        if path.extension().is_none() {
            path.set_extension(MODULE_EXTENSION);
        }
        Ok(path)
    }

    /// Run a module's top level with its own globals and record its exports.
    fn load_module(&mut self, path: PathBuf) -> Exec<()> {
        if self.loading.iter().any(|module| *module.path == path) {
            return Err(
                RuntimeError::Import(format!("circular import of '{}'", path.display())).into(),
            );
        }
        let source = std::fs::read_to_string(&path).map_err(|err| {
            RuntimeError::Import(format!("cannot read module '{}': {err}", path.display()))
        })?;
        let program = cache::compile(&source, self.optimize)
            .map_err(|err| RuntimeError::Import(format!("in '{}': {err}", path.display())))?;
        tracing::debug!(module = %path.display(), "loading module");

        let path = Arc::new(path);
        self.loading.push(Loading {
            path: Arc::clone(&path),
            exports: BTreeMap::new(),
        });
        let saved = self.ctx.enter_module();
        let result = self.exec_block(&program.statements);
        let globals = self.ctx.leave_module(saved);
        let exports = self
            .loading
            .pop()
            .map(|module| module.exports)
            .unwrap_or_default();

        match result {
            Ok(_) | Err(Unwind::Return(_)) => {}
            Err(Unwind::Error(err)) => return Err(Unwind::Error(err)),
            Err(Unwind::Break) => return Err(RuntimeError::StrayControl("Break").into()),
            Err(Unwind::Continue) => return Err(RuntimeError::StrayControl("Continue").into()),
        }
        self.ctx
            .store_module(Arc::unwrap_or_clone(path), globals, exports);
        Ok(())
    }

    fn exec_for(
        &mut self,
        index: Option<&str>,
        item: &str,
        iterable: Value,
        body: &[Stmt],
    ) -> Exec<Value> {
        let pairs: Vec<(Value, Value)> = match iterable {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (Value::Number(i as f64), v))
                .collect(),
            Value::String(s) => s
                .chars()
                .enumerate()
                .map(|(i, c)| (Value::Number(i as f64), Value::String(c.to_string())))
                .collect(),
            // One variable walks the keys; two walk key and value.
            Value::Dict(map) => map
                .into_iter()
                .map(|(k, v)| {
                    let key = Value::String(k);
                    if index.is_some() {
                        (key, v)
                    } else {
                        (key.clone(), key)
                    }
                })
                .collect(),
            other => {
                return Err(RuntimeError::Type(format!(
                    "cannot iterate over {}",
                    other.type_name()
                ))
                .into());
            }
        };

        for (position, value) in pairs {
            self.tick()?;
            if let Some(index) = index {
                self.ctx.assign(index, position);
            }
            self.ctx.assign(item, value);
            match self.exec_block(body) {
                Ok(_) | Err(Unwind::Continue) => {}
                Err(Unwind::Break) => break,
                Err(other) => return Err(other),
            }
        }
        Ok(Value::Null)
    }

    fn assign(&mut self, target: &Target, value: Value) -> Exec<()> {
        match target {
            Target::Name(name) => {
                self.ctx.assign(name.clone(), value);
                Ok(())
            }
            Target::Index { name, path } => {
                let keys = path
                    .iter()
                    .map(|key| self.eval(key))
                    .collect::<Exec<Vec<_>>>()?;
                check_value_depth(keys.len() + value.depth())?;
                let slot = self
                    .ctx
                    .slot_mut(name)
                    .ok_or_else(|| RuntimeError::UndefinedVariable(name.clone()))?;
                ops::assign_path(slot, &keys, value)?;
                Ok(())
            }
        }
    }

    fn make_function(
        &self,
        name: Option<String>,
        params: &[String],
        body: &Body,
    ) -> Exec<Value> {
        let module = self.loading.last().map(|module| Arc::clone(&module.path));
        let function =
            Function::new(name, params.to_vec(), Arc::clone(body), self.ctx.capture())
                .in_module(module);
        check_value_depth(function.depth())?;
        Ok(Value::Function(Arc::new(function)))
    }

    fn lookup(&self, name: &str) -> Exec<Value> {
        if let Some(value) = self.ctx.lookup(name) {
            return Ok(value.clone());
        }
        match builtins::lookup(name) {
            Some(builtin) => Ok(Value::Builtin(builtin.name)),
            None => Err(RuntimeError::UndefinedVariable(name.to_string()).into()),
        }
    }

    fn eval(&mut self, expr: &Expr) -> Exec<Value> {
        self.nested(|this| this.eval_expr(expr))
    }

    fn eval_expr(&mut self, expr: &Expr) -> Exec<Value> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::String(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Null => Ok(Value::Null),
            Expr::Ident(name) => self.lookup(name),
            Expr::Array(items) => {
                let values = items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<Exec<Vec<_>>>()?;
                let array = Value::Array(values);
                check_value_depth(array.depth())?;
                Ok(array)
            }
            Expr::Dict(entries) => {
                let mut map = BTreeMap::new();
                for (key, value) in entries {
                    let value = self.eval(value)?;
                    map.insert(key.clone(), value);
                }
                let dict = Value::Dict(map);
                check_value_depth(dict.depth())?;
                Ok(dict)
            }
            Expr::Unary { op, operand } => {
                let operand = self.eval(operand)?;
                Ok(ops::unary(*op, operand)?)
            }
            Expr::Binary { left, op, right } => self.eval_binary(left, *op, right),
            Expr::Call { callee, args } => self.eval_call(callee, args),
            Expr::Index { object, index } => self.eval_index(object, index),
            Expr::If {
                branches,
                otherwise,
            } => {
                for (condition, body) in branches {
                    if self.eval(condition)?.is_truthy() {
                        return self.exec_block(body);
                    }
                }
                match otherwise {
                    Some(body) => self.exec_block(body),
                    None => Ok(Value::Null),
                }
            }
            Expr::Lambda { params, body } => self.make_function(None, params, body),
        }
    }

    fn eval_binary(&mut self, left: &Expr, op: BinaryOp, right: &Expr) -> Exec<Value> {
        let left = self.eval(left)?;
        match op {
            BinaryOp::And if !left.is_truthy() => Ok(left),
            BinaryOp::Or if left.is_truthy() => Ok(left),
            BinaryOp::And | BinaryOp::Or => self.eval(right),
            _ => {
                let right = self.eval(right)?;
                Ok(ops::binary(op, left, right)?)
            }
        }
    }

    fn eval_call(&mut self, callee: &Expr, args: &[Expr]) -> Exec<Value> {
        let callee = self.eval(callee)?;
        let args = args
            .iter()
            .map(|arg| self.eval(arg))
            .collect::<Exec<Vec<_>>>()?;
        self.tick()?;
        Ok(self.call(&callee, args)?)
    }

    fn eval_index(&mut self, object: &Expr, index: &Expr) -> Exec<Value> {
        // Index a named variable in place instead of copying the container.
        if let Expr::Ident(name) = object {
            if self.ctx.lookup(name).is_some() {
                let key = self.eval(index)?;
                let container = self
                    .ctx
                    .lookup(name)
                    .ok_or_else(|| RuntimeError::UndefinedVariable(name.clone()))?;
                return Ok(ops::index(container, &key)?);
            }
        }
        let container = self.eval(object)?;
        let key = self.eval(index)?;
        Ok(ops::index(&container, &key)?)
    }
}
