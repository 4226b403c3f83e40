//! Variable storage for one engine.

use crate::value::{Function, Value};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Maximum retained `TRACE` lines. Older lines are dropped first.
pub const TRACE_CAPACITY: usize = 1024;

/// Globals, the call stack and the trace buffer of an engine.
///
/// Top-level code reads and writes globals. Inside a function, writes go
/// to the frame's locals and reads resolve locals, then the function's
/// captured variables, then the globals of the module that defined it
/// (or the engine's globals for functions defined by the host script).
#[derive(Debug, Default)]
pub struct ExecutionContext {
    globals: HashMap<String, Value>,
    frames: Vec<Frame>,
    modules: HashMap<PathBuf, Module>,
    trace: VecDeque<String>,
    steps: u64,
}

#[derive(Debug)]
struct Frame {
    function: Arc<Function>,
    locals: HashMap<String, Value>,
}

/// A loaded module: its final globals and what it exported.
#[derive(Debug)]
pub(crate) struct Module {
    globals: HashMap<String, Value>,
    exports: BTreeMap<String, Value>,
}

/// Bindings set aside while a module evaluates in isolation.
#[must_use]
pub(crate) struct SavedScope {
    globals: HashMap<String, Value>,
    frames: Vec<Frame>,
}

/// Globals a function resolves against once its module has loaded.
fn module_scope<'m>(
    modules: &'m HashMap<PathBuf, Module>,
    function: &Function,
) -> Option<&'m HashMap<String, Value>> {
    let path = function.module.as_deref()?;
    modules.get(path).map(|module| &module.globals)
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        if let Some(frame) = self.frames.last() {
            let found = frame
                .locals
                .get(name)
                .or_else(|| frame.function.captured.get(name));
            if found.is_some() {
                return found;
            }
            if let Some(scope) = module_scope(&self.modules, &frame.function) {
                return scope.get(name);
            }
        }
        self.globals.get(name)
    }

    /// Bind `name` in the current scope.
    pub fn assign(&mut self, name: impl Into<String>, value: Value) {
        match self.frames.last_mut() {
            Some(frame) => frame.locals.insert(name.into(), value),
            None => self.globals.insert(name.into(), value),
        };
    }

    /// Mutable access to the binding `name` would write to.
    ///
    /// Inside a function, a variable visible only through captures or
    /// globals is first copied into the frame's locals.
    pub fn slot_mut(&mut self, name: &str) -> Option<&mut Value> {
        let Some(frame) = self.frames.last_mut() else {
            return self.globals.get_mut(name);
        };
        if !frame.locals.contains_key(name) {
            let outer = module_scope(&self.modules, &frame.function).unwrap_or(&self.globals);
            let inherited = frame
                .function
                .captured
                .get(name)
                .or_else(|| outer.get(name))?
                .clone();
            frame.locals.insert(name.to_string(), inherited);
        }
        frame.locals.get_mut(name)
    }

    /// Variables a closure created here would capture.
    pub fn capture(&self) -> HashMap<String, Value> {
        match self.frames.last() {
            Some(frame) => {
                let mut captured = frame.function.captured.clone();
                captured.extend(frame.locals.iter().map(|(k, v)| (k.clone(), v.clone())));
                captured
            }
            None => HashMap::new(),
        }
    }

    pub fn push_frame(&mut self, function: Arc<Function>, locals: HashMap<String, Value>) {
        self.frames.push(Frame { function, locals });
    }

    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    pub fn set_global(&mut self, name: impl Into<String>, value: Value) {
        self.globals.insert(name.into(), value);
    }

    pub fn global_names(&self) -> impl Iterator<Item = &str> {
        self.globals.keys().map(String::as_str)
    }

    /// Count one unit of work and return the total for this evaluation.
    pub(crate) fn tick(&mut self) -> u64 {
        self.steps += 1;
        self.steps
    }

    /// Swap in empty globals and an empty call stack for a module.
    pub(crate) fn enter_module(&mut self) -> SavedScope {
        SavedScope {
            globals: std::mem::take(&mut self.globals),
            frames: std::mem::take(&mut self.frames),
        }
    }

    /// Restore the importer's bindings and return the module's globals.
    pub(crate) fn leave_module(&mut self, saved: SavedScope) -> HashMap<String, Value> {
        self.frames = saved.frames;
        std::mem::replace(&mut self.globals, saved.globals)
    }

    pub(crate) fn module_exports(&self, path: &Path) -> Option<&BTreeMap<String, Value>> {
        self.modules.get(path).map(|module| &module.exports)
    }

    pub(crate) fn store_module(
        &mut self,
        path: PathBuf,
        globals: HashMap<String, Value>,
        exports: BTreeMap<String, Value>,
    ) {
        self.modules.insert(path, Module { globals, exports });
    }

    /// Prepare for a new evaluation. Globals survive.
    pub(crate) fn begin(&mut self) {
        self.frames.clear();
        self.steps = 0;
    }

    /// Drop every global binding and loaded module. The trace buffer is
    /// kept until taken.
    pub fn clear_bindings(&mut self) {
        self.globals.clear();
        self.modules.clear();
        self.begin();
    }

    /// Drop every binding and trace line.
    pub fn reset(&mut self) {
        self.clear_bindings();
        self.trace.clear();
    }

    pub fn record_trace(&mut self, line: String) {
        if self.trace.len() == TRACE_CAPACITY {
            self.trace.pop_front();
        }
        self.trace.push_back(line);
    }

    pub fn take_trace(&mut self) -> Vec<String> {
        self.trace.drain(..).collect()
    }
}
