//! The embeddable engine.

use crate::cache::{CacheStats, DEFAULT_CACHE_CAPACITY, ParseCache};
use crate::context::ExecutionContext;
use crate::error::{ParseError, Result};
use crate::interpreter::Interpreter;
use crate::limits::Limits;
use crate::outcome::EvalOutcome;
use crate::value::Value;
use policy::{Capability, CapabilityProfile};
use serde::{Deserialize, Serialize};

/// Stack size of the thread each evaluation runs on.
pub const EVAL_STACK_SIZE: usize = 64 * 1024 * 1024;

/// What happens to global bindings between evaluations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingPolicy {
    /// Globals from one evaluation are visible to the next.
    #[default]
    Persistent,
    /// Every evaluation starts with no globals.
    PerCall,
}

/// Engine settings that are not capabilities or limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    pub bindings: BindingPolicy,
    /// Parsed programs kept for reuse. Zero disables the cache.
    pub cache_capacity: usize,
    /// Fold constant expressions after parsing.
    pub optimize: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            bindings: BindingPolicy::default(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            optimize: true,
        }
    }
}

/// An isolated interpreter instance.
///
/// Each engine owns its globals, trace buffer and parse cache, and carries
/// the capability profile it was built with for its whole life. Engines
/// share nothing, so separate engines may run on separate threads.
///
/// ```
/// use runtime::Engine;
///
/// let mut engine = Engine::new();
/// engine.eval("x = 20").unwrap();
/// assert_eq!(engine.eval("x + 22").unwrap().to_string(), "42");
/// ```
#[derive(Debug)]
pub struct Engine {
    profile: CapabilityProfile,
    limits: Limits,
    options: EngineOptions,
    context: ExecutionContext,
    cache: ParseCache,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// A restricted engine: pure computation only.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// An engine with every capability granted.
    pub fn unrestricted() -> Self {
        Self::with_profile(CapabilityProfile::unrestricted())
    }

    pub fn with_profile(profile: CapabilityProfile) -> Self {
        Self::builder().profile(profile).build()
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Evaluate source text and return the value of its last statement.
    ///
    /// Evaluation runs on a scoped thread with an [`EVAL_STACK_SIZE`]
    /// stack, so the nesting ceilings hold regardless of the caller's own
    /// stack. A panic inside evaluation resumes on the calling thread.
    pub fn eval(&mut self, source: &str) -> Result<Value> {
        let spawned = std::thread::scope(|scope| {
            std::thread::Builder::new()
                .name("aether-eval".into())
                .stack_size(EVAL_STACK_SIZE)
                .spawn_scoped(scope, || self.eval_here(source))
                .map(|handle| handle.join())
        });
        match spawned {
            Ok(Ok(result)) => result,
            Ok(Err(payload)) => std::panic::resume_unwind(payload),
            Err(err) => {
                tracing::warn!(error = %err, "cannot spawn evaluation thread, evaluating inline");
                self.eval_here(source)
            }
        }
    }

    fn eval_here(&mut self, source: &str) -> Result<Value> {
        if self.options.bindings == BindingPolicy::PerCall {
            self.context.clear_bindings();
        }

        let program = self.cache.get_or_parse(source)?;
        let mut interpreter = Interpreter::new(&mut self.context, &self.profile, &self.limits)
            .optimizing(self.options.optimize);
        let result = interpreter.run(&program);

        match &result {
            Ok(_) => tracing::debug!(len = source.len(), "evaluation succeeded"),
            Err(err) => tracing::debug!(kind = %err.kind(), error = %err, "evaluation failed"),
        }
        result
    }

    /// Evaluate raw bytes. Input that is not UTF-8 is a parse error.
    pub fn eval_bytes(&mut self, source: &[u8]) -> Result<Value> {
        let source = std::str::from_utf8(source).map_err(|_| ParseError::InvalidUtf8)?;
        self.eval(source)
    }

    /// Evaluate and reduce the result to text.
    pub fn evaluate(&mut self, source: &str) -> EvalOutcome {
        self.eval(source).into()
    }

    pub fn profile(&self) -> &CapabilityProfile {
        &self.profile
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn global(&self, name: &str) -> Option<&Value> {
        self.context.global(name)
    }

    /// Bind a global from the host side.
    pub fn set_global(&mut self, name: impl Into<String>, value: Value) {
        self.context.set_global(name, value);
    }

    /// Names of all global bindings, sorted.
    pub fn global_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.context.global_names().map(str::to_string).collect();
        names.sort();
        names
    }

    /// Drop all globals and trace lines. The parse cache is kept.
    pub fn reset(&mut self) {
        self.context.reset();
    }

    /// Drain lines recorded by `TRACE`.
    pub fn take_trace(&mut self) -> Vec<String> {
        self.context.take_trace()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

/// Builder for [`Engine`]. Defaults to a restricted profile.
#[derive(Debug, Clone, Default)]
pub struct EngineBuilder {
    profile: CapabilityProfile,
    limits: Limits,
    options: EngineOptions,
}

impl EngineBuilder {
    pub fn profile(mut self, profile: CapabilityProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Add one capability to the profile being built.
    pub fn grant(mut self, capability: Capability) -> Self {
        self.profile =
            CapabilityProfile::from_capabilities(self.profile.iter().chain([capability]));
        self
    }

    pub fn limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn bindings(mut self, bindings: BindingPolicy) -> Self {
        self.options.bindings = bindings;
        self
    }

    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.options.cache_capacity = capacity;
        self
    }

    pub fn optimize(mut self, optimize: bool) -> Self {
        self.options.optimize = optimize;
        self
    }

    pub fn options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> Engine {
        tracing::debug!(
            capabilities = ?self.profile.iter().collect::<Vec<_>>(),
            bindings = ?self.options.bindings,
            "creating engine"
        );
        Engine {
            cache: ParseCache::new(self.options.cache_capacity).optimizing(self.options.optimize),
            context: ExecutionContext::new(),
            profile: self.profile,
            limits: self.limits,
            options: self.options,
        }
    }
}

/// Crate version, identical for every engine.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send<T: Send>() {}

    #[test]
    fn test_engine_is_send() {
        assert_send::<Engine>();
    }

    #[test]
    fn test_default_engine_is_restricted() {
        let engine = Engine::new();
        assert!(engine.profile().is_restricted());
        assert_eq!(engine.options().bindings, BindingPolicy::Persistent);
    }

    #[test]
    fn test_builder_grants_accumulate() {
        let engine = Engine::builder()
            .grant(Capability::FileRead)
            .grant(Capability::NetworkConnect)
            .build();
        assert!(engine.profile().grants(Capability::FileRead));
        assert!(engine.profile().grants(Capability::NetworkConnect));
        assert!(!engine.profile().grants(Capability::FileWrite));
    }

    #[test]
    fn test_eval_bytes_rejects_invalid_utf8() {
        let mut engine = Engine::new();
        let err = engine.eval_bytes(&[0x31, 0xff]).unwrap_err();
        assert_eq!(err.render(), "ParseError: source text is not valid UTF-8");
        assert_eq!(engine.eval_bytes(b"1 + 1").unwrap(), Value::from(2.0));
    }

    #[test]
    fn test_options_from_toml() {
        let options: EngineOptions = toml::from_str("bindings = \"per_call\"").unwrap();
        assert_eq!(options.bindings, BindingPolicy::PerCall);
        assert_eq!(options.cache_capacity, DEFAULT_CACHE_CAPACITY);
        assert!(options.optimize);
    }

    #[test]
    fn test_deep_evaluation_does_not_use_caller_stack() {
        let source = format!(
            "Func down(n) {{ If n == 0 {{ 0 }} Else {{ 1 + down(n - 1) }} }}\ndown(95) + {}1{}",
            "(".repeat(200),
            ")".repeat(200)
        );
        let value = std::thread::Builder::new()
            .stack_size(128 * 1024)
            .spawn(move || Engine::new().eval(&source))
            .unwrap()
            .join()
            .unwrap()
            .unwrap();
        assert_eq!(value, Value::from(96.0));
    }

    #[test]
    fn test_version_is_stable() {
        assert_eq!(version(), version());
        assert!(!version().is_empty());
    }
}
