//! A fixed-capacity pool of reusable engines.
//!
//! Building an engine is cheap, but a warm one keeps its parse cache. A
//! pool hands engines out one at a time and takes them back on drop with
//! their bindings cleared, so callers never observe each other's state.

use crate::engine::{Engine, EngineBuilder};
use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, PoisonError};

/// Engines built from one template, shared between threads.
///
/// ```
/// use runtime::EnginePool;
///
/// let pool = EnginePool::new(2);
/// let mut engine = pool.acquire();
/// assert_eq!(engine.eval("1 + 1").unwrap().to_string(), "2");
/// ```
#[derive(Debug)]
pub struct EnginePool {
    idle: Mutex<Vec<Engine>>,
    capacity: usize,
    template: EngineBuilder,
}

impl EnginePool {
    /// A pool of restricted engines.
    pub fn new(capacity: usize) -> Self {
        Self::with_builder(capacity, Engine::builder())
    }

    /// A pool whose engines are all built from `template`.
    pub fn with_builder(capacity: usize, template: EngineBuilder) -> Self {
        let idle = (0..capacity).map(|_| template.clone().build()).collect();
        Self {
            idle: Mutex::new(idle),
            capacity,
            template,
        }
    }

    /// Take an idle engine, or build a fresh one when none is left.
    pub fn acquire(&self) -> PooledEngine<'_> {
        let engine = self.lock().pop().unwrap_or_else(|| {
            tracing::debug!(capacity = self.capacity, "pool exhausted, building engine");
            self.template.clone().build()
        });
        PooledEngine {
            engine: Some(engine),
            pool: self,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Engines currently idle in the pool.
    pub fn available(&self) -> usize {
        self.lock().len()
    }

    fn release(&self, mut engine: Engine) {
        engine.reset();
        let mut idle = self.lock();
        if idle.len() < self.capacity {
            idle.push(engine);
        }
    }

    // A panic while holding the lock cannot leave the Vec half-updated.
    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Engine>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// An engine on loan from an [`EnginePool`]. Returned on drop.
#[derive(Debug)]
pub struct PooledEngine<'a> {
    engine: Option<Engine>,
    pool: &'a EnginePool,
}

impl Deref for PooledEngine<'_> {
    type Target = Engine;

    fn deref(&self) -> &Engine {
        match &self.engine {
            Some(engine) => engine,
            None => unreachable!("pooled engine is only taken on drop"),
        }
    }
}

impl DerefMut for PooledEngine<'_> {
    fn deref_mut(&mut self) -> &mut Engine {
        match &mut self.engine {
            Some(engine) => engine,
            None => unreachable!("pooled engine is only taken on drop"),
        }
    }
}

impl Drop for PooledEngine<'_> {
    fn drop(&mut self) {
        if let Some(engine) = self.engine.take() {
            self.pool.release(engine);
        }
    }
}
