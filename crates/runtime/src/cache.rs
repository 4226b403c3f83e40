//! Parsed-program cache.

use crate::ast::Program;
use crate::error::ParseError;
use crate::optimizer;
use crate::parser;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

pub const DEFAULT_CACHE_CAPACITY: usize = 64;

/// Cache counters, as returned by [`crate::Engine::cache_stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub capacity: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Keeps the most recently parsed programs so that hosts re-evaluating
/// the same snippet skip lexing and parsing. Eviction is first-in
/// first-out. Sources that fail to parse are never cached.
#[derive(Debug)]
pub struct ParseCache {
    entries: HashMap<String, Arc<Program>>,
    order: VecDeque<String>,
    capacity: usize,
    optimize: bool,
    hits: u64,
    misses: u64,
}

impl ParseCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity,
            optimize: true,
            hits: 0,
            misses: 0,
        }
    }

    /// Whether parsed programs are constant-folded before caching.
    pub fn optimizing(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }

    pub fn get_or_parse(&mut self, source: &str) -> Result<Arc<Program>, ParseError> {
        if let Some(program) = self.entries.get(source) {
            self.hits += 1;
            return Ok(Arc::clone(program));
        }
        self.misses += 1;
        let program = Arc::new(compile(source, self.optimize)?);
        self.insert(source, Arc::clone(&program));
        Ok(program)
    }

    fn insert(&mut self, source: &str, program: Arc<Program>) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
        self.entries.insert(source.to_string(), program);
        self.order.push_back(source.to_string());
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
            capacity: self.capacity,
        }
    }
}

/// Parse, then fold constants unless `optimize` is off.
pub(crate) fn compile(source: &str, optimize: bool) -> Result<Program, ParseError> {
    let mut program = parser::parse(source)?;
    if optimize {
        optimizer::optimize(&mut program);
    }
    Ok(program)
}

impl Default for ParseCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hits_and_misses() {
        let mut cache = ParseCache::new(4);
        let first = cache.get_or_parse("1 + 1").unwrap();
        let second = cache.get_or_parse("1 + 1").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_evicts_oldest() {
        let mut cache = ParseCache::new(2);
        cache.get_or_parse("1").unwrap();
        cache.get_or_parse("2").unwrap();
        cache.get_or_parse("3").unwrap();
        assert_eq!(cache.stats().entries, 2);

        cache.get_or_parse("1").unwrap();
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn test_parse_errors_are_not_cached() {
        let mut cache = ParseCache::new(2);
        assert!(cache.get_or_parse("(").is_err());
        assert!(cache.get_or_parse("(").is_err());
        assert_eq!(cache.stats().entries, 0);
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn test_optimizer_can_be_disabled() {
        use crate::ast::{Expr, Stmt};

        let mut folded = ParseCache::new(1);
        let program = folded.get_or_parse("2 * 21").unwrap();
        assert_eq!(program.statements, vec![Stmt::Expr(Expr::Number(42.0))]);

        let mut plain = ParseCache::new(1).optimizing(false);
        let program = plain.get_or_parse("2 * 21").unwrap();
        assert!(matches!(program.statements[0], Stmt::Expr(Expr::Binary { .. })));
    }

    #[test]
    fn test_zero_capacity_disables_caching() {
        let mut cache = ParseCache::new(0);
        cache.get_or_parse("1").unwrap();
        cache.get_or_parse("1").unwrap();
        assert_eq!(cache.stats().hits, 0);
        assert_eq!(cache.stats().entries, 0);
    }
}
