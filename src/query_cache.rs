//! Caches parsed statements keyed by normalized Cypher text, so a query
//! pattern run repeatedly (the common case behind a relay service) only
//! pays the lex/parse cost once. Not part of spec.md's module list — an
//! ambient concern carried from the teacher's `server::query_cache`, ported
//! onto the `lru` crate instead of its hand-rolled `HashMap` + manual
//! eviction.
//!
//! Only the parsed AST is cached, never result rows: results are
//! data-dependent and the storage layer can change between calls.

use crate::error::EngineResult;
use crate::parser::{self, CypherStatement};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

pub struct QueryCache {
    cache: Mutex<LruCache<String, CypherStatement>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub len: usize,
}

impl QueryCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        QueryCache {
            cache: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Return the cached parse for `query`, parsing and inserting on a miss.
    pub fn get_or_parse(&self, query: &str) -> EngineResult<CypherStatement> {
        let key = normalize(query);
        if let Some(hit) = self.cache.lock().unwrap().get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(hit.clone());
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let parsed = parser::parse(query)?;
        self.cache.lock().unwrap().put(key, parsed.clone());
        Ok(parsed)
    }

    pub fn metrics(&self) -> CacheMetrics {
        CacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            len: self.cache.lock().unwrap().len(),
        }
    }

    pub fn clear(&self) {
        self.cache.lock().unwrap().clear();
    }
}

fn normalize(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_query_is_a_cache_hit() {
        let cache = QueryCache::new(8);
        cache.get_or_parse("MATCH (n) RETURN n").unwrap();
        cache.get_or_parse("MATCH   (n)\nRETURN n").unwrap();
        let metrics = cache.metrics();
        assert_eq!(metrics.hits, 1);
        assert_eq!(metrics.misses, 1);
        assert_eq!(metrics.len, 1);
    }

    #[test]
    fn distinct_queries_each_miss_once() {
        let cache = QueryCache::new(8);
        cache.get_or_parse("MATCH (n) RETURN n").unwrap();
        cache.get_or_parse("MATCH (n:Person) RETURN n").unwrap();
        let metrics = cache.metrics();
        assert_eq!(metrics.misses, 2);
        assert_eq!(metrics.hits, 0);
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let cache = QueryCache::new(1);
        cache.get_or_parse("MATCH (n) RETURN n").unwrap();
        cache.get_or_parse("MATCH (m) RETURN m").unwrap();
        // The first entry was evicted to make room for the second.
        cache.get_or_parse("MATCH (n) RETURN n").unwrap();
        assert_eq!(cache.metrics().misses, 3);
    }
}
