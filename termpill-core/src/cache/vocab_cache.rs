//! `src/cache/vocab_cache.rs`
//! ============================================================================
//! # Cached Vocabulary
//!
//! A `VocabApi` decorator that keeps dictionary terms in a moka future cache:
//! - TTL/TTI eviction from `VocabCacheConfig`
//! - One batched upstream call for all ids missing from the cache
//! - Hit/miss/load statistics
//!
//! Only `get_terms` is cached. Percentiles, SNP validation and category
//! counts depend on filters and cohort state and always go upstream.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use async_trait::async_trait;
use moka::future::Cache;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::VocabCacheConfig;
use crate::error::PillResult;
use crate::model::q::Q;
use crate::model::term::Term;
use crate::vocab::api::{CategorySummary, SnpValidation, VocabApi};

/// Cache statistics for monitoring and debugging
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
    total_load_time_ns: AtomicU64,
}

impl CacheStats {
    pub fn record_hits(&self, n: u64) {
        self.hits.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_misses(&self, n: u64) {
        self.misses.fetch_add(n, Ordering::Relaxed);
    }

    #[expect(clippy::cast_possible_truncation, reason = "Expected accuracy")]
    pub fn record_load(&self, duration: Duration) {
        self.loads.fetch_add(1, Ordering::Relaxed);
        self.total_load_time_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStatsSnapshot {
        let loads = self.loads.load(Ordering::Relaxed);
        let total_load_time_ns = self.total_load_time_ns.load(Ordering::Relaxed);

        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            loads,
            average_load_time: if loads > 0 {
                Duration::from_nanos(total_load_time_ns / loads)
            } else {
                Duration::ZERO
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub loads: u64,
    pub average_load_time: Duration,
}

impl CacheStatsSnapshot {
    #[expect(clippy::cast_precision_loss, reason = "Expected precision loss")]
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

pub struct CachedVocab<V> {
    upstream: V,
    terms: Cache<Arc<str>, Term>,
    stats: Arc<CacheStats>,
}

impl<V: VocabApi> CachedVocab<V> {
    pub fn with_config(upstream: V, config: &VocabCacheConfig) -> Self {
        let terms = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.ttl)
            .time_to_idle(config.tti)
            .build();

        Self {
            upstream,
            terms,
            stats: Arc::new(CacheStats::default()),
        }
    }

    pub fn new(upstream: V) -> Self {
        Self::with_config(upstream, &VocabCacheConfig::default())
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn upstream(&self) -> &V {
        &self.upstream
    }

    pub async fn invalidate_all(&self) {
        self.terms.invalidate_all();
        self.terms.run_pending_tasks().await;
    }
}

#[async_trait]
impl<V: VocabApi> VocabApi for CachedVocab<V> {
    #[instrument(skip(self, ids), fields(requested = ids.len()))]
    async fn get_terms(&self, ids: &[String]) -> PillResult<HashMap<String, Term>> {
        let mut found = HashMap::with_capacity(ids.len());
        let mut missing: Vec<String> = Vec::new();

        for id in ids {
            match self.terms.get(id.as_str()).await {
                Some(term) => {
                    found.insert(id.clone(), term);
                }
                None if !missing.contains(id) => missing.push(id.clone()),
                None => {}
            }
        }

        self.stats.record_hits(found.len() as u64);
        self.stats.record_misses(missing.len() as u64);

        if missing.is_empty() {
            debug!(marker = "CACHE_OPERATION", "All terms served from cache");
            return Ok(found);
        }

        let start = Instant::now();
        let fetched = self.upstream.get_terms(&missing).await?;
        self.stats.record_load(start.elapsed());

        for (id, term) in fetched {
            self.terms.insert(Arc::from(id.as_str()), term.clone()).await;
            found.insert(id, term);
        }

        debug!(
            marker = "CACHE_OPERATION",
            fetched = missing.len(),
            "Loaded missing terms upstream"
        );
        Ok(found)
    }

    async fn get_percentile(&self, term_id: &str, percentiles: &[u8]) -> PillResult<Vec<f64>> {
        self.upstream.get_percentile(term_id, percentiles).await
    }

    async fn validate_snps(&self, text: &str) -> PillResult<SnpValidation> {
        self.upstream.validate_snps(text).await
    }

    async fn get_categories(
        &self,
        term: &Term,
        filter: Option<&Value>,
        qlst: &[Q],
    ) -> PillResult<Vec<CategorySummary>> {
        self.upstream.get_categories(term, filter, qlst).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::dictionary::{DictionaryDocument, DictionaryVocab};

    fn upstream() -> DictionaryVocab {
        let mut doc = DictionaryDocument::default();
        for id in ["a", "b", "c"] {
            doc.terms
                .insert(id.to_string(), Term::new(id, "categorical"));
        }
        DictionaryVocab::new(doc)
    }

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_second_fetch_served_from_cache() {
        let vocab = CachedVocab::new(upstream());

        let first = vocab.get_terms(&ids(&["a", "b"])).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(vocab.upstream().term_fetches(), 1);

        let second = vocab.get_terms(&ids(&["a", "b"])).await.unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(vocab.upstream().term_fetches(), 1);

        let stats = vocab.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 2);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_only_missing_ids_go_upstream_in_one_call() {
        let vocab = CachedVocab::new(upstream());
        vocab.get_terms(&ids(&["a"])).await.unwrap();

        let all = vocab.get_terms(&ids(&["a", "b", "c", "c"])).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(vocab.upstream().term_fetches(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_all_forces_refetch() {
        let vocab = CachedVocab::new(upstream());
        vocab.get_terms(&ids(&["a"])).await.unwrap();
        vocab.invalidate_all().await;
        vocab.get_terms(&ids(&["a"])).await.unwrap();

        assert_eq!(vocab.upstream().term_fetches(), 2);
    }
}
