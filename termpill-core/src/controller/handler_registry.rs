//! HandlerRegistry: lazy, deduplicated handler loading
//!
//! Handlers are constructed on first use through a [`HandlerLoader`] and
//! cached per [`HandlerKind`] for the registry's lifetime:
//! - Raw term types share a kind (`integer`, `float`, `date` → numeric)
//! - Concurrent requests for an unloaded kind await one shared load
//! - Failed loads are not cached; the next request retries
//! - Load count and per-kind load time are kept for reporting

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use enum_map::EnumMap;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{PillError, PillResult};
use crate::handlers::{
    Handler, HandlerKind, categorical::CategoricalHandler, condition::ConditionHandler,
    numeric::NumericHandler, samplelst::SampleListHandler, snplst::SnpListHandler,
};

/// Constructs the handler for one kind.
#[async_trait]
pub trait HandlerLoader: Send + Sync {
    async fn load(&self, kind: HandlerKind) -> PillResult<Arc<dyn Handler>>;
}

/// Loader for the handlers compiled into this crate.
#[derive(Debug, Default)]
pub struct BuiltinLoader;

#[async_trait]
impl HandlerLoader for BuiltinLoader {
    async fn load(&self, kind: HandlerKind) -> PillResult<Arc<dyn Handler>> {
        let handler: Arc<dyn Handler> = match kind {
            HandlerKind::Categorical => Arc::new(CategoricalHandler),
            HandlerKind::Numeric => Arc::new(NumericHandler),
            HandlerKind::Condition => Arc::new(ConditionHandler),
            HandlerKind::SnpList => Arc::new(SnpListHandler),
            HandlerKind::SampleList => Arc::new(SampleListHandler),
        };
        Ok(handler)
    }
}

type LoadFuture = Shared<BoxFuture<'static, PillResult<Arc<dyn Handler>>>>;

#[derive(Default)]
struct RegistryState {
    loaded: EnumMap<HandlerKind, Option<Arc<dyn Handler>>>,
    in_flight: HashMap<HandlerKind, LoadFuture>,
}

/// Load statistics for one handler kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerLoadStats {
    pub kind: HandlerKind,
    pub is_loaded: bool,
    pub load_time_ns: u64,
}

pub struct HandlerRegistry {
    loader: Arc<dyn HandlerLoader>,
    state: Mutex<RegistryState>,
    load_count: AtomicU64,
    load_time_ns: Arc<EnumMap<HandlerKind, AtomicU64>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::with_loader(Arc::new(BuiltinLoader))
    }

    pub fn with_loader(loader: Arc<dyn HandlerLoader>) -> Self {
        Self {
            loader,
            state: Mutex::new(RegistryState::default()),
            load_count: AtomicU64::new(0),
            load_time_ns: Arc::new(EnumMap::default()),
        }
    }

    /// Handler for a raw `term.type`.
    pub async fn get_handler(&self, term_type: &str) -> PillResult<Arc<dyn Handler>> {
        let kind = HandlerKind::from_term_type(term_type)?;
        self.get(kind).await.map_err(|e| match e {
            PillError::HandlerLoad { reason, .. } => PillError::handler_load(term_type, reason),
            other => other,
        })
    }

    /// Handler for a canonical kind, loading it on first use.
    pub async fn get(&self, kind: HandlerKind) -> PillResult<Arc<dyn Handler>> {
        let load = {
            let mut state = self.state.lock();
            if let Some(handler) = &state.loaded[kind] {
                return Ok(Arc::clone(handler));
            }

            match state.in_flight.entry(kind) {
                Entry::Occupied(e) => {
                    debug!(kind = %kind, "Joining in-flight handler load");
                    e.get().clone()
                }
                Entry::Vacant(e) => {
                    self.load_count.fetch_add(1, Ordering::Relaxed);
                    e.insert(self.start_load(kind)).clone()
                }
            }
        };

        let result = load.clone().await;

        let mut state = self.state.lock();
        if state
            .in_flight
            .get(&kind)
            .is_some_and(|current| current.ptr_eq(&load))
        {
            state.in_flight.remove(&kind);
        }

        match result {
            Ok(handler) => Ok(Arc::clone(
                state.loaded[kind].get_or_insert_with(|| handler),
            )),
            Err(e) => Err(e),
        }
    }

    fn start_load(&self, kind: HandlerKind) -> LoadFuture {
        let loader = Arc::clone(&self.loader);
        let timings = Arc::clone(&self.load_time_ns);

        async move {
            let start = Instant::now();
            let result = loader.load(kind).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(_) => {
                    #[expect(clippy::cast_possible_truncation, reason = "Expected accuracy")]
                    timings[kind].store(elapsed.as_nanos() as u64, Ordering::Relaxed);
                    info!(marker = "HANDLER_LOAD", kind = %kind, ?elapsed, "Handler loaded");
                }
                Err(e) => {
                    warn!(marker = "HANDLER_LOAD_FAILED", kind = %kind, error = %e, "Handler load failed");
                }
            }

            result.map_err(|e| match e {
                PillError::HandlerLoad { .. } => e,
                other => PillError::handler_load(kind.as_str(), other.to_string()),
            })
        }
        .boxed()
        .shared()
    }

    pub fn is_loaded(&self, kind: HandlerKind) -> bool {
        self.state.lock().loaded[kind].is_some()
    }

    pub fn loaded_kinds(&self) -> Vec<HandlerKind> {
        let state = self.state.lock();
        HandlerKind::ALL
            .into_iter()
            .filter(|k| state.loaded[*k].is_some())
            .collect()
    }

    /// Loads started so far, failed ones included.
    pub fn load_count(&self) -> u64 {
        self.load_count.load(Ordering::Relaxed)
    }

    pub fn get_load_report(&self) -> Vec<HandlerLoadStats> {
        let state = self.state.lock();
        HandlerKind::ALL
            .into_iter()
            .map(|kind| HandlerLoadStats {
                kind,
                is_loaded: state.loaded[kind].is_some(),
                load_time_ns: self.load_time_ns[kind].load(Ordering::Relaxed),
            })
            .collect()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("HandlerRegistry")
            .field("loaded", &state.loaded.values().filter(|h| h.is_some()).count())
            .field("in_flight", &state.in_flight.len())
            .field("load_count", &self.load_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Counts loads and yields before finishing so callers overlap.
    #[derive(Default)]
    struct CountingLoader {
        calls: AtomicUsize,
        fail_first: bool,
    }

    #[async_trait]
    impl HandlerLoader for CountingLoader {
        async fn load(&self, kind: HandlerKind) -> PillResult<Arc<dyn Handler>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            for _ in 0..5 {
                tokio::task::yield_now().await;
            }
            if self.fail_first && call == 0 {
                return Err(PillError::vocab("load", "module fetch failed"));
            }
            BuiltinLoader.load(kind).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_load() {
        let loader = Arc::new(CountingLoader::default());
        let registry = HandlerRegistry::with_loader(loader.clone());

        let handlers =
            futures::future::join_all((0..16).map(|_| registry.get_handler("categorical"))).await;

        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.load_count(), 1);
        let first = handlers[0].as_ref().unwrap();
        for h in &handlers {
            assert!(Arc::ptr_eq(first, h.as_ref().unwrap()));
        }
        assert!(registry.state.lock().in_flight.is_empty());
    }

    #[tokio::test]
    async fn test_numeric_types_share_instance() {
        let loader = Arc::new(CountingLoader::default());
        let registry = HandlerRegistry::with_loader(loader.clone());

        let a = registry.get_handler("integer").await.unwrap();
        let b = registry.get_handler("float").await.unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.loaded_kinds(), vec![HandlerKind::Numeric]);
    }

    #[tokio::test]
    async fn test_failed_load_is_retried() {
        let loader = Arc::new(CountingLoader {
            fail_first: true,
            ..Default::default()
        });
        let registry = HandlerRegistry::with_loader(loader.clone());

        match registry.get_handler("condition").await {
            Err(PillError::HandlerLoad { term_type, .. }) => assert_eq!(term_type, "condition"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(!registry.is_loaded(HandlerKind::Condition));

        assert!(registry.get_handler("condition").await.is_ok());
        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
        assert!(registry.is_loaded(HandlerKind::Condition));
    }

    #[tokio::test]
    async fn test_unknown_type_names_the_type() {
        let registry = HandlerRegistry::new();
        match registry.get_handler("geneVariant").await {
            Err(PillError::HandlerLoad { term_type, .. }) => assert_eq!(term_type, "geneVariant"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(registry.load_count(), 0);
    }

    #[tokio::test]
    async fn test_load_report_covers_every_kind() {
        let registry = HandlerRegistry::new();
        registry.get_handler("snplst").await.unwrap();

        let report = registry.get_load_report();
        assert_eq!(report.len(), HandlerKind::ALL.len());
        assert!(
            report
                .iter()
                .any(|s| s.kind == HandlerKind::SnpList && s.is_loaded)
        );
    }
}
