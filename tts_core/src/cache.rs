use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, TryLockError,
};

use dashmap::DashMap;
use tracing::{info, warn};

use crate::{
    engine::{lock_recovering, EngineError, ModelLoader, SynthesisEngine},
    language::ModelKey,
};

type Slot = Arc<Mutex<Option<Arc<dyn SynthesisEngine>>>>;

/// Lazily populated (language, voice) -> engine map.
///
/// Each key owns a slot whose lock is held across the load, so the first
/// requests for a key wait on one load instead of racing their own. Loaded
/// engines are never evicted.
pub struct ModelCache {
    loader: Arc<dyn ModelLoader>,
    slots: DashMap<ModelKey, Slot>,
    loads: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Snapshot of the cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub loads: u64,
    pub hits: u64,
    pub misses: u64,
}

impl ModelCache {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            slots: DashMap::new(),
            loads: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Return the engine for `key`, loading it on first use.
    ///
    /// A failed load leaves the slot empty so a later request tries again.
    pub fn get_or_load(&self, key: ModelKey) -> Result<Arc<dyn SynthesisEngine>, EngineError> {
        // Clone the slot out so the map shard is not locked during the load.
        let slot = self.slots.entry(key).or_default().clone();
        // A loader that panicked left the slot empty, so it is retried here.
        let mut guard = lock_recovering(&slot);

        if let Some(engine) = guard.as_ref() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(engine));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let started = std::time::Instant::now();
        let engine = self.loader.load(key).inspect_err(|e| {
            warn!("Failed to load {key} model: {e}");
        })?;
        self.loads.fetch_add(1, Ordering::Relaxed);
        info!("Loaded {key} model in {:.2}s", started.elapsed().as_secs_f64());

        *guard = Some(Arc::clone(&engine));
        Ok(engine)
    }

    /// Load the given models ahead of the first request
    pub fn preload(&self, keys: &[ModelKey]) -> Result<(), EngineError> {
        for key in keys {
            self.get_or_load(*key)?;
        }
        Ok(())
    }

    /// Whether `key` has a usable engine. A key that is mid-load reports false.
    pub fn is_loaded(&self, key: ModelKey) -> bool {
        let Some(slot) = self.slots.get(&key) else {
            return false;
        };
        let loaded = match slot.try_lock() {
            Ok(guard) => guard.is_some(),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().is_some(),
            Err(TryLockError::WouldBlock) => false,
        };
        loaded
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            loads: self.loads.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        engine::{EngineInputs, InferenceOptions},
        language::{Language, Voice},
    };
    use ndarray::ArrayD;
    use std::{sync::Barrier, thread, time::Duration};

    struct Silent;

    impl SynthesisEngine for Silent {
        fn infer(&self, _: &EngineInputs, _: &InferenceOptions) -> Result<ArrayD<f32>, EngineError> {
            Ok(ArrayD::zeros(vec![1, 1, 4]))
        }
    }

    #[derive(Default)]
    struct CountingLoader {
        calls: AtomicU64,
        fail_first: bool,
    }

    impl ModelLoader for CountingLoader {
        fn load(&self, _key: ModelKey) -> Result<Arc<dyn SynthesisEngine>, EngineError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            // Widen the race window for the concurrency test.
            thread::sleep(Duration::from_millis(20));
            if self.fail_first && n == 0 {
                return Err(EngineError::Config("boom".to_string()));
            }
            Ok(Arc::new(Silent))
        }
    }

    const WAITAU_MALE: ModelKey = ModelKey {
        language: Language::Waitau,
        voice: Voice::Male,
    };

    #[test]
    fn test_second_lookup_is_a_hit() {
        let loader = Arc::new(CountingLoader::default());
        let cache = ModelCache::new(loader.clone());

        let a = cache.get_or_load(WAITAU_MALE).unwrap();
        let b = cache.get_or_load(WAITAU_MALE).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            cache.stats(),
            CacheStats {
                loads: 1,
                hits: 1,
                misses: 1
            }
        );
    }

    #[test]
    fn test_keys_are_independent() {
        let loader = Arc::new(CountingLoader::default());
        let cache = ModelCache::new(loader.clone());
        for key in ModelKey::all() {
            cache.get_or_load(key).unwrap();
        }
        assert_eq!(loader.calls.load(Ordering::SeqCst), 4);
        assert!(cache.is_loaded(ModelKey::new(Language::Hakka, Voice::Female)));
    }

    #[test]
    fn test_concurrent_first_access_loads_once() {
        let loader = Arc::new(CountingLoader::default());
        let cache = Arc::new(ModelCache::new(loader.clone()));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache.get_or_load(WAITAU_MALE).unwrap()
                })
            })
            .collect();
        let engines: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
        assert!(engines.iter().all(|e| Arc::ptr_eq(e, &engines[0])));
    }

    #[test]
    fn test_failed_load_is_retried() {
        let loader = Arc::new(CountingLoader {
            fail_first: true,
            ..Default::default()
        });
        let cache = ModelCache::new(loader.clone());

        assert!(cache.get_or_load(WAITAU_MALE).is_err());
        assert!(!cache.is_loaded(WAITAU_MALE));
        assert!(cache.get_or_load(WAITAU_MALE).is_ok());
        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.stats().loads, 1);
    }

    #[derive(Default)]
    struct PanickingLoader {
        calls: AtomicU64,
    }

    impl ModelLoader for PanickingLoader {
        fn load(&self, _key: ModelKey) -> Result<Arc<dyn SynthesisEngine>, EngineError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("model file truncated");
            }
            Ok(Arc::new(Silent))
        }
    }

    #[test]
    fn test_load_retried_after_loader_panic() {
        let loader = Arc::new(PanickingLoader::default());
        let cache = Arc::new(ModelCache::new(loader.clone()));

        let first = {
            let cache = cache.clone();
            thread::spawn(move || cache.get_or_load(WAITAU_MALE).map(|_| ())).join()
        };
        assert!(first.is_err());
        assert!(!cache.is_loaded(WAITAU_MALE));

        for _ in 0..3 {
            assert!(cache.get_or_load(WAITAU_MALE).is_ok());
        }
        assert!(cache.is_loaded(WAITAU_MALE));
        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            cache.stats(),
            CacheStats {
                loads: 1,
                hits: 2,
                misses: 2
            }
        );
    }

    #[test]
    fn test_unloaded_key_is_not_loaded() {
        let cache = ModelCache::new(Arc::new(CountingLoader::default()));
        assert!(!cache.is_loaded(WAITAU_MALE));
        cache.preload(&[WAITAU_MALE]).unwrap();
        assert!(cache.is_loaded(WAITAU_MALE));
    }
}
