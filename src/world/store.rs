//! Chunk cache and generation coordinator.
//!
//! Single source of truth for "has chunk K been generated". Guarantees
//! at most one generation per key even under concurrent requests: the
//! first async caller for a key becomes the leader and dispatches to
//! the worker pool, everyone else awaits the same in-flight result.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::broadcast;

use crate::core::chunk::{Chunk, ChunkKey};
use crate::error::WorldError;
use crate::pool::dispatcher::WorkerPool;
use crate::world::generator::WorldGenerator;

type SharedResult = Result<Arc<Chunk>, WorldError>;

type Listener = Box<dyn Fn() + Send + Sync>;

struct StoreState {
    cache: FxHashMap<ChunkKey, Arc<Chunk>>,
    in_flight: FxHashMap<ChunkKey, broadcast::Sender<SharedResult>>,
}

pub struct ChunkStore {
    seed: String,
    generator: WorldGenerator,
    pool: Arc<WorkerPool>,
    state: Mutex<StoreState>,
    listeners: Mutex<Vec<Listener>>,
}

enum AsyncPath {
    Cached(Arc<Chunk>),
    Wait(broadcast::Receiver<SharedResult>),
    Lead(broadcast::Sender<SharedResult>),
}

impl ChunkStore {
    pub fn new(seed: &str, pool: Arc<WorkerPool>) -> Self {
        ChunkStore {
            seed: seed.to_string(),
            generator: WorldGenerator::new(seed),
            pool,
            state: Mutex::new(StoreState {
                cache: FxHashMap::default(),
                in_flight: FxHashMap::default(),
            }),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    pub fn contains(&self, key: ChunkKey) -> bool {
        self.state.lock().cache.contains_key(&key)
    }

    pub fn get(&self, key: ChunkKey) -> Option<Arc<Chunk>> {
        self.state.lock().cache.get(&key).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.lock().cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().cache.is_empty()
    }

    /// Register a listener invoked after every successful insertion.
    /// At-least-once, no payload: the listener re-reads what it needs.
    pub fn subscribe(&self, listener: impl Fn() + Send + Sync + 'static) {
        self.listeners.lock().push(Box::new(listener));
    }

    /// Synchronous path: return the cached chunk or generate it inline
    /// on the calling thread. Used where deterministic low-latency
    /// access matters more than parallelism.
    pub fn get_or_generate(&self, key: ChunkKey) -> Arc<Chunk> {
        if let Some(chunk) = self.get(key) {
            return chunk;
        }

        let generated = Arc::new(self.generator.generate(key.x, key.y));
        // entry() keeps the first insertion if another caller raced us;
        // a cached chunk must never be replaced.
        let chunk = self
            .state
            .lock()
            .cache
            .entry(key)
            .or_insert(generated)
            .clone();
        self.notify();
        chunk
    }

    /// Asynchronous path: resolve from cache, join an in-flight
    /// generation, or lead a new one on the worker pool. Concurrent
    /// callers for one key share a single generation and result.
    ///
    /// On failure nothing is cached and the in-flight marker is
    /// cleared, so the next request retries from scratch.
    pub async fn get_or_generate_async(&self, key: ChunkKey) -> SharedResult {
        let path = {
            let mut state = self.state.lock();
            if let Some(chunk) = state.cache.get(&key) {
                AsyncPath::Cached(chunk.clone())
            } else if let Some(tx) = state.in_flight.get(&key) {
                AsyncPath::Wait(tx.subscribe())
            } else {
                let (tx, _) = broadcast::channel(1);
                state.in_flight.insert(key, tx.clone());
                AsyncPath::Lead(tx)
            }
        };

        match path {
            AsyncPath::Cached(chunk) => Ok(chunk),
            AsyncPath::Wait(mut rx) => match rx.recv().await {
                Ok(result) => result,
                // Leader dropped without broadcasting: pool teardown.
                Err(_) => Err(WorldError::PoolClosed),
            },
            AsyncPath::Lead(tx) => {
                let result = self
                    .pool
                    .generate_chunk(key.x, key.y, &self.seed)
                    .await
                    .map(Arc::new);

                {
                    let mut state = self.state.lock();
                    state.in_flight.remove(&key);
                    if let Ok(chunk) = &result {
                        state.cache.insert(key, chunk.clone());
                    }
                }
                if result.is_ok() {
                    self.notify();
                } else {
                    tracing::warn!("generation of chunk {} failed", key);
                }

                // Waiters subscribed under the same lock that guarded
                // the in-flight entry, so none can miss this send.
                let _ = tx.send(result.clone());
                result
            }
        }
    }

    /// Drop every generated chunk. Only called on explicit world reset.
    pub fn clear(&self) {
        self.state.lock().cache.clear();
    }

    fn notify(&self) {
        for listener in self.listeners.lock().iter() {
            listener();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::pool::dispatcher::PoolConfig;

    fn store() -> ChunkStore {
        let pool = Arc::new(WorkerPool::new(PoolConfig {
            chunk_workers: 1,
            texture_workers: 1,
            ..PoolConfig::default()
        }));
        ChunkStore::new("abc", pool)
    }

    #[test]
    fn sync_path_caches_and_returns_the_same_chunk() {
        let store = store();
        let key = ChunkKey::new(2, -1);

        let first = store.get_or_generate(key);
        let second = store.get_or_generate(key);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.len(), 1);
        assert_eq!(*first, WorldGenerator::new("abc").generate(2, -1));
    }

    #[test]
    fn subscribers_fire_once_per_insertion() {
        let store = store();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        store.subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let key = ChunkKey::new(0, 0);
        store.get_or_generate(key);
        store.get_or_generate(key); // cache hit, no notification
        store.get_or_generate(ChunkKey::new(1, 0));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn async_path_matches_sync_path() {
        let store = store();
        let key = ChunkKey::new(3, 3);

        let from_pool = store.get_or_generate_async(key).await.unwrap();
        assert_eq!(*from_pool, WorldGenerator::new("abc").generate(3, 3));

        // Second call is a pure cache hit handing back the same Arc.
        let again = store.get_or_generate_async(key).await.unwrap();
        assert!(Arc::ptr_eq(&from_pool, &again));
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_generation() {
        let store = store();
        let key = ChunkKey::new(5, -5);

        let insertions = Arc::new(AtomicUsize::new(0));
        let counter = insertions.clone();
        store.subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let (a, b, c, d) = tokio::join!(
            store.get_or_generate_async(key),
            store.get_or_generate_async(key),
            store.get_or_generate_async(key),
            store.get_or_generate_async(key),
        );

        let a = a.unwrap();
        for other in [b.unwrap(), c.unwrap(), d.unwrap()] {
            assert!(Arc::ptr_eq(&a, &other));
        }
        assert_eq!(insertions.load(Ordering::SeqCst), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn mixed_sync_and_async_access_stays_consistent() {
        let store = store();
        let key = ChunkKey::new(-4, 8);

        let sync_chunk = store.get_or_generate(key);
        let async_chunk = store.get_or_generate_async(key).await.unwrap();
        assert!(Arc::ptr_eq(&sync_chunk, &async_chunk));
    }

    #[tokio::test]
    async fn failed_generation_caches_nothing_and_retries() {
        // Pool dropped up front: every dispatch fails.
        let pool = Arc::new(WorkerPool::new(PoolConfig {
            chunk_workers: 1,
            texture_workers: 1,
            ..PoolConfig::default()
        }));
        let store = ChunkStore::new("abc", pool.clone());

        let key = ChunkKey::new(9, 9);
        // A dead pool rejects the dispatch; the store must not cache.
        {
            let mut dead = WorkerPool::new(PoolConfig {
                chunk_workers: 1,
                texture_workers: 1,
                ..PoolConfig::default()
            });
            dead.shutdown();
            let dead_store = ChunkStore::new("abc", Arc::new(dead));
            let result = dead_store.get_or_generate_async(key).await;
            assert!(matches!(result, Err(WorldError::PoolClosed)));
            assert!(dead_store.is_empty());
        }

        // A healthy store serves the same key fine afterwards.
        let chunk = store.get_or_generate_async(key).await.unwrap();
        assert_eq!(*chunk, WorldGenerator::new("abc").generate(9, 9));
    }

    #[test]
    fn clear_discards_the_world() {
        let store = store();
        store.get_or_generate(ChunkKey::new(0, 0));
        store.get_or_generate(ChunkKey::new(1, 1));
        assert_eq!(store.len(), 2);
        store.clear();
        assert!(store.is_empty());
    }
}
