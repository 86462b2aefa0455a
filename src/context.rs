//! The world context: one explicit object owning the seed, the worker
//! pool and the chunk store. Constructed once at startup and passed by
//! handle to whoever needs it; there is no global world state.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::WorldError;
use crate::pool::dispatcher::{PoolConfig, WorkerPool};
use crate::world::store::ChunkStore;

pub struct WorldContext {
    pool: Arc<WorkerPool>,
    chunks: RwLock<Arc<ChunkStore>>,
}

impl WorldContext {
    /// Bring up the pool, run the pregenerate handshake against every
    /// texture worker, and build the chunk store for `seed`. Startup is
    /// not finished until every worker has acked.
    pub async fn create(seed: &str, config: PoolConfig) -> Result<Self, WorldError> {
        let pool = Arc::new(WorkerPool::new(config));
        pool.pregenerate().await?;

        Ok(WorldContext {
            chunks: RwLock::new(Arc::new(ChunkStore::new(seed, pool.clone()))),
            pool,
        })
    }

    pub fn seed(&self) -> String {
        self.chunks.read().seed().to_string()
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    /// Current chunk store handle. Held handles stay valid across a
    /// reset but see the old world; re-read after resetting.
    pub fn chunks(&self) -> Arc<ChunkStore> {
        self.chunks.read().clone()
    }

    /// Discard every generated chunk and start over with a new seed.
    /// The only path that ever drops cached chunks.
    pub fn reset_world(&self, seed: &str) {
        tracing::info!("resetting world with seed '{}'", seed);
        let store = Arc::new(ChunkStore::new(seed, self.pool.clone()));
        *self.chunks.write() = store;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chunk::ChunkKey;

    fn test_config() -> PoolConfig {
        PoolConfig {
            chunk_workers: 1,
            texture_workers: 1,
            ..PoolConfig::default()
        }
    }

    #[tokio::test]
    async fn context_serves_chunks_after_startup() {
        let ctx = WorldContext::create("abc", test_config()).await.unwrap();
        let chunk = ctx
            .chunks()
            .get_or_generate_async(ChunkKey::new(0, 0))
            .await
            .unwrap();
        assert!(chunk.is_well_formed());
        assert_eq!(ctx.seed(), "abc");
    }

    #[tokio::test]
    async fn reset_discards_chunks_and_swaps_seed() {
        let ctx = WorldContext::create("abc", test_config()).await.unwrap();
        ctx.chunks().get_or_generate(ChunkKey::new(0, 0));
        assert_eq!(ctx.chunks().len(), 1);

        ctx.reset_world("fresh");
        assert_eq!(ctx.seed(), "fresh");
        assert!(ctx.chunks().is_empty());
    }
}
