//! Worker pool dispatcher.
//!
//! Owns two independently sized pools (chunk generation is expensive,
//! texture synthesis is cheap and frequent), assigns requests round-
//! robin, and correlates replies through an explicit id -> completion
//! table serviced by a single router thread. Callers get futures; the
//! message passing underneath stays hidden.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, bounded};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::{mpsc, oneshot};

use crate::constants::{CHUNK_GEN_TIMEOUT, REPLY_QUEUE_CAPACITY, REQUEST_QUEUE_CAPACITY, TEXTURE_TIMEOUT};
use crate::core::chunk::Chunk;
use crate::error::WorldError;
use crate::pool::protocol::{
    ChunkRequest, TextureBitmap, TextureRequest, TileVariant, WorkerReply,
};
use crate::pool::worker::{spawn_chunk_worker, spawn_texture_worker};

/// Pool sizing and timeout knobs.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub chunk_workers: usize,
    pub texture_workers: usize,
    pub chunk_timeout: Duration,
    pub texture_timeout: Duration,
}

impl Default for PoolConfig {
    /// Derive pool sizes from the machine's parallelism hint.
    fn default() -> Self {
        let hint = num_cpus::get();
        PoolConfig {
            chunk_workers: (hint / 2).max(1),
            texture_workers: (hint / 4).max(1),
            chunk_timeout: CHUNK_GEN_TIMEOUT,
            texture_timeout: TEXTURE_TIMEOUT,
        }
    }
}

type Pending<T> = Arc<Mutex<FxHashMap<String, oneshot::Sender<Result<T, WorldError>>>>>;

pub struct WorkerPool {
    config: PoolConfig,
    chunk_senders: Vec<Sender<ChunkRequest>>,
    texture_senders: Vec<Sender<TextureRequest>>,
    next_chunk_worker: AtomicUsize,
    next_texture_worker: AtomicUsize,
    next_request_id: AtomicU64,
    pending_chunks: Pending<Chunk>,
    pending_textures: Pending<TextureBitmap>,
    // tokio's mutex: held across the awaits in `pregenerate`.
    pregen_acks: tokio::sync::Mutex<mpsc::UnboundedReceiver<Result<(), String>>>,
    workers: Vec<JoinHandle<()>>,
    router: Option<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(config: PoolConfig) -> Self {
        let (reply_tx, reply_rx) = bounded::<WorkerReply>(REPLY_QUEUE_CAPACITY);
        let (pregen_tx, pregen_rx) = mpsc::unbounded_channel();

        let mut workers = Vec::new();
        let mut chunk_senders = Vec::with_capacity(config.chunk_workers);
        for index in 0..config.chunk_workers {
            let (tx, rx) = bounded::<ChunkRequest>(REQUEST_QUEUE_CAPACITY);
            workers.push(spawn_chunk_worker(index, rx, reply_tx.clone()));
            chunk_senders.push(tx);
        }

        let mut texture_senders = Vec::with_capacity(config.texture_workers);
        for index in 0..config.texture_workers {
            let (tx, rx) = bounded::<TextureRequest>(REQUEST_QUEUE_CAPACITY);
            workers.push(spawn_texture_worker(index, rx, reply_tx.clone()));
            texture_senders.push(tx);
        }
        drop(reply_tx);

        let pending_chunks: Pending<Chunk> = Arc::new(Mutex::new(FxHashMap::default()));
        let pending_textures: Pending<TextureBitmap> = Arc::new(Mutex::new(FxHashMap::default()));
        let router = spawn_router(
            reply_rx,
            pending_chunks.clone(),
            pending_textures.clone(),
            pregen_tx,
        );

        tracing::info!(
            "worker pool up: {} chunk workers, {} texture workers",
            config.chunk_workers,
            config.texture_workers
        );

        WorkerPool {
            config,
            chunk_senders,
            texture_senders,
            next_chunk_worker: AtomicUsize::new(0),
            next_texture_worker: AtomicUsize::new(0),
            next_request_id: AtomicU64::new(1),
            pending_chunks,
            pending_textures,
            pregen_acks: tokio::sync::Mutex::new(pregen_rx),
            workers,
            router: Some(router),
        }
    }

    pub fn chunk_worker_count(&self) -> usize {
        self.chunk_senders.len()
    }

    pub fn texture_worker_count(&self) -> usize {
        self.texture_senders.len()
    }

    fn next_id(&self) -> String {
        format!("req-{}", self.next_request_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Generate a chunk on a worker. Resolves with the chunk, a worker
    /// error, or a timeout; a late reply after the timeout is dropped
    /// by the router as an unknown id.
    pub async fn generate_chunk(
        &self,
        chunk_x: i32,
        chunk_y: i32,
        seed: &str,
    ) -> Result<Chunk, WorldError> {
        let request = ChunkRequest {
            id: self.next_id(),
            chunk_x,
            chunk_y,
            seed: seed.to_string(),
        };
        request.validate()?;
        if self.chunk_senders.is_empty() {
            return Err(WorldError::PoolClosed);
        }
        let id = request.id.clone();

        let (tx, rx) = oneshot::channel();
        self.pending_chunks.lock().insert(id.clone(), tx);

        let worker = self.next_chunk_worker.fetch_add(1, Ordering::Relaxed)
            % self.chunk_senders.len();
        if self.chunk_senders[worker].send(request).is_err() {
            self.pending_chunks.lock().remove(&id);
            return Err(WorldError::PoolClosed);
        }

        await_reply(rx, &self.pending_chunks, id, self.config.chunk_timeout).await
    }

    /// Synthesize a single tile texture.
    pub async fn tile_texture(&self, variant: TileVariant) -> Result<TextureBitmap, WorldError> {
        let id = self.next_id();
        self.dispatch_texture(
            TextureRequest::Tile {
                id: id.clone(),
                variant,
            },
            id,
            self.config.texture_timeout,
        )
        .await
    }

    /// Synthesize a resource icon.
    pub async fn resource_texture(&self, color: &str) -> Result<TextureBitmap, WorldError> {
        let id = self.next_id();
        self.dispatch_texture(
            TextureRequest::Resource {
                id: id.clone(),
                color: color.to_string(),
            },
            id,
            self.config.texture_timeout,
        )
        .await
    }

    /// Render a whole chunk image. Budgeted like chunk generation, it
    /// touches every tile.
    pub async fn chunk_texture(&self, chunk: Chunk) -> Result<TextureBitmap, WorldError> {
        let id = self.next_id();
        self.dispatch_texture(
            TextureRequest::Chunk {
                id: id.clone(),
                chunk,
            },
            id,
            self.config.chunk_timeout,
        )
        .await
    }

    async fn dispatch_texture(
        &self,
        request: TextureRequest,
        id: String,
        timeout: Duration,
    ) -> Result<TextureBitmap, WorldError> {
        request.validate()?;
        if self.texture_senders.is_empty() {
            return Err(WorldError::PoolClosed);
        }

        let (tx, rx) = oneshot::channel();
        self.pending_textures.lock().insert(id.clone(), tx);

        let worker = self.next_texture_worker.fetch_add(1, Ordering::Relaxed)
            % self.texture_senders.len();
        if self.texture_senders[worker].send(request).is_err() {
            self.pending_textures.lock().remove(&id);
            return Err(WorldError::PoolClosed);
        }

        await_reply(rx, &self.pending_textures, id, timeout).await
    }

    /// One-time startup handshake: broadcast a pregenerate message to
    /// every texture worker and wait for each to ack (or fail), so the
    /// first real texture requests hit warm caches.
    ///
    /// The broadcast is matched by message type, not correlation id.
    pub async fn pregenerate(&self) -> Result<(), WorldError> {
        for sender in &self.texture_senders {
            sender
                .send(TextureRequest::Pregenerate)
                .map_err(|_| WorldError::PoolClosed)?;
        }

        let mut acks = self.pregen_acks.lock().await;
        for _ in 0..self.texture_senders.len() {
            let ack = tokio::time::timeout(self.config.chunk_timeout, acks.recv())
                .await
                .map_err(|_| WorldError::Timeout {
                    id: "pregenerate".into(),
                    timeout: self.config.chunk_timeout,
                })?
                .ok_or(WorldError::PoolClosed)?;
            ack.map_err(WorldError::Worker)?;
        }
        tracing::info!(
            "pregenerated textures on {} workers",
            self.texture_senders.len()
        );
        Ok(())
    }

    /// Tear the pool down: stop the workers and the router, then reject
    /// every still-pending request with [`WorldError::PoolClosed`].
    pub fn shutdown(&mut self) {
        if self.router.is_none() && self.workers.is_empty() {
            return;
        }
        tracing::info!("shutting down worker pool");

        // Closing the request channels makes the workers exit; the
        // router follows once the last reply sender is gone.
        self.chunk_senders.clear();
        self.texture_senders.clear();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
        if let Some(router) = self.router.take() {
            let _ = router.join();
        }

        // Dropping the completion handles rejects the callers.
        let abandoned =
            self.pending_chunks.lock().len() + self.pending_textures.lock().len();
        if abandoned > 0 {
            tracing::warn!("rejecting {} requests pending at shutdown", abandoned);
        }
        self.pending_chunks.lock().clear();
        self.pending_textures.lock().clear();
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Wait for the router to resolve `id`, enforcing the timeout. On
/// expiry the pending entry is removed so the (still running) worker's
/// eventual reply is dropped as unknown.
async fn await_reply<T>(
    rx: oneshot::Receiver<Result<T, WorldError>>,
    pending: &Pending<T>,
    id: String,
    timeout: Duration,
) -> Result<T, WorldError> {
    match tokio::time::timeout(timeout, rx).await {
        Ok(Ok(result)) => result,
        // Completion handle dropped without a reply: pool teardown.
        Ok(Err(_)) => Err(WorldError::PoolClosed),
        Err(_) => {
            pending.lock().remove(&id);
            Err(WorldError::Timeout { id, timeout })
        }
    }
}

/// The message-dispatch loop: one thread owning the reply receiver,
/// resolving pending entries as replies arrive.
fn spawn_router(
    reply_rx: Receiver<WorkerReply>,
    pending_chunks: Pending<Chunk>,
    pending_textures: Pending<TextureBitmap>,
    pregen_tx: mpsc::UnboundedSender<Result<(), String>>,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name("pool-router".into())
        .spawn(move || {
            while let Ok(reply) = reply_rx.recv() {
                match reply {
                    WorkerReply::Chunk(response) => {
                        if let Err(e) = response.validate() {
                            tracing::error!("dropping malformed chunk response: {}", e);
                            continue;
                        }
                        resolve(&pending_chunks, &response.id, response.payload);
                    }
                    WorkerReply::Texture(response) => {
                        if let Err(e) = response.validate() {
                            tracing::error!("dropping malformed texture response: {}", e);
                            continue;
                        }
                        resolve(&pending_textures, &response.id, response.payload);
                    }
                    WorkerReply::Pregenerate(result) => {
                        let _ = pregen_tx.send(result);
                    }
                }
            }
        })
        .expect("Failed to spawn pool router")
}

fn resolve<T>(pending: &Pending<T>, id: &str, payload: Result<T, String>) {
    match pending.lock().remove(id) {
        Some(tx) => {
            let _ = tx.send(payload.map_err(WorldError::Worker));
        }
        None => {
            // Late reply after a timeout, or a stray id. Drop it.
            tracing::debug!("ignoring reply for unknown request id {}", id);
        }
    }
}
