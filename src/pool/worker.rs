//! Worker thread bodies.
//!
//! Each worker owns its state outright: a chunk worker keeps a replica
//! of the world generator plus a per-worker memo of generated chunks; a
//! texture worker keeps a cache of synthesized bitmaps. Nothing is
//! shared between workers, all traffic is message passing.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use rustc_hash::FxHashMap;

use crate::core::chunk::Chunk;
use crate::core::tile::ResourceKind;
use crate::pool::protocol::{
    ChunkRequest, ChunkResponse, TextureBitmap, TextureRequest, TextureResponse, WorkerReply,
};
use crate::texture;
use crate::world::generator::WorldGenerator;

/// Spawn one chunk worker. Exits when the request channel closes.
pub fn spawn_chunk_worker(
    index: usize,
    rx: Receiver<ChunkRequest>,
    tx: Sender<WorkerReply>,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name(format!("chunk-worker-{}", index))
        .spawn(move || {
            let mut state = ChunkWorkerState::default();
            while let Ok(request) = rx.recv() {
                let reply = catch_unwind(AssertUnwindSafe(|| state.handle(request)));
                match reply {
                    Ok(response) => {
                        if tx.send(WorkerReply::Chunk(response)).is_err() {
                            break;
                        }
                    }
                    Err(_) => {
                        // Uncaught worker error: log and reply nothing,
                        // the request times out on the caller side.
                        tracing::error!("chunk worker {} panicked while handling a request", index);
                    }
                }
            }
        })
        .expect("Failed to spawn chunk generation worker")
}

/// Spawn one texture worker. Exits when the request channel closes.
pub fn spawn_texture_worker(
    index: usize,
    rx: Receiver<TextureRequest>,
    tx: Sender<WorkerReply>,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name(format!("texture-worker-{}", index))
        .spawn(move || {
            let mut state = TextureWorkerState::default();
            while let Ok(request) = rx.recv() {
                let reply = catch_unwind(AssertUnwindSafe(|| state.handle(request)));
                match reply {
                    Ok(Some(response)) => {
                        if tx.send(response).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(_) => {
                        tracing::error!(
                            "texture worker {} panicked while handling a request",
                            index
                        );
                    }
                }
            }
        })
        .expect("Failed to spawn texture worker")
}

/// Per-worker replica of the world generator.
///
/// One seed per worker lifetime is the expectation; rebuilding when the
/// seed actually changes is a safety net, not a multi-seed cache.
#[derive(Default)]
struct ChunkWorkerState {
    generator: Option<WorldGenerator>,
    memo: FxHashMap<(i32, i32), Chunk>,
}

impl ChunkWorkerState {
    fn handle(&mut self, request: ChunkRequest) -> ChunkResponse {
        if let Err(e) = request.validate() {
            tracing::warn!("rejecting chunk request: {}", e);
            return ChunkResponse {
                id: request.id,
                payload: Err(e.to_string()),
            };
        }

        let generator = match self.generator.take() {
            Some(g) if g.seed() == request.seed => self.generator.insert(g),
            _ => {
                self.memo.clear();
                self.generator.insert(WorldGenerator::new(&request.seed))
            }
        };

        let chunk = self
            .memo
            .entry((request.chunk_x, request.chunk_y))
            .or_insert_with(|| generator.generate(request.chunk_x, request.chunk_y))
            .clone();

        ChunkResponse {
            id: request.id,
            payload: Ok(chunk),
        }
    }
}

/// Per-worker cache of synthesized textures, primed by the pregenerate
/// broadcast. Intentionally not shared across workers.
#[derive(Default)]
struct TextureWorkerState {
    cache: FxHashMap<String, TextureBitmap>,
}

impl TextureWorkerState {
    fn handle(&mut self, request: TextureRequest) -> Option<WorkerReply> {
        if let TextureRequest::Pregenerate = request {
            return Some(WorkerReply::Pregenerate(self.pregenerate()));
        }

        if let Err(e) = request.validate() {
            tracing::warn!("rejecting texture request: {}", e);
            let id = request.id().unwrap_or_default().to_string();
            return Some(WorkerReply::Texture(TextureResponse {
                id,
                payload: Err(e.to_string()),
            }));
        }

        let response = match request {
            TextureRequest::Tile { id, variant } => {
                let payload = match self.cache.get(&variant.cache_key()) {
                    Some(bitmap) => Ok(bitmap.clone()),
                    None => texture::synthesize_tile(&variant).inspect(|bitmap| {
                        self.cache.insert(variant.cache_key(), bitmap.clone());
                    }),
                };
                TextureResponse { id, payload }
            }
            TextureRequest::Resource { id, color } => {
                let key = format!("resource:{}", color);
                let payload = match self.cache.get(&key) {
                    Some(bitmap) => Ok(bitmap.clone()),
                    None => texture::synthesize_resource_icon(&color).inspect(|bitmap| {
                        self.cache.insert(key, bitmap.clone());
                    }),
                };
                TextureResponse { id, payload }
            }
            // Chunk images are unique per chunk, no point caching them.
            TextureRequest::Chunk { id, chunk } => TextureResponse {
                id,
                payload: texture::synthesize_chunk(&chunk),
            },
            TextureRequest::Pregenerate => unreachable!("handled above"),
        };

        Some(WorkerReply::Texture(response))
    }

    /// Synthesize every fixed tile variant and resource icon once.
    fn pregenerate(&mut self) -> Result<(), String> {
        for variant in texture::tile_variants() {
            let bitmap = texture::synthesize_tile(&variant)?;
            self.cache.insert(variant.cache_key(), bitmap);
        }
        for kind in ResourceKind::ALL {
            let color = kind.color_hex();
            let bitmap = texture::synthesize_resource_icon(color)?;
            self.cache.insert(format!("resource:{}", color), bitmap);
        }
        tracing::debug!("texture worker primed {} cached textures", self.cache.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_request(id: &str, x: i32, y: i32, seed: &str) -> ChunkRequest {
        ChunkRequest {
            id: id.into(),
            chunk_x: x,
            chunk_y: y,
            seed: seed.into(),
        }
    }

    #[test]
    fn replica_matches_the_control_thread_generator() {
        let mut state = ChunkWorkerState::default();
        let response = state.handle(chunk_request("req-1", 4, -9, "abc"));
        let replica = response.payload.unwrap();
        let control = WorldGenerator::new("abc").generate(4, -9);
        assert_eq!(replica, control);
    }

    #[test]
    fn memo_serves_repeat_requests() {
        let mut state = ChunkWorkerState::default();
        let first = state.handle(chunk_request("req-1", 0, 0, "abc"));
        assert_eq!(state.memo.len(), 1);
        let second = state.handle(chunk_request("req-2", 0, 0, "abc"));
        assert_eq!(state.memo.len(), 1);
        assert_eq!(first.payload.unwrap(), second.payload.unwrap());
    }

    #[test]
    fn seed_change_rebuilds_the_replica() {
        let mut state = ChunkWorkerState::default();
        state.handle(chunk_request("req-1", 0, 0, "abc"));
        let response = state.handle(chunk_request("req-2", 0, 0, "other"));
        assert_eq!(state.memo.len(), 1);
        assert_eq!(
            response.payload.unwrap(),
            WorldGenerator::new("other").generate(0, 0)
        );
    }

    #[test]
    fn invalid_chunk_request_gets_an_error_reply() {
        let mut state = ChunkWorkerState::default();
        let response = state.handle(chunk_request("req-1", 0, 0, ""));
        assert_eq!(response.id, "req-1");
        assert!(response.payload.is_err());
    }

    #[test]
    fn pregenerate_primes_the_texture_cache() {
        let mut state = TextureWorkerState::default();
        let reply = state.handle(TextureRequest::Pregenerate).unwrap();
        match reply {
            WorkerReply::Pregenerate(result) => result.unwrap(),
            other => panic!("unexpected reply {:?}", other),
        }
        // Four tile variants plus five resource icons.
        assert_eq!(state.cache.len(), 9);
    }

    #[test]
    fn cached_tile_variant_is_served_without_resynthesis() {
        let mut state = TextureWorkerState::default();
        state.pregenerate().unwrap();
        let variant = texture::tile_variants()[0].clone();
        let cached = state.cache.get(&variant.cache_key()).unwrap().image.clone();

        let reply = state
            .handle(TextureRequest::Tile {
                id: "req-1".into(),
                variant,
            })
            .unwrap();
        match reply {
            WorkerReply::Texture(response) => {
                // Identical pixels prove it came from the cache: a fresh
                // synthesis would re-roll the speckle.
                assert_eq!(response.payload.unwrap().image, cached);
            }
            other => panic!("unexpected reply {:?}", other),
        }
    }
}
