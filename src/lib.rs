// Core module with fundamental types
pub mod core;

// World module with generation and the chunk cache
pub mod world;

// Worker pool: dispatcher, protocol, worker bodies
pub mod pool;

// Procedural texture synthesis
pub mod texture;

// Other modules
pub mod constants;
pub mod context;
pub mod error;
pub mod save;

// Re-exports
pub use constants::*;
pub use context::WorldContext;
pub use crate::core::{Chunk, ChunkKey, ResourceDeposit, ResourceKind, Tile, TileKind};
pub use error::{SaveError, WorldError};
pub use pool::{PoolConfig, TextureBitmap, TileVariant, WorkerPool};
pub use save::{DEFAULT_WORLD_FILE, SavedWorld, load_world, save_world};
pub use world::{ChunkStore, WorldGenerator};
