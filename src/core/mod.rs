pub mod chunk;
pub mod tile;

pub use chunk::{Chunk, ChunkKey};
pub use tile::{ResourceDeposit, ResourceKind, Tile, TileKind};
