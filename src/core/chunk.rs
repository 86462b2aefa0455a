use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{CHUNK_SIZE, TILES_PER_CHUNK};
use crate::core::tile::Tile;

/// Chunk coordinates, the key for the cache and for request correlation.
///
/// Canonical string form is `"x,y"` and round-trips through
/// `Display`/`FromStr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkKey {
    pub x: i32,
    pub y: i32,
}

impl ChunkKey {
    pub fn new(x: i32, y: i32) -> Self {
        ChunkKey { x, y }
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl FromStr for ChunkKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| format!("invalid chunk key '{}'", s))?;
        let x = x.parse().map_err(|_| format!("invalid chunk key '{}'", s))?;
        let y = y.parse().map_err(|_| format!("invalid chunk key '{}'", s))?;
        Ok(ChunkKey { x, y })
    }
}

/// A 32x32 block of tiles. Immutable once generated: regenerating the
/// same key with the same seed reproduces it exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_x: i32,
    pub chunk_y: i32,
    /// Row-major, `index = y * 32 + x`.
    pub tiles: Vec<Tile>,
}

impl Chunk {
    pub fn key(&self) -> ChunkKey {
        ChunkKey::new(self.chunk_x, self.chunk_y)
    }

    /// Tile at local coordinates, `None` outside `0..32`.
    pub fn tile(&self, x: i32, y: i32) -> Option<&Tile> {
        if x < 0 || x >= CHUNK_SIZE || y < 0 || y >= CHUNK_SIZE {
            return None;
        }
        self.tiles.get((y * CHUNK_SIZE + x) as usize)
    }

    /// A structurally well-formed chunk carries exactly 1024 tiles.
    pub fn is_well_formed(&self) -> bool {
        self.tiles.len() == TILES_PER_CHUNK
    }
}
