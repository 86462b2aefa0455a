use std::time::Duration;

// World constants
pub const CHUNK_SIZE: i32 = 32;
pub const TILES_PER_CHUNK: usize = (CHUNK_SIZE * CHUNK_SIZE) as usize;

// Noise sampling frequencies (applied to world tile coordinates)
pub const TERRAIN_FREQ: f32 = 0.015;
pub const ELEVATION_FREQ: f32 = 0.025;
pub const RESOURCE_FREQ: f32 = 0.05;
pub const RESOURCE_SPAWN_FREQ: f32 = 0.1;
pub const RESOURCE_AMOUNT_FREQ: f32 = 0.08;

// Terrain thresholds
pub const LAND_THRESHOLD: f32 = -0.1;
pub const LAND_ELEVATION_THRESHOLD: f32 = 0.0;
// Water tiles use a different elevation cutoff than land tiles.
// Intentional asymmetry, matches the shipped terrain exactly.
pub const WATER_ELEVATION_THRESHOLD: f32 = 0.2;
pub const RESOURCE_SPAWN_THRESHOLD: f32 = 0.7;

// Texture constants
pub const TILE_TEXTURE_SIZE: u32 = 16;
pub const RESOURCE_ICON_SIZE: u32 = 16;
pub const CHUNK_TEXTURE_TILE_PX: u32 = 4;
pub const CHUNK_TEXTURE_SIZE: u32 = CHUNK_SIZE as u32 * CHUNK_TEXTURE_TILE_PX;

// Dispatcher constants
pub const CHUNK_GEN_TIMEOUT: Duration = Duration::from_secs(5);
pub const TEXTURE_TIMEOUT: Duration = Duration::from_secs(3);
pub const REQUEST_QUEUE_CAPACITY: usize = 256;
pub const REPLY_QUEUE_CAPACITY: usize = 64;
