//! Deterministic chunk generation from a string seed.
//!
//! Five independent OpenSimplex2 fields are derived from one seed and
//! combined per tile. The generator is a pure function of the seed:
//! the same (seed, chunk_x, chunk_y) always yields the same chunk, on
//! the control thread or inside any worker replica.

use fastnoise_lite::{FastNoiseLite, NoiseType};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::constants::*;
use crate::core::chunk::Chunk;
use crate::core::tile::{ResourceDeposit, ResourceKind, Tile, TileKind};

/// Thread-safe world generator with pre-configured noise fields.
pub struct WorldGenerator {
    terrain: FastNoiseLite,
    elevation: FastNoiseLite,
    resource: FastNoiseLite,
    resource_spawn: FastNoiseLite,
    resource_amount: FastNoiseLite,
    seed: String,
}

impl WorldGenerator {
    /// Build the five noise fields from one seed string.
    ///
    /// The string is hashed into a seeded stream and each field takes
    /// its own draw in a fixed order, so sampling one field never
    /// shifts another field's output.
    pub fn new(seed: &str) -> Self {
        let mut rng = StdRng::seed_from_u64(fnv1a_64(seed.as_bytes()));
        WorldGenerator {
            terrain: Self::create_noise(rng.random()),
            elevation: Self::create_noise(rng.random()),
            resource: Self::create_noise(rng.random()),
            resource_spawn: Self::create_noise(rng.random()),
            resource_amount: Self::create_noise(rng.random()),
            seed: seed.to_string(),
        }
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    fn create_noise(seed: i32) -> FastNoiseLite {
        let mut noise = FastNoiseLite::with_seed(seed);
        noise.set_noise_type(Some(NoiseType::OpenSimplex2));
        // Sample frequencies are applied per field at the call site.
        noise.set_frequency(Some(1.0));
        noise
    }

    /// Generate a complete chunk at the given chunk coordinates.
    pub fn generate(&self, chunk_x: i32, chunk_y: i32) -> Chunk {
        let base_x = chunk_x * CHUNK_SIZE;
        let base_y = chunk_y * CHUNK_SIZE;
        let mut tiles = Vec::with_capacity(TILES_PER_CHUNK);

        for ly in 0..CHUNK_SIZE {
            for lx in 0..CHUNK_SIZE {
                let tile_x = (base_x + lx) as f32;
                let tile_y = (base_y + ly) as f32;
                tiles.push(self.generate_tile(tile_x, tile_y));
            }
        }

        Chunk {
            chunk_x,
            chunk_y,
            tiles,
        }
    }

    fn generate_tile(&self, tile_x: f32, tile_y: f32) -> Tile {
        let terrain = self
            .terrain
            .get_noise_2d(tile_x * TERRAIN_FREQ, tile_y * TERRAIN_FREQ);
        let kind = if terrain > LAND_THRESHOLD {
            TileKind::Land
        } else {
            TileKind::Water
        };

        let elevation_raw = self
            .elevation
            .get_noise_2d(tile_x * ELEVATION_FREQ, tile_y * ELEVATION_FREQ);
        let elevation = match kind {
            TileKind::Land => {
                if elevation_raw > LAND_ELEVATION_THRESHOLD {
                    1
                } else {
                    0
                }
            }
            // Note the inverted, offset cutoff for water. Preserved
            // from the shipped terrain.
            TileKind::Water => {
                if elevation_raw > WATER_ELEVATION_THRESHOLD {
                    0
                } else {
                    1
                }
            }
        };

        Tile {
            kind,
            elevation,
            resource: self.generate_resource(kind, tile_x, tile_y),
        }
    }

    fn generate_resource(&self, kind: TileKind, tile_x: f32, tile_y: f32) -> Option<ResourceDeposit> {
        if kind != TileKind::Land {
            return None;
        }
        let spawn_val = self.resource_spawn.get_noise_2d(
            tile_x * RESOURCE_SPAWN_FREQ,
            tile_y * RESOURCE_SPAWN_FREQ,
        );
        if spawn_val <= RESOURCE_SPAWN_THRESHOLD {
            return None;
        }

        let resource_val = self
            .resource
            .get_noise_2d(tile_x * RESOURCE_FREQ, tile_y * RESOURCE_FREQ);
        let resource_kind = if resource_val > 0.6 {
            ResourceKind::Iron
        } else if resource_val > 0.3 {
            ResourceKind::Copper
        } else if resource_val > 0.0 {
            ResourceKind::Coal
        } else if resource_val > -0.3 {
            ResourceKind::Stone
        } else {
            ResourceKind::Wood
        };

        let amount_val = self.resource_amount.get_noise_2d(
            tile_x * RESOURCE_AMOUNT_FREQ,
            tile_y * RESOURCE_AMOUNT_FREQ,
        );
        // amount_val is in [-1, 1], so this lands in [50, 100).
        let amount = ((amount_val + 1.0) * 25.0).floor() as u32 + 50;

        Some(ResourceDeposit {
            kind: resource_kind,
            amount,
        })
    }
}

// Workers rebuild their replica from the seed alone.
impl Clone for WorldGenerator {
    fn clone(&self) -> Self {
        WorldGenerator::new(&self.seed)
    }
}

/// FNV-1a over the seed bytes. Folds an arbitrary seed string down to
/// the integer space the noise fields want.
fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_reproduces_chunk_exactly() {
        let a = WorldGenerator::new("abc");
        let b = WorldGenerator::new("abc");
        for (cx, cy) in [(0, 0), (3, -2), (-100, 250)] {
            assert_eq!(a.generate(cx, cy), b.generate(cx, cy));
        }
    }

    #[test]
    fn clone_is_a_faithful_replica() {
        let a = WorldGenerator::new("replica-seed");
        let b = a.clone();
        assert_eq!(a.generate(5, 5), b.generate(5, 5));
    }

    #[test]
    fn different_seeds_diverge() {
        let a = WorldGenerator::new("abc");
        let b = WorldGenerator::new("abd");
        // One chunk is 1024 tiles; two seeds agreeing on all of them
        // would mean the seed is not reaching the noise fields.
        assert_ne!(a.generate(0, 0), b.generate(0, 0));
    }

    #[test]
    fn chunk_shape_and_coordinates() {
        let generator = WorldGenerator::new("abc");
        let chunk = generator.generate(2, -3);
        assert_eq!(chunk.chunk_x, 2);
        assert_eq!(chunk.chunk_y, -3);
        assert!(chunk.is_well_formed());
        assert!(chunk.tile(0, 0).is_some());
        assert!(chunk.tile(31, 31).is_some());
        assert!(chunk.tile(32, 0).is_none());
    }

    #[test]
    fn tiles_follow_the_threshold_formulas() {
        let generator = WorldGenerator::new("abc");
        let chunk = generator.generate(0, 0);

        for ly in 0..CHUNK_SIZE {
            for lx in 0..CHUNK_SIZE {
                let tile = *chunk.tile(lx, ly).unwrap();
                let tx = lx as f32;
                let ty = ly as f32;

                let terrain = generator
                    .terrain
                    .get_noise_2d(tx * TERRAIN_FREQ, ty * TERRAIN_FREQ);
                let expected_kind = if terrain > LAND_THRESHOLD {
                    TileKind::Land
                } else {
                    TileKind::Water
                };
                assert_eq!(tile.kind, expected_kind, "kind at ({lx},{ly})");

                let raw = generator
                    .elevation
                    .get_noise_2d(tx * ELEVATION_FREQ, ty * ELEVATION_FREQ);
                let expected_elevation = match expected_kind {
                    TileKind::Land => (raw > LAND_ELEVATION_THRESHOLD) as u8,
                    TileKind::Water => (raw <= WATER_ELEVATION_THRESHOLD) as u8,
                };
                assert_eq!(tile.elevation, expected_elevation, "elevation at ({lx},{ly})");
            }
        }
    }

    #[test]
    fn resources_only_on_land_with_amounts_in_range() {
        let generator = WorldGenerator::new("resource-invariant");
        for cy in -3..3 {
            for cx in -3..3 {
                let chunk = generator.generate(cx, cy);
                for tile in &chunk.tiles {
                    if let Some(deposit) = tile.resource {
                        assert_eq!(tile.kind, TileKind::Land);
                        assert!((50..100).contains(&deposit.amount));
                    }
                }
            }
        }
    }

    #[test]
    fn a_world_has_both_terrain_kinds_somewhere() {
        let generator = WorldGenerator::new("abc");
        let mut land = 0usize;
        let mut water = 0usize;
        for cy in -4..4 {
            for cx in -4..4 {
                for tile in &generator.generate(cx, cy).tiles {
                    match tile.kind {
                        TileKind::Land => land += 1,
                        TileKind::Water => water += 1,
                    }
                }
            }
        }
        assert!(land > 0 && water > 0);
    }
}
