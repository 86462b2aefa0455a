//! Procedural texture synthesis.
//!
//! Everything here renders into plain RGBA buffers so it can run inside
//! a texture worker and be handed back across the thread boundary as a
//! [`TextureBitmap`] without touching the control thread.

use image::{Rgba, RgbaImage};
use rand::Rng;

use crate::constants::*;
use crate::core::chunk::Chunk;
use crate::core::tile::TileKind;
use crate::pool::protocol::{TextureBitmap, TileVariant, parse_hex_color};

/// The fixed palette of tile variants the pregenerate pass primes.
/// Order: land low, land high, water shallow, water deep.
pub fn tile_variants() -> Vec<TileVariant> {
    vec![
        TileVariant {
            base_color: "#4c8c3a".into(),
            noise_color: "#3a6c2c".into(),
            noise_opacity: 0.35,
        },
        TileVariant {
            base_color: "#6f9e49".into(),
            noise_color: "#55803a".into(),
            noise_opacity: 0.35,
        },
        TileVariant {
            base_color: "#3f76c8".into(),
            noise_color: "#5b8ed6".into(),
            noise_opacity: 0.25,
        },
        TileVariant {
            base_color: "#2c5aa8".into(),
            noise_color: "#244a8c".into(),
            noise_opacity: 0.25,
        },
    ]
}

/// Synthesize one tile texture: a base fill with a random subset of
/// pixels blended toward the noise color. The speckle pattern is
/// allowed to differ run to run; only chunk content must be
/// deterministic, not its look.
pub fn synthesize_tile(variant: &TileVariant) -> Result<TextureBitmap, String> {
    let base = parse_hex_color(&variant.base_color).map_err(|e| e.to_string())?;
    let noise = parse_hex_color(&variant.noise_color).map_err(|e| e.to_string())?;

    let mut image = RgbaImage::from_pixel(
        TILE_TEXTURE_SIZE,
        TILE_TEXTURE_SIZE,
        Rgba([base[0], base[1], base[2], 255]),
    );

    let mut rng = rand::rng();
    for pixel in image.pixels_mut() {
        if rng.random_bool(0.4) {
            let weight = variant.noise_opacity * rng.random_range(0.5..=1.0);
            *pixel = blend(*pixel, noise, weight);
        }
    }

    Ok(TextureBitmap { image })
}

/// Synthesize a resource icon: a filled circle with a darker outline on
/// transparent ground.
pub fn synthesize_resource_icon(color_hex: &str) -> Result<TextureBitmap, String> {
    let fill = parse_hex_color(color_hex).map_err(|e| e.to_string())?;
    let outline = darken(fill, 0.55);

    let size = RESOURCE_ICON_SIZE;
    let mut image = RgbaImage::from_pixel(size, size, Rgba([0, 0, 0, 0]));
    let center = (size as f32 - 1.0) / 2.0;
    let radius = size as f32 * 0.38;

    for y in 0..size {
        for x in 0..size {
            let dx = x as f32 - center;
            let dy = y as f32 - center;
            let dist = (dx * dx + dy * dy).sqrt();
            if dist <= radius {
                image.put_pixel(x, y, Rgba([fill[0], fill[1], fill[2], 255]));
            } else if dist <= radius + 1.2 {
                image.put_pixel(x, y, Rgba([outline[0], outline[1], outline[2], 255]));
            }
        }
    }

    Ok(TextureBitmap { image })
}

/// Synthesize a whole-chunk texture: one flat-colored cell per tile
/// with light hash-based noise, plus a circular marker over tiles that
/// carry a resource.
pub fn synthesize_chunk(chunk: &Chunk) -> Result<TextureBitmap, String> {
    if !chunk.is_well_formed() {
        return Err(format!(
            "refusing to draw malformed chunk {}",
            chunk.key()
        ));
    }

    let scale = CHUNK_TEXTURE_TILE_PX;
    let mut image = RgbaImage::new(CHUNK_TEXTURE_SIZE, CHUNK_TEXTURE_SIZE);

    for ty in 0..CHUNK_SIZE {
        for tx in 0..CHUNK_SIZE {
            let tile = chunk
                .tile(tx, ty)
                .ok_or_else(|| format!("missing tile ({tx},{ty})"))?;
            let base = tile_color(tile.kind, tile.elevation);

            for py in 0..scale {
                for px in 0..scale {
                    let x = tx as u32 * scale + px;
                    let y = ty as u32 * scale + py;
                    // Per-tile texture grain, same flavor as the atlas
                    // generator: a position hash, not an RNG.
                    let jitter = (pixel_hash(x, y, 7) % 17) as i32 - 8;
                    image.put_pixel(x, y, Rgba([
                        shade(base[0], jitter),
                        shade(base[1], jitter),
                        shade(base[2], jitter),
                        255,
                    ]));
                }
            }

            if let Some(deposit) = tile.resource {
                draw_resource_marker(
                    &mut image,
                    tx as u32 * scale,
                    ty as u32 * scale,
                    scale,
                    parse_hex_color(deposit.kind.color_hex()).map_err(|e| e.to_string())?,
                );
            }
        }
    }

    Ok(TextureBitmap { image })
}

fn draw_resource_marker(image: &mut RgbaImage, x0: u32, y0: u32, scale: u32, color: [u8; 3]) {
    let center = (scale as f32 - 1.0) / 2.0;
    let radius = scale as f32 * 0.4;
    for py in 0..scale {
        for px in 0..scale {
            let dx = px as f32 - center;
            let dy = py as f32 - center;
            if (dx * dx + dy * dy).sqrt() <= radius {
                image.put_pixel(x0 + px, y0 + py, Rgba([color[0], color[1], color[2], 255]));
            }
        }
    }
}

fn tile_color(kind: TileKind, elevation: u8) -> [u8; 3] {
    match (kind, elevation) {
        (TileKind::Land, 0) => [76, 140, 58],
        (TileKind::Land, _) => [111, 158, 73],
        (TileKind::Water, 0) => [63, 118, 200],
        (TileKind::Water, _) => [44, 90, 168],
    }
}

fn blend(base: Rgba<u8>, toward: [u8; 3], weight: f32) -> Rgba<u8> {
    let w = weight.clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| (a as f32 * (1.0 - w) + b as f32 * w).round() as u8;
    Rgba([
        mix(base[0], toward[0]),
        mix(base[1], toward[1]),
        mix(base[2], toward[2]),
        base[3],
    ])
}

fn darken(color: [u8; 3], factor: f32) -> [u8; 3] {
    [
        (color[0] as f32 * factor) as u8,
        (color[1] as f32 * factor) as u8,
        (color[2] as f32 * factor) as u8,
    ]
}

fn shade(channel: u8, jitter: i32) -> u8 {
    (channel as i32 + jitter).clamp(0, 255) as u8
}

fn pixel_hash(x: u32, y: u32, salt: u32) -> u32 {
    let n = x
        .wrapping_mul(374761393)
        .wrapping_add(y.wrapping_mul(668265263))
        .wrapping_add(salt);
    let n = (n ^ (n >> 13)).wrapping_mul(1274126177);
    n ^ (n >> 16)
}
