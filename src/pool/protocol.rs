//! Message types exchanged with workers, plus their schema checks.
//!
//! Every request is validated before it is sent and again when a worker
//! receives it; every response is validated by the router before it can
//! resolve a pending entry. A malformed message fails that one call and
//! never takes the pool down.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::core::chunk::Chunk;
use crate::error::WorldError;

/// Request for one chunk's tile grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRequest {
    pub id: String,
    pub chunk_x: i32,
    pub chunk_y: i32,
    pub seed: String,
}

impl ChunkRequest {
    pub fn validate(&self) -> Result<(), WorldError> {
        if self.id.is_empty() {
            return Err(WorldError::Schema("chunk request with empty id".into()));
        }
        if self.seed.is_empty() {
            return Err(WorldError::Schema(format!(
                "chunk request {} with empty seed",
                self.id
            )));
        }
        Ok(())
    }
}

/// Worker reply to a [`ChunkRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkResponse {
    pub id: String,
    pub payload: Result<Chunk, String>,
}

impl ChunkResponse {
    pub fn validate(&self) -> Result<(), WorldError> {
        if self.id.is_empty() {
            return Err(WorldError::Schema("chunk response with empty id".into()));
        }
        if let Ok(chunk) = &self.payload {
            if !chunk.is_well_formed() {
                return Err(WorldError::Schema(format!(
                    "chunk response {} carries a malformed grid ({} tiles)",
                    self.id,
                    chunk.tiles.len()
                )));
            }
        }
        Ok(())
    }
}

/// Fill parameters for one tile texture: a base fill plus speckle noise
/// blended toward a second color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileVariant {
    pub base_color: String,
    pub noise_color: String,
    pub noise_opacity: f32,
}

impl TileVariant {
    /// Canonical cache key inside a texture worker.
    pub fn cache_key(&self) -> String {
        format!(
            "tile:{}:{}:{}",
            self.base_color, self.noise_color, self.noise_opacity
        )
    }

    pub fn validate(&self) -> Result<(), WorldError> {
        parse_hex_color(&self.base_color)?;
        parse_hex_color(&self.noise_color)?;
        if !(0.0..=1.0).contains(&self.noise_opacity) {
            return Err(WorldError::Schema(format!(
                "noise opacity {} outside [0, 1]",
                self.noise_opacity
            )));
        }
        Ok(())
    }
}

/// Request for one synthesized texture. `Pregenerate` is a type-tagged
/// broadcast with no correlation id; the ack is matched per worker, not
/// per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TextureRequest {
    Tile { id: String, variant: TileVariant },
    Resource { id: String, color: String },
    Chunk { id: String, chunk: Chunk },
    Pregenerate,
}

impl TextureRequest {
    pub fn id(&self) -> Option<&str> {
        match self {
            TextureRequest::Tile { id, .. }
            | TextureRequest::Resource { id, .. }
            | TextureRequest::Chunk { id, .. } => Some(id),
            TextureRequest::Pregenerate => None,
        }
    }

    pub fn validate(&self) -> Result<(), WorldError> {
        if self.id().is_some_and(str::is_empty) {
            return Err(WorldError::Schema("texture request with empty id".into()));
        }
        match self {
            TextureRequest::Tile { variant, .. } => variant.validate(),
            TextureRequest::Resource { color, .. } => parse_hex_color(color).map(|_| ()),
            TextureRequest::Chunk { id, chunk } => {
                if chunk.is_well_formed() {
                    Ok(())
                } else {
                    Err(WorldError::Schema(format!(
                        "texture request {} carries a malformed chunk",
                        id
                    )))
                }
            }
            TextureRequest::Pregenerate => Ok(()),
        }
    }
}

/// A synthesized raster handed back across the thread boundary. The
/// pixel buffer is moved with the message, never copied.
#[derive(Debug, Clone)]
pub struct TextureBitmap {
    pub image: RgbaImage,
}

impl TextureBitmap {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Worker reply to a [`TextureRequest`] with a correlation id.
#[derive(Debug)]
pub struct TextureResponse {
    pub id: String,
    pub payload: Result<TextureBitmap, String>,
}

impl TextureResponse {
    pub fn validate(&self) -> Result<(), WorldError> {
        if self.id.is_empty() {
            return Err(WorldError::Schema("texture response with empty id".into()));
        }
        if let Ok(bitmap) = &self.payload {
            if bitmap.width() == 0 || bitmap.height() == 0 {
                return Err(WorldError::Schema(format!(
                    "texture response {} carries an empty bitmap",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

/// Envelope every worker sends back to the router thread.
#[derive(Debug)]
pub enum WorkerReply {
    Chunk(ChunkResponse),
    Texture(TextureResponse),
    /// Pregenerate ack: completion or failure, one per texture worker.
    Pregenerate(Result<(), String>),
}

/// Parse a `#rrggbb` color string into RGB components.
pub fn parse_hex_color(hex: &str) -> Result<[u8; 3], WorldError> {
    let digits = hex
        .strip_prefix('#')
        .filter(|d| d.len() == 6 && d.chars().all(|c| c.is_ascii_hexdigit()))
        .ok_or_else(|| WorldError::Schema(format!("invalid color '{}'", hex)))?;
    let r = u8::from_str_radix(&digits[0..2], 16).unwrap_or(0);
    let g = u8::from_str_radix(&digits[2..4], 16).unwrap_or(0);
    let b = u8::from_str_radix(&digits[4..6], 16).unwrap_or(0);
    Ok([r, g, b])
}
