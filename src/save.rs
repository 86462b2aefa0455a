//! Savegame persistence.
//!
//! Only the world seed crosses the save boundary. Chunk contents are
//! never persisted; generation is deterministic, so a loaded world
//! regenerates the exact same terrain on demand.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::SaveError;

const MAGIC_HEADER: &[u8; 4] = b"GFW1";
const VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedWorld {
    pub seed: String,
}

pub fn save_world<P: AsRef<Path>>(path: P, world: &SavedWorld) -> Result<(), SaveError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(MAGIC_HEADER)?;
    writer.write_all(&VERSION.to_le_bytes())?;

    let data = bincode::serialize(world)?;
    writer.write_all(&(data.len() as u64).to_le_bytes())?;
    writer.write_all(&data)?;
    writer.flush()?;

    Ok(())
}

pub fn load_world<P: AsRef<Path>>(path: P) -> Result<SavedWorld, SaveError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC_HEADER {
        return Err(SaveError::BadMagic);
    }

    let mut version_bytes = [0u8; 4];
    reader.read_exact(&mut version_bytes)?;
    let version = u32::from_le_bytes(version_bytes);
    if version != VERSION {
        return Err(SaveError::BadVersion(version));
    }

    let mut size_bytes = [0u8; 8];
    reader.read_exact(&mut size_bytes)?;
    let size = u64::from_le_bytes(size_bytes) as usize;

    let mut data = vec![0u8; size];
    reader.read_exact(&mut data)?;

    Ok(bincode::deserialize(&data)?)
}

pub const DEFAULT_WORLD_FILE: &str = "world.gfw";
