//! Demo driver for the gridforge world core.
//!
//! Loads every chunk in a square radius through the async coordinator,
//! prints terrain statistics, renders one chunk texture and optionally
//! writes the world seed to a save file.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tokio::task::JoinSet;

use gridforge::context::WorldContext;
use gridforge::core::{ChunkKey, TileKind};
use gridforge::error::WorldError;
use gridforge::pool::PoolConfig;
use gridforge::save::{SavedWorld, save_world};

#[derive(Parser)]
#[command(name = "gridforge", about = "Infinite tile-world generation demo")]
struct Args {
    /// World seed; fixed for the lifetime of a save.
    #[arg(long, default_value = "abc")]
    seed: String,

    /// Load all chunks with |x| <= radius and |y| <= radius.
    #[arg(long, default_value_t = 2)]
    radius: i32,

    /// Override the chunk worker count (default: half the CPUs).
    #[arg(long)]
    workers: Option<usize>,

    /// Write the world seed to this save file when done.
    #[arg(long)]
    save: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut config = PoolConfig::default();
    if let Some(workers) = args.workers {
        config.chunk_workers = workers.max(1);
    }

    tracing::info!("starting world '{}' with {:?}", args.seed, config);
    let started = Instant::now();
    let ctx = WorldContext::create(&args.seed, config).await?;
    tracing::info!("pool ready in {:?}", started.elapsed());

    let chunks = ctx.chunks();
    let loading = Instant::now();
    let mut tasks = JoinSet::new();
    for cy in -args.radius..=args.radius {
        for cx in -args.radius..=args.radius {
            let store = Arc::clone(&chunks);
            tasks.spawn(async move {
                store.get_or_generate_async(ChunkKey::new(cx, cy)).await
            });
        }
    }

    let mut land = 0usize;
    let mut water = 0usize;
    let mut deposits = 0usize;
    while let Some(result) = tasks.join_next().await {
        let chunk = result??;
        for tile in &chunk.tiles {
            match tile.kind {
                TileKind::Land => land += 1,
                TileKind::Water => water += 1,
            }
            if tile.resource.is_some() {
                deposits += 1;
            }
        }
    }
    tracing::info!(
        "loaded {} chunks in {:?}: {} land tiles, {} water tiles, {} deposits",
        chunks.len(),
        loading.elapsed(),
        land,
        water,
        deposits
    );

    let origin = chunks
        .get(ChunkKey::new(0, 0))
        .ok_or(WorldError::Schema("origin chunk missing".into()))?;
    let bitmap = ctx.pool().chunk_texture((*origin).clone()).await?;
    tracing::info!(
        "rendered origin chunk texture: {}x{}",
        bitmap.width(),
        bitmap.height()
    );

    if let Some(path) = args.save {
        save_world(&path, &SavedWorld { seed: ctx.seed() })?;
        tracing::info!("saved world seed to {}", path.display());
    }

    Ok(())
}
