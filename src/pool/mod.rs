pub mod dispatcher;
pub mod protocol;
pub mod worker;

pub use dispatcher::{PoolConfig, WorkerPool};
pub use protocol::{
    ChunkRequest, ChunkResponse, TextureBitmap, TextureRequest, TextureResponse, TileVariant,
};
