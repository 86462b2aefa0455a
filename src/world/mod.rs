pub mod generator;
pub mod store;

pub use generator::WorldGenerator;
pub use store::ChunkStore;
