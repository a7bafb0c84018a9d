pub mod chunk;
pub mod entity;
pub mod model;
pub mod updater;

pub use chunk::{Chunk, ChunkPos, Surface};
pub use entity::{Entity, EntityKind, PlayerState};
pub use model::{SharedWorld, World};
