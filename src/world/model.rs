use crate::error::WorldError;
use crate::world::chunk::{local, Chunk, ChunkPos, Surface, CHUNK_HEIGHT};
use crate::world::entity::{Entity, PlayerState};
use flate2::read::ZlibDecoder;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// The world model behind a reader-admitting, writer-exclusive lock. Only the
/// world updater takes the write half.
pub type SharedWorld = Arc<RwLock<World>>;

/// Terrain, entities and player state derived from observed traffic.
/// Chunks are created on first write and kept for the life of the process.
#[derive(Default)]
pub struct World {
    chunks: HashMap<ChunkPos, Chunk>,
    entities: HashMap<i32, Entity>,
    player: PlayerState,
    time: i64,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedWorld {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Inflates a cuboid of block ids and scatters it column by column.
    ///
    /// `payload` is one zlib stream for the whole cuboid, ordered x, then z, then
    /// y, so a single decoder is threaded through every chunk the cuboid touches.
    #[allow(clippy::too_many_arguments)]
    pub fn apply_chunk_update(
        &mut self,
        x0: i32,
        y0: i32,
        z0: i32,
        xs: i32,
        ys: i32,
        zs: i32,
        payload: &[u8],
    ) -> Result<(), WorldError> {
        let top = y0.checked_add(ys);
        if y0 < 0 || ys < 0 || top.map_or(true, |top| top > CHUNK_HEIGHT as i32) {
            return Err(WorldError::OutOfBounds { y: y0, height: ys });
        }

        let mut inflater = ZlibDecoder::new(payload);
        // Horizontal coordinates wrap at the edge of the i32 range.
        for i in 0..xs {
            let x = x0.wrapping_add(i);
            for j in 0..zs {
                let z = z0.wrapping_add(j);
                let chunk = self
                    .chunks
                    .entry(ChunkPos::containing(x, z))
                    .or_default();
                chunk
                    .load_column(local(x), local(z), y0 as usize, ys as usize, &mut inflater)
                    .map_err(WorldError::Decompression)?;
            }
        }
        Ok(())
    }

    /// Sets one block. Changes for chunks never seen are dropped, since a
    /// lone block is no basis for a chunk.
    pub fn apply_block_change(&mut self, x: i32, y: i32, z: i32, block: u8) {
        if !(0..CHUNK_HEIGHT as i32).contains(&y) {
            return;
        }
        if let Some(chunk) = self.chunks.get_mut(&ChunkPos::containing(x, z)) {
            chunk.set_block(local(x), y as usize, local(z), block);
        }
    }

    pub fn chunk(&self, pos: ChunkPos) -> Option<&Chunk> {
        self.chunks.get(&pos)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn block_at(&self, x: i32, y: i32, z: i32) -> Option<u8> {
        if !(0..CHUNK_HEIGHT as i32).contains(&y) {
            return None;
        }
        self.chunk(ChunkPos::containing(x, z))
            .map(|chunk| chunk.block(local(x), y as usize, local(z)))
    }

    pub fn surface_at(&self, x: i32, z: i32) -> Option<Surface> {
        self.chunk(ChunkPos::containing(x, z))
            .map(|chunk| chunk.surface(local(x), local(z)))
    }

    pub fn spawn_entity(&mut self, entity: Entity) {
        self.entities.insert(entity.id, entity);
    }

    pub fn remove_entity(&mut self, id: i32) -> Option<Entity> {
        self.entities.remove(&id)
    }

    pub fn entity(&self, id: i32) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn entity_mut(&mut self, id: i32) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Hands every tracked entity to `visit`, in no particular order.
    pub fn for_each_entity<F: FnMut(&Entity)>(&self, mut visit: F) {
        for entity in self.entities.values() {
            visit(entity);
        }
    }

    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut PlayerState {
        &mut self.player
    }

    pub fn time(&self) -> i64 {
        self.time
    }

    pub fn set_time(&mut self, time: i64) {
        self.time = time;
    }

    /// Forgets entities, e.g. after a fresh login.
    pub fn clear_entities(&mut self) {
        self.entities.clear();
    }
}
