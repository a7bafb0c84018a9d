use std::io::{self, Read};

/// Horizontal chunk size in bits.
pub const CHUNK_BITS: i32 = 4;
pub const CHUNK_WIDTH: usize = 1 << CHUNK_BITS;
pub const CHUNK_HEIGHT: usize = 128;
pub const AIR: u8 = 0;

const CELLS: usize = CHUNK_WIDTH * CHUNK_WIDTH;

/// Chunk coordinate: world block coordinate shifted right by [`CHUNK_BITS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The chunk holding world block column `(x, z)`.
    pub fn containing(x: i32, z: i32) -> Self {
        Self {
            x: x >> CHUNK_BITS,
            z: z >> CHUNK_BITS,
        }
    }
}

/// Offset of world coordinate `v` inside its chunk.
pub fn local(v: i32) -> usize {
    (v & (CHUNK_WIDTH as i32 - 1)) as usize
}

/// Cached summary of the topmost non-air block of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Surface {
    pub height: u8,
    pub block: u8,
}

/// A 16x16x128 column of block ids, stored column-major like the wire format:
/// index `(x * 16 + z) * 128 + y`.
#[derive(Clone)]
pub struct Chunk {
    blocks: Box<[u8]>,
    surface: [Surface; CELLS],
}

impl Default for Chunk {
    fn default() -> Self {
        Self::new()
    }
}

fn cell(x: usize, z: usize) -> usize {
    x * CHUNK_WIDTH + z
}

impl Chunk {
    pub fn new() -> Self {
        Self {
            blocks: vec![AIR; CELLS * CHUNK_HEIGHT].into_boxed_slice(),
            surface: [Surface::default(); CELLS],
        }
    }

    pub fn column(&self, x: usize, z: usize) -> &[u8] {
        let start = cell(x, z) * CHUNK_HEIGHT;
        &self.blocks[start..start + CHUNK_HEIGHT]
    }

    pub fn column_mut(&mut self, x: usize, z: usize) -> &mut [u8] {
        let start = cell(x, z) * CHUNK_HEIGHT;
        &mut self.blocks[start..start + CHUNK_HEIGHT]
    }

    pub fn block(&self, x: usize, y: usize, z: usize) -> u8 {
        self.column(x, z)[y]
    }

    pub fn surface(&self, x: usize, z: usize) -> Surface {
        self.surface[cell(x, z)]
    }

    /// Streams `height` bytes from `reader` into column `(x, z)` starting at `y`,
    /// then refreshes the column's surface cache.
    pub fn load_column<R: Read>(
        &mut self,
        x: usize,
        z: usize,
        y: usize,
        height: usize,
        reader: &mut R,
    ) -> io::Result<()> {
        if height == 0 {
            return Ok(());
        }
        reader.read_exact(&mut self.column_mut(x, z)[y..y + height])?;
        self.refresh_surface(x, z, y + height - 1);
        Ok(())
    }

    pub fn set_block(&mut self, x: usize, y: usize, z: usize, block: u8) {
        self.column_mut(x, z)[y] = block;
        let cached = self.surface[cell(x, z)];
        if block != AIR && y >= cached.height as usize {
            self.surface[cell(x, z)] = Surface {
                height: y as u8,
                block,
            };
        } else if y == cached.height as usize {
            self.refresh_surface(x, z, y);
        }
    }

    /// Rescans downward from `top` after `top` and the blocks under it changed.
    /// Writes whose top lies below the cached height cannot move the surface.
    fn refresh_surface(&mut self, x: usize, z: usize, top: usize) {
        if top < self.surface[cell(x, z)].height as usize {
            return;
        }
        let column = self.column(x, z);
        let surface = (0..=top)
            .rev()
            .find(|&y| column[y] != AIR)
            .map(|y| Surface {
                height: y as u8,
                block: column[y],
            })
            .unwrap_or_default();
        self.surface[cell(x, z)] = surface;
    }
}
