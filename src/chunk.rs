use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of a chunk along x and z, and height of one section.
pub const CHUNK_SIZE: usize = 16;
/// Cells in one 16x16x16 section.
pub const SECTION_VOLUME: usize = CHUNK_SIZE * CHUNK_SIZE * CHUNK_SIZE;
/// Columns in one chunk (16x16).
pub const COLUMN_COUNT: usize = CHUNK_SIZE * CHUNK_SIZE;

pub type BlockId = u16;
pub type BlockData = u8;

// ─── Coordinates ────────────────────────────────────────────────────────────

/// Chunk position on the horizontal grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub x: i32,
    pub z: i32,
}

impl ChunkCoord {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The four axis neighbours, in `+x, -x, +z, -z` order.
    pub fn neighbors(self) -> [ChunkCoord; 4] {
        [
            ChunkCoord::new(self.x + 1, self.z),
            ChunkCoord::new(self.x - 1, self.z),
            ChunkCoord::new(self.x, self.z + 1),
            ChunkCoord::new(self.x, self.z - 1),
        ]
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}]", self.x, self.z)
    }
}

// ─── Blocks ─────────────────────────────────────────────────────────────────

/// Legacy numeric block code: id plus 4-bit data (meta) value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BlockCell {
    pub id: BlockId,
    pub data: BlockData,
}

impl BlockCell {
    pub const AIR: BlockCell = BlockCell { id: 0, data: 0 };

    pub const fn new(id: BlockId, data: BlockData) -> Self {
        Self { id, data }
    }
}

impl fmt::Display for BlockCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id, self.data)
    }
}

/// One 16x16x16 slice of a chunk. Cells are indexed `y * 256 + z * 16 + x`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSection {
    pub ids: Vec<BlockId>,
    pub data: Vec<BlockData>,
}

impl ChunkSection {
    pub fn empty() -> Self {
        Self {
            ids: vec![0; SECTION_VOLUME],
            data: vec![0; SECTION_VOLUME],
        }
    }

    #[inline]
    fn index(x: usize, y: usize, z: usize) -> usize {
        (y << 8) | (z << 4) | x
    }

    pub fn is_empty(&self) -> bool {
        self.ids.iter().all(|&id| id == 0)
    }
}

impl Default for ChunkSection {
    fn default() -> Self {
        Self::empty()
    }
}

// ─── Chunk ──────────────────────────────────────────────────────────────────

/// Dense, format-agnostic chunk contents.
///
/// Sections are stored bottom-up and contiguous, so the height of the chunk is
/// always `sections.len() * 16`. Storage codecs translate to and from this
/// representation; the converter only ever deep-copies it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkData {
    pub x: i32,
    pub z: i32,
    pub sections: Vec<ChunkSection>,
    /// One biome id per column, indexed `z * 16 + x`.
    pub biomes: Vec<u8>,
    /// Highest non-air y + 1 per column, indexed `z * 16 + x`.
    pub height_map: Vec<i32>,
}

impl ChunkData {
    pub fn new(coord: ChunkCoord, section_count: usize) -> Self {
        Self {
            x: coord.x,
            z: coord.z,
            sections: vec![ChunkSection::empty(); section_count],
            biomes: vec![0; COLUMN_COUNT],
            height_map: vec![0; COLUMN_COUNT],
        }
    }

    pub fn coord(&self) -> ChunkCoord {
        ChunkCoord::new(self.x, self.z)
    }

    pub fn max_y(&self) -> usize {
        self.sections.len() * CHUNK_SIZE
    }

    /// Reads a cell. Anything above `max_y` is air.
    pub fn block(&self, x: usize, y: usize, z: usize) -> BlockCell {
        debug_assert!(x < CHUNK_SIZE && z < CHUNK_SIZE);
        match self.sections.get(y / CHUNK_SIZE) {
            Some(section) => {
                let i = ChunkSection::index(x, y % CHUNK_SIZE, z);
                BlockCell::new(section.ids[i], section.data[i])
            }
            None => BlockCell::AIR,
        }
    }

    /// Writes a cell, growing the section stack when `y` is above `max_y`.
    pub fn set_block(&mut self, x: usize, y: usize, z: usize, cell: BlockCell) {
        debug_assert!(x < CHUNK_SIZE && z < CHUNK_SIZE);
        let section_y = y / CHUNK_SIZE;
        if section_y >= self.sections.len() {
            if cell == BlockCell::AIR {
                return;
            }
            self.sections.resize(section_y + 1, ChunkSection::empty());
        }
        let section = &mut self.sections[section_y];
        let i = ChunkSection::index(x, y % CHUNK_SIZE, z);
        section.ids[i] = cell.id;
        section.data[i] = cell.data;
    }

    pub fn biome(&self, x: usize, z: usize) -> u8 {
        self.biomes[z * CHUNK_SIZE + x]
    }

    pub fn set_biome(&mut self, x: usize, z: usize, biome: u8) {
        self.biomes[z * CHUNK_SIZE + x] = biome;
    }

    pub fn height(&self, x: usize, z: usize) -> i32 {
        self.height_map[z * CHUNK_SIZE + x]
    }

    /// Rebuilds the height map from the block array.
    pub fn recalculate_height_map(&mut self) {
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let top = (0..self.max_y())
                    .rev()
                    .find(|&y| self.block(x, y, z).id != 0)
                    .map_or(0, |y| y as i32 + 1);
                self.height_map[z * CHUNK_SIZE + x] = top;
            }
        }
    }

    /// Mutable view over every cell as parallel `(id, data)` slots.
    pub fn cells_mut(&mut self) -> impl Iterator<Item = (&mut BlockId, &mut BlockData)> {
        self.sections
            .iter_mut()
            .flat_map(|section| section.ids.iter_mut().zip(section.data.iter_mut()))
    }
}
