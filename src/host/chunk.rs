use crate::host::block_states::BlockStateRegistry;
use crate::host::container::PersistentDataContainer;
use crate::protocol::chunk_data::{ChunkDataPacket, ChunkSection};
use crate::protocol::nbt::Tag;
use crate::protocol::packet::MinecraftPacketBuffer;
use crate::protocol::paletted_container::{block_index, ContainerFormat, PalettedContainer};
use std::collections::BTreeMap;
use std::io;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub const SECTION_VOLUME: usize = 4096;
pub const BIOME_VOLUME: usize = 64;

/// Anything that owns a persistent data container and sits at chunk coordinates
pub trait PersistentChunk {
    fn chunk_x(&self) -> i32;
    fn chunk_z(&self) -> i32;
    fn persistent_data(&self) -> &PersistentDataContainer;
    fn persistent_data_mut(&mut self) -> &mut PersistentDataContainer;
}

/// Global block state and biome IDs of one section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionData {
    pub blocks: Vec<u32>,
    pub biomes: Vec<u32>,
}

impl SectionData {
    pub fn filled(block: u32, biome: u32) -> Self {
        Self {
            blocks: vec![block; SECTION_VOLUME],
            biomes: vec![biome; BIOME_VOLUME],
        }
    }
}

/// Copy of a chunk's block and biome data at one point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkBlockData {
    min_y: i32,
    sections: Arc<[SectionData]>,
}

impl ChunkBlockData {
    pub fn min_y(&self) -> i32 {
        self.min_y
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Block state at chunk-local x/z and world y
    pub fn block_at(&self, local_x: i32, y: i32, local_z: i32) -> Option<u32> {
        locate(self.min_y, self.sections.len(), local_x, y, local_z)
            .map(|(section, index)| self.sections[section].blocks[index])
    }

    pub fn biome_at(&self, local_x: i32, y: i32, local_z: i32) -> Option<u32> {
        let (section, _) = locate(self.min_y, self.sections.len(), local_x, y, local_z)?;
        let index = ((((y - self.min_y) & 15) >> 2) << 4 | (local_z >> 2) << 2 | (local_x >> 2)) as usize;
        Some(self.sections[section].biomes[index])
    }
}

fn locate(min_y: i32, section_count: usize, local_x: i32, y: i32, local_z: i32) -> Option<(usize, usize)> {
    if !(0..16).contains(&local_x) || !(0..16).contains(&local_z) || y < min_y {
        return None;
    }
    let section = ((y - min_y) >> 4) as usize;
    if section >= section_count {
        return None;
    }
    let index = block_index(local_x as usize, ((y - min_y) & 15) as usize, local_z as usize);
    Some((section, index))
}

/// One loaded chunk column
#[derive(Debug, Clone)]
pub struct Chunk {
    x: i32,
    z: i32,
    min_y: i32,
    sections: Vec<SectionData>,
    persistent_data: PersistentDataContainer,
}

impl Chunk {
    /// A chunk of `height` blocks starting at `min_y`, filled with one block state
    pub fn new(x: i32, z: i32, min_y: i32, height: u32, fill: u32, biome: u32) -> Self {
        let section_count = (height as usize).div_ceil(16);
        Self {
            x,
            z,
            min_y,
            sections: vec![SectionData::filled(fill, biome); section_count],
            persistent_data: PersistentDataContainer::new(),
        }
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn z(&self) -> i32 {
        self.z
    }

    pub fn min_y(&self) -> i32 {
        self.min_y
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn block_at(&self, local_x: i32, y: i32, local_z: i32) -> Option<u32> {
        locate(self.min_y, self.sections.len(), local_x, y, local_z)
            .map(|(section, index)| self.sections[section].blocks[index])
    }

    /// Sets a block state. Returns false if the position is outside the chunk.
    pub fn set_block(&mut self, local_x: i32, y: i32, local_z: i32, state: u32) -> bool {
        match locate(self.min_y, self.sections.len(), local_x, y, local_z) {
            Some((section, index)) => {
                self.sections[section].blocks[index] = state;
                true
            }
            None => false,
        }
    }

    pub fn block_data_snapshot(&self) -> ChunkBlockData {
        ChunkBlockData {
            min_y: self.min_y,
            sections: self.sections.clone().into(),
        }
    }

    /// Builds the Chunk Data and Update Light packet the server would send for this chunk.
    pub fn to_packet(
        &self,
        block_states: &BlockStateRegistry,
        biome_direct_bits: u8,
    ) -> io::Result<ChunkDataPacket> {
        let block_format = ContainerFormat::block_states(block_states.direct_bits());
        let biome_format = ContainerFormat::biomes(biome_direct_bits);

        let mut data = MinecraftPacketBuffer::new();
        for section in &self.sections {
            let block_count = section
                .blocks
                .iter()
                .filter(|state| !block_states.is_air(**state))
                .count() as i16;
            ChunkSection {
                block_count,
                block_states: PalettedContainer::from_entries(block_format, section.blocks.clone())?,
                biomes: PalettedContainer::from_entries(biome_format, section.biomes.clone())?,
            }
            .write(&mut data)?;
        }

        let mut heightmaps = BTreeMap::new();
        heightmaps.insert("MOTION_BLOCKING".to_owned(), Tag::LongArray(Vec::new()));

        // No block entities and empty light masks
        let mut trailing = MinecraftPacketBuffer::new();
        trailing.write_varint(0);
        for _ in 0..6 {
            trailing.write_varint(0);
        }

        Ok(ChunkDataPacket::new(
            self.x,
            self.z,
            Tag::Compound(heightmaps),
            data.buffer,
            trailing.buffer,
        ))
    }
}

impl PersistentChunk for Chunk {
    fn chunk_x(&self) -> i32 {
        self.x
    }

    fn chunk_z(&self) -> i32 {
        self.z
    }

    fn persistent_data(&self) -> &PersistentDataContainer {
        &self.persistent_data
    }

    fn persistent_data_mut(&mut self) -> &mut PersistentDataContainer {
        &mut self.persistent_data
    }
}

/// Shared handle to a loaded chunk
pub type ChunkHandle = Arc<RwLock<Chunk>>;

/// Read lock that survives a panicked writer. Chunk data is plain values, so a poisoned lock
/// still holds a usable chunk.
pub fn read_chunk(handle: &ChunkHandle) -> RwLockReadGuard<'_, Chunk> {
    handle.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn write_chunk(handle: &ChunkHandle) -> RwLockWriteGuard<'_, Chunk> {
    handle.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::block_states::fixture;
    use crate::protocol::chunk_data::ChunkSections;

    #[test]
    fn test_block_access_uses_world_y() {
        let mut chunk = Chunk::new(0, 0, -64, 384, 0, 1);
        assert_eq!(chunk.section_count(), 24);
        assert!(chunk.set_block(3, 64, 7, 541));
        assert_eq!(chunk.block_at(3, 64, 7), Some(541));
        assert_eq!(chunk.block_at(3, 65, 7), Some(0));
        assert_eq!(chunk.block_at(3, -65, 7), None);
        assert_eq!(chunk.block_at(3, 320, 7), None);
        assert!(!chunk.set_block(16, 0, 0, 1));
    }

    #[test]
    fn test_block_data_snapshot_is_a_copy() {
        let mut chunk = Chunk::new(0, 0, 0, 32, 1, 1);
        let snapshot = chunk.block_data_snapshot();
        chunk.set_block(0, 0, 0, 10);
        assert_eq!(snapshot.block_at(0, 0, 0), Some(1));
        assert_eq!(snapshot.biome_at(15, 31, 15), Some(1));
    }

    #[test]
    fn test_to_packet_encodes_every_section() {
        let registry = fixture();
        let mut chunk = Chunk::new(2, -1, -64, 64, 1, 3);
        chunk.set_block(3, -60, 7, 539);

        let packet = chunk.to_packet(&registry, 6).unwrap();
        assert_eq!((packet.chunk_x, packet.chunk_z), (2, -1));

        let sections = ChunkSections::decode(
            packet.data(),
            ContainerFormat::block_states(registry.direct_bits()),
            ContainerFormat::biomes(6),
        );
        assert!(sections.error.is_none());
        assert_eq!(sections.sections.len(), 4);
        let first = &sections.sections[0].section;
        assert_eq!(first.block_count, 4096);
        assert_eq!(first.block_states.get(block_index(3, 4, 7)), Some(539));
    }
}
