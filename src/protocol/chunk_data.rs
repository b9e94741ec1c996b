use crate::protocol::nbt::Tag;
use crate::protocol::packet::{MinecraftPacketBuffer, Packet};
use crate::protocol::paletted_container::{ContainerFormat, PalettedContainer};
use std::io;

/// One 16x16x16 section of the chunk data array
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSection {
    /// Number of non-air blocks in the section
    pub block_count: i16,
    pub block_states: PalettedContainer,
    pub biomes: PalettedContainer,
}

impl ChunkSection {
    pub fn read(
        buffer: &mut MinecraftPacketBuffer,
        block_format: ContainerFormat,
        biome_format: ContainerFormat,
    ) -> io::Result<Self> {
        let block_count = buffer.read_i16()?;
        let block_states = PalettedContainer::read(buffer, block_format)?;
        let biomes = PalettedContainer::read(buffer, biome_format)?;
        Ok(Self {
            block_count,
            block_states,
            biomes,
        })
    }

    pub fn write(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_i16(self.block_count);
        self.block_states.write(buffer)?;
        self.biomes.write(buffer)
    }
}

/// A decoded section together with the exact bytes it was decoded from
#[derive(Debug, Clone)]
pub struct DecodedSection {
    pub section: ChunkSection,
    pub raw: Vec<u8>,
    pub dirty: bool,
}

/// The chunk data array split into sections. Decoding stops at the first section that fails;
/// that section and everything after it stay in `undecoded` untouched.
#[derive(Debug)]
pub struct ChunkSections {
    pub sections: Vec<DecodedSection>,
    pub undecoded: Vec<u8>,
    pub error: Option<io::Error>,
}

impl ChunkSections {
    pub fn decode(
        data: &[u8],
        block_format: ContainerFormat,
        biome_format: ContainerFormat,
    ) -> Self {
        let mut buffer = MinecraftPacketBuffer::from_bytes(data.to_vec());
        let mut sections = Vec::new();

        while buffer.remaining() > 0 {
            let start = buffer.get_cursor();
            match ChunkSection::read(&mut buffer, block_format, biome_format) {
                Ok(section) => sections.push(DecodedSection {
                    section,
                    raw: data[start..buffer.get_cursor()].to_vec(),
                    dirty: false,
                }),
                Err(err) => {
                    return Self {
                        sections,
                        undecoded: data[start..].to_vec(),
                        error: Some(err),
                    }
                }
            }
        }

        Self {
            sections,
            undecoded: Vec::new(),
            error: None,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.sections.iter().any(|section| section.dirty)
    }

    /// Re-encodes the data array. Clean sections are copied byte for byte; a dirty section that
    /// fails to encode falls back to its original bytes and is reported by index.
    pub fn encode(&self) -> (Vec<u8>, Vec<(usize, io::Error)>) {
        let mut buffer = MinecraftPacketBuffer::new();
        let mut failures = Vec::new();

        for (index, decoded) in self.sections.iter().enumerate() {
            if !decoded.dirty {
                buffer.write_bytes_raw(&decoded.raw);
                continue;
            }
            let mut section_buffer = MinecraftPacketBuffer::new();
            match decoded.section.write(&mut section_buffer) {
                Ok(()) => buffer.write_bytes_raw(&section_buffer.buffer),
                Err(err) => {
                    failures.push((index, err));
                    buffer.write_bytes_raw(&decoded.raw);
                }
            }
        }

        buffer.write_bytes_raw(&self.undecoded);
        (buffer.buffer, failures)
    }
}

/// Chunk Data and Update Light. Only the chunk data array is interpreted; block entities and
/// light data are carried through as opaque bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkDataPacket {
    pub chunk_x: i32,
    pub chunk_z: i32,
    pub heightmaps: Tag,
    data: Vec<u8>,
    /// Block entities and light data
    pub trailing: Vec<u8>,
}

impl ChunkDataPacket {
    pub fn new(chunk_x: i32, chunk_z: i32, heightmaps: Tag, data: Vec<u8>, trailing: Vec<u8>) -> Self {
        Self {
            chunk_x,
            chunk_z,
            heightmaps,
            data,
            trailing,
        }
    }

    /// The raw chunk data array
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Swaps in a rewritten chunk data array. This is the only way the array is ever changed.
    pub fn replace_section_data(&mut self, data: Vec<u8>) -> Vec<u8> {
        std::mem::replace(&mut self.data, data)
    }
}

impl Packet for ChunkDataPacket {
    fn packet_id() -> i32 {
        0x25
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        let chunk_x = buffer.read_i32()?;
        let chunk_z = buffer.read_i32()?;
        let heightmaps = Tag::read_network(buffer)?;
        let size = buffer.read_length()?;
        let data = buffer.read_bytes(size)?;
        let trailing = buffer.read_remaining();

        Ok(ChunkDataPacket {
            chunk_x,
            chunk_z,
            heightmaps,
            data,
            trailing,
        })
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_varint(Self::packet_id());

        buffer.write_i32(self.chunk_x);
        buffer.write_i32(self.chunk_z);
        self.heightmaps.write_network(buffer)?;

        buffer.write_varint(self.data.len() as i32);
        buffer.write_bytes_raw(&self.data);
        buffer.write_bytes_raw(&self.trailing);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::paletted_container::block_index;
    use std::collections::BTreeMap;

    fn formats() -> (ContainerFormat, ContainerFormat) {
        (ContainerFormat::block_states(15), ContainerFormat::biomes(6))
    }

    fn section(fill: u32) -> ChunkSection {
        let (block_format, biome_format) = formats();
        ChunkSection {
            block_count: if fill == 0 { 0 } else { 4096 },
            block_states: PalettedContainer::filled(block_format, fill),
            biomes: PalettedContainer::filled(biome_format, 1),
        }
    }

    fn encode_sections(sections: &[ChunkSection]) -> Vec<u8> {
        let mut buffer = MinecraftPacketBuffer::new();
        for section in sections {
            section.write(&mut buffer).unwrap();
        }
        buffer.buffer
    }

    #[test]
    fn test_chunk_data_packet_layout() {
        let mut heightmaps = BTreeMap::new();
        heightmaps.insert("MOTION_BLOCKING".to_owned(), Tag::LongArray(vec![0; 37]));
        let packet = ChunkDataPacket::new(
            -3,
            12,
            Tag::Compound(heightmaps),
            encode_sections(&[section(1), section(0)]),
            vec![0, 1, 2, 3],
        );

        let mut buffer = MinecraftPacketBuffer::new();
        packet.write_to_buffer(&mut buffer).unwrap();
        assert_eq!(buffer.read_varint().unwrap(), 0x25);
        assert_eq!(buffer.read_i32().unwrap(), -3);

        let mut buffer = MinecraftPacketBuffer::from_bytes(buffer.buffer);
        buffer.read_varint().unwrap();
        let decoded = ChunkDataPacket::read_from_buffer(&mut buffer).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_clean_sections_are_copied_verbatim() {
        let (block_format, biome_format) = formats();
        let data = encode_sections(&[section(1), section(0), section(9)]);
        let sections = ChunkSections::decode(&data, block_format, biome_format);
        assert!(sections.error.is_none());
        assert_eq!(sections.sections.len(), 3);
        assert!(!sections.is_dirty());

        let (encoded, failures) = sections.encode();
        assert!(failures.is_empty());
        assert_eq!(encoded, data);
    }

    #[test]
    fn test_dirty_section_is_reencoded() {
        let (block_format, biome_format) = formats();
        let data = encode_sections(&[section(1), section(1)]);
        let mut sections = ChunkSections::decode(&data, block_format, biome_format);

        let target = &mut sections.sections[1];
        target.dirty = target.section.block_states.set(block_index(3, 0, 7), 539);
        assert!(sections.is_dirty());

        let (encoded, failures) = sections.encode();
        assert!(failures.is_empty());
        let reread = ChunkSections::decode(&encoded, block_format, biome_format);
        assert_eq!(reread.sections[0].raw, sections.sections[0].raw);
        assert_eq!(
            reread.sections[1].section.block_states.get(block_index(3, 0, 7)),
            Some(539)
        );
    }

    #[test]
    fn test_decode_failure_keeps_the_rest_untouched() {
        let (block_format, biome_format) = formats();
        let mut data = encode_sections(&[section(1)]);
        let garbage = vec![0x00, 0x10, 0x04, 0x7F];
        data.extend_from_slice(&garbage);

        let sections = ChunkSections::decode(&data, block_format, biome_format);
        assert_eq!(sections.sections.len(), 1);
        assert!(sections.error.is_some());
        assert_eq!(sections.undecoded, garbage);

        let (encoded, _) = sections.encode();
        assert_eq!(encoded, data);
    }

    #[test]
    fn test_failed_encode_falls_back_to_original_bytes() {
        let (block_format, biome_format) = formats();
        let data = encode_sections(&[section(1)]);
        let mut sections = ChunkSections::decode(&data, block_format, biome_format);

        // Enough distinct values to force the global palette, one of them too wide for 15 bits
        let decoded = &mut sections.sections[0];
        for i in 0..300 {
            decoded.section.block_states.set(i, i as u32);
        }
        decoded.section.block_states.set(300, 1 << 20);
        decoded.dirty = true;

        let (encoded, failures) = sections.encode();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, 0);
        assert_eq!(encoded, data);
    }
}
