use crate::protocol::packet::MinecraftPacketBuffer;
use std::io;

/// Number of bits needed to index `count` distinct values
pub fn ceil_log2(count: usize) -> u8 {
    if count <= 1 {
        0
    } else {
        (usize::BITS - (count - 1).leading_zeros()) as u8
    }
}

/// Shape of one kind of paletted container: how many entries it holds and which bit widths
/// select the indirect palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerFormat {
    pub entries: usize,
    pub min_indirect_bits: u8,
    pub max_indirect_bits: u8,
    /// Bits per entry when the global palette is used directly
    pub direct_bits: u8,
}

impl ContainerFormat {
    /// 16x16x16 block states
    pub fn block_states(direct_bits: u8) -> Self {
        Self {
            entries: 4096,
            min_indirect_bits: 4,
            max_indirect_bits: 8,
            direct_bits,
        }
    }

    /// 4x4x4 biomes
    pub fn biomes(direct_bits: u8) -> Self {
        Self {
            entries: 64,
            min_indirect_bits: 1,
            max_indirect_bits: 3,
            direct_bits,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Palette {
    /// Every entry has the same global ID
    Single(u32),
    /// Entries index into a local list of global IDs
    Indirect { bits_per_entry: u8, palette: Vec<u32> },
    /// Entries are global IDs
    Direct { bits_per_entry: u8 },
}

/// A paletted container decoded into one global ID per entry. Entries are indexed
/// `y << 8 | z << 4 | x` for block states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PalettedContainer {
    format: ContainerFormat,
    entries: Vec<u32>,
}

fn unpack_longs(
    data: &[i64],
    bits: u8,
    count: usize,
    mut map: impl FnMut(u64) -> io::Result<u32>,
) -> io::Result<Vec<u32>> {
    let bits = bits as usize;
    let per_long = 64 / bits;
    let expected = count.div_ceil(per_long);
    if data.len() != expected {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "Data array has {} longs, expected {} for {} bits per entry",
                data.len(),
                expected,
                bits
            ),
        ));
    }

    let mask = (1u64 << bits) - 1;
    let mut entries = Vec::with_capacity(count);
    for index in 0..count {
        let long = data[index / per_long] as u64;
        let offset = (index % per_long) * bits;
        entries.push(map((long >> offset) & mask)?);
    }
    Ok(entries)
}

fn pack_longs(values: impl ExactSizeIterator<Item = u64>, bits: u8) -> Vec<i64> {
    let bits = bits as usize;
    let per_long = 64 / bits;
    let mut data = vec![0u64; values.len().div_ceil(per_long)];
    for (index, value) in values.enumerate() {
        data[index / per_long] |= value << ((index % per_long) * bits);
    }
    data.into_iter().map(|long| long as i64).collect()
}

impl PalettedContainer {
    /// A container holding `value` everywhere
    pub fn filled(format: ContainerFormat, value: u32) -> Self {
        Self {
            format,
            entries: vec![value; format.entries],
        }
    }

    pub fn from_entries(format: ContainerFormat, entries: Vec<u32>) -> io::Result<Self> {
        if entries.len() != format.entries {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "Container needs {} entries, got {}",
                    format.entries,
                    entries.len()
                ),
            ));
        }
        Ok(Self { format, entries })
    }

    pub fn read(buffer: &mut MinecraftPacketBuffer, format: ContainerFormat) -> io::Result<Self> {
        let bits = buffer.read_u8()?;

        if bits == 0 {
            let value = buffer.read_varint()? as u32;
            let length = buffer.read_length()?;
            // Vanilla always sends an empty array here
            for _ in 0..length {
                buffer.read_i64()?;
            }
            return Ok(Self::filled(format, value));
        }

        if bits <= format.max_indirect_bits {
            let bits = bits.max(format.min_indirect_bits);
            let palette_length = buffer.read_length()?;
            let mut palette = Vec::with_capacity(palette_length.min(256));
            for _ in 0..palette_length {
                palette.push(buffer.read_varint()? as u32);
            }
            let data = Self::read_data(buffer)?;
            let entries = unpack_longs(&data, bits, format.entries, |index| {
                palette.get(index as usize).copied().ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!(
                            "Palette index {} out of range (palette has {} entries)",
                            index,
                            palette.len()
                        ),
                    )
                })
            })?;
            return Ok(Self { format, entries });
        }

        if bits > 32 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid bits per entry: {}", bits),
            ));
        }
        let data = Self::read_data(buffer)?;
        let entries = unpack_longs(&data, bits, format.entries, |value| Ok(value as u32))?;
        Ok(Self { format, entries })
    }

    fn read_data(buffer: &mut MinecraftPacketBuffer) -> io::Result<Vec<i64>> {
        let length = buffer.read_length()?;
        if length * 8 > buffer.remaining() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("Data array of {} longs runs past the buffer", length),
            ));
        }
        let mut data = Vec::with_capacity(length);
        for _ in 0..length {
            data.push(buffer.read_i64()?);
        }
        Ok(data)
    }

    /// Picks the smallest palette that can hold the current entries.
    pub fn palette(&self) -> Palette {
        let mut distinct: Vec<u32> = Vec::new();
        for &entry in &self.entries {
            if !distinct.contains(&entry) {
                distinct.push(entry);
                if distinct.len() > 1 << self.format.max_indirect_bits {
                    return Palette::Direct {
                        bits_per_entry: self.format.direct_bits,
                    };
                }
            }
        }

        if distinct.len() == 1 {
            return Palette::Single(distinct[0]);
        }
        let bits = ceil_log2(distinct.len()).max(self.format.min_indirect_bits);
        if bits > self.format.max_indirect_bits {
            Palette::Direct {
                bits_per_entry: self.format.direct_bits,
            }
        } else {
            Palette::Indirect {
                bits_per_entry: bits,
                palette: distinct,
            }
        }
    }

    pub fn write(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        match self.palette() {
            Palette::Single(value) => {
                buffer.write_u8(0);
                buffer.write_varint(value as i32);
                buffer.write_varint(0);
            }
            Palette::Indirect {
                bits_per_entry,
                palette,
            } => {
                buffer.write_u8(bits_per_entry);
                buffer.write_varint(palette.len() as i32);
                for entry in &palette {
                    buffer.write_varint(*entry as i32);
                }
                let indices = self.entries.iter().map(|entry| {
                    palette
                        .iter()
                        .position(|candidate| candidate == entry)
                        .unwrap_or(0) as u64
                });
                Self::write_data(buffer, &pack_longs(indices, bits_per_entry));
            }
            Palette::Direct { bits_per_entry } => {
                if let Some(too_big) = self
                    .entries
                    .iter()
                    .find(|entry| ceil_log2(**entry as usize + 1) > bits_per_entry)
                {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!(
                            "Global ID {} doesn't fit in {} bits",
                            too_big, bits_per_entry
                        ),
                    ));
                }
                buffer.write_u8(bits_per_entry);
                let values = self.entries.iter().map(|entry| *entry as u64);
                Self::write_data(buffer, &pack_longs(values, bits_per_entry));
            }
        }
        Ok(())
    }

    fn write_data(buffer: &mut MinecraftPacketBuffer, data: &[i64]) {
        buffer.write_varint(data.len() as i32);
        for long in data {
            buffer.write_i64(*long);
        }
    }

    pub fn get(&self, index: usize) -> Option<u32> {
        self.entries.get(index).copied()
    }

    /// Replaces the entry at `index`. Returns whether it changed.
    pub fn set(&mut self, index: usize, value: u32) -> bool {
        match self.entries.get_mut(index) {
            Some(entry) if *entry != value => {
                *entry = value;
                true
            }
            _ => false,
        }
    }

    pub fn entries(&self) -> &[u32] {
        &self.entries
    }

    pub fn format(&self) -> ContainerFormat {
        self.format
    }
}

/// Index of a section-local block position inside a block-state container
pub fn block_index(x: usize, y: usize, z: usize) -> usize {
    (y << 8) | (z << 4) | x
}

#[cfg(test)]
mod tests {
    use super::*;

    const GLOBAL_BITS: u8 = 15;

    fn decode(bytes: Vec<u8>, format: ContainerFormat) -> PalettedContainer {
        let mut buffer = MinecraftPacketBuffer::from_bytes(bytes);
        let container = PalettedContainer::read(&mut buffer, format).unwrap();
        assert_eq!(buffer.remaining(), 0);
        container
    }

    fn encode(container: &PalettedContainer) -> Vec<u8> {
        let mut buffer = MinecraftPacketBuffer::new();
        container.write(&mut buffer).unwrap();
        buffer.buffer
    }

    #[test]
    fn test_ceil_log2() {
        assert_eq!(ceil_log2(1), 0);
        assert_eq!(ceil_log2(2), 1);
        assert_eq!(ceil_log2(16), 4);
        assert_eq!(ceil_log2(17), 5);
        assert_eq!(ceil_log2(26_684), 15);
    }

    #[test]
    fn test_single_value_layout() {
        let container = PalettedContainer::filled(ContainerFormat::block_states(GLOBAL_BITS), 0);
        assert_eq!(encode(&container), vec![0, 0, 0]);
        assert_eq!(
            decode(vec![0, 0x89, 0x04, 0], ContainerFormat::block_states(GLOBAL_BITS))
                .get(4095),
            Some(521)
        );
    }

    #[test]
    fn test_small_palettes_widen_to_four_bits() {
        let format = ContainerFormat::block_states(GLOBAL_BITS);
        let mut container = PalettedContainer::filled(format, 1);
        container.set(block_index(3, 0, 7), 539);

        assert_eq!(
            container.palette(),
            Palette::Indirect {
                bits_per_entry: 4,
                palette: vec![1, 539]
            }
        );
        let bytes = encode(&container);
        assert_eq!(bytes[0], 4);
        assert_eq!(decode(bytes, format), container);
    }

    #[test]
    fn test_bits_below_minimum_are_read_as_minimum() {
        // One bit per entry on the wire is still packed four bits wide for blocks
        let mut buffer = MinecraftPacketBuffer::new();
        buffer.write_u8(1);
        buffer.write_varint(2);
        buffer.write_varint(10);
        buffer.write_varint(20);
        let mut data = vec![0i64; 256];
        data[0] = 0x10;
        buffer.write_varint(data.len() as i32);
        for long in &data {
            buffer.write_i64(*long);
        }

        let container = decode(buffer.buffer, ContainerFormat::block_states(GLOBAL_BITS));
        assert_eq!(container.get(0), Some(10));
        assert_eq!(container.get(1), Some(20));
        assert_eq!(container.get(2), Some(10));
    }

    #[test]
    fn test_many_values_switch_to_direct() {
        let format = ContainerFormat::block_states(GLOBAL_BITS);
        let entries: Vec<u32> = (0..4096).map(|i| (i % 300) as u32 * 50).collect();
        let container = PalettedContainer::from_entries(format, entries).unwrap();
        assert_eq!(
            container.palette(),
            Palette::Direct {
                bits_per_entry: GLOBAL_BITS
            }
        );

        let bytes = encode(&container);
        // 64 / 15 = 4 entries per long, no entry spans two longs
        let mut buffer = MinecraftPacketBuffer::from_bytes(bytes.clone());
        assert_eq!(buffer.read_u8().unwrap(), GLOBAL_BITS);
        assert_eq!(buffer.read_varint().unwrap(), 1024);
        assert_eq!(decode(bytes, format), container);
    }

    #[test]
    fn test_biome_container_uses_its_own_thresholds() {
        let format = ContainerFormat::biomes(6);
        let entries: Vec<u32> = (0..64).map(|i| (i % 5) as u32).collect();
        let container = PalettedContainer::from_entries(format, entries).unwrap();
        assert_eq!(
            container.palette(),
            Palette::Indirect {
                bits_per_entry: 3,
                palette: vec![0, 1, 2, 3, 4]
            }
        );
        assert_eq!(decode(encode(&container), format), container);

        let wide: Vec<u32> = (0..64).map(|i| (i % 9) as u32).collect();
        let container = PalettedContainer::from_entries(format, wide).unwrap();
        assert_eq!(container.palette(), Palette::Direct { bits_per_entry: 6 });
        assert_eq!(decode(encode(&container), format), container);
    }

    #[test]
    fn test_corrupt_containers_are_rejected() {
        let format = ContainerFormat::block_states(GLOBAL_BITS);

        // Palette index 3 with only one palette entry
        let mut buffer = MinecraftPacketBuffer::new();
        buffer.write_u8(4);
        buffer.write_varint(1);
        buffer.write_varint(0);
        buffer.write_varint(256);
        buffer.write_i64(3);
        for _ in 1..256 {
            buffer.write_i64(0);
        }
        assert!(PalettedContainer::read(&mut buffer, format).is_err());

        // Wrong data array length
        let mut buffer = MinecraftPacketBuffer::new();
        buffer.write_u8(GLOBAL_BITS);
        buffer.write_varint(1);
        buffer.write_i64(0);
        assert!(PalettedContainer::read(&mut buffer, format).is_err());

        // Truncated
        let mut buffer = MinecraftPacketBuffer::from_bytes(vec![4, 1, 0, 0x80, 0x02]);
        assert!(PalettedContainer::read(&mut buffer, format).is_err());
    }

    #[test]
    fn test_set_reports_changes() {
        let mut container = PalettedContainer::filled(ContainerFormat::biomes(6), 2);
        assert!(!container.set(0, 2));
        assert!(container.set(0, 3));
        assert!(!container.set(64, 3));
    }
}
