use crate::protocol::packet::{MinecraftPacketBuffer, Packet};
use crate::types::BlockPos;
use std::io;

/// Section coordinates, in units of 16 blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SectionPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl SectionPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Packs as `x:22 | z:22 | y:20`.
    pub fn to_long(&self) -> i64 {
        ((self.x as i64 & 0x3F_FFFF) << 42)
            | ((self.z as i64 & 0x3F_FFFF) << 20)
            | (self.y as i64 & 0xF_FFFF)
    }

    pub fn from_long(packed: i64) -> Self {
        Self {
            x: (packed >> 42) as i32,
            y: ((packed << 44) >> 44) as i32,
            z: ((packed << 22) >> 42) as i32,
        }
    }

    /// World position of a block given its offset inside this section
    pub fn block_at(&self, local_x: u8, local_y: u8, local_z: u8) -> BlockPos {
        BlockPos::new(
            (self.x << 4) + local_x as i32,
            (self.y << 4) + local_y as i32,
            (self.z << 4) + local_z as i32,
        )
    }
}

/// One changed block in a section update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionBlockChange {
    pub local_x: u8,
    pub local_y: u8,
    pub local_z: u8,
    pub block_state: i32,
}

impl SectionBlockChange {
    /// `state << 12 | x << 8 | z << 4 | y`
    pub fn to_varlong(&self) -> i64 {
        ((self.block_state as i64) << 12)
            | ((self.local_x as i64 & 0xF) << 8)
            | ((self.local_z as i64 & 0xF) << 4)
            | (self.local_y as i64 & 0xF)
    }

    pub fn from_varlong(value: i64) -> Self {
        Self {
            local_x: ((value >> 8) & 0xF) as u8,
            local_y: (value & 0xF) as u8,
            local_z: ((value >> 4) & 0xF) as u8,
            block_state: (value >> 12) as i32,
        }
    }
}

/// Update Section Blocks, a batch of block changes inside one section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionBlocksUpdatePacket {
    pub section: SectionPos,
    pub changes: Vec<SectionBlockChange>,
}

impl Packet for SectionBlocksUpdatePacket {
    fn packet_id() -> i32 {
        0x47
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        let section = SectionPos::from_long(buffer.read_i64()?);
        let count = buffer.read_length()?;
        if count > 4096 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Too many block changes in one section: {}", count),
            ));
        }

        let mut changes = Vec::with_capacity(count);
        for _ in 0..count {
            changes.push(SectionBlockChange::from_varlong(buffer.read_varlong()?));
        }
        Ok(Self { section, changes })
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_varint(Self::packet_id());
        buffer.write_i64(self.section.to_long());
        buffer.write_varint(self.changes.len() as i32);
        for change in &self.changes {
            buffer.write_varlong(change.to_varlong());
        }
        Ok(())
    }
}
