use crate::protocol::packet::{MinecraftPacketBuffer, Packet};
use crate::types::BlockPos;
use std::io;

/// Block Update, sent when a single block changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockUpdatePacket {
    pub position: BlockPos,
    /// Global block state ID
    pub block_state: i32,
}

impl Packet for BlockUpdatePacket {
    fn packet_id() -> i32 {
        0x09
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        let position = buffer.read_position()?;
        let block_state = buffer.read_varint()?;
        Ok(Self {
            position,
            block_state,
        })
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_varint(Self::packet_id());
        buffer.write_position(self.position);
        buffer.write_varint(self.block_state);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_update_layout() {
        let packet = BlockUpdatePacket {
            position: BlockPos::new(3, 64, 7),
            block_state: 541,
        };
        let mut buffer = MinecraftPacketBuffer::new();
        packet.write_to_buffer(&mut buffer).unwrap();

        assert_eq!(buffer.buffer[0], 0x09);
        assert_eq!(buffer.buffer.len(), 1 + 8 + 2);

        let mut buffer = MinecraftPacketBuffer::from_bytes(buffer.buffer[1..].to_vec());
        assert_eq!(BlockUpdatePacket::read_from_buffer(&mut buffer).unwrap(), packet);
    }
}
