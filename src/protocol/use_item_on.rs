use crate::protocol::packet::{MinecraftPacketBuffer, Packet};
use crate::types::{BlockPos, Direction, Hand};
use std::io;

/// Use Item On, sent by the client when it right-clicks a block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UseItemOnPacket {
    pub hand: Hand,
    pub position: BlockPos,
    pub face: Direction,
    pub cursor_x: f32,
    pub cursor_y: f32,
    pub cursor_z: f32,
    pub inside_block: bool,
    pub sequence: i32,
}

impl Packet for UseItemOnPacket {
    fn packet_id() -> i32 {
        0x35
    }

    fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
        let hand = Hand::from_id(buffer.read_varint()?)?;
        let position = buffer.read_position()?;
        let face = Direction::from_id(buffer.read_varint()?)?;
        let cursor_x = buffer.read_f32()?;
        let cursor_y = buffer.read_f32()?;
        let cursor_z = buffer.read_f32()?;
        let inside_block = buffer.read_bool()?;
        let sequence = buffer.read_varint()?;

        Ok(Self {
            hand,
            position,
            face,
            cursor_x,
            cursor_y,
            cursor_z,
            inside_block,
            sequence,
        })
    }

    fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        buffer.write_varint(Self::packet_id());
        buffer.write_varint(self.hand.id());
        buffer.write_position(self.position);
        buffer.write_varint(self.face.id());
        buffer.write_f32(self.cursor_x)?;
        buffer.write_f32(self.cursor_y)?;
        buffer.write_f32(self.cursor_z)?;
        buffer.write_bool(self.inside_block);
        buffer.write_varint(self.sequence);
        Ok(())
    }
}
