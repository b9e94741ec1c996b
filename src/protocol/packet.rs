use crate::types::BlockPos;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

/// Packet trait. Contains the packet ID and the functions to write and read the packet.
pub trait Packet {
    /// Packet ID
    fn packet_id() -> i32
    where
        Self: Sized;

    /// Reads the packet body from the buffer. The packet ID must already have been consumed.
    fn read_from_buffer(_buffer: &mut MinecraftPacketBuffer) -> io::Result<Self>
    where
        Self: Sized,
    {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "Client-bound packets don't need read",
        ))
    }

    /// Writes the packet ID followed by the packet body to the buffer.
    fn write_to_buffer(&self, _buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "Server-bound packets don't need write",
        ))
    }
}

/// Encodes a packet to its frame payload (ID + body, no length prefix)
pub fn encode_packet<T: Packet>(packet: &T) -> io::Result<Vec<u8>> {
    let mut buffer = MinecraftPacketBuffer::new();
    packet.write_to_buffer(&mut buffer)?;
    Ok(buffer.buffer)
}

/// Minecraft packet buffer. Contains the buffer and the cursor.
/// The cursor is used to keep track of the current read position in the buffer.
#[derive(Debug, Default, Clone)]
pub struct MinecraftPacketBuffer {
    pub buffer: Vec<u8>,
    cursor: usize,
}

impl MinecraftPacketBuffer {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            cursor: 0,
        }
    }

    /// Wraps existing bytes. The cursor starts at 0.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            buffer: bytes,
            cursor: 0,
        }
    }

    pub fn get_cursor(&self) -> usize {
        self.cursor
    }

    /// Bytes left between the cursor and the end of the buffer
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.cursor
    }

    fn ensure(&self, len: usize, what: &str) -> io::Result<()> {
        if self.remaining() < len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("Not enough bytes to read {}", what),
            ));
        }
        Ok(())
    }

    /// Writes a VarInt to the buffer.
    /// A VarInt is a variable-length integer. It is encoded using 7 bits per byte, with the most
    /// significant bit of each byte set to 1 unless it is the final byte in the encoded
    /// representation.
    pub fn write_varint(&mut self, value: i32) {
        let mut value = value as u32;
        while (value & !0x7F) != 0 {
            self.buffer.push(((value & 0x7F) as u8) | 0x80);
            value >>= 7;
        }
        self.buffer.push((value & 0x7F) as u8);
    }

    /// Reads a VarInt from the buffer
    pub fn read_varint(&mut self) -> io::Result<i32> {
        let mut result: u32 = 0;
        let mut shift = 0;

        loop {
            if self.cursor >= self.buffer.len() {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "EOF while reading VarInt",
                ));
            }
            if shift >= 35 {
                return Err(io::Error::new(io::ErrorKind::InvalidData, "VarInt too big"));
            }

            let byte = self.buffer[self.cursor];
            self.cursor += 1;

            result |= ((byte & 0x7F) as u32) << shift;
            shift += 7;

            if (byte & 0x80) == 0 {
                break;
            }
        }

        Ok(result as i32)
    }

    /// Writes a VarLong, the 64-bit sibling of VarInt.
    pub fn write_varlong(&mut self, value: i64) {
        let mut value = value as u64;
        while (value & !0x7F) != 0 {
            self.buffer.push(((value & 0x7F) as u8) | 0x80);
            value >>= 7;
        }
        self.buffer.push((value & 0x7F) as u8);
    }

    /// Reads a VarLong from the buffer
    pub fn read_varlong(&mut self) -> io::Result<i64> {
        let mut result: u64 = 0;
        let mut shift = 0;

        loop {
            if self.cursor >= self.buffer.len() {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "EOF while reading VarLong",
                ));
            }
            if shift >= 70 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "VarLong too big",
                ));
            }

            let byte = self.buffer[self.cursor];
            self.cursor += 1;

            result |= ((byte & 0x7F) as u64) << shift;
            shift += 7;

            if (byte & 0x80) == 0 {
                break;
            }
        }

        Ok(result as i64)
    }

    /// Reads a VarInt that is used as a length and rejects negative values.
    pub fn read_length(&mut self) -> io::Result<usize> {
        let length = self.read_varint()?;
        if length < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Negative length: {}", length),
            ));
        }
        Ok(length as usize)
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn read_u8(&mut self) -> io::Result<u8> {
        self.ensure(1, "u8")?;
        let value = self.buffer[self.cursor];
        self.cursor += 1;
        Ok(value)
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(value as u8);
    }

    pub fn read_bool(&mut self) -> io::Result<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid boolean byte: {}", other),
            )),
        }
    }

    // Write an u16 in network (big-endian) order.
    pub fn write_u16(&mut self, value: u16) {
        self.buffer.push((value >> 8) as u8);
        self.buffer.push((value & 0xFF) as u8);
    }

    // Read an u16 in network (big-endian) order.
    pub fn read_u16(&mut self) -> io::Result<u16> {
        self.ensure(2, "u16")?;
        let hi = self.buffer[self.cursor] as u16;
        let lo = self.buffer[self.cursor + 1] as u16;
        self.cursor += 2;
        Ok((hi << 8) | lo)
    }

    pub fn write_i16(&mut self, value: i16) {
        self.write_u16(value as u16);
    }

    pub fn read_i16(&mut self) -> io::Result<i16> {
        Ok(self.read_u16()? as i16)
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    pub fn read_i32(&mut self) -> io::Result<i32> {
        self.ensure(4, "i32")?;
        ReadBytesExt::read_i32::<BigEndian>(self)
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    pub fn read_i64(&mut self) -> io::Result<i64> {
        self.ensure(8, "i64")?;
        ReadBytesExt::read_i64::<BigEndian>(self)
    }

    pub fn write_f32(&mut self, value: f32) -> io::Result<()> {
        WriteBytesExt::write_f32::<BigEndian>(self, value)
    }

    pub fn read_f32(&mut self) -> io::Result<f32> {
        self.ensure(4, "f32")?;
        ReadBytesExt::read_f32::<BigEndian>(self)
    }

    /// Writes a block position packed as `x:26 | z:26 | y:12`.
    pub fn write_position(&mut self, pos: BlockPos) {
        let packed = ((pos.x as i64 & 0x3FF_FFFF) << 38)
            | ((pos.z as i64 & 0x3FF_FFFF) << 12)
            | (pos.y as i64 & 0xFFF);
        self.write_i64(packed);
    }

    /// Reads a packed block position, sign-extending every component.
    pub fn read_position(&mut self) -> io::Result<BlockPos> {
        let packed = self.read_i64()?;
        let x = (packed >> 38) as i32;
        let z = ((packed << 26) >> 38) as i32;
        let y = ((packed << 52) >> 52) as i32;
        Ok(BlockPos::new(x, y, z))
    }

    pub fn write_bytes_raw(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Reads exactly `length` bytes.
    pub fn read_bytes(&mut self, length: usize) -> io::Result<Vec<u8>> {
        self.ensure(length, "byte array")?;
        let bytes = self.buffer[self.cursor..self.cursor + length].to_vec();
        self.cursor += length;
        Ok(bytes)
    }

    /// Reads everything after the cursor.
    pub fn read_remaining(&mut self) -> Vec<u8> {
        let bytes = self.buffer[self.cursor..].to_vec();
        self.cursor = self.buffer.len();
        bytes
    }
}

impl Read for MinecraftPacketBuffer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let to_read = buf.len().min(self.remaining());
        buf[..to_read].copy_from_slice(&self.buffer[self.cursor..self.cursor + to_read]);
        self.cursor += to_read;
        Ok(to_read)
    }
}

impl Write for MinecraftPacketBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Helper struct for testing Packet trait
    struct TestPacket {
        value: i32,
    }

    impl Packet for TestPacket {
        fn packet_id() -> i32 {
            0x42
        }

        fn write_to_buffer(&self, buffer: &mut MinecraftPacketBuffer) -> io::Result<()> {
            buffer.write_varint(Self::packet_id());
            buffer.write_varint(self.value);
            Ok(())
        }

        fn read_from_buffer(buffer: &mut MinecraftPacketBuffer) -> io::Result<Self> {
            Ok(TestPacket {
                value: buffer.read_varint()?,
            })
        }
    }

    #[test]
    fn test_packet_buffer_from_bytes() {
        let bytes = vec![1, 2, 3];
        let buffer = MinecraftPacketBuffer::from_bytes(bytes.clone());
        assert_eq!(buffer.buffer, bytes);
        assert_eq!(buffer.get_cursor(), 0);
        assert_eq!(buffer.remaining(), 3);
    }

    #[test]
    fn test_varint_known_encodings() {
        let cases: Vec<(i32, Vec<u8>)> = vec![
            (0, vec![0x00]),
            (127, vec![0x7F]),
            (128, vec![0x80, 0x01]),
            (25565, vec![0xDD, 0xC7, 0x01]),
            (-1, vec![0xFF, 0xFF, 0xFF, 0xFF, 0x0F]),
        ];

        for (value, encoded) in cases {
            let mut buffer = MinecraftPacketBuffer::new();
            buffer.write_varint(value);
            assert_eq!(buffer.buffer, encoded, "encoding of {}", value);

            let mut read_buffer = MinecraftPacketBuffer::from_bytes(encoded);
            assert_eq!(read_buffer.read_varint().unwrap(), value);
        }
    }

    #[test]
    fn test_varlong_negative() {
        let mut buffer = MinecraftPacketBuffer::new();
        buffer.write_varlong(-2);
        assert_eq!(buffer.buffer.len(), 10);

        let mut read_buffer = MinecraftPacketBuffer::from_bytes(buffer.buffer);
        assert_eq!(read_buffer.read_varlong().unwrap(), -2);
    }

    #[test]
    fn test_position_sign_extension() {
        for pos in [
            BlockPos::new(3, 64, 7),
            BlockPos::new(-1, -64, -1),
            BlockPos::new(33_554_431, 2047, -33_554_432),
        ] {
            let mut buffer = MinecraftPacketBuffer::new();
            buffer.write_position(pos);
            let mut read_buffer = MinecraftPacketBuffer::from_bytes(buffer.buffer);
            assert_eq!(read_buffer.read_position().unwrap(), pos);
        }
    }

    #[test]
    fn test_length_error_handling() {
        let mut buffer = MinecraftPacketBuffer::new();
        buffer.write_varint(-5);
        assert!(buffer.read_length().is_err());

        // Declared length longer than the buffer
        let mut buffer = MinecraftPacketBuffer::new();
        buffer.write_varint(100);
        buffer.buffer.push(0x41);
        let length = buffer.read_length().unwrap();
        assert!(buffer.read_bytes(length).is_err());
    }

    #[test]
    fn test_varint_error_handling() {
        // Test VarInt too long
        let mut buffer = MinecraftPacketBuffer::from_bytes(vec![0xFF; 6]);
        assert!(buffer.read_varint().is_err());

        // Test unexpected EOF
        let mut buffer = MinecraftPacketBuffer::from_bytes(vec![0x80]);
        assert!(buffer.read_varint().is_err());
    }

    #[test]
    fn test_fixed_width_error_handling() {
        let mut buffer = MinecraftPacketBuffer::from_bytes(vec![0x00]);
        assert!(buffer.read_u16().is_err());

        let mut buffer = MinecraftPacketBuffer::from_bytes(vec![0; 7]);
        assert!(buffer.read_i64().is_err());

        let mut buffer = MinecraftPacketBuffer::from_bytes(vec![2]);
        assert!(buffer.read_bool().is_err());
    }

    #[test]
    fn test_encode_packet_prefixes_id() {
        let payload = encode_packet(&TestPacket { value: 300 }).unwrap();
        let mut buffer = MinecraftPacketBuffer::from_bytes(payload);
        assert_eq!(buffer.read_varint().unwrap(), TestPacket::packet_id());
        let packet = TestPacket::read_from_buffer(&mut buffer).unwrap();
        assert_eq!(packet.value, 300);
    }
}
