use crate::protocol::packet::{MinecraftPacketBuffer, Packet};
use bytes::{Buf, BufMut, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

/// Largest frame the vanilla client will accept
pub const MAX_FRAME_LENGTH: usize = 2_097_151;

/// One uncompressed packet as seen on the wire: its ID and the bytes after the ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
    pub id: i32,
    pub body: Vec<u8>,
}

impl RawPacket {
    pub fn new(id: i32, body: Vec<u8>) -> Self {
        Self { id, body }
    }

    /// Splits a frame payload into ID and body.
    pub fn from_payload(payload: Vec<u8>) -> io::Result<Self> {
        let mut buffer = MinecraftPacketBuffer::from_bytes(payload);
        let id = buffer.read_varint()?;
        Ok(Self {
            id,
            body: buffer.read_remaining(),
        })
    }

    pub fn from_packet<T: Packet>(packet: &T) -> io::Result<Self> {
        let mut buffer = MinecraftPacketBuffer::new();
        packet.write_to_buffer(&mut buffer)?;
        Self::from_payload(buffer.buffer)
    }

    pub fn is<T: Packet>(&self) -> bool {
        self.id == T::packet_id()
    }

    /// Decodes the body as `T`. Fails if the ID doesn't match.
    pub fn decode<T: Packet>(&self) -> io::Result<T> {
        if !self.is::<T>() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid packet ID: 0x{:02x}", self.id),
            ));
        }
        let mut buffer = MinecraftPacketBuffer::from_bytes(self.body.clone());
        T::read_from_buffer(&mut buffer)
    }

    pub fn to_payload(&self) -> Vec<u8> {
        let mut buffer = MinecraftPacketBuffer::new();
        buffer.write_varint(self.id);
        buffer.write_bytes_raw(&self.body);
        buffer.buffer
    }
}

/// VarInt length-prefixed framing for uncompressed connections.
#[derive(Debug, Default, Clone, Copy)]
pub struct PacketFrameCodec;

/// Peeks a VarInt at the front of `src`. Returns the value and its encoded width, or None if
/// more bytes are needed.
fn peek_varint(src: &[u8]) -> io::Result<Option<(usize, usize)>> {
    let mut value: u32 = 0;
    for (i, byte) in src.iter().enumerate().take(5) {
        value |= ((byte & 0x7F) as u32) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(Some((value as usize, i + 1)));
        }
    }
    if src.len() >= 5 {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "VarInt too big"));
    }
    Ok(None)
}

impl Decoder for PacketFrameCodec {
    type Item = RawPacket;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> io::Result<Option<RawPacket>> {
        let Some((length, header)) = peek_varint(src)? else {
            return Ok(None);
        };
        if length == 0 || length > MAX_FRAME_LENGTH {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid frame length: {}", length),
            ));
        }
        if src.len() < header + length {
            src.reserve(header + length - src.len());
            return Ok(None);
        }

        src.advance(header);
        let payload = src.split_to(length);
        RawPacket::from_payload(payload.to_vec()).map(Some)
    }
}

impl Encoder<RawPacket> for PacketFrameCodec {
    type Error = io::Error;

    fn encode(&mut self, item: RawPacket, dst: &mut BytesMut) -> io::Result<()> {
        let payload = item.to_payload();
        if payload.len() > MAX_FRAME_LENGTH {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Frame too large: {} bytes", payload.len()),
            ));
        }

        let mut header = MinecraftPacketBuffer::new();
        header.write_varint(payload.len() as i32);
        dst.reserve(header.buffer.len() + payload.len());
        dst.put_slice(&header.buffer);
        dst.put_slice(&payload);
        Ok(())
    }
}
